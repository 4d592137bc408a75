use super::*;

pub(super) fn load_config(path: &Path) -> Result<Config> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let config_file: ConfigFile = toml::from_str(&contents).context("parse config")?;
    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config_from_file(config_file, config_dir)
}

pub(super) fn config_from_file(config_file: ConfigFile, config_dir: &Path) -> Result<Config> {
    let download_dir = resolve_config_path(
        &config_file
            .download_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
        config_dir,
    );

    let youtube = match config_file.youtube {
        Some(youtube) => Some(YoutubeConfig {
            token: resolve_token(youtube.token, config_dir).context("resolve youtube token")?,
            api_key: youtube
                .api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            cookies_path: resolve_config_path(
                &youtube
                    .cookies_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIES_PATH)),
                config_dir,
            ),
            audio_quality: youtube
                .audio_quality
                .unwrap_or_else(|| DEFAULT_AUDIO_QUALITY.to_string()),
        }),
        None => None,
    };

    let instagram = match config_file.instagram {
        Some(instagram) => Some(InstagramConfig {
            token: resolve_token(instagram.token, config_dir)
                .context("resolve instagram token")?,
            graphql_doc_id: instagram
                .graphql_doc_id
                .unwrap_or_else(|| DEFAULT_GRAPHQL_DOC_ID.to_string()),
        }),
        None => None,
    };

    Ok(Config {
        download_dir,
        youtube,
        instagram,
    })
}

pub(super) fn resolve_token(input: TokenInput, config_dir: &Path) -> Result<String> {
    match input {
        TokenInput::String(raw) => resolve_token_string(&raw, config_dir),
        TokenInput::File { file } => {
            let path = resolve_config_path(&file, config_dir);
            read_token_file(&path)
        }
    }
}

pub(super) fn resolve_token_string(raw: &str, config_dir: &Path) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("token is empty"));
    }
    if looks_like_bot_token(trimmed) {
        return Ok(trimmed.to_string());
    }
    let path = resolve_config_path(Path::new(trimmed), config_dir);
    read_token_file(&path)
}

/// Bot API tokens are `<numeric bot id>:<secret>`.
pub(super) fn looks_like_bot_token(raw: &str) -> bool {
    match raw.split_once(':') {
        Some((id, secret)) => {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty()
        }
        None => false,
    }
}

pub(super) fn resolve_config_path(path: &Path, config_dir: &Path) -> PathBuf {
    if path.is_relative() {
        config_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

pub(super) fn read_token_file(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read token file {}", path.display()))?;
    let token = contents.trim();
    if token.is_empty() {
        return Err(anyhow!("token file {} is empty", path.display()));
    }
    Ok(token.to_string())
}

pub(super) fn youtube_section(config: &Config) -> Result<YoutubeConfig> {
    config
        .youtube
        .clone()
        .ok_or_else(|| anyhow!("missing [youtube] section in config"))
}

pub(super) fn instagram_section(config: &Config) -> Result<InstagramConfig> {
    config
        .instagram
        .clone()
        .ok_or_else(|| anyhow!("missing [instagram] section in config"))
}

pub(super) fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(15))
        .build()
        .context("build http client")
}

pub(super) fn parse_command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    let cmd = first.trim_start_matches('/');
    Some(cmd.split('@').next().unwrap_or(cmd))
}

pub(super) fn command_args(text: &str) -> Vec<&str> {
    text.split_whitespace().skip(1).collect()
}

/// Accepts only absolute http(s) URLs; anything else never reaches yt-dlp.
pub(super) fn parse_link_url(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url.to_string())
}

pub(super) fn parse_callback_data(data: &str) -> Option<(&str, &str)> {
    let (action, payload) = data.split_once('|')?;
    if action.is_empty() || payload.is_empty() {
        return None;
    }
    Some((action, payload))
}

pub(super) fn build_link_keyboard(prompt_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            "🎵 Download Audio",
            format!("{}|{}", MediaMode::Audio.action(), prompt_id),
        ),
        InlineKeyboardButton::callback(
            "📹 Download Video",
            format!("{}|{}", MediaMode::Video.action(), prompt_id),
        ),
    ]])
}

pub(super) fn prune_link_prompts(prompts: &mut HashMap<String, LinkPrompt>, now: u64) {
    prompts.retain(|_, prompt| prompt.expires_at > now);
}

/// Prompt for a button press, if it is still live and was sent in this message.
pub(super) fn lookup_link_prompt(
    prompts: &mut HashMap<String, LinkPrompt>,
    prompt_id: &str,
    chat_id: i64,
    message_id: MessageId,
    now: u64,
) -> Option<LinkPrompt> {
    prune_link_prompts(prompts, now);
    prompts
        .get(prompt_id)
        .filter(|prompt| prompt.chat_id == chat_id && prompt.message_id == message_id)
        .cloned()
}

pub(super) fn create_request_dir(download_dir: &Path, prefix: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(download_dir)
        .with_context(|| format!("create request dir in {}", download_dir.display()))
}

/// Returns the file size, or an error when Telegram would reject the upload.
pub(super) fn ensure_uploadable(path: &Path) -> Result<u64> {
    let size = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    if size > MAX_UPLOAD_BYTES {
        return Err(anyhow!("File is too large to send ({})", human_size(size)));
    }
    Ok(size)
}

pub(super) fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub(super) async fn send_media(
    bot: &Bot,
    chat_id: ChatId,
    reply_to: Option<MessageId>,
    path: &Path,
    send_as: SendAs,
) -> Result<()> {
    let size = ensure_uploadable(path)?;
    debug!("sending {} ({}) as {:?}", path.display(), human_size(size), send_as);
    let file = InputFile::file(path.to_path_buf());
    match (send_as, reply_to) {
        (SendAs::Video, Some(reply_to)) => {
            bot.send_video(chat_id, file).reply_to_message_id(reply_to).await?;
        }
        (SendAs::Video, None) => {
            bot.send_video(chat_id, file).await?;
        }
        (SendAs::Audio, Some(reply_to)) => {
            bot.send_audio(chat_id, file).reply_to_message_id(reply_to).await?;
        }
        (SendAs::Audio, None) => {
            bot.send_audio(chat_id, file).await?;
        }
        (SendAs::Photo, Some(reply_to)) => {
            bot.send_photo(chat_id, file).reply_to_message_id(reply_to).await?;
        }
        (SendAs::Photo, None) => {
            bot.send_photo(chat_id, file).await?;
        }
    }
    Ok(())
}

pub(super) async fn reply_text(bot: &Bot, msg: &Message, text: impl Into<String>) -> Result<Message> {
    let sent = bot
        .send_message(msg.chat.id, text.into())
        .reply_to_message_id(msg.id)
        .await?;
    Ok(sent)
}

pub(super) async fn edit_status(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: impl Into<String>,
) -> Result<()> {
    bot.edit_message_text(chat_id, message_id, text.into()).await?;
    Ok(())
}

pub(super) fn short_id() -> String {
    let id = Uuid::new_v4().to_string();
    id.split('-').next().unwrap_or(&id).to_string()
}

pub(super) fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
