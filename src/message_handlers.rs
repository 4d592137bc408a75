use super::*;

pub(super) async fn handle_youtube_message(
    bot: Bot,
    msg: Message,
    state: Arc<YoutubeState>,
) -> Result<()> {
    let text = match msg.text() {
        Some(text) => text.to_string(),
        None => return Ok(()),
    };
    let Some(cmd) = parse_command(&text) else {
        return Ok(());
    };
    let args = command_args(&text);

    match cmd {
        "start" | "help" => {
            reply_text(&bot, &msg, YOUTUBE_WELCOME).await?;
        }
        "video" => {
            handle_search_command(&bot, &msg, &state, MediaMode::Video, &args).await?;
        }
        "audio" => {
            handle_search_command(&bot, &msg, &state, MediaMode::Audio, &args).await?;
        }
        "link" => {
            handle_link_command(&bot, &msg, &state, &args).await?;
        }
        _ => {}
    }

    Ok(())
}

async fn handle_search_command(
    bot: &Bot,
    msg: &Message,
    state: &Arc<YoutubeState>,
    mode: MediaMode,
    args: &[&str],
) -> Result<()> {
    if args.is_empty() {
        reply_text(bot, msg, mode.usage_text()).await?;
        return Ok(());
    }

    let query = args.join(" ");
    let status = reply_text(bot, msg, mode.searching_text()).await?;

    let url = match search_youtube(state, &query).await {
        Ok(Some(url)) => url,
        Ok(None) => {
            info!("no youtube results for {:?}", query);
            edit_status(
                bot,
                msg.chat.id,
                status.id,
                "❌ No results found. Try again with a different query.",
            )
            .await?;
            return Ok(());
        }
        Err(err) => {
            error!("youtube search for {:?} failed: {:#}", query, err);
            edit_status(
                bot,
                msg.chat.id,
                status.id,
                "❌ No results found. Try again with a different query.",
            )
            .await?;
            return Ok(());
        }
    };

    edit_status(bot, msg.chat.id, status.id, mode.downloading_text()).await?;
    relay_youtube_download(bot, msg.chat.id, status.id, Some(msg.id), state, &url, mode).await
}

async fn handle_link_command(
    bot: &Bot,
    msg: &Message,
    state: &Arc<YoutubeState>,
    args: &[&str],
) -> Result<()> {
    let Some(url) = args.first().and_then(|arg| parse_link_url(arg)) else {
        reply_text(bot, msg, "❌ Usage: /link <YouTube URL>").await?;
        return Ok(());
    };

    let prompt_id = short_id();
    let sent = bot
        .send_message(
            msg.chat.id,
            "🔗 You provided a link! What do you want to do?\n\nChoose an option below 👇:",
        )
        .reply_to_message_id(msg.id)
        .reply_markup(build_link_keyboard(&prompt_id))
        .await?;

    let now = now_ts();
    let prompt = LinkPrompt {
        chat_id: msg.chat.id.0,
        message_id: sent.id,
        url,
        expires_at: now + LINK_PROMPT_TTL_SECS,
    };
    let mut prompts = state.link_prompts.lock().await;
    prune_link_prompts(&mut prompts, now);
    prompts.insert(prompt_id, prompt);
    Ok(())
}

/// Downloads `url`, sends the file into the chat and clears the status message.
/// Failures are reported by editing the status message in place.
pub(crate) async fn relay_youtube_download(
    bot: &Bot,
    chat_id: ChatId,
    status_id: MessageId,
    reply_to: Option<MessageId>,
    state: &Arc<YoutubeState>,
    url: &str,
    mode: MediaMode,
) -> Result<()> {
    let media = match download_youtube_media(state, url, mode).await {
        Ok(media) => media,
        Err(err) => {
            error!("{} download of {} failed: {:#}", mode.action(), url, err);
            edit_status(bot, chat_id, status_id, mode.failure_text()).await?;
            return Ok(());
        }
    };

    edit_status(bot, chat_id, status_id, mode.sending_text()).await?;
    let sent = send_media(bot, chat_id, reply_to, &media.path, mode.send_as()).await;
    media.cleanup();

    match sent {
        Ok(()) => {
            let _ = bot.delete_message(chat_id, status_id).await;
        }
        Err(err) => {
            error!("sending {} for {} failed: {:#}", mode.action(), url, err);
            edit_status(bot, chat_id, status_id, mode.failure_text()).await?;
        }
    }
    Ok(())
}

pub(super) async fn handle_instagram_message(
    bot: Bot,
    msg: Message,
    state: Arc<InstagramState>,
) -> Result<()> {
    let text = match msg.text().or_else(|| msg.caption()) {
        Some(text) => text.to_string(),
        None => return Ok(()),
    };

    if let Some(cmd) = parse_command(&text) {
        if matches!(cmd, "start" | "help") {
            reply_text(&bot, &msg, INSTAGRAM_WELCOME).await?;
            return Ok(());
        }
    }

    let Some(link) = find_instagram_url(&state.url_pattern, &text) else {
        return Ok(());
    };

    let status = reply_text(&bot, &msg, "🔄 Processing Instagram URL...").await?;

    let (media, kind) = match download_instagram_media(&state, &link).await {
        Ok(downloaded) => downloaded,
        Err(err) => {
            error!("instagram download of {} failed: {:#}", link, err);
            edit_status(
                &bot,
                msg.chat.id,
                status.id,
                "❌ Failed to download or validate Instagram media.",
            )
            .await?;
            return Ok(());
        }
    };

    let sent = send_media(&bot, msg.chat.id, None, &media.path, kind.send_as()).await;
    media.cleanup();

    match sent {
        Ok(()) => {
            let _ = bot.delete_message(msg.chat.id, status.id).await;
        }
        Err(err) => {
            error!("sending instagram media for {} failed: {:#}", link, err);
            edit_status(
                &bot,
                msg.chat.id,
                status.id,
                "❌ Failed to download or validate Instagram media.",
            )
            .await?;
        }
    }
    Ok(())
}
