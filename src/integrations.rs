use super::*;

const YOUTUBE_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

pub(super) fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

pub(super) async fn search_youtube(state: &YoutubeState, query: &str) -> Result<Option<String>> {
    match state.config.api_key.as_deref() {
        Some(api_key) => search_youtube_api(&state.http, api_key, query).await,
        None => {
            let query = query.to_string();
            tokio::task::spawn_blocking(move || run_ytdlp_search(&query))
                .await
                .context("yt-dlp search task failed")?
        }
    }
}

pub(super) async fn search_youtube_api(
    http: &reqwest::Client,
    api_key: &str,
    query: &str,
) -> Result<Option<String>> {
    let response = http
        .get(YOUTUBE_SEARCH_ENDPOINT)
        .query(&[
            ("part", "snippet"),
            ("type", "video"),
            ("maxResults", "1"),
            ("q", query),
            ("key", api_key),
        ])
        .timeout(SEARCH_TIMEOUT)
        .send()
        .await
        .context("youtube search request")?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "youtube search failed ({}): {}",
            status,
            trim_tail(&body, 300)
        ));
    }
    let value: serde_json::Value = response.json().await.context("parse youtube search json")?;
    Ok(video_url_from_search_response(&value))
}

pub(super) fn video_url_from_search_response(value: &serde_json::Value) -> Option<String> {
    let items = value.get("items").and_then(|v| v.as_array())?;
    let video_id = items
        .first()?
        .pointer("/id/videoId")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|id| !id.is_empty())?;
    Some(watch_url(video_id))
}

pub(super) fn run_ytdlp_search(query: &str) -> Result<Option<String>> {
    let output = Command::new("yt-dlp")
        .arg("--no-playlist")
        .arg("--skip-download")
        .arg("--print")
        .arg("id")
        .arg("--")
        .arg(format!("ytsearch1:{}", query))
        .output()
        .context("run yt-dlp")?;
    if !output.status.success() {
        return Err(anyhow!(format_ytdlp_error(&output)));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(last_output_line(&stdout).map(watch_url))
}

pub(super) async fn download_youtube_media(
    state: &YoutubeState,
    url: &str,
    mode: MediaMode,
) -> Result<DownloadedMedia> {
    let dir = create_request_dir(&state.download_dir, "yt-")?;
    let cookies = state
        .config
        .cookies_path
        .exists()
        .then(|| state.config.cookies_path.clone());
    let args = ytdlp_download_args(
        dir.path(),
        url,
        mode,
        cookies.as_deref(),
        &state.config.audio_quality,
    );
    let target_dir = dir.path().to_path_buf();
    info!("downloading {} from {}", mode.action(), url);
    let path = tokio::task::spawn_blocking(move || run_ytdlp_download(&target_dir, &args))
        .await
        .context("yt-dlp task failed")??;
    Ok(DownloadedMedia { dir, path })
}

pub(super) fn ytdlp_download_args(
    target_dir: &Path,
    url: &str,
    mode: MediaMode,
    cookies: Option<&Path>,
    audio_quality: &str,
) -> Vec<String> {
    let template = target_dir.join("%(title).200B.%(ext)s");
    let mut args = vec!["--no-playlist".to_string()];
    match mode {
        MediaMode::Video => {
            args.push("-f".to_string());
            args.push("best".to_string());
        }
        MediaMode::Audio => {
            args.push("-f".to_string());
            args.push("bestaudio/best".to_string());
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push("mp3".to_string());
            args.push("--audio-quality".to_string());
            args.push(format!("{}K", audio_quality.trim_end_matches(['k', 'K'])));
        }
    }
    if let Some(cookies) = cookies {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().to_string());
    }
    args.push("--print".to_string());
    args.push("after_move:filepath".to_string());
    args.push("-o".to_string());
    args.push(template.to_string_lossy().to_string());
    args.push("--".to_string());
    args.push(url.to_string());
    args
}

pub(super) fn run_ytdlp_download(target_dir: &Path, args: &[String]) -> Result<PathBuf> {
    let output = Command::new("yt-dlp")
        .args(args)
        .output()
        .context("run yt-dlp")?;
    if !output.status.success() {
        return Err(anyhow!(format_ytdlp_error(&output)));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let path_line =
        last_output_line(&stdout).ok_or_else(|| anyhow!("yt-dlp did not return a filepath"))?;
    let mut path = PathBuf::from(path_line);
    if path.is_relative() {
        path = target_dir.join(path);
    }
    if !path.exists() {
        return Err(anyhow!("yt-dlp output not found: {}", path.display()));
    }
    Ok(path)
}

pub(super) fn last_output_line(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

pub(super) fn format_ytdlp_error(output: &std::process::Output) -> String {
    let mut message = "yt-dlp failed.".to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stdout.is_empty() {
        message.push_str("\nstdout:\n");
        message.push_str(&trim_tail(&stdout, 1000));
    }
    if !stderr.is_empty() {
        message.push_str("\nstderr:\n");
        message.push_str(&trim_tail(&stderr, 1000));
    }
    message
}

pub(super) fn trim_tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max_chars).collect();
    format!("...{}", tail)
}
