use super::*;

use tokio::io::AsyncWriteExt;

const GRAPHQL_ENDPOINT: &str = "https://www.instagram.com/api/graphql";

// Public values embedded in the Instagram web app.
const IG_APP_ID: &str = "936619743392459";
const FB_LSD_TOKEN: &str = "AVqbxe3J_YA";
const FB_ASBD_ID: &str = "129477";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const GRAPHQL_TIMEOUT: Duration = Duration::from_secs(30);

const CONTENT_SEGMENTS: &[&str] = &["p", "reel", "reels", "tv"];

pub(super) fn instagram_url_pattern() -> Result<Regex> {
    Regex::new(r"https?://(?:www\.)?instagram\.com/[^\s]+").context("compile instagram url pattern")
}

pub(super) fn find_instagram_url(pattern: &Regex, text: &str) -> Option<String> {
    pattern.find(text).map(|m| m.as_str().to_string())
}

/// Shortcode from `/p/<code>/`, `/reel/<code>/`, `/tv/<code>/` or the same
/// paths behind a username segment.
pub(super) fn extract_shortcode(link: &str) -> Option<String> {
    let url = url::Url::parse(link).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    if host != "instagram.com" && host != "www.instagram.com" {
        return None;
    }
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let code = if segments.len() >= 2 && CONTENT_SEGMENTS.contains(&segments[0]) {
        segments[1]
    } else if segments.len() >= 3 && CONTENT_SEGMENTS.contains(&segments[1]) {
        segments[2]
    } else {
        return None;
    };
    Some(code.to_string())
}

pub(super) async fn fetch_instagram_post(
    http: &reqwest::Client,
    doc_id: &str,
    shortcode: &str,
) -> Result<InstagramPost> {
    let variables = serde_json::json!({ "shortcode": shortcode }).to_string();
    let response = http
        .post(GRAPHQL_ENDPOINT)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .header("X-IG-App-ID", IG_APP_ID)
        .header("X-FB-LSD", FB_LSD_TOKEN)
        .header("X-ASBD-ID", FB_ASBD_ID)
        .header("X-Requested-With", "XMLHttpRequest")
        .header(reqwest::header::REFERER, "https://www.instagram.com/")
        .header(reqwest::header::ORIGIN, "https://www.instagram.com")
        .timeout(GRAPHQL_TIMEOUT)
        .form(&[
            ("doc_id", doc_id),
            ("variables", variables.as_str()),
            ("lsd", FB_LSD_TOKEN),
        ])
        .send()
        .await
        .context("instagram graphql request")?;
    let status = response.status();
    let body = response.text().await.context("read instagram graphql body")?;
    if !status.is_success() {
        return Err(anyhow!(
            "instagram graphql failed ({}): {}",
            status,
            trim_tail(&body, 300)
        ));
    }
    let value: serde_json::Value = serde_json::from_str(&body)
        .with_context(|| format!("parse instagram graphql json: {}", trim_tail(&body, 300)))?;
    post_from_graphql(&value)
}

pub(super) fn post_from_graphql(value: &serde_json::Value) -> Result<InstagramPost> {
    let media = value
        .pointer("/data/xdt_shortcode_media")
        .filter(|media| !media.is_null())
        .or_else(|| value.pointer("/data/shortcode_media"))
        .filter(|media| !media.is_null())
        .ok_or_else(|| match value.get("message").and_then(|v| v.as_str()) {
            Some(message) => anyhow!("instagram post unavailable: {}", message),
            None => anyhow!("instagram post not found"),
        })?;

    // Carousels are relayed as their first item.
    let node = media
        .pointer("/edge_sidecar_to_children/edges/0/node")
        .unwrap_or(media);

    let is_video = node
        .get("is_video")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let (kind, media_url) = if is_video {
        (InstagramMediaKind::Video, node.get("video_url"))
    } else {
        (InstagramMediaKind::Image, node.get("display_url"))
    };
    let media_url = media_url
        .and_then(|v| v.as_str())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| anyhow!("instagram post has no media url"))?;

    Ok(InstagramPost {
        kind,
        media_url: media_url.to_string(),
    })
}

pub(super) fn media_file_path(dir: &Path, prefix: &str, kind: InstagramMediaKind) -> PathBuf {
    dir.join(format!("{}_media.{}", prefix, kind.extension()))
}

pub(super) fn check_download_size(bytes: u64) -> Result<()> {
    if bytes > MAX_UPLOAD_BYTES {
        return Err(anyhow!("media is too large to send ({})", human_size(bytes)));
    }
    Ok(())
}

pub(super) async fn download_to_file(http: &reqwest::Client, url: &str, path: &Path) -> Result<u64> {
    let mut response = http
        .get(url)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await
        .context("media request")?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(anyhow!("media request returned {}", response.status()));
    }
    if let Some(length) = response.content_length() {
        check_download_size(length)?;
    }
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("create {}", path.display()))?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.context("read media body")? {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        written += chunk.len() as u64;
        check_download_size(written)?;
    }
    file.flush()
        .await
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(written)
}

pub(super) async fn download_instagram_media(
    state: &InstagramState,
    link: &str,
) -> Result<(DownloadedMedia, InstagramMediaKind)> {
    let shortcode =
        extract_shortcode(link).ok_or_else(|| anyhow!("no post shortcode in {}", link))?;
    let post = fetch_instagram_post(&state.http, &state.config.graphql_doc_id, &shortcode).await?;
    debug!("instagram post {} is {:?}", shortcode, post.kind);

    let dir = create_request_dir(&state.download_dir, "ig-")?;
    let path = media_file_path(dir.path(), INSTAGRAM_MEDIA_PREFIX, post.kind);
    let written = download_to_file(&state.http, &post.media_url, &path).await?;
    info!("downloaded instagram {} ({})", shortcode, human_size(written));

    let kind = post.kind;
    let validate_path = path.clone();
    tokio::task::spawn_blocking(move || validate_media(&validate_path, kind))
        .await
        .context("media validation task failed")??;

    Ok((DownloadedMedia { dir, path }, kind))
}
