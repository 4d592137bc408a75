use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use regex::Regex;
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Message, MessageId};
use tempfile::TempDir;
use tokio::sync::Mutex;
use uuid::Uuid;

mod callback_handlers;
mod helpers;
mod instagram;
mod integrations;
mod message_handlers;
mod validation;

use helpers::*;
use instagram::*;
use integrations::*;
use validation::*;

const LINK_PROMPT_TTL_SECS: u64 = 30 * 60;
const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
const DEFAULT_COOKIES_PATH: &str = "cookies.txt";
const DEFAULT_AUDIO_QUALITY: &str = "192";
const DEFAULT_GRAPHQL_DOC_ID: &str = "8845758582119845";
const INSTAGRAM_MEDIA_PREFIX: &str = "temp";

const YOUTUBE_WELCOME: &str = "🎉 Welcome to the YouTube Bot! 🎉\n\n\
Here's what I can do for you:\n\
📹 /video <name> - Download a YouTube video\n\
🎵 /audio <name> - Download YouTube audio\n\
🔗 /link <YouTube URL> - Download directly (video/audio)\n\n\
Enjoy! 🚀";
const INSTAGRAM_WELCOME: &str =
    "Send me a link to an Instagram post or reel and I'll send the photo or video back.";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    download_dir: Option<PathBuf>,
    #[serde(default)]
    youtube: Option<YoutubeConfigFile>,
    #[serde(default)]
    instagram: Option<InstagramConfigFile>,
}

#[derive(Debug, Deserialize)]
struct YoutubeConfigFile {
    token: TokenInput,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    cookies_path: Option<PathBuf>,
    #[serde(default)]
    audio_quality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstagramConfigFile {
    token: TokenInput,
    #[serde(default)]
    graphql_doc_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenInput {
    String(String),
    File { file: PathBuf },
}

#[derive(Debug, Clone)]
struct Config {
    download_dir: PathBuf,
    youtube: Option<YoutubeConfig>,
    instagram: Option<InstagramConfig>,
}

#[derive(Debug, Clone)]
struct YoutubeConfig {
    token: String,
    api_key: Option<String>,
    cookies_path: PathBuf,
    audio_quality: String,
}

#[derive(Debug, Clone)]
struct InstagramConfig {
    token: String,
    graphql_doc_id: String,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: PathBuf,
    #[command(subcommand)]
    bot: BotKind,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum BotKind {
    /// Search and download YouTube videos or audio.
    Youtube,
    /// Relay media from Instagram post links.
    Instagram,
}

/// How a downloaded file is handed back to Telegram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SendAs {
    Video,
    Audio,
    Photo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MediaMode {
    Video,
    Audio,
}

impl MediaMode {
    fn from_action(action: &str) -> Option<Self> {
        match action {
            "video" => Some(MediaMode::Video),
            "audio" => Some(MediaMode::Audio),
            _ => None,
        }
    }

    fn action(self) -> &'static str {
        match self {
            MediaMode::Video => "video",
            MediaMode::Audio => "audio",
        }
    }

    fn send_as(self) -> SendAs {
        match self {
            MediaMode::Video => SendAs::Video,
            MediaMode::Audio => SendAs::Audio,
        }
    }

    fn usage_text(self) -> &'static str {
        match self {
            MediaMode::Video => "❌ Usage: /video <video name>",
            MediaMode::Audio => "❌ Usage: /audio <song name>",
        }
    }

    fn searching_text(self) -> String {
        format!("🔍 Searching for your {}...", self.action())
    }

    fn downloading_text(self) -> String {
        format!("📥 Downloading your {}...", self.action())
    }

    fn sending_text(self) -> &'static str {
        match self {
            MediaMode::Video => "✅ Video downloaded! Sending it to you now...",
            MediaMode::Audio => "✅ Audio downloaded! Sending it to you now...",
        }
    }

    fn failure_text(self) -> String {
        format!("❌ Failed to download the {}. Please try again.", self.action())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InstagramMediaKind {
    Video,
    Image,
}

impl InstagramMediaKind {
    fn extension(self) -> &'static str {
        match self {
            InstagramMediaKind::Video => "mp4",
            InstagramMediaKind::Image => "jpg",
        }
    }

    fn send_as(self) -> SendAs {
        match self {
            InstagramMediaKind::Video => SendAs::Video,
            InstagramMediaKind::Image => SendAs::Photo,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct InstagramPost {
    kind: InstagramMediaKind,
    media_url: String,
}

/// A file on disk together with the per-request directory that owns it.
#[derive(Debug)]
struct DownloadedMedia {
    dir: TempDir,
    path: PathBuf,
}

impl DownloadedMedia {
    fn cleanup(self) {
        if let Err(err) = fs::remove_file(&self.path) {
            debug!("remove {} failed: {}", self.path.display(), err);
        }
        let dir_path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            error!("remove download dir {} failed: {}", dir_path.display(), err);
        }
    }
}

#[derive(Clone, Debug)]
struct LinkPrompt {
    chat_id: i64,
    message_id: MessageId,
    url: String,
    expires_at: u64,
}

struct YoutubeState {
    config: YoutubeConfig,
    download_dir: PathBuf,
    http: reqwest::Client,
    link_prompts: Mutex<HashMap<String, LinkPrompt>>,
}

struct InstagramState {
    config: InstagramConfig,
    download_dir: PathBuf,
    http: reqwest::Client,
    url_pattern: Regex,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    fs::create_dir_all(&config.download_dir)
        .with_context(|| format!("create download_dir {}", config.download_dir.display()))?;

    match args.bot {
        BotKind::Youtube => run_youtube_bot(config).await,
        BotKind::Instagram => run_instagram_bot(config).await,
    }
}

async fn run_youtube_bot(config: Config) -> Result<()> {
    let youtube = youtube_section(&config)?;
    if youtube.api_key.is_none() {
        info!("no YouTube API key configured; searching through yt-dlp");
    }

    let bot = Bot::new(youtube.token.clone());
    let state = Arc::new(YoutubeState {
        config: youtube,
        download_dir: config.download_dir.clone(),
        http: build_http_client()?,
        link_prompts: Mutex::new(HashMap::new()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handlers::handle_youtube_message))
        .branch(Update::filter_callback_query().endpoint(callback_handlers::handle_youtube_callback));

    info!("youtube bot started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn run_instagram_bot(config: Config) -> Result<()> {
    let instagram = instagram_section(&config)?;

    let bot = Bot::new(instagram.token.clone());
    let state = Arc::new(InstagramState {
        config: instagram,
        download_dir: config.download_dir.clone(),
        http: build_http_client()?,
        url_pattern: instagram_url_pattern()?,
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handlers::handle_instagram_message));

    info!("instagram bot started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
