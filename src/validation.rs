use super::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct VideoProbe {
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) duration_secs: f64,
}

impl VideoProbe {
    /// Needs at least one whole second of footage.
    pub(super) fn is_playable(&self) -> bool {
        self.width > 0 && self.height > 0 && self.duration_secs >= 1.0
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Checks the file for its kind and deletes it when the check fails.
pub(super) fn validate_media(path: &Path, kind: InstagramMediaKind) -> Result<()> {
    let checked = match kind {
        InstagramMediaKind::Image => validate_image(path).map(|_| ()),
        InstagramMediaKind::Video => validate_video(path).map(|_| ()),
    };
    if let Err(err) = checked {
        error!("{:?} validation failed for {}: {:#}", kind, path.display(), err);
        if let Err(remove_err) = fs::remove_file(path) {
            warn!("remove {} failed: {}", path.display(), remove_err);
        }
        return Err(err);
    }
    Ok(())
}

pub(super) fn validate_image(path: &Path) -> Result<(u32, u32)> {
    let decoded = image::ImageReader::open(path)
        .with_context(|| format!("open image {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("detect image format {}", path.display()))?
        .decode()
        .with_context(|| format!("decode image {}", path.display()))?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(anyhow!("image {} is empty ({}x{})", path.display(), width, height));
    }
    Ok((width, height))
}

pub(super) fn validate_video(path: &Path) -> Result<VideoProbe> {
    let probe = probe_video(path)?;
    if !probe.is_playable() {
        return Err(anyhow!(
            "video {} is not playable ({}x{}, {:.2}s)",
            path.display(),
            probe.width,
            probe.height,
            probe.duration_secs
        ));
    }
    Ok(probe)
}

pub(super) fn probe_video(path: &Path) -> Result<VideoProbe> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height:format=duration")
        .arg("-of")
        .arg("json")
        .arg(path)
        .output()
        .context("run ffprobe")?;
    if !output.status.success() {
        return Err(anyhow!(
            "ffprobe failed: {}",
            trim_tail(String::from_utf8_lossy(&output.stderr).trim(), 300)
        ));
    }
    parse_ffprobe_output(&output.stdout)
}

pub(super) fn parse_ffprobe_output(stdout: &[u8]) -> Result<VideoProbe> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout).context("parse ffprobe json")?;
    let stream = parsed
        .streams
        .first()
        .ok_or_else(|| anyhow!("no video stream"))?;
    let duration_secs = parsed
        .format
        .and_then(|format| format.duration)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite())
        .unwrap_or(0.0);
    Ok(VideoProbe {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        duration_secs,
    })
}
