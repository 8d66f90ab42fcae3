//! Remote audio acquisition
//!
//! Downloads the audio behind a source URL into a private temporary directory
//! using `yt-dlp`, transcoded to WAV. The directory lives exactly as long as
//! the returned [`AcquiredAudio`].

use crate::types::{ExtractionError, Waveform};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Default `yt-dlp` executable name (resolved via PATH)
pub const DEFAULT_YTDLP_BINARY: &str = "yt-dlp";

/// Default download timeout
pub const DEFAULT_ACQUISITION_TIMEOUT: Duration = Duration::from_secs(300);

/// Downloaded audio plus its scoped temporary storage
#[derive(Debug)]
pub struct AcquiredAudio {
    pub waveform: Waveform,
    /// Human-readable title reported by the source
    pub title: String,
    /// Stable identifier at the source (e.g. video id)
    pub source_id: String,
    scratch: Option<TempDir>,
}

impl AcquiredAudio {
    /// Wrap a waveform that lives inside `scratch`
    pub fn new(
        waveform: Waveform,
        title: impl Into<String>,
        source_id: impl Into<String>,
        scratch: TempDir,
    ) -> Self {
        Self {
            waveform,
            title: title.into(),
            source_id: source_id.into(),
            scratch: Some(scratch),
        }
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|dir| dir.path())
    }

    /// Delete the temporary directory now
    ///
    /// A failure is logged and otherwise ignored; it never replaces the
    /// outcome of the work that used the audio.
    pub fn cleanup(mut self) {
        if let Some(dir) = self.scratch.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), error = %e, "Failed to remove temporary audio");
            } else {
                debug!(path = %path.display(), "Removed temporary audio");
            }
        }
    }
}

/// Source URL → local waveform
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn acquire(&self, url: &str) -> Result<AcquiredAudio, ExtractionError>;
}

/// Subset of `yt-dlp --dump-json` we care about
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

/// `yt-dlp` based audio source
pub struct YtDlpSource {
    binary: String,
    timeout: Duration,
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new(DEFAULT_YTDLP_BINARY, DEFAULT_ACQUISITION_TIMEOUT)
    }
}

impl YtDlpSource {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn command(&self, url: &str, scratch: &Path) -> Command {
        let template = scratch.join("%(id)s.%(ext)s");
        let mut command = Command::new(&self.binary);
        command
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-simulate")
            .arg("--dump-json")
            .arg("-f")
            .arg("bestaudio/best")
            .arg("-x")
            .arg("--audio-format")
            .arg("wav")
            .arg("-o")
            .arg(template)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl AudioSource for YtDlpSource {
    async fn acquire(&self, url: &str) -> Result<AcquiredAudio, ExtractionError> {
        let scratch = tempfile::Builder::new().prefix("tunematch-").tempdir()?;
        info!(url = url, dir = %scratch.path().display(), "Downloading audio");

        let output = tokio::time::timeout(self.timeout, self.command(url, scratch.path()).output())
            .await
            .map_err(|_| {
                ExtractionError::Acquisition(format!(
                    "{} timed out after {}s",
                    self.binary,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                ExtractionError::Acquisition(format!("Failed to execute {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Acquisition(format!(
                "{} failed ({}): {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let info = parse_info(&output.stdout)?;
        let wav = find_wav(scratch.path())?;
        let title = info
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| info.id.clone());

        info!(source_id = %info.id, title = %title, "Audio downloaded");
        Ok(AcquiredAudio::new(Waveform::new(wav), title, info.id, scratch))
    }
}

/// First JSON object line on stdout
fn parse_info(stdout: &[u8]) -> Result<YtDlpInfo, ExtractionError> {
    let text = String::from_utf8_lossy(stdout);
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<YtDlpInfo>(line).ok())
        .ok_or_else(|| {
            ExtractionError::Acquisition("yt-dlp did not report track metadata".to_string())
        })
}

fn find_wav(dir: &Path) -> Result<PathBuf, ExtractionError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if is_wav {
            return Ok(path);
        }
    }
    Err(ExtractionError::Acquisition(
        "yt-dlp finished without producing a WAV file".to_string(),
    ))
}
