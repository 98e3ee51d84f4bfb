//! Download-and-transcode stage: raw best-audio stream in, fixed-bitrate
//! MP3 out, everything staged inside a temp directory whose guard cleans up
//! intermediates on success and failure alike.

use std::path::PathBuf;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tempfile::TempDir;
use tokio::process::Command;

use crate::descriptor::Candidate;
use crate::pipeline::PipelineError;
use crate::ports::source::{AudioSource, SourceError};

/// Fixed transcode target: single-file MP3 at this bitrate.
pub const TARGET_BITRATE: &str = "256k";

const TRANSCODE_TIMEOUT: Duration = Duration::from_secs(120);
const TRANSCODED_FILENAME: &str = "transcoded.mp3";

pub struct Fetcher {
    source: Arc<dyn AudioSource>,
    ffmpeg: PathBuf,
}

impl Fetcher {
    pub fn new(source: Arc<dyn AudioSource>, ffmpeg: PathBuf) -> Self {
        Self { source, ffmpeg }
    }

    /// Locate the ffmpeg binary, failing at startup when it is missing.
    pub fn locate_ffmpeg() -> Result<PathBuf> {
        which::which("ffmpeg").map_err(|_| {
            color_eyre::eyre::eyre!(
                "ffmpeg not found in PATH. Please install ffmpeg and ensure it's available."
            )
        })
    }

    /// Download the candidate's audio and transcode it to MP3. The returned
    /// `TempDir` owns both the raw download and the transcoded file; the
    /// caller must move the file out before dropping the guard.
    pub async fn fetch(&self, candidate: &Candidate) -> Result<(TempDir, PathBuf), PipelineError> {
        let temp_dir = tempfile::tempdir().map_err(|e| PipelineError::Download {
            message: format!("failed to create temp directory: {e}"),
        })?;

        let raw = self
            .source
            .download(candidate, temp_dir.path())
            .await
            .map_err(|e| match e {
                SourceError::Search { message } | SourceError::Download { message } => {
                    PipelineError::Download { message }
                }
            })?;

        let transcoded = temp_dir.path().join(TRANSCODED_FILENAME);
        tracing::debug!(
            "Transcoding {} to {} at {TARGET_BITRATE}",
            raw.display(),
            transcoded.display()
        );

        let output = tokio::time::timeout(
            TRANSCODE_TIMEOUT,
            Command::new(&self.ffmpeg)
                .arg("-y")
                .arg("-hide_banner")
                .arg("-loglevel")
                .arg("error")
                .arg("-i")
                .arg(&raw)
                .arg("-vn")
                .arg("-codec:a")
                .arg("libmp3lame")
                .arg("-b:a")
                .arg(TARGET_BITRATE)
                .arg(&transcoded)
                .output(),
        )
        .await
        .map_err(|_| PipelineError::Transcode {
            message: format!("transcode timed out after {}s", TRANSCODE_TIMEOUT.as_secs()),
        })?
        .map_err(|e| PipelineError::Transcode {
            message: format!("failed to run ffmpeg: {e}"),
        })?;

        if !output.status.success() {
            return Err(PipelineError::Transcode {
                message: stderr_excerpt(&output),
            });
        }

        if !transcoded.is_file() {
            return Err(PipelineError::Transcode {
                message: "ffmpeg reported success but produced no file".to_string(),
            });
        }

        Ok((temp_dir, transcoded))
    }
}

fn stderr_excerpt(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("no error output")
        .trim()
        .to_string()
}
