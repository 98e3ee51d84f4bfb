//! YouTube audio-source client backed by the external `yt-dlp` tool,
//! implementing the [`AudioSource`] port.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use color_eyre::Result;
use serde::Deserialize;
use tokio::process::Command;

use crate::descriptor::Candidate;
use crate::ports::source::{AudioSource, SourceError};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Output filename template for downloads; the extension is whatever format
/// the source served.
const DOWNLOAD_STEM: &str = "source";

/// One line of `yt-dlp --dump-json --flat-playlist` output.
#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    url: Option<String>,
}

pub struct YtDlpSource {
    binary: PathBuf,
}

impl YtDlpSource {
    pub fn new() -> Result<Self> {
        let binary = which::which("yt-dlp").map_err(|_| {
            color_eyre::eyre::eyre!(
                "yt-dlp not found in PATH. Please install yt-dlp and ensure it's available."
            )
        })?;
        Ok(Self { binary })
    }
}

fn entry_to_candidate(entry: SearchEntry) -> Option<Candidate> {
    let title = entry.title?;
    let locator = entry
        .url
        .or_else(|| entry.id.map(|id| format!("https://www.youtube.com/watch?v={id}")))?;
    Some(Candidate {
        title,
        duration_secs: entry.duration.map(|d| d.round() as u32),
        locator,
    })
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

#[async_trait::async_trait]
impl AudioSource for YtDlpSource {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let target = format!("ytsearch{limit}:{query}");
        tracing::debug!("Running yt-dlp search: {target}");

        let output = tokio::time::timeout(
            SEARCH_TIMEOUT,
            Command::new(&self.binary)
                .arg("--dump-json")
                .arg("--flat-playlist")
                .arg("--no-warnings")
                .arg(&target)
                .output(),
        )
        .await
        .map_err(|_| SourceError::Search {
            message: format!("search timed out after {}s", SEARCH_TIMEOUT.as_secs()),
        })?
        .map_err(|e| SourceError::Search {
            message: format!("failed to run yt-dlp: {e}"),
        })?;

        if !output.status.success() {
            return Err(SourceError::Search {
                message: stderr_excerpt(&output),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let candidates = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<SearchEntry>(line).ok())
            .filter_map(entry_to_candidate)
            .collect();

        Ok(candidates)
    }

    async fn download(
        &self,
        candidate: &Candidate,
        destination_dir: &Path,
    ) -> Result<PathBuf, SourceError> {
        let template = destination_dir.join(format!("{DOWNLOAD_STEM}.%(ext)s"));
        tracing::debug!("Downloading audio for: {}", candidate.locator);

        let output = tokio::time::timeout(
            DOWNLOAD_TIMEOUT,
            Command::new(&self.binary)
                .arg("-f")
                .arg("bestaudio/best")
                .arg("--no-playlist")
                .arg("--no-warnings")
                .arg("-o")
                .arg(&template)
                .arg(&candidate.locator)
                .output(),
        )
        .await
        .map_err(|_| SourceError::Download {
            message: format!("download timed out after {}s", DOWNLOAD_TIMEOUT.as_secs()),
        })?
        .map_err(|e| SourceError::Download {
            message: format!("failed to run yt-dlp: {e}"),
        })?;

        if !output.status.success() {
            return Err(SourceError::Download {
                message: stderr_excerpt(&output),
            });
        }

        // yt-dlp substitutes the real extension; locate the produced file
        let entries = std::fs::read_dir(destination_dir).map_err(|e| SourceError::Download {
            message: format!("failed to read download directory: {e}"),
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem == DOWNLOAD_STEM)
            {
                return Ok(path);
            }
        }

        Err(SourceError::Download {
            message: "yt-dlp reported success but produced no file".to_string(),
        })
    }
}
