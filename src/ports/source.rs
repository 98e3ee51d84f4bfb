//! Port trait wrapping the audio-source capabilities used by the pipeline.
//!
//! The production implementation shells out to `yt-dlp` (`youtube::client`);
//! tests use the generated mock.

use std::path::{Path, PathBuf};

use crate::descriptor::Candidate;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("audio source search failed: {message}")]
    Search { message: String },

    #[error("audio download failed: {message}")]
    Download { message: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AudioSource: Send + Sync {
    /// Query the source for up to `limit` candidates.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError>;

    /// Download the candidate's best available audio stream into
    /// `destination_dir`, returning the path of the raw file.
    async fn download(
        &self,
        candidate: &Candidate,
        destination_dir: &Path,
    ) -> Result<PathBuf, SourceError>;
}
