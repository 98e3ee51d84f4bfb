//! Tag writing, cover-art embedding, and output-file naming.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use audiotags::{AudioTag, AudioTagEdit, AudioTagWrite, Id3v2Tag, MimeType, Picture, Tag};

use crate::descriptor::TrackDescriptor;
use crate::pipeline::PipelineError;

/// Upper bound on accepted cover-art payloads.
pub const MAX_COVER_ART_BYTES: usize = 10 * 1024 * 1024;
/// Maximum length of a sanitized filename stem, in characters.
pub const MAX_FILENAME_CHARS: usize = 120;

const COVER_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Sanitize a name for filesystem use. Filesystem-unsafe and control
/// characters become spaces before whitespace collapse and truncation to
/// [`MAX_FILENAME_CHARS`]. Idempotent.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// The output filename stem for a track: `"Artist - Title"` sanitized.
pub fn output_stem(descriptor: &TrackDescriptor) -> String {
    let artist = if descriptor.primary_artist().is_empty() {
        "Unknown Artist"
    } else {
        descriptor.primary_artist()
    };
    let stem = sanitize_filename(&format!("{} - {}", artist, descriptor.title));
    if stem.is_empty() {
        descriptor.catalog_id.clone()
    } else {
        stem
    }
}

/// Shared namespace of in-flight and completed destination paths.
///
/// Concurrent collection runs may race on identical sanitized names; the
/// registry plus an on-disk existence check makes `reserve` hand out a
/// distinct path to each caller.
#[derive(Debug, Default)]
pub struct PathRegistry {
    reserved: Mutex<HashSet<PathBuf>>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a free destination path for `stem` inside `directory`,
    /// appending ` (2)`, ` (3)`, ... until the name collides with neither a
    /// reservation nor an existing file.
    pub fn reserve(&self, directory: &Path, stem: &str) -> PathBuf {
        let mut reserved = self
            .reserved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut candidate = directory.join(format!("{stem}.mp3"));
        let mut suffix = 1u32;
        while reserved.contains(&candidate) || candidate.exists() {
            suffix += 1;
            candidate = directory.join(format!("{stem} ({suffix}).mp3"));
        }
        reserved.insert(candidate.clone());
        candidate
    }

    /// Release a reservation after a failed run so the name can be reused.
    pub fn release(&self, path: &Path) {
        let mut reserved = self
            .reserved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        reserved.remove(path);
    }
}

/// Write the descriptor's metadata into the file's tag frames and embed the
/// cover art when it can be fetched. Cover-art failure degrades to a warning;
/// only tag read/write failures are fatal.
pub async fn apply_metadata(
    path: &Path,
    descriptor: &TrackDescriptor,
    http: &reqwest::Client,
) -> Result<(), PipelineError> {
    // A freshly transcoded file may carry no tag at all yet
    let mut tag: Box<dyn AudioTag + Send + Sync> = match Tag::new().read_from_path(path) {
        Ok(tag) => tag,
        Err(_) => Box::new(Id3v2Tag::new()),
    };

    tag.set_title(&descriptor.title);
    tag.set_artist(&descriptor.joined_artists());
    tag.set_album_title(&descriptor.album);
    if let Ok(track_number) = u16::try_from(descriptor.track_number)
        && track_number > 0
    {
        tag.set_track_number(track_number);
    }
    if let Ok(disc_number) = u16::try_from(descriptor.disc_number)
        && disc_number > 0
    {
        tag.set_disc_number(disc_number);
    }
    if let Some(year) = descriptor.release_year() {
        tag.set_year(year);
    }

    let cover = match &descriptor.cover_art_url {
        Some(url) => fetch_cover_art(http, url).await,
        None => None,
    };
    if let Some((data, mime_type)) = &cover {
        tag.set_album_cover(Picture::new(data, mime_type.clone()));
    }

    let path_str = path.to_str().ok_or_else(|| PipelineError::Tag {
        message: format!("non-UTF-8 path: {}", path.display()),
    })?;
    tag.write_to_path(path_str).map_err(|e| PipelineError::Tag {
        message: e.to_string(),
    })?;

    Ok(())
}

/// Fetch cover-art bytes: single attempt, bounded size, graceful failure.
async fn fetch_cover_art(http: &reqwest::Client, url: &str) -> Option<(Vec<u8>, MimeType)> {
    let response = match http
        .get(url)
        .timeout(COVER_FETCH_TIMEOUT)
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Cover art fetch failed, tagging without artwork: {e}");
            return None;
        }
    };

    let mime_type = match response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        Some(content_type) if content_type.contains("png") => MimeType::Png,
        _ => MimeType::Jpeg,
    };

    let data = match response.bytes().await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("Cover art read failed, tagging without artwork: {e}");
            return None;
        }
    };

    if data.len() > MAX_COVER_ART_BYTES {
        tracing::warn!(
            "Cover art too large ({} bytes), tagging without artwork",
            data.len()
        );
        return None;
    }

    Some((data.to_vec(), mime_type))
}
