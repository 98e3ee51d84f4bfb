//! The match-download-tag pipeline and its per-track error taxonomy.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::best_match::find_best_match;
use crate::descriptor::{CollectionDescriptor, TrackDescriptor};
use crate::fetcher::Fetcher;
use crate::ports::catalog::CatalogClient;
use crate::ports::source::AudioSource;
use crate::resolver::{self, Resolved};
use crate::tagger::{self, PathRegistry};

#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("catalog reference not found: {reference}")]
    NotFound { reference: String },

    #[error("catalog service failure: {message}")]
    Upstream { message: String },

    #[error("no acceptable audio candidate for '{title}' by '{artist}'")]
    NoMatch { title: String, artist: String },

    #[error("audio download failed: {message}")]
    Download { message: String },

    #[error("audio transcode failed: {message}")]
    Transcode { message: String },

    #[error("tag write failed: {message}")]
    Tag { message: String },
}

/// Cooperative cancellation flag, checked between tracks of a collection
/// run. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of one track's pipeline run.
#[derive(Debug)]
pub struct TrackReport {
    pub descriptor: TrackDescriptor,
    pub outcome: Result<PathBuf, PipelineError>,
}

/// Ordered per-track outcomes of a collection run. One track's failure
/// never aborts its siblings; a cancelled run is truncated at a track
/// boundary.
#[derive(Debug)]
pub struct CollectionReport {
    pub name: String,
    pub total_tracks: usize,
    pub reports: Vec<TrackReport>,
    pub cancelled: bool,
}

impl CollectionReport {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }
}

pub struct Pipeline {
    catalog: Arc<dyn CatalogClient>,
    source: Arc<dyn AudioSource>,
    fetcher: Fetcher,
    http: reqwest::Client,
    registry: PathRegistry,
    output_directory: PathBuf,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        source: Arc<dyn AudioSource>,
        fetcher: Fetcher,
        output_directory: PathBuf,
    ) -> Self {
        Self {
            catalog,
            source,
            fetcher,
            http: reqwest::Client::new(),
            registry: PathRegistry::new(),
            output_directory,
        }
    }

    /// Classify and resolve a catalog reference into a track or collection.
    pub async fn resolve(&self, reference: &str) -> Result<Resolved, PipelineError> {
        resolver::resolve(self.catalog.as_ref(), reference).await
    }

    /// Run the full match-download-tag sequence for one track.
    pub async fn run_track(&self, descriptor: &TrackDescriptor) -> TrackReport {
        tracing::info!(
            "Processing '{}' by '{}'",
            descriptor.title,
            descriptor.primary_artist()
        );

        let outcome = self.download_track(descriptor).await;
        match &outcome {
            Ok(path) => tracing::info!("Finished: {}", path.display()),
            Err(e) => tracing::warn!(
                "Failed '{}' by '{}': {e}",
                descriptor.title,
                descriptor.primary_artist()
            ),
        }

        TrackReport {
            descriptor: descriptor.clone(),
            outcome,
        }
    }

    /// Run every track of a collection sequentially, continuing past
    /// failures and honoring cancellation between tracks.
    pub async fn run_collection(
        &self,
        collection: &CollectionDescriptor,
        cancel: &CancelFlag,
    ) -> CollectionReport {
        let mut reports = Vec::with_capacity(collection.tracks().len());
        let mut cancelled = false;

        for descriptor in collection.tracks() {
            if cancel.is_cancelled() {
                tracing::info!(
                    "Cancelled collection '{}' after {} of {} tracks",
                    collection.name,
                    reports.len(),
                    collection.tracks().len()
                );
                cancelled = true;
                break;
            }
            reports.push(self.run_track(descriptor).await);
        }

        CollectionReport {
            name: collection.name.clone(),
            total_tracks: collection.total_tracks,
            reports,
            cancelled,
        }
    }

    async fn download_track(
        &self,
        descriptor: &TrackDescriptor,
    ) -> Result<PathBuf, PipelineError> {
        let candidate = find_best_match(self.source.as_ref(), descriptor).await?;
        tracing::debug!("Selected candidate: {} ({})", candidate.title, candidate.locator);

        // `temp_dir` owns every intermediate until the tagged file has been
        // moved out; dropping it cleans up on all paths
        let (temp_dir, transcoded) = self.fetcher.fetch(&candidate).await?;

        let destination = self
            .registry
            .reserve(&self.output_directory, &tagger::output_stem(descriptor));

        let result = self
            .tag_and_persist(&transcoded, &destination, descriptor)
            .await;
        if result.is_err() {
            self.registry.release(&destination);
        }
        drop(temp_dir);

        result.map(|()| destination)
    }

    async fn tag_and_persist(
        &self,
        transcoded: &Path,
        destination: &Path,
        descriptor: &TrackDescriptor,
    ) -> Result<(), PipelineError> {
        tagger::apply_metadata(transcoded, descriptor, &self.http).await?;
        persist(transcoded, destination)
    }
}

/// Move a finished file into the output directory. Rename first; fall back
/// to copy-and-remove for cross-filesystem moves.
fn persist(from: &Path, to: &Path) -> Result<(), PipelineError> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    std::fs::copy(from, to).map_err(|e| PipelineError::Download {
        message: format!(
            "failed to place output file {} -> {}: {e}",
            from.display(),
            to.display()
        ),
    })?;
    if let Err(e) = std::fs::remove_file(from) {
        tracing::warn!("Failed to remove intermediate {}: {e}", from.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Candidate;
    use crate::ports::catalog::MockCatalogClient;
    use crate::ports::source::{MockAudioSource, SourceError};

    fn make_descriptor(title: &str) -> TrackDescriptor {
        TrackDescriptor {
            catalog_id: format!("id-{title}"),
            title: title.to_string(),
            artists: vec!["Artist".to_string()],
            album: "Album".to_string(),
            duration_secs: 200,
            track_number: 1,
            disc_number: 1,
            cover_art_url: None,
            release_date: None,
        }
    }

    fn make_collection(titles: &[&str]) -> CollectionDescriptor {
        CollectionDescriptor::new(
            "Collection".to_string(),
            titles.len(),
            titles.iter().map(|t| make_descriptor(t)).collect(),
        )
    }

    /// Pipeline whose audio source fails every search. The fetcher's ffmpeg
    /// path is never exercised.
    fn failing_pipeline(output_directory: PathBuf) -> Pipeline {
        let mut source = MockAudioSource::new();
        source.expect_search().returning(|_, _| {
            Err(SourceError::Search {
                message: "source offline".to_string(),
            })
        });
        let source: Arc<dyn AudioSource> = Arc::new(source);
        let fetcher = Fetcher::new(source.clone(), PathBuf::from("ffmpeg"));
        Pipeline::new(
            Arc::new(MockCatalogClient::new()),
            source,
            fetcher,
            output_directory,
        )
    }

    /// Pipeline whose source finds no candidates at all.
    fn no_match_pipeline(output_directory: PathBuf) -> Pipeline {
        let mut source = MockAudioSource::new();
        source.expect_search().returning(|_, _| Ok(vec![]));
        let source: Arc<dyn AudioSource> = Arc::new(source);
        let fetcher = Fetcher::new(source.clone(), PathBuf::from("ffmpeg"));
        Pipeline::new(
            Arc::new(MockCatalogClient::new()),
            source,
            fetcher,
            output_directory,
        )
    }

    #[tokio::test]
    async fn test_run_track_reports_failure_kind() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = no_match_pipeline(dir.path().to_path_buf());

        let report = pipeline.run_track(&make_descriptor("Test Song")).await;
        assert!(matches!(report.outcome, Err(PipelineError::NoMatch { .. })));
        assert_eq!(report.descriptor.title, "Test Song");
    }

    #[tokio::test]
    async fn test_collection_continues_past_failures_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = failing_pipeline(dir.path().to_path_buf());
        let collection = make_collection(&["One", "Two", "Three"]);

        let report = pipeline
            .run_collection(&collection, &CancelFlag::new())
            .await;

        assert_eq!(report.reports.len(), 3);
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 3);
        assert!(!report.cancelled);
        let titles: Vec<_> = report
            .reports
            .iter()
            .map(|r| r.descriptor.title.as_str())
            .collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        for track in &report.reports {
            assert!(matches!(track.outcome, Err(PipelineError::Upstream { .. })));
        }
    }

    #[tokio::test]
    async fn test_empty_collection_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = failing_pipeline(dir.path().to_path_buf());
        let collection = make_collection(&[]);

        let report = pipeline
            .run_collection(&collection, &CancelFlag::new())
            .await;
        assert!(report.reports.is_empty());
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = failing_pipeline(dir.path().to_path_buf());
        let collection = make_collection(&["One", "Two"]);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let report = pipeline.run_collection(&collection, &cancel).await;

        assert!(report.cancelled);
        assert!(report.reports.is_empty());
    }

    #[tokio::test]
    async fn test_failed_tracks_do_not_leak_reserved_names() {
        // Two same-named tracks that both fail must not permanently consume
        // "Artist - Same.mp3" and "Artist - Same (2).mp3"
        let dir = tempfile::tempdir().unwrap();
        let pipeline = failing_pipeline(dir.path().to_path_buf());

        let descriptor = make_descriptor("Same");
        let first = pipeline.run_track(&descriptor).await;
        let second = pipeline.run_track(&descriptor).await;
        assert!(first.outcome.is_err());
        assert!(second.outcome.is_err());

        let reserved = pipeline
            .registry
            .reserve(dir.path(), &tagger::output_stem(&descriptor));
        assert_eq!(reserved, dir.path().join("Artist - Same.mp3"));
    }

    #[test]
    fn test_persist_copies_across_filesystems_or_renames() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from.mp3");
        let to = dir.path().join("to.mp3");
        std::fs::write(&from, b"audio").unwrap();

        persist(&from, &to).unwrap();
        assert!(to.is_file());
        assert!(!from.exists());
    }

    #[test]
    fn test_cancel_flag_is_shared_across_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
