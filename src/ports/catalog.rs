//! Port trait wrapping the catalog API capabilities used by the pipeline.
//!
//! The production implementation lives in `spotify::client`; tests use the
//! generated mock.

/// Unvalidated track payload as returned by the catalog. The resolver is
/// responsible for turning this into a `TrackDescriptor` or rejecting it.
#[derive(Debug, Clone, Default)]
pub struct RawTrack {
    pub id: String,
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub cover_art_url: Option<String>,
    pub release_date: Option<String>,
}

/// Unvalidated album/playlist payload with its track listing.
#[derive(Debug, Clone, Default)]
pub struct RawCollection {
    pub id: String,
    pub name: Option<String>,
    /// Track count declared by the catalog, which may exceed `tracks.len()`
    /// when the implementation stopped paging at the collection cap.
    pub total_tracks: Option<usize>,
    pub tracks: Vec<RawTrack>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog entity not found: {reference}")]
    NotFound { reference: String },

    #[error("catalog request failed: {message}")]
    Upstream { message: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn get_track(&self, id: &str) -> Result<RawTrack, CatalogError>;
    async fn get_album(&self, id: &str) -> Result<RawCollection, CatalogError>;
    async fn get_playlist(&self, id: &str) -> Result<RawCollection, CatalogError>;
}
