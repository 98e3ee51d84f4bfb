//! Core value types flowing through the download pipeline.

/// Hard cap on the number of tracks taken from a single album or playlist.
/// Excess source tracks are dropped at resolution, never errored.
pub const COLLECTION_TRACK_LIMIT: usize = 50;

/// Normalized, validated metadata for a single catalog track.
///
/// Produced once by the resolver and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub catalog_id: String,
    pub title: String,
    /// Ordered, primary artist first. Never empty after resolution.
    pub artists: Vec<String>,
    pub album: String,
    pub duration_secs: u32,
    pub track_number: u32,
    pub disc_number: u32,
    pub cover_art_url: Option<String>,
    /// Catalog release date, `YYYY` or `YYYY-MM-DD`.
    pub release_date: Option<String>,
}

impl TrackDescriptor {
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or_default()
    }

    pub fn joined_artists(&self) -> String {
        self.artists.join(", ")
    }

    /// Release year parsed from the leading digits of the release date.
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.as_deref()?.get(..4)?.parse().ok()
    }
}

/// An album or playlist resolved to its (capped) track listing.
#[derive(Debug, Clone)]
pub struct CollectionDescriptor {
    pub name: String,
    /// Track count declared by the catalog, before capping.
    pub total_tracks: usize,
    tracks: Vec<TrackDescriptor>,
}

impl CollectionDescriptor {
    pub fn new(name: String, total_tracks: usize, mut tracks: Vec<TrackDescriptor>) -> Self {
        tracks.truncate(COLLECTION_TRACK_LIMIT);
        Self {
            name,
            total_tracks,
            tracks,
        }
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }
}

/// One audio-source search result under consideration for a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub duration_secs: Option<u32>,
    /// Opaque source locator (watch URL or video id).
    pub locator: String,
}
