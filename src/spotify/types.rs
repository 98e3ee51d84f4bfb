use serde::Deserialize;

/// Spotify token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Spotify track from API
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbumSummary>,
    pub duration_ms: Option<i64>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
}

/// Simplified track as it appears in album track listings (no album field)
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbumTrack {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub duration_ms: Option<i64>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

/// Album summary nested inside a track payload
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbumSummary {
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    pub release_date: Option<String>,
}

/// Full album from API, first track page inlined
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    pub release_date: Option<String>,
    pub tracks: SpotifyPage<SpotifyAlbumTrack>,
}

/// Playlist from API, first track page inlined
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub name: Option<String>,
    pub tracks: SpotifyPage<SpotifyPlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistItem {
    /// Null for removed or locally-added tracks; skipped during resolution
    pub track: Option<SpotifyTrack>,
}

/// Generic paging envelope used by album and playlist track listings
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPage<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub total: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}
