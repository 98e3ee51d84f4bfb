//! Catalog reference classification.
//!
//! A user-supplied reference is classified as a track, album, or playlist
//! before any network call is made. Accepted forms:
//!
//! - `https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC`
//! - `https://open.spotify.com/intl-de/album/...` (locale path segments)
//! - `spotify:playlist:37i9dQZF1DXcBWIGoYBM5M`

use url::Url;

const CATALOG_ID_LEN: usize = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogReference {
    Track(String),
    Album(String),
    Playlist(String),
}

impl CatalogReference {
    /// Classify a reference string, returning `None` when it does not name
    /// a track, album, or playlist.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();

        if let Some(rest) = input.strip_prefix("spotify:") {
            let mut parts = rest.splitn(2, ':');
            let kind = parts.next()?;
            let id = parts.next()?;
            return Self::from_kind(kind, id);
        }

        let url = Url::parse(input).ok()?;
        if !matches!(url.host_str(), Some("open.spotify.com")) {
            return None;
        }
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        // Locale prefixes like `intl-de` may precede the kind segment
        for pair in segments.windows(2) {
            if let Some(reference) = Self::from_kind(pair[0], pair[1]) {
                return Some(reference);
            }
        }
        None
    }

    fn from_kind(kind: &str, id: &str) -> Option<Self> {
        if !is_catalog_id(id) {
            return None;
        }
        match kind {
            "track" => Some(Self::Track(id.to_string())),
            "album" => Some(Self::Album(id.to_string())),
            "playlist" => Some(Self::Playlist(id.to_string())),
            _ => None,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Track(id) | Self::Album(id) | Self::Playlist(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Track(_) => "track",
            Self::Album(_) => "album",
            Self::Playlist(_) => "playlist",
        }
    }
}

fn is_catalog_id(id: &str) -> bool {
    id.len() == CATALOG_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
}
