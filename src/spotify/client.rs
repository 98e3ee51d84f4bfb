//! Spotify Web API client implementing the [`CatalogClient`] port.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::descriptor::COLLECTION_TRACK_LIMIT;
use crate::ports::catalog::{CatalogClient, CatalogError, RawCollection, RawTrack};
use crate::spotify::auth::TokenManager;
use crate::spotify::types::{
    SpotifyAlbum, SpotifyAlbumTrack, SpotifyPage, SpotifyPlaylist, SpotifyPlaylistItem,
    SpotifyTrack,
};

const API_BASE: &str = "https://api.spotify.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SpotifyClient {
    http: reqwest::Client,
    tokens: TokenManager,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        let http = reqwest::Client::new();
        let tokens = TokenManager::new(client_id, client_secret, http.clone());
        Self { http, tokens }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| CatalogError::Upstream {
                message: e.to_string(),
            })?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| CatalogError::Upstream {
                message: e.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound {
                reference: url.to_string(),
            });
        }

        let response = response
            .error_for_status()
            .map_err(|e| CatalogError::Upstream {
                message: e.to_string(),
            })?;

        response.json().await.map_err(|e| CatalogError::Upstream {
            message: format!("malformed catalog payload: {e}"),
        })
    }

    /// Follow a paging cursor until it runs out or `collected` reaches the
    /// collection cap. There is no point paging a 10k-track playlist we will
    /// truncate to 50 anyway.
    async fn drain_pages<T: DeserializeOwned>(
        &self,
        mut next: Option<String>,
        collected: &mut Vec<T>,
    ) -> Result<(), CatalogError> {
        while let Some(url) = next {
            if collected.len() >= COLLECTION_TRACK_LIMIT {
                break;
            }
            let page: SpotifyPage<T> = self.get_json(&url).await?;
            collected.extend(page.items);
            next = page.next;
        }
        Ok(())
    }
}

fn map_track(track: SpotifyTrack) -> RawTrack {
    let album = track.album;
    RawTrack {
        id: track.id,
        title: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: album.as_ref().and_then(|a| a.name.clone()),
        duration_ms: track.duration_ms,
        track_number: track.track_number,
        disc_number: track.disc_number,
        cover_art_url: album
            .as_ref()
            .and_then(|a| a.images.first())
            .map(|image| image.url.clone()),
        release_date: album.and_then(|a| a.release_date),
    }
}

/// Album track listings omit the album itself; fill those fields from the
/// parent album payload.
fn map_album_track(
    track: SpotifyAlbumTrack,
    album_name: Option<&str>,
    cover_art_url: Option<&str>,
    release_date: Option<&str>,
) -> RawTrack {
    RawTrack {
        id: track.id,
        title: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: album_name.map(str::to_string),
        duration_ms: track.duration_ms,
        track_number: track.track_number,
        disc_number: track.disc_number,
        cover_art_url: cover_art_url.map(str::to_string),
        release_date: release_date.map(str::to_string),
    }
}

#[async_trait::async_trait]
impl CatalogClient for SpotifyClient {
    async fn get_track(&self, id: &str) -> Result<RawTrack, CatalogError> {
        let track: SpotifyTrack = self.get_json(&format!("{API_BASE}/tracks/{id}")).await?;
        Ok(map_track(track))
    }

    async fn get_album(&self, id: &str) -> Result<RawCollection, CatalogError> {
        let album: SpotifyAlbum = self.get_json(&format!("{API_BASE}/albums/{id}")).await?;

        let total = album.tracks.total;
        let mut items = album.tracks.items;
        self.drain_pages(album.tracks.next, &mut items).await?;

        let album_name = album.name.as_deref();
        let cover_art_url = album.images.first().map(|image| image.url.as_str());
        let release_date = album.release_date.as_deref();

        Ok(RawCollection {
            id: id.to_string(),
            name: album.name.clone(),
            total_tracks: total,
            tracks: items
                .into_iter()
                .map(|t| map_album_track(t, album_name, cover_art_url, release_date))
                .collect(),
        })
    }

    async fn get_playlist(&self, id: &str) -> Result<RawCollection, CatalogError> {
        let playlist: SpotifyPlaylist =
            self.get_json(&format!("{API_BASE}/playlists/{id}")).await?;

        let total = playlist.tracks.total;
        let mut items = playlist.tracks.items;
        self.drain_pages(playlist.tracks.next, &mut items).await?;

        let tracks = items
            .into_iter()
            // Removed and locally-added playlist entries have no track object
            .filter_map(|item: SpotifyPlaylistItem| item.track)
            .map(map_track)
            .collect();

        Ok(RawCollection {
            id: id.to_string(),
            name: playlist.name,
            total_tracks: total,
            tracks,
        })
    }
}
