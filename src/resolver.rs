//! Metadata resolution: classify a catalog reference, query the catalog,
//! and validate raw payloads into descriptors.
//!
//! Validation happens here and nowhere else: downstream stages may assume a
//! `TrackDescriptor` is complete. Malformed payloads are rejected as
//! upstream failures instead of propagating missing fields.

use crate::descriptor::{CollectionDescriptor, TrackDescriptor};
use crate::pipeline::PipelineError;
use crate::ports::catalog::{CatalogClient, CatalogError, RawCollection, RawTrack};
use crate::reference::CatalogReference;

#[derive(Debug, Clone)]
pub enum Resolved {
    Track(TrackDescriptor),
    Collection(CollectionDescriptor),
}

pub async fn resolve(catalog: &dyn CatalogClient, input: &str) -> Result<Resolved, PipelineError> {
    let reference = CatalogReference::parse(input).ok_or_else(|| PipelineError::NotFound {
        reference: input.to_string(),
    })?;
    tracing::debug!("Resolved reference as {}: {}", reference.kind(), reference.id());

    match &reference {
        CatalogReference::Track(id) => {
            let raw = catalog.get_track(id).await.map_err(from_catalog_error)?;
            Ok(Resolved::Track(validate_track(raw)?))
        }
        CatalogReference::Album(id) => {
            let raw = catalog.get_album(id).await.map_err(from_catalog_error)?;
            Ok(Resolved::Collection(validate_collection(raw)?))
        }
        CatalogReference::Playlist(id) => {
            let raw = catalog.get_playlist(id).await.map_err(from_catalog_error)?;
            Ok(Resolved::Collection(validate_collection(raw)?))
        }
    }
}

fn from_catalog_error(error: CatalogError) -> PipelineError {
    match error {
        CatalogError::NotFound { reference } => PipelineError::NotFound { reference },
        CatalogError::Upstream { message } => PipelineError::Upstream { message },
    }
}

fn validate_track(raw: RawTrack) -> Result<TrackDescriptor, PipelineError> {
    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| malformed(&raw.id, "missing title"))?;

    if raw.artists.iter().all(|a| a.trim().is_empty()) {
        return Err(malformed(&raw.id, "missing artists"));
    }

    let duration_ms = raw
        .duration_ms
        .filter(|&ms| ms > 0)
        .ok_or_else(|| malformed(&raw.id, "missing duration"))?;

    Ok(TrackDescriptor {
        catalog_id: raw.id,
        title,
        artists: raw
            .artists
            .into_iter()
            .filter(|a| !a.trim().is_empty())
            .collect(),
        album: raw.album.unwrap_or_default(),
        duration_secs: ((duration_ms + 500) / 1000) as u32,
        track_number: raw.track_number.unwrap_or(0),
        disc_number: raw.disc_number.unwrap_or(0),
        cover_art_url: raw.cover_art_url,
        release_date: raw.release_date,
    })
}

fn validate_collection(raw: RawCollection) -> Result<CollectionDescriptor, PipelineError> {
    let name = raw
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| malformed(&raw.id, "missing collection name"))?;

    let declared_total = raw.total_tracks.unwrap_or(raw.tracks.len());

    // Individual malformed entries (podcast episodes, region-blocked items)
    // are skipped rather than failing the whole collection
    let mut tracks = Vec::with_capacity(raw.tracks.len());
    for raw_track in raw.tracks {
        match validate_track(raw_track) {
            Ok(track) => tracks.push(track),
            Err(e) => tracing::warn!("Skipping malformed collection entry: {e}"),
        }
    }

    Ok(CollectionDescriptor::new(name, declared_total, tracks))
}

fn malformed(id: &str, detail: &str) -> PipelineError {
    PipelineError::Upstream {
        message: format!("malformed catalog payload for {id}: {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::COLLECTION_TRACK_LIMIT;
    use crate::ports::catalog::MockCatalogClient;

    const TRACK_ID: &str = "4uLU6hMCjMI75M1A2tKUQC";

    fn raw_track(id: &str, title: &str) -> RawTrack {
        RawTrack {
            id: id.to_string(),
            title: Some(title.to_string()),
            artists: vec!["Artist".to_string()],
            album: Some("Album".to_string()),
            duration_ms: Some(200_000),
            track_number: Some(1),
            disc_number: Some(1),
            cover_art_url: Some("https://images.invalid/cover.jpg".to_string()),
            release_date: Some("2020-01-31".to_string()),
        }
    }

    #[tokio::test]
    async fn test_resolves_valid_track() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_get_track()
            .returning(|id| Ok(raw_track(id, "Test Song")));

        let resolved = resolve(&catalog, &format!("spotify:track:{TRACK_ID}"))
            .await
            .unwrap();
        match resolved {
            Resolved::Track(track) => {
                assert_eq!(track.title, "Test Song");
                assert_eq!(track.duration_secs, 200);
                assert_eq!(track.catalog_id, TRACK_ID);
            }
            Resolved::Collection(_) => panic!("expected a track"),
        }
    }

    #[tokio::test]
    async fn test_unclassifiable_reference_is_not_found() {
        let catalog = MockCatalogClient::new();
        let result = resolve(&catalog, "https://example.com/nope").await;
        assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_catalog_not_found_passes_through() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_get_track().returning(|id| {
            Err(CatalogError::NotFound {
                reference: id.to_string(),
            })
        });

        let result = resolve(&catalog, &format!("spotify:track:{TRACK_ID}")).await;
        assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_track_missing_duration_is_upstream() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_get_track().returning(|id| {
            let mut raw = raw_track(id, "Test Song");
            raw.duration_ms = None;
            Ok(raw)
        });

        let result = resolve(&catalog, &format!("spotify:track:{TRACK_ID}")).await;
        assert!(matches!(result, Err(PipelineError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_track_missing_title_is_upstream() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_get_track().returning(|id| {
            let mut raw = raw_track(id, "");
            raw.title = Some("   ".to_string());
            Ok(raw)
        });

        let result = resolve(&catalog, &format!("spotify:track:{TRACK_ID}")).await;
        assert!(matches!(result, Err(PipelineError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_collection_is_capped_in_order() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_get_playlist().returning(|id| {
            Ok(RawCollection {
                id: id.to_string(),
                name: Some("Big Playlist".to_string()),
                total_tracks: Some(80),
                tracks: (0..80)
                    .map(|i| raw_track(&format!("id{i}"), &format!("Track {i}")))
                    .collect(),
            })
        });

        let resolved = resolve(&catalog, &format!("spotify:playlist:{TRACK_ID}"))
            .await
            .unwrap();
        match resolved {
            Resolved::Collection(collection) => {
                assert_eq!(collection.tracks().len(), COLLECTION_TRACK_LIMIT);
                assert_eq!(collection.total_tracks, 80);
                assert_eq!(collection.tracks()[0].title, "Track 0");
                assert_eq!(collection.tracks()[49].title, "Track 49");
            }
            Resolved::Track(_) => panic!("expected a collection"),
        }
    }

    #[tokio::test]
    async fn test_collection_skips_malformed_entries() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_get_album().returning(|id| {
            let mut broken = raw_track("broken", "No Duration");
            broken.duration_ms = None;
            Ok(RawCollection {
                id: id.to_string(),
                name: Some("Album".to_string()),
                total_tracks: Some(3),
                tracks: vec![
                    raw_track("a", "First"),
                    broken,
                    raw_track("c", "Third"),
                ],
            })
        });

        let resolved = resolve(&catalog, &format!("spotify:album:{TRACK_ID}"))
            .await
            .unwrap();
        match resolved {
            Resolved::Collection(collection) => {
                let titles: Vec<_> =
                    collection.tracks().iter().map(|t| t.title.as_str()).collect();
                assert_eq!(titles, vec!["First", "Third"]);
            }
            Resolved::Track(_) => panic!("expected a collection"),
        }
    }

    #[tokio::test]
    async fn test_empty_collection_resolves_to_empty_track_list() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_get_playlist().returning(|id| {
            Ok(RawCollection {
                id: id.to_string(),
                name: Some("Empty".to_string()),
                total_tracks: Some(0),
                tracks: vec![],
            })
        });

        let resolved = resolve(&catalog, &format!("spotify:playlist:{TRACK_ID}"))
            .await
            .unwrap();
        match resolved {
            Resolved::Collection(collection) => assert!(collection.tracks().is_empty()),
            Resolved::Track(_) => panic!("expected a collection"),
        }
    }
}
