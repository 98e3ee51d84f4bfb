//! Search the audio source for a track and select the best candidate.

use crate::descriptor::{Candidate, TrackDescriptor};
use crate::matcher::{self, MatchScore};
use crate::pipeline::PipelineError;
use crate::ports::source::{AudioSource, SourceError};

/// Number of search results requested from the audio source.
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Minimum combined score for accepting a candidate.
///
/// A perfect-duration candidate with mediocre title text clears this easily
/// (duration alone contributes 0.6), while a perfect-text candidate with an
/// out-of-window duration does not (text alone caps at 0.4). That asymmetry
/// is intentional: near-duplicate titles (live cuts, remixes, sped-up edits)
/// read almost identically, and duration is what tells them apart.
pub const MIN_ACCEPT_SCORE: f64 = 0.50;

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub result: MatchScore,
}

/// Build the source search query for a track. Always includes the primary
/// artist and the title.
pub fn build_search_query(descriptor: &TrackDescriptor) -> String {
    format!(
        "{} {} official audio",
        descriptor.primary_artist(),
        descriptor.title
    )
    .trim()
    .to_string()
}

/// Score all candidates against the descriptor, ordered by descending score.
/// The sort is stable: equal scores keep search-result order, so the
/// first-seen candidate wins ties.
pub fn rank_candidates(
    descriptor: &TrackDescriptor,
    candidates: Vec<Candidate>,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let result = matcher::score_candidate(descriptor, &candidate);
            ScoredCandidate { candidate, result }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.result
            .score
            .partial_cmp(&a.result.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    scored
}

/// Search the audio source and return the best acceptable candidate, or
/// `NoMatch` when no candidate clears [`MIN_ACCEPT_SCORE`].
pub async fn find_best_match(
    source: &dyn AudioSource,
    descriptor: &TrackDescriptor,
) -> Result<Candidate, PipelineError> {
    let query = build_search_query(descriptor);
    tracing::debug!("Searching audio source with query: {query}");

    let candidates = source
        .search(&query, SEARCH_RESULT_LIMIT)
        .await
        .map_err(|e| match e {
            SourceError::Search { message } => PipelineError::Upstream { message },
            SourceError::Download { message } => PipelineError::Download { message },
        })?;

    let scored = rank_candidates(descriptor, candidates);

    for (i, entry) in scored.iter().take(3).enumerate() {
        tracing::debug!(
            "Candidate #{} for '{}' by '{}': score={:.3}, duration={:.3}, text={:.3}, title={}",
            i + 1,
            descriptor.title,
            descriptor.primary_artist(),
            entry.result.score,
            entry.result.duration_score,
            entry.result.text_score,
            entry.candidate.title,
        );
    }

    match scored.into_iter().next() {
        Some(best) if best.result.score >= MIN_ACCEPT_SCORE => Ok(best.candidate),
        Some(best) => {
            tracing::debug!(
                "Best candidate for '{}' scored {:.3}, below threshold {MIN_ACCEPT_SCORE}",
                descriptor.title,
                best.result.score,
            );
            Err(no_match(descriptor))
        }
        None => Err(no_match(descriptor)),
    }
}

fn no_match(descriptor: &TrackDescriptor) -> PipelineError {
    PipelineError::NoMatch {
        title: descriptor.title.clone(),
        artist: descriptor.primary_artist().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::source::MockAudioSource;

    fn make_descriptor(title: &str, artist: &str, duration_secs: u32) -> TrackDescriptor {
        TrackDescriptor {
            catalog_id: "test".to_string(),
            title: title.to_string(),
            artists: vec![artist.to_string()],
            album: "Album".to_string(),
            duration_secs,
            track_number: 1,
            disc_number: 1,
            cover_art_url: None,
            release_date: None,
        }
    }

    fn make_candidate(title: &str, duration_secs: Option<u32>, locator: &str) -> Candidate {
        Candidate {
            title: title.to_string(),
            duration_secs,
            locator: locator.to_string(),
        }
    }

    fn source_returning(candidates: Vec<Candidate>) -> MockAudioSource {
        let mut source = MockAudioSource::new();
        source
            .expect_search()
            .returning(move |_, _| Ok(candidates.clone()));
        source
    }

    #[test]
    fn test_query_includes_artist_and_title() {
        let descriptor = make_descriptor("Bohemian Rhapsody", "Queen", 354);
        let query = build_search_query(&descriptor);
        assert!(query.contains("Queen"));
        assert!(query.contains("Bohemian Rhapsody"));
    }

    #[tokio::test]
    async fn test_picks_exact_duration_over_live_version() {
        let descriptor = make_descriptor("Test Song", "Artist", 200);
        let source = source_returning(vec![
            make_candidate("Test Song (Live)", Some(205), "live"),
            make_candidate("Test Song", Some(201), "exact"),
        ]);

        let best = find_best_match(&source, &descriptor).await.unwrap();
        assert_eq!(best.locator, "exact");
    }

    #[tokio::test]
    async fn test_no_candidates_is_no_match() {
        let descriptor = make_descriptor("Test Song", "Artist", 200);
        let source = source_returning(vec![]);

        let result = find_best_match(&source, &descriptor).await;
        assert!(matches!(result, Err(PipelineError::NoMatch { .. })));
    }

    #[tokio::test]
    async fn test_all_below_threshold_is_no_match() {
        let descriptor = make_descriptor("Bohemian Rhapsody", "Queen", 354);
        // Unrelated titles with hopeless durations
        let source = source_returning(vec![
            make_candidate("Completely Different Thing", Some(90), "a"),
            make_candidate("Ten Hour Rain Sounds", None, "b"),
        ]);

        let result = find_best_match(&source, &descriptor).await;
        assert!(matches!(result, Err(PipelineError::NoMatch { .. })));
    }

    #[tokio::test]
    async fn test_tie_breaks_to_first_seen() {
        let descriptor = make_descriptor("Test Song", "Artist", 200);
        let source = source_returning(vec![
            make_candidate("Artist - Test Song", Some(200), "first"),
            make_candidate("Artist - Test Song", Some(200), "second"),
        ]);

        let best = find_best_match(&source, &descriptor).await.unwrap();
        assert_eq!(best.locator, "first");
    }

    #[tokio::test]
    async fn test_search_failure_maps_to_upstream() {
        let descriptor = make_descriptor("Test Song", "Artist", 200);
        let mut source = MockAudioSource::new();
        source.expect_search().returning(|_, _| {
            Err(SourceError::Search {
                message: "network down".to_string(),
            })
        });

        let result = find_best_match(&source, &descriptor).await;
        assert!(matches!(result, Err(PipelineError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_selection_is_deterministic() {
        let descriptor = make_descriptor("Test Song", "Artist", 200);
        let candidates = vec![
            make_candidate("Test Song (Sped Up)", Some(170), "sped"),
            make_candidate("Test Song", Some(199), "good"),
            make_candidate("Test Song (8D Audio)", Some(203), "8d"),
        ];

        for _ in 0..3 {
            let source = source_returning(candidates.clone());
            let best = find_best_match(&source, &descriptor).await.unwrap();
            assert_eq!(best.locator, "good");
        }
    }
}
