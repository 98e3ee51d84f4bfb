//! Candidate scoring for matching audio-source search results against a
//! catalog track.
//!
//! Source result titles are unreliable: uploads carry suffixes like
//! "(Official Video)", "[Lyrics]", or live/remaster annotations, and near
//! duplicates (live cuts, remixes, sped-up edits) share most of their title
//! text with the original. Duration is the dominant disambiguator here; text
//! similarity is the secondary filter.

use unaccent::unaccent;

use crate::descriptor::{Candidate, TrackDescriptor};

/// Weight of the duration component in the combined score.
pub const DURATION_WEIGHT: f64 = 0.6;
/// Weight of the title-similarity component in the combined score.
pub const TEXT_WEIGHT: f64 = 0.4;

/// Duration delta (seconds) still treated as near-perfect.
pub const NEAR_PERFECT_WINDOW_SECS: u32 = 10;
/// Duration delta (seconds) at and beyond which the duration score is zero.
pub const MAX_DURATION_DELTA_SECS: u32 = 30;
/// Duration score at the edge of the near-perfect window.
const NEAR_PERFECT_FLOOR: f64 = 0.8;

/// Tokens that carry no identity information in source result titles.
/// Multi-word phrases are listed before their substrings so that whole
/// phrases are removed first.
const NOISE_TOKENS: &[&str] = &[
    "official music video",
    "official video",
    "official audio",
    "lyric video",
    "lyrics",
    "visualizer",
    "remastered",
    "remaster",
    "audio",
    "video",
    "official",
    "full",
    "mv",
    "hd",
    "hq",
    "4k",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub duration_score: f64,
    pub text_score: f64,
    /// Combined weighted score in `[0.0, 1.0]`.
    pub score: f64,
}

/// Normalize a title for comparison: fold accents and case, drop
/// parenthetical annotations and noise tokens, reduce punctuation to
/// collapsed whitespace.
pub fn normalize_title(title: &str) -> String {
    let folded = unaccent(title).to_lowercase();
    let without_parens = strip_parentheticals(&folded);
    let cleaned: String = without_parens
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_noise_tokens(&collapsed)
}

/// Remove `(...)` and `[...]` groups. Unclosed groups swallow the remainder
/// of the string, which is the desired behavior for truncated upload titles.
fn strip_parentheticals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Remove whole-word noise tokens from an already-normalized string.
fn strip_noise_tokens(s: &str) -> String {
    let mut padded = format!(" {s} ");
    for token in NOISE_TOKENS {
        let needle = format!(" {token} ");
        while let Some(idx) = padded.find(&needle) {
            padded.replace_range(idx..idx + needle.len(), " ");
        }
    }
    padded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The canonical comparison string for a track: `"artist title"` after
/// normalization.
pub fn canonical_target(descriptor: &TrackDescriptor) -> String {
    normalize_title(&format!(
        "{} - {}",
        descriptor.primary_artist(),
        descriptor.title
    ))
}

/// Piecewise-linear duration score: 1.0 at zero delta, decaying to
/// [`NEAR_PERFECT_FLOOR`] across the near-perfect window, then to 0.0 at
/// [`MAX_DURATION_DELTA_SECS`]. Monotonically non-increasing in the delta.
/// A candidate with no reported duration scores 0.0.
pub fn duration_score(expected_secs: u32, candidate_secs: Option<u32>) -> f64 {
    let Some(actual) = candidate_secs else {
        return 0.0;
    };
    let delta = f64::from(expected_secs.abs_diff(actual));
    let window = f64::from(NEAR_PERFECT_WINDOW_SECS);
    let cutoff = f64::from(MAX_DURATION_DELTA_SECS);

    if delta <= window {
        1.0 - (delta / window) * (1.0 - NEAR_PERFECT_FLOOR)
    } else if delta < cutoff {
        NEAR_PERFECT_FLOOR * (cutoff - delta) / (cutoff - window)
    } else {
        0.0
    }
}

/// Score one candidate against a track descriptor.
pub fn score_candidate(descriptor: &TrackDescriptor, candidate: &Candidate) -> MatchScore {
    let duration = duration_score(descriptor.duration_secs, candidate.duration_secs);
    let text = jaro_winkler::jaro_winkler(
        &normalize_title(&candidate.title),
        &canonical_target(descriptor),
    );
    MatchScore {
        duration_score: duration,
        text_score: text,
        score: DURATION_WEIGHT * duration + TEXT_WEIGHT * text,
    }
}
