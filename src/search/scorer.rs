//! Two-pass weighted fuzzy scoring.
//!
//! Every comparison field gets an approximate-substring edit distance against
//! the full query phrase, normalized by the phrase length, so a match anywhere
//! in the field scores the same as a prefix match. Fields above the threshold
//! are ignored; a candidate with no matching field is not a match at all.
//! Matching fields are folded into one score as `distance ^ (weight * norm)`,
//! where `norm` damps long multi-word fields. Scores are distances: lower wins.

use std::collections::HashSet;

use log::debug;

use crate::backends::{CatalogItem, ItemKind};
use crate::config::{FieldWeights, SearchConfig};
use crate::search::query::NormalizedQuery;

const LOGGED_HITS_PER_PASS: usize = 10;

/// Weighting configuration a candidate was scored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringPass {
    General,
    AlbumBiased,
}

impl ScoringPass {
    fn label(self) -> &'static str {
        match self {
            Self::General => "General pass",
            Self::AlbumBiased => "Album pass",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ScoredField {
    Name,
    Album,
    Artists,
    AlbumFullName,
}

const SCORED_FIELDS: [ScoredField; 4] = [
    ScoredField::Name,
    ScoredField::Album,
    ScoredField::Artists,
    ScoredField::AlbumFullName,
];

/// A catalog item plus the lowercase comparison fields synthesized for scoring.
///
/// Kept apart from `CatalogItem` so scorer-only fields never reach callers.
#[derive(Debug, Clone)]
pub struct AugmentedCandidate<'a> {
    pub item: &'a CatalogItem,
    name: String,
    album: String,
    artists: String,
    album_full_name: String,
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl<'a> AugmentedCandidate<'a> {
    pub fn new(item: &'a CatalogItem) -> Self {
        // Albums carry their title in `name`; tracks in `album`.
        let album_title = match item.kind {
            ItemKind::Album => item.name.as_str(),
            _ => item.album.as_deref().unwrap_or_default(),
        };
        let album = collapse_whitespace(&album_title.to_lowercase());
        let artists = collapse_whitespace(&item.artists.join(" ").to_lowercase());
        let album_artists = collapse_whitespace(&item.album_artists.join(" ").to_lowercase());
        let album_full_name = collapse_whitespace(&format!("{artists} {album_artists} {album}"));
        Self {
            item,
            name: collapse_whitespace(&item.name.to_lowercase()),
            album,
            artists,
            album_full_name,
        }
    }

    pub fn album_full_name(&self) -> &str {
        &self.album_full_name
    }

    fn field(&self, field: ScoredField) -> &str {
        match field {
            ScoredField::Name => &self.name,
            ScoredField::Album => &self.album,
            ScoredField::Artists => &self.artists,
            ScoredField::AlbumFullName => &self.album_full_name,
        }
    }
}

fn field_weight(weights: &FieldWeights, field: ScoredField) -> f64 {
    match field {
        ScoredField::Name => weights.name,
        ScoredField::Album => weights.album,
        ScoredField::Artists => weights.artists,
        ScoredField::AlbumFullName => weights.album_full_name,
    }
}

/// One candidate's score under one pass.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate<'a> {
    pub item: &'a CatalogItem,
    /// Distance in `[0, 1]`; lower is better.
    pub score: f64,
    pub pass: ScoringPass,
}

/// Smallest edit distance between `pattern` and any substring of `text`.
fn approximate_substring_distance(pattern: &[char], text: &[char]) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    // previous[j]: best distance of the pattern prefix ending at text position j.
    let mut previous = vec![0usize; text.len() + 1];
    let mut current = vec![0usize; text.len() + 1];
    for (row, pattern_char) in pattern.iter().enumerate() {
        current[0] = row + 1;
        for (column, text_char) in text.iter().enumerate() {
            let substitution = previous[column] + usize::from(pattern_char != text_char);
            let skip_pattern = previous[column + 1] + 1;
            let skip_text = current[column] + 1;
            current[column + 1] = substitution.min(skip_pattern).min(skip_text);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous.into_iter().min().unwrap_or(pattern.len())
}

/// Normalized distance of `pattern` against the best-matching window of `text`.
pub fn field_distance(pattern: &[char], text: &str) -> f64 {
    if pattern.is_empty() {
        return 0.0;
    }
    let text: Vec<char> = text.chars().collect();
    let distance = approximate_substring_distance(pattern, &text);
    (distance as f64 / pattern.len() as f64).min(1.0)
}

/// Length damping for a field value: `1 / sqrt(word count)`, rounded to 3 places.
fn field_norm(text: &str) -> f64 {
    let words = text.split_whitespace().count().max(1) as f64;
    (1000.0 / words.sqrt()).round() / 1000.0
}

/// Weighted two-pass scorer.
#[derive(Debug, Clone)]
pub struct FuzzyScorer {
    threshold: f64,
    general: FieldWeights,
    album_biased: FieldWeights,
    min_tokens_for_album_bias: usize,
}

impl FuzzyScorer {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            threshold: config.match_threshold,
            general: config.general_pass,
            album_biased: config.album_pass,
            min_tokens_for_album_bias: config.min_tokens_for_album_bias,
        }
    }

    fn weights(&self, pass: ScoringPass) -> &FieldWeights {
        match pass {
            ScoringPass::General => &self.general,
            ScoringPass::AlbumBiased => &self.album_biased,
        }
    }

    /// Scores one candidate; `None` when no weighted field is within the threshold.
    pub fn score_candidate(
        &self,
        pattern: &[char],
        candidate: &AugmentedCandidate<'_>,
        pass: ScoringPass,
    ) -> Option<f64> {
        let weights = self.weights(pass);
        let total_weight = weights.total();
        if total_weight <= 0.0 {
            return None;
        }
        let mut score = 1.0;
        let mut matched = false;
        for field in SCORED_FIELDS {
            let weight = field_weight(weights, field) / total_weight;
            let text = candidate.field(field);
            if weight <= 0.0 || text.is_empty() {
                continue;
            }
            let distance = field_distance(pattern, text);
            if distance > self.threshold {
                continue;
            }
            matched = true;
            let base = if distance == 0.0 {
                f64::EPSILON
            } else {
                distance
            };
            score *= base.powf(weight * field_norm(text));
        }
        matched.then_some(score)
    }

    /// Scores every candidate under `pass`, ascending by score. Ties keep pool order.
    pub fn score_pass<'a>(
        &self,
        pattern: &[char],
        candidates: &[AugmentedCandidate<'a>],
        pass: ScoringPass,
    ) -> Vec<ScoredCandidate<'a>> {
        let mut scored: Vec<ScoredCandidate<'a>> = candidates
            .iter()
            .filter_map(|candidate| {
                self.score_candidate(pattern, candidate, pass)
                    .map(|score| ScoredCandidate {
                        item: candidate.item,
                        score,
                        pass,
                    })
            })
            .collect();
        scored.sort_by(|left, right| left.score.total_cmp(&right.score));
        scored
    }

    /// Runs both passes, orders them by query length and dedups by identifier.
    pub fn rank<'a>(
        &self,
        query: &NormalizedQuery,
        pool: &'a [CatalogItem],
    ) -> Vec<ScoredCandidate<'a>> {
        let pattern: Vec<char> = query.phrase.chars().collect();
        let candidates: Vec<AugmentedCandidate<'a>> = pool
            .iter()
            .filter(|item| item.has_id())
            .map(AugmentedCandidate::new)
            .collect();

        let general = self.score_pass(&pattern, &candidates, ScoringPass::General);
        let album_biased = self.score_pass(&pattern, &candidates, ScoringPass::AlbumBiased);
        log_hits(ScoringPass::General, &general);
        log_hits(ScoringPass::AlbumBiased, &album_biased);

        let (leading, trailing) = if query.token_count() >= self.min_tokens_for_album_bias {
            (album_biased, general)
        } else {
            (general, album_biased)
        };

        let mut seen_ids = HashSet::new();
        leading
            .into_iter()
            .chain(trailing)
            .filter(|scored| seen_ids.insert(scored.item.id.as_str()))
            .collect()
    }
}

fn log_hits(pass: ScoringPass, hits: &[ScoredCandidate<'_>]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    debug!("{}: {} hits", pass.label(), hits.len());
    for (index, hit) in hits.iter().take(LOGGED_HITS_PER_PASS).enumerate() {
        debug!(
            "{}. {} | {} | Score: {:.3}",
            index + 1,
            hit.item.kind.label(),
            hit.item.name,
            hit.score
        );
    }
}
