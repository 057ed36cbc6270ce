//! Anchor-album track expansion.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use crate::backends::{CatalogError, CatalogItem, CatalogSort, ItemKind};
use crate::config::SearchConfig;
use crate::search::album_cache::AlbumTrackCache;
use crate::search::retriever::{union_by_id, CandidateRetriever};

/// Lowercases, drops punctuation and underscores, and collapses whitespace.
pub fn normalize_label(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn label_tokens(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .flat_map(|value| {
            normalize_label(value)
                .split_whitespace()
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Fetches, caches and orders the tracks that follow an anchor album.
#[derive(Clone)]
pub struct AlbumAssembler {
    retriever: CandidateRetriever,
    cache: Arc<AlbumTrackCache>,
    recover_related: bool,
    related_album_similarity: f64,
}

impl AlbumAssembler {
    pub fn new(
        retriever: CandidateRetriever,
        cache: Arc<AlbumTrackCache>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            retriever,
            cache,
            recover_related: config.related_track_recovery,
            related_album_similarity: config.related_album_similarity,
        }
    }

    pub fn cache(&self) -> &Arc<AlbumTrackCache> {
        &self.cache
    }

    /// Ordered track list of an album, read through the cache.
    ///
    /// Empty listings are not cached so a later search can retry them.
    pub async fn album_tracks(&self, album_id: &str) -> Result<Vec<CatalogItem>, CatalogError> {
        if let Some(cached) = self.cache.get(album_id) {
            debug!("Loaded {} cached tracks for album {}", cached.len(), album_id);
            return Ok(cached);
        }
        let tracks = self
            .retriever
            .fetch_by_parent(album_id, &[ItemKind::Track], CatalogSort::DiscAndTrack)
            .await?;
        debug!("Fetched {} tracks for album {}", tracks.len(), album_id);
        if !tracks.is_empty() {
            self.cache.insert(album_id, tracks.clone());
        }
        Ok(tracks)
    }

    /// Tracks to splice after `anchor`: its children plus related tracks
    /// already present in `pool`, deduplicated and ordered by (disc, track).
    ///
    /// A failed children fetch yields no tracks.
    pub async fn assemble(&self, anchor: &CatalogItem, pool: &[CatalogItem]) -> Vec<CatalogItem> {
        let children = match self.album_tracks(&anchor.id).await {
            Ok(tracks) => tracks,
            Err(err) => {
                warn!(
                    "Failed to fetch tracks for album {} ({}): {}",
                    anchor.name, anchor.id, err
                );
                return Vec::new();
            }
        };
        let related = if self.recover_related {
            self.related_tracks(anchor, pool)
        } else {
            Vec::new()
        };
        let mut tracks = union_by_id([children, related]);
        tracks.retain(|item| item.kind == ItemKind::Track && item.id != anchor.id);
        tracks.sort_by_key(CatalogItem::disc_track_key);
        debug!("Assembled {} tracks for album {}", tracks.len(), anchor.name);
        tracks
    }

    /// Pool tracks that belong to the anchor by album title or by shared artists.
    fn related_tracks(&self, anchor: &CatalogItem, pool: &[CatalogItem]) -> Vec<CatalogItem> {
        let anchor_name = normalize_label(&anchor.name);
        let anchor_artists = label_tokens(&anchor.album_artists);
        pool.iter()
            .filter(|item| item.kind == ItemKind::Track && item.has_id())
            .filter(|item| {
                let Some(album) = item.album.as_deref().map(normalize_label) else {
                    return false;
                };
                if album.is_empty() {
                    return false;
                }
                let album_matches = !anchor_name.is_empty()
                    && (album.contains(&anchor_name)
                        || anchor_name.contains(&album)
                        || strsim::jaro_winkler(&album, &anchor_name)
                            >= self.related_album_similarity);
                album_matches || !label_tokens(&item.artists).is_disjoint(&anchor_artists)
            })
            .cloned()
            .collect()
    }
}

/// Inserts `tracks` right after the item with `anchor_id`; no-op when absent.
pub fn splice_after_anchor(
    ranked: &mut Vec<CatalogItem>,
    anchor_id: &str,
    tracks: Vec<CatalogItem>,
) {
    if let Some(position) = ranked.iter().position(|item| item.id == anchor_id) {
        ranked.splice(position + 1..position + 1, tracks);
    }
}
