//! Catalog search and ranking engine.
//!
//! The remote catalog's own text search misses multi-word and artist+album
//! phrases, so [`SearchEngine::search`] runs a cascade of retrieval strategies,
//! ranks the pool with a two-pass fuzzy scorer, expands the best album into its
//! tracks and merges everything into one identifier-unique list.

pub mod album_assembler;
pub mod album_cache;
pub mod merge;
#[cfg(test)]
mod properties;
pub mod query;
pub mod retriever;
pub mod scorer;

use std::sync::Arc;

use log::{debug, error, warn};

use crate::backends::{
    CatalogClient, CatalogError, CatalogItem, CatalogSort, ItemKind, PageRequest,
};
use crate::config::SearchConfig;
use album_assembler::{splice_after_anchor, AlbumAssembler};
use album_cache::AlbumTrackCache;
use query::NormalizedQuery;
use retriever::CandidateRetriever;
use scorer::FuzzyScorer;

const ALBUM_ONLY: [ItemKind; 1] = [ItemKind::Album];

fn kind_summary(items: &[CatalogItem]) -> String {
    let count = |kind: ItemKind| items.iter().filter(|item| item.kind == kind).count();
    format!(
        "{} albums, {} tracks, {} playlists, {} artists",
        count(ItemKind::Album),
        count(ItemKind::Track),
        count(ItemKind::Playlist),
        count(ItemKind::Artist)
    )
}

/// Outcome of a strategy that may have failed; failures count as empty.
struct StrategyItems {
    items: Vec<CatalogItem>,
    failed: bool,
}

impl StrategyItems {
    fn from_result(strategy: &str, result: Result<Vec<CatalogItem>, CatalogError>) -> Self {
        match result {
            Ok(items) => Self {
                items,
                failed: false,
            },
            Err(err) => {
                warn!("Search strategy '{}' aborted: {}", strategy, err);
                Self {
                    items: Vec::new(),
                    failed: true,
                }
            }
        }
    }
}

/// Ranked search over a [`CatalogClient`].
///
/// Cheap to share behind an `Arc`; the album cache is injected so several
/// engines (or callers outside search) can reuse fetched track lists.
pub struct SearchEngine {
    retriever: CandidateRetriever,
    scorer: FuzzyScorer,
    assembler: AlbumAssembler,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        config: SearchConfig,
        cache: Arc<AlbumTrackCache>,
    ) -> Self {
        let retriever = CandidateRetriever::new(client);
        let assembler = AlbumAssembler::new(retriever.clone(), cache, &config);
        Self {
            scorer: FuzzyScorer::new(&config),
            retriever,
            assembler,
            config,
        }
    }

    pub fn retriever(&self) -> &CandidateRetriever {
        &self.retriever
    }

    pub fn assembler(&self) -> &AlbumAssembler {
        &self.assembler
    }

    pub fn album_cache(&self) -> &Arc<AlbumTrackCache> {
        self.assembler.cache()
    }

    /// Ranked, identifier-unique results for `raw_query`, at most `limit` long.
    ///
    /// An empty `kinds` filter admits every kind. Catalog failures degrade the
    /// result; they never surface as errors.
    pub async fn search(
        &self,
        raw_query: &str,
        limit: usize,
        kinds: &[ItemKind],
    ) -> Vec<CatalogItem> {
        if limit == 0 {
            return Vec::new();
        }
        let query = NormalizedQuery::parse(raw_query);
        if query.is_empty() {
            return self.list_by_name(limit, kinds).await;
        }
        debug!(
            "Searching '{}' ({} tokens, limit {}, kinds {:?})",
            query.phrase,
            query.token_count(),
            limit,
            kinds
        );

        let mut degraded = false;
        let pool = self.retrieve_pool(&query, kinds, &mut degraded).await;
        let mut ranked: Vec<CatalogItem> = self
            .scorer
            .rank(&query, &pool)
            .into_iter()
            .map(|scored| scored.item.clone())
            .collect();
        debug!("Ranked {} candidates: {}", ranked.len(), kind_summary(&ranked));

        let anchor = self.select_anchor(&query, kinds, &mut ranked, &mut degraded).await;
        if let Some(anchor) = anchor {
            let tracks = self.assembler.assemble(&anchor, &pool).await;
            if ItemKind::Track.admitted_by(kinds) && !tracks.is_empty() {
                splice_after_anchor(&mut ranked, &anchor.id, tracks);
            }
        }

        let mut results = merge::finalize(ranked, limit);
        if results.is_empty()
            && query.token_count() >= self.config.min_tokens_for_phrase_fallback
            && ItemKind::Album.admitted_by(kinds)
        {
            results = self.artist_album_fallback(&query, limit, kinds, &mut degraded).await;
        }

        if results.is_empty() && degraded {
            error!(
                "Search '{}' failed against the catalog; returning no results",
                query.phrase
            );
        } else {
            debug!(
                "Returning {} results for '{}': {}",
                results.len(),
                query.phrase,
                kind_summary(&results)
            );
        }
        results
    }

    /// Empty-query listing: catalog items sorted by name, no scoring.
    async fn list_by_name(&self, limit: usize, kinds: &[ItemKind]) -> Vec<CatalogItem> {
        let page = PageRequest { offset: 0, limit };
        match self.retriever.list_page(kinds, CatalogSort::Name, page).await {
            Ok(listing) => {
                let mut items = listing.items;
                items.sort_by_cached_key(|item| item.name.to_lowercase());
                debug!("Empty query listing: {}", kind_summary(&items));
                merge::finalize(items, limit)
            }
            Err(err) => {
                error!("Empty query listing failed: {}", err);
                Vec::new()
            }
        }
    }

    /// Direct search, per-token fallback and the all-tokens field filter.
    async fn retrieve_pool(
        &self,
        query: &NormalizedQuery,
        kinds: &[ItemKind],
        degraded: &mut bool,
    ) -> Vec<CatalogItem> {
        let direct = StrategyItems::from_result(
            "direct",
            self.retriever
                .fetch_by_keyword(&query.phrase, kinds, self.config.direct_search_limit)
                .await,
        );
        *degraded |= direct.failed;
        debug!("Direct search: {}", kind_summary(&direct.items));
        let mut pool = direct.items;

        if pool.is_empty() && query.token_count() >= self.config.min_tokens_for_per_token {
            let per_token = StrategyItems::from_result(
                "per-token",
                self.retriever
                    .fetch_by_each_keyword(
                        &query.tokens,
                        kinds,
                        self.config.per_token_search_limit,
                    )
                    .await,
            );
            *degraded |= per_token.failed;
            debug!(
                "Per-token fallback combined results: {}",
                kind_summary(&per_token.items)
            );
            pool = per_token.items;
        }

        let filtered: Vec<CatalogItem> = pool
            .iter()
            .filter(|item| query.all_tokens_in_fields(item))
            .cloned()
            .collect();
        if filtered.is_empty() {
            pool
        } else {
            debug!("Keyword filter kept {} of {} items", filtered.len(), pool.len());
            filtered
        }
    }

    /// Picks the album that receives track expansion, moving it to the front.
    async fn select_anchor(
        &self,
        query: &NormalizedQuery,
        kinds: &[ItemKind],
        ranked: &mut Vec<CatalogItem>,
        degraded: &mut bool,
    ) -> Option<CatalogItem> {
        let first_album = ranked.iter().position(|item| item.kind == ItemKind::Album);
        if let Some(position) = first_album {
            if position == 0 {
                return Some(ranked[0].clone());
            }
            if !self.config.promote_first_album {
                return None;
            }
            let album = ranked.remove(position);
            ranked.insert(0, album.clone());
            return Some(album);
        }

        if !ItemKind::Album.admitted_by(kinds) {
            return None;
        }
        debug!("No album among ranked results; querying albums directly");
        let direct_albums = StrategyItems::from_result(
            "album anchor",
            self.retriever
                .fetch_by_keyword(&query.phrase, &ALBUM_ONLY, self.config.album_anchor_limit)
                .await,
        );
        *degraded |= direct_albums.failed;
        let album = direct_albums
            .items
            .into_iter()
            .find(|item| item.kind == ItemKind::Album)?;
        debug!("Injected album '{}' from direct album query", album.name);
        ranked.insert(0, album.clone());
        Some(album)
    }

    /// Last resort for `artist album` phrases: per-token album search, pick the
    /// album whose `album artists + name` contains the most tokens.
    async fn artist_album_fallback(
        &self,
        query: &NormalizedQuery,
        limit: usize,
        kinds: &[ItemKind],
        degraded: &mut bool,
    ) -> Vec<CatalogItem> {
        let albums = StrategyItems::from_result(
            "artist+album",
            self.retriever
                .fetch_by_each_keyword(
                    &query.tokens,
                    &ALBUM_ONLY,
                    self.config.per_token_search_limit,
                )
                .await,
        );
        *degraded |= albums.failed;

        let mut best: Option<(usize, &CatalogItem)> = None;
        for album in albums.items.iter().filter(|item| item.kind == ItemKind::Album) {
            let haystack =
                format!("{} {}", album.album_artists.join(" "), album.name).to_lowercase();
            let matched = query
                .tokens
                .iter()
                .filter(|token| haystack.contains(token.as_str()))
                .count();
            if matched > 0 && best.map_or(true, |(best_matched, _)| matched > best_matched) {
                best = Some((matched, album));
            }
        }
        let Some((matched, album)) = best else {
            debug!("Artist+album fallback found no album");
            return Vec::new();
        };
        debug!(
            "Artist+album fallback chose '{}' ({} of {} tokens)",
            album.name,
            matched,
            query.token_count()
        );

        let tracks = self.assembler.assemble(album, &[]).await;
        if tracks.is_empty() {
            return Vec::new();
        }
        let mut results = vec![album.clone()];
        if ItemKind::Track.admitted_by(kinds) {
            results.extend(tracks);
        }
        merge::finalize(results, limit)
    }
}
