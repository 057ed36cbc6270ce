//! Randomized checks of the merge guarantees over generated libraries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use super::query::NormalizedQuery;
use super::SearchEngine;
use crate::backends::fake::{album, track, FakeCatalog};
use crate::backends::{CatalogItem, ItemKind};
use crate::config::SearchConfig;
use crate::search::album_cache::AlbumTrackCache;

const VOCABULARY: [&str; 6] = ["grace", "weightless", "storm", "union", "blue", "night"];

#[derive(Debug, Clone)]
struct AlbumSpec {
    title: Vec<usize>,
    artist: usize,
    tracks: Vec<usize>,
}

fn words(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&index| VOCABULARY[index])
        .collect::<Vec<_>>()
        .join(" ")
}

fn arb_album() -> impl Strategy<Value = AlbumSpec> {
    (
        prop::collection::vec(0..VOCABULARY.len(), 1..3),
        0..VOCABULARY.len(),
        prop::collection::vec(0..VOCABULARY.len(), 0..5),
    )
        .prop_map(|(title, artist, tracks)| AlbumSpec {
            title,
            artist,
            tracks,
        })
}

fn arb_query() -> impl Strategy<Value = String> {
    prop::collection::vec(0..VOCABULARY.len(), 0..4).prop_map(|indices| words(&indices))
}

fn arb_kinds() -> impl Strategy<Value = Vec<ItemKind>> {
    prop_oneof![
        Just(Vec::new()),
        Just(vec![ItemKind::Track]),
        Just(vec![ItemKind::Album]),
        Just(vec![ItemKind::Track, ItemKind::Album]),
    ]
}

/// Single words are answered with every item mentioning them, in library order,
/// regardless of the requested kinds. Multi-word phrases are never answered.
fn catalog_for(albums: &[AlbumSpec]) -> FakeCatalog {
    let mut catalog = FakeCatalog::new();
    let mut library = Vec::new();
    for (index, spec) in albums.iter().enumerate() {
        let album_id = format!("a{index}");
        let title = words(&spec.title);
        let artist = VOCABULARY[spec.artist];
        let tracks: Vec<CatalogItem> = spec
            .tracks
            .iter()
            .enumerate()
            .map(|(position, &word)| {
                track(
                    &format!("{album_id}-t{position}"),
                    VOCABULARY[word],
                    &title,
                    artist,
                    &album_id,
                    1,
                    position as u32 + 1,
                )
            })
            .collect();
        library.push(album(&album_id, &title, artist));
        library.extend(tracks.iter().cloned());
        catalog = catalog.with_children(&album_id, tracks);
    }
    for word in VOCABULARY {
        let query = NormalizedQuery::parse(word);
        let hits = library
            .iter()
            .filter(|item| query.all_tokens_in_fields(item))
            .cloned()
            .collect();
        catalog = catalog.with_search(word, hits);
    }
    catalog.with_library(library)
}

/// Runs one search on a fresh engine with a cold album cache.
fn cold_search(
    albums: &[AlbumSpec],
    query: &str,
    limit: usize,
    kinds: &[ItemKind],
) -> Vec<CatalogItem> {
    let engine = SearchEngine::new(
        Arc::new(catalog_for(albums)),
        SearchConfig::default(),
        Arc::new(AlbumTrackCache::new(Duration::from_secs(600), 16)),
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime should start");
    runtime.block_on(engine.search(query, limit, kinds))
}

proptest! {
    #[test]
    fn property_cold_searches_are_idempotent(
        albums in prop::collection::vec(arb_album(), 1..5),
        query in arb_query(),
        limit in 0_usize..12,
        kinds in arb_kinds(),
    ) {
        let first = cold_search(&albums, &query, limit, &kinds);
        let second = cold_search(&albums, &query, limit, &kinds);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn property_results_are_unique_bounded_and_admitted(
        albums in prop::collection::vec(arb_album(), 1..5),
        query in arb_query(),
        limit in 0_usize..12,
        kinds in arb_kinds(),
    ) {
        let results = cold_search(&albums, &query, limit, &kinds);

        prop_assert!(results.len() <= limit);
        let mut seen_ids = HashSet::new();
        for item in &results {
            prop_assert!(seen_ids.insert(item.id.as_str()), "duplicate id {}", item.id);
            prop_assert!(item.kind.admitted_by(&kinds), "{} is outside {:?}", item.id, kinds);
        }
    }

    #[test]
    fn property_albums_precede_their_own_tracks(
        albums in prop::collection::vec(arb_album(), 1..5),
        query in arb_query(),
        limit in 0_usize..12,
        kinds in arb_kinds(),
    ) {
        let results = cold_search(&albums, &query, limit, &kinds);

        for (position, item) in results.iter().enumerate() {
            let Some(parent_id) = item.parent_id.as_deref() else {
                continue;
            };
            let album_position = results
                .iter()
                .position(|other| other.kind == ItemKind::Album && other.id == parent_id);
            if let Some(album_position) = album_position {
                prop_assert!(
                    album_position < position,
                    "album {} follows its track {}",
                    parent_id,
                    item.id
                );
            }
        }
    }
}
