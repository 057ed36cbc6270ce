//! Resolves user input to one catalog item and expands it into playable tracks.

use log::{debug, warn};

use crate::backends::{CatalogItem, CatalogSort, ItemKind};
use crate::search::SearchEngine;

/// Inputs carrying this prefix name a catalog identifier instead of a query.
pub const NATIVE_ID_PREFIX: &str = "native-";

/// Returns the identifier when `input` is a `native-<id>` reference.
pub fn native_id(input: &str) -> Option<&str> {
    input
        .trim()
        .strip_prefix(NATIVE_ID_PREFIX)
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Looks up `native-<id>` inputs directly; anything else is the top search hit.
pub async fn resolve_play_target(
    engine: &SearchEngine,
    input: &str,
    kinds: &[ItemKind],
) -> Option<CatalogItem> {
    if let Some(id) = native_id(input) {
        return match engine
            .retriever()
            .fetch_by_identifiers(&[id.to_string()], kinds)
            .await
        {
            Ok(items) => items.into_iter().next(),
            Err(err) => {
                warn!("Failed to resolve catalog item {}: {}", id, err);
                None
            }
        };
    }
    let target = engine.search(input, 1, kinds).await.into_iter().next();
    debug!(
        "Resolved play input '{}' to {:?}",
        input.trim(),
        target.as_ref().map(|item| item.id.as_str())
    );
    target
}

/// Playable tracks behind `item`, in playback order. Failures yield nothing.
pub async fn expand_to_tracks(engine: &SearchEngine, item: &CatalogItem) -> Vec<CatalogItem> {
    let tracks = match item.kind {
        ItemKind::Track => return vec![item.clone()],
        ItemKind::Album => engine.assembler().album_tracks(&item.id).await,
        ItemKind::Playlist => {
            engine
                .retriever()
                .fetch_by_parent(&item.id, &[ItemKind::Track], CatalogSort::PlaylistOrder)
                .await
        }
        ItemKind::Artist => {
            engine
                .retriever()
                .fetch_by_artist(&item.id, &[ItemKind::Track])
                .await
        }
    };
    match tracks {
        Ok(tracks) => {
            debug!(
                "Expanded {} '{}' into {} tracks",
                item.kind.label(),
                item.name,
                tracks.len()
            );
            tracks
        }
        Err(err) => {
            warn!(
                "Failed to expand {} '{}' ({}): {}",
                item.kind.label(),
                item.name,
                item.id,
                err
            );
            Vec::new()
        }
    }
}
