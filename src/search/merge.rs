//! Final merge: identifier hygiene, album ordering and truncation.

use std::collections::HashSet;

use crate::backends::{CatalogItem, ItemKind};

/// Drops items without identifiers and repeated identifiers; first occurrence wins.
pub fn dedup_by_id(items: Vec<CatalogItem>) -> Vec<CatalogItem> {
    let mut seen_ids = HashSet::new();
    items
        .into_iter()
        .filter(|item| item.has_id() && seen_ids.insert(item.id.clone()))
        .collect()
}

fn belongs_to(track: &CatalogItem, album: &CatalogItem) -> bool {
    track.kind == ItemKind::Track && track.parent_id.as_deref() == Some(album.id.as_str())
}

/// Moves every album in front of the first of its own tracks.
pub fn hoist_albums_before_tracks(items: &mut Vec<CatalogItem>) {
    let album_ids: Vec<String> = items
        .iter()
        .filter(|item| item.kind == ItemKind::Album)
        .map(|item| item.id.clone())
        .collect();
    for album_id in album_ids {
        let Some(album_position) = items.iter().position(|item| item.id == album_id) else {
            continue;
        };
        let first_track = items[..album_position]
            .iter()
            .position(|item| belongs_to(item, &items[album_position]));
        if let Some(track_position) = first_track {
            let album = items.remove(album_position);
            items.insert(track_position, album);
        }
    }
}

/// Dedups, restores album-before-track order and truncates to `limit`.
pub fn finalize(items: Vec<CatalogItem>, limit: usize) -> Vec<CatalogItem> {
    let mut merged = dedup_by_id(items);
    hoist_albums_before_tracks(&mut merged);
    merged.truncate(limit);
    merged
}

#[cfg(test)]
mod tests {
    use super::{dedup_by_id, finalize, hoist_albums_before_tracks};
    use crate::backends::fake::{album, track};
    use crate::backends::{CatalogItem, ItemKind};

    fn ids(items: &[CatalogItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn test_dedup_by_id_keeps_first_and_drops_blank_ids() {
        let deduped = dedup_by_id(vec![
            CatalogItem::new("a", ItemKind::Track, "First"),
            CatalogItem::new("", ItemKind::Track, "Blank"),
            CatalogItem::new("a", ItemKind::Track, "Second"),
        ]);
        assert_eq!(ids(&deduped), vec!["a"]);
        assert_eq!(deduped[0].name, "First");
    }

    #[test]
    fn test_hoist_moves_album_before_its_tracks_only() {
        let mut items = vec![
            track("x1", "Other", "Thunder", "Storm", "a9", 1, 1),
            track("t2", "Two", "Weightless", "Grace", "a1", 1, 2),
            track("t1", "One", "Weightless", "Grace", "a1", 1, 1),
            album("a1", "Weightless", "Grace"),
        ];

        hoist_albums_before_tracks(&mut items);

        assert_eq!(ids(&items), vec!["x1", "a1", "t2", "t1"]);
    }

    #[test]
    fn test_hoist_leaves_album_already_in_front() {
        let mut items = vec![
            album("a1", "Weightless", "Grace"),
            track("t1", "One", "Weightless", "Grace", "a1", 1, 1),
        ];
        hoist_albums_before_tracks(&mut items);
        assert_eq!(ids(&items), vec!["a1", "t1"]);
    }

    #[test]
    fn test_finalize_truncates_after_ordering() {
        let items = vec![
            track("t1", "One", "Weightless", "Grace", "a1", 1, 1),
            album("a1", "Weightless", "Grace"),
            track("t1", "One", "Weightless", "Grace", "a1", 1, 1),
            track("t2", "Two", "Weightless", "Grace", "a1", 1, 2),
        ];

        let finalized = finalize(items, 2);

        assert_eq!(ids(&finalized), vec!["a1", "t1"]);
    }

    #[test]
    fn test_finalize_with_zero_limit_is_empty() {
        let items = vec![CatalogItem::new("a", ItemKind::Track, "A")];
        assert!(finalize(items, 0).is_empty());
    }
}
