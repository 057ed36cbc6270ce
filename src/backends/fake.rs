//! Scripted in-memory catalog used by engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backends::{
    CatalogClient, CatalogError, CatalogItem, CatalogPage, CatalogSort, ItemKind, PageRequest,
};

/// One recorded catalog call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CatalogCall {
    Search {
        term: String,
        kinds: Vec<ItemKind>,
        limit: usize,
    },
    ListChildren {
        parent_id: String,
    },
    GetByIds {
        ids: Vec<String>,
    },
    ListAll {
        kinds: Vec<ItemKind>,
        sort: CatalogSort,
        page: PageRequest,
    },
    ListByArtist {
        artist_id: String,
    },
}

struct ScriptedSearch {
    term: String,
    kinds: Option<Vec<ItemKind>>,
    items: Vec<CatalogItem>,
}

/// Catalog whose search answers are scripted per (term, kind filter).
///
/// Unscripted searches return nothing, which mirrors the remote catalog's
/// habit of silently missing multi-word queries.
#[derive(Default)]
pub(crate) struct FakeCatalog {
    searches: Vec<ScriptedSearch>,
    failing_terms: Vec<String>,
    children: HashMap<String, Vec<CatalogItem>>,
    failing_children: Vec<String>,
    by_artist: HashMap<String, Vec<CatalogItem>>,
    library: Vec<CatalogItem>,
    unavailable: bool,
    calls: Mutex<Vec<CatalogCall>>,
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answers `term` for any kind filter.
    pub(crate) fn with_search(mut self, term: &str, items: Vec<CatalogItem>) -> Self {
        self.searches.push(ScriptedSearch {
            term: term.to_string(),
            kinds: None,
            items,
        });
        self
    }

    /// Answers `term` only when the requested kind filter equals `kinds`.
    pub(crate) fn with_kind_search(
        mut self,
        term: &str,
        kinds: &[ItemKind],
        items: Vec<CatalogItem>,
    ) -> Self {
        self.searches.push(ScriptedSearch {
            term: term.to_string(),
            kinds: Some(kinds.to_vec()),
            items,
        });
        self
    }

    pub(crate) fn with_failing_search(mut self, term: &str) -> Self {
        self.failing_terms.push(term.to_string());
        self
    }

    pub(crate) fn with_children(mut self, parent_id: &str, items: Vec<CatalogItem>) -> Self {
        self.children.insert(parent_id.to_string(), items);
        self
    }

    pub(crate) fn with_failing_children(mut self, parent_id: &str) -> Self {
        self.failing_children.push(parent_id.to_string());
        self
    }

    pub(crate) fn with_artist_items(mut self, artist_id: &str, items: Vec<CatalogItem>) -> Self {
        self.by_artist.insert(artist_id.to_string(), items);
        self
    }

    /// Flat library used by `list_all` and `get_by_ids`.
    pub(crate) fn with_library(mut self, items: Vec<CatalogItem>) -> Self {
        self.library = items;
        self
    }

    /// Every call fails as if the server were unreachable.
    pub(crate) fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<CatalogCall> {
        self.calls
            .lock()
            .expect("fake catalog call log poisoned")
            .clone()
    }

    pub(crate) fn list_children_calls(&self, parent_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(call, CatalogCall::ListChildren { parent_id: id } if id == parent_id)
            })
            .count()
    }

    pub(crate) fn search_calls(&self) -> Vec<(String, Vec<ItemKind>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CatalogCall::Search { term, kinds, .. } => Some((term, kinds)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: CatalogCall) {
        self.calls
            .lock()
            .expect("fake catalog call log poisoned")
            .push(call);
    }

    fn check_available(&self, operation: &'static str) -> Result<(), CatalogError> {
        if self.unavailable {
            return Err(CatalogError::Unavailable {
                operation,
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn all_known_items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.library
            .iter()
            .chain(self.children.values().flatten())
            .chain(self.searches.iter().flat_map(|search| search.items.iter()))
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search(
        &self,
        term: &str,
        kinds: &[ItemKind],
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.record(CatalogCall::Search {
            term: term.to_string(),
            kinds: kinds.to_vec(),
            limit,
        });
        self.check_available("search")?;
        if self.failing_terms.iter().any(|failing| failing == term) {
            return Err(CatalogError::Unavailable {
                operation: "search",
                reason: "gateway timeout".to_string(),
            });
        }
        let items = self
            .searches
            .iter()
            .find(|search| {
                search.term == term
                    && search
                        .kinds
                        .as_ref()
                        .map_or(true, |scripted| scripted.as_slice() == kinds)
            })
            .map(|search| search.items.clone())
            .unwrap_or_default();
        Ok(items.into_iter().take(limit).collect())
    }

    async fn list_children(
        &self,
        parent_id: &str,
        kinds: &[ItemKind],
        _sort: CatalogSort,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.record(CatalogCall::ListChildren {
            parent_id: parent_id.to_string(),
        });
        self.check_available("list_children")?;
        if self.failing_children.iter().any(|failing| failing == parent_id) {
            return Err(CatalogError::Unavailable {
                operation: "list_children",
                reason: "connection reset".to_string(),
            });
        }
        Ok(self
            .children
            .get(parent_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.kind.admitted_by(kinds))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_by_ids(
        &self,
        ids: &[String],
        kinds: &[ItemKind],
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.record(CatalogCall::GetByIds { ids: ids.to_vec() });
        self.check_available("get_by_ids")?;
        let mut found: Vec<CatalogItem> = Vec::new();
        for id in ids {
            if let Some(item) = self
                .all_known_items()
                .find(|item| &item.id == id && item.kind.admitted_by(kinds))
            {
                found.push(item.clone());
            }
        }
        Ok(found)
    }

    async fn list_all(
        &self,
        kinds: &[ItemKind],
        sort: CatalogSort,
        page: PageRequest,
    ) -> Result<CatalogPage, CatalogError> {
        self.record(CatalogCall::ListAll {
            kinds: kinds.to_vec(),
            sort,
            page,
        });
        self.check_available("list_all")?;
        let mut matching: Vec<CatalogItem> = self
            .library
            .iter()
            .filter(|item| item.kind.admitted_by(kinds))
            .cloned()
            .collect();
        if sort == CatalogSort::Name {
            matching.sort_by(|left, right| left.name.cmp(&right.name));
        }
        let total_count = matching.len();
        Ok(CatalogPage {
            items: matching
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect(),
            total_count,
        })
    }

    async fn list_by_artist(
        &self,
        artist_id: &str,
        kinds: &[ItemKind],
        _sort: CatalogSort,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.record(CatalogCall::ListByArtist {
            artist_id: artist_id.to_string(),
        });
        self.check_available("list_by_artist")?;
        Ok(self
            .by_artist
            .get(artist_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.kind.admitted_by(kinds))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Builds a track with album context.
pub(crate) fn track(
    id: &str,
    name: &str,
    album: &str,
    artist: &str,
    parent_id: &str,
    disc: u32,
    number: u32,
) -> CatalogItem {
    let mut item = CatalogItem::new(id, ItemKind::Track, name);
    item.album = Some(album.to_string());
    item.artists = vec![artist.to_string()];
    item.album_artists = vec![artist.to_string()];
    item.parent_id = Some(parent_id.to_string());
    item.disc_number = Some(disc);
    item.track_number = Some(number);
    item
}

/// Builds an album credited to one album artist.
pub(crate) fn album(id: &str, name: &str, album_artist: &str) -> CatalogItem {
    let mut item = CatalogItem::new(id, ItemKind::Album, name);
    item.album_artists = vec![album_artist.to_string()];
    item
}
