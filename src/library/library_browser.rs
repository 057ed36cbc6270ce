//! Paged catalog browsing and random track picks.

use log::{debug, warn};

use crate::backends::{CatalogItem, CatalogSort, ItemKind, PageRequest};
use crate::search::retriever::CandidateRetriever;

/// One page of a name-sorted catalog listing. `page` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsePage {
    pub items: Vec<CatalogItem>,
    pub total: usize,
    pub page: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl BrowsePage {
    fn empty(page: usize) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            has_previous: page > 0,
            has_next: false,
        }
    }

    /// Number of pages needed for `total` items.
    pub fn page_count(&self, page_size: usize) -> usize {
        self.total.div_ceil(page_size.max(1))
    }
}

/// Lists page `page` of every `kind` item, sorted by name.
pub async fn browse_page(
    retriever: &CandidateRetriever,
    kind: ItemKind,
    page: usize,
    page_size: usize,
) -> BrowsePage {
    let page_size = page_size.max(1);
    let request = PageRequest {
        offset: page.saturating_mul(page_size),
        limit: page_size,
    };
    match retriever.list_page(&[kind], CatalogSort::Name, request).await {
        Ok(listing) => {
            debug!(
                "Browse {} page {}: {} of {} items",
                kind.label(),
                page,
                listing.items.len(),
                listing.total_count
            );
            BrowsePage {
                has_previous: page > 0,
                has_next: request.offset.saturating_add(page_size) < listing.total_count,
                items: listing.items,
                total: listing.total_count,
                page,
            }
        }
        Err(err) => {
            warn!("Failed to browse {} page {}: {}", kind.label(), page, err);
            BrowsePage::empty(page)
        }
    }
}

/// Up to `limit` tracks in catalog-random order.
pub async fn random_tracks(retriever: &CandidateRetriever, limit: usize) -> Vec<CatalogItem> {
    if limit == 0 {
        return Vec::new();
    }
    let request = PageRequest { offset: 0, limit };
    match retriever
        .list_page(&[ItemKind::Track], CatalogSort::Random, request)
        .await
    {
        Ok(listing) => listing.items,
        Err(err) => {
            warn!("Failed to fetch random tracks: {}", err);
            Vec::new()
        }
    }
}
