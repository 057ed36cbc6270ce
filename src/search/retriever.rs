//! Catalog lookups used by the cascade, with identifier hygiene applied.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;
use tokio::task::JoinSet;

use crate::backends::{
    CatalogClient, CatalogError, CatalogItem, CatalogPage, CatalogSort, ItemKind, PageRequest,
};

/// Thin wrapper over a [`CatalogClient`] that drops items without identifiers
/// and items outside the requested kind filter.
#[derive(Clone)]
pub struct CandidateRetriever {
    client: Arc<dyn CatalogClient>,
}

fn admitted(items: Vec<CatalogItem>, kinds: &[ItemKind]) -> Vec<CatalogItem> {
    items
        .into_iter()
        .filter(|item| item.has_id() && item.kind.admitted_by(kinds))
        .collect()
}

/// Keeps the first occurrence of every identifier, preserving order.
pub(crate) fn union_by_id(batches: impl IntoIterator<Item = Vec<CatalogItem>>) -> Vec<CatalogItem> {
    let mut seen_ids = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|item| item.has_id() && seen_ids.insert(item.id.clone()))
        .collect()
}

impl CandidateRetriever {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self { client }
    }

    pub async fn fetch_by_keyword(
        &self,
        term: &str,
        kinds: &[ItemKind],
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let items = self.client.search(term, kinds, limit).await?;
        Ok(admitted(items, kinds))
    }

    /// One keyword search per token, run concurrently and recombined in token order.
    ///
    /// Any failing token fails the whole batch; partial unions are never returned.
    pub async fn fetch_by_each_keyword(
        &self,
        tokens: &[String],
        kinds: &[ItemKind],
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut tasks = JoinSet::new();
        for (index, token) in tokens.iter().enumerate() {
            let client = Arc::clone(&self.client);
            let token = token.clone();
            let kinds = kinds.to_vec();
            tasks.spawn(async move { (index, client.search(&token, &kinds, limit).await) });
        }

        let mut batches: Vec<Vec<CatalogItem>> = vec![Vec::new(); tokens.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|err| CatalogError::Unavailable {
                operation: "search",
                reason: format!("per-token search task failed: {err}"),
            })?;
            batches[index] = admitted(result?, kinds);
        }
        for (token, batch) in tokens.iter().zip(&batches) {
            debug!("Per-token search '{}': {} items", token, batch.len());
        }
        Ok(union_by_id(batches))
    }

    /// Children of `parent_id`. Album order is re-applied locally by (disc, track).
    pub async fn fetch_by_parent(
        &self,
        parent_id: &str,
        kinds: &[ItemKind],
        sort: CatalogSort,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut items = admitted(self.client.list_children(parent_id, kinds, sort).await?, kinds);
        if sort == CatalogSort::DiscAndTrack {
            items.sort_by_key(CatalogItem::disc_track_key);
        }
        Ok(items)
    }

    pub async fn fetch_by_identifiers(
        &self,
        ids: &[String],
        kinds: &[ItemKind],
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let ids: Vec<String> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(admitted(self.client.get_by_ids(&ids, kinds).await?, kinds))
    }

    pub async fn fetch_by_artist(
        &self,
        artist_id: &str,
        kinds: &[ItemKind],
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let items = self
            .client
            .list_by_artist(artist_id, kinds, CatalogSort::Name)
            .await?;
        Ok(admitted(items, kinds))
    }

    pub async fn list_page(
        &self,
        kinds: &[ItemKind],
        sort: CatalogSort,
        page: PageRequest,
    ) -> Result<CatalogPage, CatalogError> {
        let mut listing = self.client.list_all(kinds, sort, page).await?;
        listing
            .items
            .retain(|item| item.has_id() && item.kind.admitted_by(kinds));
        Ok(listing)
    }
}
