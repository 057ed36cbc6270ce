//! Catalog client abstractions and concrete implementations.

#[cfg(test)]
pub(crate) mod fake;
pub mod jellyfin;

use async_trait::async_trait;

/// Entity kinds exposed by the remote catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Track,
    Album,
    Playlist,
    Artist,
}

impl ItemKind {
    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Track => "Track",
            Self::Album => "Album",
            Self::Playlist => "Playlist",
            Self::Artist => "Artist",
        }
    }

    /// Returns true when `kinds` admits `self`. An empty filter admits everything.
    pub fn admitted_by(self, kinds: &[ItemKind]) -> bool {
        kinds.is_empty() || kinds.contains(&self)
    }
}

/// One catalog record. Immutable once retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: String,
    pub kind: ItemKind,
    pub name: String,
    /// Album title; only populated for tracks.
    pub album: Option<String>,
    pub artists: Vec<String>,
    pub album_artists: Vec<String>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub parent_id: Option<String>,
}

impl CatalogItem {
    /// Creates an item with only the identity fields populated.
    pub fn new(id: impl Into<String>, kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            album: None,
            artists: Vec::new(),
            album_artists: Vec::new(),
            disc_number: None,
            track_number: None,
            parent_id: None,
        }
    }

    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Sort key for album order. Missing indices sort as 0.
    pub fn disc_track_key(&self) -> (u32, u32) {
        (
            self.disc_number.unwrap_or(0),
            self.track_number.unwrap_or(0),
        )
    }

    /// Display line used by the CLI: `[Kind] Name — artists (id)`.
    pub fn display_line(&self) -> String {
        let credited = if self.artists.is_empty() {
            &self.album_artists
        } else {
            &self.artists
        };
        if credited.is_empty() {
            format!("[{}] {} ({})", self.kind.label(), self.name, self.id)
        } else {
            format!(
                "[{}] {} — {} ({})",
                self.kind.label(),
                self.name,
                credited.join(", "),
                self.id
            )
        }
    }
}

/// Sort order requested from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSort {
    Name,
    DiscAndTrack,
    Random,
    /// Native entry order of a playlist.
    PlaylistOrder,
}

/// Offset/limit pagination for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

/// One page of a flat catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub total_count: usize,
}

/// Transport/auth failures reported by catalog clients.
///
/// "No results" is never an error; clients return an empty sequence instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed ({operation}): {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },
    #[error("catalog rejected credentials ({operation})")]
    Unauthorized { operation: &'static str },
    #[error("catalog response could not be decoded ({operation}): {reason}")]
    Decode {
        operation: &'static str,
        reason: String,
    },
}

/// Interface implemented by concrete catalog clients.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Keyword search. Query semantics are owned by the remote catalog and untrusted.
    async fn search(
        &self,
        term: &str,
        kinds: &[ItemKind],
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError>;

    async fn list_children(
        &self,
        parent_id: &str,
        kinds: &[ItemKind],
        sort: CatalogSort,
    ) -> Result<Vec<CatalogItem>, CatalogError>;

    async fn get_by_ids(
        &self,
        ids: &[String],
        kinds: &[ItemKind],
    ) -> Result<Vec<CatalogItem>, CatalogError>;

    async fn list_all(
        &self,
        kinds: &[ItemKind],
        sort: CatalogSort,
        page: PageRequest,
    ) -> Result<CatalogPage, CatalogError>;

    /// Items credited to one artist.
    async fn list_by_artist(
        &self,
        artist_id: &str,
        kinds: &[ItemKind],
        sort: CatalogSort,
    ) -> Result<Vec<CatalogItem>, CatalogError>;
}
