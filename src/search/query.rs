//! Query normalization and search-type kind filters.

use std::str::FromStr;

use crate::backends::{CatalogItem, ItemKind};

/// Trimmed, lowercased query phrase plus its whitespace-delimited tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub phrase: String,
    pub tokens: Vec<String>,
}

impl NormalizedQuery {
    /// Catalog-unsafe characters pass through untouched; the client escapes them.
    pub fn parse(raw: &str) -> Self {
        let phrase = raw.trim().to_lowercase();
        let tokens = phrase.split_whitespace().map(ToOwned::to_owned).collect();
        Self { phrase, tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.phrase.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// True when every token is a substring of name, album, an artist or an album artist.
    pub fn all_tokens_in_fields(&self, item: &CatalogItem) -> bool {
        let fields: Vec<String> = std::iter::once(item.name.as_str())
            .chain(item.album.as_deref())
            .chain(item.artists.iter().map(String::as_str))
            .chain(item.album_artists.iter().map(String::as_str))
            .filter(|field| !field.is_empty())
            .map(str::to_lowercase)
            .collect();
        self.tokens
            .iter()
            .all(|token| fields.iter().any(|field| field.contains(token.as_str())))
    }
}

/// Entity restriction chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    All,
    Track,
    Album,
    Playlist,
}

impl SearchType {
    pub fn kinds(self) -> Vec<ItemKind> {
        match self {
            Self::All => vec![ItemKind::Track, ItemKind::Album, ItemKind::Playlist],
            Self::Track => vec![ItemKind::Track],
            Self::Album => vec![ItemKind::Album],
            Self::Playlist => vec![ItemKind::Playlist],
        }
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "track" | "tracks" | "song" | "songs" => Ok(Self::Track),
            "album" | "albums" => Ok(Self::Album),
            "playlist" | "playlists" => Ok(Self::Playlist),
            other => Err(format!("unknown search type: {other}")),
        }
    }
}
