//! Bounded, time-limited cache of ordered album track lists.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::debug;

use crate::backends::CatalogItem;
use crate::config::CacheConfig;

struct CachedAlbum {
    tracks: Vec<CatalogItem>,
    stored_at: Instant,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedAlbum>,
    tick: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Album id to ordered track list, shared across searches.
///
/// Entries expire after `ttl`; past `max_albums` the least recently used entry
/// is evicted. A concurrent double miss refetches and the later write wins.
pub struct AlbumTrackCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    max_albums: usize,
}

impl AlbumTrackCache {
    pub fn new(ttl: Duration, max_albums: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            max_albums: max_albums.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Duration::from_secs(config.album_ttl_secs),
            config.max_albums,
        )
    }

    pub fn get(&self, album_id: &str) -> Option<Vec<CatalogItem>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = state
            .entries
            .get(album_id)
            .map(|entry| entry.stored_at.elapsed() >= self.ttl)?;
        if expired {
            debug!("Album cache entry expired: {}", album_id);
            state.entries.remove(album_id);
            return None;
        }
        let tick = state.next_tick();
        let entry = state.entries.get_mut(album_id)?;
        entry.last_used = tick;
        Some(entry.tracks.clone())
    }

    pub fn insert(&self, album_id: &str, tracks: Vec<CatalogItem>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let tick = state.next_tick();
        state.entries.insert(
            album_id.to_string(),
            CachedAlbum {
                tracks,
                stored_at: Instant::now(),
                last_used: tick,
            },
        );
        while state.entries.len() > self.max_albums {
            let Some(oldest) = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            debug!("Album cache evicting least recently used entry: {}", oldest);
            state.entries.remove(&oldest);
        }
    }

    pub fn invalidate(&self, album_id: &str) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .remove(album_id);
    }

    pub fn clear(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clear();
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
