//! Ranked search over a remote media catalog.
//!
//! [`search::SearchEngine`] turns an unreliable catalog text search into a
//! robust ranked result list; [`backends`] holds the catalog client seam and
//! the Jellyfin adapter.

pub mod backends;
pub mod config;
pub mod config_persistence;
pub mod integration_keyring;
pub mod library;
pub mod search;
