//! Command line surface of the `tunesearch` binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{debug, info};

use tunesearch::backends::jellyfin::{JellyfinAdapter, JellyfinProfile};
use tunesearch::backends::{CatalogItem, ItemKind};
use tunesearch::config::{CatalogConfig, Config};
use tunesearch::config_persistence::{default_config_path, load_or_create_config};
use tunesearch::integration_keyring::{
    delete_catalog_token, resolve_catalog_token, set_catalog_token,
};
use tunesearch::library::library_browser::{browse_page, random_tracks};
use tunesearch::library::play_target::{expand_to_tracks, resolve_play_target};
use tunesearch::search::album_cache::AlbumTrackCache;
use tunesearch::search::query::SearchType;
use tunesearch::search::SearchEngine;

const DEFAULT_BROWSE_PAGE_SIZE: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "tunesearch", version, about = "Ranked search over a Jellyfin music library")]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Ranked search across tracks, albums and playlists
    Search(SearchArgs),
    /// Resolve a query or `native-<id>` and list its playable tracks
    Tracks(TracksArgs),
    /// Random tracks from the whole library
    Random {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Page through the library sorted by name
    Browse(BrowseArgs),
    /// Store the catalog API token in the OS keyring
    SetToken { token: String },
    /// Remove the catalog API token from the OS keyring
    ClearToken,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
    /// Max results (defaults to `search.default_limit`)
    #[arg(long)]
    limit: Option<usize>,
    /// all, track, album or playlist
    #[arg(long = "type", default_value = "all")]
    search_type: SearchType,
}

#[derive(clap::Args, Debug)]
struct TracksArgs {
    #[arg(required = true, num_args = 1..)]
    input: Vec<String>,
    #[arg(long = "type", default_value = "all")]
    search_type: SearchType,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BrowseKind {
    Track,
    Album,
    Artist,
    Playlist,
}

impl BrowseKind {
    fn item_kind(self) -> ItemKind {
        match self {
            Self::Track => ItemKind::Track,
            Self::Album => ItemKind::Album,
            Self::Artist => ItemKind::Artist,
            Self::Playlist => ItemKind::Playlist,
        }
    }
}

#[derive(clap::Args, Debug)]
struct BrowseArgs {
    #[arg(value_enum)]
    kind: BrowseKind,
    /// One-based page number
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = DEFAULT_BROWSE_PAGE_SIZE)]
    page_size: usize,
}

fn jellyfin_profile(config: &CatalogConfig, token: String) -> Result<JellyfinProfile, String> {
    if config.endpoint.trim().is_empty() {
        return Err("catalog.endpoint is not configured".to_string());
    }
    if config.user_id.trim().is_empty() {
        return Err("catalog.user_id is not configured".to_string());
    }
    Ok(JellyfinProfile {
        endpoint: config.endpoint.trim().to_string(),
        user_id: config.user_id.trim().to_string(),
        token,
        device_name: config.device_name.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
        max_requests_per_second: config.max_requests_per_second,
    })
}

fn build_engine(config: &Config) -> Result<SearchEngine, String> {
    let token = resolve_catalog_token(&config.catalog.profile_id)?;
    let adapter = JellyfinAdapter::new(jellyfin_profile(&config.catalog, token)?);
    Ok(SearchEngine::new(
        Arc::new(adapter),
        config.search.clone(),
        Arc::new(AlbumTrackCache::from_config(&config.cache)),
    ))
}

fn print_items(items: &[CatalogItem]) {
    if items.is_empty() {
        println!("No results.");
        return;
    }
    for item in items {
        println!("{}", item.display_line());
    }
}

impl Cli {
    pub fn config_path(&self) -> Result<PathBuf, String> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => default_config_path(),
        }
    }
}

/// Runs one command with an already loaded config.
pub fn run(cli: Cli, config: Config) -> Result<(), String> {
    match &cli.command {
        Command::SetToken { token } => {
            set_catalog_token(&config.catalog.profile_id, token)?;
            info!(
                "Stored API token for profile '{}'",
                config.catalog.profile_id
            );
            return Ok(());
        }
        Command::ClearToken => {
            delete_catalog_token(&config.catalog.profile_id)?;
            info!(
                "Removed API token for profile '{}'",
                config.catalog.profile_id
            );
            return Ok(());
        }
        _ => {}
    }

    let engine = build_engine(&config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to start async runtime: {err}"))?;

    match cli.command {
        Command::Search(args) => {
            let query = args.query.join(" ");
            let limit = args.limit.unwrap_or(config.search.default_limit);
            let kinds = args.search_type.kinds();
            debug!("CLI search '{}' limit={} kinds={:?}", query, limit, kinds);
            let results = runtime.block_on(engine.search(&query, limit, &kinds));
            print_items(&results);
        }
        Command::Tracks(args) => {
            let input = args.input.join(" ");
            let kinds = args.search_type.kinds();
            let tracks = runtime.block_on(async {
                match resolve_play_target(&engine, &input, &kinds).await {
                    Some(target) => {
                        println!("{}", target.display_line());
                        expand_to_tracks(&engine, &target).await
                    }
                    None => Vec::new(),
                }
            });
            print_items(&tracks);
        }
        Command::Random { limit } => {
            let limit = limit.unwrap_or(config.search.default_limit);
            let tracks = runtime.block_on(random_tracks(engine.retriever(), limit));
            print_items(&tracks);
        }
        Command::Browse(args) => {
            let page_size = args.page_size.max(1);
            let page_index = args.page.max(1) - 1;
            let page = runtime.block_on(browse_page(
                engine.retriever(),
                args.kind.item_kind(),
                page_index,
                page_size,
            ));
            print_items(&page.items);
            println!(
                "Page {} of {} ({} items)",
                page.page + 1,
                page.page_count(page_size).max(1),
                page.total
            );
            if page.has_next {
                println!("Next: --page {}", page.page + 2);
            }
        }
        Command::SetToken { .. } | Command::ClearToken => {}
    }
    Ok(())
}

/// Resolves the config path and loads it, creating defaults on first run.
pub fn load_config(cli: &Cli) -> Result<Config, String> {
    let path = cli.config_path()?;
    load_or_create_config(&path)
}
