//! Jellyfin catalog adapter implementation.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::state::NotKeyed;
use governor::{Quota, RateLimiter};
use log::debug;
use serde_json::Value;

use crate::backends::{
    CatalogClient, CatalogError, CatalogItem, CatalogPage, CatalogSort, ItemKind, PageRequest,
};

const CLIENT_NAME: &str = "tunesearch";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const RATE_LIMIT_WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Connection profile used by the Jellyfin adapter.
#[derive(Debug, Clone)]
pub struct JellyfinProfile {
    pub endpoint: String,
    pub user_id: String,
    pub token: String,
    pub device_name: String,
    pub request_timeout: Duration,
    pub max_requests_per_second: u32,
}

type DirectLimiter =
    RateLimiter<NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

struct JellyfinInner {
    http_client: ureq::Agent,
    profile: JellyfinProfile,
    device_id: String,
    limiter: DirectLimiter,
}

/// Jellyfin adapter backed by `ureq`; blocking requests run on tokio's blocking pool.
#[derive(Clone)]
pub struct JellyfinAdapter {
    inner: Arc<JellyfinInner>,
}

impl JellyfinAdapter {
    /// Creates a new adapter bound to one server profile.
    pub fn new(profile: JellyfinProfile) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(profile.request_timeout)
            .timeout_write(profile.request_timeout)
            .build();
        let per_second = NonZeroU32::new(profile.max_requests_per_second.max(1))
            .unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(JellyfinInner {
                http_client,
                device_id: uuid::Uuid::new_v4().to_string(),
                limiter: RateLimiter::direct(Quota::per_second(per_second)),
                profile,
            }),
        }
    }

    async fn run_blocking<T, F>(&self, operation: &'static str, job: F) -> Result<T, CatalogError>
    where
        T: Send + 'static,
        F: FnOnce(&JellyfinInner) -> Result<T, CatalogError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || job(&inner))
            .await
            .map_err(|err| CatalogError::Unavailable {
                operation,
                reason: format!("request worker failed: {err}"),
            })?
    }
}

fn jellyfin_type_name(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Track => "Audio",
        ItemKind::Album => "MusicAlbum",
        ItemKind::Playlist => "Playlist",
        ItemKind::Artist => "MusicArtist",
    }
}

fn kind_from_jellyfin_type(type_name: &str) -> Option<ItemKind> {
    match type_name {
        "Audio" => Some(ItemKind::Track),
        "MusicAlbum" => Some(ItemKind::Album),
        "Playlist" => Some(ItemKind::Playlist),
        "MusicArtist" => Some(ItemKind::Artist),
        _ => None,
    }
}

fn include_item_types(kinds: &[ItemKind]) -> Option<String> {
    if kinds.is_empty() {
        return None;
    }
    Some(
        kinds
            .iter()
            .map(|kind| jellyfin_type_name(*kind))
            .collect::<Vec<_>>()
            .join(","),
    )
}

fn sort_params(sort: CatalogSort) -> Vec<(&'static str, String)> {
    match sort {
        CatalogSort::Name => vec![
            ("SortBy", "SortName".to_string()),
            ("SortOrder", "Ascending".to_string()),
        ],
        CatalogSort::DiscAndTrack => vec![
            ("SortBy", "ParentIndexNumber,IndexNumber,SortName".to_string()),
            ("SortOrder", "Ascending".to_string()),
        ],
        CatalogSort::Random => vec![("SortBy", "Random".to_string())],
        CatalogSort::PlaylistOrder => Vec::new(),
    }
}

fn name_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(name) => Some(name.as_str()),
            Value::Object(_) => entry.get("Name").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn index_number(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .and_then(|number| u32::try_from(number).ok())
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

/// Parses one `BaseItemDto`. Items without an id or with an unsupported type are skipped.
fn parse_item(value: &Value) -> Option<CatalogItem> {
    let id = non_empty_str(value.get("Id"))?;
    let kind = kind_from_jellyfin_type(value.get("Type")?.as_str()?)?;
    let name = value
        .get("Name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let mut album_artists = name_list(value.get("AlbumArtists"));
    if album_artists.is_empty() {
        album_artists.extend(non_empty_str(value.get("AlbumArtist")));
    }
    let album = match kind {
        ItemKind::Track => non_empty_str(value.get("Album")),
        _ => None,
    };
    let parent_id =
        non_empty_str(value.get("AlbumId")).or_else(|| non_empty_str(value.get("ParentId")));
    Some(CatalogItem {
        id,
        kind,
        name,
        album,
        artists: name_list(value.get("Artists")),
        album_artists,
        disc_number: index_number(value.get("ParentIndexNumber")),
        track_number: index_number(value.get("IndexNumber")),
        parent_id,
    })
}

fn parse_items_payload(
    operation: &'static str,
    payload: &Value,
) -> Result<CatalogPage, CatalogError> {
    if !payload.is_object() {
        return Err(CatalogError::Decode {
            operation,
            reason: "expected a JSON object".to_string(),
        });
    }
    let items: Vec<CatalogItem> = match payload.get("Items") {
        Some(Value::Array(entries)) => entries.iter().filter_map(parse_item).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return Err(CatalogError::Decode {
                operation,
                reason: "`Items` is not an array".to_string(),
            })
        }
    };
    let total_count = payload
        .get("TotalRecordCount")
        .and_then(Value::as_u64)
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or(items.len());
    Ok(CatalogPage { items, total_count })
}

impl JellyfinInner {
    fn endpoint_base(&self) -> String {
        self.profile.endpoint.trim().trim_end_matches('/').to_string()
    }

    fn authorization_header(&self) -> String {
        format!(
            "MediaBrowser Client=\"{CLIENT_NAME}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{CLIENT_VERSION}\", Token=\"{}\"",
            self.profile.device_name, self.device_id, self.profile.token
        )
    }

    fn api_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.endpoint_base(), path);
        if params.is_empty() {
            return url;
        }
        url.push('?');
        for (index, (key, value)) in params.iter().enumerate() {
            if index > 0 {
                url.push('&');
            }
            url.push_str(key);
            url.push('=');
            url.push_str(urlencoding::encode(value).as_ref());
        }
        url
    }

    fn wait_for_rate_limit_slot(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        let deadline = std::time::Instant::now() + RATE_LIMIT_WAIT_LIMIT;
        while std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
            if self.limiter.check().is_ok() {
                return;
            }
        }
        debug!("Jellyfin: rate limit wait cap reached; sending request anyway");
    }

    fn request_json(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, CatalogError> {
        self.wait_for_rate_limit_slot();
        let url = self.api_url(path, params);
        let response = self
            .http_client
            .get(&url)
            .set("Authorization", &self.authorization_header())
            .set("Accept", "application/json")
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(401 | 403, _) => CatalogError::Unauthorized { operation },
                ureq::Error::Status(code, _) => CatalogError::Unavailable {
                    operation,
                    reason: format!("server returned status {code}"),
                },
                ureq::Error::Transport(transport) => CatalogError::Unavailable {
                    operation,
                    reason: transport.to_string(),
                },
            })?;
        response
            .into_json::<Value>()
            .map_err(|err| CatalogError::Decode {
                operation,
                reason: err.to_string(),
            })
    }

    fn user_items_path(&self) -> String {
        format!("/Users/{}/Items", urlencoding::encode(&self.profile.user_id))
    }

    fn fetch_items(
        &self,
        operation: &'static str,
        path: &str,
        mut params: Vec<(&'static str, String)>,
        kinds: &[ItemKind],
    ) -> Result<CatalogPage, CatalogError> {
        if let Some(types) = include_item_types(kinds) {
            params.push(("IncludeItemTypes", types));
        }
        let payload = self.request_json(operation, path, &params)?;
        let page = parse_items_payload(operation, &payload)?;
        debug!(
            "Jellyfin {}: {} items (total {})",
            operation,
            page.items.len(),
            page.total_count
        );
        Ok(page)
    }
}

#[async_trait]
impl CatalogClient for JellyfinAdapter {
    async fn search(
        &self,
        term: &str,
        kinds: &[ItemKind],
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let term = term.to_string();
        let kinds = kinds.to_vec();
        self.run_blocking("search", move |inner| {
            let mut params = vec![
                ("SearchTerm", term),
                ("Recursive", "true".to_string()),
                ("Limit", limit.to_string()),
            ];
            params.extend(sort_params(CatalogSort::Name));
            let path = inner.user_items_path();
            inner
                .fetch_items("search", &path, params, &kinds)
                .map(|page| page.items)
        })
        .await
    }

    async fn list_children(
        &self,
        parent_id: &str,
        kinds: &[ItemKind],
        sort: CatalogSort,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let parent_id = parent_id.to_string();
        let kinds = kinds.to_vec();
        self.run_blocking("list_children", move |inner| {
            if sort == CatalogSort::PlaylistOrder {
                let path = format!("/Playlists/{}/Items", urlencoding::encode(&parent_id));
                let params = vec![("UserId", inner.profile.user_id.clone())];
                return inner
                    .fetch_items("list_children", &path, params, &kinds)
                    .map(|page| page.items);
            }
            let mut params = vec![
                ("ParentId", parent_id),
                ("Recursive", "true".to_string()),
            ];
            params.extend(sort_params(sort));
            let path = inner.user_items_path();
            inner
                .fetch_items("list_children", &path, params, &kinds)
                .map(|page| page.items)
        })
        .await
    }

    async fn get_by_ids(
        &self,
        ids: &[String],
        kinds: &[ItemKind],
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined_ids = ids.join(",");
        let kinds = kinds.to_vec();
        self.run_blocking("get_by_ids", move |inner| {
            let params = vec![("Ids", joined_ids)];
            let path = inner.user_items_path();
            inner
                .fetch_items("get_by_ids", &path, params, &kinds)
                .map(|page| page.items)
        })
        .await
    }

    async fn list_all(
        &self,
        kinds: &[ItemKind],
        sort: CatalogSort,
        page: PageRequest,
    ) -> Result<CatalogPage, CatalogError> {
        let kinds = kinds.to_vec();
        self.run_blocking("list_all", move |inner| {
            let mut params = vec![
                ("Recursive", "true".to_string()),
                ("StartIndex", page.offset.to_string()),
                ("Limit", page.limit.to_string()),
            ];
            params.extend(sort_params(sort));
            let path = inner.user_items_path();
            inner.fetch_items("list_all", &path, params, &kinds)
        })
        .await
    }

    async fn list_by_artist(
        &self,
        artist_id: &str,
        kinds: &[ItemKind],
        sort: CatalogSort,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let artist_id = artist_id.to_string();
        let kinds = kinds.to_vec();
        self.run_blocking("list_by_artist", move |inner| {
            let mut params = vec![
                ("ArtistIds", artist_id),
                ("Recursive", "true".to_string()),
                ("Filters", "IsNotFolder".to_string()),
            ];
            params.extend(sort_params(sort));
            let path = inner.user_items_path();
            inner
                .fetch_items("list_by_artist", &path, params, &kinds)
                .map(|page| page.items)
        })
        .await
    }
}
