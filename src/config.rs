//! Persistent configuration model, defaults and sanitization.

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Remote catalog connection settings (non-secret fields only).
    pub catalog: CatalogConfig,
    #[serde(default)]
    /// Ranking cascade parameters.
    pub search: SearchConfig,
    #[serde(default)]
    /// Album track cache policy.
    pub cache: CacheConfig,
    #[serde(default)]
    /// Log output preferences.
    pub logging: LoggingConfig,
}

/// Catalog server profile. The API token lives in the OS keyring or environment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub user_id: String,
    /// Keyring account used to look up the API token.
    #[serde(default = "default_profile_id")]
    pub profile_id: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_requests_per_second")]
    pub max_requests_per_second: u32,
}

/// Per-field weights for one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FieldWeights {
    #[serde(default)]
    pub name: f64,
    #[serde(default)]
    pub album: f64,
    #[serde(default)]
    pub artists: f64,
    /// Synthesized `artists + album artists + album title` field.
    #[serde(default)]
    pub album_full_name: f64,
}

impl FieldWeights {
    pub fn total(&self) -> f64 {
        self.name + self.album + self.artists + self.album_full_name
    }

    fn is_usable(&self) -> bool {
        let values = [self.name, self.album, self.artists, self.album_full_name];
        values.iter().all(|value| value.is_finite() && *value >= 0.0) && self.total() > 0.0
    }
}

/// Tunable parameters of the search cascade.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_result_limit")]
    pub default_limit: usize,
    #[serde(default = "default_direct_search_limit")]
    pub direct_search_limit: usize,
    #[serde(default = "default_per_token_search_limit")]
    pub per_token_search_limit: usize,
    #[serde(default = "default_album_anchor_limit")]
    pub album_anchor_limit: usize,
    #[serde(default = "default_min_tokens")]
    pub min_tokens_for_per_token: usize,
    /// Token count at which the album-biased pass leads the merge.
    #[serde(default = "default_min_tokens")]
    pub min_tokens_for_album_bias: usize,
    #[serde(default = "default_min_tokens")]
    pub min_tokens_for_phrase_fallback: usize,
    /// Per-field distance above which a field does not match.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    #[serde(default = "default_general_pass_weights")]
    pub general_pass: FieldWeights,
    #[serde(default = "default_album_pass_weights")]
    pub album_pass: FieldWeights,
    /// Move the best-ranked album to the front so it anchors track expansion.
    #[serde(default = "default_true")]
    pub promote_first_album: bool,
    /// Splice same-album tracks found by the search itself next to the anchor.
    #[serde(default = "default_true")]
    pub related_track_recovery: bool,
    /// Jaro-Winkler similarity at which two album titles count as the same album.
    #[serde(default = "default_related_album_similarity")]
    pub related_album_similarity: f64,
}

/// Album track cache bounds.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_album_ttl_secs")]
    pub album_ttl_secs: u64,
    #[serde(default = "default_max_albums")]
    pub max_albums: usize,
}

/// Log verbosity persisted in config.
#[derive(Debug, Clone, Copy, serde::Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

fn default_true() -> bool {
    true
}

fn default_profile_id() -> String {
    "default".to_string()
}

fn default_device_name() -> String {
    "tunesearch".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_max_requests_per_second() -> u32 {
    10
}

fn default_result_limit() -> usize {
    25
}

fn default_direct_search_limit() -> usize {
    400
}

fn default_per_token_search_limit() -> usize {
    200
}

fn default_album_anchor_limit() -> usize {
    3
}

fn default_min_tokens() -> usize {
    2
}

fn default_match_threshold() -> f64 {
    0.55
}

fn default_related_album_similarity() -> f64 {
    0.92
}

pub fn default_general_pass_weights() -> FieldWeights {
    FieldWeights {
        name: 0.4,
        album: 0.3,
        artists: 0.3,
        album_full_name: 0.0,
    }
}

pub fn default_album_pass_weights() -> FieldWeights {
    FieldWeights {
        name: 0.03,
        album: 0.15,
        artists: 0.07,
        album_full_name: 0.75,
    }
}

fn default_album_ttl_secs() -> u64 {
    30 * 60
}

fn default_max_albums() -> usize {
    512
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            user_id: String::new(),
            profile_id: default_profile_id(),
            device_name: default_device_name(),
            request_timeout_secs: default_request_timeout_secs(),
            max_requests_per_second: default_max_requests_per_second(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_result_limit(),
            direct_search_limit: default_direct_search_limit(),
            per_token_search_limit: default_per_token_search_limit(),
            album_anchor_limit: default_album_anchor_limit(),
            min_tokens_for_per_token: default_min_tokens(),
            min_tokens_for_album_bias: default_min_tokens(),
            min_tokens_for_phrase_fallback: default_min_tokens(),
            match_threshold: default_match_threshold(),
            general_pass: default_general_pass_weights(),
            album_pass: default_album_pass_weights(),
            promote_first_album: true,
            related_track_recovery: true,
            related_album_similarity: default_related_album_similarity(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            album_ttl_secs: default_album_ttl_secs(),
            max_albums: default_max_albums(),
        }
    }
}

fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Clamps every tunable into a range the engine can run with.
pub fn sanitize_config(config: Config) -> Config {
    let search = config.search;
    let general_pass = if search.general_pass.is_usable() {
        search.general_pass
    } else {
        default_general_pass_weights()
    };
    let album_pass = if search.album_pass.is_usable() {
        search.album_pass
    } else {
        default_album_pass_weights()
    };

    Config {
        catalog: CatalogConfig {
            request_timeout_secs: config.catalog.request_timeout_secs.clamp(1, 300),
            max_requests_per_second: config.catalog.max_requests_per_second.max(1),
            ..config.catalog
        },
        search: SearchConfig {
            default_limit: search.default_limit.max(1),
            direct_search_limit: search.direct_search_limit.max(1),
            per_token_search_limit: search.per_token_search_limit.max(1),
            album_anchor_limit: search.album_anchor_limit.max(1),
            min_tokens_for_per_token: search.min_tokens_for_per_token.max(2),
            min_tokens_for_album_bias: search.min_tokens_for_album_bias.max(1),
            min_tokens_for_phrase_fallback: search.min_tokens_for_phrase_fallback.max(2),
            match_threshold: clamp_unit(search.match_threshold, default_match_threshold()),
            general_pass,
            album_pass,
            related_album_similarity: clamp_unit(
                search.related_album_similarity,
                default_related_album_similarity(),
            ),
            ..search
        },
        // A zero TTL is kept: it turns album caching off.
        cache: CacheConfig {
            max_albums: config.cache.max_albums.max(1),
            ..config.cache
        },
        logging: config.logging,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        default_album_pass_weights, default_general_pass_weights, sanitize_config, Config,
        CacheConfig, FieldWeights, LogLevel, SearchConfig,
    };

    #[test]
    fn test_empty_toml_yields_defaults() {
        let parsed: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(parsed, Config::default());
        assert_eq!(parsed.search.direct_search_limit, 400);
        assert_eq!(parsed.search.per_token_search_limit, 200);
        assert_eq!(parsed.search.album_anchor_limit, 3);
        assert!((parsed.search.match_threshold - 0.55).abs() < f64::EPSILON);
        assert_eq!(parsed.cache.album_ttl_secs, 1800);
        assert_eq!(parsed.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_partial_search_section_keeps_other_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [catalog]
            endpoint = "https://media.example.com"
            user_id = "user-1"

            [search]
            match_threshold = 0.4
            promote_first_album = false

            [search.album_pass]
            album_full_name = 1.0

            [logging]
            level = "debug"
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(parsed.catalog.endpoint, "https://media.example.com");
        assert_eq!(parsed.catalog.profile_id, "default");
        assert!((parsed.search.match_threshold - 0.4).abs() < f64::EPSILON);
        assert!(!parsed.search.promote_first_album);
        assert!(parsed.search.related_track_recovery);
        assert_eq!(parsed.search.general_pass, default_general_pass_weights());
        assert_eq!(
            parsed.search.album_pass,
            FieldWeights {
                name: 0.0,
                album: 0.0,
                artists: 0.0,
                album_full_name: 1.0,
            }
        );
        assert_eq!(parsed.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let serialized =
            toml::to_string(&Config::default()).expect("default config should serialize to toml");
        let parsed: Config =
            toml::from_str(&serialized).expect("serialized config should deserialize");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_sanitize_config_clamps_thresholds_and_limits() {
        let input = Config {
            search: SearchConfig {
                match_threshold: 3.5,
                related_album_similarity: f64::NAN,
                direct_search_limit: 0,
                min_tokens_for_per_token: 0,
                ..SearchConfig::default()
            },
            ..Config::default()
        };
        let sanitized = sanitize_config(input);
        assert!((sanitized.search.match_threshold - 1.0).abs() < f64::EPSILON);
        assert!((sanitized.search.related_album_similarity - 0.92).abs() < f64::EPSILON);
        assert_eq!(sanitized.search.direct_search_limit, 1);
        assert_eq!(sanitized.search.min_tokens_for_per_token, 2);
    }

    #[test]
    fn test_sanitize_config_keeps_zero_album_ttl() {
        let input = Config {
            cache: CacheConfig {
                album_ttl_secs: 0,
                max_albums: 0,
            },
            ..Config::default()
        };
        let sanitized = sanitize_config(input);
        assert_eq!(sanitized.cache.album_ttl_secs, 0);
        assert_eq!(sanitized.cache.max_albums, 1);
    }

    #[test]
    fn test_sanitize_config_restores_unusable_weights() {
        let input = Config {
            search: SearchConfig {
                general_pass: FieldWeights {
                    name: 0.0,
                    album: 0.0,
                    artists: 0.0,
                    album_full_name: 0.0,
                },
                album_pass: FieldWeights {
                    name: -1.0,
                    album: 0.5,
                    artists: 0.5,
                    album_full_name: 0.5,
                },
                ..SearchConfig::default()
            },
            ..Config::default()
        };
        let sanitized = sanitize_config(input);
        assert_eq!(sanitized.search.general_pass, default_general_pass_weights());
        assert_eq!(sanitized.search.album_pass, default_album_pass_weights());
    }
}
