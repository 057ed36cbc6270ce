//! Config file location, first-run defaults and loading.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{sanitize_config, Config};

const CONFIG_DIR_NAME: &str = "tunesearch";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns `<user config dir>/tunesearch/config.toml`.
pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|root| root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve user config directory".to_string())
}

/// Loads the config at `path`, writing sanitized defaults first when the file is missing.
///
/// A file that fails to parse falls back to defaults with a warning instead of aborting.
pub fn load_or_create_config(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    err
                )
            })?;
        }
        let default_config = sanitize_config(Config::default());
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        let serialized = toml::to_string(&default_config)
            .map_err(|err| format!("Failed to serialize default config: {err}"))?;
        std::fs::write(path, serialized)
            .map_err(|err| format!("Failed to write config {}: {}", path.display(), err))?;
        return Ok(default_config);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config {}: {}", path.display(), err))?;
    let parsed = match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Config file is invalid; using defaults. path={} error={}",
                path.display(),
                err
            );
            Config::default()
        }
    };
    Ok(sanitize_config(parsed))
}
