//! Keyring helpers for catalog API tokens.

use keyring::Entry;

const CATALOG_SERVICE_NAME: &str = "tunesearch.catalog.jellyfin";

/// Environment variable that overrides the keyring token.
pub const TOKEN_ENV_VAR: &str = "TUNESEARCH_API_TOKEN";

fn catalog_entry(profile_id: &str) -> Result<Entry, String> {
    Entry::new(CATALOG_SERVICE_NAME, profile_id)
        .map_err(|err| format!("failed to create keyring entry: {err}"))
}

/// Saves the catalog API token for a profile into the OS keyring.
pub fn set_catalog_token(profile_id: &str, token: &str) -> Result<(), String> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err("API token cannot be empty".to_string());
    }
    let entry = catalog_entry(profile_id)?;
    entry
        .set_password(trimmed)
        .map_err(|err| format!("failed to set keyring token: {err}"))
}

/// Loads the catalog API token for a profile from the OS keyring.
pub fn get_catalog_token(profile_id: &str) -> Result<Option<String>, String> {
    let entry = catalog_entry(profile_id)?;
    match entry.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(format!("failed to get keyring token: {err}")),
    }
}

/// Deletes the catalog API token for a profile from the OS keyring.
pub fn delete_catalog_token(profile_id: &str) -> Result<(), String> {
    let entry = catalog_entry(profile_id)?;
    match entry.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(format!("failed to delete keyring token: {err}")),
    }
}

/// Resolves the token from the environment first, then the keyring.
pub fn resolve_catalog_token(profile_id: &str) -> Result<String, String> {
    if let Some(token) = std::env::var(TOKEN_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        return Ok(token);
    }
    get_catalog_token(profile_id)?.ok_or_else(|| {
        format!(
            "missing API token for profile '{profile_id}'. Run `tunesearch set-token <token>` or set {TOKEN_ENV_VAR}."
        )
    })
}
