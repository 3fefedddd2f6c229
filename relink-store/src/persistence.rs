//! JSON file persistence.
//!
//! Cache files hold cookies and tokens, so every file is written owner-only
//! and replaced atomically.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Application directory name under the platform config/cache roots.
const APP_DIR: &str = "relink";

/// Sequence for temp file names; each write gets its own file.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory (`~/.config/relink` on Linux).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default cache directory (`~/.cache/relink` on Linux).
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|c| c.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

/// Returns the default credential bundle path.
pub fn default_credentials_path() -> PathBuf {
    default_config_dir().join("credentials.json")
}

/// Stream cache file inside `cache_dir`.
pub fn streams_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("streams.json")
}

/// Token cache file inside `cache_dir`.
pub fn tokens_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("tokens.json")
}

// ============================================================================
// Permissions
// ============================================================================

#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Ensures a directory exists, owner-only when newly created.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !tokio::fs::try_exists(path).await? {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
        restrict(path, 0o700).await?;
    }
    Ok(())
}

/// Saves data as pretty JSON.
///
/// The temp file is restricted to 0600 before it is renamed over the
/// target, so the contents are never readable by other users. Callers that
/// write the same path concurrently must order their writes themselves.
pub async fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = temp_path_for(path);
    let written: Result<(), StoreError> = async {
        tokio::fs::write(&temp_path, &json).await?;
        restrict(&temp_path, 0o600).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }
    .await;
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    debug!(path = %path.display(), bytes = json.len(), "JSON file saved");
    Ok(())
}

/// Sibling temp path unique to this process and write.
fn temp_path_for(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

/// Loads data from a JSON file, returning the default if missing or corrupt.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json(path).await {
        Ok(data) => data,
        Err(e) => {
            if !e.is_not_found() {
                warn!(path = %path.display(), error = %e, "Failed to load, using defaults");
            }
            T::default()
        }
    }
}

/// Removes a file, treating a missing file as success.
pub async fn remove_file(path: &Path) -> Result<(), StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
