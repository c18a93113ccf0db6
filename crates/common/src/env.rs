//! Environment/runtime helpers
//!
//! Makes sure the directory holding a file-backed database exists before connecting.

use std::path::PathBuf;
use tracing::debug;

/// Filesystem path of a SQLite database URL, or `None` for in-memory and non-SQLite URLs.
pub fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Ensure the parent directory of a file-backed SQLite database exists.
pub async fn ensure_database_dir(url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_file_path(url) else { return Ok(()) };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
        debug!(dir = %parent.display(), "database directory ready");
    }
    Ok(())
}
