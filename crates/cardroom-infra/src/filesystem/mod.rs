//! Data directory layout.

use std::path::PathBuf;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "CARDROOM_DATA_DIR";

/// Resolve the Cardroom data directory.
///
/// Checks `CARDROOM_DATA_DIR` first, then falls back to `~/.cardroom`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".cardroom");
    }

    PathBuf::from(".cardroom")
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(dir: &std::path::Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}
