//! Server configuration loader for Cardroom.
//!
//! Reads `config.toml` from the data directory (`~/.cardroom/` in production)
//! and deserializes it into [`ServerConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::Path;

use cardroom_types::config::ServerConfig;

/// Load server configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`ServerConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_server_config(data_dir: &Path) -> ServerConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ServerConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ServerConfig::default();
        }
    };

    match toml::from_str::<ServerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ServerConfig::default()
        }
    }
}
