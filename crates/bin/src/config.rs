//! Host configuration.

use std::path::Path;

use anyhow::Context;
use client::ClientConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Root of `viewer.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub host: HostConfig,
    /// Handed to the browser as `/config.json`.
    #[serde(default)]
    pub client: ClientConfig,
}

impl ViewerConfig {
    /// Load configuration from `path`, creating a default file when it is missing.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::parse(&contents)?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.client.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// The `[client]` table as the JSON object the browser expects.
    pub fn client_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self.client)?)
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on. `PORT` in the environment takes precedence.
    #[serde(default = "default_port")]
    pub port: u16,
    /// On-disk directory searched after the embedded assets, e.g. for `world.jpg`.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            assets_dir: default_assets_dir(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_assets_dir() -> String {
    "assets".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ViewerConfig::parse("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.host.port, 3000);
        assert_eq!(config.client.minimap_size, 200.0);
    }

    #[test]
    fn test_partial_tables() {
        let config = ViewerConfig::parse(
            r#"
            [host]
            port = 8080

            [client]
            server_url = "ws://localhost:9000"
            smooth_movement = true
            "#,
        )
        .unwrap();
        assert_eq!(config.host.port, 8080);
        assert_eq!(config.host.bind, "0.0.0.0");
        assert_eq!(config.host.assets_dir, "assets");
        assert_eq!(config.client.server_url, "ws://localhost:9000");
        assert!(config.client.smooth_movement);
        assert_eq!(config.client.username, "Ron");
    }

    #[test]
    fn test_client_json_round_trips() {
        let config = ViewerConfig::default();
        let json = config.client_json().unwrap();
        assert_eq!(ClientConfig::from_json(&json).unwrap(), config.client);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = std::env::temp_dir().join(format!("world-viewer-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("viewer.toml");
        let _ = std::fs::remove_file(&path);

        let created = ViewerConfig::load(&path).unwrap();
        assert!(path.exists());
        let reloaded = ViewerConfig::load(&path).unwrap();
        assert_eq!(created, reloaded);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_rejects_invalid_client_section() {
        let dir = std::env::temp_dir().join(format!("world-viewer-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("viewer.toml");
        std::fs::write(&path, "[client]\ninterpolation_alpha = 2.0\n").unwrap();

        assert!(ViewerConfig::load(&path).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
