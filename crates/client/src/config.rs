//! Client configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config object: {0}")]
    Js(String),

    #[error("server_url must not be empty")]
    EmptyServerUrl,

    #[error("world size must be positive, got {width}x{height}")]
    WorldSize { width: f64, height: f64 },

    #[error("minimap_size must be positive, got {0}")]
    MinimapSize(f64),

    #[error("interpolation_alpha must lie in (0, 1), got {0}")]
    InterpolationAlpha(f64),

    #[error("update_interval_ms must be positive, got {0}")]
    UpdateInterval(f64),
}

/// Every tunable of the viewer. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// WebSocket endpoint of the world server.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Name sent with `join_game`.
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_world_extent")]
    pub world_width: f64,
    #[serde(default = "default_world_extent")]
    pub world_height: f64,
    /// Background image source for the world and the minimap.
    #[serde(default = "default_world_image")]
    pub world_image: String,
    /// Minimap edge length in pixels.
    #[serde(default = "default_minimap_size")]
    pub minimap_size: f64,
    /// Sprite width in pixels; height follows the source aspect ratio.
    #[serde(default = "default_avatar_size")]
    pub avatar_size: f64,
    /// Off-screen slack before an entity is culled.
    #[serde(default = "default_cull_margin")]
    pub cull_margin: f64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: f64,
    /// Resend period for held movement keys.
    #[serde(default = "default_move_resend")]
    pub move_resend_ms: f64,
    /// Period of the update tick. Runs on a timer, apart from rendering.
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: f64,
    /// Per-tick blend factor of the shadow positions.
    #[serde(default = "default_interpolation_alpha")]
    pub interpolation_alpha: f64,
    /// Draw shadow positions instead of authoritative ones.
    #[serde(default)]
    pub smooth_movement: bool,
    #[serde(default = "default_max_chat_messages")]
    pub max_chat_messages: usize,
    /// `EnvFilter` directive for browser logging.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config object handed over from JavaScript. `undefined`/`null` yield defaults.
    pub fn from_js(value: wasm_bindgen::JsValue) -> Result<Self, ConfigError> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_wasm_bindgen::from_value(value).map_err(|e| ConfigError::Js(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::EmptyServerUrl);
        }
        if !(self.world_width > 0.0 && self.world_height > 0.0) {
            return Err(ConfigError::WorldSize {
                width: self.world_width,
                height: self.world_height,
            });
        }
        if !(self.minimap_size > 0.0) {
            return Err(ConfigError::MinimapSize(self.minimap_size));
        }
        if !(self.interpolation_alpha > 0.0 && self.interpolation_alpha < 1.0) {
            return Err(ConfigError::InterpolationAlpha(self.interpolation_alpha));
        }
        if !(self.update_interval_ms > 0.0) {
            return Err(ConfigError::UpdateInterval(self.update_interval_ms));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            username: default_username(),
            world_width: default_world_extent(),
            world_height: default_world_extent(),
            world_image: default_world_image(),
            minimap_size: default_minimap_size(),
            avatar_size: default_avatar_size(),
            cull_margin: default_cull_margin(),
            reconnect_delay_ms: default_reconnect_delay(),
            move_resend_ms: default_move_resend(),
            update_interval_ms: default_update_interval(),
            interpolation_alpha: default_interpolation_alpha(),
            smooth_movement: false,
            max_chat_messages: default_max_chat_messages(),
            log_level: default_log_level(),
        }
    }
}

fn default_server_url() -> String {
    "wss://codepath-mmorg.onrender.com".to_string()
}
fn default_username() -> String {
    "Ron".to_string()
}
fn default_world_extent() -> f64 {
    2048.0
}
fn default_world_image() -> String {
    "world.jpg".to_string()
}
fn default_minimap_size() -> f64 {
    200.0
}
fn default_avatar_size() -> f64 {
    32.0
}
fn default_cull_margin() -> f64 {
    50.0
}
fn default_reconnect_delay() -> f64 {
    3000.0
}
fn default_move_resend() -> f64 {
    100.0
}
fn default_update_interval() -> f64 {
    16.0
}
fn default_interpolation_alpha() -> f64 {
    0.1
}
fn default_max_chat_messages() -> usize {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.world_width, 2048.0);
        assert_eq!(config.reconnect_delay_ms, 3000.0);
        assert!(!config.smooth_movement);
    }

    #[test]
    fn test_partial_override() {
        let config = ClientConfig::from_json(r#"{"username":"Ada","smooth_movement":true}"#).unwrap();
        assert_eq!(config.username, "Ada");
        assert!(config.smooth_movement);
        assert_eq!(config.minimap_size, 200.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ClientConfig::from_json(r#"{"interpolation_alpha":1.0}"#),
            Err(ConfigError::InterpolationAlpha(_))
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{"world_width":0}"#),
            Err(ConfigError::WorldSize { .. })
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{"server_url":"  "}"#),
            Err(ConfigError::EmptyServerUrl)
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{"update_interval_ms":0}"#),
            Err(ConfigError::UpdateInterval(_))
        ));
        assert!(matches!(ClientConfig::from_json("nope"), Err(ConfigError::Json(_))));
    }
}
