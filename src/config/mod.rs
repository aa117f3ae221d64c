use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_tick_ms() -> u64 {
    400
}

fn default_follow() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Milliseconds between auto-steps while playback is running.
    #[serde(default = "default_tick_ms")]
    pub playback_tick_ms: u64,

    /// Show interceptor-hidden calls in the list.
    #[serde(default)]
    pub show_hidden_calls: bool,

    /// Keep the viewport glued to the newest call while playing.
    #[serde(default = "default_follow")]
    pub follow_end: bool,

    /// Do not surface unhandled errors from the trace at all. When set the
    /// panel never sees the collection, so the block does not render.
    #[serde(default)]
    pub ignore_unhandled_errors: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            playback_tick_ms: default_tick_ms(),
            show_hidden_calls: false,
            follow_end: default_follow(),
            ignore_unhandled_errors: false,
        }
    }
}

impl PanelConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("tracepane");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or fall back to defaults.
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Self::default(),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = Self::default();
        let _ = config.save();
        config
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
