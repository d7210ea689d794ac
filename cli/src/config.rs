//! Front-end settings, persisted with confy

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use traitwatch_types::{EngineConfig, GuildId};

const APP_NAME: &str = "traitwatch";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Guild the REPL acts on at startup
    pub guild_id: GuildId,

    /// Directory holding `<stem>.ogg` / `<stem>.wav` voice clips
    pub audio_dir: Option<PathBuf>,

    /// User trait definitions, overriding builtins by key
    pub catalog_dir: Option<PathBuf>,

    /// Install-provided definitions; defaults to `definitions/` next to the binary
    pub builtin_catalog_dir: Option<PathBuf>,

    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            guild_id: 1,
            audio_dir: dirs::data_dir().map(|p| p.join(APP_NAME).join("audio")),
            catalog_dir: None,
            builtin_catalog_dir: None,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the platform config dir, falling back to defaults
    pub fn load() -> Self {
        match confy::load(APP_NAME, None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    pub fn store(&self) {
        if let Err(e) = confy::store(APP_NAME, None, self) {
            tracing::warn!(error = %e, "Failed to save config");
        }
    }

    pub fn custom_catalog_dir(&self) -> Option<PathBuf> {
        self.catalog_dir
            .clone()
            .or_else(traitwatch_core::catalog::default_custom_dir)
    }

    pub fn builtin_catalog_dir(&self) -> Option<PathBuf> {
        self.builtin_catalog_dir
            .clone()
            .or_else(traitwatch_core::catalog::default_builtin_dir)
    }
}
