//! Trait catalog
//!
//! Immutable lookup table of every trait the engine knows, loaded once from
//! TOML (builtin definitions, then optional user overrides) and validated
//! before any match starts.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  traits.toml (builtin)  +  user overrides    │
//! └──────────────────────────────────────────────┘
//!                      │ load_catalog / validate
//!                      ▼
//!               TraitCatalog (Arc)
//!                      │ get / cooldown_for_cycle
//!                      ▼
//!          MatchSession (one per guild)
//! ```

mod config;

pub use config::{
    BUILTIN_TRAITS, CatalogError, default_builtin_dir, default_custom_dir, load_catalog, load_file,
};

use hashbrown::HashMap;
use traitwatch_types::{DefinitionConfig, EngineConfig, TraitDefinition, TraitMode};

use crate::error::UnknownTraitError;

#[derive(Debug, Clone, Default)]
pub struct TraitCatalog {
    traits: HashMap<String, TraitDefinition>,
    /// Keys in first-seen order, for stable listings
    order: Vec<String>,
}

impl TraitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog built from the definitions shipped with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        let config: DefinitionConfig = toml::from_str(BUILTIN_TRAITS).map_err(CatalogError::Builtin)?;
        let mut catalog = Self::new();
        catalog.add_config(config);
        Ok(catalog)
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = TraitDefinition>) -> Self {
        let mut catalog = Self::new();
        catalog.add_config(DefinitionConfig {
            traits: definitions.into_iter().collect(),
        });
        catalog
    }

    /// Add definitions, replacing existing ones with the same key.
    /// Returns the keys that were replaced.
    pub fn add_config(&mut self, config: DefinitionConfig) -> Vec<String> {
        let mut duplicates = Vec::new();
        for def in config.traits {
            if self.traits.contains_key(&def.key) {
                duplicates.push(def.key.clone());
            } else {
                self.order.push(def.key.clone());
            }
            self.traits.insert(def.key.clone(), def);
        }
        duplicates
    }

    pub fn get(&self, key: &str) -> Result<&TraitDefinition, UnknownTraitError> {
        self.traits.get(key).ok_or_else(|| UnknownTraitError::new(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.traits.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Definitions in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &TraitDefinition> {
        self.order.iter().filter_map(|key| self.traits.get(key))
    }

    /// Cooldown in seconds for a trait's next cycle.
    ///
    /// First use runs on the initial cooldown; every later cycle runs on the
    /// steady cooldown, clamped to the trait's cap.
    pub fn cooldown_for_cycle(&self, key: &str, is_first_use: bool) -> Result<u32, UnknownTraitError> {
        let def = self.get(key)?;
        Ok(if is_first_use {
            def.initial_cooldown_secs()
        } else {
            def.steady_cooldown_secs()
        })
    }

    /// Check every definition and the engine config against this catalog.
    /// Meant to run once at startup; any error is fatal.
    pub fn validate(&self, engine: &EngineConfig) -> Result<(), CatalogError> {
        for def in self.iter() {
            let invalid = |reason: &str| CatalogError::Invalid {
                key: def.key.clone(),
                reason: reason.to_string(),
            };

            if def.key.trim().is_empty() {
                return Err(invalid("empty key"));
            }
            if def.token.trim().is_empty() {
                return Err(invalid("empty token"));
            }
            match def.mode {
                TraitMode::Scalar {
                    steady_secs,
                    cap_secs,
                    ..
                } => {
                    if steady_secs == 0 {
                        return Err(invalid("steady cooldown must be positive"));
                    }
                    if cap_secs == Some(0) {
                        return Err(invalid("cap must be positive"));
                    }
                }
                TraitMode::Stacking {
                    max_stacks,
                    charge_interval_secs,
                    ..
                } => {
                    if max_stacks == 0 {
                        return Err(invalid("max_stacks must be at least 1"));
                    }
                    if charge_interval_secs == 0 {
                        return Err(invalid("charge interval must be positive"));
                    }
                }
            }
        }

        for key in &engine.headline_traits {
            self.get(key)?;
        }

        let cadences = [
            ("panel_refresh_ms", engine.panel_refresh_ms),
            ("stacking_tick_ms", engine.stacking_tick_ms),
            ("stacking_scale_secs", u64::from(engine.conversion.stacking_scale_secs)),
        ];
        for (name, value) in cadences {
            if value == 0 {
                return Err(CatalogError::Invalid {
                    key: "engine".to_string(),
                    reason: format!("{name} must be positive"),
                });
            }
        }
        Ok(())
    }
}
