//! Trait definition types
//!
//! Definitions are templates loaded from TOML describing how each trait
//! recovers after use. A trait is either a single scalar cooldown or a
//! charge-accumulating stack; the two never mix.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// Trait Mode
// ═══════════════════════════════════════════════════════════════════════════

/// How a trait recovers after use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TraitMode {
    /// One cooldown per use
    Scalar {
        /// Cooldown counted from match start
        initial_secs: u32,
        /// Cooldown after every use
        steady_secs: u32,
        /// Upper bound applied to steady cycles and conversions
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cap_secs: Option<u32>,
    },
    /// Accumulates discrete charges over time
    Stacking {
        max_stacks: u8,
        first_charge_secs: u32,
        charge_interval_secs: u32,
    },
}

/// Charge schedule of a stacking trait, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackingParams {
    pub max_stacks: u8,
    pub first_charge_ms: u64,
    pub charge_interval_ms: u64,
}

impl StackingParams {
    /// Time from zero charges to a full stack
    pub fn full_charge_ms(&self) -> u64 {
        if self.max_stacks == 0 {
            return 0;
        }
        self.first_charge_ms + u64::from(self.max_stacks - 1) * self.charge_interval_ms
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Trait Definitions
// ═══════════════════════════════════════════════════════════════════════════

/// Definition of a tracked trait (loaded from config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitDefinition {
    /// Unique identifier (e.g., "kofun")
    pub key: String,

    /// Display name shown on the panel
    pub name: String,

    /// Voice/display token used in announcements
    pub token: String,

    pub mode: TraitMode,
}

impl TraitDefinition {
    pub fn is_stacking(&self) -> bool {
        matches!(self.mode, TraitMode::Stacking { .. })
    }

    /// Seconds until first availability, counted from match start.
    /// For stacking traits this is the first charge.
    pub fn initial_cooldown_secs(&self) -> u32 {
        match self.mode {
            TraitMode::Scalar { initial_secs, .. } => initial_secs,
            TraitMode::Stacking { first_charge_secs, .. } => first_charge_secs,
        }
    }

    /// Steady cooldown after a use, already clamped to the cap
    pub fn steady_cooldown_secs(&self) -> u32 {
        match self.mode {
            TraitMode::Scalar { steady_secs, cap_secs, .. } => {
                cap_secs.map_or(steady_secs, |cap| steady_secs.min(cap))
            }
            TraitMode::Stacking { charge_interval_secs, .. } => charge_interval_secs,
        }
    }

    pub fn cap_secs(&self) -> Option<u32> {
        match self.mode {
            TraitMode::Scalar { cap_secs, .. } => cap_secs,
            TraitMode::Stacking { .. } => None,
        }
    }

    /// Charge schedule, `None` for scalar traits
    pub fn stacking(&self) -> Option<StackingParams> {
        match self.mode {
            TraitMode::Stacking {
                max_stacks,
                first_charge_secs,
                charge_interval_secs,
            } => Some(StackingParams {
                max_stacks,
                first_charge_ms: u64::from(first_charge_secs) * 1000,
                charge_interval_ms: u64::from(charge_interval_secs) * 1000,
            }),
            TraitMode::Scalar { .. } => None,
        }
    }
}

/// Root of a catalog TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionConfig {
    #[serde(default, rename = "trait")]
    pub traits: Vec<TraitDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_and_stacking_traits() {
        let toml = r#"
[[trait]]
key = "listen"
name = "Listen"
token = "listen"

[trait.mode]
type = "scalar"
initial_secs = 20
steady_secs = 90
cap_secs = 80

[[trait]]
key = "kanshisha"
name = "Watcher"
token = "kanshisha"

[trait.mode]
type = "stacking"
max_stacks = 3
first_charge_secs = 10
charge_interval_secs = 30
"#;

        let config: DefinitionConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.traits.len(), 2);

        let listen = &config.traits[0];
        assert!(!listen.is_stacking());
        assert_eq!(listen.initial_cooldown_secs(), 20);
        assert_eq!(listen.steady_cooldown_secs(), 80, "steady is clamped to the cap");

        let watcher = &config.traits[1];
        assert!(watcher.is_stacking());
        let params = watcher.stacking().unwrap();
        assert_eq!(params.first_charge_ms, 10_000);
        assert_eq!(params.full_charge_ms(), 70_000);
    }

    #[test]
    fn cap_is_optional() {
        let toml = r#"
[[trait]]
key = "kofun"
name = "Excitement"
token = "kofun"
mode = { type = "scalar", initial_secs = 40, steady_secs = 100 }
"#;
        let config: DefinitionConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.traits[0].cap_secs(), None);
        assert_eq!(config.traits[0].steady_cooldown_secs(), 100);
    }
}
