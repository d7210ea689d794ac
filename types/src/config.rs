use serde::{Deserialize, Serialize};

/// Tuning for the cooldown engine, stacking simulator and match lifecycle.
///
/// Every field has a default, so a config file only needs to name what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds-remaining points at which a cycle announces itself
    pub mark_offsets_secs: Vec<u32>,

    /// Fine countdown marks, suppressed during initial cycles
    pub fine_marks_secs: Vec<u32>,

    /// Fine marks are only scheduled when the cycle has at least this long left
    pub fine_countdown_from_secs: u32,

    /// Cadence of the periodic panel refresh while a cycle is tracked
    pub panel_refresh_ms: u64,

    /// Cadence of the stacking simulator tick
    pub stacking_tick_ms: u64,

    /// Traits whose first availability is announced at match start
    pub headline_traits: Vec<String>,

    /// Delay of the one-off ability unlock announcement
    pub unlock_delay_secs: u32,

    /// Token announced by the unlock event
    pub unlock_token: String,

    pub conversion: ConversionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mark_offsets_secs: vec![60, 30, 10, 5, 3, 2, 1, 0],
            fine_marks_secs: vec![3, 2, 1],
            fine_countdown_from_secs: 5,
            panel_refresh_ms: 5_000,
            stacking_tick_ms: 1_000,
            headline_traits: ["kofun", "shunkan", "ikei", "shinshutsu"]
                .into_iter()
                .map(String::from)
                .collect(),
            unlock_delay_secs: 120,
            unlock_token: "uramuki".to_string(),
            conversion: ConversionConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn is_fine_mark(&self, mark_secs: u32) -> bool {
        self.fine_marks_secs.contains(&mark_secs)
    }
}

/// Constants used when moving remaining time to or from a stacking trait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Cycle base a stacking trait is measured against during a swap
    pub stacking_scale_secs: u32,

    /// Real time from empty to full stack. `None` derives it from the
    /// trait's charge schedule.
    pub stacking_charge_secs: Option<u32>,

    /// Map the `C` scale proportionally onto the real charge time instead of
    /// subtracting scale seconds from it. Makes a scalar -> stacking ->
    /// scalar round trip exact to the second.
    pub linear_charge_mapping: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            stacking_scale_secs: 90,
            stacking_charge_secs: None,
            linear_charge_mapping: false,
        }
    }
}
