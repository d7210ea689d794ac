//! Serializable views of a match, for panel renderers and callers that
//! persist match metadata.

use serde::Serialize;
use traitwatch_types::GuildId;

use super::MatchPhase;
use crate::cooldown::ScalarSnapshot;
use crate::stacking::StackingSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSnapshot {
    pub guild_id: GuildId,
    pub phase: MatchPhase,
    pub elapsed_ms: i64,
    pub revealed_trait: Option<String>,
    pub used_swap: bool,
    /// Headline countdowns, only while nothing is revealed
    pub headline: Vec<HeadlineSnapshot>,
    pub traits: Vec<TraitSnapshot>,
    pub pending_timers: usize,
}

/// Time left on a headline trait's initial cooldown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadlineSnapshot {
    pub key: String,
    pub name: String,
    pub remaining_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitSnapshot {
    pub key: String,
    pub name: String,
    pub revealed: bool,
    pub view: TraitView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TraitView {
    Scalar(ScalarSnapshot),
    Stacking(StackingSnapshot),
}
