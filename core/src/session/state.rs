//! Match state machine for a single guild.
//!
//! - Idle: no match running, actions other than start are ignored
//! - Active: a match is running, uses/swaps are accepted
//!
//! Transitions only happen through [`MatchState::begin`] and
//! [`MatchState::finish`]; every other field is mutated by the session
//! while the match is active.

use std::fmt;

use serde::Serialize;
use traitwatch_types::GuildId;

use crate::error::InvalidTransition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    #[default]
    Idle,
    Active,
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Active => f.write_str("active"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    pub guild_id: GuildId,
    pub phase: MatchPhase,
    pub started_at_ms: Option<i64>,
    pub revealed_trait: Option<String>,
    pub used_swap: bool,
}

impl MatchState {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            phase: MatchPhase::Idle,
            started_at_ms: None,
            revealed_trait: None,
            used_swap: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == MatchPhase::Active
    }

    /// Idle -> Active. Clears per-match flags.
    pub fn begin(&mut self, now_ms: i64) -> Result<(), InvalidTransition> {
        if self.is_active() {
            return Err(InvalidTransition {
                action: "start",
                phase: self.phase,
            });
        }
        self.phase = MatchPhase::Active;
        self.started_at_ms = Some(now_ms);
        self.revealed_trait = None;
        self.used_swap = false;
        Ok(())
    }

    /// Active -> Idle. The revealed trait is kept for display.
    pub fn finish(&mut self) -> Result<(), InvalidTransition> {
        if !self.is_active() {
            return Err(InvalidTransition {
                action: "end",
                phase: self.phase,
            });
        }
        self.phase = MatchPhase::Idle;
        Ok(())
    }

    /// Milliseconds since the match started, 0 when it never did
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        self.started_at_ms.map_or(0, |start| (now_ms - start).max(0))
    }
}
