//! Timer bookkeeping for a match session
//!
//! The generic [`TimerRegistry`] is keyed by owner so that a whole family of
//! timers (a trait's countdown marks, the headline pre-seeds) can be dropped
//! with one call. [`TimerOwner`] and [`TimerEvent`] are the concrete owner
//! and payload types a session schedules.

mod registry;

pub use registry::{FiredTimer, MIN_DELAY_MS, TimerHandle, TimerRegistry};

/// Who a timer belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    /// Match-wide events (the unlock announcement)
    Match,
    /// Initial-cooldown pre-seeds for the headline traits
    Headline,
    /// Everything driving one trait's cycle or charge
    Trait(String),
}

impl TimerOwner {
    pub fn for_trait(key: &str) -> Self {
        Self::Trait(key.to_string())
    }
}

/// What happens when a timer fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// A headline trait reached its initial cooldown
    HeadlineReady { key: String },
    /// The one-off ability unlock point
    Unlock,
    /// A countdown mark of a scalar cycle (0 = ready)
    CooldownMark { key: String, mark_secs: u32 },
    /// Periodic panel refresh while the match is active
    PanelRefresh,
    /// Stacking simulator tick
    StackTick { key: String },
}

pub type SessionTimers = TimerRegistry<TimerOwner, TimerEvent>;
