//! Shared plumbing for code that drives a trait's timers.

use traitwatch_types::EngineConfig;

use crate::sink::Outbox;
use crate::timers::SessionTimers;

/// Everything a cooldown cycle or charge simulation needs while handling
/// one action or one timer fire. `now_ms` is the virtual time of that
/// action (for timer callbacks, the scheduled fire time).
pub struct CycleContext<'a> {
    pub now_ms: i64,
    pub timers: &'a mut SessionTimers,
    pub outbox: &'a mut Outbox,
    pub config: &'a EngineConfig,
}

/// Whole seconds left until `ends_at_ms`, rounded up, never negative
pub fn ceil_secs_until(ends_at_ms: i64, now_ms: i64) -> u32 {
    let ms = ends_at_ms - now_ms;
    if ms <= 0 {
        return 0;
    }
    u32::try_from((ms + 999) / 1000).unwrap_or(u32::MAX)
}
