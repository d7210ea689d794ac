//! Stacking charge simulator
//!
//! A stacking trait holds between 0 and `max_stacks` charges. The first
//! charge comes in on a short timer and every later one on the steady
//! charge interval. Progress toward the next charge is kept in whole
//! milliseconds and advanced by a repeating tick.

use serde::Serialize;
use traitwatch_types::{StackingParams, Token};

use crate::cycle::CycleContext;
use crate::error::InsufficientCharge;
use crate::timers::{SessionTimers, TimerEvent, TimerHandle, TimerOwner};

/// Starting point for a charge simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackSeed {
    pub stacks: u8,
    /// Fraction of the current interval already charged, in `[0, 1)`
    pub partial_progress: f64,
    pub current_interval_ms: u64,
}

impl StackSeed {
    /// No charges, waiting on the first one
    pub fn empty(params: &StackingParams) -> Self {
        Self {
            stacks: 0,
            partial_progress: 0.0,
            current_interval_ms: params.first_charge_ms,
        }
    }

    /// Time until this seed would reach a full stack
    pub fn remaining_to_full_ms(&self, params: &StackingParams) -> u64 {
        if self.stacks >= params.max_stacks {
            return 0;
        }
        let progressed = (self.partial_progress.clamp(0.0, 1.0) * self.current_interval_ms as f64).round() as u64;
        let current = self.current_interval_ms.saturating_sub(progressed);
        let later = u64::from(params.max_stacks - self.stacks - 1) * params.charge_interval_ms;
        current + later
    }
}

/// Runtime state of one stacking trait
#[derive(Debug, Clone)]
pub struct StackingState {
    pub key: String,
    pub token: String,
    pub params: StackingParams,
    pub stacks: u8,
    pub progress_ms: u64,
    pub current_interval_ms: u64,
    pub last_tick_ms: i64,
    tick_timer: Option<TimerHandle>,
    refresh_timer: Option<TimerHandle>,
}

impl StackingState {
    pub fn new(key: impl Into<String>, token: impl Into<String>, params: StackingParams) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
            params,
            stacks: 0,
            progress_ms: 0,
            current_interval_ms: params.first_charge_ms,
            last_tick_ms: 0,
            tick_timer: None,
            refresh_timer: None,
        }
    }

    fn trait_token(&self) -> Token {
        Token::for_trait(&self.token)
    }

    pub fn is_full(&self) -> bool {
        self.stacks >= self.params.max_stacks
    }

    /// Begin charging from `seed` (or from empty). Replaces any running
    /// simulation for this trait.
    pub fn start(&mut self, ctx: &mut CycleContext<'_>, seed: Option<StackSeed>) {
        let owner = TimerOwner::for_trait(&self.key);
        ctx.timers.cancel_all(&owner);

        let seed = seed.unwrap_or_else(|| StackSeed::empty(&self.params));
        self.apply_seed(seed);
        self.last_tick_ms = ctx.now_ms;

        self.tick_timer = Some(ctx.timers.schedule_repeating(
            owner.clone(),
            ctx.now_ms,
            ctx.config.stacking_tick_ms as i64,
            TimerEvent::StackTick {
                key: self.key.clone(),
            },
        ));
        self.refresh_timer = Some(ctx.timers.schedule_repeating(
            owner,
            ctx.now_ms,
            ctx.config.panel_refresh_ms as i64,
            TimerEvent::PanelRefresh,
        ));
        ctx.outbox.refresh_panel();

        tracing::debug!(
            key = %self.key,
            stacks = self.stacks,
            progress_ms = self.progress_ms,
            interval_ms = self.current_interval_ms,
            "Charging started"
        );
    }

    /// Clamp a seed into the simulator's invariants
    fn apply_seed(&mut self, seed: StackSeed) {
        self.stacks = seed.stacks.min(self.params.max_stacks);
        self.current_interval_ms = if seed.current_interval_ms == 0 {
            self.params.charge_interval_ms
        } else {
            seed.current_interval_ms
        };

        if self.is_full() {
            self.progress_ms = 0;
            return;
        }
        let fraction = if seed.partial_progress.is_finite() {
            seed.partial_progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let progress = (fraction * self.current_interval_ms as f64).round() as u64;
        self.progress_ms = progress.min(self.current_interval_ms.saturating_sub(1));
    }

    /// Advance charging to `ctx.now_ms`. At most one charge completes per tick.
    pub fn tick(&mut self, ctx: &mut CycleContext<'_>) {
        let elapsed = (ctx.now_ms - self.last_tick_ms).max(0) as u64;
        self.last_tick_ms = ctx.now_ms;

        if self.is_full() {
            self.progress_ms = 0;
            return;
        }

        self.progress_ms += elapsed;
        if self.progress_ms < self.current_interval_ms {
            return;
        }

        self.stacks += 1;
        self.progress_ms = 0;
        self.current_interval_ms = self.params.charge_interval_ms;

        let announcement = if self.is_full() {
            Token::Full
        } else {
            Token::Charged(self.stacks)
        };
        ctx.outbox.announce(ctx.now_ms, vec![self.trait_token(), announcement]);
        ctx.outbox.refresh_panel();
    }

    /// Spend one charge. Returns the charges left.
    pub fn consume(&mut self, ctx: &mut CycleContext<'_>) -> Result<u8, InsufficientCharge> {
        if self.stacks == 0 {
            return Err(InsufficientCharge {
                key: self.key.clone(),
            });
        }

        if self.is_full() {
            // Charging resumes from this moment
            self.progress_ms = 0;
            self.current_interval_ms = self.params.charge_interval_ms;
            self.last_tick_ms = ctx.now_ms;
        }
        self.stacks -= 1;
        ctx.outbox.refresh_panel();
        Ok(self.stacks)
    }

    /// Fraction of the current interval charged so far
    pub fn partial_progress(&self) -> f64 {
        if self.is_full() || self.current_interval_ms == 0 {
            return 0.0;
        }
        self.progress_ms as f64 / self.current_interval_ms as f64
    }

    pub fn remaining_to_full_ms(&self) -> u64 {
        if self.is_full() {
            return 0;
        }
        let current = self.current_interval_ms.saturating_sub(self.progress_ms);
        let later = u64::from(self.params.max_stacks - self.stacks - 1) * self.params.charge_interval_ms;
        current + later
    }

    /// Cancel the tick and refresh this simulation scheduled
    pub fn stop(&mut self, timers: &mut SessionTimers) {
        for timer in [self.tick_timer.take(), self.refresh_timer.take()].into_iter().flatten() {
            timers.cancel(timer);
        }
    }

    pub fn detach_timers(&mut self) {
        self.tick_timer = None;
        self.refresh_timer = None;
    }

    pub fn snapshot(&self) -> StackingSnapshot {
        StackingSnapshot {
            stacks: self.stacks,
            max_stacks: self.params.max_stacks,
            partial_progress: self.partial_progress(),
            remaining_to_full_secs: self.remaining_to_full_ms().div_ceil(1000),
        }
    }
}

/// Panel view of a stacking trait
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackingSnapshot {
    pub stacks: u8,
    pub max_stacks: u8,
    pub partial_progress: f64,
    pub remaining_to_full_secs: u64,
}
