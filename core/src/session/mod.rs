//! Match lifecycle for one guild
//!
//! A [`MatchSession`] owns everything about a guild's match: the lifecycle
//! state, per-trait runtime, the timer registry and the outbox. All entry
//! points take the current time; pending timers up to that time are run
//! first so actions always see an up-to-date state.
//!
//! ```text
//!   start ──► Active ──► end ──► Idle
//!               │  ▲
//!     use/reuse │  │ timer fires (marks, ticks, headline, unlock)
//!     swap      ▼  │
//!            trait runtime
//! ```

mod snapshot;
mod state;
mod store;

#[cfg(test)]
mod session_tests;

pub use snapshot::{HeadlineSnapshot, MatchSnapshot, TraitSnapshot, TraitView};
pub use state::{MatchPhase, MatchState};
pub use store::GuildStore;

use std::sync::Arc;

use hashbrown::HashMap;
use traitwatch_types::{EngineConfig, GuildId, Token, TraitDefinition};

use crate::catalog::TraitCatalog;
use crate::convert::{self, Converted};
use crate::cooldown::ScalarState;
use crate::cycle::{CycleContext, ceil_secs_until};
use crate::error::{InvalidTransition, SwapNotAllowed, UseRejected};
use crate::sink::{Announcement, AnnouncementSink, Outbox, PanelSink};
use crate::stacking::StackingState;
use crate::timers::{FiredTimer, SessionTimers, TimerEvent, TimerOwner};

/// Runtime state of a trait that has been revealed this match
#[derive(Debug, Clone)]
pub enum TraitRuntime {
    Scalar(ScalarState),
    Stacking(StackingState),
}

impl TraitRuntime {
    fn detach_timers(&mut self) {
        match self {
            Self::Scalar(s) => s.detach_timers(),
            Self::Stacking(s) => s.detach_timers(),
        }
    }

    fn stop(&mut self, timers: &mut SessionTimers) {
        match self {
            Self::Scalar(s) => s.stop(timers),
            Self::Stacking(s) => s.stop(timers),
        }
    }

    fn view(&self, now_ms: i64) -> TraitView {
        match self {
            Self::Scalar(s) => TraitView::Scalar(s.snapshot(now_ms)),
            Self::Stacking(s) => TraitView::Stacking(s.snapshot()),
        }
    }
}

/// Outcome of an accepted use or reuse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraitActivation {
    /// Revealed before its initial cooldown ran out; counting down to it
    Identified { key: String, remaining_secs: u32 },
    /// Used; a steady cycle started
    Used { key: String, cycle_secs: u32 },
    /// Stacking trait revealed; charging from empty
    Charging { key: String },
    /// One charge spent
    Consumed { key: String, stacks_left: u8 },
}

/// Outcome of an accepted swap
#[derive(Debug, Clone, PartialEq)]
pub struct SwapReport {
    pub from: String,
    pub to: String,
    pub converted: Converted,
}

#[derive(Debug)]
pub struct MatchSession {
    state: MatchState,
    traits: HashMap<String, TraitRuntime>,
    timers: SessionTimers,
    outbox: Outbox,
    catalog: Arc<TraitCatalog>,
    config: Arc<EngineConfig>,
    /// Latest time the session has been advanced to
    clock_ms: i64,
}

impl MatchSession {
    pub fn new(guild_id: GuildId, catalog: Arc<TraitCatalog>, config: Arc<EngineConfig>) -> Self {
        Self {
            state: MatchState::new(guild_id),
            traits: HashMap::new(),
            timers: SessionTimers::new(),
            outbox: Outbox::new(),
            catalog,
            config,
            clock_ms: 0,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.state.guild_id
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn timers(&self) -> &SessionTimers {
        &self.timers
    }

    pub fn trait_runtime(&self, key: &str) -> Option<&TraitRuntime> {
        self.traits.get(key)
    }

    pub fn clock_ms(&self) -> i64 {
        self.clock_ms
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.timers.next_deadline()
    }

    /// Split borrows: the trait table plus a context over the rest
    fn parts(&mut self, now_ms: i64) -> (&mut HashMap<String, TraitRuntime>, CycleContext<'_>) {
        (
            &mut self.traits,
            CycleContext {
                now_ms,
                timers: &mut self.timers,
                outbox: &mut self.outbox,
                config: &self.config,
            },
        )
    }

    fn announce(&mut self, now_ms: i64, tokens: Vec<Token>) {
        self.outbox.announce(now_ms, tokens);
    }

    fn announce_use(&mut self, now_ms: i64, def: &TraitDefinition) {
        self.announce(
            now_ms,
            vec![Token::HunterUsed, Token::for_trait(&def.token), Token::UsedSuffix],
        );
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Time
    // ═══════════════════════════════════════════════════════════════════════

    /// Run every timer due at or before `now_ms`, in fire order. Returns the
    /// number of callbacks dispatched.
    pub fn advance_to(&mut self, now_ms: i64) -> usize {
        let mut dispatched = 0;
        while let Some(fired) = self.timers.pop_due(now_ms) {
            self.clock_ms = fired.fire_at_ms;
            self.dispatch(fired);
            dispatched += 1;
        }
        self.clock_ms = self.clock_ms.max(now_ms);
        dispatched
    }

    fn dispatch(&mut self, fired: FiredTimer<TimerOwner, TimerEvent>) {
        let now_ms = fired.fire_at_ms;
        match fired.event {
            TimerEvent::HeadlineReady { key } => {
                let Ok(def) = self.catalog.get(&key) else {
                    return;
                };
                let token = Token::for_trait(&def.token);
                self.announce(now_ms, vec![token, Token::Ready]);
                self.outbox.refresh_panel();
            }
            TimerEvent::Unlock => {
                let token = Token::for_trait(&self.config.unlock_token);
                self.announce(now_ms, vec![token, Token::Ready]);
                self.outbox.refresh_panel();
            }
            TimerEvent::CooldownMark { key, mark_secs } => {
                let (traits, mut ctx) = self.parts(now_ms);
                if let Some(TraitRuntime::Scalar(state)) = traits.get_mut(&key) {
                    state.on_mark(&mut ctx, fired.handle, mark_secs);
                }
            }
            TimerEvent::StackTick { key } => {
                let (traits, mut ctx) = self.parts(now_ms);
                if let Some(TraitRuntime::Stacking(state)) = traits.get_mut(&key) {
                    state.tick(&mut ctx);
                }
            }
            TimerEvent::PanelRefresh => {
                if self.is_active() {
                    self.outbox.refresh_panel();
                } else {
                    self.timers.cancel(fired.handle);
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Idle -> Active. Seeds the headline ready timers and the unlock event.
    pub fn start(&mut self, now_ms: i64) -> Result<(), InvalidTransition> {
        self.advance_to(now_ms);
        self.state.begin(now_ms)?;

        // Leftovers from an ended match
        self.traits.clear();
        self.timers.cancel_everything();

        self.announce(now_ms, vec![Token::MatchStarted]);

        let config = Arc::clone(&self.config);
        for key in &config.headline_traits {
            let Ok(initial_secs) = self.catalog.cooldown_for_cycle(key, true) else {
                tracing::warn!(guild_id = self.guild_id(), key = %key, "Headline trait missing from catalog");
                continue;
            };
            self.timers.schedule_once(
                TimerOwner::Headline,
                now_ms,
                i64::from(initial_secs) * 1000,
                TimerEvent::HeadlineReady { key: key.clone() },
            );
        }
        self.timers.schedule_once(
            TimerOwner::Match,
            now_ms,
            i64::from(config.unlock_delay_secs) * 1000,
            TimerEvent::Unlock,
        );
        self.outbox.refresh_panel();

        tracing::info!(guild_id = self.guild_id(), pending = self.timers.pending(), "Match started");
        Ok(())
    }

    /// Active -> Idle. Cancels every timer; the revealed trait stays on
    /// display until the next start.
    pub fn end(&mut self, now_ms: i64) -> Result<(), InvalidTransition> {
        self.advance_to(now_ms);
        self.state.finish()?;

        let canceled = self.timers.cancel_everything();
        for runtime in self.traits.values_mut() {
            runtime.detach_timers();
        }

        self.announce(now_ms, vec![Token::MatchEnded]);
        self.outbox.refresh_panel();

        tracing::info!(guild_id = self.guild_id(), canceled, "Match ended");
        Ok(())
    }

    /// End (if running), forget all trait runtime and start again
    pub fn reset(&mut self, now_ms: i64) -> Result<(), InvalidTransition> {
        if self.is_active() {
            self.end(now_ms)?;
        }
        self.traits.clear();
        self.state.revealed_trait = None;
        self.start(now_ms)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Trait actions
    // ═══════════════════════════════════════════════════════════════════════

    /// Reveal the trait in play
    pub fn use_trait(&mut self, key: &str, now_ms: i64) -> Result<TraitActivation, UseRejected> {
        self.advance_to(now_ms);
        let def = self.catalog.get(key)?.clone();
        if !self.is_active() {
            return Err(UseRejected::MatchInactive);
        }
        if let Some(revealed) = &self.state.revealed_trait {
            return Err(if revealed == key {
                UseRejected::AlreadyRevealed { key: key.to_string() }
            } else {
                UseRejected::OtherTraitRevealed {
                    revealed: revealed.clone(),
                }
            });
        }

        self.timers.cancel_all(&TimerOwner::Headline);
        self.state.revealed_trait = Some(key.to_string());

        let activation = match def.stacking() {
            Some(params) => {
                self.announce_use(now_ms, &def);
                let mut state = StackingState::new(&def.key, &def.token, params);
                let (_, mut ctx) = self.parts(now_ms);
                state.start(&mut ctx, None);
                self.traits.insert(def.key.clone(), TraitRuntime::Stacking(state));
                TraitActivation::Charging { key: def.key.clone() }
            }
            None => {
                let started_at = self.state.started_at_ms.unwrap_or(now_ms);
                let initial_secs = self.catalog.cooldown_for_cycle(key, true)?;
                let initial_ends_at = started_at + i64::from(initial_secs) * 1000;
                let mut state = ScalarState::new(&def.key, &def.token);

                let activation = if now_ms < initial_ends_at {
                    let (_, mut ctx) = self.parts(now_ms);
                    state.start_cycle_until(&mut ctx, initial_ends_at, true);
                    TraitActivation::Identified {
                        key: def.key.clone(),
                        remaining_secs: ceil_secs_until(initial_ends_at, now_ms),
                    }
                } else {
                    self.announce_use(now_ms, &def);
                    let cycle_secs = self.catalog.cooldown_for_cycle(key, false)?;
                    state.uses_count = 1;
                    let (_, mut ctx) = self.parts(now_ms);
                    state.start_cycle(&mut ctx, cycle_secs, false);
                    TraitActivation::Used {
                        key: def.key.clone(),
                        cycle_secs,
                    }
                };
                self.traits.insert(def.key.clone(), TraitRuntime::Scalar(state));
                activation
            }
        };
        self.outbox.refresh_panel();

        tracing::info!(guild_id = self.guild_id(), key, ?activation, "Trait revealed");
        Ok(activation)
    }

    /// Use the revealed trait again. Before any reveal this is a reveal.
    pub fn reuse_trait(&mut self, key: &str, now_ms: i64) -> Result<TraitActivation, UseRejected> {
        self.advance_to(now_ms);
        let def = self.catalog.get(key)?.clone();
        if !self.is_active() {
            return Err(UseRejected::MatchInactive);
        }
        match self.state.revealed_trait.as_deref() {
            None => return self.use_trait(key, now_ms),
            Some(revealed) if revealed != key => {
                return Err(UseRejected::OtherTraitRevealed {
                    revealed: revealed.to_string(),
                });
            }
            Some(_) => {}
        }

        let steady_secs = self.catalog.cooldown_for_cycle(key, false)?;
        let (traits, mut ctx) = self.parts(now_ms);
        let activation = match traits.get_mut(key) {
            Some(TraitRuntime::Scalar(state)) => {
                let cycle_secs = state.reuse(&mut ctx, steady_secs)?;
                TraitActivation::Used {
                    key: def.key.clone(),
                    cycle_secs,
                }
            }
            Some(TraitRuntime::Stacking(state)) => {
                let stacks_left = state.consume(&mut ctx)?;
                TraitActivation::Consumed {
                    key: def.key.clone(),
                    stacks_left,
                }
            }
            None => {
                // No runtime to reuse, reveal from scratch
                self.state.revealed_trait = None;
                return self.use_trait(key, now_ms);
            }
        };
        self.announce_use(now_ms, &def);
        self.outbox.refresh_panel();

        tracing::debug!(guild_id = self.guild_id(), key, ?activation, "Trait reused");
        Ok(activation)
    }

    /// One-time transfer of the revealed trait's remaining time to `new_key`
    pub fn swap(&mut self, new_key: &str, now_ms: i64) -> Result<SwapReport, SwapNotAllowed> {
        self.advance_to(now_ms);
        if !self.is_active() {
            return Err(SwapNotAllowed::MatchInactive);
        }
        if self.state.used_swap {
            return Err(SwapNotAllowed::AlreadyUsed);
        }
        let old_key = self
            .state
            .revealed_trait
            .clone()
            .ok_or(SwapNotAllowed::NothingRevealed)?;
        if old_key == new_key {
            return Err(SwapNotAllowed::SameTrait {
                key: new_key.to_string(),
            });
        }
        let target = self.catalog.get(new_key)?.clone();
        let source_def = self.catalog.get(&old_key)?.clone();

        let conv = self.config.conversion;
        let (traits, mut ctx) = self.parts(now_ms);
        let source = match traits.get_mut(&old_key) {
            Some(TraitRuntime::Scalar(state)) => {
                convert::scalar_remaining(state.remaining_secs(now_ms), &source_def, &conv)
            }
            Some(TraitRuntime::Stacking(state)) => {
                // Charge accrued since the last tick counts too
                state.tick(&mut ctx);
                convert::stacking_remaining(state.remaining_to_full_ms(), &state.params, &conv)
            }
            None => convert::scalar_remaining(0, &source_def, &conv),
        };
        let converted = convert::convert_to(source, &target, &conv);

        if let Some(mut runtime) = traits.remove(&old_key) {
            runtime.stop(ctx.timers);
        }

        let runtime = match converted {
            Converted::Scalar { remaining_secs } => {
                let mut state = ScalarState::new(&target.key, &target.token);
                state.uses_count = 1;
                if remaining_secs == 0 {
                    state.mark_ready_now(&mut ctx);
                } else {
                    state.start_cycle(&mut ctx, remaining_secs, false);
                }
                TraitRuntime::Scalar(state)
            }
            Converted::Stacking { seed, params } => {
                let mut state = StackingState::new(&target.key, &target.token, params);
                state.start(&mut ctx, Some(seed));
                TraitRuntime::Stacking(state)
            }
        };
        self.traits.insert(target.key.clone(), runtime);

        self.state.revealed_trait = Some(target.key.clone());
        self.state.used_swap = true;
        self.outbox.refresh_panel();

        tracing::info!(
            guild_id = self.guild_id(),
            from = %old_key,
            to = %target.key,
            ?converted,
            "Trait swapped"
        );
        Ok(SwapReport {
            from: old_key,
            to: target.key,
            converted,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Output
    // ═══════════════════════════════════════════════════════════════════════

    pub fn snapshot(&self, now_ms: i64) -> MatchSnapshot {
        let headline = match (&self.state.started_at_ms, &self.state.revealed_trait) {
            (Some(started_at), None) if self.is_active() => self
                .config
                .headline_traits
                .iter()
                .filter_map(|key| self.catalog.get(key).ok())
                .map(|def| HeadlineSnapshot {
                    key: def.key.clone(),
                    name: def.name.clone(),
                    remaining_secs: ceil_secs_until(
                        started_at + i64::from(def.initial_cooldown_secs()) * 1000,
                        now_ms,
                    ),
                })
                .collect(),
            _ => Vec::new(),
        };

        let revealed = self.state.revealed_trait.as_deref();
        let traits = self
            .catalog
            .iter()
            .filter_map(|def| {
                let runtime = self.traits.get(&def.key)?;
                Some(TraitSnapshot {
                    key: def.key.clone(),
                    name: def.name.clone(),
                    revealed: revealed == Some(def.key.as_str()),
                    view: runtime.view(now_ms),
                })
            })
            .collect();

        MatchSnapshot {
            guild_id: self.guild_id(),
            phase: self.phase(),
            elapsed_ms: if self.is_active() {
                self.state.elapsed_ms(now_ms)
            } else {
                0
            },
            revealed_trait: self.state.revealed_trait.clone(),
            used_swap: self.state.used_swap,
            headline,
            traits,
            pending_timers: self.timers.pending(),
        }
    }

    pub fn take_announcements(&mut self) -> Vec<Announcement> {
        self.outbox.take_announcements()
    }

    pub fn take_panel_refresh(&mut self) -> bool {
        self.outbox.take_panel_refresh()
    }

    pub fn flush(&mut self, announcer: &mut dyn AnnouncementSink, panel: &mut dyn PanelSink) {
        let guild_id = self.guild_id();
        self.outbox.flush(guild_id, announcer, panel);
    }
}
