//! Cooldown engine for scalar traits
//!
//! A cycle runs from a use to the moment the trait is ready again. While it
//! runs, a fixed set of countdown marks (seconds remaining) is scheduled so
//! the announcer can call out "30 seconds", "10 seconds", ... "ready".

use hashbrown::HashSet;
use serde::Serialize;
use traitwatch_types::{EngineConfig, Token};

use crate::cycle::{CycleContext, ceil_secs_until};
use crate::error::UseRejected;
use crate::timers::{SessionTimers, TimerEvent, TimerHandle, TimerOwner};

/// Marks (seconds remaining) worth scheduling for a cycle with
/// `remaining_ms` left.
///
/// A mark is kept when the cycle still has at least that long to run. Fine
/// marks are dropped for initial cycles and for cycles shorter than
/// `fine_countdown_from_secs`.
pub fn plan_marks(remaining_ms: i64, is_initial: bool, config: &EngineConfig) -> Vec<u32> {
    let fine_allowed =
        !is_initial && remaining_ms >= i64::from(config.fine_countdown_from_secs) * 1000;

    config
        .mark_offsets_secs
        .iter()
        .copied()
        .filter(|&mark| remaining_ms >= i64::from(mark) * 1000)
        .filter(|&mark| fine_allowed || !config.is_fine_mark(mark))
        .collect()
}

/// Runtime state of one scalar trait
#[derive(Debug, Clone)]
pub struct ScalarState {
    pub key: String,
    pub token: String,
    pub uses_count: u32,
    pub cycle_started_at_ms: Option<i64>,
    pub cooldown_ends_at_ms: Option<i64>,
    /// Nominal length of the current cycle
    pub cycle_secs: u32,
    pub initial_cycle: bool,
    mark_timers: HashSet<TimerHandle>,
    ui_refresh_timer: Option<TimerHandle>,
}

impl ScalarState {
    pub fn new(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
            uses_count: 0,
            cycle_started_at_ms: None,
            cooldown_ends_at_ms: None,
            cycle_secs: 0,
            initial_cycle: false,
            mark_timers: HashSet::new(),
            ui_refresh_timer: None,
        }
    }

    fn owner(&self) -> TimerOwner {
        TimerOwner::for_trait(&self.key)
    }

    fn trait_token(&self) -> Token {
        Token::for_trait(&self.token)
    }

    /// Start a cycle of `duration_secs` from now
    pub fn start_cycle(&mut self, ctx: &mut CycleContext<'_>, duration_secs: u32, is_initial: bool) {
        let ends_at = ctx.now_ms + i64::from(duration_secs) * 1000;
        self.arm(ctx, ends_at, duration_secs, is_initial);
    }

    /// Start a cycle that ends at an absolute time. Used when a trait is
    /// identified part-way through its initial cooldown.
    pub fn start_cycle_until(&mut self, ctx: &mut CycleContext<'_>, ends_at_ms: i64, is_initial: bool) {
        let secs = ceil_secs_until(ends_at_ms, ctx.now_ms);
        self.arm(ctx, ends_at_ms, secs, is_initial);
    }

    fn arm(&mut self, ctx: &mut CycleContext<'_>, ends_at_ms: i64, cycle_secs: u32, is_initial: bool) {
        let owner = self.owner();
        ctx.timers.cancel_all(&owner);
        self.mark_timers.clear();

        self.cycle_started_at_ms = Some(ctx.now_ms);
        self.cooldown_ends_at_ms = Some(ends_at_ms);
        self.cycle_secs = cycle_secs;
        self.initial_cycle = is_initial;

        let remaining_ms = ends_at_ms - ctx.now_ms;
        for mark_secs in plan_marks(remaining_ms, is_initial, ctx.config) {
            let fire_at = ends_at_ms - i64::from(mark_secs) * 1000;
            let handle = ctx.timers.schedule_once(
                owner.clone(),
                ctx.now_ms,
                fire_at - ctx.now_ms,
                TimerEvent::CooldownMark {
                    key: self.key.clone(),
                    mark_secs,
                },
            );
            self.mark_timers.insert(handle);
        }

        self.arm_refresh(ctx);

        tracing::debug!(
            key = %self.key,
            cycle_secs,
            is_initial,
            marks = self.mark_timers.len(),
            "Cooldown cycle started"
        );
    }

    /// Repeating panel refresh. It outlives the cycle and stops when the
    /// match does.
    fn arm_refresh(&mut self, ctx: &mut CycleContext<'_>) {
        if let Some(timer) = self.ui_refresh_timer.take() {
            ctx.timers.cancel(timer);
        }
        self.ui_refresh_timer = Some(ctx.timers.schedule_repeating(
            self.owner(),
            ctx.now_ms,
            ctx.config.panel_refresh_ms as i64,
            TimerEvent::PanelRefresh,
        ));
    }

    /// Reuse after the cycle has run out. Starts a steady cycle and returns
    /// its length.
    pub fn reuse(&mut self, ctx: &mut CycleContext<'_>, steady_secs: u32) -> Result<u32, UseRejected> {
        if !self.is_ready(ctx.now_ms) {
            return Err(UseRejected::NotReady {
                key: self.key.clone(),
                remaining_secs: self.remaining_secs(ctx.now_ms),
            });
        }
        self.uses_count += 1;
        self.start_cycle(ctx, steady_secs, false);
        Ok(steady_secs)
    }

    /// Handle a fired countdown mark. Marks not belonging to the current
    /// cycle are ignored.
    pub fn on_mark(&mut self, ctx: &mut CycleContext<'_>, handle: TimerHandle, mark_secs: u32) {
        if !self.mark_timers.remove(&handle) {
            return;
        }

        if mark_secs > 0 {
            ctx.outbox.announce(
                ctx.now_ms,
                vec![self.trait_token(), Token::Remaining, Token::Seconds(mark_secs)],
            );
            return;
        }

        ctx.outbox.announce(ctx.now_ms, vec![self.trait_token(), Token::Ready]);
        ctx.outbox.refresh_panel();
    }

    /// Ready right away without a cycle (a swap that carried no time over)
    pub fn mark_ready_now(&mut self, ctx: &mut CycleContext<'_>) {
        ctx.timers.cancel_all(&self.owner());
        self.detach_timers();
        self.cycle_started_at_ms = Some(ctx.now_ms);
        self.cooldown_ends_at_ms = Some(ctx.now_ms);
        self.cycle_secs = 0;
        self.initial_cycle = false;

        ctx.outbox.announce(ctx.now_ms, vec![self.trait_token(), Token::Ready]);
        ctx.outbox.refresh_panel();
        self.arm_refresh(ctx);
    }

    /// Cancel the marks and refresh this state scheduled
    pub fn stop(&mut self, timers: &mut SessionTimers) {
        for handle in self.mark_timers.drain() {
            timers.cancel(handle);
        }
        if let Some(timer) = self.ui_refresh_timer.take() {
            timers.cancel(timer);
        }
    }

    /// Forget handles after the registry dropped them wholesale
    pub fn detach_timers(&mut self) {
        self.mark_timers.clear();
        self.ui_refresh_timer = None;
    }

    pub fn is_ready(&self, now_ms: i64) -> bool {
        self.cooldown_ends_at_ms.is_none_or(|ends_at| now_ms >= ends_at)
    }

    pub fn remaining_secs(&self, now_ms: i64) -> u32 {
        self.cooldown_ends_at_ms
            .map_or(0, |ends_at| ceil_secs_until(ends_at, now_ms))
    }

    pub fn pending_marks(&self) -> usize {
        self.mark_timers.len()
    }

    pub fn snapshot(&self, now_ms: i64) -> ScalarSnapshot {
        ScalarSnapshot {
            remaining_secs: self.remaining_secs(now_ms),
            cycle_secs: self.cycle_secs,
            uses_count: self.uses_count,
            initial_cycle: self.initial_cycle,
            ready: self.is_ready(now_ms),
        }
    }
}

/// Panel view of a scalar trait
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalarSnapshot {
    pub remaining_secs: u32,
    pub cycle_secs: u32,
    pub uses_count: u32,
    pub initial_cycle: bool,
    pub ready: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Outbox;

    struct Harness {
        timers: SessionTimers,
        outbox: Outbox,
        config: EngineConfig,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                timers: SessionTimers::new(),
                outbox: Outbox::new(),
                config: EngineConfig::default(),
            }
        }

        fn ctx(&mut self, now_ms: i64) -> CycleContext<'_> {
            CycleContext {
                now_ms,
                timers: &mut self.timers,
                outbox: &mut self.outbox,
                config: &self.config,
            }
        }

        /// Fire due marks into `state`, returning the fire times of announced marks
        fn run(&mut self, state: &mut ScalarState, until_ms: i64) -> Vec<(i64, u32)> {
            let mut fired = Vec::new();
            while let Some(timer) = self.timers.pop_due(until_ms) {
                if let TimerEvent::CooldownMark { mark_secs, .. } = timer.event {
                    let mut ctx = self.ctx(timer.fire_at_ms);
                    state.on_mark(&mut ctx, timer.handle, mark_secs);
                    fired.push((timer.fire_at_ms, mark_secs));
                }
            }
            fired
        }
    }

    #[test]
    fn plan_marks_respects_remaining_time() {
        let config = EngineConfig::default();
        assert_eq!(plan_marks(100_000, false, &config), vec![60, 30, 10, 5, 3, 2, 1, 0]);
        assert_eq!(plan_marks(40_000, false, &config), vec![30, 10, 5, 3, 2, 1, 0]);
        assert_eq!(plan_marks(40_000, true, &config), vec![30, 10, 5, 0]);
        assert_eq!(plan_marks(4_000, false, &config), vec![0]);
        assert_eq!(plan_marks(0, false, &config), vec![0]);
    }

    #[test]
    fn steady_cycle_fires_every_mark_once() {
        let mut h = Harness::new();
        let mut state = ScalarState::new("kofun", "kofun");
        state.start_cycle(&mut h.ctx(40_000), 100, false);

        let fired = h.run(&mut state, 1_000_000);
        let times: Vec<i64> = fired.iter().map(|&(at, _)| at / 1000).collect();
        assert_eq!(times, vec![80, 110, 130, 135, 137, 138, 139, 140]);

        let announcements = h.outbox.take_announcements();
        let ready: Vec<_> = announcements
            .iter()
            .filter(|a| a.tokens.contains(&Token::Ready))
            .collect();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].at_ms, 140_000);
        assert_eq!(
            announcements[0].tokens,
            vec![Token::for_trait("kofun"), Token::Remaining, Token::Seconds(60)]
        );
    }

    #[test]
    fn panel_refresh_outlives_the_ready_mark() {
        let mut h = Harness::new();
        let mut state = ScalarState::new("kofun", "kofun");
        state.start_cycle(&mut h.ctx(0), 12, false);

        h.run(&mut state, 12_000);
        assert_eq!(state.pending_marks(), 0);
        assert!(h.outbox.take_panel_refresh());
        assert_eq!(h.timers.pending_for(&TimerOwner::for_trait("kofun")), 1);
        assert_eq!(h.timers.next_deadline(), Some(15_000));
    }

    #[test]
    fn stop_cancels_only_this_cycle() {
        let mut h = Harness::new();
        let mut state = ScalarState::new("kofun", "kofun");
        state.start_cycle(&mut h.ctx(0), 100, false);
        h.timers.schedule_once(TimerOwner::Match, 0, 120_000, TimerEvent::Unlock);

        state.stop(&mut h.timers);
        assert_eq!(state.pending_marks(), 0);
        assert_eq!(h.timers.pending(), 1);
    }

    #[test]
    fn reuse_before_ready_is_rejected_without_touching_timers() {
        let mut h = Harness::new();
        let mut state = ScalarState::new("kofun", "kofun");
        state.start_cycle(&mut h.ctx(0), 40, true);
        let pending = h.timers.pending();

        let err = state.reuse(&mut h.ctx(10_500), 100).unwrap_err();
        assert_eq!(
            err,
            UseRejected::NotReady {
                key: "kofun".to_string(),
                remaining_secs: 30
            }
        );
        assert_eq!(h.timers.pending(), pending);
        assert_eq!(state.uses_count, 0);
    }

    #[test]
    fn reuse_after_ready_starts_steady_cycle() {
        let mut h = Harness::new();
        let mut state = ScalarState::new("kofun", "kofun");
        state.start_cycle(&mut h.ctx(0), 40, true);
        h.run(&mut state, 40_000);

        assert_eq!(state.reuse(&mut h.ctx(40_000), 100), Ok(100));
        assert_eq!(state.uses_count, 1);
        assert!(!state.initial_cycle);
        assert_eq!(state.remaining_secs(40_000), 100);
        assert_eq!(state.pending_marks(), 8);
    }

    #[test]
    fn restarting_cancels_previous_marks() {
        let mut h = Harness::new();
        let mut state = ScalarState::new("kofun", "kofun");
        state.start_cycle(&mut h.ctx(0), 100, false);
        state.start_cycle(&mut h.ctx(1_000), 20, false);

        let fired = h.run(&mut state, 1_000_000);
        assert_eq!(fired.last(), Some(&(21_000, 0)));
        assert_eq!(fired.iter().filter(|&&(_, m)| m == 0).count(), 1);
    }

    #[test]
    fn identified_cycle_ends_at_absolute_time() {
        let mut h = Harness::new();
        let mut state = ScalarState::new("shunkan", "shunkan");
        state.start_cycle_until(&mut h.ctx(12_300), 45_000, true);

        assert_eq!(state.cycle_secs, 33);
        let fired = h.run(&mut state, 100_000);
        let marks: Vec<u32> = fired.iter().map(|&(_, m)| m).collect();
        assert_eq!(marks, vec![30, 10, 5, 0]);
        assert_eq!(fired.last(), Some(&(45_000, 0)));
    }

    #[test]
    fn mark_ready_now_schedules_no_marks() {
        let mut h = Harness::new();
        let mut state = ScalarState::new("ikei", "ikei");
        state.mark_ready_now(&mut h.ctx(5_000));

        assert_eq!(state.pending_marks(), 0);
        assert_eq!(h.timers.pending(), 1, "only the panel refresh");
        assert!(state.is_ready(5_000));
        let announcements = h.outbox.take_announcements();
        assert_eq!(announcements[0].tokens, vec![Token::for_trait("ikei"), Token::Ready]);
    }
}
