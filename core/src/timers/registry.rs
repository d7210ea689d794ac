//! Owner-keyed registry of pending one-shot and repeating timers.
//!
//! Callbacks are plain values (`E`) handed back from [`TimerRegistry::pop_due`],
//! so the registry never runs code itself. Due entries come out in
//! `(fire_at, schedule sequence)` order: equal fire times keep the order
//! they were scheduled in.

use std::collections::BTreeMap;
use std::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// Smallest delay a timer can be scheduled with
pub const MIN_DELAY_MS: i64 = 1;

/// Opaque handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct TimerEntry<O, E> {
    owner: O,
    event: E,
    fire_at_ms: i64,
    seq: u64,
    /// `Some` for repeating timers
    interval_ms: Option<i64>,
}

/// A timer popped because its fire time was reached
#[derive(Debug, Clone, PartialEq)]
pub struct FiredTimer<O, E> {
    pub handle: TimerHandle,
    pub owner: O,
    pub event: E,
    pub fire_at_ms: i64,
    pub repeating: bool,
}

#[derive(Debug, Clone)]
pub struct TimerRegistry<O, E> {
    next_handle: u64,
    next_seq: u64,
    queue: BTreeMap<(i64, u64), TimerHandle>,
    entries: HashMap<TimerHandle, TimerEntry<O, E>>,
    by_owner: HashMap<O, HashSet<TimerHandle>>,
}

impl<O, E> Default for TimerRegistry<O, E>
where
    O: Clone + Eq + Hash,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<O, E> TimerRegistry<O, E>
where
    O: Clone + Eq + Hash,
    E: Clone,
{
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            next_seq: 0,
            queue: BTreeMap::new(),
            entries: HashMap::new(),
            by_owner: HashMap::new(),
        }
    }

    /// Schedule `event` to fire once, `delay_ms` after `now_ms`.
    /// Non-positive delays are clamped to [`MIN_DELAY_MS`].
    pub fn schedule_once(&mut self, owner: O, now_ms: i64, delay_ms: i64, event: E) -> TimerHandle {
        self.insert(owner, now_ms + delay_ms.max(MIN_DELAY_MS), None, event)
    }

    /// Schedule `event` to fire every `interval_ms` starting one interval from now
    pub fn schedule_repeating(
        &mut self,
        owner: O,
        now_ms: i64,
        interval_ms: i64,
        event: E,
    ) -> TimerHandle {
        let interval = interval_ms.max(MIN_DELAY_MS);
        self.insert(owner, now_ms + interval, Some(interval), event)
    }

    fn insert(&mut self, owner: O, fire_at_ms: i64, interval_ms: Option<i64>, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let seq = self.bump_seq();

        self.queue.insert((fire_at_ms, seq), handle);
        self.by_owner.entry(owner.clone()).or_default().insert(handle);
        self.entries.insert(
            handle,
            TimerEntry {
                owner,
                event,
                fire_at_ms,
                seq,
                interval_ms,
            },
        );
        handle
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Cancel one timer. Returns false if it already fired or was canceled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let Some(entry) = self.entries.remove(&handle) else {
            return false;
        };
        self.queue.remove(&(entry.fire_at_ms, entry.seq));
        self.forget_owner_handle(&entry.owner, handle);
        true
    }

    /// Cancel every timer belonging to `owner`. Returns how many were pending.
    pub fn cancel_all(&mut self, owner: &O) -> usize {
        let Some(handles) = self.by_owner.remove(owner) else {
            return 0;
        };
        for handle in &handles {
            if let Some(entry) = self.entries.remove(handle) {
                self.queue.remove(&(entry.fire_at_ms, entry.seq));
            }
        }
        handles.len()
    }

    /// Cancel every timer of every owner
    pub fn cancel_everything(&mut self) -> usize {
        let count = self.entries.len();
        self.queue.clear();
        self.entries.clear();
        self.by_owner.clear();
        count
    }

    fn forget_owner_handle(&mut self, owner: &O, handle: TimerHandle) {
        if let Some(set) = self.by_owner.get_mut(owner) {
            set.remove(&handle);
            if set.is_empty() {
                self.by_owner.remove(owner);
            }
        }
    }

    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    pub fn pending_for(&self, owner: &O) -> usize {
        self.by_owner.get(owner).map_or(0, HashSet::len)
    }

    /// Fire time of the earliest pending timer
    pub fn next_deadline(&self) -> Option<i64> {
        self.queue.first_key_value().map(|(&(fire_at, _), _)| fire_at)
    }

    /// Pop the earliest timer whose fire time is at or before `now_ms`.
    ///
    /// One-shot timers are deregistered; repeating timers are re-armed one
    /// interval after the fire time they were popped for.
    pub fn pop_due(&mut self, now_ms: i64) -> Option<FiredTimer<O, E>> {
        let (&(fire_at_ms, seq), &handle) = self.queue.first_key_value()?;
        if fire_at_ms > now_ms {
            return None;
        }
        self.queue.remove(&(fire_at_ms, seq));

        let interval = self.entries.get(&handle)?.interval_ms;
        match interval {
            Some(interval_ms) => {
                let next_seq = self.bump_seq();
                let entry = self.entries.get_mut(&handle)?;
                entry.fire_at_ms = fire_at_ms + interval_ms;
                entry.seq = next_seq;
                self.queue.insert((entry.fire_at_ms, next_seq), handle);
                Some(FiredTimer {
                    handle,
                    owner: entry.owner.clone(),
                    event: entry.event.clone(),
                    fire_at_ms,
                    repeating: true,
                })
            }
            None => {
                let entry = self.entries.remove(&handle)?;
                self.forget_owner_handle(&entry.owner, handle);
                Some(FiredTimer {
                    handle,
                    owner: entry.owner,
                    event: entry.event,
                    fire_at_ms,
                    repeating: false,
                })
            }
        }
    }
}
