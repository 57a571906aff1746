//! Virtual-clock timer queue with generation-tagged cancellation.
//!
//! Every timer carries the generation that was live when it was scheduled.
//! [`Scheduler::cancel_all`] bumps the generation, so anything still queued
//! from the previous generation is discarded when it comes due instead of
//! firing against state that has since been replaced.

/// Monotonic tag identifying one live instance of timed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Pending<E> {
    id: TimerId,
    due_ms: u64,
    generation: Generation,
    event: E,
}

#[derive(Debug, Clone)]
pub struct Scheduler<E> {
    now_ms: u64,
    generation: Generation,
    next_id: u64,
    pending: Vec<Pending<E>>,
    dropped: u64,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now_ms: 0,
            generation: Generation(0),
            next_id: 0,
            pending: Vec::new(),
            dropped: 0,
        }
    }

    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Timers from the live generation still waiting to fire.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.pending
            .iter()
            .filter(|timer| timer.generation == self.generation)
            .count()
    }

    /// Stale timers discarded so far.
    #[must_use]
    pub const fn dropped_count(&self) -> u64 {
        self.dropped
    }

    pub fn schedule_in(&mut self, delay_ms: u64, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.push(Pending {
            id,
            due_ms: self.now_ms.saturating_add(delay_ms),
            generation: self.generation,
            event,
        });
        id
    }

    /// Remove one timer. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.id != id);
        self.pending.len() != before
    }

    /// Invalidate every pending timer and start a new generation.
    pub fn cancel_all(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.generation
    }

    /// Fire the earliest timer due at or before `until_ms`, moving the clock
    /// to its due time. Stale-generation timers are discarded on the way.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<E> {
        loop {
            let index = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, timer)| timer.due_ms <= until_ms)
                .min_by_key(|(_, timer)| (timer.due_ms, timer.id.0))
                .map(|(index, _)| index)?;
            let timer = self.pending.swap_remove(index);
            if timer.generation != self.generation {
                self.dropped = self.dropped.saturating_add(1);
                log::debug!(
                    "dropping stale timer from generation {} (live {})",
                    timer.generation.value(),
                    self.generation.value()
                );
                continue;
            }
            self.now_ms = self.now_ms.max(timer.due_ms);
            return Some(timer.event);
        }
    }

    /// Move the clock forward to `until_ms` once nothing else is due.
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}
