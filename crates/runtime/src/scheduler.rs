use foundation::time::Millis;

use crate::timer::IntervalTimer;

/// One timer tick popped from the [`TimerScheduler`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimerFire {
    pub id: &'static str,
    pub at: Millis,
}

/// Deterministic set of independent repeating timers.
///
/// Ordering contract: ticks are popped by `(due_at, priority, id, arm_order)`,
/// so interleaving of unsynchronized timers is reproducible.
#[derive(Debug, Default)]
pub struct TimerScheduler {
    next_order: u64,
    timers: Vec<(u64, IntervalTimer)>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `timer`, replacing any timer already registered under the same id.
    pub fn arm(&mut self, timer: IntervalTimer) {
        self.cancel(timer.id);
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.timers.push((order, timer));
    }

    /// Returns `true` if a timer was removed.
    pub fn cancel(&mut self, id: &str) -> bool {
        let before = self.timers.len();
        self.timers.retain(|(_, t)| t.id != id);
        before != self.timers.len()
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.timers.iter().any(|(_, t)| t.id == id)
    }

    /// Pops the earliest tick due at or before `now`.
    ///
    /// Callers loop on this so they can arm or cancel timers between ticks.
    pub fn pop_due(&mut self, now: Millis) -> Option<TimerFire> {
        let (_, timer) = self
            .timers
            .iter_mut()
            .filter(|(_, t)| t.is_due(now))
            .min_by(|(oa, a), (ob, b)| {
                a.next_due()
                    .cmp(&b.next_due())
                    .then_with(|| a.priority.cmp(&b.priority))
                    .then_with(|| a.id.cmp(b.id))
                    .then_with(|| oa.cmp(ob))
            })?;
        let at = timer.take_tick(now)?;
        Some(TimerFire { id: timer.id, at })
    }
}
