use foundation::time::Millis;

/// A repeating timer with a fixed period, expressed in event-loop time.
///
/// The first tick is due one full period after the timer is armed, matching
/// `setInterval` semantics.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IntervalTimer {
    pub id: &'static str,
    /// Smaller values fire first when several timers are due at the same instant.
    pub priority: i32,
    period_ms: u64,
    next_due: Millis,
}

impl IntervalTimer {
    /// Arms a timer at `now`. A zero period is clamped to 1 ms.
    pub fn armed_at(id: &'static str, period_ms: u64, now: Millis) -> Self {
        Self::with_priority(id, 0, period_ms, now)
    }

    pub fn with_priority(id: &'static str, priority: i32, period_ms: u64, now: Millis) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            id,
            priority,
            period_ms,
            next_due: now.saturating_add(period_ms),
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn next_due(&self) -> Millis {
        self.next_due
    }

    pub fn is_due(&self, now: Millis) -> bool {
        self.next_due <= now
    }

    /// Consumes one tick if due, returning the instant it was scheduled for.
    pub fn take_tick(&mut self, now: Millis) -> Option<Millis> {
        if !self.is_due(now) {
            return None;
        }
        let at = self.next_due;
        self.next_due = at.saturating_add(self.period_ms);
        Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::IntervalTimer;
    use foundation::time::Millis;

    #[test]
    fn first_tick_waits_one_period() {
        let mut t = IntervalTimer::armed_at("feed", 5000, Millis(0));
        assert!(t.take_tick(Millis(4999)).is_none());
        assert_eq!(t.take_tick(Millis(5000)), Some(Millis(5000)));
        assert_eq!(t.next_due(), Millis(10_000));
    }

    #[test]
    fn catches_up_one_tick_at_a_time() {
        let mut t = IntervalTimer::armed_at("follow", 1000, Millis(0));
        let mut ticks = Vec::new();
        while let Some(at) = t.take_tick(Millis(3500)) {
            ticks.push(at.0);
        }
        assert_eq!(ticks, vec![1000, 2000, 3000]);
    }

    #[test]
    fn zero_period_is_clamped() {
        let t = IntervalTimer::armed_at("x", 0, Millis(10));
        assert_eq!(t.period_ms(), 1);
        assert_eq!(t.next_due(), Millis(11));
    }
}
