use foundation::time::Millis;

/// Deterministic clock for headless runs.
///
/// The browser build uses real timers instead; this exists so timer-driven
/// behavior can be recorded and replayed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ManualClock {
    now: Millis,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn advance(&mut self, ms: u64) -> Millis {
        self.now = self.now.saturating_add(ms);
        self.now
    }
}
