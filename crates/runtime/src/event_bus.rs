use foundation::time::Millis;

/// Coarse category of a recorded event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Lifecycle,
    Snapshot,
    Location,
    Selection,
    Camera,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Lifecycle => "lifecycle",
            EventKind::Snapshot => "snapshot",
            EventKind::Location => "location",
            EventKind::Selection => "selection",
            EventKind::Camera => "camera",
        }
    }
}

/// Recorded event for traceability of a headless run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub at: Millis,
    pub kind: EventKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, at: Millis, kind: EventKind, message: impl Into<String>) {
        let message = message.into();
        tracing::trace!(at_ms = at.0, kind = kind.as_str(), %message, "event");
        self.events.push(Event { at, kind, message });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, EventKind};
    use foundation::time::Millis;

    #[test]
    fn records_events_with_timestamp() {
        let mut bus = EventBus::new();
        bus.emit(Millis(2000), EventKind::Snapshot, "2 markers");
        assert_eq!(bus.events().len(), 1);
        assert_eq!(bus.events()[0].at, Millis(2000));
        assert_eq!(bus.events()[0].kind, EventKind::Snapshot);
        assert_eq!(bus.events()[0].message, "2 markers");
    }
}
