//! Drives a [`MapHost`] over a [`Trace`] with the headless engine.
//!
//! Follow ticks come from the runtime's interval timers, armed only while the
//! view is following, exactly as the browser does it.

use std::collections::BTreeMap;

use foundation::geo::LatLng;
use runtime::{EventBus, EventKind, IntervalTimer, ManualClock, TimerScheduler};
use serde::Serialize;
use tracking::headless::{EngineOp, HeadlessEngine, ObservedCall, RecordingObserver};
use tracking::{ClickTarget, FollowOutcome, MapEngine, MapHost, Motion, TrackerConfig, Transition};

use crate::trace::{ReplayError, Step, Trace};

const FOLLOW_TIMER: &str = "follow";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSummary {
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub steps: usize,
    pub elapsed_ms: u64,
    pub engine_creations: u32,
    pub markers: Vec<MarkerSummary>,
    pub selected: Option<String>,
    pub following: bool,
    pub center: LatLng,
    pub zoom: f64,
    /// Animated viewport moves (selection recenters and follow pans).
    pub pans: usize,
    pub follow_ticks: usize,
    pub markers_created: usize,
    pub markers_removed: usize,
    pub callbacks: Vec<String>,
    pub events: BTreeMap<&'static str, usize>,
}

pub struct Replay {
    host: MapHost<HeadlessEngine>,
    config: TrackerConfig,
    observer: RecordingObserver,
    clock: ManualClock,
    timers: TimerScheduler,
    events: EventBus,
    engine_creations: u32,
    follow_ticks: usize,
    steps: usize,
}

impl Replay {
    pub fn mount(config: &TrackerConfig, user: LatLng) -> Result<Self, ReplayError> {
        let observer = RecordingObserver::new();
        let mut engine_creations = 0;
        let host = MapHost::mount(config, user, Box::new(observer.clone()), |options| {
            engine_creations += 1;
            Ok(HeadlessEngine::new(options))
        })?;
        let clock = ManualClock::new();
        let mut events = EventBus::new();
        events.emit(clock.now(), EventKind::Lifecycle, format!("mounted at {user}"));
        Ok(Self {
            host,
            config: config.clone(),
            observer,
            clock,
            timers: TimerScheduler::new(),
            events,
            engine_creations,
            follow_ticks: 0,
            steps: 0,
        })
    }

    pub fn host(&self) -> &MapHost<HeadlessEngine> {
        &self.host
    }

    pub fn apply(&mut self, step: &Step) {
        let now = self.clock.now();
        self.steps += 1;
        match step {
            Step::Snapshot { buses } => {
                let report = self.host.apply_snapshot(buses.clone());
                self.events.emit(
                    now,
                    EventKind::Snapshot,
                    format!(
                        "{} buses: +{} -{} moved {} skipped {}",
                        buses.len(),
                        report.created.len(),
                        report.removed.len(),
                        report.moved,
                        report.skipped
                    ),
                );
            }
            Step::Location {
                latitude,
                longitude,
            } => {
                let location = LatLng::new(*latitude, *longitude);
                self.host.update_user_location(location);
                self.events
                    .emit(now, EventKind::Location, format!("user at {location}"));
            }
            Step::Click { vehicle_id } => {
                let t = self.host.on_marker_click(vehicle_id);
                self.record_transition(t);
            }
            Step::BackgroundClick => {
                let t = self.host.on_map_click(ClickTarget::Background);
                self.record_transition(t);
            }
            Step::Locate => {
                let t = self.host.locate();
                self.record_transition(t);
                self.events.emit(now, EventKind::Camera, "locate");
            }
            Step::Select { vehicle_id } => {
                let t = self.host.select_bus(vehicle_id.clone());
                self.record_transition(t);
            }
            Step::Drag { active } => self.host.set_user_interaction(*active),
            Step::ZoomIn => self.host.zoom_in(),
            Step::ZoomOut => self.host.zoom_out(),
            Step::Advance { ms } => self.advance(*ms),
        }
        self.sync_follow_timer();
    }

    fn advance(&mut self, ms: u64) {
        let now = self.clock.advance(ms);
        while let Some(fire) = self.timers.pop_due(now) {
            if fire.id != FOLLOW_TIMER {
                continue;
            }
            self.follow_ticks += 1;
            if let FollowOutcome::Panned { drift_m } = self.host.follow_tick() {
                self.events
                    .emit(fire.at, EventKind::Camera, format!("follow pan, drift {drift_m:.1} m"));
            }
        }
    }

    fn sync_follow_timer(&mut self) {
        let following = self.host.is_following();
        let armed = self.timers.is_armed(FOLLOW_TIMER);
        if following && !armed {
            self.timers.arm(IntervalTimer::armed_at(
                FOLLOW_TIMER,
                self.config.follow_interval_ms,
                self.clock.now(),
            ));
        } else if !following && armed {
            self.timers.cancel(FOLLOW_TIMER);
        }
    }

    fn record_transition(&mut self, transition: Transition) {
        let message = match transition {
            Transition::Unchanged => return,
            Transition::Selected { current, .. } => format!("selected {current}"),
            Transition::Deselected { previous, cause } => {
                format!("deselected {previous} ({})", cause.as_str())
            }
        };
        self.events
            .emit(self.clock.now(), EventKind::Selection, message);
    }

    pub fn summary(&self) -> ReplaySummary {
        let (center, zoom, pans, created, removed) = match self.host.engine() {
            Some(engine) => (
                engine.center(),
                engine.zoom(),
                engine.count_ops(|op| {
                    matches!(
                        op,
                        EngineOp::SetView {
                            motion: Motion::Animate { .. },
                            ..
                        }
                    )
                }),
                engine.count_ops(|op| matches!(op, EngineOp::Create { .. })),
                engine.count_ops(|op| matches!(op, EngineOp::Remove { .. })),
            ),
            None => (self.host.user_location(), 0.0, 0, 0, 0),
        };

        let markers = self
            .host
            .markers()
            .entries()
            .map(|(id, entry)| MarkerSummary {
                vehicle_id: id.to_string(),
                latitude: entry.position.latitude,
                longitude: entry.position.longitude,
                selected: entry.selected,
            })
            .collect();

        let callbacks = self
            .observer
            .calls()
            .into_iter()
            .map(|call| match call {
                ObservedCall::BusSelect(Some(id)) => format!("onBusSelect({id})"),
                ObservedCall::BusSelect(None) => "onBusSelect(null)".to_string(),
                ObservedCall::Following(f) => format!("setFollowing({f})"),
            })
            .collect();

        let mut events = BTreeMap::new();
        for event in self.events.events() {
            *events.entry(event.kind.as_str()).or_insert(0) += 1;
        }

        ReplaySummary {
            steps: self.steps,
            elapsed_ms: self.clock.now().0,
            engine_creations: self.engine_creations,
            markers,
            selected: self.host.selection().selected().map(|id| id.to_string()),
            following: self.host.is_following(),
            center,
            zoom,
            pans,
            follow_ticks: self.follow_ticks,
            // The user marker is not a bus marker.
            markers_created: created.saturating_sub(1),
            markers_removed: removed,
            callbacks,
            events,
        }
    }
}

/// Mounts at the trace's user location and applies every step.
pub fn run(trace: &Trace, config: &TrackerConfig) -> Result<ReplaySummary, ReplayError> {
    let mut replay = Replay::mount(config, trace.user)?;
    for step in &trace.steps {
        tracing::debug!(step = step.name(), "replay step");
        replay.apply(step);
    }
    Ok(replay.summary())
}
