//! Viewport control.
//!
//! The camera moves only at well-defined moments: once on initialization, on
//! selection, on the explicit locate action, and on follow ticks whose target
//! has drifted past the threshold. Snapshots and user location updates never
//! move it.

use foundation::geo::LatLng;
use tracing::debug;

use crate::config::TrackerConfig;
use crate::engine::{MapEngine, Motion};
use crate::selection::SelectionState;

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub default_zoom: f64,
    pub locate_zoom: f64,
    pub drift_threshold_m: f64,
    pub pan_duration_ms: u64,
}

impl CameraSettings {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            default_zoom: config.default_zoom,
            locate_zoom: config.locate_zoom,
            drift_threshold_m: config.follow_drift_threshold_m,
            pan_duration_ms: config.pan_duration_ms,
        }
    }

    fn animated(&self) -> Motion {
        Motion::Animate {
            duration_ms: self.pan_duration_ms,
        }
    }
}

/// Result of one follow tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FollowOutcome {
    NotFollowing,
    /// A drag gesture is in progress.
    UserInteracting,
    /// The followed bus has no marker right now.
    TargetMissing,
    WithinThreshold { drift_m: f64 },
    Panned { drift_m: f64 },
}

#[derive(Debug)]
pub struct CameraController {
    settings: CameraSettings,
    initialized: bool,
    user_interacting: bool,
}

impl CameraController {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            initialized: false,
            user_interacting: false,
        }
    }

    /// Centers on `user` at the default zoom. Only the first call has an
    /// effect; returns whether it did.
    pub fn initialize<E: MapEngine>(&mut self, engine: &mut E, user: LatLng) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        engine.set_view(user, self.settings.default_zoom, Motion::Jump);
        true
    }

    /// Recenters on a newly selected bus, keeping the current zoom.
    pub fn recenter_on_bus<E: MapEngine>(&mut self, engine: &mut E, position: LatLng) {
        let zoom = engine.zoom();
        engine.set_view(position, zoom, self.settings.animated());
    }

    /// The locate action: centers on the user at the locate zoom.
    pub fn recenter_on_user<E: MapEngine>(&mut self, engine: &mut E, user: LatLng) {
        engine.set_view(user, self.settings.locate_zoom, Motion::Jump);
    }

    pub fn follow_tick<E: MapEngine>(
        &mut self,
        engine: &mut E,
        selection: &SelectionState,
        target: Option<LatLng>,
    ) -> FollowOutcome {
        if !selection.is_following() || selection.is_idle() {
            return FollowOutcome::NotFollowing;
        }
        if self.user_interacting {
            return FollowOutcome::UserInteracting;
        }
        let Some(target) = target else {
            return FollowOutcome::TargetMissing;
        };

        let drift_m = engine.center().distance_m(&target);
        if drift_m <= self.settings.drift_threshold_m {
            return FollowOutcome::WithinThreshold { drift_m };
        }

        let zoom = engine.zoom();
        engine.set_view(target, zoom, self.settings.animated());
        debug!(drift_m, "follow pan");
        FollowOutcome::Panned { drift_m }
    }

    pub fn set_user_interaction(&mut self, active: bool) {
        self.user_interacting = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::headless::{EngineOp, HeadlessEngine};
    use crate::selection::SelectionController;
    use foundation::ids::VehicleId;

    fn setup() -> (HeadlessEngine, CameraController) {
        let config = TrackerConfig::default();
        let options = EngineOptions::from_config(&config, LatLng::new(0.0, 0.0));
        (
            HeadlessEngine::new(&options),
            CameraController::new(CameraSettings::from_config(&config)),
        )
    }

    fn following() -> SelectionState {
        let mut ctl = SelectionController::new();
        ctl.select(VehicleId::from("B1"));
        ctl.state().clone()
    }

    #[test]
    fn initializes_once_at_default_zoom() {
        let (mut engine, mut camera) = setup();
        assert!(camera.initialize(&mut engine, LatLng::new(1.0, 2.0)));
        assert!(!camera.initialize(&mut engine, LatLng::new(5.0, 5.0)));
        assert_eq!(engine.center(), LatLng::new(1.0, 2.0));
        assert_eq!(engine.zoom(), 13.0);
        assert_eq!(engine.set_view_count(), 1);
    }

    #[test]
    fn bus_recenter_keeps_zoom() {
        let (mut engine, mut camera) = setup();
        camera.initialize(&mut engine, LatLng::new(0.0, 0.0));
        engine.zoom_in();
        engine.zoom_in();
        camera.recenter_on_bus(&mut engine, LatLng::new(0.1, 0.1));
        assert_eq!(engine.zoom(), 15.0);
        assert_eq!(engine.center(), LatLng::new(0.1, 0.1));
    }

    #[test]
    fn locate_uses_locate_zoom() {
        let (mut engine, mut camera) = setup();
        camera.recenter_on_user(&mut engine, LatLng::new(3.0, 4.0));
        assert_eq!(engine.zoom(), 15.0);
        assert_eq!(engine.center(), LatLng::new(3.0, 4.0));
    }

    #[test]
    fn follow_pans_only_past_threshold() {
        let (mut engine, mut camera) = setup();
        let state = following();
        // ~1.1 m away
        let near = LatLng::new(0.00001, 0.0);
        assert!(matches!(
            camera.follow_tick(&mut engine, &state, Some(near)),
            FollowOutcome::WithinThreshold { .. }
        ));
        assert_eq!(engine.set_view_count(), 0);

        let far = LatLng::new(0.001, 0.0);
        assert!(matches!(
            camera.follow_tick(&mut engine, &state, Some(far)),
            FollowOutcome::Panned { .. }
        ));
        assert!(matches!(
            engine.ops().last(),
            Some(EngineOp::SetView {
                motion: Motion::Animate { duration_ms: 1_000 },
                ..
            })
        ));
    }

    #[test]
    fn follow_is_inert_when_idle() {
        let (mut engine, mut camera) = setup();
        let target = Some(LatLng::new(1.0, 1.0));
        let outcome = camera.follow_tick(&mut engine, &SelectionState::idle(), target);
        assert_eq!(outcome, FollowOutcome::NotFollowing);
        assert_eq!(engine.set_view_count(), 0);
    }

    #[test]
    fn follow_waits_for_drag_to_end() {
        let (mut engine, mut camera) = setup();
        let state = following();
        camera.set_user_interaction(true);
        assert_eq!(
            camera.follow_tick(&mut engine, &state, Some(LatLng::new(1.0, 1.0))),
            FollowOutcome::UserInteracting
        );
        camera.set_user_interaction(false);
        assert!(matches!(
            camera.follow_tick(&mut engine, &state, Some(LatLng::new(1.0, 1.0))),
            FollowOutcome::Panned { .. }
        ));
    }

    #[test]
    fn follow_without_marker_reports_missing_target() {
        let (mut engine, mut camera) = setup();
        assert_eq!(
            camera.follow_tick(&mut engine, &following(), None),
            FollowOutcome::TargetMissing
        );
    }
}
