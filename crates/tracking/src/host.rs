//! The mounted tracking view.
//!
//! A [`MapHost`] creates its engine once in [`MapHost::mount`] and releases it
//! in [`MapHost::unmount`] (also run on drop). Everything in between is
//! incremental: snapshots reconcile markers, location updates move the user
//! marker, and only the camera rules in [`crate::camera`] move the viewport.

use feed::BusPosition;
use foundation::geo::LatLng;
use foundation::ids::VehicleId;
use tracing::{debug, info};

use crate::camera::{CameraController, CameraSettings, FollowOutcome};
use crate::config::TrackerConfig;
use crate::engine::{ClickTarget, EngineOptions, MapEngine, MarkerSpec};
use crate::error::{EngineError, TrackerError};
use crate::observer::SelectionObserver;
use crate::reconciler::{MarkerReconciler, ReconcileReport};
use crate::selection::{DeselectCause, SelectionController, SelectionState, Transition};
use crate::style::{StyleSheet, USER_POPUP};

pub struct MapHost<E: MapEngine> {
    engine: Option<E>,
    markers: MarkerReconciler<E::Marker>,
    user_marker: Option<E::Marker>,
    user_location: LatLng,
    selection: SelectionController,
    camera: CameraController,
    styles: StyleSheet,
    observer: Box<dyn SelectionObserver>,
    snapshot: Vec<BusPosition>,
}

impl<E: MapEngine> MapHost<E> {
    /// Creates the engine, centers it on `user`, and places the user marker.
    pub fn mount<F>(
        config: &TrackerConfig,
        user: LatLng,
        observer: Box<dyn SelectionObserver>,
        create_engine: F,
    ) -> Result<Self, TrackerError>
    where
        F: FnOnce(&EngineOptions) -> Result<E, EngineError>,
    {
        config.validate()?;
        if !user.is_finite() {
            return Err(TrackerError::InvalidUserLocation(user.to_string()));
        }

        let mut engine = create_engine(&EngineOptions::from_config(config, user))?;
        let styles = StyleSheet::from_palette(&config.palette);
        let mut camera = CameraController::new(CameraSettings::from_config(config));
        camera.initialize(&mut engine, user);
        let user_marker = engine.create_marker(MarkerSpec {
            position: user,
            style: styles.user(),
            popup: USER_POPUP,
            click: None,
        });
        info!(center = %user, zoom = config.default_zoom, "map mounted");

        Ok(Self {
            engine: Some(engine),
            markers: MarkerReconciler::new(),
            user_marker: Some(user_marker),
            user_location: user,
            selection: SelectionController::new(),
            camera,
            styles,
            observer,
            snapshot: Vec::new(),
        })
    }

    pub fn is_mounted(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    pub fn markers(&self) -> &MarkerReconciler<E::Marker> {
        &self.markers
    }

    pub fn user_marker(&self) -> Option<&E::Marker> {
        self.user_marker.as_ref()
    }

    pub fn user_location(&self) -> LatLng {
        self.user_location
    }

    pub fn selection(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn is_following(&self) -> bool {
        self.selection.state().is_following()
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    /// Reconciles markers against a new snapshot. Ignored after unmount.
    pub fn apply_snapshot(&mut self, snapshot: Vec<BusPosition>) -> ReconcileReport {
        let Some(engine) = self.engine.as_mut() else {
            debug!(buses = snapshot.len(), "snapshot after unmount ignored");
            return ReconcileReport::default();
        };
        let report = self.markers.reconcile(
            engine,
            &snapshot,
            self.selection.state().selected(),
            &self.styles,
        );
        self.snapshot = snapshot;
        report
    }

    /// Moves the user marker. Never moves the viewport.
    pub fn update_user_location(&mut self, location: LatLng) {
        if !location.is_finite() {
            debug!(%location, "ignoring non-finite user location");
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if location == self.user_location {
            return;
        }
        self.user_location = location;
        if let Some(marker) = &self.user_marker {
            engine.move_marker(marker, location);
        }
    }

    pub fn on_marker_click(&mut self, vehicle: &VehicleId) -> Transition {
        self.select(vehicle.clone())
    }

    /// A click on the map surface. Clicks that landed on a marker element are
    /// handled by [`MapHost::on_marker_click`] and ignored here.
    pub fn on_map_click(&mut self, target: ClickTarget) -> Transition {
        match target {
            ClickTarget::Marker => Transition::Unchanged,
            ClickTarget::Background => self.deselect(DeselectCause::Background),
        }
    }

    /// Selection driven by the surrounding page, e.g. the bus list.
    pub fn select_bus(&mut self, vehicle: Option<VehicleId>) -> Transition {
        match vehicle {
            Some(id) => self.select(id),
            None => self.deselect(DeselectCause::External),
        }
    }

    /// Clears the selection and recenters on the user at the locate zoom.
    pub fn locate(&mut self) -> Transition {
        let transition = self.deselect(DeselectCause::Locate);
        if let Some(engine) = self.engine.as_mut() {
            self.camera.recenter_on_user(engine, self.user_location);
        }
        transition
    }

    pub fn zoom_in(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.zoom_in();
        }
    }

    pub fn zoom_out(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.zoom_out();
        }
    }

    pub fn follow_tick(&mut self) -> FollowOutcome {
        let Some(engine) = self.engine.as_mut() else {
            return FollowOutcome::NotFollowing;
        };
        let state = self.selection.state();
        let target = state.selected().and_then(|id| self.markers.position_of(id));
        self.camera.follow_tick(engine, state, target)
    }

    pub fn set_user_interaction(&mut self, active: bool) {
        self.camera.set_user_interaction(active);
    }

    /// Buses in the last snapshot ordered by distance from the user, nearest
    /// first. Buses with no known distance come last.
    pub fn buses_by_distance(&self) -> Vec<(VehicleId, Option<f64>)> {
        let mut out: Vec<(VehicleId, Option<f64>)> = self
            .snapshot
            .iter()
            .map(|bus| (bus.vehicle_id.clone(), bus.distance_to_km(&self.user_location)))
            .collect();
        out.sort_by(|(a_id, a), (b_id, b)| match (a, b) {
            (Some(a), Some(b)) => a.total_cmp(b).then_with(|| a_id.cmp(b_id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a_id.cmp(b_id),
        });
        out
    }

    /// Removes all markers and destroys the engine. Returns `false` when
    /// already unmounted.
    pub fn unmount(&mut self) -> bool {
        let Some(mut engine) = self.engine.take() else {
            return false;
        };
        let removed = self.markers.clear(&mut engine);
        if let Some(marker) = self.user_marker.take() {
            engine.remove_marker(&marker);
        }
        engine.destroy();
        self.selection.reset();
        self.snapshot.clear();
        info!(removed, "map unmounted");
        true
    }

    fn select(&mut self, id: VehicleId) -> Transition {
        let Some(engine) = self.engine.as_mut() else {
            return Transition::Unchanged;
        };
        let transition = self.selection.select(id);
        if let Transition::Selected { current, .. } = &transition {
            self.markers.apply_selection(engine, Some(current), &self.styles);
            match self.markers.position_of(current) {
                Some(position) => self.camera.recenter_on_bus(engine, position),
                None => debug!(vehicle_id = %current, "selected bus has no marker yet"),
            }
            self.observer.on_bus_select(Some(current));
            self.observer.set_following(true);
        }
        transition
    }

    fn deselect(&mut self, cause: DeselectCause) -> Transition {
        let Some(engine) = self.engine.as_mut() else {
            return Transition::Unchanged;
        };
        let transition = self.selection.deselect(cause);
        if transition.is_change() {
            self.markers.apply_selection(engine, None, &self.styles);
            self.observer.set_following(false);
            self.observer.on_bus_select(None);
        }
        transition
    }
}

impl<E: MapEngine> Drop for MapHost<E> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<E: MapEngine> std::fmt::Debug for MapHost<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapHost")
            .field("mounted", &self.is_mounted())
            .field("markers", &self.markers.len())
            .field("user_location", &self.user_location)
            .field("selection", self.selection.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{EngineOp, HeadlessEngine, ObservedCall, RecordingObserver};
    use pretty_assertions::assert_eq;

    const USER: LatLng = LatLng::new(22.35, 91.78);

    fn mount() -> (MapHost<HeadlessEngine>, RecordingObserver) {
        let observer = RecordingObserver::new();
        let host = MapHost::mount(
            &TrackerConfig::default(),
            USER,
            Box::new(observer.clone()),
            |options| Ok(HeadlessEngine::new(options)),
        )
        .unwrap();
        (host, observer)
    }

    fn engine(host: &MapHost<HeadlessEngine>) -> &HeadlessEngine {
        host.engine().unwrap()
    }

    #[test]
    fn mount_centers_on_user_and_places_user_marker() {
        let (host, _) = mount();
        let engine = engine(&host);
        assert_eq!(engine.center(), USER);
        assert_eq!(engine.zoom(), 13.0);
        let marker = engine.marker(host.user_marker().unwrap()).unwrap();
        assert_eq!(marker.popup, "Your Location");
        assert_eq!(marker.click, None);
    }

    #[test]
    fn mount_propagates_engine_errors() {
        let result = MapHost::<HeadlessEngine>::mount(
            &TrackerConfig::default(),
            USER,
            Box::new(RecordingObserver::new()),
            |_| Err(EngineError::ContainerNotReady("map".to_string())),
        );
        let err = result.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn mount_rejects_non_finite_user() {
        let result = MapHost::<HeadlessEngine>::mount(
            &TrackerConfig::default(),
            LatLng::new(f64::NAN, 0.0),
            Box::new(RecordingObserver::new()),
            |options| Ok(HeadlessEngine::new(options)),
        );
        assert!(matches!(result, Err(TrackerError::InvalidUserLocation(_))));
    }

    #[test]
    fn user_location_update_moves_marker_not_camera() {
        let (mut host, _) = mount();
        let views = engine(&host).set_view_count();
        host.update_user_location(LatLng::new(22.36, 91.79));
        let engine = engine(&host);
        assert_eq!(engine.set_view_count(), views);
        assert_eq!(engine.center(), USER);
        let marker = engine.marker(host.user_marker().unwrap()).unwrap();
        assert_eq!(marker.position, LatLng::new(22.36, 91.79));
    }

    #[test]
    fn marker_click_notifies_select_then_following() {
        let (mut host, observer) = mount();
        host.apply_snapshot(vec![BusPosition::new("B1", 22.351, 91.781)]);
        host.on_marker_click(&VehicleId::from("B1"));
        assert_eq!(
            observer.take(),
            vec![
                ObservedCall::BusSelect(Some(VehicleId::from("B1"))),
                ObservedCall::Following(true),
            ]
        );
        assert_eq!(engine(&host).center(), LatLng::new(22.351, 91.781));
    }

    #[test]
    fn background_click_notifies_following_then_clear() {
        let (mut host, observer) = mount();
        host.apply_snapshot(vec![BusPosition::new("B1", 22.351, 91.781)]);
        host.on_marker_click(&VehicleId::from("B1"));
        observer.take();
        host.on_map_click(ClickTarget::Background);
        assert_eq!(
            observer.take(),
            vec![ObservedCall::Following(false), ObservedCall::BusSelect(None)]
        );
        assert!(host.selection().is_idle());
    }

    #[test]
    fn background_click_when_idle_is_silent() {
        let (mut host, observer) = mount();
        host.apply_snapshot(vec![BusPosition::new("B1", 22.351, 91.781)]);
        let ops = engine(&host).ops().len();
        assert_eq!(host.on_map_click(ClickTarget::Background), Transition::Unchanged);
        assert!(observer.calls().is_empty());
        assert_eq!(engine(&host).ops().len(), ops);
    }

    #[test]
    fn marker_target_on_map_click_is_ignored() {
        let (mut host, _) = mount();
        host.apply_snapshot(vec![BusPosition::new("B1", 22.351, 91.781)]);
        host.on_marker_click(&VehicleId::from("B1"));
        assert_eq!(host.on_map_click(ClickTarget::Marker), Transition::Unchanged);
        assert!(host.is_following());
    }

    #[test]
    fn locate_clears_selection_and_zooms_to_user() {
        let (mut host, _) = mount();
        host.apply_snapshot(vec![BusPosition::new("B1", 22.4, 91.9)]);
        host.on_marker_click(&VehicleId::from("B1"));
        host.locate();
        assert!(host.selection().is_idle());
        let engine = engine(&host);
        assert_eq!(engine.center(), USER);
        assert_eq!(engine.zoom(), 15.0);
    }

    #[test]
    fn zoom_buttons_delegate_to_engine() {
        let (mut host, _) = mount();
        host.zoom_in();
        host.zoom_out();
        host.zoom_out();
        let ops: Vec<_> = engine(&host)
            .ops()
            .iter()
            .filter(|op| matches!(op, EngineOp::ZoomIn | EngineOp::ZoomOut))
            .cloned()
            .collect();
        assert_eq!(ops, vec![EngineOp::ZoomIn, EngineOp::ZoomOut, EngineOp::ZoomOut]);
        assert_eq!(engine(&host).zoom(), 12.0);
    }

    #[test]
    fn buses_sorted_by_distance_unknown_last() {
        let (mut host, _) = mount();
        host.apply_snapshot(vec![
            BusPosition::new("far", 23.0, 91.78),
            BusPosition::new("broken", "x", "y"),
            BusPosition::new("near", 22.351, 91.78),
            BusPosition::new("listed", 0.0, 0.0).with_distance(0.05),
        ]);
        let order: Vec<_> = host
            .buses_by_distance()
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();
        assert_eq!(order, vec!["listed", "near", "far", "broken"]);
    }

    #[test]
    fn unmount_releases_everything_once() {
        let (mut host, _) = mount();
        host.apply_snapshot(vec![BusPosition::new("B1", 22.351, 91.781)]);
        assert!(host.unmount());
        assert!(!host.unmount());
        assert!(!host.is_mounted());
        assert!(host.apply_snapshot(vec![BusPosition::new("B2", 1.0, 1.0)]).is_noop());
        assert_eq!(host.follow_tick(), FollowOutcome::NotFollowing);
    }
}
