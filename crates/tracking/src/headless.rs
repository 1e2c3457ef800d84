//! An in-memory [`MapEngine`] that records every call.
//!
//! Used by the unit and integration tests and by the `replay` tool. Animated
//! view changes land immediately at their end state.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::geo::LatLng;
use foundation::handles::{Handle, HandleAllocator};
use foundation::ids::VehicleId;

use crate::engine::{EngineOptions, MapEngine, MarkerSpec, Motion};
use crate::observer::SelectionObserver;
use crate::style::MarkerStyle;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineOp {
    Create { marker: Handle, position: LatLng },
    Move { marker: Handle, position: LatLng },
    Restyle { marker: Handle, color: String },
    Popup { marker: Handle, text: String },
    Remove { marker: Handle },
    SetView { center: LatLng, zoom: f64, motion: Motion },
    ZoomIn,
    ZoomOut,
    Destroy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMarker {
    pub position: LatLng,
    pub style: MarkerStyle,
    pub popup: String,
    pub click: Option<VehicleId>,
}

#[derive(Debug)]
pub struct HeadlessEngine {
    handles: HandleAllocator,
    markers: BTreeMap<Handle, HeadlessMarker>,
    center: LatLng,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    ops: Vec<EngineOp>,
    destroys: Rc<Cell<u32>>,
}

impl HeadlessEngine {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            handles: HandleAllocator::default(),
            markers: BTreeMap::new(),
            center: options.center,
            zoom: options.zoom,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            ops: Vec::new(),
            destroys: Rc::new(Cell::new(0)),
        }
    }

    pub fn ops(&self) -> &[EngineOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn marker(&self, handle: &Handle) -> Option<&HeadlessMarker> {
        self.markers.get(handle)
    }

    pub fn markers(&self) -> impl Iterator<Item = (&Handle, &HeadlessMarker)> {
        self.markers.iter()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn count_ops(&self, pred: impl Fn(&EngineOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn set_view_count(&self) -> usize {
        self.count_ops(|op| matches!(op, EngineOp::SetView { .. }))
    }

    /// Shared count of `destroy` calls; stays readable after the engine is
    /// dropped.
    pub fn destroy_probe(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.destroys)
    }

    /// Moves the viewport as a user drag would, without recording an op.
    pub fn drag_to(&mut self, center: LatLng) {
        self.center = center;
    }

    fn live(&self, marker: &Handle, op: &str) -> bool {
        let live = self.markers.contains_key(marker);
        if !live {
            tracing::warn!(marker = marker.raw(), op, "headless engine: unknown marker");
        }
        live
    }
}

impl MapEngine for HeadlessEngine {
    type Marker = Handle;

    fn create_marker(&mut self, spec: MarkerSpec<'_>) -> Handle {
        let handle = self.handles.allocate();
        self.markers.insert(
            handle,
            HeadlessMarker {
                position: spec.position,
                style: spec.style.clone(),
                popup: spec.popup.to_string(),
                click: spec.click.cloned(),
            },
        );
        self.ops.push(EngineOp::Create {
            marker: handle,
            position: spec.position,
        });
        handle
    }

    fn move_marker(&mut self, marker: &Handle, position: LatLng) {
        if !self.live(marker, "move") {
            return;
        }
        if let Some(m) = self.markers.get_mut(marker) {
            m.position = position;
        }
        self.ops.push(EngineOp::Move {
            marker: *marker,
            position,
        });
    }

    fn restyle_marker(&mut self, marker: &Handle, style: &MarkerStyle) {
        if !self.live(marker, "restyle") {
            return;
        }
        if let Some(m) = self.markers.get_mut(marker) {
            m.style = style.clone();
        }
        self.ops.push(EngineOp::Restyle {
            marker: *marker,
            color: style.color.clone(),
        });
    }

    fn set_popup(&mut self, marker: &Handle, popup: &str) {
        if !self.live(marker, "popup") {
            return;
        }
        if let Some(m) = self.markers.get_mut(marker) {
            m.popup = popup.to_string();
        }
        self.ops.push(EngineOp::Popup {
            marker: *marker,
            text: popup.to_string(),
        });
    }

    fn remove_marker(&mut self, marker: &Handle) {
        if self.markers.remove(marker).is_some() {
            self.ops.push(EngineOp::Remove { marker: *marker });
        }
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn set_view(&mut self, center: LatLng, zoom: f64, motion: Motion) {
        self.center = center;
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.ops.push(EngineOp::SetView {
            center,
            zoom: self.zoom,
            motion,
        });
    }

    fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 1.0).min(self.max_zoom);
        self.ops.push(EngineOp::ZoomIn);
    }

    fn zoom_out(&mut self) {
        self.zoom = (self.zoom - 1.0).max(self.min_zoom);
        self.ops.push(EngineOp::ZoomOut);
    }

    fn destroy(&mut self) {
        self.markers.clear();
        self.destroys.set(self.destroys.get() + 1);
        self.ops.push(EngineOp::Destroy);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedCall {
    BusSelect(Option<VehicleId>),
    Following(bool),
}

/// A [`SelectionObserver`] whose clones share one call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    calls: Rc<RefCell<Vec<ObservedCall>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ObservedCall> {
        self.calls.borrow().clone()
    }

    pub fn take(&self) -> Vec<ObservedCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl SelectionObserver for RecordingObserver {
    fn on_bus_select(&mut self, vehicle: Option<&VehicleId>) {
        self.calls
            .borrow_mut()
            .push(ObservedCall::BusSelect(vehicle.cloned()));
    }

    fn set_following(&mut self, following: bool) {
        self.calls
            .borrow_mut()
            .push(ObservedCall::Following(following));
    }
}
