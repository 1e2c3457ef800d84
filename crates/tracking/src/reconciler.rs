//! Keeps engine markers in step with feed snapshots.
//!
//! Each vehicle id owns at most one marker for as long as it keeps appearing
//! in snapshots. Updates are applied in place; a marker is only created for a
//! new id and only removed once the id is absent from a snapshot.

use std::collections::{BTreeMap, BTreeSet};

use feed::BusPosition;
use foundation::geo::LatLng;
use foundation::ids::VehicleId;
use tracing::{debug, warn};

use crate::engine::{MapEngine, MarkerSpec};
use crate::style::{StyleSheet, bus_popup};

/// The last state pushed to the engine for one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry<M> {
    pub marker: M,
    pub position: LatLng,
    pub selected: bool,
    pub popup: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: Vec<VehicleId>,
    pub removed: Vec<VehicleId>,
    pub moved: usize,
    pub restyled: usize,
    pub relabeled: usize,
    /// Records dropped for non-numeric coordinates.
    pub skipped: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.removed.is_empty()
            && self.moved == 0
            && self.restyled == 0
            && self.relabeled == 0
    }
}

#[derive(Debug)]
pub struct MarkerReconciler<M> {
    entries: BTreeMap<VehicleId, MarkerEntry<M>>,
}

impl<M> Default for MarkerReconciler<M> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<M: Clone + PartialEq + std::fmt::Debug> MarkerReconciler<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &VehicleId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &VehicleId) -> Option<&MarkerEntry<M>> {
        self.entries.get(id)
    }

    /// Last rendered position of `id`'s marker.
    pub fn position_of(&self, id: &VehicleId) -> Option<LatLng> {
        self.entries.get(id).map(|e| e.position)
    }

    /// Vehicle ids in ascending order.
    pub fn entries(&self) -> impl Iterator<Item = (&VehicleId, &MarkerEntry<M>)> {
        self.entries.iter()
    }

    /// Applies one snapshot.
    ///
    /// Records with non-numeric coordinates contribute no marker. When an id
    /// appears more than once, the last record wins.
    pub fn reconcile<E>(
        &mut self,
        engine: &mut E,
        snapshot: &[BusPosition],
        selected: Option<&VehicleId>,
        styles: &StyleSheet,
    ) -> ReconcileReport
    where
        E: MapEngine<Marker = M>,
    {
        let mut report = ReconcileReport::default();
        let mut seen = BTreeSet::new();

        for bus in snapshot {
            let id = &bus.vehicle_id;
            let Some(position) = bus.location() else {
                debug!(
                    vehicle_id = %id,
                    latitude = %bus.latitude,
                    longitude = %bus.longitude,
                    "skipping bus with non-numeric coordinates"
                );
                report.skipped += 1;
                continue;
            };
            if !seen.insert(id.clone()) {
                warn!(vehicle_id = %id, "duplicate vehicle id in snapshot, last record wins");
            }

            let is_selected = selected == Some(id);
            let popup = bus_popup(bus);

            match self.entries.get_mut(id) {
                Some(entry) => {
                    if entry.position != position {
                        engine.move_marker(&entry.marker, position);
                        entry.position = position;
                        report.moved += 1;
                    }
                    if entry.selected != is_selected {
                        engine.restyle_marker(&entry.marker, styles.bus(is_selected));
                        entry.selected = is_selected;
                        report.restyled += 1;
                    }
                    if entry.popup != popup {
                        engine.set_popup(&entry.marker, &popup);
                        entry.popup = popup;
                        report.relabeled += 1;
                    }
                }
                None => {
                    let marker = engine.create_marker(MarkerSpec {
                        position,
                        style: styles.bus(is_selected),
                        popup: &popup,
                        click: Some(id),
                    });
                    self.entries.insert(
                        id.clone(),
                        MarkerEntry {
                            marker,
                            position,
                            selected: is_selected,
                            popup,
                        },
                    );
                    report.created.push(id.clone());
                }
            }
        }

        let stale: Vec<VehicleId> = self
            .entries
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = self.entries.remove(&id) {
                engine.remove_marker(&entry.marker);
                report.removed.push(id);
            }
        }

        if !report.is_noop() || report.skipped > 0 {
            debug!(
                created = report.created.len(),
                removed = report.removed.len(),
                moved = report.moved,
                restyled = report.restyled,
                skipped = report.skipped,
                "reconciled snapshot"
            );
        }
        report
    }

    /// Restyles markers whose selected flag differs from `selected`.
    ///
    /// Returns the number of markers restyled.
    pub fn apply_selection<E>(
        &mut self,
        engine: &mut E,
        selected: Option<&VehicleId>,
        styles: &StyleSheet,
    ) -> usize
    where
        E: MapEngine<Marker = M>,
    {
        let mut restyled = 0;
        for (id, entry) in self.entries.iter_mut() {
            let is_selected = selected == Some(id);
            if entry.selected != is_selected {
                engine.restyle_marker(&entry.marker, styles.bus(is_selected));
                entry.selected = is_selected;
                restyled += 1;
            }
        }
        restyled
    }

    /// Removes every marker from the engine.
    pub fn clear<E>(&mut self, engine: &mut E) -> usize
    where
        E: MapEngine<Marker = M>,
    {
        let removed = self.entries.len();
        for entry in std::mem::take(&mut self.entries).into_values() {
            engine.remove_marker(&entry.marker);
        }
        removed
    }
}
