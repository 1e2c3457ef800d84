use feed::BusPosition;
use foundation::geo::LatLng;
use foundation::ids::VehicleId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracking::TrackerError;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// One recorded input to the tracking view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    Snapshot {
        buses: Vec<BusPosition>,
    },
    Location {
        latitude: f64,
        longitude: f64,
    },
    #[serde(rename_all = "camelCase")]
    Click {
        vehicle_id: VehicleId,
    },
    BackgroundClick,
    Locate,
    #[serde(rename_all = "camelCase")]
    Select {
        #[serde(default)]
        vehicle_id: Option<VehicleId>,
    },
    Drag {
        active: bool,
    },
    ZoomIn,
    ZoomOut,
    /// Lets event-loop time pass so interval timers fire.
    #[serde(rename_all = "camelCase")]
    Advance {
        ms: u64,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Snapshot { .. } => "snapshot",
            Step::Location { .. } => "location",
            Step::Click { .. } => "click",
            Step::BackgroundClick => "backgroundClick",
            Step::Locate => "locate",
            Step::Select { .. } => "select",
            Step::Drag { .. } => "drag",
            Step::ZoomIn => "zoomIn",
            Step::ZoomOut => "zoomOut",
            Step::Advance { .. } => "advance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Location the view mounts at.
    pub user: LatLng,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Trace {
    pub fn from_json(text: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_every_step_kind() {
        let trace = Trace::from_json(
            r#"{
                "user": {"lat": 22.34, "lng": 91.77},
                "steps": [
                    {"step": "snapshot", "buses": [{"vehicleId": "B1", "latitude": "22.35", "longitude": "91.78"}]},
                    {"step": "location", "latitude": 22.341, "longitude": 91.771},
                    {"step": "click", "vehicleId": "B1"},
                    {"step": "backgroundClick"},
                    {"step": "locate"},
                    {"step": "select"},
                    {"step": "select", "vehicleId": "B1"},
                    {"step": "drag", "active": true},
                    {"step": "zoomIn"},
                    {"step": "zoomOut"},
                    {"step": "advance", "ms": 1000}
                ]
            }"#,
        )
        .unwrap();
        let names: Vec<_> = trace.steps.iter().map(Step::name).collect();
        assert_eq!(
            names,
            vec![
                "snapshot",
                "location",
                "click",
                "backgroundClick",
                "locate",
                "select",
                "select",
                "drag",
                "zoomIn",
                "zoomOut",
                "advance"
            ]
        );
        assert_eq!(trace.steps[5], Step::Select { vehicle_id: None });
        assert_eq!(
            trace.steps[1],
            Step::Location {
                latitude: 22.341,
                longitude: 91.771
            }
        );
    }

    #[test]
    fn unknown_step_is_rejected() {
        let err = Trace::from_json(
            r#"{"user": {"lat": 0, "lng": 0}, "steps": [{"step": "teleport"}]}"#,
        );
        assert!(matches!(err, Err(ReplayError::Decode(_))));
    }
}
