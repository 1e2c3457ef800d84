//! Bus position records as sent by the feed.
//!
//! Numeric fields may arrive as JSON numbers or numeric strings. Decoding never
//! interprets them; callers ask for a parsed value and get `None` for anything
//! non-numeric.

use foundation::geo::{LatLng, parse_degrees};
use foundation::ids::VehicleId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::FeedError;

/// A numeric field that may have been sent as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Number(f64),
    Text(String),
}

impl NumberLike {
    /// The finite numeric value, if there is one.
    pub fn value(&self) -> Option<f64> {
        match self {
            NumberLike::Number(v) => v.is_finite().then_some(*v),
            NumberLike::Text(s) => parse_degrees(s),
        }
    }
}

impl From<f64> for NumberLike {
    fn from(v: f64) -> Self {
        NumberLike::Number(v)
    }
}

impl From<&str> for NumberLike {
    fn from(s: &str) -> Self {
        NumberLike::Text(s.to_string())
    }
}

impl std::fmt::Display for NumberLike {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberLike::Number(v) => write!(f, "{v}"),
            NumberLike::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// One vehicle's last known telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusPosition {
    #[serde(
        rename = "vehicleId",
        alias = "vehicleID",
        alias = "id",
        deserialize_with = "lenient_vehicle_id"
    )]
    pub vehicle_id: VehicleId,
    #[serde(alias = "lat")]
    pub latitude: NumberLike,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: NumberLike,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<NumberLike>,
    /// Precomputed distance from the user in kilometers.
    #[serde(
        default,
        rename = "distance",
        alias = "distanceFromUser",
        skip_serializing_if = "Option::is_none"
    )]
    pub distance: Option<NumberLike>,
}

impl BusPosition {
    pub fn new(
        vehicle_id: impl Into<VehicleId>,
        latitude: impl Into<NumberLike>,
        longitude: impl Into<NumberLike>,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
            speed: None,
            distance: None,
        }
    }

    pub fn with_speed(mut self, speed: impl Into<NumberLike>) -> Self {
        self.speed = Some(speed.into());
        self
    }

    pub fn with_distance(mut self, distance: impl Into<NumberLike>) -> Self {
        self.distance = Some(distance.into());
        self
    }

    /// Parsed position; `None` when either coordinate is not a finite number.
    pub fn location(&self) -> Option<LatLng> {
        LatLng::finite(self.latitude.value()?, self.longitude.value()?)
    }

    /// Speed in km/h. Negative readings are treated as missing.
    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed.as_ref()?.value().filter(|v| *v >= 0.0)
    }

    pub fn distance_from_user_km(&self) -> Option<f64> {
        self.distance.as_ref()?.value().filter(|v| *v >= 0.0)
    }

    /// Distance to `user` in kilometers, preferring the feed's own figure.
    pub fn distance_to_km(&self, user: &LatLng) -> Option<f64> {
        self.distance_from_user_km()
            .or_else(|| self.location().map(|loc| loc.distance_km(user)))
    }

    /// Speed as displayed to the user, verbatim from the feed.
    pub fn speed_label(&self) -> String {
        match &self.speed {
            Some(speed) => speed.to_string(),
            None => "n/a".to_string(),
        }
    }
}

fn lenient_vehicle_id<'de, D>(deserializer: D) -> Result<VehicleId, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(VehicleId::new(s)),
        Value::Number(n) => Ok(VehicleId::new(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "vehicle id must be a string or number, got {other}"
        ))),
    }
}

/// Decodes one feed snapshot.
///
/// The payload must be a JSON array. Records that cannot be decoded at all
/// (missing identifier, wrong shape) are dropped individually; records whose
/// coordinates are merely non-numeric are kept and filtered downstream.
pub fn decode_snapshot(text: &str) -> Result<Vec<BusPosition>, FeedError> {
    let Value::Array(items) = serde_json::from_str::<Value>(text)? else {
        return Err(FeedError::NotAnArray);
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<BusPosition>(item) {
            Ok(position) => out.push(position),
            Err(err) => tracing::debug!(index, error = %err, "dropping undecodable bus record"),
        }
    }
    Ok(out)
}

/// Collapses a failed poll into an empty snapshot.
///
/// A feed outage renders as "no buses" and polling simply continues.
pub fn snapshot_or_empty(result: Result<Vec<BusPosition>, FeedError>) -> Vec<BusPosition> {
    match result {
        Ok(positions) => positions,
        Err(err) => {
            tracing::warn!(error = %err, "position feed unavailable, showing no buses");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_string_and_number_coordinates() {
        let text = r#"[
            {"vehicleId": "B1", "latitude": "22.35", "longitude": "91.78", "speed": "20"},
            {"vehicleId": "B2", "latitude": 22.4, "longitude": 91.8, "speed": 0}
        ]"#;
        let snapshot = decode_snapshot(text).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].location(), Some(LatLng::new(22.35, 91.78)));
        assert_eq!(snapshot[0].speed_kmh(), Some(20.0));
        assert_eq!(snapshot[1].location(), Some(LatLng::new(22.4, 91.8)));
    }

    #[test]
    fn accepts_alternate_field_names() {
        let text = r#"[
            {"vehicleID": "A", "lat": 1.0, "lng": 2.0, "distance": "0.8"},
            {"id": 42, "lat": "3", "lon": "4", "distanceFromUser": 1.5}
        ]"#;
        let snapshot = decode_snapshot(text).unwrap();
        assert_eq!(snapshot[0].vehicle_id, VehicleId::from("A"));
        assert_eq!(snapshot[0].distance_from_user_km(), Some(0.8));
        assert_eq!(snapshot[1].vehicle_id, VehicleId::from("42"));
        assert_eq!(snapshot[1].location(), Some(LatLng::new(3.0, 4.0)));
        assert_eq!(snapshot[1].distance_from_user_km(), Some(1.5));
    }

    #[test]
    fn non_numeric_coordinates_decode_but_have_no_location() {
        let text = r#"[{"vehicleId": "B1", "latitude": "abc", "longitude": "91.78"}]"#;
        let snapshot = decode_snapshot(text).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].location(), None);
    }

    #[test]
    fn undecodable_records_are_dropped_individually() {
        let text = r#"[
            {"latitude": 1.0, "longitude": 2.0},
            {"vehicleId": "B1", "latitude": null, "longitude": 2.0},
            {"vehicleId": "B2", "latitude": 1.0, "longitude": 2.0}
        ]"#;
        let snapshot = decode_snapshot(text).unwrap();
        let ids: Vec<_> = snapshot.iter().map(|b| b.vehicle_id.as_str()).collect();
        assert_eq!(ids, vec!["B2"]);
    }

    #[test]
    fn non_array_payload_is_an_error() {
        assert!(matches!(
            decode_snapshot(r#"{"error": "nope"}"#),
            Err(FeedError::NotAnArray)
        ));
        assert!(matches!(decode_snapshot("not json"), Err(FeedError::Decode(_))));
    }

    #[test]
    fn failed_poll_degrades_to_empty_snapshot() {
        assert!(snapshot_or_empty(Err(FeedError::Status(503))).is_empty());
        let ok = vec![BusPosition::new("B1", 1.0, 2.0)];
        assert_eq!(snapshot_or_empty(Ok(ok.clone())), ok);
    }

    #[test]
    fn negative_speed_is_missing_but_label_is_verbatim() {
        let bus = BusPosition::new("B1", 1.0, 2.0).with_speed("-3");
        assert_eq!(bus.speed_kmh(), None);
        assert_eq!(bus.speed_label(), "-3");
        assert_eq!(BusPosition::new("B2", 1.0, 2.0).speed_label(), "n/a");
    }

    #[test]
    fn distance_prefers_feed_value() {
        let user = LatLng::new(0.0, 0.0);
        let with_feed = BusPosition::new("B1", 1.0, 0.0).with_distance(0.5);
        assert_eq!(with_feed.distance_to_km(&user), Some(0.5));

        let computed = BusPosition::new("B2", 1.0, 0.0).distance_to_km(&user).unwrap();
        assert!((computed - 111.195).abs() < 0.01, "got {computed}");

        let broken = BusPosition::new("B3", "x", 0.0);
        assert_eq!(broken.distance_to_km(&user), None);
    }
}
