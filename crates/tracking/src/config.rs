use feed::FeedConfig;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// Longest delay a browser timer honours; larger values fire immediately.
pub const MAX_TIMER_MS: u32 = i32::MAX as u32;

/// Marker colors and sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Palette {
    pub bus_color: String,
    pub selected_color: String,
    pub user_color: String,
    pub marker_size_px: u32,
    pub selected_size_px: u32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            bus_color: "#FF0000".to_string(),
            selected_color: "#00FF00".to_string(),
            user_color: "#0000FF".to_string(),
            marker_size_px: 24,
            selected_size_px: 36,
        }
    }
}

/// Tunables for a mounted tracking view.
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    pub feed_interval_ms: u64,
    pub location_interval_ms: u64,
    pub follow_interval_ms: u64,

    pub default_zoom: f64,
    pub locate_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,

    /// Follow mode pans only when the viewport center has drifted further
    /// than this from the followed bus.
    pub follow_drift_threshold_m: f64,
    pub pan_duration_ms: u64,

    pub init_retry_delay_ms: u64,
    pub init_max_attempts: u32,

    pub tile_url: String,
    pub attribution: String,
    pub palette: Palette,
    pub feed: FeedConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            feed_interval_ms: 5_000,
            location_interval_ms: 5_000,
            follow_interval_ms: 1_000,
            default_zoom: 13.0,
            locate_zoom: 15.0,
            min_zoom: 1.0,
            max_zoom: 19.0,
            follow_drift_threshold_m: 5.0,
            pan_duration_ms: 1_000,
            init_retry_delay_ms: 100,
            init_max_attempts: 20,
            tile_url: OSM_TILE_URL.to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
            palette: Palette::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json(text: &str) -> Result<Self, TrackerError> {
        let config: TrackerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        let invalid = |msg: String| Err(TrackerError::InvalidConfig(msg));

        for (name, value) in [
            ("feedIntervalMs", self.feed_interval_ms),
            ("locationIntervalMs", self.location_interval_ms),
            ("followIntervalMs", self.follow_interval_ms),
        ] {
            if value == 0 || value > u64::from(MAX_TIMER_MS) {
                return invalid(format!("{name} must be in 1..={MAX_TIMER_MS}"));
            }
        }
        if self.init_retry_delay_ms > u64::from(MAX_TIMER_MS) {
            return invalid(format!("initRetryDelayMs must be <= {MAX_TIMER_MS}"));
        }

        let zooms = [self.min_zoom, self.default_zoom, self.locate_zoom, self.max_zoom];
        if zooms.iter().any(|z| !z.is_finite()) {
            return invalid("zoom levels must be finite".to_string());
        }
        if self.min_zoom > self.max_zoom {
            return invalid(format!(
                "minZoom {} exceeds maxZoom {}",
                self.min_zoom, self.max_zoom
            ));
        }
        for (name, z) in [("defaultZoom", self.default_zoom), ("locateZoom", self.locate_zoom)] {
            if z < self.min_zoom || z > self.max_zoom {
                return invalid(format!(
                    "{name} {z} outside [{}, {}]",
                    self.min_zoom, self.max_zoom
                ));
            }
        }

        if !self.follow_drift_threshold_m.is_finite() || self.follow_drift_threshold_m < 0.0 {
            return invalid("followDriftThresholdM must be finite and >= 0".to_string());
        }
        if self.init_max_attempts == 0 {
            return invalid("initMaxAttempts must be >= 1".to_string());
        }
        if self.palette.marker_size_px == 0 || self.palette.selected_size_px == 0 {
            return invalid("marker sizes must be > 0".to_string());
        }
        Ok(())
    }

    pub fn init_retry(&self) -> InitRetry {
        InitRetry {
            delay_ms: self.init_retry_delay_ms,
            max_attempts: self.init_max_attempts,
        }
    }
}

/// Retry policy for creating the engine while its container is not attached.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InitRetry {
    pub delay_ms: u64,
    pub max_attempts: u32,
}

impl InitRetry {
    /// Delay before the next attempt, given how many attempts have failed so
    /// far. `None` once the budget is spent.
    pub fn next_delay(&self, failed_attempts: u32) -> Option<u64> {
        (failed_attempts < self.max_attempts).then_some(self.delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_yields_defaults() {
        let config = TrackerConfig::from_json("{}").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.palette.bus_color, "#FF0000");
        assert_eq!(config.palette.selected_size_px, 36);
        assert_eq!(config.follow_interval_ms, 1_000);
    }

    #[test]
    fn partial_json_overrides_named_fields_only() {
        let config = TrackerConfig::from_json(
            r##"{"followDriftThresholdM": 12.5, "palette": {"busColor": "#123456"}, "feed": {"apiBaseUrl": "https://bus.example"}}"##,
        )
        .unwrap();
        assert_eq!(config.follow_drift_threshold_m, 12.5);
        assert_eq!(config.palette.bus_color, "#123456");
        assert_eq!(config.palette.selected_color, "#00FF00");
        assert_eq!(config.feed.api_base_url, "https://bus.example");
        assert_eq!(config.feed.nearest_path, "/api/user/nearest-bus");
    }

    #[test]
    fn rejects_zero_interval() {
        let err = TrackerConfig::from_json(r#"{"followIntervalMs": 0}"#).unwrap_err();
        assert!(
            matches!(err, TrackerError::InvalidConfig(ref m) if m.contains("followIntervalMs"))
        );
    }

    #[test]
    fn rejects_interval_beyond_timer_range() {
        let err = TrackerConfig::from_json(r#"{"feedIntervalMs": 4294967296}"#).unwrap_err();
        assert!(
            matches!(err, TrackerError::InvalidConfig(ref m) if m.contains("feedIntervalMs"))
        );
        let config = TrackerConfig {
            follow_interval_ms: u64::from(MAX_TIMER_MS),
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_ok());
        let config = TrackerConfig {
            init_retry_delay_ms: u64::from(MAX_TIMER_MS) + 1,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let config = TrackerConfig {
            min_zoom: 18.0,
            max_zoom: 3.0,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_threshold() {
        let config = TrackerConfig {
            follow_drift_threshold_m: -1.0,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(
            TrackerConfig::from_json("{"),
            Err(TrackerError::ConfigDecode(_))
        ));
    }

    #[test]
    fn init_retry_stops_after_budget() {
        let retry = InitRetry {
            delay_ms: 100,
            max_attempts: 3,
        };
        assert_eq!(retry.next_delay(1), Some(100));
        assert_eq!(retry.next_delay(2), Some(100));
        assert_eq!(retry.next_delay(3), None);
    }
}
