use foundation::geo::LatLng;
use serde::{Deserialize, Serialize};

/// Where the nearest-bus feed lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default = "default_nearest_path")]
    pub nearest_path: String,
}

fn default_nearest_path() -> String {
    "/api/user/nearest-bus".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            nearest_path: default_nearest_path(),
        }
    }
}

/// One poll of the nearest-bus endpoint, parameterized by the user's location.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NearbyQuery {
    pub user: LatLng,
}

impl NearbyQuery {
    pub fn new(user: LatLng) -> Self {
        Self { user }
    }

    pub fn url(&self, config: &FeedConfig) -> String {
        let base = config.api_base_url.trim_end_matches('/');
        let path = config.nearest_path.trim_start_matches('/');
        format!(
            "{base}/{path}?userLat={}&userLon={}",
            self.user.latitude, self.user.longitude
        )
    }
}
