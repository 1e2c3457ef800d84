use foundation::geo::LatLng;
use foundation::ids::VehicleId;

use crate::config::TrackerConfig;
use crate::style::MarkerStyle;

/// Options a map engine is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_control: bool,
    pub attribution_control: bool,
    pub tile_url: String,
    pub attribution: String,
}

impl EngineOptions {
    /// Built-in zoom and attribution controls stay off; the page draws its own.
    pub fn from_config(config: &TrackerConfig, center: LatLng) -> Self {
        Self {
            center,
            zoom: config.default_zoom,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_control: false,
            attribution_control: false,
            tile_url: config.tile_url.clone(),
            attribution: config.attribution.clone(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Motion {
    Jump,
    Animate { duration_ms: u64 },
}

/// Where a click on the map surface landed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Background,
    /// Clicks on a marker are delivered separately with the marker's vehicle.
    Marker,
}

/// Everything needed to create one marker.
#[derive(Debug, Clone, Copy)]
pub struct MarkerSpec<'a> {
    pub position: LatLng,
    pub style: &'a MarkerStyle,
    pub popup: &'a str,
    /// Vehicle reported when the marker is clicked. `None` for non-interactive
    /// markers.
    pub click: Option<&'a VehicleId>,
}

/// A slippy-map renderer.
///
/// One instance is created per mounted view and destroyed exactly once.
/// Marker handles stay valid until passed to [`MapEngine::remove_marker`].
pub trait MapEngine {
    type Marker: Clone + PartialEq + std::fmt::Debug;

    fn create_marker(&mut self, spec: MarkerSpec<'_>) -> Self::Marker;
    fn move_marker(&mut self, marker: &Self::Marker, position: LatLng);
    fn restyle_marker(&mut self, marker: &Self::Marker, style: &MarkerStyle);
    fn set_popup(&mut self, marker: &Self::Marker, popup: &str);
    fn remove_marker(&mut self, marker: &Self::Marker);

    fn center(&self) -> LatLng;
    fn zoom(&self) -> f64;
    fn set_view(&mut self, center: LatLng, zoom: f64, motion: Motion);
    fn zoom_in(&mut self);
    fn zoom_out(&mut self);

    /// Detaches listeners and releases the renderer.
    fn destroy(&mut self);
}
