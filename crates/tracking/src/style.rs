//! Marker appearance.
//!
//! Styles are plain descriptors resolved once per mount. Engines turn them into
//! whatever their renderer needs (an SVG div icon for Leaflet).

use feed::BusPosition;

use crate::config::Palette;

/// CSS class carried by every marker element.
pub const MARKER_CLASS: &str = "shuttle-marker";

pub const USER_POPUP: &str = "Your Location";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Bus,
    UserLocation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Glyph {
    Bus,
    Pin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    pub kind: MarkerKind,
    pub glyph: Glyph,
    pub color: String,
    pub size_px: u32,
    /// Selected buses get a white halo.
    pub highlighted: bool,
}

impl MarkerStyle {
    /// Icon anchor: bottom center, so the glyph's tip sits on the position.
    pub fn anchor_px(&self) -> (u32, u32) {
        (self.size_px / 2, self.size_px)
    }

    pub fn popup_anchor_px(&self) -> (i32, i32) {
        (0, -(self.size_px as i32))
    }
}

/// The three marker looks used by a tracking view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    bus: MarkerStyle,
    bus_selected: MarkerStyle,
    user: MarkerStyle,
}

impl StyleSheet {
    pub fn from_palette(palette: &Palette) -> Self {
        Self {
            bus: MarkerStyle {
                kind: MarkerKind::Bus,
                glyph: Glyph::Bus,
                color: palette.bus_color.clone(),
                size_px: palette.marker_size_px,
                highlighted: false,
            },
            bus_selected: MarkerStyle {
                kind: MarkerKind::Bus,
                glyph: Glyph::Bus,
                color: palette.selected_color.clone(),
                size_px: palette.selected_size_px,
                highlighted: true,
            },
            user: MarkerStyle {
                kind: MarkerKind::UserLocation,
                glyph: Glyph::Pin,
                color: palette.user_color.clone(),
                size_px: palette.marker_size_px,
                highlighted: false,
            },
        }
    }

    pub fn bus(&self, selected: bool) -> &MarkerStyle {
        if selected { &self.bus_selected } else { &self.bus }
    }

    pub fn user(&self) -> &MarkerStyle {
        &self.user
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self::from_palette(&Palette::default())
    }
}

/// Popup HTML for a bus. Feed-supplied text is escaped.
pub fn bus_popup(bus: &BusPosition) -> String {
    format!(
        "Bus ID: {}<br>Speed: {} km/h",
        escape_html(bus.vehicle_id.as_str()),
        escape_html(&bus.speed_label())
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
