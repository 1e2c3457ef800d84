//! SVG markup for Leaflet div icons.

use tracking::{Glyph, MARKER_CLASS, MarkerStyle, escape_html};

const BUS_PATH: &str = "M4 16c0 .88.39 1.67 1 2.22V20c0 .55.45 1 1 1h1c.55 0 1-.45 1-1v-1h8v1c0 .55.45 1 1 1h1c.55 0 1-.45 1-1v-1.78c.61-.55 1-1.34 1-2.22V6c0-3.5-3.58-4-8-4s-8 .5-8 4v10zm3.5 1c-.83 0-1.5-.67-1.5-1.5S6.67 14 7.5 14s1.5.67 1.5 1.5S8.33 17 7.5 17zm9 0c-.83 0-1.5-.67-1.5-1.5s.67-1.5 1.5-1.5 1.5.67 1.5 1.5-.67 1.5-1.5 1.5zm1.5-6H6V6h12v5z";
const PIN_PATH: &str = "M12 2C8.13 2 5 5.13 5 9c0 5.25 7 13 7 13s7-7.75 7-13c0-3.87-3.13-7-7-7zm0 9.5c-1.38 0-2.5-1.12-2.5-2.5s1.12-2.5 2.5-2.5 2.5 1.12 2.5 2.5-1.12 2.5-2.5 2.5z";

pub fn icon_html(style: &MarkerStyle) -> String {
    let path = match style.glyph {
        Glyph::Bus => BUS_PATH,
        Glyph::Pin => PIN_PATH,
    };
    let halo = if style.highlighted {
        " stroke=\"#FFFFFF\" stroke-width=\"1.5\""
    } else {
        ""
    };
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 24 24\" width=\"{size}\" height=\"{size}\"><path fill=\"{color}\"{halo} d=\"{path}\"/></svg>",
        size = style.size_px,
        color = escape_html(&style.color),
    )
}

/// `className` for the div icon; every marker carries [`MARKER_CLASS`] so
/// background clicks can be told apart from marker clicks.
pub fn icon_class(style: &MarkerStyle) -> String {
    if style.highlighted {
        format!("{MARKER_CLASS} {MARKER_CLASS}--selected")
    } else {
        MARKER_CLASS.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracking::StyleSheet;

    #[test]
    fn bus_icon_carries_color_and_size() {
        let sheet = StyleSheet::default();
        let html = icon_html(sheet.bus(false));
        assert!(html.contains("fill=\"#FF0000\""));
        assert!(html.contains("width=\"24\""));
        assert!(!html.contains("stroke"));
    }

    #[test]
    fn selected_icon_has_halo_and_modifier_class() {
        let sheet = StyleSheet::default();
        let style = sheet.bus(true);
        assert!(icon_html(style).contains("stroke=\"#FFFFFF\""));
        assert_eq!(icon_class(style), "shuttle-marker shuttle-marker--selected");
    }

    #[test]
    fn color_cannot_break_out_of_attribute() {
        let mut style = StyleSheet::default().bus(false).clone();
        style.color = "red\" onload=\"x".to_string();
        assert!(icon_html(&style).contains("fill=\"red&quot; onload=&quot;x\""));
    }
}
