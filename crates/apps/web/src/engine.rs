//! [`MapEngine`] backed by Leaflet.
//!
//! Leaflet callbacks never touch tracking state directly. They translate the
//! DOM event into a [`MapEvent`] and hand it to the [`EventSink`], which queues
//! it for the owner of the [`tracking::MapHost`].

use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::geo::LatLng;
use foundation::handles::{Handle, HandleAllocator};
use foundation::ids::VehicleId;
use tracking::{
    ClickTarget, EngineError, EngineOptions, MARKER_CLASS, MapEngine, MarkerSpec, MarkerStyle,
    Motion,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::icon::{icon_class, icon_html};
use crate::leaflet::{self, LeafletMap};

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    MarkerClick(VehicleId),
    MapClick(ClickTarget),
    Interaction(bool),
}

pub type EventSink = Rc<dyn Fn(MapEvent)>;

type Listener = Closure<dyn FnMut(JsValue)>;

struct LiveMarker {
    marker: leaflet::Marker,
    on_click: Option<Listener>,
}

pub struct LeafletEngine {
    map: LeafletMap,
    handles: HandleAllocator,
    markers: BTreeMap<Handle, LiveMarker>,
    map_listeners: Vec<(&'static str, Listener)>,
    sink: EventSink,
    destroyed: bool,
}

impl LeafletEngine {
    /// Creates the Leaflet map inside `container_id`.
    ///
    /// Fails with [`EngineError::ContainerNotReady`] while the element is not
    /// in the document yet.
    pub fn create(
        container_id: &str,
        options: &EngineOptions,
        sink: EventSink,
    ) -> Result<Self, EngineError> {
        let attached = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(container_id))
            .is_some();
        if !attached {
            return Err(EngineError::ContainerNotReady(container_id.to_string()));
        }

        let map_options = leaflet::options(&[
            ("center", leaflet::lat_lng(options.center.latitude, options.center.longitude)),
            ("zoom", JsValue::from_f64(options.zoom)),
            ("minZoom", JsValue::from_f64(options.min_zoom)),
            ("maxZoom", JsValue::from_f64(options.max_zoom)),
            ("zoomControl", JsValue::from_bool(options.zoom_control)),
            ("attributionControl", JsValue::from_bool(options.attribution_control)),
        ]);
        let map = leaflet::create_map(container_id, &map_options)
            .map_err(|e| EngineError::Unavailable(format!("{e:?}")))?;

        leaflet::tile_layer(
            &options.tile_url,
            &leaflet::options(&[("attribution", JsValue::from_str(&options.attribution))]),
        )
        .add_to(&map);

        let mut engine = Self {
            map,
            handles: HandleAllocator::new(),
            markers: BTreeMap::new(),
            map_listeners: Vec::new(),
            sink,
            destroyed: false,
        };
        engine.listen_map();
        Ok(engine)
    }

    fn listen_map(&mut self) {
        let sink = Rc::clone(&self.sink);
        self.add_map_listener("click", move |ev: JsValue| {
            sink(MapEvent::MapClick(click_target(&ev)));
        });
        let sink = Rc::clone(&self.sink);
        self.add_map_listener("dragstart", move |_| sink(MapEvent::Interaction(true)));
        let sink = Rc::clone(&self.sink);
        self.add_map_listener("dragend", move |_| sink(MapEvent::Interaction(false)));
    }

    fn add_map_listener(&mut self, event: &'static str, f: impl FnMut(JsValue) + 'static) {
        let listener = Closure::<dyn FnMut(JsValue)>::new(f);
        self.map.on(event, listener.as_ref().unchecked_ref());
        self.map_listeners.push((event, listener));
    }

    fn icon(style: &MarkerStyle) -> leaflet::DivIcon {
        let (ax, ay) = style.anchor_px();
        let (px, py) = style.popup_anchor_px();
        leaflet::div_icon(&leaflet::options(&[
            ("html", JsValue::from_str(&icon_html(style))),
            ("className", JsValue::from_str(&icon_class(style))),
            ("iconSize", leaflet::point(style.size_px as i32, style.size_px as i32)),
            ("iconAnchor", leaflet::point(ax as i32, ay as i32)),
            ("popupAnchor", leaflet::point(px, py)),
        ]))
    }
}

/// Clicks whose DOM target sits inside a marker element are marker clicks.
fn click_target(ev: &JsValue) -> ClickTarget {
    let on_marker = js_sys::Reflect::get(ev, &JsValue::from_str("originalEvent"))
        .ok()
        .and_then(|original| original.dyn_into::<web_sys::Event>().ok())
        .and_then(|original| original.target())
        .and_then(|target| target.dyn_into::<web_sys::Element>().ok())
        .and_then(|el| el.closest(&format!(".{MARKER_CLASS}")).ok().flatten())
        .is_some();
    if on_marker {
        ClickTarget::Marker
    } else {
        ClickTarget::Background
    }
}

impl MapEngine for LeafletEngine {
    type Marker = Handle;

    fn create_marker(&mut self, spec: MarkerSpec<'_>) -> Handle {
        let marker = leaflet::marker(
            &leaflet::lat_lng(spec.position.latitude, spec.position.longitude),
            &leaflet::options(&[("icon", Self::icon(spec.style).into())]),
        );
        marker.add_to(&self.map);
        marker.bind_popup(spec.popup);

        let on_click = spec.click.map(|id| {
            let id = id.clone();
            let sink = Rc::clone(&self.sink);
            let listener = Closure::<dyn FnMut(JsValue)>::new(move |_ev: JsValue| {
                sink(MapEvent::MarkerClick(id.clone()));
            });
            marker.on("click", listener.as_ref().unchecked_ref());
            listener
        });

        let handle = self.handles.allocate();
        self.markers.insert(handle, LiveMarker { marker, on_click });
        handle
    }

    fn move_marker(&mut self, marker: &Handle, position: LatLng) {
        if let Some(live) = self.markers.get(marker) {
            live.marker
                .set_lat_lng(&leaflet::lat_lng(position.latitude, position.longitude));
        }
    }

    fn restyle_marker(&mut self, marker: &Handle, style: &MarkerStyle) {
        if let Some(live) = self.markers.get(marker) {
            live.marker.set_icon(&Self::icon(style));
        }
    }

    fn set_popup(&mut self, marker: &Handle, popup: &str) {
        if let Some(live) = self.markers.get(marker) {
            live.marker.set_popup_content(popup);
        }
    }

    fn remove_marker(&mut self, marker: &Handle) {
        if let Some(live) = self.markers.remove(marker) {
            if let Some(listener) = &live.on_click {
                live.marker.off("click", listener.as_ref().unchecked_ref());
            }
            live.marker.remove();
        }
    }

    fn center(&self) -> LatLng {
        let c = self.map.get_center();
        LatLng::new(c.lat(), c.lng())
    }

    fn zoom(&self) -> f64 {
        self.map.get_zoom()
    }

    fn set_view(&mut self, center: LatLng, zoom: f64, motion: Motion) {
        let opts = match motion {
            Motion::Jump => leaflet::options(&[("animate", JsValue::FALSE)]),
            Motion::Animate { duration_ms } => leaflet::options(&[
                ("animate", JsValue::TRUE),
                ("duration", JsValue::from_f64(duration_ms as f64 / 1000.0)),
            ]),
        };
        self.map
            .set_view(&leaflet::lat_lng(center.latitude, center.longitude), zoom, &opts);
    }

    fn zoom_in(&mut self) {
        self.map.zoom_in();
    }

    fn zoom_out(&mut self) {
        self.map.zoom_out();
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let handles: Vec<Handle> = self.markers.keys().copied().collect();
        for handle in handles {
            self.remove_marker(&handle);
        }
        for (event, listener) in self.map_listeners.drain(..) {
            self.map.off(event, listener.as_ref().unchecked_ref());
        }
        self.map.remove();
    }
}
