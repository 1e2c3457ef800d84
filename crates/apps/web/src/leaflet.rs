//! Bindings to the subset of Leaflet used by the tracking view.
//!
//! Leaflet is expected as the global `L`.

use js_sys::{Function, Object, Reflect};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = L, js_name = Map)]
    pub type LeafletMap;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    pub fn create_map(container: &str, options: &JsValue) -> Result<LeafletMap, JsValue>;

    #[wasm_bindgen(method, js_name = setView)]
    pub fn set_view(this: &LeafletMap, center: &JsValue, zoom: f64, options: &JsValue);

    #[wasm_bindgen(method, js_name = getCenter)]
    pub fn get_center(this: &LeafletMap) -> LeafletLatLng;

    #[wasm_bindgen(method, js_name = getZoom)]
    pub fn get_zoom(this: &LeafletMap) -> f64;

    #[wasm_bindgen(method, js_name = zoomIn)]
    pub fn zoom_in(this: &LeafletMap);

    #[wasm_bindgen(method, js_name = zoomOut)]
    pub fn zoom_out(this: &LeafletMap);

    #[wasm_bindgen(method, js_name = on)]
    pub fn on(this: &LeafletMap, event: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = off)]
    pub fn off(this: &LeafletMap, event: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = remove)]
    pub fn remove(this: &LeafletMap);

    #[wasm_bindgen(js_namespace = L, js_name = LatLng)]
    pub type LeafletLatLng;

    #[wasm_bindgen(method, getter)]
    pub fn lat(this: &LeafletLatLng) -> f64;

    #[wasm_bindgen(method, getter)]
    pub fn lng(this: &LeafletLatLng) -> f64;

    #[wasm_bindgen(js_namespace = L, js_name = TileLayer)]
    pub type TileLayer;

    #[wasm_bindgen(js_namespace = L, js_name = tileLayer)]
    pub fn tile_layer(url: &str, options: &JsValue) -> TileLayer;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &TileLayer, map: &LeafletMap);

    #[wasm_bindgen(js_namespace = L, js_name = Marker)]
    pub type Marker;

    #[wasm_bindgen(js_namespace = L, js_name = marker)]
    pub fn marker(at: &JsValue, options: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Marker, map: &LeafletMap);

    #[wasm_bindgen(method, js_name = setLatLng)]
    pub fn set_lat_lng(this: &Marker, at: &JsValue);

    #[wasm_bindgen(method, js_name = setIcon)]
    pub fn set_icon(this: &Marker, icon: &DivIcon);

    #[wasm_bindgen(method, js_name = bindPopup)]
    pub fn bind_popup(this: &Marker, html: &str);

    #[wasm_bindgen(method, js_name = setPopupContent)]
    pub fn set_popup_content(this: &Marker, html: &str);

    #[wasm_bindgen(method, js_name = on)]
    pub fn on(this: &Marker, event: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = off)]
    pub fn off(this: &Marker, event: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = remove)]
    pub fn remove(this: &Marker);

    #[wasm_bindgen(js_namespace = L, js_name = DivIcon)]
    pub type DivIcon;

    #[wasm_bindgen(js_namespace = L, js_name = divIcon)]
    pub fn div_icon(options: &JsValue) -> DivIcon;
}

/// `[lat, lng]` as Leaflet accepts it.
pub fn lat_lng(latitude: f64, longitude: f64) -> JsValue {
    let pair = js_sys::Array::new();
    pair.push(&JsValue::from_f64(latitude));
    pair.push(&JsValue::from_f64(longitude));
    pair.into()
}

/// Plain options object from key/value pairs.
pub fn options(entries: &[(&str, JsValue)]) -> JsValue {
    let obj = Object::new();
    for (key, value) in entries {
        // Setting a property on a fresh plain object cannot fail.
        let _ = Reflect::set(&obj, &JsValue::from_str(key), value);
    }
    obj.into()
}

pub fn point(x: i32, y: i32) -> JsValue {
    let pair = js_sys::Array::new();
    pair.push(&JsValue::from(x));
    pair.push(&JsValue::from(y));
    pair.into()
}
