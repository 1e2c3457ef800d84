//! Browser entry point: the nearby-bus map as a wasm-bindgen class.
//!
//! ```js
//! const map = new NearbyBusMap("map", "{}", onBusSelect, setFollowing);
//! map.zoom_in();
//! map.select_bus("B7");
//! map.destroy();
//! ```
//!
//! All inputs (timer ticks, fetch results, geolocation, Leaflet events, and
//! calls from JavaScript) go through one queue and are applied one at a time,
//! so a JS callback that calls back into the map never re-enters it.

use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use feed::{BusPosition, FeedError, NearbyQuery, decode_snapshot, snapshot_or_empty};
use foundation::geo::LatLng;
use foundation::ids::VehicleId;
use gloo_net::http::Request;
use gloo_timers::callback::{Interval, Timeout};
use js_sys::Function;
use runtime::{Liveness, Pump, Reactor, Subscriptions};
use serde::Serialize;
use tracking::{MAX_TIMER_MS, MapHost, SelectionObserver, TrackerConfig, TrackerError};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod console;
mod engine;
mod icon;
mod leaflet;

use engine::{EventSink, LeafletEngine, MapEvent};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static PANIC_HOOK_SET: OnceLock<()> = OnceLock::new();

const FEED_TIMER: &str = "feed-poll";
const LOCATION_TIMER: &str = "location-poll";
const FOLLOW_TIMER: &str = "follow";
const INIT_RETRY: &str = "init-retry";

fn init_panic_hook() {
    PANIC_HOOK_SET.get_or_init(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = info.to_string();
            web_sys::console::error_1(&JsValue::from_str(&msg));
        }));
    });
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    init_panic_hook();
    Ok(())
}

/// Everything that can happen to the view.
#[derive(Debug)]
enum Input {
    Start,
    Map(MapEvent),
    Location(LatLng),
    Snapshot(Vec<BusPosition>),
    PollFeed,
    PollLocation,
    FollowTick,
    TryMount,
    ZoomIn,
    ZoomOut,
    Locate,
    Select(Option<VehicleId>),
    Destroy,
}

#[derive(Clone)]
struct JsObserver {
    on_bus_select: Function,
    set_following: Function,
    /// Readable by `is_following` while an input is being applied.
    following: Rc<Cell<bool>>,
}

impl SelectionObserver for JsObserver {
    fn on_bus_select(&mut self, vehicle: Option<&VehicleId>) {
        let arg = vehicle.map_or(JsValue::NULL, |id| JsValue::from_str(id.as_str()));
        if let Err(err) = self.on_bus_select.call1(&JsValue::NULL, &arg) {
            tracing::warn!(error = ?err, "onBusSelect threw");
        }
    }

    fn set_following(&mut self, following: bool) {
        self.following.set(following);
        if let Err(err) = self
            .set_following
            .call1(&JsValue::NULL, &JsValue::from_bool(following))
        {
            tracing::warn!(error = ?err, "setFollowing threw");
        }
    }
}

struct App {
    container_id: String,
    config: TrackerConfig,
    host: Option<MapHost<LeafletEngine>>,
    observer: JsObserver,
    geo: Option<GeoCallbacks>,
    user: Option<LatLng>,
    init_attempts: u32,
    subscriptions: Subscriptions,
    liveness: Liveness,
    destroyed: bool,
}

type Shared = Pump<App>;

fn dispatch_weak(weak: &Weak<Shared>, input: Input) {
    Pump::dispatch_weak(weak, input);
}

impl Reactor for App {
    type Input = Input;

    fn handle(&mut self, input: Input, shared: &Rc<Shared>) {
        self.apply(input, shared);
    }

    fn is_closed(&self) -> bool {
        self.destroyed
    }
}

/// Browser timers take `u32` milliseconds; config validation keeps intervals
/// within [`MAX_TIMER_MS`].
fn timer_ms(ms: u64) -> u32 {
    u32::try_from(ms).map_or(MAX_TIMER_MS, |ms| ms.min(MAX_TIMER_MS))
}

impl App {
    fn apply(&mut self, input: Input, shared: &Rc<Shared>) {
        match input {
            Input::Start => self.start(shared),
            Input::Destroy => {
                self.teardown();
                return;
            }
            Input::Location(location) => self.on_location(location, shared),
            Input::Snapshot(snapshot) => {
                if let Some(host) = self.host.as_mut() {
                    host.apply_snapshot(snapshot);
                }
            }
            Input::PollFeed => self.poll_feed(shared),
            Input::PollLocation => self.poll_location(),
            Input::TryMount => self.try_mount(shared),
            Input::FollowTick => {
                if let Some(host) = self.host.as_mut() {
                    host.follow_tick();
                }
            }
            Input::Map(event) => {
                if let Some(host) = self.host.as_mut() {
                    match event {
                        MapEvent::MarkerClick(id) => {
                            host.on_marker_click(&id);
                        }
                        MapEvent::MapClick(target) => {
                            host.on_map_click(target);
                        }
                        MapEvent::Interaction(active) => host.set_user_interaction(active),
                    }
                }
            }
            Input::ZoomIn => self.with_host(|h| h.zoom_in()),
            Input::ZoomOut => self.with_host(|h| h.zoom_out()),
            Input::Locate => self.with_host(|h| {
                h.locate();
            }),
            Input::Select(id) => self.with_host(|h| {
                h.select_bus(id);
            }),
        }
        self.sync_follow_timer(shared);
    }

    fn with_host(&mut self, f: impl FnOnce(&mut MapHost<LeafletEngine>)) {
        match self.host.as_mut() {
            Some(host) => f(host),
            None => tracing::debug!("map not mounted yet, ignoring control"),
        }
    }

    fn start(&mut self, shared: &Rc<Shared>) {
        self.geo = Some(geo_callbacks(Rc::downgrade(shared)));
        let weak = Rc::downgrade(shared);
        let poll = Interval::new(timer_ms(self.config.location_interval_ms), move || {
            dispatch_weak(&weak, Input::PollLocation)
        });
        self.subscriptions.hold(LOCATION_TIMER, poll);
        self.poll_location();
    }

    fn on_location(&mut self, location: LatLng, shared: &Rc<Shared>) {
        let first = self.user.is_none();
        self.user = Some(location);
        match self.host.as_mut() {
            Some(host) => host.update_user_location(location),
            None if first => self.try_mount(shared),
            None => {}
        }
    }

    fn try_mount(&mut self, shared: &Rc<Shared>) {
        if self.host.is_some() {
            return;
        }
        let Some(user) = self.user else {
            return;
        };
        let observer = self.observer.clone();
        let sink = event_sink(Rc::downgrade(shared));
        let container = self.container_id.clone();
        self.init_attempts += 1;
        match MapHost::mount(&self.config, user, Box::new(observer), |options| {
            LeafletEngine::create(&container, options, sink)
        }) {
            Ok(host) => {
                self.host = Some(host);
                self.subscriptions.cancel(INIT_RETRY);
                self.arm_polling(shared);
                dispatch_later(shared, Input::PollFeed);
            }
            Err(err) => self.mount_failed(err, shared),
        }
    }

    fn mount_failed(&mut self, err: TrackerError, shared: &Rc<Shared>) {
        if !err.is_retryable() {
            tracing::error!(error = %err, "map failed to initialize");
            return;
        }
        match self.config.init_retry().next_delay(self.init_attempts) {
            Some(delay_ms) => {
                tracing::debug!(
                    attempt = self.init_attempts,
                    delay_ms,
                    error = %err,
                    "retrying map init"
                );
                let weak = Rc::downgrade(shared);
                let timeout = Timeout::new(timer_ms(delay_ms), move || {
                    dispatch_weak(&weak, Input::TryMount)
                });
                self.subscriptions.hold(INIT_RETRY, timeout);
            }
            None => {
                tracing::error!(attempts = self.init_attempts, "map container never appeared")
            }
        }
    }

    fn arm_polling(&mut self, shared: &Rc<Shared>) {
        let weak = Rc::downgrade(shared);
        let feed = Interval::new(timer_ms(self.config.feed_interval_ms), move || {
            dispatch_weak(&weak, Input::PollFeed)
        });
        self.subscriptions.hold(FEED_TIMER, feed);
    }

    fn sync_follow_timer(&mut self, shared: &Rc<Shared>) {
        let following = self.host.as_ref().is_some_and(|h| h.is_following());
        let armed = self.subscriptions.contains(FOLLOW_TIMER);
        if following && !armed {
            let weak = Rc::downgrade(shared);
            let tick = Interval::new(timer_ms(self.config.follow_interval_ms), move || {
                dispatch_weak(&weak, Input::FollowTick)
            });
            self.subscriptions.hold(FOLLOW_TIMER, tick);
        } else if !following && armed {
            self.subscriptions.cancel(FOLLOW_TIMER);
        }
    }

    fn poll_feed(&mut self, shared: &Rc<Shared>) {
        let Some(user) = self.user else {
            return;
        };
        let url = NearbyQuery::new(user).url(&self.config.feed);
        let token = self.liveness.token();
        let weak = Rc::downgrade(shared);
        spawn_local(async move {
            let snapshot = snapshot_or_empty(fetch_snapshot(&url).await);
            if !token.is_alive() {
                tracing::debug!("dropping feed response after teardown");
                return;
            }
            dispatch_weak(&weak, Input::Snapshot(snapshot));
        });
    }

    fn poll_location(&self) {
        let geolocation = web_sys::window().and_then(|w| w.navigator().geolocation().ok());
        let Some(geolocation) = geolocation else {
            tracing::warn!("geolocation is not supported by this browser");
            return;
        };
        let Some(callbacks) = self.geo.as_ref() else {
            return;
        };
        if let Err(err) = geolocation
            .get_current_position_with_error_callback(&callbacks.success, Some(&callbacks.failure))
        {
            tracing::warn!(error = ?err, "geolocation request failed");
        }
    }

    fn teardown(&mut self) {
        self.destroyed = true;
        self.liveness.kill();
        self.subscriptions.dispose();
        if let Some(mut host) = self.host.take() {
            host.unmount();
        }
        self.observer.following.set(false);
        self.geo = None;
        tracing::debug!("nearby-bus map destroyed");
    }
}

/// Geolocation callbacks shared by every request.
///
/// The closures are handed over to JS, so a request still pending at teardown
/// resolves into a live callback; the `Weak` inside makes it a no-op.
struct GeoCallbacks {
    success: Function,
    failure: Function,
}

fn geo_callbacks(weak: Weak<Shared>) -> GeoCallbacks {
    let success = Closure::<dyn FnMut(web_sys::Position)>::new(
        move |pos: web_sys::Position| {
            let coords = pos.coords();
            match LatLng::finite(coords.latitude(), coords.longitude()) {
                Some(location) => dispatch_weak(&weak, Input::Location(location)),
                None => tracing::warn!("geolocation returned non-finite coordinates"),
            }
        },
    );
    let failure = Closure::<dyn FnMut(web_sys::PositionError)>::new(
        |err: web_sys::PositionError| {
            tracing::warn!(
                code = err.code(),
                message = %err.message(),
                "unable to retrieve location"
            );
        },
    );
    GeoCallbacks {
        success: success.into_js_value().unchecked_into(),
        failure: failure.into_js_value().unchecked_into(),
    }
}

fn event_sink(weak: Weak<Shared>) -> EventSink {
    Rc::new(move |event| dispatch_weak(&weak, Input::Map(event)))
}

/// Queues `input` on the next event-loop turn.
fn dispatch_later(shared: &Rc<Shared>, input: Input) {
    let weak = Rc::downgrade(shared);
    Timeout::new(0, move || dispatch_weak(&weak, input)).forget();
}

async fn fetch_snapshot(url: &str) -> Result<Vec<BusPosition>, FeedError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| FeedError::Transport(e.to_string()))?;
    if !resp.ok() {
        return Err(FeedError::Status(resp.status()));
    }
    let text = resp
        .text()
        .await
        .map_err(|e| FeedError::Transport(e.to_string()))?;
    decode_snapshot(&text)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbyBus {
    vehicle_id: String,
    distance_km: Option<f64>,
}

/// The nearby-bus map mounted into one container element.
#[wasm_bindgen]
pub struct NearbyBusMap {
    shared: Rc<Shared>,
    following: Rc<Cell<bool>>,
}

#[wasm_bindgen]
impl NearbyBusMap {
    /// `config_json` may be empty for defaults. The map mounts once the first
    /// location arrives, either from the browser or from `set_user_location`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container_id: &str,
        config_json: &str,
        on_bus_select: Function,
        set_following: Function,
    ) -> Result<NearbyBusMap, JsValue> {
        init_panic_hook();
        let config = if config_json.trim().is_empty() {
            TrackerConfig::default()
        } else {
            TrackerConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        console::install(&config_log_level(config_json));

        let following = Rc::new(Cell::new(false));
        let shared = Pump::new(App {
            container_id: container_id.to_string(),
            config,
            host: None,
            observer: JsObserver {
                on_bus_select,
                set_following,
                following: Rc::clone(&following),
            },
            geo: None,
            user: None,
            init_attempts: 0,
            subscriptions: Subscriptions::new(),
            liveness: Liveness::new(),
            destroyed: false,
        });
        shared.dispatch(Input::Start);

        Ok(NearbyBusMap { shared, following })
    }

    /// Supplies the user location directly, for pages that own geolocation.
    pub fn set_user_location(&self, latitude: f64, longitude: f64) -> Result<(), JsValue> {
        let location = LatLng::finite(latitude, longitude)
            .ok_or_else(|| JsValue::from_str("set_user_location args must be finite"))?;
        self.shared.dispatch(Input::Location(location));
        Ok(())
    }

    /// Replaces the current bus snapshot with a JSON array of positions.
    pub fn push_snapshot(&self, json: &str) -> Result<(), JsValue> {
        let snapshot = decode_snapshot(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.shared.dispatch(Input::Snapshot(snapshot));
        Ok(())
    }

    pub fn zoom_in(&self) {
        self.shared.dispatch(Input::ZoomIn);
    }

    pub fn zoom_out(&self) {
        self.shared.dispatch(Input::ZoomOut);
    }

    pub fn locate(&self) {
        self.shared.dispatch(Input::Locate);
    }

    /// Selects a bus by id, or clears the selection when `id` is null.
    pub fn select_bus(&self, id: Option<String>) {
        self.shared.dispatch(Input::Select(id.map(VehicleId::new)));
    }

    pub fn is_following(&self) -> bool {
        self.following.get()
    }

    /// Buses from the last snapshot, nearest first, as JSON.
    pub fn nearby_buses(&self) -> Result<String, JsValue> {
        let app = self
            .shared
            .try_state()
            .ok_or_else(|| JsValue::from_str("map is busy"))?;
        let buses: Vec<NearbyBus> = app
            .host
            .as_ref()
            .map(|h| h.buses_by_distance())
            .unwrap_or_default()
            .into_iter()
            .map(|(id, distance_km)| NearbyBus {
                vehicle_id: id.to_string(),
                distance_km,
            })
            .collect();
        serde_json::to_string(&buses).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Stops polling, removes all markers, and destroys the Leaflet map.
    ///
    /// Called from inside `onBusSelect` or `setFollowing`, the teardown runs
    /// as soon as the current input has been applied. Pending inputs are
    /// dropped.
    pub fn destroy(&self) {
        self.shared.clear_pending();
        self.shared.dispatch(Input::Destroy);
    }
}

impl Drop for NearbyBusMap {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Optional `"logLevel"` key alongside the tracker settings.
fn config_log_level(config_json: &str) -> String {
    serde_json::from_str::<serde_json::Value>(config_json)
        .ok()
        .and_then(|v| v.get("logLevel").and_then(|l| l.as_str()).map(str::to_string))
        .unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
mod tests {
    use super::{MAX_TIMER_MS, config_log_level, timer_ms};

    #[test]
    fn log_level_defaults_to_info() {
        assert_eq!(config_log_level(""), "info");
        assert_eq!(config_log_level(r#"{"logLevel": "debug"}"#), "debug");
        assert_eq!(config_log_level(r#"{"feedIntervalMs": 1000}"#), "info");
    }

    #[test]
    fn timer_delays_never_wrap() {
        assert_eq!(timer_ms(5_000), 5_000);
        assert_eq!(timer_ms(4_294_967_296), MAX_TIMER_MS);
        assert_eq!(timer_ms(u64::from(MAX_TIMER_MS) + 1), MAX_TIMER_MS);
    }
}
