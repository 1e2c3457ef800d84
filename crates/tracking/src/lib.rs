//! Live bus-position map tracking.
//!
//! [`MapHost`] owns one map engine instance for the lifetime of a mounted view
//! and keeps its markers in step with the position feed. Selection and camera
//! behavior live in [`SelectionController`] and [`CameraController`]; the
//! engine itself is abstracted behind [`MapEngine`] so the same logic drives
//! Leaflet in the browser and [`headless::HeadlessEngine`] in tests and replay.

pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod headless;
pub mod host;
pub mod observer;
pub mod reconciler;
pub mod selection;
pub mod style;

pub use camera::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use host::*;
pub use observer::*;
pub use reconciler::*;
pub use selection::*;
pub use style::*;
