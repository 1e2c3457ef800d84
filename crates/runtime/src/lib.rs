//! Single-threaded event-loop plumbing for the tracking view.
//!
//! Everything here runs on one thread and is driven by callbacks. Time is an
//! explicit input (`Millis`) so the same code can be replayed headlessly.

pub mod clock;
pub mod event_bus;
pub mod liveness;
pub mod pump;
pub mod scheduler;
pub mod subscriptions;
pub mod timer;

pub use clock::*;
pub use event_bus::*;
pub use liveness::*;
pub use pump::*;
pub use scheduler::*;
pub use subscriptions::*;
pub use timer::*;
