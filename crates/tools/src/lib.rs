//! Headless replay of recorded tracking sessions.

pub mod replay;
pub mod trace;

pub use replay::*;
pub use trace::*;
