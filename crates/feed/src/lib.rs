//! Position feed wire types.
//!
//! The feed is an external collaborator: it is polled over HTTP and yields one
//! snapshot (a JSON array of bus records) per poll. This crate decodes those
//! snapshots leniently and builds the polling query; it performs no I/O.

pub mod error;
pub mod protocol;
pub mod query;

pub use error::*;
pub use protocol::*;
pub use query::*;
