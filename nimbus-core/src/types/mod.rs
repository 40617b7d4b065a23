//! Domain types for NIMBUS.
//!
//! - [`OsService`]: a compute service daemon and its builder
//! - [`Status`] / [`State`]: administrative status and liveness

mod os_service;

pub use os_service::*;
