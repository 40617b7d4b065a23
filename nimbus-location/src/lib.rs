//! # NIMBUS Locations
//!
//! Provider, region and zone discovery. Location data changes rarely, so
//! every lookup is memoized for the session interval; authorization failures
//! are propagated immediately so a revoked account is not hammered.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
pub mod fromconfig;
mod module;
mod types;

pub use config::{LocationConfig, RegionConfig, ZoneConfig};
pub use module::{LocationModule, MemoizedLocations, UncachedLocationSuppliers};
pub use types::{Iso3166Codes, Location, LocationScope, UriMap, ZoneIdsByRegion};
