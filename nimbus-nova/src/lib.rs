//! # NIMBUS Nova
//!
//! Client for the OpenStack Compute (Nova) API, limited to extension
//! discovery and the `os-services` extension: list compute service daemons
//! and enable or disable them by `(host, binary)`.
//!
//! Region endpoints come from the memoized location suppliers of
//! `nimbus-location`; every request carries a pre-issued token and shares
//! the location module's failure slot, so a 401 from any call stops both
//! further requests and further location lookups.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod api;
mod config;
mod extensions;
mod filter;
mod os_services;

pub use api::NovaApi;
pub use config::NovaConfig;
pub use extensions::Extension;
pub use os_services::OsServicesApi;
