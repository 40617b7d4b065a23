//! # NIMBUS Core
//!
//! Core types, errors, and traits shared by every NIMBUS crate:
//!
//! - **Types**: the `os-services` domain model ([`OsService`], [`Status`], [`State`])
//! - **Errors**: [`NimbusError`] and the [`AuthorizationError`] it carries on denial
//! - **Auth**: the [`AuthFailureSlot`] shared between caches and the request filter
//! - **Traits**: the [`Supplier`] abstraction memoized by `nimbus-cache`
//!
//! ## Example
//!
//! ```rust
//! use nimbus_core::{OsService, Status};
//!
//! let service = OsService::builder()
//!     .binary("nova-compute")
//!     .host("compute-1")
//!     .status(Status::Enabled)
//!     .build()
//!     .unwrap();
//! assert_eq!(service.status(), Status::Enabled);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod auth;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use auth::AuthFailureSlot;
pub use constants::*;
pub use error::{AuthorizationError, FailureKind, NimbusError, Result};
pub use traits::*;
pub use types::*;
