//! Authorization-aware memoizing cache for NIMBUS.
//!
//! Wraps a [`nimbus_core::Supplier`] with a single-value TTL cache that
//! never serves or retries past an authorization denial.

mod cache;

pub use cache::{AuthAwareMemoizingCache, CacheConfig, CacheStats, Classifier};
