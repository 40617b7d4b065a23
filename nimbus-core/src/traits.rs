//! Common traits for NIMBUS.
//!
//! These traits define the seams between raw lookups and the caches that
//! memoize them, enabling modularity and testing.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// SUPPLIER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A zero-argument, possibly-failing computation producing a `T`.
///
/// Implementations might:
/// - read static configuration
/// - call a cloud API (region catalog, extension list)
/// - wrap another supplier (memoization)
#[async_trait]
pub trait Supplier<T>: Send + Sync {
    /// Computes (or returns) the value.
    async fn get(&self) -> Result<T>;
}

#[async_trait]
impl<T, S> Supplier<T> for Arc<S>
where
    T: Send + 'static,
    S: Supplier<T> + ?Sized,
{
    async fn get(&self) -> Result<T> {
        (**self).get().await
    }
}

/// Supplier backed by an async closure. Built with [`supplier_fn`].
pub struct FnSupplier<F> {
    f: F,
}

/// Wraps a closure returning a future into a [`Supplier`].
///
/// ```rust
/// use nimbus_core::{supplier_fn, Supplier};
///
/// let regions = supplier_fn(|| async { Ok(vec!["RegionOne".to_string()]) });
/// # let _ = &regions;
/// ```
pub fn supplier_fn<T, F, Fut>(f: F) -> FnSupplier<F>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    FnSupplier { f }
}

#[async_trait]
impl<T, F, Fut> Supplier<T> for FnSupplier<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
{
    async fn get(&self) -> Result<T> {
        (self.f)().await
    }
}

/// Supplier that always returns a clone of a fixed value.
#[derive(Clone, Debug)]
pub struct ConstantSupplier<T> {
    value: T,
}

impl<T> ConstantSupplier<T> {
    /// Creates a supplier returning `value` on every call.
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

#[async_trait]
impl<T> Supplier<T> for ConstantSupplier<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self) -> Result<T> {
        Ok(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NimbusError;

    #[tokio::test]
    async fn test_fn_supplier() {
        let supplier = supplier_fn(|| async { Ok::<_, NimbusError>(42u32) });
        assert_eq!(supplier.get().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_fn_supplier_error() {
        let supplier = supplier_fn(|| async { Err::<u32, _>(NimbusError::denied("expired")) });
        assert!(supplier.get().await.unwrap_err().is_authorization_failure());
    }

    #[tokio::test]
    async fn test_fn_supplier_infers_error_type() {
        let supplier = supplier_fn(|| async { Ok(vec!["RegionOne".to_string()]) });
        assert_eq!(supplier.get().await.unwrap(), vec!["RegionOne"]);
    }

    #[tokio::test]
    async fn test_arc_dyn_supplier() {
        let supplier: Arc<dyn Supplier<String>> = Arc::new(ConstantSupplier::new("nova".to_string()));
        assert_eq!(supplier.get().await.unwrap(), "nova");
    }
}
