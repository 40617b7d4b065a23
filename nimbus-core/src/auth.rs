//! Shared authorization failure slot.
//!
//! One slot exists per credential context. Every memoizing cache built for
//! that context, and the request filter that talks to the cloud, hold a clone
//! of the same handle. The first denial observed by any of them is stored and
//! poisons all the others until the owning process calls [`AuthFailureSlot::clear`].

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::AuthorizationError;

/// Cloneable handle to a single "set if absent" cell holding at most one denial.
#[derive(Clone, Debug, Default)]
pub struct AuthFailureSlot {
    inner: Arc<RwLock<Option<AuthorizationError>>>,
}

impl AuthFailureSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored denial, if any.
    pub fn get(&self) -> Option<AuthorizationError> {
        self.inner.read().clone()
    }

    /// Returns true once a denial has been stored.
    pub fn is_poisoned(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Stores `err` unless a denial is already present.
    ///
    /// Returns true when this call stored it.
    pub fn set_if_absent(&self, err: AuthorizationError) -> bool {
        let mut slot = self.inner.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(err);
        true
    }

    /// Empties the slot, returning the previous denial.
    ///
    /// Caches never call this; it is the owner's reset after re-authentication.
    pub fn clear(&self) -> Option<AuthorizationError> {
        self.inner.write().take()
    }

    /// Returns true if both handles refer to the same cell.
    pub fn same_slot(&self, other: &AuthFailureSlot) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
