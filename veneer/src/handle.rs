//! Opaque native addresses and the handle wrapper around them.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// An opaque native address: a pointer or descriptor owned by the layer
/// outside this crate's control. Carries no provenance and supports no
/// arithmetic; it exists to be handed back to the native layer verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawAddress(usize);

impl RawAddress {
    /// The null address.
    pub const NULL: Self = Self(0);

    /// Wrap a raw address value.
    #[must_use]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    /// Whether this is the null address.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The raw value, for the generated call-through layer.
    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }
}

impl fmt::Display for RawAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The single operation this crate requires from the native binding layer.
///
/// A binding generator supplies one implementation per wrapped type, calling
/// that type's native destroy entry point. The runtime guarantees `release`
/// is invoked **at most once per address**, so implementations need not be
/// idempotent.
pub trait NativeRelease: Send + Sync {
    /// Release the native resource behind `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Native`](crate::Error::Native) when the native call
    /// reports failure. The runtime logs the error and does not retry.
    fn release(&self, address: RawAddress) -> Result<()>;
}

impl<F> NativeRelease for F
where
    F: Fn(RawAddress) -> Result<()> + Send + Sync,
{
    fn release(&self, address: RawAddress) -> Result<()> {
        self(address)
    }
}

/// A native handle: an opaque address plus validity state.
///
/// `valid` flips false exactly once — when release succeeds or fails, when
/// ownership semantics invalidate the handle locally, or at construction
/// from a null address. A handle is never reused for a different resource.
/// Equality is by address identity only.
pub struct NativeHandle {
    address: RawAddress,
    valid: bool,
    releaser: Arc<dyn NativeRelease>,
}

impl NativeHandle {
    /// Wrap `address`. A null address yields a handle that was never valid.
    #[must_use]
    pub fn new(address: RawAddress, releaser: Arc<dyn NativeRelease>) -> Self {
        Self {
            address,
            valid: !address.is_null(),
            releaser,
        }
    }

    /// Wrap `address`, rejecting null. For owning wrappers constructed from
    /// a native call result, where a null address means the call failed and
    /// there is nothing to own.
    ///
    /// # Errors
    ///
    /// [`Error::NullHandle`](crate::Error::NullHandle) if `address` is null.
    pub fn try_new(address: RawAddress, releaser: Arc<dyn NativeRelease>) -> Result<Self> {
        if address.is_null() {
            return Err(crate::error::Error::NullHandle);
        }
        Ok(Self::new(address, releaser))
    }

    /// The wrapped address. Stays readable after invalidation so diagnostics
    /// can name the resource; it must not be handed back to the native layer
    /// once invalid.
    #[must_use]
    pub const fn address(&self) -> RawAddress {
        self.address
    }

    /// Whether the handle still refers to a live native resource.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Drop validity without touching the native layer. Used for non-owning
    /// teardown and ownership transfer.
    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Release the native resource. At most one native call is ever made
    /// from this side; a second `release` is a no-op.
    ///
    /// The handle is considered relinquished even when the native layer
    /// reports failure — the error comes back for diagnostics, never for a
    /// retry.
    pub(crate) fn release(&mut self) -> Result<()> {
        if !self.valid {
            return Ok(());
        }
        self.valid = false;
        self.releaser.release(self.address)
    }
}

impl PartialEq for NativeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for NativeHandle {}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("address", &self.address)
            .field("valid", &self.valid)
            .finish()
    }
}
