//! Disposable native resources: ownership flag, idempotent release, and
//! the deferral protocol that keeps native teardown on the safe thread.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::disposer::{Disposer, FinalizePolicy};
use crate::error::{Error, Result};
use crate::handle::{NativeHandle, RawAddress};

/// Capability implemented by every native-backed wrapper type.
///
/// Generated wrappers embed a [`NativeResource`] and delegate both methods
/// to it — there is no disposal base-class chain. The
/// [`DisposeQueue`](crate::DisposeQueue) holds entries through this trait.
pub trait Disposable: Send + Sync {
    /// Request release of the underlying native resource.
    ///
    /// Idempotent and infallible from the caller's point of view: repeated
    /// calls are no-ops, and a failed native release is logged, not
    /// surfaced. The actual native call may be deferred to the safe thread.
    fn dispose(&self);

    /// Whether disposal has completed.
    fn is_disposed(&self) -> bool;
}

struct State {
    handle: NativeHandle,
    owns: bool,
    // Set while an entry for this resource sits in the queue, so repeated
    // dispose requests do not pile up duplicate entries.
    pending: bool,
    disposed: bool,
}

/// A native-backed resource: handle + ownership flag + disposal state.
///
/// Constructed only through [`new`](NativeResource::new), which returns an
/// [`Arc`] — the resource must be able to hand a strong reference of itself
/// to the dispose queue. The per-resource mutex makes the
/// disposed-check-and-set atomic, so two racing `dispose()` calls serialize
/// and exactly one performs the real release.
///
/// Invariant: `disposed` implies the handle is no longer valid, and native
/// release ran at most once over the resource's whole lifetime.
pub struct NativeResource {
    state: Mutex<State>,
    disposer: Arc<Disposer>,
    weak_self: Weak<NativeResource>,
}

impl NativeResource {
    /// Wrap `handle`. `owns` marks this wrapper responsible for releasing
    /// the native resource; pass `false` for by-reference views obtained
    /// from accessors.
    #[must_use]
    pub fn new(handle: NativeHandle, owns: bool, disposer: Arc<Disposer>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            state: Mutex::new(State {
                handle,
                owns,
                pending: false,
                disposed: false,
            }),
            disposer,
            weak_self: weak.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Teardown must not fail the caller; recover the state from a
        // poisoned lock instead of panicking.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raw address for the generated call-through layer.
    ///
    /// # Errors
    ///
    /// [`Error::Disposed`] once the resource has been disposed — handing the
    /// address out after that would resurrect a freed native object.
    pub fn address(&self) -> Result<RawAddress> {
        let state = self.lock();
        if state.disposed {
            return Err(Error::Disposed);
        }
        Ok(state.handle.address())
    }

    /// Whether this wrapper is responsible for releasing the handle.
    #[must_use]
    pub fn owns(&self) -> bool {
        self.lock().owns
    }

    /// Whether a deferred release is sitting in the queue.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Transfer ownership of the native handle away from this wrapper.
    ///
    /// The caller becomes responsible for the handle through some other
    /// wrapper; a later `dispose()` only marks this one disposed. Calling
    /// `disown` again on a live resource is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::Disposed`] if the resource was already disposed — there is
    /// nothing left to take ownership of, which indicates a programming
    /// error in the caller.
    pub fn disown(&self) -> Result<()> {
        let mut state = self.lock();
        if state.disposed {
            return Err(Error::Disposed);
        }
        state.owns = false;
        Ok(())
    }

    /// Reclaimer-path disposal. Wrapper types call this from `Drop` in place
    /// of `dispose()`.
    ///
    /// The reclaiming thread's identity is not controlled by the
    /// application, so under the default [`FinalizePolicy::AlwaysDefer`] an
    /// owning resource is queued even when the gate currently reports safe.
    /// [`FinalizePolicy::ReleaseWhenSafe`] behaves exactly like an explicit
    /// `dispose()`.
    pub fn finalize(&self) {
        match self.disposer.policy() {
            FinalizePolicy::ReleaseWhenSafe => self.dispose(),
            FinalizePolicy::AlwaysDefer => {
                let mut state = self.lock();
                if state.disposed || state.pending {
                    return;
                }
                if !state.owns || !state.handle.is_valid() {
                    // No native work to run; finish from any thread.
                    state.handle.invalidate();
                    state.disposed = true;
                    return;
                }
                self.defer(&mut state);
            }
        }
    }

    /// Queue a strong reference of this resource for safe-thread release.
    fn defer(&self, state: &mut State) {
        state.pending = true;
        if let Some(me) = self.weak_self.upgrade() {
            self.disposer.queue().enqueue(me);
        }
    }
}

impl Disposable for NativeResource {
    fn dispose(&self) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        if !state.owns || !state.handle.is_valid() {
            // Non-owning views and dead handles never touch the native
            // layer; they just drop out of the protocol.
            state.handle.invalidate();
            state.disposed = true;
            state.pending = false;
            return;
        }
        if self.disposer.gate().is_safe_now() {
            let address = state.handle.address();
            let result = state.handle.release();
            state.disposed = true;
            state.pending = false;
            drop(state);
            if let Err(err) = result {
                // The handle is relinquished regardless; failures are
                // diagnostic only and never retried.
                tracing::warn!(%address, %err, "native release failed");
            }
        } else if !state.pending {
            self.defer(&mut state);
        }
    }

    fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

impl Drop for NativeResource {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.disposed || !state.owns || !state.handle.is_valid() {
            return;
        }
        // Last strong reference died with the release still outstanding.
        // Queue entries hold strong references, so nothing is pending here;
        // either the wrapper skipped dispose()/finalize() or the host never
        // pumped the queue. Release inline when permitted, otherwise the
        // address is unrecoverable.
        let address = state.handle.address();
        if self.disposer.gate().is_safe_now() {
            if let Err(err) = state.handle.release() {
                tracing::warn!(%address, %err, "native release failed");
            }
            state.disposed = true;
        } else {
            tracing::warn!(%address, "leaking native handle: dropped undisposed off the safe thread");
        }
    }
}

impl fmt::Debug for NativeResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("NativeResource")
            .field("address", &state.handle.address())
            .field("owns", &state.owns)
            .field("pending", &state.pending)
            .field("disposed", &state.disposed)
            .finish()
    }
}
