//! Host wiring: the injected disposal context shared by every resource.

use std::fmt;
use std::sync::Arc;

use crate::gate::ThreadGate;
use crate::queue::DisposeQueue;

/// What the reclaimer path ([`NativeResource::finalize`]) does with an
/// owning resource.
///
/// [`NativeResource::finalize`]: crate::NativeResource::finalize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalizePolicy {
    /// Defer to the queue even when the gate currently reports safe. The
    /// reclaiming thread's identity is not controlled by the application,
    /// so its word is not trusted for native calls.
    #[default]
    AlwaysDefer,
    /// Treat finalization exactly like an explicit dispose: release when
    /// the gate permits, defer otherwise.
    ReleaseWhenSafe,
}

/// Process-scoped disposal context injected into every [`NativeResource`].
///
/// The host constructs one `Disposer` at startup, calls
/// [`initialize`](Disposer::initialize) from the designated safe thread once
/// the native runtime is up, and [`drain`](Disposer::drain)s it from that
/// thread at points where native releases are known safe — typically once
/// per main-loop iteration. Resources receive the `Disposer` at
/// construction; there is no ambient global to reach for, which keeps the
/// protocol testable in isolation.
///
/// [`NativeResource`]: crate::NativeResource
pub struct Disposer {
    gate: Arc<dyn ThreadGate>,
    queue: Arc<DisposeQueue>,
    policy: FinalizePolicy,
}

impl Disposer {
    /// Create a disposer with the default [`FinalizePolicy::AlwaysDefer`].
    #[must_use]
    pub fn new(gate: Arc<dyn ThreadGate>) -> Arc<Self> {
        Self::with_policy(gate, FinalizePolicy::default())
    }

    /// Create a disposer with an explicit finalize policy.
    #[must_use]
    pub fn with_policy(gate: Arc<dyn ThreadGate>, policy: FinalizePolicy) -> Arc<Self> {
        Arc::new(Self {
            gate,
            queue: Arc::new(DisposeQueue::new()),
            policy,
        })
    }

    /// The safe-thread predicate.
    #[must_use]
    pub fn gate(&self) -> &dyn ThreadGate {
        self.gate.as_ref()
    }

    /// The deferred-disposal queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<DisposeQueue> {
        &self.queue
    }

    /// The reclaimer-path policy.
    #[must_use]
    pub fn policy(&self) -> FinalizePolicy {
        self.policy
    }

    /// Register the safe execution context. Call once, early, from the
    /// designated safe thread. Idempotent.
    pub fn initialize(&self) {
        self.queue.initialize();
    }

    /// Run pending deferred releases. Returns the number processed.
    ///
    /// Main-loop integration point; call from the same thread that
    /// [`initialize`](Disposer::initialize)d.
    pub fn drain(&self) -> usize {
        let count = self.queue.drain();
        if count > 0 {
            tracing::debug!(count, "drained deferred native releases");
        }
        count
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("queue", &self.queue)
            .field("policy", &self.policy)
            .finish()
    }
}
