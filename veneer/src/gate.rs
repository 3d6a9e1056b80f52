//! Safe-thread predicates: may a native release run on this thread, now?

use std::sync::OnceLock;
use std::thread::{self, ThreadId};

/// Predicate answering whether the calling thread may perform native
/// releases at this point in the process lifecycle.
///
/// A `false` answer always means "defer", never "fail". Implementations must
/// not block.
pub trait ThreadGate: Send + Sync {
    /// Whether it is safe to call native release from the current thread.
    fn is_safe_now(&self) -> bool;
}

/// Gate tied to the thread the native runtime was installed on.
///
/// Toolkits with a designated main/UI thread accept releases only from that
/// thread, and only once the runtime is up. The host calls [`install`]
/// exactly once from that thread right after native bring-up; until then
/// every caller is told to defer.
///
/// [`install`]: MainThreadGate::install
#[derive(Debug, Default)]
pub struct MainThreadGate {
    installed: OnceLock<ThreadId>,
}

impl MainThreadGate {
    /// Create an uninstalled gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current thread as the designated safe thread.
    ///
    /// Idempotent; a repeat call from a different thread is ignored with a
    /// diagnostic, since the designated thread never changes for the life of
    /// the process.
    pub fn install(&self) {
        let current = thread::current().id();
        let stored = *self.installed.get_or_init(|| current);
        if stored != current {
            tracing::warn!(
                ?stored,
                ?current,
                "main-thread gate already installed on another thread"
            );
        }
    }

    /// Whether the native runtime has been installed at all.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.get().is_some()
    }
}

impl ThreadGate for MainThreadGate {
    fn is_safe_now(&self) -> bool {
        self.installed
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }
}

/// Gate for hosts without thread affinity: every thread is always safe.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysSafe;

impl ThreadGate for AlwaysSafe {
    fn is_safe_now(&self) -> bool {
        true
    }
}
