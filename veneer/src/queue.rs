//! The deferred-disposal queue: releases that could not run on the
//! requesting thread wait here for the safe-thread pump.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::resource::Disposable;

struct Entry {
    // Strong reference: the queue must keep the resource alive until it is
    // drained, or the native address would leak with no way to release it.
    resource: Arc<dyn Disposable>,
    enqueued_at: Instant,
}

struct Inner {
    entries: VecDeque<Entry>,
    initialized: bool,
}

/// Thread-safe pending-release queue.
///
/// Any thread may [`enqueue`]; only the designated safe thread should
/// [`drain`]. The queue is constructed by the host (usually via
/// [`Disposer`](crate::Disposer)) and injected, never reached through
/// ambient globals. [`initialize`] must run once, early, on the safe
/// thread — draining before that is a legal no-op.
///
/// [`enqueue`]: DisposeQueue::enqueue
/// [`drain`]: DisposeQueue::drain
/// [`initialize`]: DisposeQueue::initialize
pub struct DisposeQueue {
    inner: Mutex<Inner>,
}

impl DisposeQueue {
    /// Create an empty, uninitialized queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                initialized: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking dispose elsewhere must not wedge teardown for the
        // whole process.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a resource for later safe-thread release.
    ///
    /// Callable from any thread, before or after [`initialize`].
    ///
    /// [`initialize`]: DisposeQueue::initialize
    pub fn enqueue(&self, resource: Arc<dyn Disposable>) {
        let mut inner = self.lock();
        inner.entries.push_back(Entry {
            resource,
            enqueued_at: Instant::now(),
        });
        tracing::trace!(pending = inner.entries.len(), "release deferred to safe thread");
    }

    /// Mark the queue ready for draining.
    ///
    /// Idempotent. Called once per process, from the designated safe thread,
    /// as part of host main-loop bring-up.
    pub fn initialize(&self) {
        self.lock().initialized = true;
    }

    /// Whether a safe execution context has registered itself.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no releases are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Run pending releases and return how many were processed.
    ///
    /// The entry sequence is swapped out under the lock, then each resource
    /// is disposed outside it, in FIFO order. Native release may be slow or
    /// may reentrantly enqueue another resource; holding the lock across it
    /// would deadlock. Entries enqueued during the drain wait for the next
    /// one. A drain before [`initialize`] returns 0 and leaves the queue
    /// untouched.
    ///
    /// [`initialize`]: DisposeQueue::initialize
    pub fn drain(&self) -> usize {
        let drained = {
            let mut inner = self.lock();
            if !inner.initialized {
                return 0;
            }
            std::mem::take(&mut inner.entries)
        };
        let count = drained.len();
        for entry in drained {
            tracing::trace!(waited = ?entry.enqueued_at.elapsed(), "draining deferred release");
            entry.resource.dispose();
        }
        count
    }
}

impl Default for DisposeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DisposeQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("DisposeQueue")
            .field("pending", &inner.entries.len())
            .field("initialized", &inner.initialized)
            .finish()
    }
}
