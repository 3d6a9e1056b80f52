#![doc = include_str!("../README.md")]

pub mod disposer;
pub mod error;
pub mod gate;
pub mod handle;
pub mod queue;
pub mod resource;

// Re-export the public surface at the crate root.
pub use disposer::{Disposer, FinalizePolicy};
pub use error::{Error, Result};
pub use gate::{AlwaysSafe, MainThreadGate, ThreadGate};
pub use handle::{NativeHandle, NativeRelease, RawAddress};
pub use queue::DisposeQueue;
pub use resource::{Disposable, NativeResource};

use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the diagnostic `tracing` logger. Call at most once; repeat
/// calls are no-ops. `level` is a filter directive like `"debug"` or
/// `"veneer=trace"`; pass `None` for the default (`"info"`).
///
/// Hosts that install their own subscriber can skip this entirely — the
/// runtime only ever emits events, it never requires a subscriber.
pub fn init_logger(level: Option<&str>) {
    LOGGER_INIT.get_or_init(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        let filter = EnvFilter::builder().parse_lossy(level.unwrap_or("info"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init();
    });
}
