//! Unified error types for the veneer runtime.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the veneer runtime.
///
/// Disposal paths never propagate [`Error::Native`] to the caller — teardown
/// must not fail the code driving it. It is reported through `tracing` and
/// surfaced here only so [`NativeRelease`](crate::NativeRelease)
/// implementations have a uniform signature.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The native layer reported a failure while releasing a handle.
    #[error("native release: {0}")]
    Native(String),

    /// An operation was attempted on an already-disposed resource.
    #[error("resource already disposed")]
    Disposed,

    /// A null native address was supplied where a live handle is required.
    #[error("null native handle")]
    NullHandle,
}
