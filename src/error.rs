//! Error type shared by every host operation.
//!
//! Each variant corresponds to one `jvmtiError` status code; [`Error::code`]
//! performs the translation at the C boundary.

use crate::sys::jvmti::jvmtiError;

/// Failures reported by tool-interface operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// A required pointer argument was null
    #[error("null pointer argument")]
    NullPointer,

    /// An argument was out of range or inconsistent
    #[error("illegal argument")]
    IllegalArgument,

    /// Unmanaged allocation failed
    #[error("out of memory")]
    OutOfMemory,

    /// The environment handle is null, disposed, or was never valid
    #[error("invalid environment")]
    InvalidEnvironment,

    /// The raw monitor id is out of range or on the free list
    #[error("invalid raw monitor")]
    InvalidMonitor,

    /// The calling thread does not own the raw monitor
    #[error("calling thread does not own the monitor")]
    NotMonitorOwner,

    /// A raw monitor wait was interrupted
    #[error("wait interrupted")]
    Interrupt,

    /// The thread handle does not denote a thread
    #[error("invalid thread")]
    InvalidThread,

    /// The thread exists but is not alive
    #[error("thread not alive")]
    ThreadNotAlive,

    /// A requested capability cannot be granted
    #[error("capability not available")]
    NotAvailable,

    /// The environment lacks a capability the operation requires
    #[error("environment does not possess the required capability")]
    MustPossessCapability,

    /// The event number is outside the event range
    #[error("invalid event type")]
    InvalidEventType,

    /// The operation is valid but not supported by this VM
    #[error("access denied")]
    AccessDenied,

    /// The operation is not allowed in the current phase
    #[error("wrong phase")]
    WrongPhase,

    /// The calling thread is not attached to the VM
    #[error("unattached thread")]
    UnattachedThread,

    /// An internal invariant was violated
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl Error {
    /// The status code this error is reported as.
    pub fn code(self) -> jvmtiError {
        match self {
            Error::NullPointer => jvmtiError::NULL_POINTER,
            Error::IllegalArgument => jvmtiError::ILLEGAL_ARGUMENT,
            Error::OutOfMemory => jvmtiError::OUT_OF_MEMORY,
            Error::InvalidEnvironment => jvmtiError::INVALID_ENVIRONMENT,
            Error::InvalidMonitor => jvmtiError::INVALID_MONITOR,
            Error::NotMonitorOwner => jvmtiError::NOT_MONITOR_OWNER,
            Error::Interrupt => jvmtiError::INTERRUPT,
            Error::InvalidThread => jvmtiError::INVALID_THREAD,
            Error::ThreadNotAlive => jvmtiError::THREAD_NOT_ALIVE,
            Error::NotAvailable => jvmtiError::NOT_AVAILABLE,
            Error::MustPossessCapability => jvmtiError::MUST_POSSESS_CAPABILITY,
            Error::InvalidEventType => jvmtiError::INVALID_EVENT_TYPE,
            Error::AccessDenied => jvmtiError::ACCESS_DENIED,
            Error::WrongPhase => jvmtiError::WRONG_PHASE,
            Error::UnattachedThread => jvmtiError::UNATTACHED_THREAD,
            Error::Internal(_) => jvmtiError::INTERNAL,
        }
    }
}

impl From<Error> for jvmtiError {
    fn from(err: Error) -> Self {
        err.code()
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Collapses a result into the status code returned across the ABI.
pub(crate) fn status(result: Result<()>) -> jvmtiError {
    match result {
        Ok(()) => jvmtiError::NONE,
        Err(err) => err.code(),
    }
}
