//! Remote session errors and their classification.
//!
//! Every failure that crosses the session seam is a [`VimError`]. The driver
//! only needs to know one thing about it: whether trying again could help.
//! [`VimError::is_retryable`] answers that.

use std::fmt;
use thiserror::Error;

/// Fault reported by the remote controller for a rejected request or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The configuration version token was stale.
    ConcurrentAccess,
    /// An object with the requested name already exists.
    DuplicateName,
    /// A request argument was rejected.
    InvalidArgument,
    /// The referenced object no longer exists.
    NotFound,
    /// The session is not (or no longer) logged in.
    NotAuthenticated,
    /// The object is still in use and cannot be removed.
    ResourceInUse,
    /// The object is not in a state that allows the operation.
    InvalidState,
    /// Any other fault.
    Other,
}

impl FaultKind {
    /// Maps a remote fault type name onto a fault kind.
    pub fn from_fault_name(name: &str) -> Self {
        match name {
            "ConcurrentAccess" => FaultKind::ConcurrentAccess,
            "DuplicateName" => FaultKind::DuplicateName,
            "InvalidArgument" | "InvalidRequest" => FaultKind::InvalidArgument,
            "ManagedObjectNotFound" | "NotFound" => FaultKind::NotFound,
            "NotAuthenticated" => FaultKind::NotAuthenticated,
            "ResourceInUse" => FaultKind::ResourceInUse,
            "InvalidState" => FaultKind::InvalidState,
            _ => FaultKind::Other,
        }
    }

    /// Returns true if the fault clears up on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, FaultKind::ConcurrentAccess | FaultKind::NotAuthenticated)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultKind::ConcurrentAccess => "ConcurrentAccess",
            FaultKind::DuplicateName => "DuplicateName",
            FaultKind::InvalidArgument => "InvalidArgument",
            FaultKind::NotFound => "ManagedObjectNotFound",
            FaultKind::NotAuthenticated => "NotAuthenticated",
            FaultKind::ResourceInUse => "ResourceInUse",
            FaultKind::InvalidState => "InvalidState",
            FaultKind::Other => "Fault",
        };
        write!(f, "{}", s)
    }
}

/// Error type for remote session operations.
#[derive(Debug, Clone, Error)]
pub enum VimError {
    /// The connection to the controller failed.
    #[error("Connection to controller failed: {message}")]
    Connection { message: String },

    /// The call did not complete in time.
    #[error("Call timed out: {operation}")]
    Timeout { operation: String },

    /// The session expired and must log in again.
    #[error("Session expired")]
    SessionExpired,

    /// The controller rejected the call.
    #[error("{fault}: {message}")]
    Fault { fault: FaultKind, message: String },

    /// A task was accepted but completed with an error.
    #[error("Task {task} failed with {fault}: {message}")]
    TaskFailed {
        task: String,
        fault: FaultKind,
        message: String,
    },

    /// The controller returned something the session could not interpret.
    #[error("Unexpected response: {message}")]
    Unexpected { message: String },
}

impl VimError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        VimError::Connection {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        VimError::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates a fault error.
    pub fn fault(fault: FaultKind, message: impl Into<String>) -> Self {
        VimError::Fault {
            fault,
            message: message.into(),
        }
    }

    /// Creates a failed task error.
    pub fn task_failed(task: impl Into<String>, fault: FaultKind, message: impl Into<String>) -> Self {
        VimError::TaskFailed {
            task: task.into(),
            fault,
            message: message.into(),
        }
    }

    /// Creates an unexpected response error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        VimError::Unexpected {
            message: message.into(),
        }
    }

    /// Returns the remote fault, whether raised by the call or by its task.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            VimError::Fault { fault, .. } | VimError::TaskFailed { fault, .. } => Some(*fault),
            _ => None,
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            VimError::Connection { .. } | VimError::Timeout { .. } | VimError::SessionExpired => {
                true
            }
            VimError::Fault { fault, .. } | VimError::TaskFailed { fault, .. } => {
                fault.is_transient()
            }
            VimError::Unexpected { .. } => false,
        }
    }
}

/// Result type for remote session operations.
pub type VimResult<T> = Result<T, VimError>;
