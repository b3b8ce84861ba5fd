//! Hypervisor directory seam.
//!
//! The orchestrator's compute service knows which hypervisor runs on which
//! host. Drivers only ever ask it one question.

use crate::retry::Retryable;
use async_trait::async_trait;
use thiserror::Error;

/// A compute host's hypervisor descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hypervisor {
    pub hypervisor_hostname: String,
    pub hypervisor_type: String,
}

impl Hypervisor {
    pub fn new(hostname: impl Into<String>, hypervisor_type: impl Into<String>) -> Self {
        Self {
            hypervisor_hostname: hostname.into(),
            hypervisor_type: hypervisor_type.into(),
        }
    }
}

/// Error type for directory lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// No hypervisor is registered for the host.
    #[error("Hypervisor not found for host '{host}'")]
    NotFound { host: String },

    /// The directory could not be queried.
    #[error("Hypervisor directory unavailable: {message}")]
    Unavailable { message: String },
}

impl DirectoryError {
    /// Creates a not found error.
    pub fn not_found(host: impl Into<String>) -> Self {
        DirectoryError::NotFound { host: host.into() }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        DirectoryError::Unavailable {
            message: message.into(),
        }
    }
}

impl Retryable for DirectoryError {
    fn is_retryable(&self) -> bool {
        matches!(self, DirectoryError::Unavailable { .. })
    }
}

/// Lookup of hypervisors by compute host.
#[async_trait]
pub trait HypervisorDirectory: Send + Sync {
    /// Returns the hypervisor serving `host`.
    async fn lookup_hypervisor_by_host(&self, host: &str) -> Result<Hypervisor, DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_retryable() {
        assert!(DirectoryError::unavailable("503").is_retryable());
        assert!(!DirectoryError::not_found("esx-1").is_retryable());
        assert_eq!(
            DirectoryError::not_found("esx-1").to_string(),
            "Hypervisor not found for host 'esx-1'"
        );
    }
}
