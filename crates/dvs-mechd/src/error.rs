//! Error types for the DVS mechanism driver.
//!
//! Every failure is sorted into an [`ErrorClass`]. The reconciler decides
//! what to do from the class alone: absorb it, retry it, or hand it to the
//! orchestrator.

use dvs_orch_common::Retryable;
use dvs_types::NetworkType;
use dvs_vim::VimError;
use std::io;
use thiserror::Error;

/// Result type alias for driver operations.
pub type DvsResult<T> = Result<T, DvsError>;

/// Disposition of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The network is simply not handled by this driver.
    Unmanaged,
    /// Input that can never be made to work.
    Validation,
    /// Infrastructure or timing fault; safe to retry.
    Transient,
    /// The request is impossible given current remote state.
    Semantic,
    /// Compute placement and switch mapping disagree.
    InconsistentState,
    /// The port's workload is not on a managed hypervisor.
    NotEligible,
    /// Bad or unreadable configuration.
    Config,
}

/// Errors that can occur while reconciling networks and ports.
#[derive(Debug, Error)]
pub enum DvsError {
    /// Segment type other than VLAN.
    #[error("Network type {network_type} is not supported")]
    UnsupportedSegmentType {
        /// The rejected type.
        network_type: NetworkType,
    },

    /// VLAN segment whose physical network has no switch mapped.
    #[error("No distributed switch is mapped to physical network '{physical_network}'")]
    NoControllerForPhysicalNetwork {
        /// The unmapped tag.
        physical_network: String,
    },

    /// Network without any segment.
    #[error("Network has no segments")]
    MissingSegment,

    /// Derived port-group name is not acceptable to the controller.
    #[error("Network {network_id} has invalid name '{name}': {reason}")]
    InvalidName {
        /// The offending network.
        network_id: String,
        /// The candidate name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Segment that cannot be turned into a port-group.
    #[error("Segment {segment_id} is invalid: {reason}")]
    InvalidSegment {
        /// The offending segment.
        segment_id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Configured switch does not exist on the controller.
    #[error("Distributed switch '{switch_name}' not found")]
    SwitchNotFound {
        /// The configured switch name.
        switch_name: String,
    },

    /// Port-group for a network does not exist.
    #[error("Port group '{name}' not found on switch '{switch_name}'")]
    PortGroupNotFound {
        /// Derived port-group name.
        name: String,
        /// Switch that was searched.
        switch_name: String,
    },

    /// Port-group is full even after growing it.
    #[error("No free port in port group '{portgroup}' for port {port_id}")]
    PortLeaseUnavailable {
        /// Port-group that was searched.
        portgroup: String,
        /// Logical port that needed a lease.
        port_id: String,
    },

    /// A remote call failed.
    #[error("Switch operation {operation} failed: {source}")]
    SwitchOperationFailed {
        /// The remote operation.
        operation: String,
        /// The session error.
        #[source]
        source: VimError,
    },

    /// Managed workload on a network without switch mapping.
    #[error("Invalid system state: {details}")]
    InvalidSystemState {
        /// Description of the inconsistency.
        details: String,
    },

    /// Host has no known hypervisor.
    #[error("Hypervisor not found for host '{host}'")]
    HypervisorNotFound {
        /// The scheduled host.
        host: String,
    },

    /// Hypervisor directory could not be queried.
    #[error("Hypervisor directory unavailable: {message}")]
    HypervisorDirectory {
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DvsError {
    /// Creates an invalid name error.
    pub fn invalid_name(
        network_id: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidName {
            network_id: network_id.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid segment error.
    pub fn invalid_segment(segment_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSegment {
            segment_id: segment_id.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a remote failure.
    pub fn switch_operation(operation: impl Into<String>, source: VimError) -> Self {
        Self::SwitchOperationFailed {
            operation: operation.into(),
            source,
        }
    }

    /// Creates an invalid system state error.
    pub fn invalid_system_state(details: impl Into<String>) -> Self {
        Self::InvalidSystemState {
            details: details.into(),
        }
    }

    /// Creates a hypervisor directory error.
    pub fn hypervisor_directory(message: impl Into<String>) -> Self {
        Self::HypervisorDirectory {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns how this error should be handled.
    pub fn class(&self) -> ErrorClass {
        match self {
            DvsError::UnsupportedSegmentType { .. }
            | DvsError::NoControllerForPhysicalNetwork { .. }
            | DvsError::MissingSegment => ErrorClass::Unmanaged,
            DvsError::InvalidName { .. } | DvsError::InvalidSegment { .. } => {
                ErrorClass::Validation
            }
            DvsError::SwitchOperationFailed { source, .. } if source.is_retryable() => {
                ErrorClass::Transient
            }
            DvsError::HypervisorDirectory { .. } => ErrorClass::Transient,
            DvsError::SwitchOperationFailed { .. }
            | DvsError::SwitchNotFound { .. }
            | DvsError::PortGroupNotFound { .. }
            | DvsError::PortLeaseUnavailable { .. } => ErrorClass::Semantic,
            DvsError::InvalidSystemState { .. } => ErrorClass::InconsistentState,
            DvsError::HypervisorNotFound { .. } => ErrorClass::NotEligible,
            DvsError::InvalidConfig { .. } | DvsError::Io(_) => ErrorClass::Config,
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl Retryable for DvsError {
    fn is_retryable(&self) -> bool {
        DvsError::is_retryable(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvs_vim::FaultKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolution_errors_are_unmanaged() {
        let err = DvsError::UnsupportedSegmentType {
            network_type: NetworkType::Vxlan,
        };
        assert_eq!(err.class(), ErrorClass::Unmanaged);
        assert_eq!(err.to_string(), "Network type vxlan is not supported");

        let err = DvsError::NoControllerForPhysicalNetwork {
            physical_network: "physnet9".to_string(),
        };
        assert_eq!(err.class(), ErrorClass::Unmanaged);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_switch_operation_inherits_transience() {
        let err = DvsError::switch_operation("datacenters", VimError::connection("reset"));
        assert_eq!(err.class(), ErrorClass::Transient);
        assert!(err.is_retryable());

        let err = DvsError::switch_operation(
            "create_portgroup",
            VimError::fault(FaultKind::InvalidArgument, "vlanId"),
        );
        assert_eq!(err.class(), ErrorClass::Semantic);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_errors_are_terminal() {
        let err = DvsError::invalid_name("net-1", "bad name", "contains ' '");
        assert_eq!(err.class(), ErrorClass::Validation);
        assert!(!Retryable::is_retryable(&err));
    }

    #[test]
    fn test_gate_and_state_classes() {
        assert_eq!(
            DvsError::HypervisorNotFound {
                host: "compute-1".to_string()
            }
            .class(),
            ErrorClass::NotEligible
        );
        assert!(DvsError::hypervisor_directory("timeout").is_retryable());
        assert_eq!(
            DvsError::invalid_system_state("mismatch").class(),
            ErrorClass::InconsistentState
        );
        assert_eq!(
            DvsError::invalid_config("mapping", "empty").class(),
            ErrorClass::Config
        );
    }
}
