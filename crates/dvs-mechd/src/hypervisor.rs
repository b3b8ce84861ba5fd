//! Workload eligibility.
//!
//! A port is only handled by this driver when the host it is scheduled to
//! runs the managed hypervisor type. Everything else belongs to some other
//! driver and is left alone.

use std::sync::Arc;
use tracing::debug;

use dvs_orch_common::{DirectoryError, HypervisorDirectory};
use dvs_types::Port;

use crate::error::{DvsError, DvsResult};

/// Hypervisor type reported for hosts managed through vCenter.
pub const DEFAULT_MANAGED_HYPERVISOR_TYPE: &str = "VMware vCenter Server";

/// Result of the eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// The port's workload runs on a managed hypervisor.
    Managed,
    /// The port belongs to someone else.
    NotManaged { reason: String },
}

impl Eligibility {
    pub fn is_managed(&self) -> bool {
        matches!(self, Eligibility::Managed)
    }
}

impl From<DirectoryError> for DvsError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound { host } => DvsError::HypervisorNotFound { host },
            DirectoryError::Unavailable { message } => DvsError::HypervisorDirectory { message },
        }
    }
}

/// Decides whether a port's workload runs on the managed hypervisor type.
pub struct HypervisorGate {
    directory: Arc<dyn HypervisorDirectory>,
    managed_type: String,
}

impl HypervisorGate {
    /// Creates a gate admitting hosts whose hypervisor type is `managed_type`.
    pub fn new(directory: Arc<dyn HypervisorDirectory>, managed_type: impl Into<String>) -> Self {
        Self {
            directory,
            managed_type: managed_type.into(),
        }
    }

    /// Returns the hypervisor type this gate admits.
    pub fn managed_type(&self) -> &str {
        &self.managed_type
    }

    /// Checks a port.
    ///
    /// A missing host, an unknown host or a foreign hypervisor type all make
    /// the port ineligible. Only a failure to reach the directory is an error.
    pub async fn check(&self, port: &Port) -> DvsResult<Eligibility> {
        let Some(host) = port.host() else {
            debug!(port_id = %port.id, "Port has no host");
            return Ok(Eligibility::NotManaged {
                reason: format!("port {} is not scheduled to a host", port.id),
            });
        };

        let hypervisor = match self.directory.lookup_hypervisor_by_host(host).await {
            Ok(hypervisor) => hypervisor,
            Err(e @ DirectoryError::NotFound { .. }) => {
                debug!(port_id = %port.id, host, "No hypervisor for host");
                return Ok(Eligibility::NotManaged {
                    reason: DvsError::from(e).to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if hypervisor.hypervisor_type != self.managed_type {
            debug!(
                port_id = %port.id,
                host,
                hypervisor_type = %hypervisor.hypervisor_type,
                "Host runs an unmanaged hypervisor"
            );
            return Ok(Eligibility::NotManaged {
                reason: format!(
                    "host {} runs hypervisor type '{}'",
                    host, hypervisor.hypervisor_type
                ),
            });
        }

        Ok(Eligibility::Managed)
    }
}
