//! Logical ports and their binding state.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational status of a logical port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortStatus {
    /// Port is forwarding.
    Active,
    /// Port is not forwarding (default for new ports).
    #[default]
    Down,
    /// Port is being set up.
    Build,
    /// Port setup failed.
    Error,
}

impl PortStatus {
    /// Returns the status as the orchestrator spells it.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PortStatus::Active => "ACTIVE",
            PortStatus::Down => "DOWN",
            PortStatus::Build => "BUILD",
            PortStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(PortStatus::Active),
            "DOWN" => Ok(PortStatus::Down),
            "BUILD" => Ok(PortStatus::Build),
            "ERROR" => Ok(PortStatus::Error),
            _ => Err(ParseError::InvalidPortStatus(s.to_string())),
        }
    }
}

/// VIF binding type of a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VifType {
    /// Not bound by any driver yet.
    #[default]
    Unbound,
    /// A previous binding attempt failed.
    BindingFailed,
    /// Bound to a distributed virtual switch port.
    Dvs,
    /// Bound by some other driver.
    Other(String),
}

impl VifType {
    pub fn as_str(&self) -> &str {
        match self {
            VifType::Unbound => "unbound",
            VifType::BindingFailed => "binding_failed",
            VifType::Dvs => "dvs",
            VifType::Other(name) => name,
        }
    }
}

impl From<String> for VifType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "unbound" => VifType::Unbound,
            "binding_failed" => VifType::BindingFailed,
            "dvs" => VifType::Dvs,
            _ => VifType::Other(s),
        }
    }
}

impl From<&str> for VifType {
    fn from(s: &str) -> Self {
        VifType::from(s.to_string())
    }
}

impl From<VifType> for String {
    fn from(t: VifType) -> String {
        t.as_str().to_string()
    }
}

impl fmt::Display for VifType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vendor-specific details attached to a successful binding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VifDetails {
    /// Whether the binding enforces port filtering.
    pub port_filter: bool,
    /// Leased port key on the distributed switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dvs_port_key: Option<String>,
}

impl VifDetails {
    /// Returns a copy carrying the given port key.
    pub fn with_port_key(mut self, key: impl Into<String>) -> Self {
        self.dvs_port_key = Some(key.into());
        self
    }
}

/// A logical port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Stable opaque identifier.
    pub id: String,
    /// Owning network.
    pub network_id: String,
    /// Host the port is scheduled to, if any.
    #[serde(default, rename = "binding:host_id")]
    pub host_id: Option<String>,
    /// Administrative state.
    #[serde(default = "default_admin_state_up")]
    pub admin_state_up: bool,
    /// Operational status.
    #[serde(default)]
    pub status: PortStatus,
    /// Current VIF binding type.
    #[serde(default, rename = "binding:vif_type")]
    pub vif_type: VifType,
}

fn default_admin_state_up() -> bool {
    true
}

impl Port {
    /// Creates an unbound, administratively up port in DOWN status.
    pub fn new(id: impl Into<String>, network_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            network_id: network_id.into(),
            host_id: None,
            admin_state_up: true,
            status: PortStatus::Down,
            vif_type: VifType::Unbound,
        }
    }

    /// Schedules the port to a host.
    pub fn on_host(mut self, host: impl Into<String>) -> Self {
        self.host_id = Some(host.into());
        self
    }

    /// Sets the administrative state.
    pub fn with_admin_state_up(mut self, up: bool) -> Self {
        self.admin_state_up = up;
        self
    }

    /// Sets the VIF type.
    pub fn with_vif_type(mut self, vif_type: VifType) -> Self {
        self.vif_type = vif_type;
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: PortStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns the scheduled host, treating an empty host as absent.
    pub fn host(&self) -> Option<&str> {
        self.host_id.as_deref().filter(|h| !h.is_empty())
    }

    /// Returns true if no driver holds a binding for this port.
    pub fn is_unbound(&self) -> bool {
        matches!(self.vif_type, VifType::Unbound | VifType::BindingFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_port_status_roundtrip() {
        assert_eq!("active".parse::<PortStatus>().unwrap(), PortStatus::Active);
        assert_eq!(PortStatus::Down.to_string(), "DOWN");
        assert!("sleeping".parse::<PortStatus>().is_err());
    }

    #[test]
    fn test_vif_type_from_str() {
        assert_eq!(VifType::from("unbound"), VifType::Unbound);
        assert_eq!(VifType::from("dvs"), VifType::Dvs);
        assert_eq!(VifType::from("ovs"), VifType::Other("ovs".to_string()));
    }

    #[test]
    fn test_port_is_unbound() {
        let port = Port::new("p1", "n1");
        assert!(port.is_unbound());
        assert!(port.clone().with_vif_type(VifType::BindingFailed).is_unbound());
        assert!(!port.with_vif_type(VifType::Dvs).is_unbound());
    }

    #[test]
    fn test_port_host_empty_is_absent() {
        assert_eq!(Port::new("p1", "n1").on_host("").host(), None);
        assert_eq!(Port::new("p1", "n1").on_host("compute-1").host(), Some("compute-1"));
    }

    #[test]
    fn test_port_deserialize_orchestrator_keys() {
        let json = r#"{
            "id": "p1",
            "network_id": "n1",
            "binding:host_id": "compute-1",
            "binding:vif_type": "unbound",
            "status": "DOWN",
            "admin_state_up": false
        }"#;

        let port: Port = serde_json::from_str(json).unwrap();
        assert_eq!(port.host(), Some("compute-1"));
        assert_eq!(port.vif_type, VifType::Unbound);
        assert_eq!(port.status, PortStatus::Down);
        assert!(!port.admin_state_up);
    }

    #[test]
    fn test_vif_details_serialization() {
        let details = VifDetails::default().with_port_key("42");
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["dvs_port_key"], "42");
        assert_eq!(value["port_filter"], false);
    }
}
