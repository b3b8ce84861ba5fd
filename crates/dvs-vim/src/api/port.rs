//! Individual switch ports.
//!
//! A port is leased to a logical port by writing the logical port's
//! identifier into the switch port's name. A port with no name is free.

use crate::api::portgroup::PortSetting;

/// A port on a distributed switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvPort {
    /// Port key, unique per switch.
    pub key: String,
    /// Key of the owning port-group.
    pub portgroup_key: String,
    /// Lease holder, if any.
    pub name: Option<String>,
    /// Effective blocked flag.
    pub blocked: bool,
    /// Version token to echo back on reconfigure.
    pub config_version: String,
}

impl DvPort {
    /// Returns true if no logical port holds this port.
    pub fn is_free(&self) -> bool {
        self.name.as_deref().map(str::is_empty).unwrap_or(true)
    }

    /// Returns true if `port_id` holds this port.
    pub fn is_leased_to(&self, port_id: &str) -> bool {
        self.name.as_deref() == Some(port_id)
    }
}

/// Kind of change a port config spec applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConfigOperation {
    Add,
    #[default]
    Edit,
    Remove,
}

/// Reconfigure request for a single port.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DvPortConfigSpec {
    pub key: String,
    pub operation: ConfigOperation,
    /// New port name. An empty name clears the lease.
    pub name: Option<String>,
    pub setting: Option<PortSetting>,
    pub config_version: Option<String>,
}

impl DvPortConfigSpec {
    /// Creates an edit of the port with the given key.
    pub fn edit(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operation: ConfigOperation::Edit,
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn setting(mut self, setting: PortSetting) -> Self {
        self.setting = Some(setting);
        self
    }

    pub fn config_version(mut self, version: impl Into<String>) -> Self {
        self.config_version = Some(version.into());
        self
    }
}

/// Filter for fetching switch ports.
///
/// Empty key lists match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortCriteria {
    pub portgroup_keys: Vec<String>,
    pub port_keys: Vec<String>,
}

impl PortCriteria {
    /// Matches every port on the switch.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches ports belonging to one port-group.
    pub fn in_portgroup(key: impl Into<String>) -> Self {
        Self {
            portgroup_keys: vec![key.into()],
            port_keys: Vec::new(),
        }
    }

    /// Returns true if `port` satisfies this filter.
    pub fn matches(&self, port: &DvPort) -> bool {
        (self.portgroup_keys.is_empty() || self.portgroup_keys.contains(&port.portgroup_key))
            && (self.port_keys.is_empty() || self.port_keys.contains(&port.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(key: &str, pg: &str, name: Option<&str>) -> DvPort {
        DvPort {
            key: key.to_string(),
            portgroup_key: pg.to_string(),
            name: name.map(str::to_string),
            blocked: false,
            config_version: "1".to_string(),
        }
    }

    #[test]
    fn test_port_lease_state() {
        assert!(port("1", "pg-1", None).is_free());
        assert!(port("1", "pg-1", Some("")).is_free());

        let leased = port("1", "pg-1", Some("port-a"));
        assert!(!leased.is_free());
        assert!(leased.is_leased_to("port-a"));
        assert!(!leased.is_leased_to("port-b"));
    }

    #[test]
    fn test_criteria_matching() {
        let p = port("5", "pg-1", None);
        assert!(PortCriteria::all().matches(&p));
        assert!(PortCriteria::in_portgroup("pg-1").matches(&p));
        assert!(!PortCriteria::in_portgroup("pg-2").matches(&p));
    }

    #[test]
    fn test_release_spec_clears_name() {
        let spec = DvPortConfigSpec::edit("5").name("").config_version("3");
        assert_eq!(spec.operation, ConfigOperation::Edit);
        assert_eq!(spec.name.as_deref(), Some(""));
        assert_eq!(spec.setting, None);
    }
}
