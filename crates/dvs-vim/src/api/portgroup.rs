//! Port-group configuration.

use dvs_types::VlanId;
use std::fmt;

/// A boolean setting that can either be set explicitly or inherited from
/// the enclosing switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoolPolicy {
    pub inherited: bool,
    pub value: bool,
}

impl BoolPolicy {
    /// Creates a policy that overrides the inherited value.
    pub const fn explicit(value: bool) -> Self {
        Self {
            inherited: false,
            value,
        }
    }
}

/// VLAN tagging for a port or port-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VlanIdSpec {
    pub inherited: bool,
    pub vlan_id: VlanId,
}

impl VlanIdSpec {
    /// Tags traffic with `vlan_id`, overriding the switch default.
    pub const fn explicit(vlan_id: VlanId) -> Self {
        Self {
            inherited: false,
            vlan_id,
        }
    }
}

/// Per-port settings, also used as a port-group's default port config.
///
/// Fields left as `None` are not touched by a reconfigure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortSetting {
    pub vlan: Option<VlanIdSpec>,
    pub blocked: Option<BoolPolicy>,
}

impl PortSetting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the VLAN tag.
    pub fn vlan(mut self, vlan_id: VlanId) -> Self {
        self.vlan = Some(VlanIdSpec::explicit(vlan_id));
        self
    }

    /// Sets the blocked flag.
    pub fn blocked(mut self, blocked: bool) -> Self {
        self.blocked = Some(BoolPolicy::explicit(blocked));
        self
    }

    /// Returns the effective blocked flag. Inherited or unset means unblocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.map(|b| b.value).unwrap_or(false)
    }
}

/// Port binding type of a port-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PortgroupType {
    /// Ports are bound when the VM is configured.
    EarlyBinding,
    /// Ports are bound when the VM powers on.
    LateBinding,
    /// Ports are created and destroyed with the VM's interface.
    #[default]
    Ephemeral,
}

impl PortgroupType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PortgroupType::EarlyBinding => "earlyBinding",
            PortgroupType::LateBinding => "lateBinding",
            PortgroupType::Ephemeral => "ephemeral",
        }
    }
}

impl fmt::Display for PortgroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create or reconfigure request for a port-group.
///
/// Only the fields that are set are sent; a reconfigure must carry the
/// `config_version` read back from the current configuration.
///
/// # Examples
///
/// ```
/// use dvs_types::VlanId;
/// use dvs_vim::{PortSetting, PortgroupConfigSpec, PortgroupType};
///
/// let spec = PortgroupConfigSpec::new()
///     .name("web-1234")
///     .num_ports(128)
///     .portgroup_type(PortgroupType::Ephemeral)
///     .default_port_config(PortSetting::new().vlan(VlanId::new(100).unwrap()).blocked(false));
///
/// assert_eq!(spec.name.as_deref(), Some("web-1234"));
/// assert_eq!(spec.config_version, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortgroupConfigSpec {
    pub name: Option<String>,
    pub num_ports: Option<u32>,
    pub portgroup_type: Option<PortgroupType>,
    pub description: Option<String>,
    pub default_port_config: Option<PortSetting>,
    pub config_version: Option<String>,
}

impl PortgroupConfigSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn num_ports(mut self, num_ports: u32) -> Self {
        self.num_ports = Some(num_ports);
        self
    }

    pub fn portgroup_type(mut self, portgroup_type: PortgroupType) -> Self {
        self.portgroup_type = Some(portgroup_type);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_port_config(mut self, setting: PortSetting) -> Self {
        self.default_port_config = Some(setting);
        self
    }

    pub fn config_version(mut self, version: impl Into<String>) -> Self {
        self.config_version = Some(version.into());
        self
    }
}

/// Current configuration of a port-group as read back from the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortgroupConfigInfo {
    /// Port-group key, as referenced by its ports.
    pub key: String,
    pub name: String,
    pub num_ports: u32,
    pub portgroup_type: PortgroupType,
    pub description: Option<String>,
    pub default_port_config: PortSetting,
    /// Version token to echo back on reconfigure.
    pub config_version: String,
}

impl PortgroupConfigInfo {
    /// Returns the effective default blocked flag.
    pub fn is_blocked(&self) -> bool {
        self.default_port_config.is_blocked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_port_setting_builder() {
        let vlan = VlanId::new(102).unwrap();
        let setting = PortSetting::new().vlan(vlan).blocked(true);

        assert_eq!(setting.vlan, Some(VlanIdSpec { inherited: false, vlan_id: vlan }));
        assert_eq!(setting.blocked, Some(BoolPolicy { inherited: false, value: true }));
        assert!(setting.is_blocked());
    }

    #[test]
    fn test_unset_blocked_means_unblocked() {
        assert!(!PortSetting::new().is_blocked());
    }

    #[test]
    fn test_reconfigure_spec_carries_version() {
        let spec = PortgroupConfigSpec::new()
            .config_version("7")
            .default_port_config(PortSetting::new().blocked(false));

        assert_eq!(spec.config_version.as_deref(), Some("7"));
        assert_eq!(spec.name, None);
        assert_eq!(spec.num_ports, None);
    }

    #[test]
    fn test_portgroup_type_names() {
        assert_eq!(PortgroupType::default().as_str(), "ephemeral");
        assert_eq!(PortgroupType::EarlyBinding.to_string(), "earlyBinding");
    }
}
