//! Common test fixtures.

use dvs_types::{Network, Port, Segment};

use crate::directory::FakeHypervisorDirectory;

/// Switch every fixture network is mapped to.
pub const SWITCH_NAME: &str = "dvSwitch0";

/// Physical network mapped to [`SWITCH_NAME`].
pub const PHYSNET: &str = "physnet1";

/// Host running the managed hypervisor.
pub const MANAGED_HOST: &str = "esx-1";

/// Host running some other hypervisor.
pub const KVM_HOST: &str = "kvm-1";

/// Hypervisor type reported for [`MANAGED_HOST`].
pub const VCENTER_HYPERVISOR_TYPE: &str = "VMware vCenter Server";

/// The `physnet:switch` mapping list matching the fixtures.
pub fn network_maps() -> Vec<String> {
    vec![format!("{}:{}", PHYSNET, SWITCH_NAME)]
}

/// A VLAN network on [`PHYSNET`].
pub fn vlan_network(id: &str, name: &str, vlan: u32) -> Network {
    Network::new(id, Some(name)).with_segment(Segment::vlan(format!("{}-seg", id), PHYSNET, vlan))
}

/// A network whose only segment is vxlan.
pub fn vxlan_network(id: &str, name: &str) -> Network {
    Network::new(id, Some(name)).with_segment(Segment::of_type(format!("{}-seg", id), "vxlan"))
}

/// A VLAN network on a physical network with no switch mapping.
pub fn unmapped_network(id: &str, name: &str, vlan: u32) -> Network {
    Network::new(id, Some(name)).with_segment(Segment::vlan(format!("{}-seg", id), "physnet9", vlan))
}

/// An unbound port scheduled to [`MANAGED_HOST`].
pub fn managed_port(id: &str, network_id: &str) -> Port {
    Port::new(id, network_id).on_host(MANAGED_HOST)
}

/// An unbound port scheduled to [`KVM_HOST`].
pub fn foreign_port(id: &str, network_id: &str) -> Port {
    Port::new(id, network_id).on_host(KVM_HOST)
}

/// A directory knowing both fixture hosts.
pub fn managed_directory() -> FakeHypervisorDirectory {
    FakeHypervisorDirectory::new()
        .with_host(MANAGED_HOST, VCENTER_HYPERVISOR_TYPE)
        .with_host(KVM_HOST, "QEMU")
}
