//! dvs-mechd - mechanism driver for distributed virtual switches
//!
//! Reconciles logical networks and ports onto port-groups and port leases of
//! remote distributed switches. Networks are mapped to switches by the
//! physical network of their first VLAN segment.
//!
//! - [`naming`]: port-group name derivation
//! - [`controller`]: idempotent remote operations on one switch
//! - [`resolver`]: physical network to switch table
//! - [`hypervisor`]: workload eligibility gate
//! - [`driver`]: the lifecycle hooks
//! - [`config`]: TOML configuration

pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod hypervisor;
pub mod naming;
pub mod resolver;

pub use config::{DvsConfig, NetworkMapping, DEFAULT_CONFIG_PATH};
pub use controller::{SwitchController, DVS_PORTS_NUMBER, PORTGROUP_DESCRIPTION, PORT_GROWTH_INCREMENT};
pub use driver::{DvsMechanismDriver, DRIVER_NAME};
pub use error::{DvsError, DvsResult, ErrorClass};
pub use hypervisor::{Eligibility, HypervisorGate, DEFAULT_MANAGED_HYPERVISOR_TYPE};
pub use naming::{portgroup_name, MAX_NET_NAME_LEN};
pub use resolver::SwitchResolver;
