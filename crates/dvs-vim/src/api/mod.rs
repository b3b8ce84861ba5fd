//! Request payloads and remote object descriptions.
//!
//! These mirror the controller's configuration objects closely enough for a
//! session implementation to encode them, and no further.
//!
//! - [`portgroup`]: port-group configuration specs and their read-back info
//! - [`port`]: individual switch ports, port edits and port queries

pub mod port;
pub mod portgroup;

pub use port::{ConfigOperation, DvPort, DvPortConfigSpec, PortCriteria};
pub use portgroup::{
    BoolPolicy, PortSetting, PortgroupConfigInfo, PortgroupConfigSpec, PortgroupType, VlanIdSpec,
};
