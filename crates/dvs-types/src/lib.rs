//! Logical network model for the DVS mechanism driver.
//!
//! These are the objects the external orchestrator hands to the lifecycle
//! hooks. They carry no remote state; everything here is plain data.
//!
//! - [`Network`]: a tenant network and its ordered [`Segment`]s
//! - [`NetworkType`]: segment transport (only VLAN is switch-managed)
//! - [`SegmentationId`]: VLAN tag as reported by the backend (string or integer)
//! - [`Port`]: a logical port with its binding state
//! - [`VifDetails`]: vendor-specific binding details returned on bind
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers

mod network;
mod port;
mod vlan;

pub use network::{Network, NetworkType, Segment, SegmentationId};
pub use port::{Port, PortStatus, VifDetails, VifType};
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(String),

    #[error("invalid port status: {0}")]
    InvalidPortStatus(String),
}
