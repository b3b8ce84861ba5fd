//! Logical networks and their segments.

use crate::{ParseError, VlanId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport type of a network segment.
///
/// Only [`NetworkType::Vlan`] segments are mapped onto a distributed switch;
/// every other type is carried through so it can be named in log messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkType {
    /// 802.1Q tagged segment.
    Vlan,
    /// Untagged provider segment.
    Flat,
    /// VXLAN overlay segment.
    Vxlan,
    /// GRE overlay segment.
    Gre,
    /// Geneve overlay segment.
    Geneve,
    /// Host-local segment.
    Local,
    /// Anything the driver does not know about.
    Other(String),
}

impl NetworkType {
    /// Returns the type name as used by the orchestrator.
    pub fn as_str(&self) -> &str {
        match self {
            NetworkType::Vlan => "vlan",
            NetworkType::Flat => "flat",
            NetworkType::Vxlan => "vxlan",
            NetworkType::Gre => "gre",
            NetworkType::Geneve => "geneve",
            NetworkType::Local => "local",
            NetworkType::Other(name) => name,
        }
    }

    /// Returns true for VLAN segments.
    pub fn is_vlan(&self) -> bool {
        matches!(self, NetworkType::Vlan)
    }
}

impl From<String> for NetworkType {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "vlan" => NetworkType::Vlan,
            "flat" => NetworkType::Flat,
            "vxlan" => NetworkType::Vxlan,
            "gre" => NetworkType::Gre,
            "geneve" => NetworkType::Geneve,
            "local" => NetworkType::Local,
            _ => NetworkType::Other(s),
        }
    }
}

impl From<&str> for NetworkType {
    fn from(s: &str) -> Self {
        NetworkType::from(s.to_string())
    }
}

impl From<NetworkType> for String {
    fn from(t: NetworkType) -> String {
        t.as_str().to_string()
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Segmentation identifier as reported by the type driver.
///
/// Some backends hand the VLAN tag over as an integer, others as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentationId {
    Numeric(u32),
    Text(String),
}

impl SegmentationId {
    /// Interprets the identifier as a VLAN tag.
    pub fn to_vlan_id(&self) -> Result<VlanId, ParseError> {
        match self {
            SegmentationId::Numeric(id) => VlanId::from_u32(*id),
            SegmentationId::Text(s) => s.parse(),
        }
    }
}

impl From<u32> for SegmentationId {
    fn from(id: u32) -> Self {
        SegmentationId::Numeric(id)
    }
}

impl From<&str> for SegmentationId {
    fn from(id: &str) -> Self {
        SegmentationId::Text(id.to_string())
    }
}

impl fmt::Display for SegmentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationId::Numeric(id) => write!(f, "{}", id),
            SegmentationId::Text(s) => f.write_str(s),
        }
    }
}

/// A network's binding to one transport and physical network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment identifier, echoed back in binding results.
    pub id: String,
    /// Transport type.
    pub network_type: NetworkType,
    /// Physical network tag. Meaningful for VLAN segments only.
    #[serde(default)]
    pub physical_network: Option<String>,
    /// VLAN tag for VLAN segments.
    #[serde(default)]
    pub segmentation_id: Option<SegmentationId>,
}

impl Segment {
    /// Creates a VLAN segment on `physical_network` tagged with `vlan`.
    pub fn vlan(
        id: impl Into<String>,
        physical_network: impl Into<String>,
        vlan: impl Into<SegmentationId>,
    ) -> Self {
        Self {
            id: id.into(),
            network_type: NetworkType::Vlan,
            physical_network: Some(physical_network.into()),
            segmentation_id: Some(vlan.into()),
        }
    }

    /// Creates a segment of an arbitrary type with no physical network.
    pub fn of_type(id: impl Into<String>, network_type: impl Into<NetworkType>) -> Self {
        Self {
            id: id.into(),
            network_type: network_type.into(),
            physical_network: None,
            segmentation_id: None,
        }
    }
}

/// A tenant network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Stable opaque identifier.
    pub id: String,
    /// Free-form display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Administrative state.
    #[serde(default = "default_admin_state_up")]
    pub admin_state_up: bool,
    /// Ordered segments.
    #[serde(default)]
    pub segments: Vec<Segment>,
}

fn default_admin_state_up() -> bool {
    true
}

impl Network {
    /// Creates an administratively up network with no segments.
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            admin_state_up: true,
            segments: Vec::new(),
        }
    }

    /// Appends a segment.
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Sets the administrative state.
    pub fn with_admin_state_up(mut self, up: bool) -> Self {
        self.admin_state_up = up;
        self
    }

    /// Returns the display name, treating an empty name as absent.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}
