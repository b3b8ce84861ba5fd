//! Hook contexts.
//!
//! A context is the orchestrator's view of one object at the moment a hook
//! runs. Port contexts also carry the two callbacks through which a driver
//! reports back: the binding result and a status change.

use dvs_types::{Network, Port, PortStatus, Segment, VifDetails, VifType};
use serde::{Deserialize, Serialize};

/// Network state handed to network hooks.
pub trait NetworkContext: Send + Sync {
    /// Network state after the change.
    fn current(&self) -> &Network;

    /// Network state before the change, for updates.
    fn original(&self) -> Option<&Network>;

    /// Ordered segments of the network.
    fn network_segments(&self) -> &[Segment] {
        &self.current().segments
    }
}

/// Port state handed to port hooks.
pub trait PortContext: Send + Sync {
    /// Port state after the change.
    fn current(&self) -> &Port;

    /// Port state before the change, for updates.
    fn original(&self) -> Option<&Port>;

    /// The port's network.
    fn network(&self) -> &dyn NetworkContext;

    /// Records a successful binding of the port on `segment_id`.
    fn set_binding(
        &self,
        segment_id: &str,
        vif_type: VifType,
        vif_details: VifDetails,
        status: PortStatus,
    );

    /// Changes a port's operational status.
    fn update_port_status(&self, port_id: &str, status: PortStatus);
}

/// A binding result as passed to [`PortContext::set_binding`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub segment_id: String,
    pub vif_type: VifType,
    pub vif_details: VifDetails,
    pub status: PortStatus,
}

impl PortBinding {
    pub fn new(
        segment_id: impl Into<String>,
        vif_type: VifType,
        vif_details: VifDetails,
        status: PortStatus,
    ) -> Self {
        Self {
            segment_id: segment_id.into(),
            vif_type,
            vif_details,
            status,
        }
    }
}
