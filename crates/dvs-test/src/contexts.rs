//! Recording hook contexts.

use parking_lot::Mutex;

use dvs_orch_common::{NetworkContext, PortBinding, PortContext};
use dvs_types::{Network, Port, PortStatus, VifDetails, VifType};

/// Network context with a fixed current and optional original state.
#[derive(Debug, Clone)]
pub struct FakeNetworkContext {
    current: Network,
    original: Option<Network>,
}

impl FakeNetworkContext {
    pub fn new(current: Network) -> Self {
        Self {
            current,
            original: None,
        }
    }

    pub fn with_original(mut self, original: Network) -> Self {
        self.original = Some(original);
        self
    }
}

impl NetworkContext for FakeNetworkContext {
    fn current(&self) -> &Network {
        &self.current
    }

    fn original(&self) -> Option<&Network> {
        self.original.as_ref()
    }
}

/// Port context that records binding results and status updates.
#[derive(Debug)]
pub struct FakePortContext {
    current: Port,
    original: Option<Port>,
    network: FakeNetworkContext,
    bindings: Mutex<Vec<PortBinding>>,
    status_updates: Mutex<Vec<(String, PortStatus)>>,
}

impl FakePortContext {
    pub fn new(current: Port, network: FakeNetworkContext) -> Self {
        Self {
            current,
            original: None,
            network,
            bindings: Mutex::new(Vec::new()),
            status_updates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_original(mut self, original: Port) -> Self {
        self.original = Some(original);
        self
    }

    /// Every binding recorded so far.
    pub fn bindings(&self) -> Vec<PortBinding> {
        self.bindings.lock().clone()
    }

    /// The most recent binding.
    pub fn binding(&self) -> Option<PortBinding> {
        self.bindings.lock().last().cloned()
    }

    /// Every status update recorded so far, as `(port_id, status)`.
    pub fn status_updates(&self) -> Vec<(String, PortStatus)> {
        self.status_updates.lock().clone()
    }
}

impl PortContext for FakePortContext {
    fn current(&self) -> &Port {
        &self.current
    }

    fn original(&self) -> Option<&Port> {
        self.original.as_ref()
    }

    fn network(&self) -> &dyn NetworkContext {
        &self.network
    }

    fn set_binding(
        &self,
        segment_id: &str,
        vif_type: VifType,
        vif_details: VifDetails,
        status: PortStatus,
    ) {
        self.bindings
            .lock()
            .push(PortBinding::new(segment_id, vif_type, vif_details, status));
    }

    fn update_port_status(&self, port_id: &str, status: PortStatus) {
        self.status_updates
            .lock()
            .push((port_id.to_string(), status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvs_types::Segment;

    #[test]
    fn test_port_context_records_callbacks() {
        let network = Network::new("n1", Some("web")).with_segment(Segment::vlan("s1", "physnet1", 7));
        let ctx = FakePortContext::new(Port::new("p1", "n1"), FakeNetworkContext::new(network));

        ctx.set_binding("s1", VifType::Dvs, VifDetails::default(), PortStatus::Active);
        ctx.update_port_status("p1", PortStatus::Active);

        assert_eq!(ctx.bindings().len(), 1);
        assert_eq!(ctx.binding().map(|b| b.segment_id), Some("s1".to_string()));
        assert_eq!(
            ctx.status_updates(),
            vec![("p1".to_string(), PortStatus::Active)]
        );
        assert_eq!(ctx.network().network_segments().len(), 1);
    }
}
