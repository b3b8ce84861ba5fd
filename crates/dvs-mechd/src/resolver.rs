//! SwitchResolver - maps a network's segment onto the controller of the
//! switch that carries it.
//!
//! The mapping is built once from configuration and never changes, so it is
//! read without locking from concurrent hooks.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use dvs_types::Segment;
use dvs_vim::VimSession;

use crate::config::NetworkMapping;
use crate::controller::SwitchController;
use crate::error::{DvsError, DvsResult};

/// Immutable physical network to switch controller table.
#[derive(Debug, Default)]
pub struct SwitchResolver {
    controllers: HashMap<String, Arc<SwitchController>>,
}

impl SwitchResolver {
    /// Builds the table from mapping entries.
    ///
    /// Physical networks mapped to the same switch share one controller.
    /// A physical network may appear only once.
    pub fn from_mappings(
        mappings: &[NetworkMapping],
        session: Arc<dyn VimSession>,
    ) -> DvsResult<Self> {
        let mut by_switch: HashMap<&str, Arc<SwitchController>> = HashMap::new();
        let mut controllers = HashMap::with_capacity(mappings.len());

        for mapping in mappings {
            let controller = by_switch
                .entry(mapping.switch_name.as_str())
                .or_insert_with(|| {
                    Arc::new(SwitchController::new(&mapping.switch_name, session.clone()))
                })
                .clone();

            if controllers
                .insert(mapping.physical_network.clone(), controller)
                .is_some()
            {
                return Err(DvsError::invalid_config(
                    "network_maps",
                    format!(
                        "physical network '{}' is mapped more than once",
                        mapping.physical_network
                    ),
                ));
            }
            info!(
                physical_network = %mapping.physical_network,
                switch = %mapping.switch_name,
                "Mapped physical network"
            );
        }

        Ok(Self { controllers })
    }

    /// Returns the controller responsible for a network's segments.
    ///
    /// Only the first segment is consulted.
    ///
    /// # Errors
    ///
    /// - [`DvsError::MissingSegment`] if there are no segments
    /// - [`DvsError::UnsupportedSegmentType`] if the first segment is not VLAN
    /// - [`DvsError::NoControllerForPhysicalNetwork`] if its physical network is unmapped
    pub fn resolve(&self, segments: &[Segment]) -> DvsResult<&SwitchController> {
        let segment = segments.first().ok_or(DvsError::MissingSegment)?;

        if !segment.network_type.is_vlan() {
            return Err(DvsError::UnsupportedSegmentType {
                network_type: segment.network_type.clone(),
            });
        }

        let physical_network = segment.physical_network.as_deref().unwrap_or_default();
        match self.controllers.get(physical_network) {
            Some(controller) => Ok(controller.as_ref()),
            None => {
                debug!(physical_network, "No switch mapped for physical network");
                Err(DvsError::NoControllerForPhysicalNetwork {
                    physical_network: physical_network.to_string(),
                })
            }
        }
    }

    /// Returns the controller for a physical network.
    pub fn get(&self, physical_network: &str) -> Option<&Arc<SwitchController>> {
        self.controllers.get(physical_network)
    }

    /// Returns `(physical_network, switch_name)` pairs sorted by physical network.
    pub fn mappings(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .controllers
            .iter()
            .map(|(tag, controller)| (tag.as_str(), controller.switch_name()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvs_test::FakeVim;
    use dvs_types::{NetworkType, Segment};
    use pretty_assertions::assert_eq;

    fn resolver(entries: &[&str]) -> DvsResult<SwitchResolver> {
        let mappings: Vec<NetworkMapping> = entries
            .iter()
            .map(|e| e.parse::<NetworkMapping>())
            .collect::<DvsResult<_>>()?;
        SwitchResolver::from_mappings(&mappings, Arc::new(FakeVim::new()))
    }

    #[test]
    fn test_resolve_first_vlan_segment() {
        let resolver = resolver(&["physnet1:dvSwitch0", "physnet2:dvSwitch1"]).unwrap();
        let segments = vec![
            Segment::vlan("s1", "physnet2", 100),
            Segment::vlan("s2", "physnet1", 200),
        ];

        assert_eq!(resolver.resolve(&segments).unwrap().switch_name(), "dvSwitch1");
    }

    #[test]
    fn test_resolve_rejections() {
        let resolver = resolver(&["physnet1:dvSwitch0"]).unwrap();

        assert!(matches!(
            resolver.resolve(&[]),
            Err(DvsError::MissingSegment)
        ));
        assert!(matches!(
            resolver.resolve(&[Segment::of_type("s1", "vxlan")]),
            Err(DvsError::UnsupportedSegmentType { network_type: NetworkType::Vxlan })
        ));
        assert!(matches!(
            resolver.resolve(&[Segment::vlan("s1", "physnet7", 100)]),
            Err(DvsError::NoControllerForPhysicalNetwork { .. })
        ));
    }

    #[test]
    fn test_switch_shared_between_physical_networks() {
        let resolver = resolver(&["physnet1:dvSwitch0", "physnet2:dvSwitch0"]).unwrap();

        assert_eq!(resolver.len(), 2);
        assert!(Arc::ptr_eq(
            resolver.get("physnet1").unwrap(),
            resolver.get("physnet2").unwrap()
        ));
    }

    #[test]
    fn test_duplicate_physical_network_rejected() {
        let err = resolver(&["physnet1:dvSwitch0", "physnet1:dvSwitch1"]).unwrap_err();
        assert!(matches!(err, DvsError::InvalidConfig { .. }));
    }

    #[test]
    fn test_empty_resolver() {
        let resolver = SwitchResolver::default();
        assert!(resolver.is_empty());
        assert!(resolver.mappings().is_empty());
    }
}
