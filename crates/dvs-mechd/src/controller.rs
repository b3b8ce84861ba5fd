//! SwitchController - idempotent port-group and port-lease operations on one
//! distributed switch.
//!
//! The controller holds no state of its own. Every operation reads what it
//! needs from the remote controller first, so any of them can be repeated
//! after a partial failure and converge on the same remote state.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use dvs_types::{Network, Port, Segment};
use dvs_vim::{
    DvPort, DvPortConfigSpec, FaultKind, ManagedEntity, PortCriteria, PortSetting, PortgroupConfigInfo,
    PortgroupConfigSpec, PortgroupRef, PortgroupType, SwitchRef, TaskInfo, TaskRef, VimResult,
    VimSession,
};

use crate::error::{DvsError, DvsResult};
use crate::naming::portgroup_name;

/// Port capacity of a newly created port-group.
pub const DVS_PORTS_NUMBER: u32 = 128;

/// Ports added when a port-group runs out of free ports.
pub const PORT_GROWTH_INCREMENT: u32 = 32;

/// Description stamped on port-groups owned by this driver.
pub const PORTGROUP_DESCRIPTION: &str = "Managed By Neutron";

/// Performs port-group and port operations against one named switch.
pub struct SwitchController {
    switch_name: String,
    session: Arc<dyn VimSession>,
}

impl std::fmt::Debug for SwitchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchController")
            .field("switch_name", &self.switch_name)
            .finish_non_exhaustive()
    }
}

impl SwitchController {
    /// Creates a controller for the switch called `switch_name`.
    pub fn new(switch_name: impl Into<String>, session: Arc<dyn VimSession>) -> Self {
        Self {
            switch_name: switch_name.into(),
            session,
        }
    }

    /// Returns the switch's display name.
    pub fn switch_name(&self) -> &str {
        &self.switch_name
    }

    /// Creates the port-group for `network` tagged with `segment`'s VLAN.
    ///
    /// Returns `false` if a port-group with the derived name already exists.
    #[instrument(skip(self, network, segment), fields(network_id = %network.id, switch = %self.switch_name))]
    pub async fn create_network(&self, network: &Network, segment: &Segment) -> DvsResult<bool> {
        let name = portgroup_name(network)?;
        let segmentation_id = segment
            .segmentation_id
            .as_ref()
            .ok_or_else(|| DvsError::invalid_segment(&segment.id, "no segmentation id"))?;
        let vlan = segmentation_id
            .to_vlan_id()
            .map_err(|e| DvsError::invalid_segment(&segment.id, e.to_string()))?;

        let dvs = self.find_switch().await?;

        let spec = PortgroupConfigSpec::new()
            .name(&name)
            .num_ports(DVS_PORTS_NUMBER)
            .portgroup_type(PortgroupType::Ephemeral)
            .description(PORTGROUP_DESCRIPTION)
            .default_port_config(
                PortSetting::new()
                    .vlan(vlan)
                    .blocked(!network.admin_state_up),
            );

        let started = self.session.create_portgroup(&dvs, &spec).await;
        match self.complete(started).await {
            Ok(_) => {
                info!(portgroup = %name, vlan = %vlan, "Created port group");
                Ok(true)
            }
            Err(e) if e.fault_kind() == Some(FaultKind::DuplicateName) => {
                info!(portgroup = %name, "Port group already exists");
                Ok(false)
            }
            Err(e) => Err(DvsError::switch_operation("create_portgroup", e)),
        }
    }

    /// Brings the port-group for `network` in line with its current state.
    ///
    /// `original` is the network as it was before the change, when known.
    /// The blocked flag is pushed only when the administrative state actually
    /// changed (or no previous state is known) and the remote value differs.
    /// A changed display name renames the port-group. Returns `false` if no
    /// reconfigure was needed.
    #[instrument(skip(self, network, original), fields(network_id = %network.id, switch = %self.switch_name))]
    pub async fn update_network(
        &self,
        network: &Network,
        original: Option<&Network>,
    ) -> DvsResult<bool> {
        let name = portgroup_name(network)?;
        let previous_name = original.and_then(|o| portgroup_name(o).ok());

        let dvs = self.find_switch().await?;

        let mut found = None;
        if let Some(previous) = previous_name.as_deref().filter(|p| *p != name) {
            found = self.find_portgroup(&dvs, previous).await?;
        }
        if found.is_none() {
            found = self.find_portgroup(&dvs, &name).await?;
        }
        let Some((portgroup, config)) = found else {
            return Err(DvsError::PortGroupNotFound {
                name,
                switch_name: self.switch_name.clone(),
            });
        };

        let desired_blocked = !network.admin_state_up;
        let admin_changed = original
            .map(|o| o.admin_state_up != network.admin_state_up)
            .unwrap_or(true);
        let push_blocked = admin_changed && config.is_blocked() != desired_blocked;
        let rename = config.name != name;

        if !push_blocked && !rename {
            debug!(portgroup = %name, "Port group already up to date");
            return Ok(false);
        }

        let mut spec = PortgroupConfigSpec::new().config_version(&config.config_version);
        if push_blocked {
            spec = spec.default_port_config(PortSetting::new().blocked(desired_blocked));
        }
        if rename {
            spec = spec.name(&name);
        }

        let started = self.session.reconfigure_portgroup(&portgroup, &spec).await;
        self.complete(started)
            .await
            .map_err(|e| DvsError::switch_operation("reconfigure_portgroup", e))?;

        info!(
            portgroup = %name,
            blocked = desired_blocked,
            renamed_from = rename.then_some(config.name.as_str()),
            "Updated port group"
        );
        Ok(true)
    }

    /// Destroys the port-group for `network`.
    ///
    /// Returns `false` if it was already gone.
    #[instrument(skip(self, network), fields(network_id = %network.id, switch = %self.switch_name))]
    pub async fn delete_network(&self, network: &Network) -> DvsResult<bool> {
        let name = portgroup_name(network)?;
        let dvs = self.find_switch().await?;

        let Some((portgroup, _)) = self.find_portgroup(&dvs, &name).await? else {
            info!(portgroup = %name, "Port group already absent");
            return Ok(false);
        };

        let started = self.session.destroy_portgroup(&portgroup).await;
        match self.complete(started).await {
            Ok(_) => {
                info!(portgroup = %name, "Deleted port group");
                Ok(true)
            }
            Err(e) if e.fault_kind() == Some(FaultKind::NotFound) => {
                info!(portgroup = %name, "Port group vanished before destroy");
                Ok(false)
            }
            Err(e) => Err(DvsError::switch_operation("destroy_portgroup", e)),
        }
    }

    /// Leases a port in `network`'s port-group to `port` and returns its key.
    ///
    /// The lease writes the port's blocked flag as the negation of its
    /// administrative state. A port already leased to `port` is returned as
    /// is. When the group has no free port left it is grown once by
    /// [`PORT_GROWTH_INCREMENT`].
    #[instrument(skip(self, network, port), fields(network_id = %network.id, port_id = %port.id, switch = %self.switch_name))]
    pub async fn book_port(&self, network: &Network, port: &Port) -> DvsResult<String> {
        let port_id = port.id.as_str();
        let name = portgroup_name(network)?;
        let dvs = self.find_switch().await?;

        let Some((portgroup, config)) = self.find_portgroup(&dvs, &name).await? else {
            return Err(DvsError::PortGroupNotFound {
                name,
                switch_name: self.switch_name.clone(),
            });
        };

        let ports = self.portgroup_ports(&dvs, &config.key).await?;
        if let Some(leased) = ports.iter().find(|p| p.is_leased_to(port_id)) {
            debug!(port_key = %leased.key, "Port already booked");
            return Ok(leased.key.clone());
        }

        let free = match ports.into_iter().find(DvPort::is_free) {
            Some(port) => Some(port),
            None => {
                self.grow_portgroup(&portgroup, &config).await?;
                self.portgroup_ports(&dvs, &config.key)
                    .await?
                    .into_iter()
                    .find(DvPort::is_free)
            }
        };
        let Some(free) = free else {
            return Err(DvsError::PortLeaseUnavailable {
                portgroup: name,
                port_id: port_id.to_string(),
            });
        };

        let blocked = !port.admin_state_up;
        let spec = DvPortConfigSpec::edit(&free.key)
            .name(port_id)
            .setting(PortSetting::new().blocked(blocked))
            .config_version(&free.config_version);
        let started = self.session.reconfigure_ports(&dvs, &[spec]).await;
        self.complete(started)
            .await
            .map_err(|e| DvsError::switch_operation("reconfigure_ports", e))?;

        info!(port_key = %free.key, blocked, "Booked port");
        Ok(free.key)
    }

    /// Releases the port leased to `port`, if any, and unblocks it for the
    /// next lease holder.
    ///
    /// Returns `false` if the port held no lease.
    #[instrument(skip(self, port), fields(port_id = %port.id, switch = %self.switch_name))]
    pub async fn release_port(&self, port: &Port) -> DvsResult<bool> {
        let dvs = self.find_switch().await?;

        let Some(leased) = self.leased_port(&dvs, &port.id).await? else {
            debug!("Port holds no lease");
            return Ok(false);
        };

        let spec = DvPortConfigSpec::edit(&leased.key)
            .name("")
            .setting(PortSetting::new().blocked(false))
            .config_version(&leased.config_version);
        let started = self.session.reconfigure_ports(&dvs, &[spec]).await;
        self.complete(started)
            .await
            .map_err(|e| DvsError::switch_operation("reconfigure_ports", e))?;

        info!(port_key = %leased.key, "Released port");
        Ok(true)
    }

    /// Sets the blocked flag of the port leased to `port` to the negation of
    /// its administrative state.
    ///
    /// Returns `false` if the port holds no lease or already matches.
    #[instrument(skip(self, port), fields(port_id = %port.id, switch = %self.switch_name))]
    pub async fn switch_port_blocked_state(&self, port: &Port) -> DvsResult<bool> {
        let dvs = self.find_switch().await?;

        let Some(leased) = self.leased_port(&dvs, &port.id).await? else {
            warn!("Port holds no lease, blocked state not changed");
            return Ok(false);
        };

        let blocked = !port.admin_state_up;
        if leased.blocked == blocked {
            debug!(port_key = %leased.key, blocked, "Port blocked state already matches");
            return Ok(false);
        }

        let spec = DvPortConfigSpec::edit(&leased.key)
            .setting(PortSetting::new().blocked(blocked))
            .config_version(&leased.config_version);
        let started = self.session.reconfigure_ports(&dvs, &[spec]).await;
        self.complete(started)
            .await
            .map_err(|e| DvsError::switch_operation("reconfigure_ports", e))?;

        info!(port_key = %leased.key, blocked, "Changed port blocked state");
        Ok(true)
    }

    /// Finds this controller's switch among every datacenter's network folder.
    async fn find_switch(&self) -> DvsResult<SwitchRef> {
        let datacenters = self
            .session
            .datacenters()
            .await
            .map_err(|e| DvsError::switch_operation("datacenters", e))?;

        for datacenter in &datacenters {
            let folder = self
                .session
                .network_folder(datacenter)
                .await
                .map_err(|e| DvsError::switch_operation("network_folder", e))?;
            let children = self
                .session
                .child_entities(&folder)
                .await
                .map_err(|e| DvsError::switch_operation("child_entities", e))?;

            for entity in &children {
                let Some(dvs) = entity.as_switch() else {
                    continue;
                };
                let name = self
                    .session
                    .entity_name(entity)
                    .await
                    .map_err(|e| DvsError::switch_operation("entity_name", e))?;
                if name == self.switch_name {
                    return Ok(dvs);
                }
            }
        }

        Err(DvsError::SwitchNotFound {
            switch_name: self.switch_name.clone(),
        })
    }

    async fn find_portgroup(
        &self,
        dvs: &SwitchRef,
        name: &str,
    ) -> DvsResult<Option<(PortgroupRef, PortgroupConfigInfo)>> {
        let portgroups = self
            .session
            .switch_portgroups(dvs)
            .await
            .map_err(|e| DvsError::switch_operation("switch_portgroups", e))?;

        for portgroup in portgroups {
            let entity_name = self
                .session
                .entity_name(&ManagedEntity::from(&portgroup))
                .await
                .map_err(|e| DvsError::switch_operation("entity_name", e))?;
            if entity_name != name {
                continue;
            }
            let config = self
                .session
                .portgroup_config(&portgroup)
                .await
                .map_err(|e| DvsError::switch_operation("portgroup_config", e))?;
            return Ok(Some((portgroup, config)));
        }

        Ok(None)
    }

    async fn portgroup_ports(&self, dvs: &SwitchRef, portgroup_key: &str) -> DvsResult<Vec<DvPort>> {
        self.session
            .fetch_ports(dvs, &PortCriteria::in_portgroup(portgroup_key))
            .await
            .map_err(|e| DvsError::switch_operation("fetch_ports", e))
    }

    async fn leased_port(&self, dvs: &SwitchRef, port_id: &str) -> DvsResult<Option<DvPort>> {
        let ports = self
            .session
            .fetch_ports(dvs, &PortCriteria::all())
            .await
            .map_err(|e| DvsError::switch_operation("fetch_ports", e))?;
        Ok(ports.into_iter().find(|p| p.is_leased_to(port_id)))
    }

    async fn grow_portgroup(
        &self,
        portgroup: &PortgroupRef,
        config: &PortgroupConfigInfo,
    ) -> DvsResult<()> {
        let num_ports = config.num_ports.saturating_add(PORT_GROWTH_INCREMENT);
        let spec = PortgroupConfigSpec::new()
            .num_ports(num_ports)
            .config_version(&config.config_version);

        let started = self.session.reconfigure_portgroup(portgroup, &spec).await;
        self.complete(started)
            .await
            .map_err(|e| DvsError::switch_operation("reconfigure_portgroup", e))?;

        info!(portgroup = %config.name, num_ports, "Grew port group");
        Ok(())
    }

    /// Waits for a started task.
    async fn complete(&self, started: VimResult<TaskRef>) -> VimResult<TaskInfo> {
        let task = started?;
        self.session.wait_for_task(&task).await
    }
}

