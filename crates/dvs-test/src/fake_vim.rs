//! In-memory switch controller.
//!
//! `FakeVim` keeps datacenters, switches, port-groups and ports in memory and
//! behaves like the real controller where the driver depends on it:
//! duplicate port-group names fail the create task, reconfigures are checked
//! against the config version, and destroying a missing object faults.
//!
//! Every call is recorded, and failures can be queued per method.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

use dvs_vim::{
    DatacenterRef, DvPort, DvPortConfigSpec, EntityType, FaultKind, FolderRef, ManagedEntity,
    PortCriteria, PortSetting, PortgroupConfigInfo, PortgroupConfigSpec, PortgroupRef,
    PortgroupType, SwitchRef, TaskInfo, TaskRef, VimError, VimResult, VimSession,
};

/// Methods that change remote state.
const MUTATING_METHODS: &[&str] = &[
    "create_portgroup",
    "reconfigure_portgroup",
    "destroy_portgroup",
    "reconfigure_ports",
];

#[derive(Debug, Clone)]
struct FakeDatacenter {
    moref: String,
    folder: String,
}

#[derive(Debug, Clone)]
struct FakeSwitch {
    name: String,
    datacenter: String,
}

#[derive(Debug, Clone)]
struct FakePortgroup {
    switch: String,
    name: String,
    num_ports: u32,
    portgroup_type: PortgroupType,
    description: Option<String>,
    default_port_config: PortSetting,
    config_version: u64,
}

#[derive(Debug, Clone)]
struct FakePort {
    switch: String,
    portgroup: String,
    name: Option<String>,
    blocked: bool,
    config_version: u64,
}

#[derive(Debug, Default)]
struct State {
    datacenters: Vec<FakeDatacenter>,
    switches: BTreeMap<String, FakeSwitch>,
    /// Standard networks, keyed by moref, with their datacenter and name.
    networks: BTreeMap<String, (String, String)>,
    portgroups: BTreeMap<String, FakePortgroup>,
    ports: BTreeMap<String, FakePort>,
    tasks: HashMap<String, VimResult<TaskInfo>>,
    failures: HashMap<String, VecDeque<VimError>>,
    calls: Vec<String>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_datacenter(&mut self) -> String {
        let id = self.next_id();
        let moref = format!("datacenter-{}", id);
        let folder = format!("group-n{}", id);
        let network = format!("network-{}", id);
        self.networks
            .insert(network, (moref.clone(), "VM Network".to_string()));
        self.datacenters.push(FakeDatacenter {
            moref: moref.clone(),
            folder,
        });
        moref
    }

    fn add_ports(&mut self, switch: &str, portgroup: &str, count: u32, blocked: bool) {
        for _ in 0..count {
            let key = self.next_id().to_string();
            self.ports.insert(
                key,
                FakePort {
                    switch: switch.to_string(),
                    portgroup: portgroup.to_string(),
                    name: None,
                    blocked,
                    config_version: 1,
                },
            );
        }
    }

    fn finish_task(&mut self, outcome: VimResult<Option<String>>) -> TaskRef {
        let task = TaskRef::new(format!("task-{}", self.next_id()));
        let result = outcome.map(|created| {
            let info = TaskInfo::new(task.clone());
            match created {
                Some(key) => info.with_result(key),
                None => info,
            }
        });
        self.tasks.insert(task.as_str().to_string(), result);
        task
    }

    fn portgroup_info(&self, key: &str) -> Option<PortgroupConfigInfo> {
        self.portgroups.get(key).map(|pg| PortgroupConfigInfo {
            key: key.to_string(),
            name: pg.name.clone(),
            num_ports: pg.num_ports,
            portgroup_type: pg.portgroup_type,
            description: pg.description.clone(),
            default_port_config: pg.default_port_config,
            config_version: pg.config_version.to_string(),
        })
    }

    fn portgroup_key_by_name(&self, name: &str) -> Option<String> {
        self.portgroups
            .iter()
            .find(|(_, pg)| pg.name == name)
            .map(|(key, _)| key.clone())
    }

    fn dv_port(key: &str, port: &FakePort) -> DvPort {
        DvPort {
            key: key.to_string(),
            portgroup_key: port.portgroup.clone(),
            name: port.name.clone(),
            blocked: port.blocked,
            config_version: port.config_version.to_string(),
        }
    }
}

fn stale(task: &str) -> VimError {
    VimError::task_failed(
        task,
        FaultKind::ConcurrentAccess,
        "The object has been modified since the version was read",
    )
}

fn version_matches(expected: &Option<String>, current: u64) -> bool {
    expected
        .as_deref()
        .map(|v| v == current.to_string())
        .unwrap_or(true)
}

/// In-memory [`VimSession`].
#[derive(Debug)]
pub struct FakeVim {
    state: Mutex<State>,
}

impl Default for FakeVim {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVim {
    /// Creates a controller with one empty datacenter.
    pub fn new() -> Self {
        let mut state = State::default();
        state.add_datacenter();
        Self {
            state: Mutex::new(state),
        }
    }

    /// Adds another datacenter; later switches are placed in it.
    pub fn with_datacenter(self) -> Self {
        self.state.lock().add_datacenter();
        self
    }

    /// Adds a switch to the most recently added datacenter.
    pub fn with_switch(self, name: &str) -> Self {
        self.add_switch(name);
        self
    }

    /// Adds a switch to the most recently added datacenter and returns it.
    pub fn add_switch(&self, name: &str) -> SwitchRef {
        let mut state = self.state.lock();
        let datacenter = state
            .datacenters
            .last()
            .map(|dc| dc.moref.clone())
            .unwrap_or_default();
        let moref = format!("dvs-{}", state.next_id());
        state.switches.insert(
            moref.clone(),
            FakeSwitch {
                name: name.to_string(),
                datacenter,
            },
        );
        SwitchRef::new(moref)
    }

    /// Makes the next `method` call fail with `error`.
    ///
    /// Queued failures are consumed in order. The failing call has no effect.
    pub fn fail_next(&self, method: &str, error: VimError) {
        self.state
            .lock()
            .failures
            .entry(method.to_string())
            .or_default()
            .push_back(error);
    }

    /// Bumps a port-group's config version, as a concurrent editor would.
    pub fn touch_portgroup(&self, name: &str) {
        let mut state = self.state.lock();
        if let Some(key) = state.portgroup_key_by_name(name) {
            if let Some(pg) = state.portgroups.get_mut(&key) {
                pg.config_version += 1;
            }
        }
    }

    /// Leases every free port of a port-group to placeholder owners.
    pub fn occupy_all_ports(&self, portgroup_name: &str) {
        let mut state = self.state.lock();
        let Some(key) = state.portgroup_key_by_name(portgroup_name) else {
            return;
        };
        for (port_key, port) in state.ports.iter_mut() {
            if port.portgroup == key && port.name.is_none() {
                port.name = Some(format!("occupant-{}", port_key));
            }
        }
    }

    /// Returns every recorded call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Returns how often `method` was called.
    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.as_str() == method)
            .count()
    }

    /// Returns how many calls could have changed remote state.
    pub fn mutation_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| MUTATING_METHODS.contains(&c.as_str()))
            .count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Returns the names of all port-groups.
    pub fn portgroup_names(&self) -> Vec<String> {
        self.state
            .lock()
            .portgroups
            .values()
            .map(|pg| pg.name.clone())
            .collect()
    }

    /// Returns a port-group's configuration by name.
    pub fn portgroup(&self, name: &str) -> Option<PortgroupConfigInfo> {
        let state = self.state.lock();
        let key = state.portgroup_key_by_name(name)?;
        state.portgroup_info(&key)
    }

    /// Returns the ports of a port-group by name.
    pub fn ports_of(&self, portgroup_name: &str) -> Vec<DvPort> {
        let state = self.state.lock();
        let Some(key) = state.portgroup_key_by_name(portgroup_name) else {
            return Vec::new();
        };
        state
            .ports
            .iter()
            .filter(|(_, p)| p.portgroup == key)
            .map(|(k, p)| State::dv_port(k, p))
            .collect()
    }

    /// Returns the port leased to `port_id`, if any.
    pub fn leased_port(&self, port_id: &str) -> Option<DvPort> {
        let state = self.state.lock();
        state
            .ports
            .iter()
            .find(|(_, p)| p.name.as_deref() == Some(port_id))
            .map(|(k, p)| State::dv_port(k, p))
    }

    /// Records the call and pops a queued failure for it.
    fn enter(&self, state: &mut State, method: &str) -> VimResult<()> {
        debug!(method, "fake vim call");
        state.calls.push(method.to_string());
        match state.failures.get_mut(method).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VimSession for FakeVim {
    async fn datacenters(&self) -> VimResult<Vec<DatacenterRef>> {
        let mut state = self.state.lock();
        self.enter(&mut state, "datacenters")?;
        Ok(state
            .datacenters
            .iter()
            .map(|dc| DatacenterRef::new(&dc.moref))
            .collect())
    }

    async fn network_folder(&self, datacenter: &DatacenterRef) -> VimResult<FolderRef> {
        let mut state = self.state.lock();
        self.enter(&mut state, "network_folder")?;
        state
            .datacenters
            .iter()
            .find(|dc| dc.moref == datacenter.as_str())
            .map(|dc| FolderRef::new(&dc.folder))
            .ok_or_else(|| VimError::fault(FaultKind::NotFound, datacenter.to_string()))
    }

    async fn child_entities(&self, folder: &FolderRef) -> VimResult<Vec<ManagedEntity>> {
        let mut state = self.state.lock();
        self.enter(&mut state, "child_entities")?;
        let datacenter = state
            .datacenters
            .iter()
            .find(|dc| dc.folder == folder.as_str())
            .map(|dc| dc.moref.clone())
            .ok_or_else(|| VimError::fault(FaultKind::NotFound, folder.to_string()))?;

        let mut children: Vec<ManagedEntity> = state
            .networks
            .iter()
            .filter(|(_, (dc, _))| *dc == datacenter)
            .map(|(moref, _)| ManagedEntity::new(EntityType::Other("Network".to_string()), moref))
            .collect();
        for (moref, switch) in &state.switches {
            if switch.datacenter != datacenter {
                continue;
            }
            children.push(ManagedEntity::new(EntityType::DistributedSwitch, moref));
            children.extend(
                state
                    .portgroups
                    .iter()
                    .filter(|(_, pg)| pg.switch == *moref)
                    .map(|(key, _)| ManagedEntity::new(EntityType::Portgroup, key)),
            );
        }
        Ok(children)
    }

    async fn entity_name(&self, entity: &ManagedEntity) -> VimResult<String> {
        let mut state = self.state.lock();
        self.enter(&mut state, "entity_name")?;
        let name = match entity.entity_type {
            EntityType::DistributedSwitch => {
                state.switches.get(&entity.value).map(|s| s.name.clone())
            }
            EntityType::Portgroup => state.portgroups.get(&entity.value).map(|p| p.name.clone()),
            _ => state.networks.get(&entity.value).map(|(_, n)| n.clone()),
        };
        name.ok_or_else(|| VimError::fault(FaultKind::NotFound, entity.value.clone()))
    }

    async fn switch_portgroups(&self, switch: &SwitchRef) -> VimResult<Vec<PortgroupRef>> {
        let mut state = self.state.lock();
        self.enter(&mut state, "switch_portgroups")?;
        if !state.switches.contains_key(switch.as_str()) {
            return Err(VimError::fault(FaultKind::NotFound, switch.to_string()));
        }
        Ok(state
            .portgroups
            .iter()
            .filter(|(_, pg)| pg.switch == switch.as_str())
            .map(|(key, _)| PortgroupRef::new(key))
            .collect())
    }

    async fn portgroup_config(&self, portgroup: &PortgroupRef) -> VimResult<PortgroupConfigInfo> {
        let mut state = self.state.lock();
        self.enter(&mut state, "portgroup_config")?;
        state
            .portgroup_info(portgroup.as_str())
            .ok_or_else(|| VimError::fault(FaultKind::NotFound, portgroup.to_string()))
    }

    async fn create_portgroup(
        &self,
        switch: &SwitchRef,
        spec: &PortgroupConfigSpec,
    ) -> VimResult<TaskRef> {
        let mut state = self.state.lock();
        self.enter(&mut state, "create_portgroup")?;
        if !state.switches.contains_key(switch.as_str()) {
            return Err(VimError::fault(FaultKind::NotFound, switch.to_string()));
        }
        let name = spec
            .name
            .clone()
            .ok_or_else(|| VimError::fault(FaultKind::InvalidArgument, "name"))?;

        if state.portgroup_key_by_name(&name).is_some() {
            let outcome = Err(VimError::task_failed(
                "create_portgroup",
                FaultKind::DuplicateName,
                format!("The name '{}' already exists", name),
            ));
            return Ok(state.finish_task(outcome));
        }

        let key = format!("dvportgroup-{}", state.next_id());
        let num_ports = spec.num_ports.unwrap_or(0);
        let default_port_config = spec.default_port_config.unwrap_or_default();
        state.portgroups.insert(
            key.clone(),
            FakePortgroup {
                switch: switch.as_str().to_string(),
                name,
                num_ports,
                portgroup_type: spec.portgroup_type.unwrap_or_default(),
                description: spec.description.clone(),
                default_port_config,
                config_version: 1,
            },
        );
        state.add_ports(
            switch.as_str(),
            &key,
            num_ports,
            default_port_config.is_blocked(),
        );
        Ok(state.finish_task(Ok(Some(key))))
    }

    async fn reconfigure_portgroup(
        &self,
        portgroup: &PortgroupRef,
        spec: &PortgroupConfigSpec,
    ) -> VimResult<TaskRef> {
        let mut state = self.state.lock();
        self.enter(&mut state, "reconfigure_portgroup")?;
        let Some(current) = state.portgroups.get(portgroup.as_str()).cloned() else {
            return Err(VimError::fault(FaultKind::NotFound, portgroup.to_string()));
        };
        if !version_matches(&spec.config_version, current.config_version) {
            let outcome = Err(stale("reconfigure_portgroup"));
            return Ok(state.finish_task(outcome));
        }

        let mut updated = current.clone();
        if let Some(name) = &spec.name {
            updated.name = name.clone();
        }
        if let Some(setting) = spec.default_port_config {
            if setting.vlan.is_some() {
                updated.default_port_config.vlan = setting.vlan;
            }
            if setting.blocked.is_some() {
                updated.default_port_config.blocked = setting.blocked;
            }
        }
        if let Some(description) = &spec.description {
            updated.description = Some(description.clone());
        }
        updated.config_version += 1;

        let grow = spec
            .num_ports
            .map(|n| n.saturating_sub(current.num_ports))
            .unwrap_or(0);
        if let Some(num_ports) = spec.num_ports {
            updated.num_ports = num_ports;
        }
        let blocked = updated.default_port_config.is_blocked();
        state
            .portgroups
            .insert(portgroup.as_str().to_string(), updated);
        state.add_ports(&current.switch, portgroup.as_str(), grow, blocked);

        Ok(state.finish_task(Ok(None)))
    }

    async fn destroy_portgroup(&self, portgroup: &PortgroupRef) -> VimResult<TaskRef> {
        let mut state = self.state.lock();
        self.enter(&mut state, "destroy_portgroup")?;
        if state.portgroups.remove(portgroup.as_str()).is_none() {
            let outcome = Err(VimError::task_failed(
                "destroy_portgroup",
                FaultKind::NotFound,
                format!("{} has already been deleted", portgroup),
            ));
            return Ok(state.finish_task(outcome));
        }
        state.ports.retain(|_, p| p.portgroup != portgroup.as_str());
        Ok(state.finish_task(Ok(None)))
    }

    async fn fetch_ports(
        &self,
        switch: &SwitchRef,
        criteria: &PortCriteria,
    ) -> VimResult<Vec<DvPort>> {
        let mut state = self.state.lock();
        self.enter(&mut state, "fetch_ports")?;
        Ok(state
            .ports
            .iter()
            .filter(|(_, p)| p.switch == switch.as_str())
            .map(|(k, p)| State::dv_port(k, p))
            .filter(|p| criteria.matches(p))
            .collect())
    }

    async fn reconfigure_ports(
        &self,
        switch: &SwitchRef,
        specs: &[DvPortConfigSpec],
    ) -> VimResult<TaskRef> {
        let mut state = self.state.lock();
        self.enter(&mut state, "reconfigure_ports")?;

        for spec in specs {
            let Some(port) = state.ports.get(&spec.key) else {
                return Err(VimError::fault(FaultKind::NotFound, spec.key.clone()));
            };
            if port.switch != switch.as_str() {
                return Err(VimError::fault(FaultKind::InvalidArgument, spec.key.clone()));
            }
            if !version_matches(&spec.config_version, port.config_version) {
                let outcome = Err(stale("reconfigure_ports"));
                return Ok(state.finish_task(outcome));
            }
        }

        for spec in specs {
            if let Some(port) = state.ports.get_mut(&spec.key) {
                if let Some(name) = &spec.name {
                    port.name = (!name.is_empty()).then(|| name.clone());
                }
                if let Some(blocked) = spec.setting.and_then(|s| s.blocked) {
                    port.blocked = blocked.value;
                }
                port.config_version += 1;
            }
        }
        Ok(state.finish_task(Ok(None)))
    }

    async fn wait_for_task(&self, task: &TaskRef) -> VimResult<TaskInfo> {
        let mut state = self.state.lock();
        self.enter(&mut state, "wait_for_task")?;
        state
            .tasks
            .remove(task.as_str())
            .unwrap_or_else(|| Err(VimError::unexpected(format!("unknown task {}", task))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvs_types::VlanId;
    use pretty_assertions::assert_eq;

    fn spec(name: &str) -> PortgroupConfigSpec {
        PortgroupConfigSpec::new()
            .name(name)
            .num_ports(4)
            .default_port_config(PortSetting::new().vlan(VlanId::new(100).unwrap()).blocked(false))
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let vim = FakeVim::new();
        let dvs = vim.add_switch("dvSwitch0");

        let task = vim.create_portgroup(&dvs, &spec("pg-a")).await.unwrap();
        let info = vim.wait_for_task(&task).await.unwrap();
        assert!(info.result.is_some());

        let pg = vim.portgroup("pg-a").unwrap();
        assert_eq!(pg.num_ports, 4);
        assert_eq!(pg.config_version, "1");
        assert_eq!(vim.ports_of("pg-a").len(), 4);
        assert_eq!(vim.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_fails_task() {
        let vim = FakeVim::new();
        let dvs = vim.add_switch("dvSwitch0");
        let task = vim.create_portgroup(&dvs, &spec("pg-a")).await.unwrap();
        vim.wait_for_task(&task).await.unwrap();

        let task = vim.create_portgroup(&dvs, &spec("pg-a")).await.unwrap();
        let err = vim.wait_for_task(&task).await.unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::DuplicateName));
        assert_eq!(vim.portgroup_names(), vec!["pg-a".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_version_rejected() {
        let vim = FakeVim::new();
        let dvs = vim.add_switch("dvSwitch0");
        let task = vim.create_portgroup(&dvs, &spec("pg-a")).await.unwrap();
        let key = vim.wait_for_task(&task).await.unwrap().result.unwrap();
        vim.touch_portgroup("pg-a");

        let reconfigure = PortgroupConfigSpec::new().config_version("1").num_ports(8);
        let task = vim
            .reconfigure_portgroup(&PortgroupRef::new(key), &reconfigure)
            .await
            .unwrap();
        let err = vim.wait_for_task(&task).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(vim.portgroup("pg-a").unwrap().num_ports, 4);
    }

    #[tokio::test]
    async fn test_injected_failure_has_no_effect() {
        let vim = FakeVim::new();
        let dvs = vim.add_switch("dvSwitch0");
        vim.fail_next("create_portgroup", VimError::connection("reset"));

        assert!(vim.create_portgroup(&dvs, &spec("pg-a")).await.is_err());
        assert!(vim.portgroup_names().is_empty());
        assert!(vim.create_portgroup(&dvs, &spec("pg-a")).await.is_ok());
        assert_eq!(vim.call_count("create_portgroup"), 2);
    }

    #[tokio::test]
    async fn test_child_entities_include_foreign_networks() {
        let vim = FakeVim::new().with_switch("dvSwitch0");
        let folder = vim
            .network_folder(&vim.datacenters().await.unwrap()[0])
            .await
            .unwrap();
        let children = vim.child_entities(&folder).await.unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children.iter().filter(|c| c.as_switch().is_some()).count(), 1);
    }
}
