//! The remote session seam.
//!
//! A [`VimSession`] owns the connection, login and wire encoding. Calls that
//! mutate remote state return a [`TaskRef`]; the caller decides when to block
//! on it with [`VimSession::wait_for_task`].

use crate::api::{DvPort, DvPortConfigSpec, PortCriteria, PortgroupConfigInfo, PortgroupConfigSpec};
use crate::error::VimResult;
use crate::types::{DatacenterRef, FolderRef, ManagedEntity, PortgroupRef, SwitchRef, TaskRef};
use async_trait::async_trait;

/// Result of a task that completed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub task: TaskRef,
    /// Key of the object the task created, if it created one.
    pub result: Option<String>,
}

impl TaskInfo {
    pub fn new(task: TaskRef) -> Self {
        Self { task, result: None }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }
}

/// An authenticated session with the remote switch controller.
///
/// Implementations must be shareable across concurrent lifecycle hooks.
/// Transport failures surface as retryable [`crate::VimError`]s; the session
/// does not retry on its own beyond whatever its own tunables specify.
#[async_trait]
pub trait VimSession: Send + Sync {
    /// Lists all datacenters visible to the session.
    async fn datacenters(&self) -> VimResult<Vec<DatacenterRef>>;

    /// Returns the folder holding a datacenter's networks and switches.
    async fn network_folder(&self, datacenter: &DatacenterRef) -> VimResult<FolderRef>;

    /// Lists the direct children of a folder.
    async fn child_entities(&self, folder: &FolderRef) -> VimResult<Vec<ManagedEntity>>;

    /// Reads an entity's display name.
    async fn entity_name(&self, entity: &ManagedEntity) -> VimResult<String>;

    /// Lists the port-groups of a switch.
    async fn switch_portgroups(&self, switch: &SwitchRef) -> VimResult<Vec<PortgroupRef>>;

    /// Reads a port-group's current configuration.
    async fn portgroup_config(&self, portgroup: &PortgroupRef) -> VimResult<PortgroupConfigInfo>;

    /// Starts creating a port-group on a switch.
    async fn create_portgroup(
        &self,
        switch: &SwitchRef,
        spec: &PortgroupConfigSpec,
    ) -> VimResult<TaskRef>;

    /// Starts reconfiguring a port-group.
    async fn reconfigure_portgroup(
        &self,
        portgroup: &PortgroupRef,
        spec: &PortgroupConfigSpec,
    ) -> VimResult<TaskRef>;

    /// Starts destroying a port-group.
    async fn destroy_portgroup(&self, portgroup: &PortgroupRef) -> VimResult<TaskRef>;

    /// Lists the ports of a switch matching `criteria`.
    async fn fetch_ports(&self, switch: &SwitchRef, criteria: &PortCriteria)
        -> VimResult<Vec<DvPort>>;

    /// Starts reconfiguring individual ports.
    async fn reconfigure_ports(
        &self,
        switch: &SwitchRef,
        specs: &[DvPortConfigSpec],
    ) -> VimResult<TaskRef>;

    /// Blocks until the task completes. A failed task is returned as
    /// [`crate::VimError::TaskFailed`].
    async fn wait_for_task(&self, task: &TaskRef) -> VimResult<TaskInfo>;
}
