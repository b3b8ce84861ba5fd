//! DvsMechanismDriver - the binding reconciler.
//!
//! Each lifecycle hook resolves the switch for the object's network, runs
//! the matching controller operation under the retry policy, and sorts the
//! result into an outcome or an error for the orchestrator.
//!
//! Network hooks treat an unmapped or non-VLAN network as not ours. Port
//! hooks first check that the workload runs on the managed hypervisor; once
//! that holds, an unmapped network is an inconsistency and is reported.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use dvs_orch_common::{
    HookOutcome, HypervisorDirectory, MechanismDriver, NetworkContext, PortContext, RetryPolicy,
};
use dvs_types::{NetworkType, Port, PortStatus, VifDetails, VifType};
use dvs_vim::VimSession;

use crate::config::DvsConfig;
use crate::controller::SwitchController;
use crate::error::{DvsError, DvsResult, ErrorClass};
use crate::hypervisor::{Eligibility, HypervisorGate};
use crate::resolver::SwitchResolver;

/// Name under which the driver registers with the orchestrator.
pub const DRIVER_NAME: &str = "vmware_dvs";

/// Outcome of resolving a switch for a hook.
enum Lookup<'a> {
    Managed(&'a SwitchController),
    Skip(HookOutcome),
}

/// Mechanism driver for distributed virtual switches.
pub struct DvsMechanismDriver {
    resolver: SwitchResolver,
    gate: HypervisorGate,
    retry: RetryPolicy,
    vif_type: VifType,
    vif_details: VifDetails,
}

impl DvsMechanismDriver {
    /// Creates a driver from its parts.
    pub fn new(resolver: SwitchResolver, gate: HypervisorGate, retry: RetryPolicy) -> Self {
        Self {
            resolver,
            gate,
            retry,
            vif_type: VifType::Dvs,
            vif_details: VifDetails::default(),
        }
    }

    /// Builds a driver from validated configuration.
    pub fn from_config(
        config: &DvsConfig,
        session: Arc<dyn VimSession>,
        directory: Arc<dyn HypervisorDirectory>,
    ) -> DvsResult<Self> {
        config.validate()?;
        let resolver = SwitchResolver::from_mappings(&config.network_mappings()?, session)?;
        let gate = HypervisorGate::new(directory, &config.binding.managed_hypervisor_type);

        info!(
            mappings = resolver.len(),
            managed_hypervisor_type = %config.binding.managed_hypervisor_type,
            "Initialized DVS mechanism driver"
        );

        Ok(Self::new(resolver, gate, config.retry_policy())
            .with_vif_type(VifType::from(config.binding.vif_type.as_str())))
    }

    /// Overrides the VIF type reported on bindings.
    pub fn with_vif_type(mut self, vif_type: VifType) -> Self {
        self.vif_type = vif_type;
        self
    }

    /// Returns the switch resolver.
    pub fn resolver(&self) -> &SwitchResolver {
        &self.resolver
    }

    /// Returns the retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Resolves the switch for a network hook. Unmanaged networks are
    /// logged and skipped.
    fn network_switch(&self, ctx: &dyn NetworkContext, action: &str) -> DvsResult<Lookup<'_>> {
        match self.resolver.resolve(ctx.network_segments()) {
            Ok(controller) => Ok(Lookup::Managed(controller)),
            Err(e) if e.class() == ErrorClass::Unmanaged => {
                info!(network_id = %ctx.current().id, reason = %e, "Network not {}", action);
                Ok(Lookup::Skip(HookOutcome::unmanaged(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }

    /// Resolves the switch for a port hook on an eligible port.
    ///
    /// A non-VLAN network is skipped; a VLAN network without switch mapping
    /// is an inconsistency.
    fn port_switch(&self, ctx: &dyn PortContext, action: &str) -> DvsResult<Lookup<'_>> {
        let network = ctx.network();
        match self.resolver.resolve(network.network_segments()) {
            Ok(controller) => Ok(Lookup::Managed(controller)),
            Err(DvsError::NoControllerForPhysicalNetwork { .. }) => {
                Err(DvsError::invalid_system_state(format!(
                    "Port {} belongs to a VMware VM, but there is no mapping from network {} to a DVS",
                    ctx.current().id,
                    network.current().id
                )))
            }
            Err(e) if e.class() == ErrorClass::Unmanaged => {
                info!(port_id = %ctx.current().id, reason = %e, "Port not {}", action);
                Ok(Lookup::Skip(HookOutcome::unmanaged(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }

    /// Runs the hypervisor gate, retrying directory outages.
    async fn eligibility(&self, port: &Port) -> DvsResult<Eligibility> {
        let eligibility = self
            .retry
            .run("lookup_hypervisor", || self.gate.check(port))
            .await?;
        if let Eligibility::NotManaged { reason } = &eligibility {
            debug!(port_id = %port.id, %reason, "Port not handled by this driver");
        }
        Ok(eligibility)
    }

    /// Books a switch port for an unbound port and reports the binding.
    async fn bind(&self, ctx: &dyn PortContext) -> DvsResult<HookOutcome> {
        let port = ctx.current();
        if !port.is_unbound() {
            debug!(port_id = %port.id, vif_type = %port.vif_type, "Port already bound");
            return Ok(HookOutcome::NoChange);
        }

        let controller = match self.port_switch(ctx, "bound")? {
            Lookup::Managed(controller) => controller,
            Lookup::Skip(outcome) => return Ok(outcome),
        };
        let network = ctx.network();
        let Some(segment) = network.network_segments().first() else {
            return Err(DvsError::MissingSegment);
        };

        let port_key = self
            .retry
            .run("book_port", || controller.book_port(network.current(), port))
            .await?;

        ctx.set_binding(
            &segment.id,
            self.vif_type.clone(),
            self.vif_details.clone().with_port_key(port_key.clone()),
            PortStatus::Active,
        );
        info!(port_id = %port.id, segment_id = %segment.id, port_key = %port_key, "Bound port");
        Ok(HookOutcome::Applied)
    }
}

fn changed(applied: bool) -> HookOutcome {
    if applied {
        HookOutcome::Applied
    } else {
        HookOutcome::NoChange
    }
}

#[async_trait]
impl MechanismDriver for DvsMechanismDriver {
    type Error = DvsError;

    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn allowed_network_types(&self) -> Vec<NetworkType> {
        vec![NetworkType::Vlan]
    }

    fn vif_type(&self) -> VifType {
        self.vif_type.clone()
    }

    fn vif_details(&self) -> VifDetails {
        self.vif_details.clone()
    }

    #[instrument(skip(self, ctx), fields(network_id = %ctx.current().id))]
    async fn create_network_precommit(&self, ctx: &dyn NetworkContext) -> DvsResult<HookOutcome> {
        let controller = match self.network_switch(ctx, "created")? {
            Lookup::Managed(controller) => controller,
            Lookup::Skip(outcome) => return Ok(outcome),
        };
        let network = ctx.current();
        let Some(segment) = ctx.network_segments().first() else {
            return Err(DvsError::MissingSegment);
        };

        let created = self
            .retry
            .run("create_network", || controller.create_network(network, segment))
            .await?;
        Ok(changed(created))
    }

    #[instrument(skip(self, ctx), fields(network_id = %ctx.current().id))]
    async fn update_network_precommit(&self, ctx: &dyn NetworkContext) -> DvsResult<HookOutcome> {
        let controller = match self.network_switch(ctx, "updated")? {
            Lookup::Managed(controller) => controller,
            Lookup::Skip(outcome) => return Ok(outcome),
        };
        let network = ctx.current();
        let original = ctx.original();

        let result = self
            .retry
            .run("update_network", || controller.update_network(network, original))
            .await;
        match result {
            Ok(updated) => Ok(changed(updated)),
            Err(e @ DvsError::PortGroupNotFound { .. }) => {
                info!(reason = %e, "Network not updated");
                Ok(HookOutcome::NoChange)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, ctx), fields(network_id = %ctx.current().id))]
    async fn delete_network_postcommit(&self, ctx: &dyn NetworkContext) -> DvsResult<HookOutcome> {
        let controller = match self.network_switch(ctx, "deleted")? {
            Lookup::Managed(controller) => controller,
            Lookup::Skip(outcome) => return Ok(outcome),
        };
        let network = ctx.current();

        let deleted = self
            .retry
            .run("delete_network", || controller.delete_network(network))
            .await?;
        Ok(changed(deleted))
    }

    #[instrument(skip(self, ctx), fields(port_id = %ctx.current().id))]
    async fn update_port_precommit(&self, ctx: &dyn PortContext) -> DvsResult<HookOutcome> {
        if let Eligibility::NotManaged { reason } = self.eligibility(ctx.current()).await? {
            return Ok(HookOutcome::not_eligible(reason));
        }
        self.bind(ctx).await
    }

    #[instrument(skip(self, ctx), fields(port_id = %ctx.current().id))]
    async fn update_port_postcommit(&self, ctx: &dyn PortContext) -> DvsResult<HookOutcome> {
        let port = ctx.current();
        if let Eligibility::NotManaged { reason } = self.eligibility(port).await? {
            return Ok(HookOutcome::not_eligible(reason));
        }
        let controller = match self.port_switch(ctx, "updated")? {
            Lookup::Managed(controller) => controller,
            Lookup::Skip(outcome) => return Ok(outcome),
        };

        let mut applied = false;
        if let Some(original) = ctx.original() {
            if original.admin_state_up != port.admin_state_up {
                applied |= self
                    .retry
                    .run("switch_port_blocked_state", || {
                        controller.switch_port_blocked_state(port)
                    })
                    .await?;
            }
        }

        if port.vif_type == VifType::Unbound && port.status == PortStatus::Down {
            ctx.update_port_status(&port.id, PortStatus::Active);
            info!(port_id = %port.id, "Port status set to ACTIVE");
            applied = true;
        }

        Ok(changed(applied))
    }

    #[instrument(skip(self, ctx), fields(port_id = %ctx.current().id))]
    async fn delete_port_postcommit(&self, ctx: &dyn PortContext) -> DvsResult<HookOutcome> {
        let port = ctx.current();
        if let Eligibility::NotManaged { reason } = self.eligibility(port).await? {
            return Ok(HookOutcome::not_eligible(reason));
        }
        let controller = match self.port_switch(ctx, "deleted")? {
            Lookup::Managed(controller) => controller,
            Lookup::Skip(outcome) => return Ok(outcome),
        };

        let released = self
            .retry
            .run("release_port", || controller.release_port(port))
            .await?;
        Ok(changed(released))
    }

    #[instrument(skip(self, ctx), fields(port_id = %ctx.current().id))]
    async fn bind_port(&self, ctx: &dyn PortContext) -> DvsResult<HookOutcome> {
        if let Eligibility::NotManaged { reason } = self.eligibility(ctx.current()).await? {
            return Ok(HookOutcome::not_eligible(reason));
        }
        self.bind(ctx).await
    }
}
