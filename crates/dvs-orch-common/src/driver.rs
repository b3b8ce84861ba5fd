//! Base mechanism driver trait.

use crate::context::{NetworkContext, PortContext};
use crate::outcome::HookOutcome;
use async_trait::async_trait;
use dvs_types::{NetworkType, VifDetails, VifType};

/// Lifecycle hooks invoked by the network orchestrator.
///
/// Every hook has a no-op default so a driver only implements the events it
/// cares about. Returning `Ok` lets the orchestrator's transaction proceed;
/// returning `Err` aborts it.
///
/// # Ordering
///
/// 1. `*_precommit` runs inside the orchestrator's transaction
/// 2. `*_postcommit` runs after the transaction has committed
/// 3. `bind_port` runs when the orchestrator is looking for a driver to bind a port
///
/// # Thread Safety
///
/// Hooks for different objects may run concurrently, so implementations
/// must be `Send + Sync`. Hooks for the same object are serialized by the
/// caller.
#[async_trait]
pub trait MechanismDriver: Send + Sync {
    /// Error returned by failing hooks.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the name of this driver (for logging and debugging).
    fn name(&self) -> &str;

    /// Segment types this driver can manage.
    fn allowed_network_types(&self) -> Vec<NetworkType> {
        vec![NetworkType::Vlan]
    }

    /// VIF type reported on successful bindings.
    fn vif_type(&self) -> VifType;

    /// Base VIF details reported on successful bindings.
    fn vif_details(&self) -> VifDetails {
        VifDetails::default()
    }

    async fn create_network_precommit(
        &self,
        _ctx: &dyn NetworkContext,
    ) -> Result<HookOutcome, Self::Error> {
        Ok(HookOutcome::NoChange)
    }

    async fn create_network_postcommit(
        &self,
        _ctx: &dyn NetworkContext,
    ) -> Result<HookOutcome, Self::Error> {
        Ok(HookOutcome::NoChange)
    }

    async fn update_network_precommit(
        &self,
        _ctx: &dyn NetworkContext,
    ) -> Result<HookOutcome, Self::Error> {
        Ok(HookOutcome::NoChange)
    }

    async fn delete_network_postcommit(
        &self,
        _ctx: &dyn NetworkContext,
    ) -> Result<HookOutcome, Self::Error> {
        Ok(HookOutcome::NoChange)
    }

    async fn update_port_precommit(
        &self,
        _ctx: &dyn PortContext,
    ) -> Result<HookOutcome, Self::Error> {
        Ok(HookOutcome::NoChange)
    }

    async fn update_port_postcommit(
        &self,
        _ctx: &dyn PortContext,
    ) -> Result<HookOutcome, Self::Error> {
        Ok(HookOutcome::NoChange)
    }

    async fn delete_port_postcommit(
        &self,
        _ctx: &dyn PortContext,
    ) -> Result<HookOutcome, Self::Error> {
        Ok(HookOutcome::NoChange)
    }

    /// Attempts to bind a port. A driver that binds calls
    /// [`PortContext::set_binding`] before returning.
    async fn bind_port(&self, _ctx: &dyn PortContext) -> Result<HookOutcome, Self::Error> {
        Ok(HookOutcome::NoChange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvs_types::Network;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDriver {
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl MechanismDriver for CountingDriver {
        type Error = std::io::Error;

        fn name(&self) -> &str {
            "counting"
        }

        fn vif_type(&self) -> VifType {
            VifType::Other("counting".to_string())
        }

        async fn delete_network_postcommit(
            &self,
            _ctx: &dyn NetworkContext,
        ) -> Result<HookOutcome, Self::Error> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(HookOutcome::Applied)
        }
    }

    struct Ctx(Network);

    impl NetworkContext for Ctx {
        fn current(&self) -> &Network {
            &self.0
        }

        fn original(&self) -> Option<&Network> {
            None
        }
    }

    #[tokio::test]
    async fn test_default_hooks_are_noops() {
        let driver = CountingDriver {
            deletes: AtomicUsize::new(0),
        };
        let ctx = Ctx(Network::new("n1", None));

        assert_eq!(driver.name(), "counting");
        assert_eq!(driver.allowed_network_types(), vec![NetworkType::Vlan]);
        assert_eq!(driver.vif_details(), VifDetails::default());
        assert_eq!(
            driver.create_network_precommit(&ctx).await.unwrap(),
            HookOutcome::NoChange
        );
        assert_eq!(
            driver.delete_network_postcommit(&ctx).await.unwrap(),
            HookOutcome::Applied
        );
        assert_eq!(driver.deletes.load(Ordering::SeqCst), 1);
    }
}
