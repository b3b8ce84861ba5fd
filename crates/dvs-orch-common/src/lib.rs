//! Common reconciliation abstractions for the DVS mechanism driver.
//!
//! This crate provides the traits and types that sit between the external
//! network orchestrator and a concrete driver:
//!
//! - [`MechanismDriver`]: the lifecycle hooks a driver may implement
//! - [`NetworkContext`] / [`PortContext`]: what each hook gets to see and call back into
//! - [`HypervisorDirectory`]: which hypervisor runs on a compute host
//! - [`HookOutcome`]: how a hook that returned normally disposed of the event
//! - [`RetryPolicy`]: bounded retry with backoff for [`Retryable`] errors
//!
//! # Architecture
//!
//! 1. The orchestrator commits a network or port change
//! 2. It calls the matching hook with a context for the object
//! 3. The driver resolves the owning switch and applies the change remotely
//! 4. Transient remote failures are retried under the [`RetryPolicy`]
//! 5. Anything else is either absorbed into a [`HookOutcome`] or returned as an error
//!
//! # Example
//!
//! ```ignore
//! use dvs_orch_common::{HookOutcome, MechanismDriver, NetworkContext};
//!
//! struct LoggingDriver;
//!
//! #[async_trait]
//! impl MechanismDriver for LoggingDriver {
//!     type Error = std::io::Error;
//!
//!     fn name(&self) -> &str { "logging" }
//!
//!     async fn delete_network_postcommit(
//!         &self,
//!         ctx: &dyn NetworkContext,
//!     ) -> Result<HookOutcome, Self::Error> {
//!         tracing::info!(network = %ctx.current().id, "deleted");
//!         Ok(HookOutcome::Applied)
//!     }
//! }
//! ```

mod context;
mod directory;
mod driver;
mod outcome;
mod retry;

pub use context::{NetworkContext, PortBinding, PortContext};
pub use directory::{DirectoryError, Hypervisor, HypervisorDirectory};
pub use driver::MechanismDriver;
pub use outcome::HookOutcome;
pub use retry::{RetryPolicy, Retryable};
