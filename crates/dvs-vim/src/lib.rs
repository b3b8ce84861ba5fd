//! Typed bindings for a remote distributed virtual switch controller.
//!
//! The remote management protocol itself is owned by whatever implements
//! [`VimSession`]. This crate only fixes the shape of what flows across that
//! seam, so that the driver never builds loosely typed requests by hand.
//!
//! # Architecture
//!
//! - [`types`]: typed managed-object references (a switch reference cannot be
//!   passed where a port-group reference is expected)
//! - [`api`]: request payloads and the remote objects they describe
//! - [`session`]: the async session trait and task results
//! - [`error`]: remote failures and their transient/semantic classification
//!
//! # Example
//!
//! ```ignore
//! use dvs_vim::{PortgroupConfigSpec, SwitchRef, VimResult, VimSession};
//!
//! async fn create(session: &dyn VimSession, dvs: &SwitchRef) -> VimResult<()> {
//!     let spec = PortgroupConfigSpec::new().name("web-1234").num_ports(128);
//!     let task = session.create_portgroup(dvs, &spec).await?;
//!     session.wait_for_task(&task).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod session;
pub mod types;

pub use api::{
    BoolPolicy, ConfigOperation, DvPort, DvPortConfigSpec, PortCriteria, PortSetting,
    PortgroupConfigInfo, PortgroupConfigSpec, PortgroupType, VlanIdSpec,
};
pub use error::{FaultKind, VimError, VimResult};
pub use session::{TaskInfo, VimSession};
pub use types::{
    DatacenterKind, DatacenterRef, DistributedSwitchKind, EntityType, FolderKind, FolderRef,
    ManagedEntity, MoKind, MoRef, PortgroupKind, PortgroupRef, SwitchRef, TaskKind, TaskRef,
};
