//! Integration test infrastructure for the DVS mechanism driver
//!
//! Provides:
//! - An in-memory switch controller session with failure injection
//! - Fake network and port hook contexts that record driver callbacks
//! - A fake hypervisor directory
//! - Test fixtures for common networks, ports and hosts
//! - Remote state verification helpers

mod contexts;
mod directory;
mod fake_vim;
pub mod fixtures;
mod verification;

pub use contexts::{FakeNetworkContext, FakePortContext};
pub use directory::FakeHypervisorDirectory;
pub use fake_vim::FakeVim;
pub use fixtures::*;
pub use verification::*;
