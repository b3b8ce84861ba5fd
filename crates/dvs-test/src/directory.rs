//! In-memory hypervisor directory.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use dvs_orch_common::{DirectoryError, Hypervisor, HypervisorDirectory};

/// Hypervisor directory backed by a host map.
#[derive(Debug, Default)]
pub struct FakeHypervisorDirectory {
    hosts: Mutex<HashMap<String, Hypervisor>>,
    failures: AtomicUsize,
    lookups: AtomicUsize,
}

impl FakeHypervisorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `host` with the given hypervisor type.
    pub fn with_host(self, host: &str, hypervisor_type: &str) -> Self {
        self.hosts
            .lock()
            .insert(host.to_string(), Hypervisor::new(host, hypervisor_type));
        self
    }

    /// Makes the next `count` lookups fail as unavailable.
    pub fn fail_next(&self, count: usize) {
        self.failures.fetch_add(count, Ordering::SeqCst);
    }

    /// Number of lookups served, failed ones included.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HypervisorDirectory for FakeHypervisorDirectory {
    async fn lookup_hypervisor_by_host(&self, host: &str) -> Result<Hypervisor, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DirectoryError::unavailable("injected failure"));
        }

        self.hosts
            .lock()
            .get(host)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(host))
    }
}
