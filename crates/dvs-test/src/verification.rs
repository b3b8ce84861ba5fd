//! Remote state verification helpers.

use thiserror::Error;

use crate::fake_vim::FakeVim;

/// Error type for verification failures.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Port-group '{name}' not found")]
    PortgroupMissing { name: String },

    #[error("Port-group '{name}' still exists")]
    PortgroupPresent { name: String },

    #[error("Port-group '{name}': expected {field}={expected}, got {actual}")]
    PortgroupMismatch {
        name: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("No switch port leased to '{port_id}'")]
    LeaseMissing { port_id: String },

    #[error("Switch port {key} still leased to '{port_id}'")]
    LeasePresent { port_id: String, key: String },

    #[error("Expected {expected} calls to {method}, got {actual}")]
    CallCount {
        method: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type for verification operations.
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Checks the state held by a [`FakeVim`].
pub struct SwitchVerifier<'a> {
    vim: &'a FakeVim,
}

impl<'a> SwitchVerifier<'a> {
    pub fn new(vim: &'a FakeVim) -> Self {
        Self { vim }
    }

    pub fn assert_portgroup_exists(&self, name: &str) -> VerifyResult<()> {
        self.vim
            .portgroup(name)
            .map(|_| ())
            .ok_or_else(|| VerificationError::PortgroupMissing {
                name: name.to_string(),
            })
    }

    pub fn assert_portgroup_absent(&self, name: &str) -> VerifyResult<()> {
        match self.vim.portgroup(name) {
            Some(_) => Err(VerificationError::PortgroupPresent {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn assert_portgroup_blocked(&self, name: &str, expected: bool) -> VerifyResult<()> {
        let pg = self
            .vim
            .portgroup(name)
            .ok_or_else(|| VerificationError::PortgroupMissing {
                name: name.to_string(),
            })?;
        if pg.is_blocked() != expected {
            return Err(VerificationError::PortgroupMismatch {
                name: name.to_string(),
                field: "blocked".to_string(),
                expected: expected.to_string(),
                actual: pg.is_blocked().to_string(),
            });
        }
        Ok(())
    }

    pub fn assert_portgroup_vlan(&self, name: &str, expected: u16) -> VerifyResult<()> {
        let pg = self
            .vim
            .portgroup(name)
            .ok_or_else(|| VerificationError::PortgroupMissing {
                name: name.to_string(),
            })?;
        let actual = pg.default_port_config.vlan.map(|v| v.vlan_id.as_u16());
        if actual != Some(expected) {
            return Err(VerificationError::PortgroupMismatch {
                name: name.to_string(),
                field: "vlan".to_string(),
                expected: expected.to_string(),
                actual: format!("{:?}", actual),
            });
        }
        Ok(())
    }

    /// Returns the key of the switch port leased to `port_id`.
    pub fn assert_port_leased(&self, port_id: &str) -> VerifyResult<String> {
        self.vim
            .leased_port(port_id)
            .map(|p| p.key)
            .ok_or_else(|| VerificationError::LeaseMissing {
                port_id: port_id.to_string(),
            })
    }

    pub fn assert_no_lease(&self, port_id: &str) -> VerifyResult<()> {
        match self.vim.leased_port(port_id) {
            Some(port) => Err(VerificationError::LeasePresent {
                port_id: port_id.to_string(),
                key: port.key,
            }),
            None => Ok(()),
        }
    }

    pub fn assert_call_count(&self, method: &str, expected: usize) -> VerifyResult<()> {
        let actual = self.vim.call_count(method);
        if actual != expected {
            return Err(VerificationError::CallCount {
                method: method.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
