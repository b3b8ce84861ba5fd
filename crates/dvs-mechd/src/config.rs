//! Configuration file support for dvs-mechd
//!
//! Loads and validates driver configuration from TOML files.
//! Default location: /etc/neutron/dvs-mechd.toml

use crate::error::{DvsError, DvsResult};
use crate::hypervisor::DEFAULT_MANAGED_HYPERVISOR_TYPE;
use dvs_orch_common::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/neutron/dvs-mechd.toml";

/// Connection settings for the switch controller session.
///
/// The driver itself never opens a session. These settings are handed to
/// whatever [`VimSession`](dvs_vim::VimSession) implementation the embedding
/// process constructs, and `dvs-mechd check` reports them.
#[derive(Clone, Serialize, Deserialize)]
pub struct VsphereConfig {
    /// Controller host name or address
    #[serde(default)]
    pub hostname: String,

    /// Login user
    #[serde(default)]
    pub login: String,

    /// Login password
    #[serde(default)]
    pub password: String,

    /// Number of times the session retries a failed API call
    #[serde(default = "default_api_retry_count")]
    pub api_retry_count: u32,

    /// Task polling interval in milliseconds
    #[serde(default = "default_task_poll_interval")]
    pub task_poll_interval_ms: u64,
}

impl fmt::Debug for VsphereConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VsphereConfig")
            .field("hostname", &self.hostname)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("api_retry_count", &self.api_retry_count)
            .field("task_poll_interval_ms", &self.task_poll_interval_ms)
            .finish()
    }
}

/// Physical network to switch mapping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Entries of the form "physical_network:switch_name"
    #[serde(default)]
    pub network_maps: Vec<String>,
}

/// Retry configuration for remote operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Backoff growth factor
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

/// Port binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Hypervisor type whose ports this driver manages
    #[serde(default = "default_managed_hypervisor_type")]
    pub managed_hypervisor_type: String,

    /// VIF type reported on successful bindings
    #[serde(default = "default_vif_type")]
    pub vif_type: String,
}

/// Complete dvs-mechd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DvsConfig {
    /// Session configuration
    #[serde(default)]
    pub vsphere: VsphereConfig,

    /// Switch mapping
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Binding configuration
    #[serde(default)]
    pub binding: BindingConfig,
}

// Default functions
fn default_api_retry_count() -> u32 {
    10
}

fn default_task_poll_interval() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    100
}

fn default_max_backoff() -> u64 {
    2000
}

fn default_multiplier() -> u32 {
    2
}

fn default_managed_hypervisor_type() -> String {
    DEFAULT_MANAGED_HYPERVISOR_TYPE.to_string()
}

fn default_vif_type() -> String {
    "dvs".to_string()
}

// Default implementations
impl Default for VsphereConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            login: String::new(),
            password: String::new(),
            api_retry_count: default_api_retry_count(),
            task_poll_interval_ms: default_task_poll_interval(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            managed_hypervisor_type: default_managed_hypervisor_type(),
            vif_type: default_vif_type(),
        }
    }
}

/// One `physical_network:switch_name` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkMapping {
    pub physical_network: String,
    pub switch_name: String,
}

impl FromStr for NetworkMapping {
    type Err = DvsError;

    fn from_str(s: &str) -> DvsResult<Self> {
        let (physical_network, switch_name) = s.split_once(':').ok_or_else(|| {
            DvsError::invalid_config(
                "network_maps",
                format!("'{}' is not of the form physical_network:switch_name", s),
            )
        })?;

        let physical_network = physical_network.trim();
        let switch_name = switch_name.trim();
        if physical_network.is_empty() || switch_name.is_empty() {
            return Err(DvsError::invalid_config(
                "network_maps",
                format!("'{}' has an empty physical network or switch name", s),
            ));
        }

        Ok(Self {
            physical_network: physical_network.to_string(),
            switch_name: switch_name.to_string(),
        })
    }
}

impl fmt::Display for NetworkMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.physical_network, self.switch_name)
    }
}

impl DvsConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> DvsResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).map_err(|e| match e {
                DvsError::InvalidConfig { message, .. } => {
                    DvsError::invalid_config(path.display().to_string(), message)
                }
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(DvsError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> DvsResult<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> DvsResult<Self> {
        toml::from_str(content)
            .map_err(|e| DvsError::invalid_config("toml", format!("failed to parse: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> DvsResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DvsError::invalid_config("toml", format!("failed to serialize: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parses every mapping entry, rejecting duplicate physical networks
    pub fn network_mappings(&self) -> DvsResult<Vec<NetworkMapping>> {
        let mut seen = HashSet::new();
        let mut mappings = Vec::with_capacity(self.mapping.network_maps.len());

        for entry in &self.mapping.network_maps {
            let mapping: NetworkMapping = entry.parse()?;
            if !seen.insert(mapping.physical_network.clone()) {
                return Err(DvsError::invalid_config(
                    "network_maps",
                    format!(
                        "physical network '{}' is mapped more than once",
                        mapping.physical_network
                    ),
                ));
            }
            mappings.push(mapping);
        }

        Ok(mappings)
    }

    /// Get the retry policy for remote operations
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            multiplier: self.retry.multiplier,
        }
    }

    /// Get task polling interval as Duration
    pub fn task_poll_interval(&self) -> Duration {
        Duration::from_millis(self.vsphere.task_poll_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> DvsResult<()> {
        self.network_mappings()?;

        if self.retry.max_attempts == 0 {
            return Err(DvsError::invalid_config(
                "retry.max_attempts",
                "must be > 0",
            ));
        }

        if self.retry.multiplier == 0 {
            return Err(DvsError::invalid_config("retry.multiplier", "must be > 0"));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(DvsError::invalid_config(
                "retry.initial_backoff_ms",
                "must not exceed max_backoff_ms",
            ));
        }

        if self.vsphere.task_poll_interval_ms == 0 {
            return Err(DvsError::invalid_config(
                "vsphere.task_poll_interval_ms",
                "must be > 0",
            ));
        }

        if self.binding.managed_hypervisor_type.is_empty() {
            return Err(DvsError::invalid_config(
                "binding.managed_hypervisor_type",
                "must not be empty",
            ));
        }

        if self.binding.vif_type.is_empty() {
            return Err(DvsError::invalid_config("binding.vif_type", "must not be empty"));
        }

        Ok(())
    }
}
