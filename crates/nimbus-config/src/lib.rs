//! Process-wide settings for the Nimbus provisioner
//!
//! Settings are loaded once at startup and passed to the orchestrator by
//! value; nothing here is re-read during a provisioning call.

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Idle timeout applied to allocated public IPs when none is configured.
pub const DEFAULT_PIP_IDLE_TIMEOUT_MINUTES: u32 = 4;

/// Cloud-level settings shared by every orchestration call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Resource group used when an instance id or network attachment does
    /// not name one, and the second tier of the security-group search.
    pub default_resource_group: String,

    /// Target location for created resource groups and resources.
    pub location: String,

    /// Network security group applied when neither the resource pool nor the
    /// attachment names one.
    #[serde(default)]
    pub default_security_group: Option<String>,

    /// Idle timeout for allocated public IPs, in minutes.
    #[serde(default)]
    pub pip_idle_timeout_in_minutes: Option<u32>,

    /// Enables boot diagnostics for VMs whose resource pool does not decide.
    #[serde(default)]
    pub enable_boot_diagnostics: bool,

    /// Storage URI receiving boot-diagnostics output.
    #[serde(default)]
    pub boot_diagnostics_storage_uri: Option<String>,

    /// Admin account name for Linux VMs.
    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    /// SSH public key installed for the admin account on Linux VMs.
    #[serde(default)]
    pub ssh_public_key: Option<String>,

    /// Tags stamped on every created resource.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

fn default_admin_username() -> String {
    "nimbus".to_string()
}

impl Settings {
    /// Load settings from an explicit YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the first file found by [`find_settings_file`].
    pub fn load() -> Result<Self> {
        Self::from_path(find_settings_file()?)
    }

    fn validate(&self) -> Result<()> {
        if self.default_resource_group.is_empty() {
            return Err(ConfigError::Invalid(
                "default_resource_group must not be empty".to_string(),
            ));
        }
        if self.location.is_empty() {
            return Err(ConfigError::Invalid("location must not be empty".to_string()));
        }
        Ok(())
    }

    /// Effective public-IP idle timeout, defaulting to
    /// [`DEFAULT_PIP_IDLE_TIMEOUT_MINUTES`].
    pub fn pip_idle_timeout(&self) -> u32 {
        self.pip_idle_timeout_in_minutes
            .unwrap_or(DEFAULT_PIP_IDLE_TIMEOUT_MINUTES)
    }
}

/// Nimbus config directory (`~/.config/nimbus`), created on first use.
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("nimbus");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Locate the settings file.
///
/// Search order:
/// 1. NIMBUS_CONFIG_PATH environment variable (direct path)
/// 2. current directory: nimbus.local.yaml, nimbus.yaml
/// 3. ./.nimbus/ directory, same order
/// 4. ~/.config/nimbus/nimbus.yaml
pub fn find_settings_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("NIMBUS_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["nimbus.local.yaml", "nimbus.yaml"];

    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let nimbus_dir = current_dir.join(".nimbus");
    if nimbus_dir.is_dir() {
        for filename in &candidates {
            let path = nimbus_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("nimbus").join("nimbus.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::SettingsFileNotFound)
}
