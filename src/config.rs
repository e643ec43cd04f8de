/*!
Device targets, command sets and runner configuration.

This module defines:
- `DeviceTarget`: host plus credentials identifying one device.
- `CommandSet`: the ordered list of diagnostic commands a session runs.
- `ScanConfig`: file-based configuration for the multi-device runner.
*/

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The built-in diagnostic pass. Order matters for report rendering.
pub const DEFAULT_DIAGNOSTIC_COMMANDS: &[&str] = &[
    "show version",
    "show ip interface brief",
    "show interfaces status",
    "show logging",
    "show processes cpu",
    "show memory statistics",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing or empty field: {0}")]
    Missing(&'static str),
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Identifies one remote device. Immutable once a session is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTarget {
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl DeviceTarget {
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            port: DEFAULT_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("host"));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Missing("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Missing("password"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "port",
                reason: "port must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Ordered list of command strings. Insertion order is execution order;
/// duplicates are allowed here and collapse at result-recording time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSet(Vec<String>);

impl CommandSet {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(commands.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTIC_COMMANDS.iter().copied())
    }
}

/// Configuration for a bulk scan: which devices to visit and where reports go.
/// Loaded from a JSON file by the runner binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub devices: Vec<DeviceTarget>,
    /// Overrides the built-in command list for every device when present.
    #[serde(default)]
    pub commands: Option<Vec<String>>,
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&raw)?;
        for device in &config.devices {
            device.validate()?;
        }
        Ok(config)
    }

    pub fn command_set(&self) -> CommandSet {
        match &self.commands {
            Some(commands) => CommandSet::new(commands.iter().cloned()),
            None => CommandSet::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_validation() {
        assert!(DeviceTarget::new("10.0.0.1", "admin", "secret").validate().is_ok());
        assert!(matches!(
            DeviceTarget::new("", "admin", "secret").validate(),
            Err(ConfigError::Missing("host"))
        ));
        assert!(matches!(
            DeviceTarget::new("10.0.0.1", "  ", "secret").validate(),
            Err(ConfigError::Missing("username"))
        ));
        assert!(matches!(
            DeviceTarget::new("10.0.0.1", "admin", "").validate(),
            Err(ConfigError::Missing("password"))
        ));
        assert!(
            DeviceTarget::new("10.0.0.1", "admin", "secret")
                .with_port(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_default_command_set_order() {
        let set = CommandSet::default();
        let commands: Vec<_> = set.iter().collect();
        assert_eq!(commands.len(), 6);
        assert_eq!(commands[0], "show version");
        assert_eq!(commands[5], "show memory statistics");
    }

    #[test]
    fn test_scan_config_parsing() {
        let json = r#"{
            "devices": [
                {"host": "192.168.1.1", "username": "admin", "password": "pass1"},
                {"host": "192.168.1.2", "username": "admin", "password": "pass2", "port": 2222}
            ],
            "commands": ["show version", "show cdp neighbors"]
        }"#;

        let config: ScanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].port, DEFAULT_PORT);
        assert_eq!(config.devices[0].timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.devices[1].port, 2222);

        let set = config.command_set();
        let commands: Vec<_> = set.iter().collect();
        assert_eq!(commands, vec!["show version", "show cdp neighbors"]);
    }

    #[test]
    fn test_scan_config_default_commands() {
        let json = r#"{"devices": []}"#;
        let config: ScanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.command_set().len(), 6);
        assert!(config.report_dir.is_none());
    }
}
