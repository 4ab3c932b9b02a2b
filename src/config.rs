//! Configuration model for davlock.
//!
//! This module defines the Config struct that represents the server's YAML
//! configuration file. It supports forward-compatible parsing (unknown
//! fields are ignored), sensible defaults for optional fields, and
//! validation of config values.

use crate::error::{DavError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the davlock server.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Server settings
    // =========================================================================
    /// Socket address the server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Reject every mutating method with 403 Forbidden.
    #[serde(default)]
    pub read_only: bool,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Depth value standing in for the protocol's "Infinity". A lock taken
    /// at this depth covers the whole subtree below its path.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Lock timeout applied when the request carries no Timeout header,
    /// in seconds.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Upper bound for requested lock timeouts, in seconds.
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,

    /// Minimum interval between expiration sweeps, in seconds. Expired
    /// locks never grant or block anything in the meantime; the sweep only
    /// reclaims memory.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Secret mixed into generated lock tokens. When unset, a fresh secret
    /// is derived from startup entropy, so tokens cannot be forged across
    /// restarts either.
    #[serde(default)]
    pub secret: Option<String>,
}

// Default value functions for serde
fn default_bind_addr() -> String {
    "127.0.0.1:4918".to_string()
}
fn default_max_depth() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    3600
}
fn default_max_timeout_secs() -> u64 {
    604_800
}
fn default_sweep_interval_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            read_only: false,
            max_depth: default_max_depth(),
            default_timeout_secs: default_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            secret: None,
        }
    }
}

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward
    /// compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the config file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(DavError::Config)` - Read error, parse error, or validation
    ///   failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            DavError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| DavError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| DavError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return an error on invalid values.
    ///
    /// Validation rules:
    /// - `bind_addr` must parse as a socket address
    /// - `max_depth` must be positive
    /// - timeouts must be positive and `default_timeout_secs` must not
    ///   exceed `max_timeout_secs`
    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(DavError::Config(format!(
                "config validation failed: bind_addr '{}' is not a valid socket address",
                self.bind_addr
            )));
        }

        if self.max_depth == 0 {
            return Err(DavError::Config(
                "config validation failed: max_depth must be greater than 0".to_string(),
            ));
        }

        if self.default_timeout_secs == 0 || self.max_timeout_secs == 0 {
            return Err(DavError::Config(
                "config validation failed: lock timeouts must be greater than 0".to_string(),
            ));
        }

        if self.default_timeout_secs > self.max_timeout_secs {
            return Err(DavError::Config(format!(
                "config validation failed: default_timeout_secs ({}) exceeds max_timeout_secs ({})",
                self.default_timeout_secs, self.max_timeout_secs
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.bind_addr, "127.0.0.1:4918");
        assert!(!config.read_only);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.default_timeout_secs, 3600);
        assert_eq!(config.max_timeout_secs, 604_800);
        assert_eq!(config.sweep_interval_secs, 5);
        assert!(config.secret.is_none());
    }

    #[test]
    fn test_parse_minimal_yaml() {
        let config = Config::from_yaml("{}").unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:4918");
        assert_eq!(config.max_depth, 3);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
bind_addr: "0.0.0.0:8080"
max_depth: 5
secret: "hunter2"
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.secret.as_deref(), Some("hunter2"));
        // Untouched fields keep their defaults
        assert_eq!(config.default_timeout_secs, 3600);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let yaml = r#"
bind_addr: "127.0.0.1:9000"
some_future_option: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_bind_addr_fails_validation() {
        let yaml = "bind_addr: \"not-an-address\"";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_zero_max_depth_fails_validation() {
        assert!(Config::from_yaml("max_depth: 0").is_err());
    }

    #[test]
    fn test_default_timeout_above_max_fails_validation() {
        let yaml = r#"
default_timeout_secs: 700000
max_timeout_secs: 604800
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_depth: 4").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Config::load("/nonexistent/davlock.yaml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.bind_addr, config.bind_addr);
        assert_eq!(parsed.max_timeout_secs, config.max_timeout_secs);
    }
}
