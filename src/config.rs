//! Configuration module for the scan environment

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of TCP ports tracked per observation unless configured otherwise
pub const DEFAULT_MAX_PORTS: usize = 10;

/// Main configuration structure for a scan environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Target host to scan
    pub target: String,

    /// Number of port slots in each observation
    pub max_ports: usize,

    /// Upper bound on steps per episode for the episode runner
    pub max_episode_steps: Option<usize>,

    /// Settings for the nmap process
    pub nmap: NmapConfig,

    /// Reward weights and termination threshold
    pub reward: RewardConfig,
}

/// Nmap-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmapConfig {
    /// Path to nmap binary
    pub nmap_path: String,
    /// Arguments added before the action's own arguments
    pub extra_args: Vec<String>,
    /// Passed to nmap as `--host-timeout`
    pub host_timeout_secs: Option<u64>,
}

/// Reward shaping configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Reward per port in the open state
    pub open_port_reward: f64,
    /// Reward per slot with a non-zero service bucket
    pub service_reward: f64,
    /// Reward per slot whose product bucket is zero
    pub vulnerability_bonus: f64,
    /// Episode ends once this many open ports are observed
    pub done_threshold: usize,
    /// Whether unused slots count toward the vulnerability bonus
    pub count_padding_versions: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            target: "127.0.0.1".to_string(),
            max_ports: DEFAULT_MAX_PORTS,
            max_episode_steps: None,
            nmap: NmapConfig::default(),
            reward: RewardConfig::default(),
        }
    }
}

impl Default for NmapConfig {
    fn default() -> Self {
        Self {
            nmap_path: "nmap".to_string(),
            extra_args: Vec::new(),
            host_timeout_secs: None,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            open_port_reward: 10.0,
            service_reward: 5.0,
            vulnerability_bonus: 20.0,
            done_threshold: 5,
            count_padding_versions: true,
        }
    }
}

impl EnvConfig {
    /// Create a new configuration for the given target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Set the observation capacity
    pub fn with_max_ports(mut self, max_ports: usize) -> Self {
        self.max_ports = max_ports;
        self
    }

    /// Set the per-episode step limit
    pub fn with_max_episode_steps(mut self, steps: Option<usize>) -> Self {
        self.max_episode_steps = steps;
        self
    }

    /// Replace the nmap settings
    pub fn with_nmap(mut self, nmap: NmapConfig) -> Self {
        self.nmap = nmap;
        self
    }

    /// Replace the reward settings
    pub fn with_reward(mut self, reward: RewardConfig) -> Self {
        self.reward = reward;
        self
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::ScanError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: EnvConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as TOML
    pub fn save_toml_file<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Location of the per-user configuration file
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".scangym.toml")
    }

    /// Load configuration from default locations
    pub fn load_default_config() -> Self {
        let path = Self::default_path();

        if path.exists() {
            match Self::from_toml_file(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        validate_target(&self.target)?;

        if self.max_ports == 0 {
            return Err(crate::ScanError::ConfigError(
                "max_ports must be greater than 0".to_string(),
            ));
        }

        if self.nmap.nmap_path.trim().is_empty() {
            return Err(crate::ScanError::ConfigError(
                "nmap_path cannot be empty".to_string(),
            ));
        }

        if self.reward.done_threshold == 0 {
            return Err(crate::ScanError::ConfigError(
                "done_threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Reject targets nmap would read as options or split into several hosts.
/// The target is used verbatim, so surrounding whitespace is an error too.
pub fn validate_target(target: &str) -> crate::Result<()> {
    if target.trim().is_empty() {
        return Err(crate::ScanError::InvalidTarget(
            "Target cannot be empty".to_string(),
        ));
    }
    if target.chars().any(char::is_whitespace) {
        return Err(crate::ScanError::InvalidTarget(format!(
            "Target must be a single host without whitespace: {:?}",
            target
        )));
    }
    if target.starts_with('-') {
        return Err(crate::ScanError::InvalidTarget(format!(
            "Target looks like an option: {}",
            target
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reward_table() {
        let config = EnvConfig::default();
        assert_eq!(config.target, "127.0.0.1");
        assert_eq!(config.max_ports, 10);
        assert_eq!(config.reward.open_port_reward, 10.0);
        assert_eq!(config.reward.service_reward, 5.0);
        assert_eq!(config.reward.vulnerability_bonus, 20.0);
        assert_eq!(config.reward.done_threshold, 5);
        assert!(config.reward.count_padding_versions);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(EnvConfig::new("").validate().is_err());
        assert!(EnvConfig::new("-oN /tmp/x").validate().is_err());
        assert!(EnvConfig::new("10.0.0.1 10.0.0.2").validate().is_err());
        assert!(EnvConfig::new(" 127.0.0.1").validate().is_err());
        assert!(EnvConfig::new("127.0.0.1\t").validate().is_err());
        assert!(EnvConfig::new("10.0.0.1").with_max_ports(0).validate().is_err());

        let mut config = EnvConfig::new("scanme.nmap.org");
        config.reward.done_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EnvConfig = toml::from_str(
            r#"
            target = "192.168.1.20"

            [reward]
            vulnerability_bonus = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.target, "192.168.1.20");
        assert_eq!(config.max_ports, DEFAULT_MAX_PORTS);
        assert_eq!(config.nmap.nmap_path, "nmap");
        assert_eq!(config.reward.vulnerability_bonus, 0.0);
        assert_eq!(config.reward.open_port_reward, 10.0);
    }
}
