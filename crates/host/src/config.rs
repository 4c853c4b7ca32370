//! Probe tool configuration management

use crate::usb::DeviceFilter;
use anyhow::{Context, Result, anyhow};
use ipheth_protocol::constants::CARRIER_CHECK_INTERVAL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub host: HostSettings,
    pub usb: UsbSettings,
    /// Carrier monitoring
    #[serde(default)]
    pub monitor: MonitorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Extra VID:PID filters bound on top of the supported device table
    #[serde(default)]
    pub extra_devices: Vec<String>,
    /// Select the tethering alternate setting right after bind
    #[serde(default = "UsbSettings::default_reset_on_bind")]
    pub reset_on_bind: bool,
}

impl UsbSettings {
    fn default_reset_on_bind() -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Carrier check cadence in milliseconds
    #[serde(default = "MonitorSettings::default_interval_ms")]
    pub carrier_check_interval_ms: u64,
    /// Only report carrier checks whose outcome differs from the last one
    #[serde(default = "MonitorSettings::default_notify_only_changes")]
    pub notify_only_changes: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            carrier_check_interval_ms: Self::default_interval_ms(),
            notify_only_changes: Self::default_notify_only_changes(),
        }
    }
}

impl MonitorSettings {
    const MIN_INTERVAL_MS: u64 = 100;
    const MAX_INTERVAL_MS: u64 = 60 * 60 * 1000;

    fn default_interval_ms() -> u64 {
        CARRIER_CHECK_INTERVAL.as_millis() as u64
    }

    fn default_notify_only_changes() -> bool {
        true
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.carrier_check_interval_ms)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host: HostSettings {
                log_level: "info".to_string(),
            },
            usb: UsbSettings {
                extra_devices: Vec::new(),
                reset_on_bind: true,
            },
            monitor: MonitorSettings::default(),
        }
    }
}

impl HostConfig {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/ipheth/probe.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("ipheth").join("probe.toml")
        } else {
            PathBuf::from("/etc/ipheth/probe.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.host.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.host.log_level,
                valid_levels.join(", ")
            ));
        }

        self.extra_filters()?;

        let interval = self.monitor.carrier_check_interval_ms;
        if !(MonitorSettings::MIN_INTERVAL_MS..=MonitorSettings::MAX_INTERVAL_MS)
            .contains(&interval)
        {
            return Err(anyhow!(
                "Invalid carrier_check_interval_ms {}, must be between {} and {}",
                interval,
                MonitorSettings::MIN_INTERVAL_MS,
                MonitorSettings::MAX_INTERVAL_MS
            ));
        }

        Ok(())
    }

    /// Parse the extra device filters
    pub fn extra_filters(&self) -> Result<Vec<DeviceFilter>> {
        self.usb
            .extra_devices
            .iter()
            .map(|filter| filter.parse::<DeviceFilter>().map_err(|e| anyhow!(e)))
            .collect()
    }
}

/// Load a configuration file from a path that may start with `~`
pub fn load_config(path: &str) -> Result<HostConfig> {
    let path_buf = PathBuf::from(shellexpand::tilde(path).as_ref());
    HostConfig::load(Some(path_buf))
}
