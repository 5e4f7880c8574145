// ABOUTME: Configuration types and parsing for bridgekeeper.yml.
// ABOUTME: Handles YAML parsing, file discovery, CLI overrides, and validation.

mod deserialize;
mod init;

pub use init::{TEMPLATE, init_config};

use deserialize::{deserialize_container, deserialize_log_level};

use crate::error::{Error, Result};
use crate::reconcile::{
    Classifier, DefaultBridge, DiscoveryOptions, DiscoveryStrategy, ReconcileSettings,
    RetryPolicy,
};
use crate::runtime::RuntimeConfig;
use crate::types::ContainerId;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const CONFIG_FILENAME: &str = "bridgekeeper.yml";
pub const CONFIG_FILENAME_ALT: &str = "bridgekeeper.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".bridgekeeper/config.yml";

/// Every key is optional. A missing file means all defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The container to manage, by name or ID.
    #[serde(default, deserialize_with = "deserialize_container")]
    pub container: Option<String>,

    #[serde(default = "default_log_level", deserialize_with = "deserialize_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub runtime: Option<RuntimeConfig>,

    #[serde(default)]
    pub markers: Classifier,

    #[serde(default)]
    pub discovery: DiscoveryStrategy,

    #[serde(default)]
    pub default_bridge: DefaultBridge,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default = "default_stabilization", with = "humantime_serde")]
    pub stabilization: Duration,

    #[serde(default = "default_reconnect_delay", with = "humantime_serde")]
    pub reconnect_delay: Duration,

    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stabilization() -> Duration {
    Duration::from_secs(1)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(10)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            container: None,
            log_level: default_log_level(),
            runtime: None,
            markers: Classifier::default(),
            discovery: DiscoveryStrategy::default(),
            default_bridge: DefaultBridge::default(),
            retry: RetryPolicy::default(),
            stabilization: default_stabilization(),
            reconnect_delay: default_reconnect_delay(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty or comment-only file parses as null.
        if yaml.lines().all(|l| {
            let l = l.trim();
            l.is_empty() || l.starts_with('#')
        }) {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Look for a config file in `dir`; fall back to defaults if none exists.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        tracing::debug!(dir = %dir.display(), "no config file, using defaults");
        Ok(Self::default())
    }

    /// Load an explicit path if given, otherwise discover in `dir`.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(Error::ConfigNotFound(path.to_path_buf())),
            Some(path) => Self::load(path),
            None => Self::discover(dir),
        }
    }

    /// Apply a container given on the command line or in the environment.
    pub fn with_container(mut self, container: Option<&str>) -> Self {
        if let Some(c) = container.map(str::trim).filter(|c| !c.is_empty()) {
            self.container = Some(c.trim_start_matches('/').to_string());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.container.is_none() {
            return Err(Error::MissingContainer);
        }
        if self.retry.attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        if self.markers.env.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "markers.env cannot be empty".to_string(),
            ));
        }
        if self.markers.label_prefix.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "markers.label_prefix cannot be empty".to_string(),
            ));
        }
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| Error::InvalidConfig(format!("log_level: {e}")))?;
        Ok(())
    }

    /// Validate and produce the settings a reconciliation pass runs with.
    pub fn reconcile_settings(&self) -> Result<ReconcileSettings> {
        self.validate()?;
        let container = self.container.as_deref().ok_or(Error::MissingContainer)?;
        Ok(ReconcileSettings {
            container: ContainerId::new(container),
            discovery: DiscoveryOptions {
                strategy: self.discovery,
                classifier: self.markers.clone(),
                default_bridge: self.default_bridge.clone(),
            },
            retry: self.retry,
            stabilization: self.stabilization,
        })
    }
}
