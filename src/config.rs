//! Host configuration.
//!
//! A [`JvmtiConfig`] is built in code with the builder-style setters or
//! parsed from an option string in the `-agentpath` style:
//!
//! ```text
//! max_stack_depth=512,monitor_capacity=32,phase=live
//! ```

use std::num::NonZeroUsize;

use crate::capabilities::{CapabilityTable, Phase};
use crate::sys::jni::jint;
use crate::sys::jvmti;

/// Errors produced while parsing an option string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Option is not `key=value`
    #[error("malformed option '{0}', expected key=value")]
    Malformed(String),

    /// Key is not a known option
    #[error("unknown option '{0}'")]
    UnknownKey(String),

    /// Value does not parse for its key
    #[error("invalid value '{value}' for option '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Settings for a [`JvmtiHost`](crate::JvmtiHost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JvmtiConfig {
    max_stack_depth: usize,
    monitor_capacity: NonZeroUsize,
    phase: Phase,
    version: jint,
    capability_table: CapabilityTable,
}

impl Default for JvmtiConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: 1024,
            monitor_capacity: NonZeroUsize::MIN.saturating_add(15),
            phase: Phase::OnLoad,
            version: jvmti::JVMTI_VERSION_21,
            capability_table: CapabilityTable::default(),
        }
    }
}

impl JvmtiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on `|start_depth|` accepted by stack trace requests.
    pub fn max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    /// Initial raw monitor table capacity. A zero capacity is rejected by
    /// the type here and by [`from_options`](Self::from_options) when parsed.
    pub fn monitor_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.monitor_capacity = capacity;
        self
    }

    /// Phase the host starts in.
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Value reported by `GetVersionNumber`.
    pub fn version(mut self, version: jint) -> Self {
        self.version = version;
        self
    }

    pub fn capability_table(mut self, table: CapabilityTable) -> Self {
        self.capability_table = table;
        self
    }

    pub fn stack_depth_limit(&self) -> usize {
        self.max_stack_depth
    }

    pub fn initial_monitor_capacity(&self) -> usize {
        self.monitor_capacity.get()
    }

    pub fn initial_phase(&self) -> Phase {
        self.phase
    }

    pub fn version_number(&self) -> jint {
        self.version
    }

    pub fn table(&self) -> &CapabilityTable {
        &self.capability_table
    }

    /// Parses a comma-separated `key=value` list on top of the defaults.
    /// An empty string yields the defaults.
    pub fn from_options(options: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for item in options.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| ConfigError::Malformed(item.to_string()))?;
            let (key, value) = (key.trim(), value.trim());
            let invalid = || ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            };
            match key {
                "max_stack_depth" => {
                    config.max_stack_depth = value.parse().map_err(|_| invalid())?;
                }
                "monitor_capacity" => {
                    config.monitor_capacity = value.parse().map_err(|_| invalid())?;
                }
                "phase" => {
                    config.phase = parse_phase(value).ok_or_else(invalid)?;
                }
                "version" => {
                    config.version = parse_version(value).ok_or_else(invalid)?;
                }
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            }
        }
        Ok(config)
    }
}

fn parse_phase(value: &str) -> Option<Phase> {
    match value.to_ascii_lowercase().as_str() {
        "onload" => Some(Phase::OnLoad),
        "primordial" => Some(Phase::Primordial),
        "start" => Some(Phase::Start),
        "live" => Some(Phase::Live),
        "dead" => Some(Phase::Dead),
        _ => None,
    }
}

fn parse_version(value: &str) -> Option<jint> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => jint::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
