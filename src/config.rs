//! Runtime settings.
//!
//! Values come from an optional `HandsOn.toml` in the working directory,
//! then from `HANDSON_`-prefixed environment variables, with nested keys
//! separated by `__` (`HANDSON_SERIAL__BAUD_RATE=115200`). Anything not set
//! keeps its default.

use crate::error::Result;
use serde::Deserialize;
use std::time::Duration;

const CONFIG_FILE: &str = "HandsOn";
const ENV_PREFIX: &str = "HANDSON";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub serial: LinkSettings,
    pub graph: GraphSettings,
}

/// Parameters used whenever a serial device is opened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub timeout_ms: u64,
    /// Pause after each status change so the device can settle.
    pub settle_ms: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout_ms: 2000,
            settle_ms: 10,
        }
    }
}

impl LinkSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub live_interval_ms: u64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            live_interval_ms: 1000,
        }
    }
}

impl GraphSettings {
    pub fn live_interval(&self) -> Duration {
        // Zero would turn the timer into a busy loop.
        Duration::from_millis(self.live_interval_ms.max(1))
    }
}

impl Settings {
    /// Reads the config file and environment.
    pub fn from_sources() -> Result<Self> {
        let config = ::config::Config::builder()
            .add_source(::config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: ::config::Config) -> Result<Self> {
        Ok(config.try_deserialize()?)
    }

    /// Like [`Settings::from_sources`], falling back on the defaults when the
    /// sources cannot be read.
    #[tracing::instrument]
    pub fn load() -> Self {
        match Self::from_sources() {
            Ok(settings) => {
                tracing::debug!("{:?}", settings);
                settings
            }
            Err(err) => {
                tracing::warn!("Could not read config, using defaults: {}", err);
                Self::default()
            }
        }
    }
}
