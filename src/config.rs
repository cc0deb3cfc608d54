//! Stack configuration.
//!
//! Everything the adapter needs is handed to it at initialization; there is
//! no process-global settings registry. With the `config-file` feature a
//! configuration can additionally be layered from a TOML file and
//! `BTHOST_`-prefixed environment variables.

use serde::{Deserialize, Serialize};

/// Default visibility window for discoverability requests, in seconds.
pub const DEFAULT_DISCOVERABLE_DURATION: u32 = 120;

/// Configuration injected into the stack at initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Seconds a discoverability request keeps the radio visible.
    pub discoverable_duration: u32,
    /// Platform adapter to bind (BlueZ: `"hci0"`); `None` selects the
    /// platform default.
    pub adapter_name: Option<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        StackConfig {
            discoverable_duration: DEFAULT_DISCOVERABLE_DURATION,
            adapter_name: None,
        }
    }
}

#[cfg(feature = "config-file")]
impl StackConfig {
    /// Layer configuration from an optional TOML file and the environment.
    ///
    /// Precedence, lowest first: defaults, `path` when given, then
    /// `BTHOST_*` environment variables. A `.env` file is honored before the
    /// environment is read.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(config::Environment::with_prefix("BTHOST"))
            .build()?
            .try_deserialize()
    }
}
