//! CLI configuration.
//!
//! Loaded via the `config` crate from an optional TOML file, then from
//! environment variables prefixed `POSTFLOW__` with `__` separating nested
//! keys, e.g. `POSTFLOW__COMPLIANCE__MAX_ACTIONS_PER_RUN__X=3`.

use postflow_compliance::CompliancePolicy;
use serde::Deserialize;
use std::path::Path;

/// Configuration for the `postflow` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Per-platform limits applied by the compliance gate and run limiter.
    #[serde(default)]
    pub compliance: CompliancePolicy,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            compliance: CompliancePolicy::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration, layering the environment over `path` if given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, or if a value
    /// has the wrong shape.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("POSTFLOW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
