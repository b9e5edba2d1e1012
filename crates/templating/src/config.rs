//! Configuration for a [`Templating`](crate::Templating) instance.
//!
//! Every field has a default, so documents only need the keys they change:
//!
//! ```rust
//! use templating::TemplatingConfig;
//!
//! let config = TemplatingConfig::from_yaml(r#"
//! default_engine: simple
//! load_timeout_ms: 250
//! "#).unwrap();
//!
//! assert_eq!(config.default_engine, "simple");
//! assert_eq!(config.load_timeout().as_millis(), 250);
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Engine name used when a template is registered without one.
pub const DEFAULT_ENGINE: &str = "jinja";

/// Default wall-clock budget for blocking nested template loads.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings shared by the registries and the render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplatingConfig {
    /// Engine assigned to sources registered without an explicit engine.
    ///
    /// The built-in default engine is registered under this name.
    pub default_engine: String,

    /// Budget of the blocking nested-load bridge, in milliseconds.
    pub load_timeout_ms: u64,
}

impl Default for TemplatingConfig {
    fn default() -> Self {
        Self {
            default_engine: DEFAULT_ENGINE.to_string(),
            load_timeout_ms: millis(DEFAULT_LOAD_TIMEOUT),
        }
    }
}

impl TemplatingConfig {
    /// Parses a configuration from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Sets the default engine name.
    pub fn with_default_engine(mut self, name: impl Into<String>) -> Self {
        self.default_engine = name.into();
        self
    }

    /// Sets the blocking nested-load budget.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = millis(timeout);
        self
    }

    /// The blocking nested-load budget as a [`Duration`].
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
