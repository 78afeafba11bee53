use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub runtime: RuntimeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Per-runtime knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Label recorded on every log line of the runtime (default: "hyperstate").
    #[serde(default = "default_label")]
    pub label: String,
    /// Maximum nesting of dispatch calls. Unbounded when absent.
    #[serde(default)]
    pub max_chain_depth: Option<usize>,
}

/// Logging setup for binaries embedding the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Optional log file. `HYPERSTATE_LOG` overrides it.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_label() -> String {
    "hyperstate".to_string()
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            label: default_label(),
            max_chain_depth: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            file: None,
        }
    }
}
