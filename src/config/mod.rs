//! Settings file for runtimes and the demo binary.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{LoggingSettings, RuntimeSettings, Settings};
