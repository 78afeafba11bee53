use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSettings;

/// Env var naming a log file; overrides `logging.file`.
pub const LOG_FILE_ENV: &str = "HYPERSTATE_LOG";

/// Initialize tracing for a binary embedding the runtime.
///
/// Logs go to stderr, plus a file when one is configured. File names get
/// a `.{timestamp}.{pid}` suffix so concurrent runs don't clobber each
/// other. `RUST_LOG` wins over `settings.filter`. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_tracing(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    let log_path = std::env::var_os(LOG_FILE_ENV)
        .map(PathBuf::from)
        .or_else(|| settings.file.clone());

    let file_layer = log_path.and_then(|path| {
        let unique_path = unique_log_path(&path);
        match std::fs::File::create(&unique_path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true),
            ),
            Err(err) => {
                eprintln!(
                    "Warning: Failed to create log file {}: {}",
                    unique_path.display(),
                    err
                );
                None
            }
        }
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(UtcTime::rfc_3339());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

fn unique_log_path(path: &std::path::Path) -> PathBuf {
    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.{}", timestamp, pid));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_log_path_appends_suffix() {
        let path = unique_log_path(std::path::Path::new("/tmp/hyperstate.log"));
        let name = path.to_string_lossy();
        let suffix = format!(".{}", std::process::id());
        assert!(name.starts_with("/tmp/hyperstate.log."));
        assert!(name.ends_with(&suffix));
    }
}
