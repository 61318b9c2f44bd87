//! Tracing subscriber installation for the binary

use crate::monitoring::logger::LogLevel;
use crate::utils::error::{GuardError, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Error events go to
/// stderr, everything else to stdout.
pub fn init_tracing(default_level: LogLevel, json: bool) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level.as_tracing()).into())
        .from_env_lossy();
    let writer = std::io::stderr
        .with_max_level(Level::ERROR)
        .or_else(std::io::stdout);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(writer);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| GuardError::config(format!("Failed to install tracing subscriber: {}", e)))
}
