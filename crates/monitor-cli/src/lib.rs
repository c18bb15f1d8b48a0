//! Driver Monitor
//!
//! Host-side runner for recorded sessions: loads layered settings, installs
//! logging and replays a JSON-lines frame recording through a
//! [`dms::MonitorSession`], saving the alert log as a session file.

mod replay;
mod settings;

pub use replay::{replay, ReplaySummary};
pub use settings::{load_settings, LogFormat, MonitorSettings, ENV_PREFIX};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(format: LogFormat, level: &str) -> anyhow::Result<()> {
    let level: Level = level.parse()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}
