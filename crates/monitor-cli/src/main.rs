//! Driver Monitor - Main Entry Point

use anyhow::bail;
use monitor_cli::{init_logging, load_settings, replay};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(recording) = args.next() else {
        bail!("usage: driver-monitor <frames.jsonl> [settings.toml]");
    };
    let settings = load_settings(args.next().as_deref().map(Path::new))?;
    init_logging(settings.log_format, &settings.log_level)?;

    info!("=== Driver Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Replaying {}", recording);

    let summary = replay(Path::new(&recording), &settings).await?;

    info!(
        "Session {}: {} frames, {} skipped, {} log entries",
        summary.session_id, summary.frames, summary.skipped, summary.entries_written
    );
    if let Some(path) = &summary.log_path {
        info!("Log saved to {}", path.display());
    }

    Ok(())
}
