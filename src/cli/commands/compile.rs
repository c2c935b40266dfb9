//! Compile command - one batch pass over every source root.

use crate::config::Settings;
use crate::session::WatchSession;

/// Run the compile command.
pub async fn run(config: Settings) -> anyhow::Result<()> {
    let session = WatchSession::new(config);
    let report = session.compile_all().await?;

    if report.compiled.is_empty() {
        println!("No source root exists; nothing compiled.");
    } else {
        println!("Compiled: {}", report.compiled.join(", "));
    }
    if !report.skipped.is_empty() {
        println!("Skipped (missing): {}", report.skipped.join(", "));
    }
    Ok(())
}
