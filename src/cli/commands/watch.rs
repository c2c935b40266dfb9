//! Watch command - batch pass followed by live watching.

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;

use crate::config::Settings;
use crate::session::WatchSession;
use crate::watcher::WatchNotice;

/// Run the watch command until Ctrl-C or a fatal watch error.
pub async fn run(config: Settings, json: bool) -> anyhow::Result<()> {
    let session = WatchSession::new(config);
    let mut notices = session.broadcaster().subscribe();

    let (watcher, report) = session.prepare().await?;
    if !json {
        println!("Initial compile: {} root(s)", report.compiled.len());
    }

    let handle = watcher.handle();
    let watch_task = tokio::spawn(watcher.run());

    let printer = tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => {
                    print_notice(&notice, json);
                    if matches!(notice, WatchNotice::Stopped) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("[watch] output lagged, {skipped} notices dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            crate::log_event!("watch", "interrupt received, stopping");
            stopper.stop();
        }
    });

    let result = watch_task.await.context("watch task panicked")?;
    // Ends on the Stopped notice; a fatal error may have skipped it
    if result.is_err() {
        printer.abort();
    } else {
        let _ = printer.await;
    }

    result.map_err(Into::into)
}

fn print_notice(notice: &WatchNotice, json: bool) {
    if json {
        println!("{}", notice.to_json());
        return;
    }

    match notice {
        WatchNotice::Started { roots } => {
            for root in roots {
                println!("Watching {}", root.display());
            }
        }
        WatchNotice::Compiled { input, output } => {
            println!("Compiled {} -> {}", input.display(), output.display());
        }
        WatchNotice::Deleted { output } => println!("Deleted {}", output.display()),
        WatchNotice::Failed { file, message } => {
            eprintln!("Error during the compilation of {file} : {message}");
        }
        WatchNotice::Stopped => println!("Stopped"),
    }
}
