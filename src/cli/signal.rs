//! Ctrl-C handling for long rewrites
//!
//! The first Ctrl-C sets the stop flag; the driver finishes the rewrite in
//! progress and stops before the next pass. A second Ctrl-C exits at once.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Exit status for a second Ctrl-C (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Watch for Ctrl-C on a background thread and set `stop` when it arrives.
pub fn spawn_ctrl_c_watcher(stop: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;

    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if tokio::signal::ctrl_c().await.is_err() {
                        debug!("Ctrl-C handler unavailable");
                        return;
                    }
                    if stop.swap(true, Ordering::SeqCst) {
                        eprintln!("\nInterrupted again, exiting");
                        std::process::exit(INTERRUPTED_EXIT_CODE);
                    }
                    eprintln!(
                        "\nStopping after the current rewrite (press Ctrl-C again to exit now)"
                    );
                }
            })
        })
        .context("Failed to spawn Ctrl-C watcher")?;
    Ok(())
}
