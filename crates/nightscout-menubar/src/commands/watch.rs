//! Watch command implementation.
//!
//! Runs the same [`Monitor`] as the menu-bar indicator and prints every
//! published state instead of drawing a menu.

use anyhow::Result;
use nightscout_menubar::{ConfigStore, Monitor, Poller};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::format_state;

pub async fn cmd_watch(store: ConfigStore, count: u32, no_color: bool) -> Result<()> {
    let (command_tx, command_rx) = mpsc::channel(8);
    let (state_tx, mut state_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();

    let monitor = Monitor::new(Poller::new(store), command_rx, state_tx, cancel.clone());
    let handle = tokio::spawn(monitor.run());

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            ctrl_c_cancel.cancel();
        }
    });

    let mut printed = 0u32;
    while let Some(state) = state_rx.recv().await {
        println!("{}", format_state(&state, no_color));
        printed += 1;
        if count > 0 && printed >= count {
            break;
        }
    }

    // A dropped receiver also unblocks a monitor waiting on a full channel
    drop(state_rx);
    cancel.cancel();
    handle.await?;
    drop(command_tx);
    Ok(())
}
