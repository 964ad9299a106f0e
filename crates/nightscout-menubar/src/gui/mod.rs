//! Menu-bar indicator built on [tray-icon](https://docs.rs/tray-icon) and
//! [egui](https://www.egui.rs/).
//!
//! # Usage
//!
//! ```bash
//! nightscout-menubar run
//! ```

mod app;
mod tray;

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;

use anyhow::{Context, Result};
use eframe::egui::{self, IconData};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::APP_NAME;
use crate::config::ConfigStore;
use crate::monitor::{MenuState, Monitor, MonitorCommand, Poller};

pub use app::{DIALOG_MESSAGE, DIALOG_TITLE, NightscoutApp};
pub use tray::{TrayCommand, TrayError, TrayManager, icon_rgba, status_lines};

/// Run the menu-bar indicator until the user quits.
///
/// This:
/// 1. Starts the polling [`Monitor`] on a tokio runtime in a background thread
/// 2. Bridges its states to a std channel for the UI thread
/// 3. Creates the tray icon on the main thread
/// 4. Runs the eframe event loop, with the hidden window as the URL dialog
pub fn run(store: ConfigStore) -> Result<()> {
    info!("Using config at: {}", store.path().display());
    let initial = MenuState::connecting(store.config());

    let (command_tx, command_rx) = mpsc::channel::<MonitorCommand>(16);
    let (state_tx, state_rx_tokio) = mpsc::channel::<MenuState>(16);

    // Bridge from tokio mpsc to std mpsc for sync access in egui
    let (std_tx, std_rx) = std_mpsc::channel::<MenuState>();

    let cancel = CancellationToken::new();
    let monitor = Monitor::new(Poller::new(store), command_rx, state_tx, cancel.clone());
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let worker = std::thread::spawn(move || {
        runtime.block_on(async {
            let mut state_rx = state_rx_tokio;
            let forward_handle = tokio::spawn(async move {
                while let Some(state) = state_rx.recv().await {
                    if std_tx.send(state).is_err() {
                        break; // GUI closed
                    }
                    tray::request_repaint();
                }
            });

            monitor.run().await;
            forward_handle.abort();
        });
    });

    // Create system tray icon (must be on main thread before event loop)
    let tray_manager = match TrayManager::new(&initial) {
        Ok(manager) => Some(manager),
        Err(e) => {
            warn!("Failed to create system tray: {}. Continuing without tray.", e);
            None
        }
    };

    let (rgba, width, height) = icon_rgba();
    let viewport = egui::ViewportBuilder::default()
        .with_title(DIALOG_TITLE)
        .with_inner_size([440.0, 220.0])
        .with_resizable(false)
        .with_visible(false)
        .with_icon(Arc::new(IconData {
            rgba,
            width,
            height,
        }));

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let app_cancel = cancel.clone();
    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(NightscoutApp::new(
                cc,
                command_tx,
                std_rx,
                initial,
                tray_manager,
                app_cancel,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run eframe: {}", e))?;

    cancel.cancel();
    if worker.join().is_err() {
        warn!("Monitor thread panicked");
    }
    Ok(())
}
