//! eframe application: owns the tray and the URL entry dialog.
//!
//! The window is the dialog. It stays hidden until `Set Nightscout URL...`
//! is chosen and closing it hides it again.

use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use eframe::egui::{self, ViewportCommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::tray::{self, TrayCommand, TrayManager};
use crate::PROJECT_HOMEPAGE;
use crate::monitor::{MenuState, MonitorCommand};

/// Window title of the URL entry dialog.
pub const DIALOG_TITLE: &str = "Nightscout Menubar Configuration";

/// Explanation shown above the URL field.
pub const DIALOG_MESSAGE: &str =
    "Enter your nightscout URL below.\n\nIt probably looks like:\nhttps://SOMETHING.herokuapp.com";

/// Outcome of one frame of the URL dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DialogResult {
    Open,
    Ok(String),
    Cancel,
}

pub struct NightscoutApp {
    command_tx: mpsc::Sender<MonitorCommand>,
    state_rx: std_mpsc::Receiver<MenuState>,
    state: MenuState,
    tray_manager: Option<TrayManager>,
    /// Text being edited, `Some` while the dialog is shown
    url_input: Option<String>,
    cancel: CancellationToken,
    quitting: bool,
}

impl NightscoutApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        command_tx: mpsc::Sender<MonitorCommand>,
        state_rx: std_mpsc::Receiver<MenuState>,
        initial: MenuState,
        tray_manager: Option<TrayManager>,
        cancel: CancellationToken,
    ) -> Self {
        tray::set_egui_context(cc.egui_ctx.clone());

        Self {
            command_tx,
            state_rx,
            state: initial,
            tray_manager,
            url_input: None,
            cancel,
            quitting: false,
        }
    }

    fn send_command(&self, command: MonitorCommand) {
        if let Err(e) = self.command_tx.try_send(command) {
            warn!("Failed to send monitor command: {}", e);
        }
    }

    /// Apply states published by the monitor.
    fn process_states(&mut self) {
        while let Ok(state) = self.state_rx.try_recv() {
            debug!("New menu state: {:?}", state.view.title);
            if let Some(tray_manager) = self.tray_manager.as_mut()
                && let Err(e) = tray_manager.update(&state)
            {
                warn!("Failed to update tray: {}", e);
            }
            self.state = state;
        }
    }

    /// Process tray menu clicks.
    fn process_tray_events(&mut self, ctx: &egui::Context) {
        let Some(ref tray_manager) = self.tray_manager else {
            return;
        };

        for command in tray_manager.process_events() {
            match command {
                TrayCommand::SetUnit(unit) => {
                    self.send_command(MonitorCommand::SetUnit(unit));
                }
                TrayCommand::ShowUrlDialog => {
                    self.url_input = Some(self.state.host.clone());
                    ctx.send_viewport_cmd(ViewportCommand::Visible(true));
                    ctx.send_viewport_cmd(ViewportCommand::Focus);
                }
                TrayCommand::OpenHelp => open_url(PROJECT_HOMEPAGE),
                TrayCommand::OpenSite => {
                    if self.state.has_host() {
                        open_url(&self.state.host);
                    }
                }
                TrayCommand::Quit => {
                    info!("Quitting");
                    self.quitting = true;
                    self.cancel.cancel();
                    ctx.send_viewport_cmd(ViewportCommand::Close);
                }
            }
        }
    }

    fn hide_dialog(&mut self, ctx: &egui::Context) {
        self.url_input = None;
        ctx.send_viewport_cmd(ViewportCommand::Visible(false));
    }

    fn show_dialog(&mut self, ctx: &egui::Context) {
        let Some(text) = self.url_input.as_mut() else {
            return;
        };

        let mut result = DialogResult::Open;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(DIALOG_TITLE);
            ui.add_space(8.0);
            ui.label(DIALOG_MESSAGE);
            ui.add_space(8.0);

            let response = ui.add(
                egui::TextEdit::singleline(text)
                    .hint_text("https://SOMETHING.herokuapp.com")
                    .desired_width(f32::INFINITY),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                result = DialogResult::Ok(text.clone());
            }

            ui.add_space(8.0);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("OK").clicked() {
                    result = DialogResult::Ok(text.clone());
                }
                if ui.button("Cancel").clicked() {
                    result = DialogResult::Cancel;
                }
            });
        });

        match result {
            DialogResult::Open => {}
            DialogResult::Ok(host) => {
                self.send_command(MonitorCommand::SetHost(host.trim().to_string()));
                self.hide_dialog(ctx);
            }
            DialogResult::Cancel => self.hide_dialog(ctx),
        }
    }
}

fn open_url(url: &str) {
    if let Err(e) = open::that(url) {
        warn!("Failed to open {}: {}", url, e);
    }
}

impl eframe::App for NightscoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_states();
        self.process_tray_events(ctx);

        // Closing the dialog window hides it; only Quit ends the app
        let close_requested = ctx.input(|i| i.viewport().close_requested());
        if close_requested && !self.quitting {
            ctx.send_viewport_cmd(ViewportCommand::CancelClose);
            self.hide_dialog(ctx);
            debug!("Window close intercepted - hiding dialog");
        }

        self.show_dialog(ctx);

        ctx.request_repaint_after(Duration::from_millis(500));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.cancel.cancel();
    }
}
