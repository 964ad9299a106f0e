//! Menu-bar (system tray) indicator.
//!
//! The title next to the icon carries the glucose text on macOS. Other
//! platforms only show an icon, so the same text goes into the tooltip.
//! The menu is rebuilt from scratch on every update because the number of
//! history lines changes between polls.

use std::sync::Mutex;

use nightscout_types::GlucoseUnit;
use tracing::{debug, info, warn};
use tray_icon::menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

use crate::VERSION;
use crate::monitor::MenuState;

/// Global egui context for waking up the event loop.
/// Menu clicks and new readings arrive while the window is hidden and the
/// event loop is idle.
static EGUI_CTX: Mutex<Option<egui::Context>> = Mutex::new(None);

/// Global queue for menu events.
/// With set_event_handler installed the default receiver gets nothing, so we
/// queue events ourselves.
static MENU_EVENTS: Mutex<Vec<MenuEvent>> = Mutex::new(Vec::new());

/// Side length of the generated icon in pixels.
const ICON_SIZE: u32 = 32;

/// Set the global egui context used by [`request_repaint`].
pub fn set_egui_context(ctx: egui::Context) {
    if let Ok(mut guard) = EGUI_CTX.lock() {
        *guard = Some(ctx);
    }
}

/// Wake the egui event loop, if it is running.
pub fn request_repaint() {
    if let Ok(guard) = EGUI_CTX.lock()
        && let Some(ctx) = guard.as_ref()
    {
        ctx.request_repaint();
    }
}

/// Error type for tray operations.
#[derive(Debug)]
pub enum TrayError {
    Icon(String),
    TrayIcon(tray_icon::Error),
    Menu(tray_icon::menu::Error),
}

impl std::fmt::Display for TrayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrayError::Icon(s) => write!(f, "Failed to create icon: {}", s),
            TrayError::TrayIcon(e) => write!(f, "Tray icon error: {}", e),
            TrayError::Menu(e) => write!(f, "Menu error: {}", e),
        }
    }
}

impl std::error::Error for TrayError {}

impl From<tray_icon::Error> for TrayError {
    fn from(e: tray_icon::Error) -> Self {
        TrayError::TrayIcon(e)
    }
}

impl From<tray_icon::menu::Error> for TrayError {
    fn from(e: tray_icon::menu::Error) -> Self {
        TrayError::Menu(e)
    }
}

/// Commands that can be sent from the tray to the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayCommand {
    /// Switch display unit
    SetUnit(GlucoseUnit),
    /// Show the URL entry dialog
    ShowUrlDialog,
    /// Open the project homepage
    OpenHelp,
    /// Open the configured Nightscout site
    OpenSite,
    /// Quit the application
    Quit,
}

/// Clickable items of the current menu.
struct MenuItems {
    mgdl: CheckMenuItem,
    mmol: CheckMenuItem,
    set_url: MenuItem,
    help: MenuItem,
    open_site: MenuItem,
    quit: MenuItem,
}

/// Manager for the tray icon and its menu.
pub struct TrayManager {
    tray_icon: TrayIcon,
    items: MenuItems,
}

impl TrayManager {
    /// Create the tray icon showing `state`. Must run on the main thread.
    pub fn new(state: &MenuState) -> Result<Self, TrayError> {
        let (menu, items) = build_menu(state)?;
        let (rgba, width, height) = icon_rgba();
        let icon =
            Icon::from_rgba(rgba, width, height).map_err(|e| TrayError::Icon(e.to_string()))?;

        let tray_icon = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_title(&state.view.title)
            .with_tooltip(&state.view.title)
            .with_icon(icon)
            .with_icon_as_template(true)
            .build()?;

        MenuEvent::set_event_handler(Some(move |event| {
            debug!("MenuEvent received: {:?}", event);
            if let Ok(mut guard) = MENU_EVENTS.lock() {
                guard.push(event);
            }
            request_repaint();
        }));

        info!("System tray icon created");

        Ok(Self { tray_icon, items })
    }

    /// Redraw title, tooltip and menu for a new state.
    pub fn update(&mut self, state: &MenuState) -> Result<(), TrayError> {
        let (menu, items) = build_menu(state)?;
        self.tray_icon.set_menu(Some(Box::new(menu)));
        self.items = items;

        self.tray_icon.set_title(Some(&state.view.title));
        if let Err(e) = self.tray_icon.set_tooltip(Some(&state.view.title)) {
            warn!("Failed to update tray tooltip: {}", e);
        }
        Ok(())
    }

    /// Process pending menu events and return any commands.
    pub fn process_events(&self) -> Vec<TrayCommand> {
        let menu_events: Vec<MenuEvent> = if let Ok(mut guard) = MENU_EVENTS.lock() {
            std::mem::take(&mut *guard)
        } else {
            Vec::new()
        };

        let mut commands = Vec::new();
        for event in menu_events {
            if event.id == self.items.mgdl.id() {
                debug!("Tray: mg/dL clicked");
                commands.push(TrayCommand::SetUnit(GlucoseUnit::MgDl));
            } else if event.id == self.items.mmol.id() {
                debug!("Tray: mmol/L clicked");
                commands.push(TrayCommand::SetUnit(GlucoseUnit::MmolL));
            } else if event.id == self.items.set_url.id() {
                debug!("Tray: Set Nightscout URL clicked");
                commands.push(TrayCommand::ShowUrlDialog);
            } else if event.id == self.items.help.id() {
                commands.push(TrayCommand::OpenHelp);
            } else if event.id == self.items.open_site.id() {
                commands.push(TrayCommand::OpenSite);
            } else if event.id == self.items.quit.id() {
                debug!("Tray: Quit clicked");
                commands.push(TrayCommand::Quit);
            }
        }
        commands
    }
}

/// Lines above the settings: the view's items, then the updated time.
///
/// An empty entry stands for a separator.
pub fn status_lines(state: &MenuState) -> Vec<String> {
    let mut lines = state.view.items.clone();
    lines.push(String::new());
    lines.push(state.updated_label());
    lines
}

fn build_menu(state: &MenuState) -> Result<(Menu, MenuItems), TrayError> {
    let menu = Menu::new();

    for line in status_lines(state) {
        if line.is_empty() {
            menu.append(&PredefinedMenuItem::separator())?;
        } else {
            menu.append(&MenuItem::new(line, false, None))?;
        }
    }

    let is_mmol = state.unit.is_mmol();
    let items = MenuItems {
        mgdl: CheckMenuItem::new(GlucoseUnit::MgDl.label(), true, !is_mmol, None),
        mmol: CheckMenuItem::new(GlucoseUnit::MmolL.label(), true, is_mmol, None),
        set_url: MenuItem::new("Set Nightscout URL...", true, None),
        help: MenuItem::new("Help...", true, None),
        open_site: MenuItem::new("Open Nightscout site...", state.has_host(), None),
        quit: MenuItem::new("Quit", true, None),
    };

    let settings = Submenu::with_items(
        "Settings",
        true,
        &[
            &items.mgdl,
            &items.mmol,
            &PredefinedMenuItem::separator(),
            &items.set_url,
            &items.help,
            &PredefinedMenuItem::separator(),
            &MenuItem::new(format!("Version {}", VERSION), false, None),
        ],
    )?;

    menu.append_items(&[
        &PredefinedMenuItem::separator(),
        &settings,
        &PredefinedMenuItem::separator(),
        &items.open_site,
        &PredefinedMenuItem::separator(),
        &items.quit,
    ])?;

    Ok((menu, items))
}

/// A white drop on a transparent background, usable as a template icon.
pub fn icon_rgba() -> (Vec<u8>, u32, u32) {
    let size = ICON_SIZE as f32;
    let center = size / 2.0;
    let radius = size * 0.3;
    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);

    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            // Circle for the body, with a point rising to the top edge
            let body_y = size * 0.6;
            let in_body = (px - center).powi(2) + (py - body_y).powi(2) <= radius * radius;
            let tip_top = size * 0.08;
            let in_tip = py >= tip_top
                && py <= body_y
                && (px - center).abs() <= radius * (py - tip_top) / (body_y - tip_top);
            let alpha = if in_body || in_tip { 255 } else { 0 };
            rgba.extend_from_slice(&[255, 255, 255, alpha]);
        }
    }

    (rgba, ICON_SIZE, ICON_SIZE)
}
