//! Menu-bar indicator for Nightscout continuous glucose readings.
//!
//! This crate provides the `nightscout-menubar` binary: a tray/menu-bar
//! indicator that polls a Nightscout site and shows the latest glucose value,
//! its trend and the state of the closed loop.
//!
//! # Features
//!
//! - **Menu-bar title**: loop freshness, value, trend arrow, delta and age
//! - **History**: the previous readings listed in the menu
//! - **Units**: mg/dL or mmol/L, persisted in the config file
//! - **Headless mode**: `status` and `watch` print the same text to a terminal
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Start the menu-bar indicator (default, needs the `gui` feature) |
//! | `status` | Fetch once and print the menu text |
//! | `watch` | Poll continuously and print every update |
//! | `config` | Show or change the configuration |
//!
//! # Configuration
//!
//! Settings live in `~/.config/nightscout-menubar/config.toml` (or the
//! platform equivalent):
//!
//! - `nightscout_host`: Nightscout site URL
//! - `use_mmol`: show mmol/L instead of mg/dL
//! - `poll_interval_secs`: seconds between polls
//! - `request_timeout_secs`: per-request timeout
//! - `accept_invalid_certs`: allow self-signed certificates
//!
//! # Examples
//!
//! Point the indicator at a site:
//! ```bash
//! nightscout-menubar config set-url https://example.herokuapp.com
//! ```
//!
//! Print the current reading:
//! ```bash
//! nightscout-menubar status
//! ```

pub mod config;
pub mod monitor;

#[cfg(feature = "gui")]
pub mod gui;

pub use nightscout_core;
pub use nightscout_types;

pub use config::{Config, ConfigStore};
pub use monitor::{MenuState, Monitor, MonitorCommand, Poller};

/// Application name shown in window titles.
pub const APP_NAME: &str = "Nightscout Menubar";

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Opened by the `Help...` menu item.
pub const PROJECT_HOMEPAGE: &str = "https://github.com/kretep/nightscout-osx-menubar";
