//! Command implementations for the CLI.

mod config;
mod status;
mod watch;

pub use config::{cmd_config_path, cmd_config_show, cmd_set_unit, cmd_set_url};
pub use status::{cmd_status, format_state};
pub use watch::cmd_watch;
