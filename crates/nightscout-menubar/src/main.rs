mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use nightscout_menubar::ConfigStore;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigAction};
use commands::{cmd_config_path, cmd_config_show, cmd_set_unit, cmd_set_url, cmd_status, cmd_watch};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let no_color = cli.no_color;
    let mut store = ConfigStore::open_default();
    tracing::debug!("Using config at {}", store.path().display());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_gui(store),
        Commands::Status { json } => runtime()?.block_on(cmd_status(store, json, no_color)),
        Commands::Watch { count } => runtime()?.block_on(cmd_watch(store, count, no_color)),
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&store, no_color),
            ConfigAction::Path => cmd_config_path(&store),
            ConfigAction::SetUrl { url } => cmd_set_url(&mut store, url),
            ConfigAction::Units { unit } => cmd_set_unit(&mut store, unit.into()),
        },
    }
}

/// The tray needs the main thread, so only headless commands get a runtime here.
fn runtime() -> Result<tokio::runtime::Runtime> {
    use anyhow::Context;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}

#[cfg(feature = "gui")]
fn run_gui(store: ConfigStore) -> Result<()> {
    nightscout_menubar::gui::run(store)
}

#[cfg(not(feature = "gui"))]
fn run_gui(_store: ConfigStore) -> Result<()> {
    anyhow::bail!(
        "This build has no menu-bar support. Rebuild with `--features gui`, \
         or use `status` / `watch` for terminal output."
    )
}
