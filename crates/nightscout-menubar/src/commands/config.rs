//! Config command implementations.

use anyhow::{Context, Result, bail};
use nightscout_core::client::normalize_base_url;
use nightscout_menubar::ConfigStore;
use nightscout_types::GlucoseUnit;
use owo_colors::OwoColorize;

pub fn cmd_config_show(store: &ConfigStore, no_color: bool) -> Result<()> {
    let content = toml::to_string_pretty(store.config()).context("Failed to serialize config")?;
    let header = format!("# {}", store.path().display());
    if no_color {
        println!("{header}");
    } else {
        println!("{}", header.dimmed());
    }
    print!("{content}");
    Ok(())
}

pub fn cmd_config_path(store: &ConfigStore) -> Result<()> {
    println!("{}", store.path().display());
    Ok(())
}

pub fn cmd_set_url(store: &mut ConfigStore, url: Option<String>) -> Result<()> {
    let url = match url {
        Some(url) => url,
        None => prompt_url(&store.config().nightscout_host)?,
    };

    let url = url.trim();
    if !url.is_empty() {
        normalize_base_url(url).context("Not a usable Nightscout URL")?;
    }

    store.set_host(url)?;
    let host = &store.config().nightscout_host;
    if host.is_empty() {
        println!("Nightscout URL cleared");
    } else {
        println!("Nightscout URL set to {host}");
    }
    Ok(())
}

pub fn cmd_set_unit(store: &mut ConfigStore, unit: GlucoseUnit) -> Result<()> {
    store.set_unit(unit)?;
    println!("Display unit set to {unit}");
    Ok(())
}

#[cfg(feature = "cli")]
fn prompt_url(current: &str) -> Result<String> {
    use std::io::{self, IsTerminal};

    use dialoguer::{Input, theme::ColorfulTheme};

    if !io::stdin().is_terminal() {
        bail!("No URL given. Use `config set-url <URL>`.");
    }

    eprintln!("Enter your nightscout URL below.\n\nIt probably looks like:\nhttps://SOMETHING.herokuapp.com\n");
    let url = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Nightscout URL")
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()
        .context("Failed to read URL")?;
    Ok(url)
}

#[cfg(not(feature = "cli"))]
fn prompt_url(_current: &str) -> Result<String> {
    bail!("No URL given. Use `config set-url <URL>`.")
}
