//! Status command implementation.

use anyhow::{Context, Result};
use nightscout_menubar::{ConfigStore, MenuState, Poller};
use owo_colors::OwoColorize;

pub async fn cmd_status(store: ConfigStore, json: bool, no_color: bool) -> Result<()> {
    let mut poller = Poller::new(store);
    let state = poller.poll().await;

    if json {
        let content =
            serde_json::to_string_pretty(&state.view).context("Failed to serialize view")?;
        println!("{content}");
    } else {
        print!("{}", format_state(&state, no_color));
    }
    Ok(())
}

/// Render a menu state the way the menu shows it: title, items, updated line.
pub fn format_state(state: &MenuState, no_color: bool) -> String {
    let title = if no_color {
        state.view.title.clone()
    } else if state.view.is_error() {
        format!("{}", state.view.title.red().bold())
    } else {
        format!("{}", state.view.title.cyan().bold())
    };

    let mut out = format!("{title}\n");
    for item in &state.view.items {
        out.push_str(&format!("  {item}\n"));
    }

    let updated = state.updated_label();
    if no_color {
        out.push_str(&format!("  {updated}\n"));
    } else {
        out.push_str(&format!("  {}\n", updated.dimmed()));
    }
    out
}
