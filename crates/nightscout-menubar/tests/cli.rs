//! CLI Integration Tests
//!
//! These tests run the binary with its config directory pointed at a
//! temporary directory, so they never touch the real settings and need no
//! Nightscout site.
//!
//! ```
//! cargo test --package nightscout-menubar --test cli
//! ```

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run the binary with `home` as both HOME and XDG_CONFIG_HOME.
fn run_menubar(home: &Path, args: &[&str]) -> Output {
    run_menubar_with_no_color(home, args, Some("1"))
}

fn run_menubar_with_no_color(home: &Path, args: &[&str], no_color: Option<&str>) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nightscout-menubar"));
    command
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    match no_color {
        Some(value) => command.env("NO_COLOR", value),
        None => command.env_remove("NO_COLOR"),
    };
    command.output().expect("Failed to run nightscout-menubar binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// Help and Version
// =============================================================================

#[test]
fn test_help_command() {
    let home = TempDir::new().unwrap();
    let output = run_menubar(home.path(), &["--help"]);

    assert!(output.status.success(), "Help should succeed");

    let stdout = stdout(&output);
    assert!(stdout.contains("status"), "Help should list status command");
    assert!(stdout.contains("watch"), "Help should list watch command");
    assert!(stdout.contains("config"), "Help should list config command");
    assert!(stdout.contains("debug"), "Help should mention the debug alias");
}

#[test]
fn test_version_command() {
    let home = TempDir::new().unwrap();
    let output = run_menubar(home.path(), &["--version"]);

    assert!(output.status.success(), "Version should succeed");
    let stdout = stdout(&output);
    assert!(stdout.contains("nightscout-menubar"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_subcommand_help() {
    let home = TempDir::new().unwrap();
    for cmd in ["run", "status", "watch", "config"] {
        let output = run_menubar(home.path(), &[cmd, "--help"]);
        assert!(output.status.success(), "{} --help should succeed", cmd);
        assert!(!stdout(&output).is_empty(), "{} --help should produce output", cmd);
    }
}

#[test]
fn test_no_color_env_values() {
    let home = TempDir::new().unwrap();
    for value in [Some("1"), Some("yes"), Some("true"), Some(""), Some("0"), None] {
        let output = run_menubar_with_no_color(home.path(), &["config", "path"], value);
        assert!(
            output.status.success(),
            "NO_COLOR={:?} should be accepted, stderr: {}",
            value,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn test_no_color_flag() {
    let home = TempDir::new().unwrap();
    let output = run_menubar_with_no_color(home.path(), &["--no-color", "status"], None);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.starts_with("<Need settings>"), "got: {stdout}");
    assert!(!stdout.contains('\u{1b}'));
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_path_is_created() {
    let home = TempDir::new().unwrap();
    let output = run_menubar(home.path(), &["config", "path"]);

    assert!(output.status.success());
    let path = stdout(&output).trim().to_string();
    assert!(path.ends_with("config.toml"), "unexpected path: {path}");
    assert!(path.contains("nightscout-menubar"));
    assert!(Path::new(&path).exists(), "defaults should be written");
}

#[test]
fn test_config_set_url_and_show() {
    let home = TempDir::new().unwrap();

    let output = run_menubar(
        home.path(),
        &["config", "set-url", "https://cgm.example.test/"],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("https://cgm.example.test"));

    let output = run_menubar(home.path(), &["config", "show"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("nightscout_host = \"https://cgm.example.test\""));
}

#[test]
fn test_config_set_url_rejects_bad_scheme() {
    let home = TempDir::new().unwrap();
    let output = run_menubar(home.path(), &["config", "set-url", "ftp://cgm.example.test"]);
    assert!(!output.status.success());
}

#[test]
fn test_config_units() {
    let home = TempDir::new().unwrap();

    let output = run_menubar(home.path(), &["config", "units", "mmol"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("mmol/L"));

    let output = run_menubar(home.path(), &["config", "show"]);
    assert!(stdout(&output).contains("use_mmol = true"));

    let output = run_menubar(home.path(), &["config", "units", "furlongs"]);
    assert!(!output.status.success());
}

// =============================================================================
// Status without a configured site
// =============================================================================

#[test]
fn test_status_without_host_needs_settings() {
    let home = TempDir::new().unwrap();
    let output = run_menubar(home.path(), &["status"]);

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.starts_with("<Need settings>"), "got: {stdout}");
    assert!(stdout.contains("Updated "));
}

#[test]
fn test_status_json_without_host() {
    let home = TempDir::new().unwrap();
    let output = run_menubar(home.path(), &["status", "--json"]);

    assert!(output.status.success());
    let view: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(view["title"], "<Need settings>");
    assert_eq!(view["items"], serde_json::json!([]));
}
