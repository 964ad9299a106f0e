//! CLI argument definitions using clap.

use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use nightscout_types::GlucoseUnit;

#[derive(Parser)]
#[command(name = "nightscout-menubar")]
#[command(author, version, about = "Nightscout glucose readings in the menu bar", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, visible_alias = "debug")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also set by NO_COLOR)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = FalseyValueParser::new()
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the menu-bar indicator (default)
    Run,

    /// Fetch once and print the menu text
    Status {
        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll continuously and print every update
    Watch {
        /// Stop after this many updates (0 for no limit)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Set the Nightscout site URL (prompts when omitted)
    SetUrl {
        /// Site URL, e.g. https://example.herokuapp.com
        url: Option<String>,
    },

    /// Choose the display unit
    Units {
        #[arg(value_enum)]
        unit: UnitArg,
    },
}

/// Display unit as typed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    /// Milligrams per decilitre
    #[value(name = "mg-dl", alias = "mgdl")]
    MgDl,
    /// Millimoles per litre
    Mmol,
}

impl From<UnitArg> for GlucoseUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::MgDl => GlucoseUnit::MgDl,
            UnitArg::Mmol => GlucoseUnit::MmolL,
        }
    }
}
