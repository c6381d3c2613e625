//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Polling change detection for tabular files
#[derive(Parser, Debug)]
#[command(
    name = "tabwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch CSV files and archive every change",
    long_about = "Poll tabular files on a schedule, report added and removed rows, \
                  and keep a numbered history of every change.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .tabwatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,

        /// Files to watch on every `tabwatch watch`
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,
    },

    /// Show current configuration
    #[command(about = "Display active settings")]
    Config,

    /// Watch files until interrupted
    #[command(about = "Poll files and report changes until Ctrl-C")]
    Watch {
        /// Files to watch in addition to those in settings.toml
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Polling interval in seconds for the files given here
        #[arg(short, long)]
        interval: Option<u64>,

        /// Do not archive changes
        #[arg(long)]
        no_archive: bool,
    },

    /// Print archived versions
    #[command(about = "Show the archived change history of a file")]
    History {
        /// File whose history to print; lists all archived files if omitted
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Delete archived versions
    #[command(about = "Remove the archived history of a file")]
    Purge {
        /// File whose history to remove
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}
