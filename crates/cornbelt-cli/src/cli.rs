//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Parser)]
#[command(name = "cornbelt")]
#[command(author, version, about = "Weather data pipeline for Corn Belt agriculture", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "CORNBELT_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides the config file)
    #[arg(long, global = true, env = "CORNBELT_DATABASE")]
    pub database: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch historical and forecast data and write record files
    Collect {
        #[command(flatten)]
        args: CollectArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Load record files into the database
    Load {
        /// Directory with record files (defaults to the configured output_dir)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print aggregate weather reports from the database
    Report {
        /// Year for the monthly precipitation section
        #[arg(short, long, default_value_t = cornbelt_store::DEFAULT_REPORT_YEAR)]
        year: i32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect record files without loading them
    Check {
        /// Directory with record files (defaults to the configured output_dir)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Collection step selection
#[derive(Debug, Clone, Args)]
pub struct CollectArgs {
    /// Do not fetch historical data
    #[arg(long)]
    pub skip_historical: bool,

    /// Do not fetch forecast data
    #[arg(long)]
    pub skip_forecast: bool,

    /// Do not write merged files
    #[arg(long)]
    pub no_combined: bool,

    /// Also write a CSV copy of every record file
    #[arg(long)]
    pub csv: bool,

    /// Only these locations (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub locations: Vec<String>,

    /// Directory for record files (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the configuration for errors
    Validate,
}
