//! Command line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shinyrom")]
#[command(version, about = "Shiny odds patcher for Pokemon GBA and NDS ROMs")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON offset table replacing the builtin one
    #[arg(long, global = true)]
    pub offsets: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct OddsArg {
    /// Desired shiny odds as "1 in N"
    #[arg(short = 'n', long, env = "SHINYROM_ODDS", default_value = "8192")]
    pub odds: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the detected format and game code of each file
    Identify {
        #[arg(required = true)]
        roms: Vec<PathBuf>,
    },

    /// Patch a copy of a single ROM
    Patch {
        rom: PathBuf,

        /// Output path (default: patched_<name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        odds: OddsArg,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Patch every supported ROM in a directory or .zip archive
    Batch {
        input: PathBuf,

        /// Output archive (default: patched_<name>.zip next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        odds: OddsArg,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the patch byte for the given odds
    Threshold { odds: String },

    /// List the offset table
    Offsets {
        /// Write the table as JSON to this file
        #[arg(long)]
        dump: Option<PathBuf>,
    },
}
