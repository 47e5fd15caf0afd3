mod archive;
mod cli;
mod commands;
mod console;

use anyhow::{Context, Result};
use clap::Parser;
use shinyrom::{Patcher, PatcherConfig, builtin_offset_table, load_offset_table};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let directive = if cli.verbose {
        "shinyrom=debug"
    } else {
        "shinyrom=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Load offsets
    let table = match &cli.offsets {
        Some(path) => load_offset_table(path)
            .with_context(|| format!("Failed to load offset table {}", path.display()))?,
        None => builtin_offset_table(),
    };
    info!("Loaded offsets version: {}", table.version);

    let patcher = Patcher::with_config(PatcherConfig::builder().offset_table(table).build());

    match cli.command {
        Command::Identify { roms } => commands::identify::run(&patcher, &roms),
        Command::Patch {
            rom,
            output,
            odds,
            json,
        } => commands::patch::run(&patcher, &rom, output.as_deref(), &odds.odds, json),
        Command::Batch {
            input,
            output,
            odds,
            json,
        } => commands::batch::run(&patcher, &input, output.as_deref(), &odds.odds, json),
        Command::Threshold { odds } => commands::threshold::run(&odds),
        Command::Offsets { dump } => commands::offsets::run(patcher.table(), dump.as_deref()),
    }
}
