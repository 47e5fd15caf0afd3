//! Offsets command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use shinyrom::{OffsetTable, save_offset_table};

/// List the active offset table, optionally dumping it as JSON
pub fn run(table: &OffsetTable, dump: Option<&Path>) -> Result<()> {
    if let Some(path) = dump {
        save_offset_table(path, table)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Wrote offset table {} to {}", table.version, path.display());
        return Ok(());
    }

    println!("Offset table: {}", table.version);
    println!("Signature:    {}", table.signature);
    println!("Default NDS offset: 0x{:X}", table.default_container_offset);
    println!();
    println!("{:<6} {:<4} {:>10}  {}", "Code", "Kind", "Offset", "Game");
    for (code, entry) in &table.games {
        println!(
            "{:<6} {:<4} {:>10}  {}",
            code,
            entry.kind.short_name(),
            format!("0x{:X}", entry.offset),
            entry.name
        );
        for extra in table.cosmetic(code) {
            println!("{:<6} {:<4} {:>10}  (cosmetic)", "", "", format!("0x{:X}", extra));
        }
    }
    Ok(())
}
