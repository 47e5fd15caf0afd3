//! Identify command implementation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use shinyrom::Patcher;

/// Print the identity of each file, or "unrecognized"
pub fn run(patcher: &Patcher, roms: &[PathBuf]) -> Result<()> {
    for path in roms {
        let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

        match patcher.classify(&data) {
            Some(identity) => {
                let offset = patcher
                    .table()
                    .entry(&identity.game_code)
                    .filter(|entry| entry.kind == identity.kind)
                    .map(|entry| format!("{} @ 0x{:X}", entry.name, entry.offset))
                    .unwrap_or_else(|| "not in offset table".to_string());
                println!("{}: {} [{}]", path.display(), identity, offset);
            }
            None => println!("{}: unrecognized", path.display()),
        }
    }
    Ok(())
}
