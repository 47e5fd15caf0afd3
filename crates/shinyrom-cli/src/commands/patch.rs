//! Patch command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use shinyrom::{Patcher, parse_odds};
use tracing::warn;

use super::default_output;
use crate::console;

/// Copy `rom` to the output path and patch the copy
pub fn run(
    patcher: &Patcher,
    rom: &Path,
    output: Option<&Path>,
    odds: &str,
    json: bool,
) -> Result<()> {
    let byte = parse_odds(odds);
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(rom, None));

    if same_file(rom, &output) {
        bail!(
            "Output {} is the input ROM; choose a different --output",
            output.display()
        );
    }

    fs::copy(rom, &output).with_context(|| {
        format!("Failed to copy {} to {}", rom.display(), output.display())
    })?;

    let outcome = patcher.patch_file(&output, byte);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        console::print_log(&outcome.log);
    }

    if !outcome.success {
        if let Err(e) = fs::remove_file(&output) {
            warn!("Failed to remove {}: {}", output.display(), e);
        }
        bail!("Failed to patch {}", rom.display());
    }

    if !json {
        eprintln!("Wrote {}", output.display());
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
