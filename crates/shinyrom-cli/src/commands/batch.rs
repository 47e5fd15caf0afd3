//! Batch command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use shinyrom::{Patcher, parse_odds};
use tracing::info;

use super::default_output;
use crate::archive::{collect_files, copy_tree, extract_zip, is_zip, write_zip};
use crate::console;

/// Patch every supported ROM in a directory or zip and repackage the successes
pub fn run(
    patcher: &Patcher,
    input: &Path,
    output: Option<&Path>,
    odds: &str,
    json: bool,
) -> Result<()> {
    let byte = parse_odds(odds);
    let workdir = tempfile::tempdir().context("Failed to create working directory")?;

    if is_zip(input) && input.is_file() {
        extract_zip(input, workdir.path())?;
    } else if input.is_dir() {
        copy_tree(input, workdir.path())?;
    } else {
        bail!("{} is neither a directory nor a .zip archive", input.display());
    }

    let files = collect_files(workdir.path())?;
    info!("Found {} file(s) in {}", files.len(), input.display());

    let report = patcher.patch_batch(&files, byte);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        console::print_log(&report.combined_log());
    }

    if !report.is_success() {
        bail!("No compatible ROMs found");
    }

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_batch_output(input)?,
    };
    let patched = report.succeeded();
    write_zip(&output, workdir.path(), &patched)?;

    if !json {
        eprintln!("Wrote {} patched ROM(s) to {}", patched.len(), output.display());
    }
    Ok(())
}

fn default_batch_output(input: &Path) -> Result<PathBuf> {
    let input = input
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", input.display()))?;
    Ok(default_output(&input, Some("zip")))
}
