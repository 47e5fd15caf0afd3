//! CLI command implementations.

pub mod batch;
pub mod identify;
pub mod offsets;
pub mod patch;
pub mod threshold;

use std::path::{Path, PathBuf};

/// `patched_<name>` next to `input`
pub fn default_output(input: &Path, extension: Option<&str>) -> PathBuf {
    let name = match extension {
        Some(ext) => {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            format!("patched_{}.{}", stem, ext)
        }
        None => {
            let name = input.file_name().unwrap_or_default().to_string_lossy();
            format!("patched_{}", name)
        }
    };
    input.with_file_name(name)
}
