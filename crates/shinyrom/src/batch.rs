//! Multi-ROM runs with a combined report.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::patch::PatchLog;
use crate::patcher::{PatchOutcome, Patcher};
use crate::threshold::PatchByte;

/// File extensions considered for patching, compared case-insensitively
pub const ROM_EXTENSIONS: [&str; 2] = ["gba", "nds"];

pub fn has_rom_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        ROM_EXTENSIONS
            .iter()
            .any(|rom_ext| ext.eq_ignore_ascii_case(rom_ext))
    })
}

/// Outcomes of a batch run, in processing order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<PatchOutcome>,
}

impl BatchReport {
    /// Paths of the files that were patched successfully
    pub fn succeeded(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.success)
            .filter_map(|outcome| outcome.path.as_deref())
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// A batch succeeds when at least one ROM was patched.
    pub fn is_success(&self) -> bool {
        self.success_count() > 0
    }

    /// Every file's log, each preceded by a header naming the file.
    pub fn combined_log(&self) -> PatchLog {
        let mut log = PatchLog::new();
        for outcome in &self.outcomes {
            if outcome.skipped {
                log.append(&outcome.log);
                continue;
            }
            if !outcome.is_recognized() {
                log.info(format!("Skipped {}: not a supported ROM", outcome.display_name()));
                continue;
            }
            log.push_line(format!("== {} ==", outcome.display_name()));
            log.append(&outcome.log);
        }
        log.info(format!(
            "{} patched, {} failed or skipped",
            self.success_count(),
            self.failure_count()
        ));
        log
    }
}

impl Patcher {
    /// Patch each `.gba`/`.nds` file in place; other files are skipped
    /// unread. A failure on one file never stops the run.
    pub fn patch_batch<I, P>(&self, paths: I, byte: PatchByte) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let outcomes: Vec<PatchOutcome> = paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref();
                if has_rom_extension(path) {
                    self.patch_file(path, byte)
                } else {
                    debug!("Skipping {} by extension", path.display());
                    PatchOutcome::skipped(path, "not a .gba or .nds file")
                }
            })
            .collect();

        let report = BatchReport { outcomes };
        info!(
            "Batch finished: {} of {} file(s) patched",
            report.success_count(),
            report.outcomes.len()
        );
        report
    }
}
