use std::fmt;

use serde::{Deserialize, Serialize};

pub const INFO_PREFIX: &str = "[*]";
pub const SUCCESS_PREFIX: &str = "[+]";
pub const WARNING_PREFIX: &str = "[!]";
pub const FAILURE_PREFIX: &str = "[-]";

/// Ordered, append-only diagnostic lines for one ROM (or one batch).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchLog {
    lines: Vec<String>,
}

impl PatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info<S: AsRef<str>>(&mut self, message: S) {
        self.push(INFO_PREFIX, message.as_ref());
    }

    pub fn success<S: AsRef<str>>(&mut self, message: S) {
        self.push(SUCCESS_PREFIX, message.as_ref());
    }

    pub fn warning<S: AsRef<str>>(&mut self, message: S) {
        self.push(WARNING_PREFIX, message.as_ref());
    }

    pub fn failure<S: AsRef<str>>(&mut self, message: S) {
        self.push(FAILURE_PREFIX, message.as_ref());
    }

    /// Add a line verbatim, without a prefix
    pub fn push_line<S: Into<String>>(&mut self, line: S) {
        self.lines.push(line.into());
    }

    pub fn append(&mut self, other: &PatchLog) {
        self.lines.extend(other.lines.iter().cloned());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    fn push(&mut self, prefix: &str, message: &str) {
        self.lines.push(format!("{} {}", prefix, message));
    }
}

impl fmt::Display for PatchLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}
