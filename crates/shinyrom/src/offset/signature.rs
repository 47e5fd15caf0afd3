use std::fmt;

use memchr::memmem;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Byte pattern locating a patch target inside executable code.
///
/// `target` is the index within the pattern of the byte to patch. The target
/// byte is usually a wildcard so that an already patched image still matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SignatureDef", into = "SignatureDef")]
pub struct Signature {
    bytes: Vec<Option<u8>>,
    target: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignatureDef {
    pattern: String,
    target: usize,
}

impl Signature {
    pub fn new(bytes: Vec<Option<u8>>, target: usize) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidSignature("Signature pattern is empty".to_string()));
        }
        if target >= bytes.len() {
            return Err(Error::InvalidSignature(format!(
                "Target index {} outside {}-byte pattern",
                target,
                bytes.len()
            )));
        }
        Ok(Self { bytes, target })
    }

    /// Build from a constant pattern known to be valid.
    pub(crate) fn from_const(bytes: &[Option<u8>], target: usize) -> Self {
        debug_assert!(target < bytes.len());
        Self {
            bytes: bytes.to_vec(),
            target,
        }
    }

    pub fn parse(pattern: &str, target: usize) -> Result<Self> {
        Self::new(parse_pattern(pattern)?, target)
    }

    pub fn bytes(&self) -> &[Option<u8>] {
        &self.bytes
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// All match positions in `haystack`, ascending.
    pub fn find_all(&self, haystack: &[u8]) -> Vec<usize> {
        if haystack.len() < self.bytes.len() {
            return Vec::new();
        }

        // Use the literal prefix as a fast anchor, then verify the rest.
        let anchor: Vec<u8> = self.bytes.iter().map_while(|b| *b).collect();
        let last = haystack.len() - self.bytes.len();
        if anchor.is_empty() {
            return (0..=last)
                .filter(|&pos| self.matches_at(haystack, pos))
                .collect();
        }

        memmem::find_iter(haystack, &anchor)
            .filter(|&pos| pos <= last && self.matches_at(haystack, pos))
            .collect()
    }

    /// Patch target positions (match position + target index), ascending.
    pub fn find_targets(&self, haystack: &[u8]) -> Vec<usize> {
        self.find_all(haystack)
            .into_iter()
            .map(|pos| pos + self.target)
            .collect()
    }

    fn matches_at(&self, haystack: &[u8], pos: usize) -> bool {
        self.bytes
            .iter()
            .zip(&haystack[pos..])
            .all(|(expected, actual)| expected.is_none_or(|value| value == *actual))
    }
}

impl TryFrom<SignatureDef> for Signature {
    type Error = Error;

    fn try_from(def: SignatureDef) -> Result<Self> {
        Self::parse(&def.pattern, def.target)
    }
}

impl From<Signature> for SignatureDef {
    fn from(signature: Signature) -> Self {
        Self {
            pattern: format_pattern(&signature.bytes),
            target: signature.target,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{})", format_pattern(&self.bytes), self.target)
    }
}

/// Parse space-separated hex bytes. `??` (or `?`) stands for a byte that
/// varies between dumps or has already been patched.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let bytes = pattern
        .split_whitespace()
        .map(|token| match token {
            "?" | "??" => Ok(None),
            hex => u8::from_str_radix(hex, 16).map(Some).map_err(|_| {
                Error::InvalidSignature(format!("'{}' is neither a hex byte nor ??", hex))
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    if bytes.is_empty() {
        return Err(Error::InvalidSignature("Signature pattern is empty".to_string()));
    }
    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match byte {
            Some(value) => out.push_str(&format!("{:02X}", value)),
            None => out.push_str("??"),
        }
    }
    out
}
