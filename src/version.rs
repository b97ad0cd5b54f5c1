//! Tool version parsing and constraint evaluation.
//!
//! Versions are compared numerically, one dot-separated segment at a time.
//! Missing trailing segments count as zero, so `18` equals `18.0.0`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a detected version is compared against a declared one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    /// Detected version must be greater than or equal to the declared one.
    #[default]
    Min,
    /// Detected version must be less than or equal to the declared one.
    Max,
    /// Detected version must equal the declared one.
    Exact,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Min => ">=",
            Self::Max => "<=",
            Self::Exact => "==",
        })
    }
}

/// A numeric dotted version such as `18.2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parses a version, tolerating a leading `v` and a pre-release or build suffix.
    ///
    /// Returns `None` when no numeric segment can be read.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        let core = trimmed.split(['-', '+', ' ']).next().unwrap_or_default();
        let segments = core
            .split('.')
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        if segments.is_empty() {
            return None;
        }
        Some(Self { segments })
    }

    /// Checks this version against `required` using `comparator`.
    #[must_use]
    pub fn satisfies(&self, required: &Self, comparator: Comparator) -> bool {
        let ordering = self.cmp(required);
        match comparator {
            Comparator::Min => ordering != Ordering::Less,
            Comparator::Max => ordering != Ordering::Greater,
            Comparator::Exact => ordering == Ordering::Equal,
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Evaluates `actual <comparator> required`.
///
/// Unparseable versions never satisfy a constraint.
#[must_use]
pub fn satisfies(actual: &str, required: &str, comparator: Comparator) -> bool {
    match (Version::parse(actual), Version::parse(required)) {
        (Some(actual), Some(required)) => actual.satisfies(&required, comparator),
        _ => false,
    }
}

/// Pulls the first dotted version number out of free-form tool output.
///
/// `"git version 2.43.0"` yields `"2.43.0"`, `"v20.11.1"` yields `"20.11.1"`.
#[must_use]
pub fn extract_version(output: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"\d+(?:\.\d+)+").ok()).as_ref()?;
    pattern.find(output).map(|m| m.as_str().to_string())
}
