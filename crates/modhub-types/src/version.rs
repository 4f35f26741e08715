use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const MAX_VERSION_LEN: usize = 64;

/// One run of digits or letters inside a version string.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    /// Digits with leading zeros stripped, so numeric order is (len, text).
    Num(String),
    Alpha(String),
}

impl Ord for Part {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Part::Num(a), Part::Num(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Part::Alpha(a), Part::Alpha(b)) => a.cmp(b),
            (Part::Alpha(_), Part::Num(_)) => Ordering::Less,
            (Part::Num(_), Part::Alpha(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Part {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A module version string with loose ordering.
///
/// Versions are split into runs of digits and runs of letters; `.`, `-`,
/// `_` and `+` only separate runs. Runs compare pairwise: numbers
/// numerically, words lexically, and a word sorts before a number. A
/// version that is a strict prefix of another sorts first, so
/// `1.0 < 1.0.1 < 1.0b1 < 1.2 < 1.10`.
///
/// Two spellings with identical runs (`1.0` and `1-0`) are ordered by their
/// raw text so the order stays total and consistent with `Eq`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleVersion {
    raw: String,
    parts: Vec<Part>,
}

impl ModuleVersion {
    /// Validate and parse a version string.
    pub fn parse(version: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidVersion {
            version: version.to_string(),
            reason: reason.into(),
        };

        if version.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if version.len() > MAX_VERSION_LEN {
            return Err(invalid("longer than 64 bytes"));
        }
        if !version.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(invalid("must start with a letter or digit"));
        }
        if version.contains("..") {
            return Err(invalid("must not contain '..'"));
        }

        let mut parts = Vec::new();
        let mut current = String::new();
        let mut digits = false;
        for ch in version.chars() {
            match ch {
                '0'..='9' | 'a'..='z' | 'A'..='Z' => {
                    let is_digit = ch.is_ascii_digit();
                    if !current.is_empty() && is_digit != digits {
                        parts.push(finish_part(&current, digits));
                        current.clear();
                    }
                    digits = is_digit;
                    current.push(ch.to_ascii_lowercase());
                }
                '.' | '-' | '_' | '+' => {
                    if !current.is_empty() {
                        parts.push(finish_part(&current, digits));
                        current.clear();
                    }
                }
                other => return Err(invalid(&format!("contains forbidden character: {other:?}"))),
            }
        }
        if !current.is_empty() {
            parts.push(finish_part(&current, digits));
        }

        Ok(Self {
            raw: version.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn finish_part(run: &str, digits: bool) -> Part {
    if digits {
        let trimmed = run.trim_start_matches('0');
        Part::Num(if trimmed.is_empty() { "0".into() } else { trimmed.into() })
    } else {
        Part::Alpha(run.to_string())
    }
}

impl PartialEq for ModuleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ModuleVersion {}

impl std::hash::Hash for ModuleVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts
            .cmp(&other.parts)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleVersion({})", self.raw)
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for ModuleVersion {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModuleVersion> for String {
    fn from(version: ModuleVersion) -> Self {
        version.raw
    }
}

impl std::str::FromStr for ModuleVersion {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
