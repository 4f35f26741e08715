//! Module name validation.
//!
//! Module names become directory and file names inside the store, so the
//! accepted alphabet is deliberately small:
//! - Must be non-empty and at most 128 bytes
//! - Only ASCII letters, digits, `_` and `-`
//! - Must start with a letter or digit
//! - Must not be one of the per-version file stems the store reserves

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const MAX_NAME_LEN: usize = 128;

/// Names whose `<name>.yml` config would collide with a store-owned file.
const RESERVED_NAMES: &[&str] = &["code_manifest", "data_manifest", "meta"];

/// A validated module name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Validate and wrap a module name.
    ///
    /// # Examples
    ///
    /// ```
    /// use modhub_types::ModuleName;
    ///
    /// assert!(ModuleName::parse("clinvar").is_ok());
    /// assert!(ModuleName::parse("hg38-liftover_2").is_ok());
    /// assert!(ModuleName::parse("").is_err());
    /// assert!(ModuleName::parse("../etc").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidModuleName {
            name: name.to_string(),
            reason: reason.into(),
        };

        if name.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid("longer than 128 bytes"));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(invalid("must start with a letter or digit"));
        }
        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(invalid(&format!("contains forbidden character: {ch:?}")));
        }
        if RESERVED_NAMES.contains(&name) {
            return Err(invalid("reserved by the store layout"));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleName({})", self.0)
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModuleName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModuleName> for String {
    fn from(name: ModuleName) -> Self {
        name.0
    }
}

impl std::str::FromStr for ModuleName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
