use thiserror::Error;

/// Errors produced by type validation and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid module name {name:?}: {reason}")]
    InvalidModuleName { name: String, reason: String },

    #[error("invalid module version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("invalid client version {0:?}")]
    InvalidClientVersion(String),

    #[error("invalid client requirement {expr:?}: {reason}")]
    InvalidRequirement { expr: String, reason: String },
}
