// src/error.rs

//! Error types for recipe updates

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of a failure, used for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad arguments, unknown files, bad configuration
    InputValidation,
    /// The evaluator could not produce a required field
    MetadataResolution,
    /// Expected recipe text was not found exactly once
    PatternMatching,
    /// The fetch did not yield a usable hash
    ExternalVerification,
    /// The update is technically possible but semantically wrong
    SemanticGuard,
    /// I/O, locking, or collaborator process failures
    Environment,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    IoError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Couldn't evaluate '{attribute}' to locate the recipe file!")]
    RecipeNotLocated { attribute: String },

    #[error("Recipe file not found: {}", .0.display())]
    RecipeFileNotFound(PathBuf),

    #[error("Couldn't evaluate {what} from '{attribute}'!")]
    MissingAttribute { what: String, attribute: String },

    #[error(
        "Couldn't locate old source hash '{hash}' (or it appeared more than once) in '{}': found {count} occurrence(s)",
        .file.display()
    )]
    HashNotUnique {
        hash: String,
        file: PathBuf,
        count: usize,
    },

    #[error("Couldn't figure out where to patch in new version in '{attr}'!")]
    VersionNotFound { attr: String },

    #[error("Unable to figure out hashing scheme from '{hash}' in '{attr}'!")]
    IndeterminateHashFormat { hash: String, attr: String },

    #[error("Unhandled hash algorithm '{algorithm}' in '{attr}'!")]
    UnsupportedAlgorithm { algorithm: String, attr: String },

    #[error("Failed to {0}!")]
    EditFailed(String),

    #[error("Couldn't figure out new hash of '{attr}'!")]
    HashUnresolved { attr: String, log: String },

    #[error(
        "Both the old and new source hashes of '{attr}' were equivalent. Please fix the package's source URL to be dependent on '${{version}}'!"
    )]
    SameHash { attr: String },

    #[error("Recipe is being updated by another process (lock held at {})", .0.display())]
    Locked(PathBuf),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Download failed: {0}")]
    DownloadError(String),
}

impl Error {
    /// Classify this error for diagnostics
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest(_)
            | Self::ConfigError(_)
            | Self::RecipeFileNotFound(_)
            | Self::ParseError(_) => ErrorCategory::InputValidation,
            Self::RecipeNotLocated { .. } | Self::MissingAttribute { .. } => {
                ErrorCategory::MetadataResolution
            }
            Self::HashNotUnique { .. }
            | Self::VersionNotFound { .. }
            | Self::IndeterminateHashFormat { .. }
            | Self::UnsupportedAlgorithm { .. }
            | Self::EditFailed(_) => ErrorCategory::PatternMatching,
            Self::HashUnresolved { .. } | Self::DownloadError(_) => {
                ErrorCategory::ExternalVerification
            }
            Self::SameHash { .. } => ErrorCategory::SemanticGuard,
            Self::Io(_)
            | Self::IoError(_)
            | Self::Locked(_)
            | Self::ToolNotFound(_)
            | Self::CommandFailed(_) => ErrorCategory::Environment,
        }
    }

    /// Raw fetch log attached to the error, if any
    pub fn fetch_log(&self) -> Option<&str> {
        match self {
            Self::HashUnresolved { log, .. } => Some(log),
            _ => None,
        }
    }
}
