// src/lib.rs

//! recipe-bump
//!
//! Bumps a package recipe to a new upstream release: rewrites the pinned
//! version (and optionally the source URL or revision), then recomputes the
//! source integrity hash by fetching the new source against a placeholder.
//!
//! # Architecture
//!
//! - Collaborators as traits: the package [`evaluator`] answers metadata
//!   queries and the [`fetch`] layer reports the real hash of a source
//! - Transactional edits: every change goes through a `.bak` snapshot and is
//!   rolled back on any failure
//! - Structured recipe text: edits touch only the bytes of one string literal

pub mod config;
mod error;
pub mod evaluator;
pub mod fetch;
pub mod hash;
pub mod lock;
pub mod process;
pub mod recipe;
pub mod updater;

pub use config::{FetchStrategy, UpdaterConfig};
pub use error::{Error, ErrorCategory, Result};
pub use evaluator::{Attribute, CommandEvaluator, Evaluator, Target};
pub use fetch::{FetchReport, FetchRequest, Fetcher, HashMismatch};
pub use hash::{Hash, HashAlgorithm, HashSpec, Hasher};
pub use recipe::{RecipeDocument, RecipeTransaction};
pub use updater::{ChangeSummary, UpdateOptions, UpdateOutcome, UpdateRequest, Updater};
