// src/fetch/mod.rs

//! Fetch collaborator: learn the real hash of a new source
//!
//! The recipe is first pointed at a placeholder hash, so fetching its source
//! is guaranteed to fail verification. The failure tells us the hash the
//! source actually has. Fetchers report it in one of two ways:
//!
//! - **Structured**: [`FetchReport::mismatch`] is filled in directly
//!   ([`DirectFetcher`] hashes the download itself)
//! - **Log**: only the tool's output is available and the mismatch is
//!   scraped from it ([`BuildFetcher`], see [`scrape_mismatch`])

mod build;
mod direct;
mod scrape;

pub use build::BuildFetcher;
pub use direct::DirectFetcher;
pub use scrape::scrape_mismatch;

use crate::error::Result;
use crate::evaluator::Target;
use crate::hash::HashAlgorithm;

/// A verification failure: the pinned hash versus what the source hashed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashMismatch {
    /// Hash the recipe declared
    pub expected: String,
    /// Hash of the fetched content
    pub got: String,
}

/// What the fetcher needs to know beyond the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Source URL after the version edit, if the evaluator could produce it
    pub url: Option<String>,
    /// Algorithm of the pinned hash
    pub algorithm: HashAlgorithm,
    /// The hash currently pinned (the placeholder)
    pub expected: String,
}

/// Outcome of one fetch attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Whether the fetch verified (it should not, against a placeholder)
    pub success: bool,
    /// Tool output, kept for diagnosis
    pub log: String,
    /// Structured mismatch, when the fetcher can provide one
    pub mismatch: Option<HashMismatch>,
}

impl FetchReport {
    /// The hash the source actually has, structured result first
    pub fn actual_hash(&self) -> Option<String> {
        self.mismatch
            .clone()
            .or_else(|| scrape_mismatch(&self.log))
            .map(|m| m.got)
    }
}

/// Something that can fetch a recipe's source and report its hash
pub trait Fetcher {
    /// Fetch the source of `target`, which currently pins `request.expected`
    fn fetch_source(&self, target: &Target, request: &FetchRequest) -> Result<FetchReport>;
}
