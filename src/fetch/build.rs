// src/fetch/build.rs

//! Fetch by building the source derivation

use super::{FetchReport, FetchRequest, Fetcher};
use crate::config::{EvaluatorSection, FetchSection};
use crate::error::Result;
use crate::evaluator::Target;
use crate::process::run_capture;
use std::path::PathBuf;
use tracing::{debug, info};

/// Runs a `nix-build`-style program on `<attr>.<source_key>`
///
/// The program's stderr is the log; the mismatch is scraped from it.
#[derive(Debug, Clone)]
pub struct BuildFetcher {
    program: String,
    expression_root: PathBuf,
}

impl BuildFetcher {
    /// Create a fetcher from configuration
    pub fn new(fetch: &FetchSection, evaluator: &EvaluatorSection) -> Self {
        Self {
            program: fetch.build_program.clone(),
            expression_root: evaluator.expression_root.clone(),
        }
    }

    /// Arguments for building the source of `target`
    pub fn build_args(&self, target: &Target) -> Vec<String> {
        let mut args = vec![self.expression_root.display().to_string()];
        if let Some(system) = &target.system {
            args.extend(["--argstr".to_string(), "system".to_string(), system.clone()]);
        }
        args.extend(["--no-out-link".to_string(), "-A".to_string(), target.source_attr()]);
        args
    }
}

impl Fetcher for BuildFetcher {
    fn fetch_source(&self, target: &Target, request: &FetchRequest) -> Result<FetchReport> {
        info!("Building {} to determine its hash", target.source_attr());
        debug!("Pinned placeholder: {}", request.expected);

        let output = run_capture(&self.program, &self.build_args(target), None)?;

        Ok(FetchReport {
            success: output.status.success(),
            log: String::from_utf8_lossy(&output.stderr).into_owned(),
            mismatch: None,
        })
    }
}
