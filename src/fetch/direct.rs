// src/fetch/direct.rs

//! Fetch by downloading the source URL and hashing it locally

use super::{FetchReport, FetchRequest, Fetcher, HashMismatch};
use crate::config::FetchSection;
use crate::error::{Error, Result};
use crate::evaluator::Target;
use crate::hash::{hash_reader, Hash};
use crate::process::run_capture;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Downloads with a `curl`-compatible program and hashes the bytes itself
///
/// Produces a structured [`HashMismatch`], so no log scraping is needed.
/// `file://` URLs are read directly.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    program: String,
}

impl DirectFetcher {
    /// Create a fetcher from configuration
    pub fn new(config: &FetchSection) -> Self {
        Self {
            program: config.download_program.clone(),
        }
    }

    fn download(&self, url: &str, dest: &Path) -> Result<std::result::Result<(), String>> {
        let args = vec![
            "-fsSL".to_string(),
            "-o".to_string(),
            dest.display().to_string(),
            url.to_string(),
        ];
        let output = run_capture(&self.program, &args, None)?;
        if output.status.success() {
            Ok(Ok(()))
        } else {
            Ok(Err(format!(
                "Failed to download {}: {}",
                url,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

impl Fetcher for DirectFetcher {
    fn fetch_source(&self, target: &Target, request: &FetchRequest) -> Result<FetchReport> {
        let url = request.url.as_deref().ok_or_else(|| {
            Error::DownloadError(format!("no source URL known for '{}'", target.source_attr()))
        })?;
        info!("Downloading {} to determine its hash", url);

        let actual = match url.strip_prefix("file://") {
            Some(path) => hash_reader(request.algorithm, &mut File::open(path)?)?,
            None => {
                let temp = tempfile::NamedTempFile::new()?;
                if let Err(log) = self.download(url, temp.path())? {
                    return Ok(FetchReport {
                        success: false,
                        log,
                        mismatch: None,
                    });
                }
                hash_reader(request.algorithm, &mut File::open(temp.path())?)?
            }
        };
        debug!("{} hashed to {}", url, actual.to_sri());

        let pinned = Hash::parse_combined(&request.expected)
            .or_else(|_| Hash::from_digest(request.algorithm, &request.expected))
            .ok();
        if pinned.as_ref() == Some(&actual) {
            return Ok(FetchReport {
                success: true,
                log: format!("{} matches the pinned hash\n", url),
                mismatch: None,
            });
        }

        let got = actual.to_sri();
        Ok(FetchReport {
            success: false,
            log: format!(
                "hash mismatch for {}:\n  specified: {}\n  got:    {}\n",
                url, request.expected, got
            ),
            mismatch: Some(HashMismatch {
                expected: request.expected.clone(),
                got,
            }),
        })
    }
}
