// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use recipe_bump::evaluator::{Attribute, Evaluator, Target};
use recipe_bump::fetch::{FetchReport, FetchRequest, Fetcher};
use recipe_bump::hash::{Hash, HashAlgorithm};
use recipe_bump::updater::{UpdateOptions, Updater};
use recipe_bump::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Old pinned hash used by the standard fixture
pub fn old_hash() -> String {
    "a".repeat(64)
}

/// Hash a fetch of the new source reports
pub fn new_hash() -> String {
    "b".repeat(64)
}

/// A typical recipe at version 1.0 with a separately declared sha256
pub fn standard_recipe() -> String {
    format!(
        r#"{{ lib, stdenv, fetchurl }}:

stdenv.mkDerivation rec {{
  pname = "hello";
  version = "1.0";

  src = fetchurl {{
    url = "https://example.org/hello-${{version}}.tar.gz";
    sha256 = "{}";
  }};

  meta.description = "A program that produces a familiar, friendly greeting";
}}
"#,
        old_hash()
    )
}

/// The standard fixture with its hash pinned as `hash`
pub fn recipe_pinned(hash: &str) -> String {
    standard_recipe().replace(&old_hash(), hash)
}

/// Key for one evaluator answer
fn attribute_key(attribute: Attribute<'_>) -> &'static str {
    match attribute {
        Attribute::Position => "position",
        Attribute::HashAlgorithm => "hashAlgo",
        Attribute::Hash => "hash",
        Attribute::FirstUrl => "url",
        Attribute::Name => "name",
        Attribute::Version { .. } => "version",
        Attribute::Rev => "rev",
    }
}

/// Evaluator answering from a fixed table
#[derive(Debug, Default)]
pub struct FakeEvaluator {
    values: Mutex<HashMap<&'static str, String>>,
    queries: Mutex<Vec<String>>,
}

impl FakeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers for the standard fixture located at `file`
    pub fn for_recipe(file: &Path) -> Self {
        Self::new()
            .with("position", &format!("\"{}:5\"", file.display()))
            .with("hashAlgo", "sha256")
            .with("hash", &old_hash())
            .with("url", "https://example.org/hello-1.0.tar.gz")
            .with("name", "hello")
            .with("version", "1.0")
    }

    pub fn with(self, key: &'static str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn without(self, key: &'static str) -> Self {
        self.values.lock().unwrap().remove(key);
        self
    }

    pub fn set(&self, key: &'static str, value: &str) {
        self.values.lock().unwrap().insert(key, value.to_string());
    }

    /// Attribute keys queried so far, in order
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Evaluator for FakeEvaluator {
    fn evaluate(&self, _target: &Target, attribute: Attribute<'_>) -> Result<Option<String>> {
        let key = attribute_key(attribute);
        self.queries.lock().unwrap().push(key.to_string());
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn to_encoded_form(&self, algorithm: HashAlgorithm, digest: &str) -> Result<String> {
        Hash::from_digest(algorithm, digest)
            .map(|hash| hash.to_sri())
            .map_err(|e| Error::ParseError(e.to_string()))
    }
}

/// Fetcher returning a canned report and recording requests
#[derive(Debug, Default)]
pub struct FakeFetcher {
    report: FetchReport,
    requests: Mutex<Vec<FetchRequest>>,
}

impl FakeFetcher {
    pub fn new(report: FetchReport) -> Self {
        Self {
            report,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A fetcher whose log reports `got` the way a fixed-output build does
    pub fn reporting(got: &str) -> Self {
        Self::new(FetchReport {
            success: false,
            log: format!(
                "building '/nix/store/xyz-hello-1.1.tar.gz.drv'...\n\
                 error: hash mismatch in fixed-output derivation '/nix/store/xyz-hello-1.1.tar.gz.drv':\n\
                 \x20        specified: sha256-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=\n\
                 \x20           got:    {}\n",
                got
            ),
            mismatch: None,
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch_source(&self, _target: &Target, request: &FetchRequest) -> Result<FetchReport> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.report.clone())
    }
}

/// A recipe file in its own temporary directory
///
/// Keep the fixture alive to prevent cleanup.
pub struct RecipeFixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl RecipeFixture {
    pub fn new(content: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.nix");
        std::fs::write(&path, content).unwrap();
        Self { dir, path }
    }

    pub fn standard() -> Self {
        Self::new(&standard_recipe())
    }

    pub fn read(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap()
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.path().join("default.nix.bak")
    }

    pub fn fetch_log_path(&self, attr: &str) -> PathBuf {
        self.dir.path().join(format!("{}.fetchlog", attr))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.path().join("default.nix.lock")
    }

    /// Paths other than the recipe and its lock file left in the directory
    pub fn leftovers(&self) -> Vec<PathBuf> {
        let lock_path = self.lock_path();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path != &self.path && path != &lock_path)
            .collect();
        paths.sort();
        paths
    }

    /// Updater over the given doubles, logging into the fixture directory
    pub fn updater(&self, evaluator: &Arc<FakeEvaluator>, fetcher: &Arc<FakeFetcher>) -> Updater {
        let evaluator: Arc<dyn Evaluator> = evaluator.clone();
        let fetcher: Arc<dyn Fetcher> = fetcher.clone();
        Updater::with_options(
            evaluator,
            fetcher,
            UpdateOptions {
                lock: true,
                log_dir: self.dir.path().to_path_buf(),
            },
        )
    }
}
