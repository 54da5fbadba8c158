// src/updater.rs

//! The recipe update workflow
//!
//! Bumping a recipe from one version to the next:
//!
//! ```text
//! resolve file -> read metadata -> locate version -> backup
//!   -> version/URL/rev edits -> old hash -> placeholder
//!   -> fetch (or take explicit hash) -> same-hash guard
//!   -> placeholder -> new hash -> commit
//! ```
//!
//! Everything before the backup only reads. Once the backup exists, any
//! failure restores the recipe byte for byte; only the fetch log is left
//! behind for diagnosis.

use crate::error::{Error, Result};
use crate::evaluator::{Attribute, Evaluator, Target};
use crate::fetch::{FetchRequest, Fetcher};
use crate::hash::{same_digest, split_algorithm_prefix, DigestEncoding, Hash, HashAlgorithm, HashSpec};
use crate::lock::RecipeLock;
use crate::recipe::{parse_position, RecipeDocument, RecipeTransaction};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default attribute holding a recipe's version
pub const DEFAULT_VERSION_KEY: &str = "version";

/// Default attribute holding a recipe's source
pub const DEFAULT_SOURCE_KEY: &str = "src";

/// One requested version bump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Attribute path of the recipe (`hello`)
    pub attr_path: String,
    /// Version to bump to
    pub new_version: String,
    /// Hash to pin instead of fetching the source
    pub new_hash: Option<String>,
    /// Replacement for the current source URL
    pub new_url: Option<String>,
    /// Replacement for the current source revision
    pub new_rev: Option<String>,
    /// Attribute holding the version
    pub version_key: String,
    /// Build-target qualifier for evaluation
    pub system: Option<String>,
    /// Recipe file to edit instead of the one the evaluator reports
    pub file: Option<PathBuf>,
    /// Attribute holding the source
    pub source_key: String,
    /// Accept a new hash equal to the old one
    pub ignore_same_hash: bool,
    /// Refresh the hash even when the version is unchanged
    pub ignore_same_version: bool,
}

impl UpdateRequest {
    /// Request a bump of `attr_path` to `new_version` with default options
    pub fn new(attr_path: impl Into<String>, new_version: impl Into<String>) -> Self {
        Self {
            attr_path: attr_path.into(),
            new_version: new_version.into(),
            new_hash: None,
            new_url: None,
            new_rev: None,
            version_key: DEFAULT_VERSION_KEY.to_string(),
            system: None,
            file: None,
            source_key: DEFAULT_SOURCE_KEY.to_string(),
            ignore_same_hash: false,
            ignore_same_version: false,
        }
    }

    /// The evaluator's view of the recipe
    pub fn target(&self) -> Target {
        let target = Target::new(&self.attr_path).with_source_key(&self.source_key);
        match &self.system {
            Some(system) => target.with_system(system),
            None => target,
        }
    }

    /// Reject requests that could not produce a sane recipe
    pub fn validate(&self) -> Result<()> {
        if self.attr_path.trim().is_empty() {
            return Err(Error::InvalidRequest("recipe attribute path is empty".to_string()));
        }
        if self.new_version.trim().is_empty() {
            return Err(Error::InvalidRequest("new version is empty".to_string()));
        }
        if self.version_key.trim().is_empty() || self.source_key.trim().is_empty() {
            return Err(Error::InvalidRequest("attribute keys must not be empty".to_string()));
        }

        let literals = [
            Some(("version", &self.new_version)),
            self.new_hash.as_ref().map(|v| ("hash", v)),
            self.new_url.as_ref().map(|v| ("URL", v)),
            self.new_rev.as_ref().map(|v| ("revision", v)),
        ];
        for (what, value) in literals.into_iter().flatten() {
            if value.contains('"') || value.contains('\n') {
                return Err(Error::InvalidRequest(format!(
                    "new {} must not contain quotes or newlines: {}",
                    what, value
                )));
            }
        }

        Ok(())
    }
}

/// Description of a completed bump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub attr_path: String,
    pub old_version: String,
    pub new_version: String,
    pub old_hash: String,
    pub new_hash: String,
    pub files: Vec<PathBuf>,
}

/// Result of an update run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The recipe already has the requested version; nothing was touched
    Unchanged { version: String },
    /// The recipe was rewritten
    Updated(ChangeSummary),
}

/// Knobs that are not part of a request
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Hold an exclusive lock on the recipe while editing
    pub lock: bool,
    /// Directory for `<attr>.fetchlog`
    pub log_dir: PathBuf,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            lock: true,
            log_dir: PathBuf::from("."),
        }
    }
}

/// What the evaluator says the recipe pins today
#[derive(Debug, Clone)]
struct CurrentMetadata {
    hash_algorithm: String,
    hash: String,
    url: String,
    name: String,
    version: String,
}

/// Runs update requests against injected collaborators
pub struct Updater {
    evaluator: Arc<dyn Evaluator>,
    fetcher: Arc<dyn Fetcher>,
    options: UpdateOptions,
}

impl Updater {
    /// Create an updater with default options
    pub fn new(evaluator: Arc<dyn Evaluator>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_options(evaluator, fetcher, UpdateOptions::default())
    }

    /// Create an updater with explicit options
    pub fn with_options(
        evaluator: Arc<dyn Evaluator>,
        fetcher: Arc<dyn Fetcher>,
        options: UpdateOptions,
    ) -> Self {
        Self {
            evaluator,
            fetcher,
            options,
        }
    }

    /// Path of the fetch log for a recipe
    pub fn fetch_log_path(&self, attr_path: &str) -> PathBuf {
        self.options.log_dir.join(format!("{}.fetchlog", attr_path))
    }

    /// Bump one recipe
    pub fn run(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        request.validate()?;
        let target = request.target();
        let attr = target.attr_path.as_str();

        let file = self.resolve_file(request, &target)?;
        info!("Updating '{}' in {}", attr, file.display());

        let _lock = if self.options.lock {
            Some(RecipeLock::try_acquire_for(&file)?)
        } else {
            None
        };

        let current = self.read_current(request, &target, &file)?;
        debug!(
            "'{}' is {} {} pinned to {} ({})",
            attr, current.name, current.version, current.hash, current.hash_algorithm
        );

        let version_changes = current.version != request.new_version;
        if !version_changes && !request.ignore_same_version {
            info!("'{}' is already at version {}", attr, current.version);
            return Ok(UpdateOutcome::Unchanged {
                version: current.version,
            });
        }

        let document = RecipeDocument::parse(fs::read_to_string(&file)?);
        if version_changes
            && document
                .locate_version(&request.version_key, &current.version)
                .is_none()
        {
            return Err(Error::VersionNotFound {
                attr: attr.to_string(),
            });
        }

        let spec = HashSpec::detect(&current.hash, &current.hash_algorithm).ok_or_else(|| {
            Error::IndeterminateHashFormat {
                hash: current.hash.clone(),
                attr: attr.to_string(),
            }
        })?;
        let algorithm = spec.algorithm().map_err(|_| Error::UnsupportedAlgorithm {
            algorithm: spec.algorithm.clone(),
            attr: attr.to_string(),
        })?;

        let mut placeholder = Hash::placeholder(algorithm).value;
        if spec.is_combined() {
            placeholder = self.evaluator.to_encoded_form(algorithm, &placeholder)?;
        }
        debug!("Temporary hash: {}", placeholder);

        let old_rev = match &request.new_rev {
            Some(_) => Some(self.require_rev(&target)?),
            None => None,
        };

        let mut txn = RecipeTransaction::begin(&file)?;

        if version_changes {
            let (key, old, new) = (&request.version_key, &current.version, &request.new_version);
            txn.apply(
                &format!("replace version '{}' to '{}' in '{}'", old, new, attr),
                |doc| {
                    if let Some(site) = doc.locate_version(key, old) {
                        doc.replace_version(&site, new);
                    }
                },
            )?;
        }

        if let Some(new_url) = &request.new_url {
            txn.apply(
                &format!("replace source URL '{}' to '{}' in '{}'", current.url, new_url, attr),
                |doc| {
                    doc.replace_literal(&current.url, new_url);
                },
            )?;
        }

        if let (Some(new_rev), Some(old_rev)) = (&request.new_rev, &old_rev) {
            txn.apply(
                &format!("replace source revision '{}' to '{}' in '{}'", old_rev, new_rev, attr),
                |doc| {
                    doc.replace_literal(old_rev, new_rev);
                },
            )?;
        }

        txn.apply(
            &format!("replace source hash of '{}' to a temporary hash", attr),
            |doc| {
                doc.replace_literal(&current.hash, &placeholder);
            },
        )?;

        let new_hash = match &request.new_hash {
            Some(hash) => hash.clone(),
            None => self.fetch_new_hash(&target, &spec, algorithm, &current.hash, &placeholder)?,
        };

        if !request.ignore_same_hash
            && version_changes
            && same_digest(algorithm, &new_hash, &current.hash)
        {
            txn.rollback()?;
            return Err(Error::SameHash {
                attr: target.source_attr(),
            });
        }

        txn.apply(
            &format!("replace temporary source hash of '{}' to the final source hash", attr),
            |doc| {
                doc.replace_literal(&placeholder, &new_hash);
            },
        )?;
        txn.commit()?;
        self.remove_fetch_log(attr);

        info!(
            "Updated '{}' from {} to {} ({})",
            attr, current.version, request.new_version, new_hash
        );

        Ok(UpdateOutcome::Updated(ChangeSummary {
            attr_path: attr.to_string(),
            old_version: current.version,
            new_version: request.new_version.clone(),
            old_hash: current.hash,
            new_hash,
            files: vec![file],
        }))
    }

    fn resolve_file(&self, request: &UpdateRequest, target: &Target) -> Result<PathBuf> {
        let file = match &request.file {
            Some(file) => file.clone(),
            None => self
                .evaluator
                .evaluate(target, Attribute::Position)?
                .as_deref()
                .and_then(parse_position)
                .map(|(file, _)| file)
                .ok_or_else(|| Error::RecipeNotLocated {
                    attribute: format!("{}.meta.position", target.attr_path),
                })?,
        };

        if !file.is_file() {
            return Err(Error::RecipeFileNotFound(file));
        }
        Ok(file)
    }

    fn require(&self, target: &Target, attribute: Attribute<'_>, from: &str) -> Result<String> {
        self.evaluator
            .evaluate(target, attribute)?
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::MissingAttribute {
                what: attribute.describe().to_string(),
                attribute: from.to_string(),
            })
    }

    /// The source revision, which evaluates to `null` for unpinned sources
    fn require_rev(&self, target: &Target) -> Result<String> {
        self.evaluator
            .evaluate(target, Attribute::Rev)?
            .filter(|rev| !rev.is_empty() && rev != "null")
            .ok_or_else(|| Error::MissingAttribute {
                what: Attribute::Rev.describe().to_string(),
                attribute: target.source_attr(),
            })
    }

    fn read_current(
        &self,
        request: &UpdateRequest,
        target: &Target,
        file: &Path,
    ) -> Result<CurrentMetadata> {
        let source = target.source_attr();
        let hash_algorithm = self.require(target, Attribute::HashAlgorithm, &source)?;
        let hash = self.require(target, Attribute::Hash, &source)?;

        let count = RecipeDocument::parse(fs::read_to_string(file)?).count_occurrences(&hash);
        if count != 1 {
            return Err(Error::HashNotUnique {
                hash,
                file: file.to_path_buf(),
                count,
            });
        }

        let url = self.require(target, Attribute::FirstUrl, &source)?;
        let name_attr = format!("{}.name", target.attr_path);
        let name = self.require(target, Attribute::Name, &name_attr)?;
        let version = self.require(
            target,
            Attribute::Version {
                key: &request.version_key,
            },
            &name_attr,
        )?;

        Ok(CurrentMetadata {
            hash_algorithm,
            hash,
            url,
            name,
            version,
        })
    }

    fn fetch_new_hash(
        &self,
        target: &Target,
        spec: &HashSpec,
        algorithm: HashAlgorithm,
        current_hash: &str,
        placeholder: &str,
    ) -> Result<String> {
        let url = self.evaluator.evaluate(target, Attribute::FirstUrl)?;
        let request = FetchRequest {
            url,
            algorithm,
            expected: placeholder.to_string(),
        };
        let report = self.fetcher.fetch_source(target, &request)?;

        let log_path = self.fetch_log_path(&target.attr_path);
        if let Err(e) = fs::write(&log_path, &report.log) {
            warn!("Failed to write fetch log {}: {}", log_path.display(), e);
        }

        let got = report.actual_hash().ok_or_else(|| Error::HashUnresolved {
            attr: target.source_attr(),
            log: report.log.clone(),
        })?;
        debug!("Fetch reported actual hash {}", got);

        self.normalize_fetched(&got, spec, algorithm, current_hash)
    }

    /// Bring a fetched hash into the encoding the recipe uses
    ///
    /// Separate-mode recipes keep the digest spelling of their current
    /// hash, falling back to hex when that spelling is not recognized.
    fn normalize_fetched(
        &self,
        got: &str,
        spec: &HashSpec,
        algorithm: HashAlgorithm,
        current_hash: &str,
    ) -> Result<String> {
        if spec.is_combined() {
            let digest = split_algorithm_prefix(got).map_or(got, |(_, digest)| digest);
            return self.evaluator.to_encoded_form(algorithm, digest);
        }

        match Hash::parse_any(algorithm, got) {
            Ok(hash) => {
                let encoding =
                    DigestEncoding::detect(algorithm, current_hash).unwrap_or(DigestEncoding::Hex);
                Ok(hash.encode(encoding))
            }
            Err(e) => {
                debug!("Keeping fetched hash {} as reported: {}", got, e);
                Ok(split_algorithm_prefix(got).map_or(got, |(_, digest)| digest).to_string())
            }
        }
    }

    fn remove_fetch_log(&self, attr_path: &str) {
        let log_path = self.fetch_log_path(attr_path);
        if log_path.exists() {
            if let Err(e) = fs::remove_file(&log_path) {
                warn!("Failed to remove fetch log {}: {}", log_path.display(), e);
            }
        }
    }
}
