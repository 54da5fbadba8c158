// src/evaluator.rs

//! Evaluator collaborator
//!
//! The package manager's evaluator is the only authority on what a recipe
//! currently says: where it lives, which hash it pins, which URL it fetches.
//! The updater asks through the [`Evaluator`] trait so tests can answer from
//! a table instead of a real package set.

use crate::config::EvaluatorSection;
use crate::error::{Error, Result};
use crate::hash::{Hash, HashAlgorithm};
use crate::process::run_capture;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The recipe being updated, as the evaluator addresses it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Attribute path of the recipe in the package set (`hello`, `python3Packages.requests`)
    pub attr_path: String,
    /// Build-target qualifier passed to the evaluator (`x86_64-linux`)
    pub system: Option<String>,
    /// Attribute of the recipe holding its source (`src`)
    pub source_key: String,
}

impl Target {
    /// Target a recipe with the default source key
    pub fn new(attr_path: impl Into<String>) -> Self {
        Self {
            attr_path: attr_path.into(),
            system: None,
            source_key: "src".to_string(),
        }
    }

    /// Set the build-target qualifier
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the attribute holding the source
    pub fn with_source_key(mut self, source_key: impl Into<String>) -> Self {
        self.source_key = source_key.into();
        self
    }

    /// Attribute path of the source (`hello.src`)
    pub fn source_attr(&self) -> String {
        format!("{}.{}", self.attr_path, self.source_key)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.attr_path)
    }
}

/// Recipe metadata the updater needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    /// Source position of the recipe (`file:line`)
    Position,
    /// Separately declared hash algorithm of the source
    HashAlgorithm,
    /// Pinned hash of the source
    Hash,
    /// First of the source URLs
    FirstUrl,
    /// Display name without version
    Name,
    /// Version, read from `key` if the recipe has it
    Version { key: &'a str },
    /// Source revision, for sources pinned to a VCS revision
    Rev,
}

impl Attribute<'_> {
    /// Human-readable name for error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::HashAlgorithm => "old source hash algorithm",
            Self::Hash => "old source hash",
            Self::FirstUrl => "source url",
            Self::Name => "name",
            Self::Version { .. } => "version",
            Self::Rev => "source revision",
        }
    }
}

/// Something that can answer questions about recipes
pub trait Evaluator {
    /// Evaluate one attribute of a recipe
    ///
    /// `Ok(None)` means the value could not be determined; `Err` is kept for
    /// failures of the evaluator itself.
    fn evaluate(&self, target: &Target, attribute: Attribute<'_>) -> Result<Option<String>>;

    /// Convert a digest into the combined form (`sha256-<base64>`)
    fn to_encoded_form(&self, algorithm: HashAlgorithm, digest: &str) -> Result<String>;
}

/// Evaluator backed by a `nix-instantiate`-style program
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    program: String,
    hash_program: String,
    expression_root: PathBuf,
}

impl CommandEvaluator {
    /// Create an evaluator from configuration
    pub fn new(config: &EvaluatorSection) -> Self {
        Self {
            program: config.program.clone(),
            hash_program: config.hash_program.clone(),
            expression_root: config.expression_root.clone(),
        }
    }

    /// Arguments for one attribute query
    pub fn query_args(&self, target: &Target, attribute: Attribute<'_>) -> Vec<String> {
        let attr = &target.attr_path;
        let src = target.source_attr();

        match attribute {
            Attribute::Position => self.attr_args(target, &format!("{}.meta.position", attr)),
            Attribute::HashAlgorithm => {
                self.attr_args(target, &format!("{}.drvAttrs.outputHashAlgo", src))
            }
            Attribute::Hash => self.attr_args(target, &format!("{}.drvAttrs.outputHash", src)),
            Attribute::FirstUrl => self.expr_args(
                target,
                &format!("builtins.elemAt ({src}.drvAttrs.urls or [ {src}.url ]) 0"),
            ),
            Attribute::Name => self.expr_args(target, &format!("lib.getName {}", attr)),
            Attribute::Version { key } => self.expr_args(
                target,
                &format!("{attr}.{key} or (lib.getVersion {attr})"),
            ),
            Attribute::Rev => self.expr_args(target, &format!("{}.rev or null", src)),
        }
    }

    fn system_args(target: &Target) -> Vec<String> {
        match &target.system {
            Some(system) => vec!["--argstr".to_string(), "system".to_string(), system.clone()],
            None => Vec::new(),
        }
    }

    fn attr_args(&self, target: &Target, path: &str) -> Vec<String> {
        let mut args = Self::system_args(target);
        args.extend(["--eval", "--strict", "-A", path].map(String::from));
        args
    }

    fn expr_args(&self, target: &Target, expr: &str) -> Vec<String> {
        let import_args = match &target.system {
            Some(system) => format!("{{ system = \"{}\"; }}", system),
            None => "{ }".to_string(),
        };
        let expr = format!(
            "with import {} {}; {}",
            nix_path_literal(&self.expression_root),
            import_args,
            expr
        );
        let mut args = Self::system_args(target);
        args.extend(["--eval".to_string(), "-E".to_string(), expr]);
        args
    }

    fn convert_with_tool(&self, algorithm: HashAlgorithm, digest: &str) -> Result<String> {
        let to_sri = |prefix: &[&str]| {
            let mut args: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
            args.extend(["--type", algorithm.name(), digest].map(String::from));
            run_capture(&self.hash_program, &args, None)
        };

        // Older releases have `nix to-sri`, newer ones only the gated subcommand
        for prefix in [
            &["to-sri"][..],
            &["--experimental-features", "nix-command", "hash", "to-sri"][..],
        ] {
            let output = to_sri(prefix)?;
            if output.status.success() {
                let converted = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !converted.is_empty() {
                    return Ok(converted);
                }
            }
        }

        Err(Error::CommandFailed(format!(
            "{} could not convert '{}' to a {} SRI hash",
            self.hash_program, digest, algorithm
        )))
    }
}

/// Strip quotes and whitespace from evaluator output
pub fn clean_output(raw: &str) -> Option<String> {
    let value = raw.trim().replace('"', "");
    if value.is_empty() { None } else { Some(value) }
}

/// Render a directory as a path literal (`.` -> `./.`)
fn nix_path_literal(path: &Path) -> String {
    let rendered = path.display().to_string();
    if path.is_absolute() || rendered.starts_with("./") || rendered.starts_with("../") {
        rendered
    } else if rendered == "." || rendered.is_empty() {
        "./.".to_string()
    } else {
        format!("./{}", rendered)
    }
}

impl Evaluator for CommandEvaluator {
    fn evaluate(&self, target: &Target, attribute: Attribute<'_>) -> Result<Option<String>> {
        let args = self.query_args(target, attribute);
        let output = run_capture(&self.program, &args, None)?;

        if !output.status.success() {
            debug!(
                "Evaluating {} of '{}' failed: {}",
                attribute.describe(),
                target,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        Ok(clean_output(&String::from_utf8_lossy(&output.stdout)))
    }

    fn to_encoded_form(&self, algorithm: HashAlgorithm, digest: &str) -> Result<String> {
        match Hash::from_digest(algorithm, digest) {
            Ok(hash) => Ok(hash.to_sri()),
            Err(e) => {
                debug!("Native SRI conversion of '{}' failed ({}), asking {}", digest, e, self.hash_program);
                self.convert_with_tool(algorithm, digest)
            }
        }
    }
}
