// src/config.rs

//! Configuration for recipe-bump
//!
//! Configuration is optional; every field has a default matching the usual
//! toolchain (`nix-instantiate`, `nix-build`, `nix`, `curl`).
//!
//! Lookup order:
//! 1. `--config <path>`
//! 2. `$RECIPE_BUMP_CONFIG`
//! 3. `./recipe-bump.toml`
//! 4. `<config_dir>/recipe-bump/config.toml`
//!
//! ```toml
//! lock = true
//! log_level = "info"
//!
//! [evaluator]
//! program = "nix-instantiate"
//! hash_program = "nix"
//! expression_root = "."
//!
//! [fetch]
//! strategy = "build"
//! build_program = "nix-build"
//! download_program = "curl"
//! log_dir = "."
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "RECIPE_BUMP_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG: &str = "recipe-bump.toml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Evaluator collaborator settings
    #[serde(default)]
    pub evaluator: EvaluatorSection,

    /// Fetch collaborator settings
    #[serde(default)]
    pub fetch: FetchSection,

    /// Hold an exclusive lock on the recipe while editing it
    #[serde(default = "default_true")]
    pub lock: bool,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorSection::default(),
            fetch: FetchSection::default(),
            lock: true,
            log_level: default_log_level(),
        }
    }
}

/// `[evaluator]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorSection {
    /// Program evaluating recipe attributes
    #[serde(default = "default_evaluator_program")]
    pub program: String,

    /// Program converting hashes between encodings
    #[serde(default = "default_hash_program")]
    pub hash_program: String,

    /// Directory of the package set expression (`import <root> {}`)
    #[serde(default = "default_expression_root")]
    pub expression_root: PathBuf,
}

impl Default for EvaluatorSection {
    fn default() -> Self {
        Self {
            program: default_evaluator_program(),
            hash_program: default_hash_program(),
            expression_root: default_expression_root(),
        }
    }
}

/// How the real source hash is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Build the source derivation and read the hash mismatch it reports
    #[default]
    Build,
    /// Download the source URL and hash it locally
    Direct,
}

impl std::fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

/// `[fetch]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSection {
    /// Fetch strategy
    #[serde(default)]
    pub strategy: FetchStrategy,

    /// Program building the source derivation
    #[serde(default = "default_build_program")]
    pub build_program: String,

    /// Program downloading sources for the direct strategy
    #[serde(default = "default_download_program")]
    pub download_program: String,

    /// Directory for `<recipe>.fetchlog` files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::Build,
            build_program: default_build_program(),
            download_program: default_download_program(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_evaluator_program() -> String {
    "nix-instantiate".to_string()
}

fn default_hash_program() -> String {
    "nix".to_string()
}

fn default_expression_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_build_program() -> String {
    "nix-build".to_string()
}

fn default_download_program() -> String {
    "curl".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl UpdaterConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: UpdaterConfig = toml::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or the first config file found, or defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                debug!("Using config file {}", path.display());
                Self::load(&path)
            }
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Candidate config files, in priority order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from(LOCAL_CONFIG));
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("recipe-bump").join("config.toml"));
        }
        paths
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let programs = [
            ("evaluator.program", &self.evaluator.program),
            ("evaluator.hash_program", &self.evaluator.hash_program),
            ("fetch.build_program", &self.fetch.build_program),
            ("fetch.download_program", &self.fetch.download_program),
        ];
        for (key, value) in programs {
            if value.trim().is_empty() {
                return Err(Error::ConfigError(format!("{} must not be empty", key)));
            }
        }

        if self.log_level.trim().is_empty() {
            return Err(Error::ConfigError("log_level must not be empty".to_string()));
        }

        Ok(())
    }

    /// Programs that must be on `PATH` for a run with this configuration
    ///
    /// The fetch program is only needed when the new hash is not given.
    pub fn required_programs(&self, fetch: bool) -> Vec<&str> {
        let mut programs = vec![self.evaluator.program.as_str()];
        if fetch {
            match self.fetch.strategy {
                FetchStrategy::Build => programs.push(self.fetch.build_program.as_str()),
                FetchStrategy::Direct => programs.push(self.fetch.download_program.as_str()),
            }
        }
        programs
    }

    /// Check that every required program can be found
    pub fn check_programs(&self, fetch: bool) -> Result<()> {
        for program in self.required_programs(fetch) {
            which::which(program)
                .map_err(|e| Error::ToolNotFound(format!("{}: {}", program, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = UpdaterConfig::default();
        assert_eq!(config.evaluator.program, "nix-instantiate");
        assert_eq!(config.fetch.strategy, FetchStrategy::Build);
        assert!(config.lock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: UpdaterConfig = toml::from_str("").unwrap();
        assert_eq!(config, UpdaterConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
lock = false

[fetch]
strategy = "direct"
log_dir = "/tmp/fetchlogs"
"#;
        let config: UpdaterConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.lock);
        assert_eq!(config.fetch.strategy, FetchStrategy::Direct);
        assert_eq!(config.fetch.log_dir, PathBuf::from("/tmp/fetchlogs"));
        assert_eq!(config.fetch.download_program, "curl");
        assert_eq!(config.evaluator.hash_program, "nix");
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recipe-bump.toml");
        std::fs::write(&path, "[evaluator]\nprogram = \"/opt/nix/bin/nix-instantiate\"\n").unwrap();

        let config = UpdaterConfig::load(&path).unwrap();
        assert_eq!(config.evaluator.program, "/opt/nix/bin/nix-instantiate");
    }

    #[test]
    fn test_load_rejects_empty_program() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recipe-bump.toml");
        std::fs::write(&path, "[fetch]\nbuild_program = \"\"\n").unwrap();

        let err = UpdaterConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(err.to_string().contains("fetch.build_program"));
    }

    #[test]
    fn test_load_rejects_unknown_strategy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recipe-bump.toml");
        std::fs::write(&path, "[fetch]\nstrategy = \"torrent\"\n").unwrap();

        assert!(matches!(UpdaterConfig::load(&path), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_discover_explicit_missing() {
        let dir = TempDir::new().unwrap();
        let result = UpdaterConfig::discover(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_required_programs_follow_strategy() {
        let mut config = UpdaterConfig::default();
        assert_eq!(config.required_programs(true), ["nix-instantiate", "nix-build"]);

        config.fetch.strategy = FetchStrategy::Direct;
        assert_eq!(config.required_programs(true), ["nix-instantiate", "curl"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_explicit_hash_needs_no_fetch_program() {
        let config = UpdaterConfig {
            fetch: FetchSection {
                build_program: "recipe-bump-no-such-builder".to_string(),
                ..Default::default()
            },
            evaluator: EvaluatorSection {
                program: "sh".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.required_programs(false), ["sh"]);
        assert!(config.check_programs(false).is_ok());
        assert!(matches!(config.check_programs(true), Err(Error::ToolNotFound(_))));
    }
}
