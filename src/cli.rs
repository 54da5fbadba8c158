// src/cli.rs
//! CLI definitions for recipe-bump
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "recipe-bump")]
#[command(author = "recipe-bump contributors")]
#[command(version)]
#[command(about = "Bump the version and source hash of a package recipe", long_about = None)]
pub struct Cli {
    /// Configuration file (default: $RECIPE_BUMP_CONFIG, ./recipe-bump.toml, user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Update a recipe to a new version
    Update {
        /// Attribute path of the recipe (e.g., hello)
        recipe: String,

        /// Version to bump to
        new_version: String,

        /// Source hash to pin (fetched when omitted)
        new_hash: Option<String>,

        /// Replacement for the current source URL
        new_url: Option<String>,

        /// Attribute holding the version
        #[arg(long, default_value = "version")]
        version_key: String,

        /// Attribute holding the source
        #[arg(long, default_value = "src")]
        source_key: String,

        /// System to evaluate the recipe for (e.g., x86_64-linux)
        #[arg(long)]
        system: Option<String>,

        /// Recipe file to edit instead of the one the evaluator reports
        #[arg(long)]
        file: Option<String>,

        /// Replacement for the current source revision
        #[arg(long)]
        rev: Option<String>,

        /// Accept a new hash identical to the old one
        #[arg(long)]
        ignore_same_hash: bool,

        /// Refresh the hash even if the version is unchanged
        #[arg(long)]
        ignore_same_version: bool,

        /// Print a JSON description of the change on stdout
        #[arg(long)]
        print_changes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update() {
        let cli = Cli::try_parse_from([
            "recipe-bump",
            "update",
            "hello",
            "2.12.2",
            "--version-key=pversion",
            "--system=x86_64-linux",
            "--ignore-same-hash",
        ])
        .unwrap();

        match cli.command {
            Commands::Update {
                recipe,
                new_version,
                new_hash,
                version_key,
                system,
                ignore_same_hash,
                ignore_same_version,
                ..
            } => {
                assert_eq!(recipe, "hello");
                assert_eq!(new_version, "2.12.2");
                assert!(new_hash.is_none());
                assert_eq!(version_key, "pversion");
                assert_eq!(system.as_deref(), Some("x86_64-linux"));
                assert!(ignore_same_hash);
                assert!(!ignore_same_version);
            }
            Commands::Completions { .. } => panic!("expected update"),
        }
    }

    #[test]
    fn test_parse_positional_hash_and_url() {
        let cli = Cli::try_parse_from([
            "recipe-bump",
            "update",
            "hello",
            "2.12.2",
            "sha256-WpqZbcKSzCTc9BHO6H6S9qrluNE72caBm0x6nc4IGKs=",
            "https://ftp.gnu.org/gnu/hello/hello-2.12.2.tar.gz",
        ])
        .unwrap();

        let Commands::Update { new_hash, new_url, .. } = cli.command else {
            panic!("expected update");
        };
        assert!(new_hash.unwrap().starts_with("sha256-"));
        assert!(new_url.unwrap().ends_with("hello-2.12.2.tar.gz"));
    }

    #[test]
    fn test_missing_version_is_usage_error() {
        assert!(Cli::try_parse_from(["recipe-bump", "update", "hello"]).is_err());
    }
}
