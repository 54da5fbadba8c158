// src/recipe/mod.rs

//! Recipe files and the edits made to them
//!
//! Recipes are the declarative build definitions of the distribution: a
//! source URL, a pinned version, a pinned source hash, build inputs. Only
//! the first three matter here, and only as text:
//!
//! ```text
//! stdenv.mkDerivation rec {
//!   pname = "hello";
//!   version = "2.12.1";
//!   src = fetchurl {
//!     url = "mirror://gnu/hello/hello-${version}.tar.gz";
//!     sha256 = "086vqwk2wl8zfs47sq2xpjc9k066ilmb8z6dn0q6ymwjzlm196cd";
//!   };
//! }
//! ```
//!
//! - [`RecipeDocument`] finds the string assignments in that text
//! - [`RecipeTransaction`] applies edits with a `.bak` snapshot for rollback

mod backup;
mod document;

pub use backup::{backup_path_for, RecipeTransaction};
pub use document::{Assignment, RecipeDocument, VersionSite};

use std::path::PathBuf;

/// Parse an evaluator position (`/path/to/recipe.nix:12`) into file and line
///
/// The line suffix is optional; surrounding quotes are tolerated.
pub fn parse_position(position: &str) -> Option<(PathBuf, Option<u32>)> {
    let position = position.trim().trim_matches('"');
    if position.is_empty() || position == "null" {
        return None;
    }

    match position.rsplit_once(':') {
        Some((file, line)) if !file.is_empty() && line.chars().all(|c| c.is_ascii_digit()) => {
            Some((PathBuf::from(file), line.parse().ok()))
        }
        _ => Some((PathBuf::from(position), None)),
    }
}
