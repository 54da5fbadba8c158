// src/recipe/backup.rs

//! Scoped edit transaction over a recipe file
//!
//! A `.bak` copy of the recipe is taken before the first edit. Every edit is
//! written straight to the recipe (the fetch step needs to see it on disk)
//! and must change the file, otherwise the step fails. Committing removes
//! the backup; anything else, including dropping the transaction on an error
//! path, moves the backup back over the recipe.

use crate::error::{Error, Result};
use crate::recipe::RecipeDocument;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Path of the backup kept next to a recipe (`hello.nix` -> `hello.nix.bak`)
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// An in-progress, multi-pass edit of one recipe file
#[derive(Debug)]
pub struct RecipeTransaction {
    path: PathBuf,
    backup_path: PathBuf,
    edits: usize,
    finished: bool,
}

impl RecipeTransaction {
    /// Snapshot the recipe and start editing it
    pub fn begin(path: &Path) -> Result<Self> {
        let backup_path = backup_path_for(path);
        fs::copy(path, &backup_path).map_err(|e| {
            Error::IoError(format!(
                "Failed to back up {} to {}: {}",
                path.display(),
                backup_path.display(),
                e
            ))
        })?;
        debug!("Backed up {} to {}", path.display(), backup_path.display());

        Ok(Self {
            path: path.to_path_buf(),
            backup_path,
            edits: 0,
            finished: false,
        })
    }

    /// The recipe being edited
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The snapshot taken before the first edit
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Number of edits applied so far
    pub fn edits(&self) -> usize {
        self.edits
    }

    /// Read the recipe, apply `edit`, and write it back
    ///
    /// `step` describes the edit for the error raised when the edit leaves
    /// the file unchanged, e.g. "replace version '1.0' to '1.1' in 'hello'".
    pub fn apply<F>(&mut self, step: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut RecipeDocument),
    {
        let before = fs::read_to_string(&self.path)?;
        let mut document = RecipeDocument::parse(before.as_str());
        edit(&mut document);

        if document.text() == before {
            return Err(Error::EditFailed(step.to_string()));
        }

        fs::write(&self.path, document.into_text())?;
        self.edits += 1;
        debug!("Applied edit {}: {}", self.edits, step);
        Ok(())
    }

    /// Whether the recipe currently differs from the snapshot
    pub fn is_modified(&self) -> Result<bool> {
        Ok(fs::read(&self.path)? != fs::read(&self.backup_path)?)
    }

    /// Keep the edits and drop the snapshot
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        fs::remove_file(&self.backup_path)?;
        info!("Updated {} ({} edits)", self.path.display(), self.edits);
        Ok(())
    }

    /// Discard the edits, restoring the recipe byte for byte
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.restore()
    }

    fn restore(&self) -> Result<()> {
        fs::rename(&self.backup_path, &self.path).map_err(|e| {
            Error::IoError(format!(
                "Failed to restore {} from {}: {}",
                self.path.display(),
                self.backup_path.display(),
                e
            ))
        })?;
        info!("Restored {} from backup", self.path.display());
        Ok(())
    }
}

impl Drop for RecipeTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.restore() {
            warn!("{}; backup left at {}", e, self.backup_path.display());
        }
    }
}
