// src/commands/mod.rs
//! Command handlers for the recipe-bump CLI

mod completions;
mod update;

pub use completions::cmd_completions;
pub use update::{cmd_update, update_request};
