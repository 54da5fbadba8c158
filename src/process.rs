// src/process.rs

//! Running collaborator programs

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

/// Run a program to completion, capturing stdout and stderr
///
/// A program that cannot be found is reported as [`Error::ToolNotFound`];
/// a non-zero exit is not an error here, callers inspect `status`.
pub fn run_capture(program: &str, args: &[String], dir: Option<&Path>) -> Result<Output> {
    debug!("Running {} {}", program, args.join(" "));

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    command.output().map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ToolNotFound(program.to_string()),
        _ => Error::CommandFailed(format!("{}: {}", program, e)),
    })
}
