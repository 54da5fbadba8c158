// src/commands/update.rs

//! Update command - bump a recipe to a new version

use anyhow::{Context, Result};
use recipe_bump::config::{FetchStrategy, UpdaterConfig};
use recipe_bump::evaluator::CommandEvaluator;
use recipe_bump::fetch::{BuildFetcher, DirectFetcher, Fetcher};
use recipe_bump::updater::{
    ChangeSummary, UpdateOptions, UpdateOutcome, UpdateRequest, Updater,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Bump a recipe's version and source hash
///
/// # Arguments
/// * `config` - Loaded configuration
/// * `request` - The requested bump
/// * `print_changes` - Print a JSON change list on stdout
pub fn cmd_update(config: &UpdaterConfig, request: UpdateRequest, print_changes: bool) -> Result<()> {
    config
        .check_programs(request.new_hash.is_none())
        .context("Required tools are missing")?;

    info!("Updating {} to {}", request.attr_path, request.new_version);
    let updater = build_updater(config);
    let outcome = updater.run(&request)?;

    match &outcome {
        UpdateOutcome::Unchanged { .. } => {
            eprintln!("New version same as old version, nothing to do.");
        }
        UpdateOutcome::Updated(summary) => {
            eprintln!(
                "Updated {} from {} to {}",
                summary.attr_path, summary.old_version, summary.new_version
            );
        }
    }

    if print_changes {
        println!("{}", changes_json(&outcome)?);
    }

    Ok(())
}

/// Assemble an updater from configuration
fn build_updater(config: &UpdaterConfig) -> Updater {
    let evaluator = Arc::new(CommandEvaluator::new(&config.evaluator));
    let fetcher: Arc<dyn Fetcher> = match config.fetch.strategy {
        FetchStrategy::Build => Arc::new(BuildFetcher::new(&config.fetch, &config.evaluator)),
        FetchStrategy::Direct => Arc::new(DirectFetcher::new(&config.fetch)),
    };
    let options = UpdateOptions {
        lock: config.lock,
        log_dir: config.fetch.log_dir.clone(),
    };
    Updater::with_options(evaluator, fetcher, options)
}

/// Build an update request from command-line arguments
#[allow(clippy::too_many_arguments)]
pub fn update_request(
    recipe: String,
    new_version: String,
    new_hash: Option<String>,
    new_url: Option<String>,
    version_key: String,
    source_key: String,
    system: Option<String>,
    file: Option<String>,
    rev: Option<String>,
    ignore_same_hash: bool,
    ignore_same_version: bool,
) -> UpdateRequest {
    UpdateRequest {
        version_key,
        source_key,
        system,
        new_hash,
        new_url,
        new_rev: rev,
        file: file.map(PathBuf::from),
        ignore_same_hash,
        ignore_same_version,
        ..UpdateRequest::new(recipe, new_version)
    }
}

/// JSON change list: one entry per updated recipe, empty for a no-op
fn changes_json(outcome: &UpdateOutcome) -> Result<String> {
    let changes: Vec<&ChangeSummary> = match outcome {
        UpdateOutcome::Unchanged { .. } => Vec::new(),
        UpdateOutcome::Updated(summary) => vec![summary],
    };
    serde_json::to_string(&changes).context("Failed to serialize change list")
}
