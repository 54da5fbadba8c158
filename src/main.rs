// src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use recipe_bump::config::UpdaterConfig;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(log) = e
                .downcast_ref::<recipe_bump::Error>()
                .and_then(recipe_bump::Error::fetch_log)
            {
                eprint!("{}", log);
            }
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = UpdaterConfig::discover(cli.config.as_deref().map(Path::new))?;

    // Initialize tracing subscriber for logging; stdout is reserved for --print-changes
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Update {
            recipe,
            new_version,
            new_hash,
            new_url,
            version_key,
            source_key,
            system,
            file,
            rev,
            ignore_same_hash,
            ignore_same_version,
            print_changes,
        } => {
            let request = commands::update_request(
                recipe,
                new_version,
                new_hash,
                new_url,
                version_key,
                source_key,
                system,
                file,
                rev,
                ignore_same_hash,
                ignore_same_version,
            );
            commands::cmd_update(&config, request, print_changes)
        }
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
