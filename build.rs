// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Boolean flag
fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

fn build_cli() -> Command {
    Command::new("recipe-bump")
        .version(env!("CARGO_PKG_VERSION"))
        .author("recipe-bump contributors")
        .about("Bump the version and source hash of a package recipe")
        .arg(Arg::new("config").long("config").value_name("PATH").help("Configuration file"))
        .subcommand_required(true)
        .subcommand(
            Command::new("update")
                .about("Update a recipe to a new version")
                .arg(Arg::new("recipe").required(true).help("Attribute path of the recipe"))
                .arg(Arg::new("new_version").required(true).help("Version to bump to"))
                .arg(Arg::new("new_hash").help("Source hash to pin (fetched when omitted)"))
                .arg(Arg::new("new_url").help("Replacement for the current source URL"))
                .arg(
                    Arg::new("version-key")
                        .long("version-key")
                        .default_value("version")
                        .help("Attribute holding the version"),
                )
                .arg(
                    Arg::new("source-key")
                        .long("source-key")
                        .default_value("src")
                        .help("Attribute holding the source"),
                )
                .arg(Arg::new("system").long("system").help("System to evaluate the recipe for"))
                .arg(Arg::new("file").long("file").help("Recipe file to edit"))
                .arg(Arg::new("rev").long("rev").help("Replacement for the current source revision"))
                .arg(flag("ignore-same-hash", "Accept a new hash identical to the old one"))
                .arg(flag("ignore-same-version", "Refresh the hash even if the version is unchanged"))
                .arg(flag("print-changes", "Print a JSON description of the change on stdout")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("recipe-bump.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
