//! `fixture` command-line entry point.
//!
//! Validates, plans and applies TOML worker fixtures against an in-memory
//! control plane.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use fixture::apply::{ApplyOutcome, apply_fixture_path};
use fixture::exit_codes;
use fixture::io::config::{FixtureConfig, load_config, write_config};
use fixture::io::fixture_file::load_fixture_file;
use fixture::logging;
use fixture::plan::render_plan;
use fixture::validate::validate_fixture_path;

#[derive(Parser)]
#[command(
    name = "fixture",
    version,
    about = "Compose worker fixtures across the control and runtime planes"
)]
struct Cli {
    /// Fixture config (TOML). Defaults apply when omitted or missing.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a fixture file and check it for authoring errors.
    Validate { file: PathBuf },
    /// Print each worker's base record and ordered setup steps.
    Plan { file: PathBuf },
    /// Set up every worker in memory and print both planes as JSON.
    Apply { file: PathBuf },
    /// Write the default fixture config to `path`.
    InitConfig {
        path: PathBuf,
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("{:#}", err);
    }
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FixtureConfig::default(),
    };
    match cli.command {
        Command::Validate { file } => cmd_validate(&file),
        Command::Plan { file } => cmd_plan(&file, &config),
        Command::Apply { file } => cmd_apply(&file, &config),
        Command::InitConfig { path, force } => cmd_init_config(&path, force),
    }
}

fn cmd_validate(file: &Path) -> Result<i32> {
    let errors = validate_fixture_path(file)?;
    if errors.is_empty() {
        println!("ok");
        return Ok(exit_codes::OK);
    }
    for error in &errors {
        eprintln!("{}", error);
    }
    Ok(exit_codes::INVALID)
}

fn cmd_plan(file: &Path, config: &FixtureConfig) -> Result<i32> {
    let fixture = load_fixture_file(file)?;
    for worker in fixture.workers() {
        print!("{}", render_plan(&worker, &config.worker));
    }
    Ok(exit_codes::OK)
}

fn cmd_apply(file: &Path, config: &FixtureConfig) -> Result<i32> {
    match apply_fixture_path(file, config)? {
        ApplyOutcome::Applied(report) => {
            let json = serde_json::to_string_pretty(&report).context("serialize report")?;
            println!("{}", json);
            Ok(exit_codes::OK)
        }
        ApplyOutcome::Invalid { errors } => {
            for error in &errors {
                eprintln!("{}", error);
            }
            Ok(exit_codes::INVALID)
        }
        ApplyOutcome::SetupFailed { worker, error } => {
            eprintln!("setup failed for worker '{}': {}", worker, error);
            Ok(exit_codes::SETUP_FAILED)
        }
    }
}

fn cmd_init_config(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (pass --force to replace it)", path.display());
    }
    write_config(path, &FixtureConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}
