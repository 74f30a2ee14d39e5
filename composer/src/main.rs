//! Pipeline composer CLI.
//!
//! `compose` builds the graph for one instance from a TOML configuration,
//! persists the expected-outputs log, and runs the (no-op) engine. `check`
//! verifies a finished instance's output tree against that log.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use composer::blocks::builtin_composer;
use composer::check::check_outputs;
use composer::compose::seeds_from_config;
use composer::core::identity::RunIdentity;
use composer::engine::NoopEngine;
use composer::io::config::load_config;
use composer::run::run_pipeline;

#[derive(Parser)]
#[command(
    name = "composer",
    version,
    about = "Configuration-driven pipeline graph composer"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose the pipeline graph and write the expected-outputs log.
    Compose {
        /// Pipeline configuration (TOML).
        #[arg(long)]
        config: PathBuf,
        /// Pipeline (configuration variant) name.
        #[arg(long)]
        pipeline: String,
        /// Subject/session identifier.
        #[arg(long)]
        unique_id: String,
        /// Directory for per-instance logs.
        #[arg(long)]
        log_dir: PathBuf,
        /// Engine working directory.
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
    },
    /// Verify a finished instance's outputs against its expected log.
    Check {
        /// Root of the pipeline output tree.
        #[arg(long)]
        output_dir: PathBuf,
        /// Directory holding the per-instance logs.
        #[arg(long)]
        log_dir: PathBuf,
        /// Pipeline (configuration variant) name.
        #[arg(long)]
        pipeline: String,
        /// Subject/session identifier.
        #[arg(long)]
        unique_id: String,
    },
}

fn main() {
    composer::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Compose {
            config,
            pipeline,
            unique_id,
            log_dir,
            work_dir,
        } => cmd_compose(&config, &pipeline, &unique_id, &log_dir, &work_dir),
        Command::Check {
            output_dir,
            log_dir,
            pipeline,
            unique_id,
        } => cmd_check(&output_dir, &log_dir, &pipeline, &unique_id),
    }
}

fn cmd_compose(
    config: &std::path::Path,
    pipeline: &str,
    unique_id: &str,
    log_dir: &std::path::Path,
    work_dir: &std::path::Path,
) -> Result<()> {
    let cfg = load_config(config)?;
    let identity = RunIdentity::new(pipeline, unique_id);
    let seeds = seeds_from_config(&cfg);
    let composer = builtin_composer().map_err(|err| anyhow::anyhow!(err))?;

    let summary = run_pipeline(
        &NoopEngine,
        &composer,
        &cfg,
        &identity,
        &seeds,
        work_dir,
        log_dir,
    )?;
    println!(
        "composed {} nodes, {} expected outputs ({} blocks skipped)",
        summary.nodes, summary.expected_outputs, summary.skipped_blocks
    );
    println!("expected-outputs log: {}", summary.expected_log.display());
    Ok(())
}

fn cmd_check(
    output_dir: &std::path::Path,
    log_dir: &std::path::Path,
    pipeline: &str,
    unique_id: &str,
) -> Result<()> {
    // Missing outputs are a report, not a failure.
    let outcome = check_outputs(output_dir, log_dir, pipeline, unique_id)?;
    println!("{}", outcome);
    Ok(())
}
