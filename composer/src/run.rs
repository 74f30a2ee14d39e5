//! Compose, persist the expected-outputs log, then hand off to the engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::compose::{Composer, Seed};
use crate::core::config::PipelineConfig;
use crate::core::identity::RunIdentity;
use crate::engine::ExecutionEngine;
use crate::io::outputs_log;

/// What one pipeline run produced, before verification.
#[derive(Debug)]
pub struct RunSummary {
    pub identity: RunIdentity,
    pub nodes: usize,
    pub expected_outputs: usize,
    pub skipped_blocks: usize,
    pub expected_log: PathBuf,
}

/// Compose the graph for one instance and execute it.
///
/// The expected-outputs log is persisted before the engine starts, so a
/// crashed run still leaves a record to verify against.
pub fn run_pipeline(
    engine: &dyn ExecutionEngine,
    composer: &Composer,
    cfg: &PipelineConfig,
    identity: &RunIdentity,
    seeds: &[Seed],
    work_dir: &Path,
    log_dir: &Path,
) -> Result<RunSummary> {
    let composition = composer
        .compose(cfg, identity, seeds)
        .map_err(|err| anyhow!(err))
        .context("compose pipeline graph")?;

    let expected_log =
        outputs_log::write_expected(log_dir, &identity.unique_id, &composition.expected)?;

    debug!(
        unique_id = %identity.unique_id,
        nodes = composition.graph.len(),
        expected = composition.expected.len(),
        "starting execution"
    );
    engine
        .run(&composition.graph, work_dir)
        .context("execute pipeline graph")?;

    Ok(RunSummary {
        identity: identity.clone(),
        nodes: composition.graph.len(),
        expected_outputs: composition.expected.len(),
        skipped_blocks: composition.skipped.len(),
        expected_log,
    })
}
