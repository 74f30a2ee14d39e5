//! Seam between composition and execution.
//!
//! Composition produces a [`PipelineGraph`]; how that graph actually runs
//! (local scheduler, cluster submission, dry run) is someone else's
//! business. The composer only requires that the expected-outputs log is
//! persisted before `run` is called, so a crash mid-execution still leaves
//! a verifiable record.

use std::path::Path;

use anyhow::Result;

use crate::core::graph::PipelineGraph;

/// Executes a composed pipeline graph.
pub trait ExecutionEngine {
    fn run(&self, graph: &PipelineGraph, work_dir: &Path) -> Result<()>;
}

/// Engine that runs nothing. Used for composition-only invocations and for
/// exercising the run path in tests.
#[derive(Debug, Default)]
pub struct NoopEngine;

impl ExecutionEngine for NoopEngine {
    fn run(&self, _graph: &PipelineGraph, _work_dir: &Path) -> Result<()> {
        Ok(())
    }
}
