//! Configuration-driven composition of imaging analysis pipelines.
//!
//! Blocks declare what they need (config scope, switches, options, input
//! resources) and the composer turns a pipeline configuration into a wired
//! execution graph, a resource/strategy pool, and an expected-outputs log
//! that a post-run verifier checks against the actual output tree.

pub mod blocks;
pub mod check;
pub mod compose;
pub mod core;
pub mod engine;
pub mod io;
pub mod logging;
pub mod run;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
