//! Filesystem concerns: configuration loading and the per-instance output
//! logs. Everything here returns `anyhow::Result` with path context.

pub mod config;
pub mod outputs_log;
