//! Deterministic, pure logic shared by the composer.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod block;
pub mod config;
pub mod filename;
pub mod graph;
pub mod identity;
pub mod matching;
pub mod outputs;
pub mod pool;
