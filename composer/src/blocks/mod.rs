//! Built-in node blocks shipped with the composer.

pub mod connectome;
pub mod qc;
pub mod smoothing;

use crate::compose::{Composer, NodeBlock};

/// All built-in blocks, in the order they should be registered.
pub fn builtin_blocks() -> Vec<NodeBlock> {
    vec![
        smoothing::block(),
        connectome::block(),
        qc::montage_block(),
        qc::motion_plot_block(),
    ]
}

/// A composer with every built-in block registered.
pub fn builtin_composer() -> Result<Composer, String> {
    let mut composer = Composer::new();
    for block in builtin_blocks() {
        composer.register(block)?;
    }
    Ok(composer)
}
