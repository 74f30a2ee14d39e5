//! Spatial smoothing of the mean functional image.
//!
//! `fwhm` is a free-form option: every configured kernel width gets its own
//! smoothing node, and the width is recorded in the description tag
//! (`desc-sm6`) so downstream names stay distinguishable.

use serde_json::json;

use crate::compose::{BlockContext, BlockOutput, NodeBlock};
use crate::core::block::{BlockSpec, ConfigScope, OptionKey, OptionVal, Switch};
use crate::core::filename::derive_output_name;
use crate::core::graph::{GraphNode, PipelineGraph};

pub fn block() -> NodeBlock {
    NodeBlock {
        spec: spec(),
        build,
    }
}

fn spec() -> BlockSpec {
    BlockSpec {
        name: "spatial_smoothing".to_string(),
        config: ConfigScope::Path(vec![
            "post_processing".to_string(),
            "spatial_smoothing".to_string(),
        ]),
        switch: Switch::Keys(vec!["run".to_string()]),
        option_key: OptionKey::Key("fwhm".to_string()),
        option_val: OptionVal::Any,
        inputs: vec![
            vec!["mean_functional".to_string()],
            vec!["functional_brain_mask".to_string()],
        ],
        outputs: vec!["desc-sm_bold".to_string()],
    }
}

fn build(graph: &mut PipelineGraph, ctx: &BlockContext<'_>) -> Result<Vec<BlockOutput>, String> {
    let fwhm = ctx
        .option
        .ok_or_else(|| "fwhm not selected".to_string())?;
    let functional = ctx.input("mean_functional")?;
    let mask = ctx.input("functional_brain_mask")?;

    let node = GraphNode::new(
        format!("smooth_fwhm{}_{}", fwhm, ctx.pipe_idx),
        "spatial_smooth",
    )
    .with_param("fwhm", json!(fwhm))
    .with_input("in_file", functional.producer.clone())
    .with_input("mask", mask.producer.clone())
    .with_output("smoothed");
    let producer = node.output_ref("smoothed");
    graph.add_node(node)?;

    let label = format!("sm{fwhm}");
    let filename = derive_output_name(&functional.filename, &label, "_bold.nii.gz", "_bold.nii.gz");
    Ok(vec![BlockOutput {
        resource: format!("desc-{label}_bold"),
        producer,
        filename,
        subdir: None,
    }])
}
