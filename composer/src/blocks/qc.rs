//! Quality-control images: montages of the mean functional and a motion
//! parameter plot.
//!
//! The montage block wires a small subgraph (resample, then one montage
//! node per viewing plane); both planes land under the `qc` subdirectory.

use crate::compose::{BlockContext, BlockOutput, NodeBlock};
use crate::core::block::{BlockSpec, ConfigScope, OptionKey, OptionVal, Switch};
use crate::core::filename::derive_output_name;
use crate::core::graph::{GraphNode, PipelineGraph};

pub fn montage_block() -> NodeBlock {
    NodeBlock {
        spec: montage_spec(),
        build: build_montage,
    }
}

pub fn motion_plot_block() -> NodeBlock {
    NodeBlock {
        spec: motion_plot_spec(),
        build: build_motion_plot,
    }
}

fn montage_spec() -> BlockSpec {
    BlockSpec {
        name: "qc_montage".to_string(),
        config: ConfigScope::Path(vec!["quality_control".to_string()]),
        switch: Switch::Keys(vec!["generate_quality_control_images".to_string()]),
        option_key: OptionKey::None,
        option_val: OptionVal::None,
        inputs: vec![vec!["mean_functional".to_string()]],
        outputs: vec![
            "desc-axial_qc".to_string(),
            "desc-sagittal_qc".to_string(),
        ],
    }
}

fn motion_plot_spec() -> BlockSpec {
    BlockSpec {
        name: "qc_motion_plot".to_string(),
        config: ConfigScope::Path(vec!["quality_control".to_string()]),
        switch: Switch::Keys(vec!["generate_quality_control_images".to_string()]),
        option_key: OptionKey::None,
        option_val: OptionVal::None,
        inputs: vec![vec![
            "movement-parameters".to_string(),
            "motion-params".to_string(),
        ]],
        outputs: vec!["desc-motion_qc".to_string()],
    }
}

fn build_montage(
    graph: &mut PipelineGraph,
    ctx: &BlockContext<'_>,
) -> Result<Vec<BlockOutput>, String> {
    let functional = ctx.input("mean_functional")?;

    // Resample once, montage per viewing plane off the resampled image.
    let resample = GraphNode::new(format!("qc_resample_{}", ctx.pipe_idx), "resample_1mm")
        .with_input("in_file", functional.producer.clone())
        .with_output("resampled");
    let resampled = resample.output_ref("resampled");
    graph.add_node(resample)?;

    let mut outputs = Vec::with_capacity(2);
    for plane in ["axial", "sagittal"] {
        let montage = GraphNode::new(
            format!("qc_montage_{}_{}", plane, ctx.pipe_idx),
            format!("montage_{plane}"),
        )
        .with_input("in_file", resampled.clone())
        .with_output("montage");
        let producer = montage.output_ref("montage");
        graph.add_node(montage)?;

        let filename =
            derive_output_name(&functional.filename, plane, "_bold.nii.gz", "_qc.png");
        outputs.push(BlockOutput {
            resource: format!("desc-{plane}_qc"),
            producer,
            filename,
            subdir: Some("qc".to_string()),
        });
    }
    Ok(outputs)
}

fn build_motion_plot(
    graph: &mut PipelineGraph,
    ctx: &BlockContext<'_>,
) -> Result<Vec<BlockOutput>, String> {
    let motion = ctx.input("movement-parameters")?;

    let node = GraphNode::new(
        format!("qc_motion_plot_{}", ctx.pipe_idx),
        "plot_motion_parameters",
    )
    .with_input("motion_parameters", motion.producer.clone())
    .with_output("plot");
    let producer = node.output_ref("plot");
    graph.add_node(node)?;

    let filename = derive_output_name(&motion.filename, "motion", ".1D", "_qc.png");
    Ok(vec![BlockOutput {
        resource: "desc-motion_qc".to_string(),
        producer,
        filename,
        subdir: Some("qc".to_string()),
    }])
}
