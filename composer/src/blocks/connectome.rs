//! Functional connectivity matrices from extracted ROI timeseries.
//!
//! One correlation node per configured method; the method name flows into
//! the node id, the resource key, and the output filename's description
//! tag.

use serde_json::json;

use crate::compose::{BlockContext, BlockOutput, NodeBlock};
use crate::core::block::{BlockSpec, ConfigScope, OptionKey, OptionVal, Switch};
use crate::core::filename::derive_output_name;
use crate::core::graph::{GraphNode, PipelineGraph};

/// Correlation methods this block knows how to compute.
pub const CONNECTOME_METHODS: [&str; 2] = ["PearsonCorr", "PartialCorr"];

/// Annotation form of this block's descriptor.
pub const ANNOTATION: &str = r#"
Build one correlation matrix per configured connectivity method.

Node Block:
{"name": "timeseries_correlation_matrix",
 "config": ["timeseries_extraction"],
 "switch": ["run"],
 "option_key": "tse_roi_paths",
 "option_val": ["PearsonCorr", "PartialCorr"],
 "inputs": ["_timeseries"],
 "outputs": ["_connectome"]}
"#;

pub fn block() -> NodeBlock {
    NodeBlock {
        spec: spec(),
        build,
    }
}

fn spec() -> BlockSpec {
    BlockSpec {
        name: "timeseries_correlation_matrix".to_string(),
        config: ConfigScope::Path(vec!["timeseries_extraction".to_string()]),
        switch: Switch::Keys(vec!["run".to_string()]),
        option_key: OptionKey::Key("tse_roi_paths".to_string()),
        option_val: OptionVal::Choices(
            CONNECTOME_METHODS.iter().map(|m| m.to_string()).collect(),
        ),
        inputs: vec![vec!["_timeseries".to_string()]],
        outputs: vec!["_connectome".to_string()],
    }
}

fn build(graph: &mut PipelineGraph, ctx: &BlockContext<'_>) -> Result<Vec<BlockOutput>, String> {
    let method = ctx
        .option
        .ok_or_else(|| "correlation method not selected".to_string())?;
    let timeseries = ctx.input("_timeseries")?;

    // Method names never contain spaces today, but node ids must not.
    let method_label = method.replace(' ', "+");
    let node = GraphNode::new(
        format!("timeseries_{}_{}", method_label, ctx.pipe_idx),
        "compute_correlation",
    )
    .with_param("method", json!(method))
    .with_input("time_series", timeseries.producer.clone())
    .with_output("connectome");
    let producer = node.output_ref("connectome");
    graph.add_node(node)?;

    let filename = derive_output_name(
        &timeseries.filename,
        &method_label,
        "_timeseries.1D",
        "_connectome.npy",
    );
    Ok(vec![BlockOutput {
        resource: format!("desc-{method_label}_connectome"),
        producer,
        filename,
        subdir: None,
    }])
}
