//! The composed pipeline graph handed to the execution engine.
//!
//! Nodes wrap opaque leaf operations (external imaging tools); the composer
//! only records which operation runs, with which parameters, and which
//! upstream output feeds each input port. The engine is free to schedule
//! independent branches however it likes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to one output port of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub node: String,
    pub port: String,
}

impl NodeRef {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

/// One computation node: an opaque leaf operation plus its wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique node id within the graph.
    pub id: String,
    /// Name of the external leaf operation (e.g. `compute_correlation`).
    pub operation: String,
    /// Scalar or list parameters passed to the leaf operation.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    /// Input port -> upstream producer.
    #[serde(default)]
    pub inputs: BTreeMap<String, NodeRef>,
    /// Output port names this node exposes.
    pub outputs: Vec<String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operation: operation.into(),
            params: BTreeMap::new(),
            inputs: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn with_input(mut self, port: &str, producer: NodeRef) -> Self {
        self.inputs.insert(port.to_string(), producer);
        self
    }

    pub fn with_output(mut self, port: &str) -> Self {
        self.outputs.push(port.to_string());
        self
    }

    /// Reference to one of this node's output ports.
    pub fn output_ref(&self, port: &str) -> NodeRef {
        NodeRef::new(self.id.clone(), port)
    }
}

/// The wired graph, in node insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineGraph {
    nodes: Vec<GraphNode>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Node ids must be unique; input wiring must reference
    /// nodes already in the graph (resources strictly flow from earlier
    /// outputs to later inputs, so no cycle detection is needed).
    pub fn add_node(&mut self, node: GraphNode) -> Result<(), String> {
        if self.node(&node.id).is_some() {
            return Err(format!("duplicate graph node id '{}'", node.id));
        }
        for (port, producer) in &node.inputs {
            let Some(upstream) = self.node(&producer.node) else {
                return Err(format!(
                    "node '{}' input '{}' references unknown node '{}'",
                    node.id, port, producer.node
                ));
            };
            if !upstream.outputs.iter().any(|out| out == &producer.port) {
                return Err(format!(
                    "node '{}' input '{}' references unknown port '{}.{}'",
                    node.id, port, producer.node, producer.port
                ));
            }
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of nodes feeding the given node, in port order.
    pub fn upstream_of(&self, id: &str) -> Vec<&NodeRef> {
        self.node(id)
            .map(|node| node.inputs.values().collect())
            .unwrap_or_default()
    }
}
