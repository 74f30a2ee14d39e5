//! Graph composition: one deterministic pass over the registered node
//! blocks.
//!
//! Each block is evaluated exactly once, in registration order. A block is
//! instantiated when its governing config subtree resolves, its switches
//! are on, and its option selector matches; list-valued options fan out to
//! one instantiation per element, and multiple live strategies of an input
//! fan out to one instantiation per combination. An unresolvable input
//! skips that block only; one unavailable optional analysis must not
//! abort pipeline composition.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::core::block::{BlockSpec, ConfigScope, OptionKey, OptionVal, Switch, parse_annotation};
use crate::core::config::PipelineConfig;
use crate::core::graph::{GraphNode, NodeRef, PipelineGraph};
use crate::core::identity::RunIdentity;
use crate::core::outputs::ExpectedOutputs;
use crate::core::pool::{ResourcePool, Strategy, StrategyIndex};

/// A registered node block: descriptor plus graph-building function.
#[derive(Debug, Clone)]
pub struct NodeBlock {
    pub spec: BlockSpec,
    pub build: BlockBuilder,
}

/// Wires one instantiation of a block into the graph and reports what it
/// produced. Builders see only resolved inputs; they never touch the pool.
pub type BlockBuilder =
    fn(&mut PipelineGraph, &BlockContext<'_>) -> Result<Vec<BlockOutput>, String>;

/// One resolved input strategy handed to a builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    /// The pool name that actually resolved (first found among alternates).
    pub resource: String,
    pub producer: NodeRef,
    pub filename: String,
    pub strategy: StrategyIndex,
}

/// Context for one block instantiation.
#[derive(Debug)]
pub struct BlockContext<'a> {
    pub cfg: &'a PipelineConfig,
    pub identity: &'a RunIdentity,
    /// Instantiation counter within this composition; builders embed it in
    /// node ids to keep parallel branches distinct.
    pub pipe_idx: u32,
    /// Option value selected for this instantiation, if the block fans out.
    pub option: Option<&'a str>,
    inputs: BTreeMap<String, ResolvedInput>,
}

impl BlockContext<'_> {
    /// Look up a resolved input by any of its declared alternate names.
    pub fn input(&self, name: &str) -> Result<&ResolvedInput, String> {
        if let Some(resolved) = self.inputs.get(name) {
            return Ok(resolved);
        }
        self.inputs
            .values()
            .find(|resolved| resolved.resource == name)
            .ok_or_else(|| format!("input '{name}' was not resolved for this block"))
    }
}

/// One product of a block instantiation, to be registered in the pool and
/// the expected-outputs registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutput {
    /// Pool key (option fan-out embeds the option value here).
    pub resource: String,
    pub producer: NodeRef,
    /// Expected filename pattern for this artifact.
    pub filename: String,
    /// Output subdirectory; defaults to the resource key's type suffix.
    pub subdir: Option<String>,
}

/// A pre-existing artifact seeding the pool before any block runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub resource: String,
    pub filename: String,
}

/// Why a block (or one of its instantiations) was not wired in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ConfigAbsent,
    SwitchOff,
    NoMatchingOption,
    MissingInput(String),
    BuildFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    pub block: String,
    pub reason: SkipReason,
}

/// Everything composition produces for one pipeline instance.
#[derive(Debug)]
pub struct Composition {
    pub graph: PipelineGraph,
    pub pool: ResourcePool,
    pub expected: ExpectedOutputs,
    pub skipped: Vec<SkippedBlock>,
}

/// Ordered registry of node blocks for one pipeline definition.
#[derive(Debug, Default)]
pub struct Composer {
    blocks: Vec<NodeBlock>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block. A malformed descriptor or duplicate name is fatal:
    /// composition must not proceed with an invalid descriptor set.
    pub fn register(&mut self, block: NodeBlock) -> Result<(), String> {
        let errors = block.spec.validate();
        if !errors.is_empty() {
            return Err(format!(
                "invalid node block '{}':\n- {}",
                block.spec.name,
                errors.join("\n- ")
            ));
        }
        if self.blocks.iter().any(|b| b.spec.name == block.spec.name) {
            return Err(format!("duplicate node block '{}'", block.spec.name));
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Register a block from its textual annotation.
    pub fn register_annotation(
        &mut self,
        annotation: &str,
        build: BlockBuilder,
    ) -> Result<(), String> {
        let spec = parse_annotation(annotation)?;
        self.register(NodeBlock { spec, build })
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Compose the pipeline graph for one instance.
    ///
    /// Evaluates every registered block exactly once, in registration
    /// order; never revisits a block. Returns `Err` only for wiring bugs
    /// (duplicate node ids, dangling references); per-block resolution
    /// failures are recorded in `skipped` and composition continues.
    pub fn compose(
        &self,
        cfg: &PipelineConfig,
        identity: &RunIdentity,
        seeds: &[Seed],
    ) -> Result<Composition, String> {
        let mut graph = PipelineGraph::new();
        let mut pool = ResourcePool::new();
        let mut expected = ExpectedOutputs::new();
        let mut skipped = Vec::new();
        let mut pipe_idx: u32 = 0;

        for seed in seeds {
            let node = GraphNode::new(format!("ingress_{}", seed.resource), "ingress")
                .with_param("filename", seed.filename.clone().into())
                .with_output("out");
            let producer = node.output_ref("out");
            graph.add_node(node)?;
            pool.update(&seed.resource, producer, &seed.filename);
        }

        for block in &self.blocks {
            let name = block.spec.name.as_str();

            let scope: &[String] = match &block.spec.config {
                ConfigScope::Unconditional => &[],
                ConfigScope::Path(path) => {
                    if cfg.subtree(path).is_none() {
                        debug!(block = name, "config subtree absent; skipping");
                        skipped.push(SkippedBlock {
                            block: name.to_string(),
                            reason: SkipReason::ConfigAbsent,
                        });
                        continue;
                    }
                    path
                }
            };

            if let Switch::Keys(keys) = &block.spec.switch {
                if !cfg.switch_on(scope, keys) {
                    debug!(block = name, "switch off; skipping");
                    skipped.push(SkippedBlock {
                        block: name.to_string(),
                        reason: SkipReason::SwitchOff,
                    });
                    continue;
                }
            }

            let options = match selected_options(&block.spec, cfg, scope) {
                Some(options) => options,
                None => {
                    debug!(block = name, "no matching option value; skipping");
                    skipped.push(SkippedBlock {
                        block: name.to_string(),
                        reason: SkipReason::NoMatchingOption,
                    });
                    continue;
                }
            };

            let combos = match resolve_input_combos(&block.spec, &pool) {
                Ok(combos) => combos,
                Err(missing) => {
                    warn!(block = name, error = %missing, "required input unavailable; skipping");
                    skipped.push(SkippedBlock {
                        block: name.to_string(),
                        reason: SkipReason::MissingInput(missing),
                    });
                    continue;
                }
            };

            for option in &options {
                for combo in &combos {
                    let ctx = BlockContext {
                        cfg,
                        identity,
                        pipe_idx,
                        option: option.as_deref(),
                        inputs: combo.clone(),
                    };
                    pipe_idx += 1;
                    match (block.build)(&mut graph, &ctx) {
                        Ok(outputs) => {
                            for output in outputs {
                                pool.update(&output.resource, output.producer, &output.filename);
                                let subdir = output
                                    .subdir
                                    .unwrap_or_else(|| default_subdir(&output.resource));
                                expected.add(&subdir, &output.filename);
                            }
                        }
                        Err(err) => {
                            warn!(block = name, error = %err, "block build failed; skipping instantiation");
                            skipped.push(SkippedBlock {
                                block: name.to_string(),
                                reason: SkipReason::BuildFailed(err),
                            });
                        }
                    }
                }
            }
        }

        debug!(
            nodes = graph.len(),
            expected = expected.len(),
            skipped = skipped.len(),
            "composition finished"
        );
        Ok(Composition {
            graph,
            pool,
            expected,
            skipped,
        })
    }
}

/// Which option values instantiate this block, in configured order.
/// `None` means the block is skipped (no matching value); `Some(vec![None])`
/// means a single un-optioned instantiation.
fn selected_options(
    spec: &BlockSpec,
    cfg: &PipelineConfig,
    scope: &[String],
) -> Option<Vec<Option<String>>> {
    match (&spec.option_key, &spec.option_val) {
        (OptionKey::None, _) => Some(vec![None]),
        (OptionKey::Key(key), OptionVal::Any) => {
            let values = cfg.option_values(scope, key);
            if values.is_empty() {
                None
            } else {
                Some(values.into_iter().map(Some).collect())
            }
        }
        (OptionKey::Key(key), OptionVal::Choices(choices)) => {
            let values: Vec<Option<String>> = cfg
                .option_values(scope, key)
                .into_iter()
                .filter(|value| choices.contains(value))
                .map(Some)
                .collect();
            if values.is_empty() { None } else { Some(values) }
        }
        // Rejected at registration time.
        (OptionKey::Key(_), OptionVal::None) => None,
    }
}

/// Resolve each input selector against the pool and build the strategy
/// cross-product: one combination per choice of live strategy per input.
fn resolve_input_combos(
    spec: &BlockSpec,
    pool: &ResourcePool,
) -> Result<Vec<BTreeMap<String, ResolvedInput>>, String> {
    let mut combos: Vec<BTreeMap<String, ResolvedInput>> = vec![BTreeMap::new()];
    for selector in &spec.inputs {
        let (found, strategies) = pool.get(selector)?;
        let canonical = selector.first().cloned().unwrap_or_else(|| found.to_string());
        let mut expanded = Vec::with_capacity(combos.len() * strategies.len());
        for combo in &combos {
            for strategy in strategies {
                let mut next = combo.clone();
                next.insert(canonical.clone(), resolved(found, strategy));
                expanded.push(next);
            }
        }
        combos = expanded;
    }
    Ok(combos)
}

fn resolved(found: &str, strategy: &Strategy) -> ResolvedInput {
    ResolvedInput {
        resource: found.to_string(),
        producer: strategy.producer.clone(),
        filename: strategy.filename.clone(),
        strategy: strategy.index,
    }
}

/// Output subdirectory for a resource key: the type suffix after the final
/// `_` (`desc-PearsonCorr_connectome` -> `connectome`).
pub fn default_subdir(resource: &str) -> String {
    resource
        .rsplit('_')
        .next()
        .unwrap_or(resource)
        .to_string()
}

/// Read pool seeds from the configuration's top-level `inputs` table
/// (resource name -> filename pattern).
pub fn seeds_from_config(cfg: &PipelineConfig) -> Vec<Seed> {
    let Some(serde_json::Value::Object(map)) = cfg.root().get("inputs") else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(resource, value)| {
            value.as_str().map(|filename| Seed {
                resource: resource.clone(),
                filename: filename.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::ResourceSelector;
    use serde_json::json;

    fn identity() -> RunIdentity {
        RunIdentity::new("default", "sub01")
    }

    fn spec(name: &str) -> BlockSpec {
        BlockSpec {
            name: name.to_string(),
            config: ConfigScope::Unconditional,
            switch: Switch::AlwaysOn,
            option_key: OptionKey::None,
            option_val: OptionVal::None,
            inputs: Vec::new(),
            outputs: vec!["out".to_string()],
        }
    }

    fn selector(names: &[&str]) -> ResourceSelector {
        names.iter().map(|name| name.to_string()).collect()
    }

    /// Produces one `desc-<option>_bold` output per instantiation.
    fn fan_out_builder(
        graph: &mut PipelineGraph,
        ctx: &BlockContext<'_>,
    ) -> Result<Vec<BlockOutput>, String> {
        let option = ctx.option.unwrap_or("plain");
        let id = format!("smooth_{}_{}", option, ctx.pipe_idx);
        let node = GraphNode::new(id, "smooth").with_output("out");
        let producer = node.output_ref("out");
        graph.add_node(node)?;
        Ok(vec![BlockOutput {
            resource: format!("desc-sm{option}_bold"),
            producer,
            filename: format!("sub01_desc-sm{option}_bold.nii.gz"),
            subdir: None,
        }])
    }

    /// Consumes `bold` and emits one output naming its input strategy.
    fn consumer_builder(
        graph: &mut PipelineGraph,
        ctx: &BlockContext<'_>,
    ) -> Result<Vec<BlockOutput>, String> {
        let input = ctx.input("bold")?;
        let id = format!("consume_{}", ctx.pipe_idx);
        let node = GraphNode::new(id, "consume")
            .with_input("in", input.producer.clone())
            .with_output("out");
        let producer = node.output_ref("out");
        graph.add_node(node)?;
        Ok(vec![BlockOutput {
            resource: format!("desc-consumed{}_bold", input.strategy.0),
            producer,
            filename: format!("sub01_desc-consumed{}_bold.nii.gz", input.strategy.0),
            subdir: None,
        }])
    }

    fn failing_builder(
        _graph: &mut PipelineGraph,
        _ctx: &BlockContext<'_>,
    ) -> Result<Vec<BlockOutput>, String> {
        Err("leaf operation unavailable".to_string())
    }

    #[test]
    fn registration_rejects_invalid_specs() {
        let mut composer = Composer::new();
        let mut bad = spec("bad");
        bad.outputs.clear();
        let err = composer
            .register(NodeBlock {
                spec: bad,
                build: fan_out_builder,
            })
            .expect_err("invalid spec");
        assert!(err.contains("outputs must be non-empty"));
        assert_eq!(composer.block_count(), 0);
    }

    #[test]
    fn registration_rejects_duplicate_names() {
        let mut composer = Composer::new();
        composer
            .register(NodeBlock {
                spec: spec("twin"),
                build: fan_out_builder,
            })
            .expect("first");
        let err = composer
            .register(NodeBlock {
                spec: spec("twin"),
                build: fan_out_builder,
            })
            .expect_err("duplicate");
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn list_valued_option_fans_out_to_distinct_entries() {
        let mut composer = Composer::new();
        let mut smoothing = spec("spatial_smoothing");
        smoothing.config = ConfigScope::Path(vec!["smoothing".to_string()]);
        smoothing.switch = Switch::Keys(vec!["run".to_string()]);
        smoothing.option_key = OptionKey::Key("fwhm".to_string());
        smoothing.option_val = OptionVal::Any;
        composer
            .register(NodeBlock {
                spec: smoothing,
                build: fan_out_builder,
            })
            .expect("register");

        let cfg = PipelineConfig::new(json!({
            "smoothing": {"run": true, "fwhm": [4, 6, 8]},
        }));
        let composition = composer
            .compose(&cfg, &identity(), &[])
            .expect("compose");

        // One pool entry and one expected output per list element, each with
        // the option value embedded in its key.
        for fwhm in ["4", "6", "8"] {
            let key = format!("desc-sm{fwhm}_bold");
            assert!(composition.pool.contains(&key), "missing pool entry {key}");
            assert!(composition
                .expected
                .contains("bold", &format!("sub01_desc-sm{fwhm}_bold.nii.gz")));
        }
        assert_eq!(composition.expected.len(), 3);
        assert_eq!(composition.graph.len(), 3);
        assert!(composition.skipped.is_empty());
    }

    #[test]
    fn switch_off_skips_block() {
        let mut composer = Composer::new();
        let mut gated = spec("gated");
        gated.config = ConfigScope::Path(vec!["smoothing".to_string()]);
        gated.switch = Switch::Keys(vec!["run".to_string()]);
        composer
            .register(NodeBlock {
                spec: gated,
                build: fan_out_builder,
            })
            .expect("register");

        let cfg = PipelineConfig::new(json!({"smoothing": {"run": false}}));
        let composition = composer
            .compose(&cfg, &identity(), &[])
            .expect("compose");
        assert!(composition.graph.is_empty());
        assert_eq!(
            composition.skipped,
            vec![SkippedBlock {
                block: "gated".to_string(),
                reason: SkipReason::SwitchOff,
            }]
        );
    }

    #[test]
    fn absent_config_subtree_skips_block() {
        let mut composer = Composer::new();
        let mut gated = spec("gated");
        gated.config = ConfigScope::Path(vec!["not_configured".to_string()]);
        composer
            .register(NodeBlock {
                spec: gated,
                build: fan_out_builder,
            })
            .expect("register");

        let cfg = PipelineConfig::new(json!({}));
        let composition = composer
            .compose(&cfg, &identity(), &[])
            .expect("compose");
        assert_eq!(composition.skipped[0].reason, SkipReason::ConfigAbsent);
    }

    #[test]
    fn missing_input_skips_block_but_not_siblings() {
        let mut composer = Composer::new();
        let mut orphan = spec("orphan");
        orphan.inputs = vec![selector(&["never_produced"])];
        composer
            .register(NodeBlock {
                spec: orphan,
                build: consumer_builder,
            })
            .expect("register orphan");
        composer
            .register(NodeBlock {
                spec: spec("sibling"),
                build: fan_out_builder,
            })
            .expect("register sibling");

        let cfg = PipelineConfig::new(json!({}));
        let composition = composer
            .compose(&cfg, &identity(), &[])
            .expect("compose");

        assert_eq!(composition.graph.len(), 1);
        assert_eq!(composition.skipped.len(), 1);
        assert!(matches!(
            composition.skipped[0].reason,
            SkipReason::MissingInput(_)
        ));
    }

    /// Emits the resource `bold` once per option value, giving downstream
    /// blocks multiple strategies to fan out over.
    fn bold_variant_builder(
        graph: &mut PipelineGraph,
        ctx: &BlockContext<'_>,
    ) -> Result<Vec<BlockOutput>, String> {
        let variant = ctx.option.unwrap_or("plain");
        let id = format!("register_{}_{}", variant, ctx.pipe_idx);
        let node = GraphNode::new(id, "register").with_output("out");
        let producer = node.output_ref("out");
        graph.add_node(node)?;
        Ok(vec![BlockOutput {
            resource: "bold".to_string(),
            producer,
            filename: format!("sub01_space-{variant}_bold.nii.gz"),
            subdir: None,
        }])
    }

    #[test]
    fn multiple_strategies_fan_out_per_combination() {
        let mut composer = Composer::new();
        let mut registration = spec("registration");
        registration.option_key = OptionKey::Key("template".to_string());
        registration.option_val = OptionVal::Any;
        composer
            .register(NodeBlock {
                spec: registration,
                build: bold_variant_builder,
            })
            .expect("register registration");
        let mut consumer = spec("consumer");
        consumer.inputs = vec![selector(&["bold"])];
        composer
            .register(NodeBlock {
                spec: consumer,
                build: consumer_builder,
            })
            .expect("register consumer");

        let cfg = PipelineConfig::new(json!({"template": ["mni", "native"]}));
        let composition = composer
            .compose(&cfg, &identity(), &[])
            .expect("compose");

        // Two registration variants, so the consumer instantiates twice.
        assert_eq!(composition.graph.len(), 4);
        assert!(composition.pool.contains("desc-consumed0_bold"));
        assert!(composition.pool.contains("desc-consumed1_bold"));
        let strategies = composition.pool.strategies("bold").expect("bold entry");
        assert_eq!(strategies.len(), 2);
    }

    #[test]
    fn build_failure_is_contained() {
        let mut composer = Composer::new();
        composer
            .register(NodeBlock {
                spec: spec("flaky"),
                build: failing_builder,
            })
            .expect("register flaky");
        composer
            .register(NodeBlock {
                spec: spec("steady"),
                build: fan_out_builder,
            })
            .expect("register steady");

        let cfg = PipelineConfig::new(json!({}));
        let composition = composer
            .compose(&cfg, &identity(), &[])
            .expect("compose");
        assert_eq!(composition.graph.len(), 1);
        assert!(matches!(
            composition.skipped[0].reason,
            SkipReason::BuildFailed(_)
        ));
    }

    #[test]
    fn seeds_from_config_reads_inputs_table() {
        let cfg = PipelineConfig::new(json!({
            "inputs": {"_timeseries": "sub01_atlas-aal_timeseries.1D"},
        }));
        let seeds = seeds_from_config(&cfg);
        assert_eq!(
            seeds,
            vec![Seed {
                resource: "_timeseries".to_string(),
                filename: "sub01_atlas-aal_timeseries.1D".to_string(),
            }]
        );
    }

    #[test]
    fn default_subdir_uses_type_suffix() {
        assert_eq!(default_subdir("desc-PearsonCorr_connectome"), "connectome");
        assert_eq!(default_subdir("bold"), "bold");
    }
}
