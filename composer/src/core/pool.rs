//! Resource/strategy pool: symbolic artifact names mapped to the live
//! producers of each alternative version.
//!
//! A "strategy" is one alternative processing branch producing a variant of
//! a logical resource (e.g. two differently-registered mean functional
//! images). Strategies carry explicit indices; entries only accumulate
//! during composition and are dropped with the pool when composition ends.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::graph::NodeRef;

/// Position of a strategy within its resource's list, assigned at insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrategyIndex(pub u32);

impl fmt::Display for StrategyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strat-{}", self.0)
    }
}

/// One live producer of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub index: StrategyIndex,
    /// Graph node + output port producing this version.
    pub producer: NodeRef,
    /// Filename pattern of the produced artifact (drives lineage and
    /// expected-output synthesis downstream).
    pub filename: String,
}

/// Registry of resource name -> live strategies for one pipeline instance.
#[derive(Debug, Clone, Default)]
pub struct ResourcePool {
    entries: BTreeMap<String, Vec<Strategy>>,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new strategy for `resource`, never overwriting existing ones.
    /// Returns the index assigned to the new strategy.
    pub fn update(&mut self, resource: &str, producer: NodeRef, filename: &str) -> StrategyIndex {
        let strategies = self.entries.entry(resource.to_string()).or_default();
        let index = StrategyIndex(strategies.len() as u32);
        strategies.push(Strategy {
            index,
            producer,
            filename: filename.to_string(),
        });
        index
    }

    /// Resolve the first present name among `names` (alternate names for
    /// the same concept) to its live strategies.
    pub fn get<'a>(&self, names: &'a [String]) -> Result<(&'a str, &[Strategy]), String> {
        for name in names {
            if let Some(strategies) = self.entries.get(name) {
                return Ok((name.as_str(), strategies.as_slice()));
            }
        }
        Err(format!(
            "resource not found: requested [{}]; available [{}]",
            names.join(", "),
            self.entries
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.entries.contains_key(resource)
    }

    /// Strategies registered for one resource, if any.
    pub fn strategies(&self, resource: &str) -> Option<&[Strategy]> {
        self.entries.get(resource).map(Vec::as_slice)
    }

    /// Resource names currently in the pool, sorted.
    pub fn resource_names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Count of distinct resource names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer(node: &str) -> NodeRef {
        NodeRef::new(node, "out")
    }

    #[test]
    fn update_appends_and_assigns_indices() {
        let mut pool = ResourcePool::new();
        let first = pool.update("mean_functional", producer("reg_a"), "sub01_bold.nii.gz");
        let second = pool.update("mean_functional", producer("reg_b"), "sub01_bold.nii.gz");
        assert_eq!(first, StrategyIndex(0));
        assert_eq!(second, StrategyIndex(1));

        let strategies = pool.strategies("mean_functional").expect("entry");
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].producer, producer("reg_a"));
        assert_eq!(strategies[1].producer, producer("reg_b"));
    }

    #[test]
    fn update_never_overwrites_existing_strategies() {
        let mut pool = ResourcePool::new();
        pool.update("bold", producer("a"), "a.nii.gz");
        pool.update("bold", producer("b"), "b.nii.gz");
        let strategies = pool.strategies("bold").expect("entry");
        assert_eq!(strategies[0].filename, "a.nii.gz");
        assert_eq!(strategies[0].index, StrategyIndex(0));
    }

    #[test]
    fn get_returns_first_found_alternate() {
        let mut pool = ResourcePool::new();
        pool.update("motion-params", producer("mc"), "sub01_motion.1D");
        let names = vec![
            "movement-parameters".to_string(),
            "motion-params".to_string(),
        ];
        let (found, strategies) = pool.get(&names).expect("resolve");
        assert_eq!(found, "motion-params");
        assert_eq!(strategies.len(), 1);
    }

    #[test]
    fn get_reports_requested_and_available_names() {
        let mut pool = ResourcePool::new();
        pool.update("bold", producer("a"), "a.nii.gz");
        let names = vec!["_timeseries".to_string()];
        let err = pool.get(&names).expect_err("not found");
        assert!(err.contains("requested [_timeseries]"));
        assert!(err.contains("available [bold]"));
    }
}
