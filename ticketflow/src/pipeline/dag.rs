//! The stage graph.
//!
//! Stages are kept in declaration order, which the builder guarantees is a
//! topological order. Readiness is tracked with in-degrees so independent
//! stages can be scheduled together.

use super::StageSpec;
use crate::core::StageId;
use std::collections::HashMap;

/// A directed acyclic graph of stages for execution.
#[derive(Debug, Clone)]
pub struct StageGraph {
    /// The pipeline name.
    name: String,
    /// Stage specifications in declaration order.
    stages: Vec<StageSpec>,
}

impl StageGraph {
    /// Creates a graph from already validated stages.
    #[must_use]
    pub(crate) fn new(name: String, stages: Vec<StageSpec>) -> Self {
        Self { name, stages }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the graph has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// All stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Looks up a stage.
    #[must_use]
    pub fn get(&self, id: StageId) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Stage ids in the order they run sequentially.
    #[must_use]
    pub fn execution_order(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id).collect()
    }

    /// Every remote object name the pipeline can create.
    #[must_use]
    pub fn object_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.output.as_str()).collect()
    }

    /// Stages `id` depends on, in id order.
    #[must_use]
    pub fn dependencies(&self, id: StageId) -> Vec<StageId> {
        self.get(id)
            .map(|s| s.dependencies.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Stages that list `id` as a dependency, in declaration order.
    #[must_use]
    pub fn dependents(&self, id: StageId) -> Vec<StageId> {
        self.stages
            .iter()
            .filter(|s| s.dependencies.contains(&id))
            .map(|s| s.id)
            .collect()
    }

    /// Starts tracking readiness for one run.
    #[must_use]
    pub fn readiness(&self) -> Readiness<'_> {
        Readiness {
            graph: self,
            in_degree: self
                .stages
                .iter()
                .map(|s| (s.id, s.dependencies.len()))
                .collect(),
        }
    }
}

/// Counts unsatisfied dependencies per stage during a run.
#[derive(Debug)]
pub struct Readiness<'a> {
    graph: &'a StageGraph,
    in_degree: HashMap<StageId, usize>,
}

impl Readiness<'_> {
    /// Stages with no dependencies, in declaration order.
    #[must_use]
    pub fn initial(&self) -> Vec<StageId> {
        self.graph
            .stages
            .iter()
            .filter(|s| self.in_degree.get(&s.id) == Some(&0))
            .map(|s| s.id)
            .collect()
    }

    /// Records that `id` is done and returns the stages it unblocked.
    pub fn complete(&mut self, id: StageId) -> Vec<StageId> {
        let mut ready = Vec::new();
        for child in self.graph.dependents(id) {
            if let Some(count) = self.in_degree.get_mut(&child) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.push(child);
                }
            }
        }
        ready
    }
}
