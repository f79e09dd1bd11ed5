//! Task group input and flat task output specifications

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::param::ParamSpec;
use crate::step::{GroupStep, Step, Uses};

/// Composite task: ordered steps, some delegating to other tasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskGroupSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
    pub steps: Vec<GroupStep>,
}

impl TaskGroupSpec {
    /// Indices and `uses:` blocks of every referencing step, in step order
    pub fn references(&self) -> impl Iterator<Item = (usize, &Uses)> {
        self.steps
            .iter()
            .enumerate()
            .filter_map(|(index, step)| step.uses_block().map(|uses| (index, uses)))
    }
}

/// Flat task specification
///
/// Both the shape of a referenced task and the resolver's output.
/// `params` always serializes, as `[]` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Fully resolved referenced tasks, keyed by the position of the `uses:` step
pub type ResolvedReferences = HashMap<usize, TaskSpec>;
