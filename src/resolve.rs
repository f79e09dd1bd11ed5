//! Task group resolution
//!
//! Flattens a [`TaskGroupSpec`] and its already resolved references into a
//! single [`TaskSpec`]:
//!
//! - inline steps are emitted unchanged, in place
//! - a `uses:` step is replaced by every step of the referenced task, named
//!   `<outer>-<inner>`, with bound param references rewritten
//! - params are the group's own, followed by each unbound referenced param
//!   not already present
//!
//! The resolver never fetches anything and never recurses: references must
//! arrive fully flattened.

use tracing::{debug, instrument, warn};

use crate::error::ResolveError;
use crate::param::ParamSpec;
use crate::spec::{ResolvedReferences, TaskGroupSpec, TaskSpec};
use crate::step::{GroupStep, Step, Uses};
use crate::substitution::Bindings;

/// Resolve a task group into a flat task specification
///
/// Fails with [`ResolveError::MissingReference`] when a `uses:` step has no
/// entry in `references`, and with [`ResolveError::ParamTypeConflict`] when an
/// unbound referenced param collides with an existing param of another type.
#[instrument(skip_all, fields(steps = group.steps.len(), references = references.len()))]
pub fn resolve(
    group: &TaskGroupSpec,
    references: &ResolvedReferences,
) -> Result<TaskSpec, ResolveError> {
    let mut params = group.params.clone();
    let mut steps = Vec::with_capacity(group.steps.len());

    for (index, group_step) in group.steps.iter().enumerate() {
        match group_step {
            GroupStep::Inline(step) => steps.push(step.clone()),
            GroupStep::Reference { step: outer, uses } => {
                let referenced =
                    references
                        .get(&index)
                        .ok_or_else(|| ResolveError::MissingReference {
                            index,
                            task_ref: uses.task_ref.name.clone(),
                        })?;

                debug!(
                    index,
                    task_ref = %uses.task_ref.name,
                    steps = referenced.steps.len(),
                    "expanding uses step"
                );

                let bindings = Bindings::new(&uses.param_bindings);
                merge_params(&mut params, group, referenced, uses, &bindings)?;
                steps.extend(
                    referenced
                        .steps
                        .iter()
                        .map(|inner| splice_step(outer, inner, &bindings)),
                );
            }
        }
    }

    Ok(TaskSpec { params, steps })
}

/// Append unbound referenced params, refusing type conflicts
fn merge_params(
    params: &mut Vec<ParamSpec>,
    group: &TaskGroupSpec,
    referenced: &TaskSpec,
    uses: &Uses,
    bindings: &Bindings<'_>,
) -> Result<(), ResolveError> {
    for incoming in &referenced.params {
        if let Some(target) = bindings.get(&incoming.name) {
            if !group.params.iter().any(|p| p.name == target) {
                warn!(
                    param = %incoming.name,
                    bound_to = target,
                    task_ref = %uses.task_ref.name,
                    "binding target is not a group param"
                );
            }
            continue;
        }

        match params.iter().find(|p| p.name == incoming.name) {
            Some(existing) if existing.param_type != incoming.param_type => {
                return Err(ResolveError::ParamTypeConflict {
                    name: incoming.name.clone(),
                    existing: existing.param_type,
                    incoming: incoming.param_type,
                    task_ref: uses.task_ref.name.clone(),
                });
            }
            Some(_) => {
                debug!(param = %incoming.name, "param already declared");
            }
            None => params.push(incoming.clone()),
        }
    }
    Ok(())
}

/// Merged step: outer name prefixes inner name, attributes from inner
fn splice_step(outer: &Step, inner: &Step, bindings: &Bindings<'_>) -> Step {
    let mut step = bindings.rewrite_step(inner);
    step.name = format!("{}-{}", outer.name, inner.name);
    step
}
