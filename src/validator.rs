//! Pre-resolution validation
//!
//! The resolver only refuses missing references and param type conflicts.
//! This pass reports everything it can find in one go, including problems
//! the resolver lets through:
//!
//! - duplicate group params
//! - bindings whose group-side param is not declared
//! - bindings whose task-side param is not declared by the referenced task
//! - bindings between params of different types
//! - step names colliding after expansion
//! - `uses:` steps without a name (merged names start with `-`)
//! - defaults whose shape disagrees with the declared type
//! - `$(params.X)` tokens naming a param the resolved task won't declare

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::param::{ParamSpec, ParamType};
use crate::spec::{ResolvedReferences, TaskGroupSpec};
use crate::step::GroupStep;
use crate::substitution::{step_param_references, Bindings};

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem found in a task group
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("Param '{name}' is declared more than once")]
    DuplicateParam { name: String },

    #[error("Step {step} has no resolved specification for task '{task_ref}'")]
    UnresolvedReference { step: usize, task_ref: String },

    #[error("Step {step} binds '{binding}' to '{target}', which is not a group param")]
    UnknownBindingTarget {
        step: usize,
        binding: String,
        target: String,
        available: Vec<String>,
    },

    #[error("Step {step} binds '{binding}', which task '{task_ref}' does not declare")]
    UnknownBindingSource {
        step: usize,
        binding: String,
        task_ref: String,
    },

    #[error("Step {step} binds {binding_type} param '{binding}' to {target_type} param '{target}'")]
    BindingTypeMismatch {
        step: usize,
        binding: String,
        binding_type: ParamType,
        target: String,
        target_type: ParamType,
    },

    #[error("Param '{name}' is {existing} but task '{task_ref}' (step {step}) declares it {incoming}")]
    ParamTypeMismatch {
        step: usize,
        name: String,
        existing: ParamType,
        incoming: ParamType,
        task_ref: String,
    },

    #[error("Step name '{name}' appears more than once after expansion")]
    DuplicateStepName { name: String },

    #[error("Step {step} uses a task but has no name")]
    UnnamedReferenceStep { step: usize },

    #[error("Param '{name}' in {owner} is declared {declared} but its default is {actual}")]
    DefaultTypeMismatch {
        owner: String,
        name: String,
        declared: ParamType,
        actual: ParamType,
    },

    #[error("Step {step} references param '{name}', which the resolved task does not declare")]
    UndeclaredParamReference { step: usize, name: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::UnknownBindingSource { .. }
            | Diagnostic::BindingTypeMismatch { .. }
            | Diagnostic::UnnamedReferenceStep { .. }
            | Diagnostic::UndeclaredParamReference { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Get suggestion for fixing this diagnostic
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Diagnostic::DuplicateParam { .. } => Some("Remove or rename the duplicate".to_string()),
            Diagnostic::UnresolvedReference { .. } => {
                Some("Check the taskRef name or pass the task directory with --tasks".to_string())
            }
            Diagnostic::UnknownBindingTarget { available, .. } => {
                if available.is_empty() {
                    Some("Declare the param under spec.params".to_string())
                } else {
                    Some(format!("Available params: {}", available.join(", ")))
                }
            }
            Diagnostic::ParamTypeMismatch { name, .. } => Some(format!(
                "Bind '{}' to a group param of the same type with paramBindings",
                name
            )),
            Diagnostic::UnnamedReferenceStep { .. } => {
                Some("Add a name: to the uses: step".to_string())
            }
            Diagnostic::DefaultTypeMismatch { declared, .. } => {
                Some(format!("Give the param a {} default or change its type", declared))
            }
            Diagnostic::UndeclaredParamReference { name, .. } => Some(format!(
                "Declare '{}' under spec.params or bind it with paramBindings",
                name
            )),
            _ => None,
        }
    }
}

/// Result of validating a task group
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub step_count: usize,
    pub reference_count: usize,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Warning => self.warnings.push(diagnostic),
            Severity::Error => self.errors.push(diagnostic),
        }
    }
}

/// Runs every check over a task group and its references
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(
        &self,
        group: &TaskGroupSpec,
        references: &ResolvedReferences,
    ) -> ValidationReport {
        let mut report = ValidationReport {
            step_count: group.steps.len(),
            reference_count: group.references().count(),
            ..Default::default()
        };

        for diagnostic in check_group_params(&group.params) {
            report.add(diagnostic);
        }
        for diagnostic in check_references(group, references) {
            report.add(diagnostic);
        }
        for diagnostic in check_step_names(group, references) {
            report.add(diagnostic);
        }
        for diagnostic in check_defaults(group, references) {
            report.add(diagnostic);
        }
        for diagnostic in check_param_references(group, references) {
            report.add(diagnostic);
        }

        report
    }
}

fn check_group_params(params: &[ParamSpec]) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut diagnostics = Vec::new();
    for param in params {
        if !seen.insert(param.name.as_str()) && reported.insert(param.name.as_str()) {
            diagnostics.push(Diagnostic::DuplicateParam {
                name: param.name.clone(),
            });
        }
    }
    diagnostics
}

fn check_references(group: &TaskGroupSpec, references: &ResolvedReferences) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let group_types: HashMap<&str, ParamType> = group
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.param_type))
        .collect();

    // Merged param types so far, mirroring the resolver's order
    let mut merged: HashMap<String, ParamType> = group
        .params
        .iter()
        .map(|p| (p.name.clone(), p.param_type))
        .collect();

    for (step, uses) in group.references() {
        let task_ref = &uses.task_ref.name;
        if group.steps[step].name().is_empty() {
            diagnostics.push(Diagnostic::UnnamedReferenceStep { step });
        }

        for binding in &uses.param_bindings {
            if !group_types.contains_key(binding.param.as_str()) {
                let mut available: Vec<String> = group_types.keys().map(|k| k.to_string()).collect();
                available.sort();
                diagnostics.push(Diagnostic::UnknownBindingTarget {
                    step,
                    binding: binding.name.clone(),
                    target: binding.param.clone(),
                    available,
                });
            }
        }

        let Some(referenced) = references.get(&step) else {
            diagnostics.push(Diagnostic::UnresolvedReference {
                step,
                task_ref: task_ref.clone(),
            });
            continue;
        };

        for binding in &uses.param_bindings {
            match referenced.params.iter().find(|p| p.name == binding.name) {
                None => diagnostics.push(Diagnostic::UnknownBindingSource {
                    step,
                    binding: binding.name.clone(),
                    task_ref: task_ref.clone(),
                }),
                Some(declared) => {
                    if let Some(&target_type) = group_types.get(binding.param.as_str()) {
                        if target_type != declared.param_type {
                            diagnostics.push(Diagnostic::BindingTypeMismatch {
                                step,
                                binding: binding.name.clone(),
                                binding_type: declared.param_type,
                                target: binding.param.clone(),
                                target_type,
                            });
                        }
                    }
                }
            }
        }

        let bindings = Bindings::new(&uses.param_bindings);
        for incoming in &referenced.params {
            if bindings.is_bound(&incoming.name) {
                continue;
            }
            match merged.get(&incoming.name) {
                Some(&existing) if existing != incoming.param_type => {
                    diagnostics.push(Diagnostic::ParamTypeMismatch {
                        step,
                        name: incoming.name.clone(),
                        existing,
                        incoming: incoming.param_type,
                        task_ref: task_ref.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    merged.insert(incoming.name.clone(), incoming.param_type);
                }
            }
        }
    }

    diagnostics
}

/// Names the resolver would emit; unnamed inline steps are skipped
fn check_step_names(group: &TaskGroupSpec, references: &ResolvedReferences) -> Vec<Diagnostic> {
    let mut names = Vec::new();
    for (index, group_step) in group.steps.iter().enumerate() {
        match group_step {
            GroupStep::Inline(step) => {
                if !step.name.is_empty() {
                    names.push(step.name.clone());
                }
            }
            GroupStep::Reference { step, .. } => {
                if let Some(referenced) = references.get(&index) {
                    names.extend(
                        referenced
                            .steps
                            .iter()
                            .map(|inner| format!("{}-{}", step.name, inner.name)),
                    );
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    names
        .iter()
        .filter(|name| !seen.insert(name.as_str()) && reported.insert(name.as_str()))
        .map(|name| Diagnostic::DuplicateStepName { name: name.clone() })
        .collect()
}

fn check_defaults(group: &TaskGroupSpec, references: &ResolvedReferences) -> Vec<Diagnostic> {
    let owned = std::iter::once(("the task group".to_string(), &group.params)).chain(
        group.references().filter_map(|(step, uses)| {
            references
                .get(&step)
                .map(|spec| (format!("task '{}'", uses.task_ref.name), &spec.params))
        }),
    );

    let mut diagnostics = Vec::new();
    for (owner, params) in owned {
        for param in params {
            let Some(default) = &param.default else {
                continue;
            };
            if default.param_type() != param.param_type {
                diagnostics.push(Diagnostic::DefaultTypeMismatch {
                    owner: owner.clone(),
                    name: param.name.clone(),
                    declared: param.param_type,
                    actual: default.param_type(),
                });
            }
        }
    }
    diagnostics
}

/// Tokens checked against the params the resolver would emit
fn check_param_references(
    group: &TaskGroupSpec,
    references: &ResolvedReferences,
) -> Vec<Diagnostic> {
    let mut declared: HashSet<&str> = group.params.iter().map(|p| p.name.as_str()).collect();
    for (step, uses) in group.references() {
        if let Some(referenced) = references.get(&step) {
            let bindings = Bindings::new(&uses.param_bindings);
            declared.extend(
                referenced
                    .params
                    .iter()
                    .filter(|p| !bindings.is_bound(&p.name))
                    .map(|p| p.name.as_str()),
            );
        }
    }

    let mut diagnostics = Vec::new();
    for (index, group_step) in group.steps.iter().enumerate() {
        let emitted: Vec<_> = match group_step {
            GroupStep::Inline(step) => vec![step.clone()],
            GroupStep::Reference { uses, .. } => match references.get(&index) {
                Some(referenced) => {
                    let bindings = Bindings::new(&uses.param_bindings);
                    referenced.steps.iter().map(|s| bindings.rewrite_step(s)).collect()
                }
                None => continue,
            },
        };

        let mut reported = HashSet::new();
        for step in &emitted {
            for name in step_param_references(step) {
                if !declared.contains(name) && reported.insert(name.to_string()) {
                    diagnostics.push(Diagnostic::UndeclaredParamReference {
                        step: index,
                        name: name.to_string(),
                    });
                }
            }
        }
    }
    diagnostics
}
