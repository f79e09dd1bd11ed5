//! Property-based tests for resolution invariants.
//!
//! - Groups without `uses:` resolve to themselves
//! - Output step count is inline steps plus every referenced task's steps
//! - Spliced steps are named `<outer>-<inner>` and appear in place
//! - Disjoint unbound params are unioned, group params first

use proptest::prelude::*;
use taskgroup::{
    resolve, GroupStep, ParamSpec, ParamType, ResolvedReferences, Step, TaskGroupSpec, TaskSpec,
    Uses,
};

// =============================================================================
// Strategies
// =============================================================================

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}".prop_map(String::from)
}

fn step_strategy() -> impl Strategy<Value = Step> {
    (name_strategy(), "[a-z ]{0,12}")
        .prop_map(|(name, script)| Step::script("bash:latest", script).named(name))
}

/// One group step: inline, or a reference together with the task it resolves to
#[derive(Debug, Clone)]
enum Planned {
    Inline(Step),
    Uses { outer: String, task: TaskSpec },
}

fn planned_strategy() -> impl Strategy<Value = Planned> {
    prop_oneof![
        step_strategy().prop_map(Planned::Inline),
        (
            name_strategy(),
            proptest::collection::vec(step_strategy(), 0..4)
        )
            .prop_map(|(outer, steps)| Planned::Uses {
                outer,
                task: TaskSpec {
                    params: vec![],
                    steps,
                },
            }),
    ]
}

fn build(plan: &[Planned]) -> (TaskGroupSpec, ResolvedReferences) {
    let mut references = ResolvedReferences::new();
    let steps = plan
        .iter()
        .enumerate()
        .map(|(index, planned)| match planned {
            Planned::Inline(step) => GroupStep::Inline(step.clone()),
            Planned::Uses { outer, task } => {
                references.insert(index, task.clone());
                GroupStep::uses(outer.clone(), Uses::task(format!("task{index}")))
            }
        })
        .collect();
    (
        TaskGroupSpec {
            params: vec![],
            steps,
        },
        references,
    )
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn inline_only_group_is_identity(
        steps in proptest::collection::vec(step_strategy(), 0..8),
        params in proptest::collection::vec(name_strategy(), 0..4),
    ) {
        let group = TaskGroupSpec {
            params: params.iter().map(|p| ParamSpec::new(p.clone(), ParamType::String)).collect(),
            steps: steps.iter().cloned().map(GroupStep::Inline).collect(),
        };

        let resolved = resolve(&group, &ResolvedReferences::new()).unwrap();
        prop_assert_eq!(resolved.steps, steps);
        prop_assert_eq!(resolved.params, group.params);
    }

    #[test]
    fn step_count_is_inline_plus_referenced(plan in proptest::collection::vec(planned_strategy(), 0..8)) {
        let (group, references) = build(&plan);
        let expected: usize = plan
            .iter()
            .map(|p| match p {
                Planned::Inline(_) => 1,
                Planned::Uses { task, .. } => task.steps.len(),
            })
            .sum();

        let resolved = resolve(&group, &references).unwrap();
        prop_assert_eq!(resolved.steps.len(), expected);
    }

    #[test]
    fn spliced_steps_are_prefixed_in_place(plan in proptest::collection::vec(planned_strategy(), 0..8)) {
        let (group, references) = build(&plan);
        let expected: Vec<Step> = plan
            .iter()
            .flat_map(|p| match p {
                Planned::Inline(step) => vec![step.clone()],
                Planned::Uses { outer, task } => task
                    .steps
                    .iter()
                    .map(|inner| inner.clone().named(format!("{outer}-{}", inner.name)))
                    .collect(),
            })
            .collect();

        let resolved = resolve(&group, &references).unwrap();
        prop_assert_eq!(resolved.steps, expected);
    }

    #[test]
    fn disjoint_params_are_unioned_in_order(
        group_params in proptest::collection::vec(name_strategy(), 0..4),
        task_params in proptest::collection::vec(name_strategy(), 0..4),
    ) {
        // Prefixes keep the two sets disjoint
        let group_params: Vec<_> = group_params.iter().enumerate().map(|(i, p)| format!("g{i}{p}")).collect();
        let task_params: Vec<_> = task_params.iter().enumerate().map(|(i, p)| format!("t{i}{p}")).collect();

        let group = TaskGroupSpec {
            params: group_params.iter().map(|p| ParamSpec::new(p.clone(), ParamType::String)).collect(),
            steps: vec![GroupStep::uses("x", Uses::task("x"))],
        };
        let mut references = ResolvedReferences::new();
        references.insert(0, TaskSpec {
            params: task_params.iter().map(|p| ParamSpec::new(p.clone(), ParamType::Array)).collect(),
            steps: vec![],
        });

        let resolved = resolve(&group, &references).unwrap();
        let names: Vec<_> = resolved.params.into_iter().map(|p| p.name).collect();
        let expected: Vec<_> = group_params.into_iter().chain(task_params).collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn bound_params_never_add_entries(names in proptest::collection::vec(name_strategy(), 1..5)) {
        let names: Vec<_> = names.iter().enumerate().map(|(i, n)| format!("{n}{i}")).collect();
        let uses = names
            .iter()
            .fold(Uses::task("x"), |uses, n| uses.bind(n.clone(), "target"));
        let group = TaskGroupSpec {
            params: vec![ParamSpec::new("target", ParamType::String)],
            steps: vec![GroupStep::uses("x", uses)],
        };
        let mut references = ResolvedReferences::new();
        references.insert(0, TaskSpec {
            params: names.iter().map(|n| ParamSpec::new(n.clone(), ParamType::Object)).collect(),
            steps: vec![],
        });

        let resolved = resolve(&group, &references).unwrap();
        prop_assert_eq!(resolved.params, group.params);
    }
}
