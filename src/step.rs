//! Step definitions
//!
//! A task group step is either inline work or a `uses:` reference to
//! another task. In YAML both share one flat shape:
//!
//! ```yaml
//! steps:
//!   - image: bash:latest
//!     script: echo foo
//!   - name: lint
//!     uses:
//!       taskRef:
//!         name: golangci-lint
//!       paramBindings:
//!         - name: package
//!           param: module
//! ```
//!
//! In Rust the two forms are separate [`GroupStep`] variants.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Unmodelled keys carried through resolution as-is
pub type Extra = BTreeMap<String, serde_yaml::Value>;

/// Environment variable set on a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// `valueFrom` and friends
    #[serde(flatten)]
    pub extra: Extra,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            extra: Extra::new(),
        }
    }
}

/// Execution attributes of a single step
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Step identifier (container name)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_dir: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,

    /// Remaining container attributes (`volumeMounts`, `resources`, `securityContext`, ...)
    #[serde(flatten)]
    pub extra: Extra,
}

impl Step {
    /// Inline step running a script in an image
    pub fn script(image: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            script: script.into(),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Reference to a separately defined task
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskRef {
    pub name: String,
}

/// Rename edge from the referenced task's param space into the group's
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParamBinding {
    /// Param name inside the referenced task
    pub name: String,
    /// Param name inside the enclosing group
    pub param: String,
}

impl ParamBinding {
    pub fn new(name: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param: param.into(),
        }
    }
}

/// `uses:` block of a referencing step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Uses {
    pub task_ref: TaskRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub param_bindings: Vec<ParamBinding>,
}

impl Uses {
    pub fn task(name: impl Into<String>) -> Self {
        Self {
            task_ref: TaskRef { name: name.into() },
            param_bindings: Vec::new(),
        }
    }

    pub fn bind(mut self, name: impl Into<String>, param: impl Into<String>) -> Self {
        self.param_bindings.push(ParamBinding::new(name, param));
        self
    }
}

/// A step of a task group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStep {
    /// Work defined in place, emitted unchanged
    Inline(Step),
    /// Work supplied by another task; `step.name` prefixes every spliced step
    Reference { step: Step, uses: Uses },
}

impl GroupStep {
    /// Referencing step with the given outer name
    pub fn uses(name: impl Into<String>, uses: Uses) -> Self {
        GroupStep::Reference {
            step: Step::default().named(name),
            uses,
        }
    }

    /// Execution attributes, whichever variant
    pub fn step(&self) -> &Step {
        match self {
            GroupStep::Inline(step) | GroupStep::Reference { step, .. } => step,
        }
    }

    pub fn name(&self) -> &str {
        &self.step().name
    }

    pub fn uses_block(&self) -> Option<&Uses> {
        match self {
            GroupStep::Inline(_) => None,
            GroupStep::Reference { uses, .. } => Some(uses),
        }
    }
}

impl From<Step> for GroupStep {
    fn from(step: Step) -> Self {
        GroupStep::Inline(step)
    }
}

/// Group step as written in YAML (flat, optional `uses`)
#[derive(Deserialize)]
struct GroupStepRaw {
    #[serde(flatten)]
    step: Step,
    #[serde(default)]
    uses: Option<Uses>,
}

#[derive(Serialize)]
struct GroupStepRef<'a> {
    #[serde(flatten)]
    step: &'a Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    uses: Option<&'a Uses>,
}

impl<'de> Deserialize<'de> for GroupStep {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = GroupStepRaw::deserialize(deserializer)?;
        Ok(match raw.uses {
            Some(uses) => GroupStep::Reference {
                step: raw.step,
                uses,
            },
            None => GroupStep::Inline(raw.step),
        })
    }
}

impl Serialize for GroupStep {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        GroupStepRef {
            step: self.step(),
            uses: self.uses_block(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_inline_step() {
        let yaml = r#"
image: bash:latest
script: echo foo
"#;
        let step: GroupStep = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(step, GroupStep::Inline(Step::script("bash:latest", "echo foo")));
        assert!(step.uses_block().is_none());
    }

    #[test]
    fn parse_reference_step() {
        let yaml = r#"
name: foo
uses:
  taskRef:
    name: foo-task
  paramBindings:
    - name: paramBar
      param: paramFoo
"#;
        let step: GroupStep = serde_yaml::from_str(yaml).unwrap();
        match step {
            GroupStep::Reference { ref step, ref uses } => {
                assert_eq!(step.name, "foo");
                assert_eq!(uses.task_ref.name, "foo-task");
                assert_eq!(uses.param_bindings, vec![ParamBinding::new("paramBar", "paramFoo")]);
            }
            _ => panic!("Expected Reference"),
        }
        assert_eq!(step.name(), "foo");
    }

    #[test]
    fn param_bindings_default_to_empty() {
        let yaml = r#"
name: foo
uses:
  taskRef:
    name: foo
"#;
        let step: GroupStep = serde_yaml::from_str(yaml).unwrap();
        assert!(step.uses_block().unwrap().param_bindings.is_empty());
    }

    #[test]
    fn parse_full_step_attributes() {
        let yaml = r#"
name: build
image: golang:1.22
command: ["go"]
args: ["build", "./..."]
workingDir: /workspace/src
env:
  - name: CGO_ENABLED
    value: "0"
"#;
        let step: Step = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(step.command, vec!["go"]);
        assert_eq!(step.args, vec!["build", "./..."]);
        assert_eq!(step.working_dir, "/workspace/src");
        assert_eq!(step.env, vec![EnvVar::new("CGO_ENABLED", "0")]);
    }

    #[test]
    fn unmodelled_attributes_pass_through() {
        let yaml = r#"
name: push
image: alpine
imagePullPolicy: Always
volumeMounts:
  - name: cache
    mountPath: /cache
env:
  - name: TOKEN
    valueFrom:
      secretKeyRef:
        name: registry
        key: token
uses:
  taskRef:
    name: push
"#;
        let step: GroupStep = serde_yaml::from_str(yaml).unwrap();
        let inner = step.step();
        assert!(step.uses_block().is_some());
        assert!(!inner.extra.contains_key("uses"));
        assert_eq!(inner.extra["imagePullPolicy"], serde_yaml::Value::from("Always"));
        assert!(inner.extra.contains_key("volumeMounts"));
        assert!(inner.env[0].value.is_empty());
        assert!(inner.env[0].extra.contains_key("valueFrom"));

        let out = serde_yaml::to_string(&step).unwrap();
        assert!(out.contains("mountPath: /cache"));
        assert!(out.contains("secretKeyRef"));
        assert!(!out.contains("value: ''"));
        assert_eq!(serde_yaml::from_str::<GroupStep>(&out).unwrap(), step);
    }

    #[test]
    fn serialize_keeps_flat_shape() {
        let step = GroupStep::uses("lint", Uses::task("golangci").bind("pkg", "module"));
        let yaml = serde_yaml::to_string(&step).unwrap();
        let back: GroupStep = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, step);
        assert!(yaml.contains("taskRef"));
        assert!(!yaml.contains("image"));
    }
}
