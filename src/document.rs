//! TaskGroup and Task manifests
//!
//! Documents follow the usual apiVersion/kind/metadata/spec layout and may
//! share one YAML stream separated by `---`.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::catalog::{gather_references, TaskLookup};
use crate::error::TaskGroupError;
use crate::resolve::resolve;
use crate::spec::{TaskGroupSpec, TaskSpec};

pub const TASK_GROUP_API_VERSION: &str = "taskgroup.dev/v1alpha1";
pub const TASK_API_VERSION: &str = "tekton.dev/v1beta1";

pub const TASK_GROUP_KIND: &str = "TaskGroup";
pub const TASK_KIND: &str = "Task";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGroup {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: TaskGroupSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: TaskSpec,
}

impl Task {
    pub fn new(name: impl Into<String>, spec: TaskSpec) -> Self {
        Self {
            api_version: TASK_API_VERSION.to_string(),
            kind: TASK_KIND.to_string(),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: None,
            },
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

impl TaskGroup {
    pub fn new(name: impl Into<String>, spec: TaskGroupSpec) -> Self {
        Self {
            api_version: TASK_GROUP_API_VERSION.to_string(),
            kind: TASK_GROUP_KIND.to_string(),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: None,
            },
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Look up every referenced task, resolve, and wrap the result as a Task
    ///
    /// The resolved Task keeps the group's name and namespace.
    pub fn resolve_with<L: TaskLookup + ?Sized>(&self, lookup: &L) -> Result<Task, TaskGroupError> {
        let references = gather_references(&self.spec, lookup)?;
        let spec = resolve(&self.spec, &references)?;
        let mut task = Task::new(self.name(), spec);
        task.metadata.namespace = self.metadata.namespace.clone();
        Ok(task)
    }
}

/// One document from a manifest stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    TaskGroup(TaskGroup),
    Task(Task),
}

impl Document {
    /// Parse a single document, dispatching on `kind`
    pub fn from_value(value: Value) -> Result<Self, TaskGroupError> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match kind.as_str() {
            TASK_GROUP_KIND => Ok(Document::TaskGroup(serde_yaml::from_value(value)?)),
            TASK_KIND => Ok(Document::Task(serde_yaml::from_value(value)?)),
            _ => Err(TaskGroupError::InvalidKind { kind }),
        }
    }

    /// Parse every document in a `---` separated stream; empty documents are skipped
    pub fn parse_all(yaml: &str) -> Result<Vec<Self>, TaskGroupError> {
        let mut documents = Vec::new();
        for de in serde_yaml::Deserializer::from_str(yaml) {
            let value = Value::deserialize(de)?;
            if value.is_null() {
                continue;
            }
            documents.push(Self::from_value(value)?);
        }
        Ok(documents)
    }
}

/// Contents of one input file: a task group plus any tasks defined alongside
#[derive(Debug, Clone)]
pub struct Manifests {
    pub group: TaskGroup,
    pub tasks: Vec<Task>,
}

impl Manifests {
    /// Split a manifest stream; exactly one TaskGroup is used
    pub fn from_yaml(yaml: &str, source_name: &str) -> Result<Self, TaskGroupError> {
        let mut group = None;
        let mut tasks = Vec::new();

        for document in Document::parse_all(yaml)? {
            match document {
                Document::TaskGroup(g) if group.is_none() => group = Some(g),
                Document::TaskGroup(g) => {
                    warn!(name = %g.name(), source = source_name, "ignoring extra TaskGroup");
                }
                Document::Task(t) => {
                    debug!(name = %t.name(), source = source_name, "inline task");
                    tasks.push(t);
                }
            }
        }

        let group = group.ok_or_else(|| TaskGroupError::MissingGroup {
            source_name: source_name.to_string(),
        })?;
        Ok(Self { group, tasks })
    }
}
