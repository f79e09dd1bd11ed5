//! Task catalog
//!
//! Local lookup of referenced tasks by name. [`gather_references`] turns a
//! task group's `uses:` steps into the position-indexed map the resolver
//! expects. Tasks can come from inline documents or from `*.yaml` / `*.yml`
//! files in a directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::{Document, Task};
use crate::error::TaskGroupError;
use crate::spec::{ResolvedReferences, TaskGroupSpec, TaskSpec};

/// Source of referenced task specifications
pub trait TaskLookup {
    fn lookup(&self, name: &str) -> Option<&TaskSpec>;
}

impl TaskLookup for HashMap<String, TaskSpec> {
    fn lookup(&self, name: &str) -> Option<&TaskSpec> {
        self.get(name)
    }
}

/// Build the resolver's reference map from a lookup
///
/// Every `uses:` step must name a known task. Nested references are not
/// followed: catalog tasks are already flat.
pub fn gather_references<L: TaskLookup + ?Sized>(
    group: &TaskGroupSpec,
    lookup: &L,
) -> Result<ResolvedReferences, TaskGroupError> {
    group
        .references()
        .map(|(index, uses)| {
            let name = &uses.task_ref.name;
            lookup
                .lookup(name)
                .map(|spec| (index, spec.clone()))
                .ok_or_else(|| TaskGroupError::TaskNotFound {
                    index,
                    name: name.clone(),
                })
        })
        .collect()
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    spec: TaskSpec,
    origin: PathBuf,
}

/// In-memory task catalog keyed by `metadata.name`
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tasks: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of inline tasks (no file origin)
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self, TaskGroupError> {
        let mut catalog = Self::new();
        for task in tasks {
            catalog.add(task, Path::new("<inline>"))?;
        }
        Ok(catalog)
    }

    /// Insert or replace a task spec
    pub fn insert(&mut self, name: impl Into<String>, spec: TaskSpec) -> Option<TaskSpec> {
        self.tasks
            .insert(
                name.into(),
                CatalogEntry {
                    spec,
                    origin: PathBuf::new(),
                },
            )
            .map(|entry| entry.spec)
    }

    /// Add a task; a name seen before is an error
    pub fn add(&mut self, task: Task, origin: &Path) -> Result<(), TaskGroupError> {
        if let Some(existing) = self.tasks.get(task.name()) {
            return Err(TaskGroupError::DuplicateTask {
                name: task.metadata.name,
                origin: existing.origin.clone(),
            });
        }
        debug!(name = %task.name(), origin = %origin.display(), "catalog task");
        self.tasks.insert(
            task.metadata.name,
            CatalogEntry {
                spec: task.spec,
                origin: origin.to_path_buf(),
            },
        );
        Ok(())
    }

    /// Add every task found in `dir`
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, TaskGroupError> {
        let found = CatalogLoader::new(dir).scan()?;
        let count = found.len();
        for (path, task) in found {
            self.add(task, &path)?;
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl TaskLookup for Catalog {
    fn lookup(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.get(name).map(|entry| &entry.spec)
    }
}

/// Reads Task manifests from the YAML files of one directory
pub struct CatalogLoader {
    base_path: PathBuf,
}

impl CatalogLoader {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Scan `*.yaml` and `*.yml` files (non-recursive), in path order
    ///
    /// Documents of any kind other than Task are skipped.
    pub fn scan(&self) -> Result<Vec<(PathBuf, Task)>, TaskGroupError> {
        if !self.base_path.is_dir() {
            return Err(TaskGroupError::CatalogScan(format!(
                "{} is not a directory",
                self.base_path.display()
            )));
        }

        let mut paths = Vec::new();
        for ext in ["yaml", "yml"] {
            let pattern = self
                .base_path
                .join(format!("*.{}", ext))
                .to_string_lossy()
                .to_string();
            let entries =
                glob::glob(&pattern).map_err(|e| TaskGroupError::CatalogScan(e.to_string()))?;
            for entry in entries {
                paths.push(entry.map_err(|e| TaskGroupError::CatalogScan(e.to_string()))?);
            }
        }
        paths.sort();

        let mut tasks = Vec::new();
        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            for document in Document::parse_all(&content)? {
                match document {
                    Document::Task(task) => tasks.push((path.clone(), task)),
                    Document::TaskGroup(group) => {
                        debug!(name = %group.name(), path = %path.display(), "skipping TaskGroup");
                    }
                }
            }
        }

        Ok(tasks)
    }
}
