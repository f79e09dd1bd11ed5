//! Error types with fix suggestions

use std::path::PathBuf;
use thiserror::Error;

use crate::param::ParamType;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Resolution failures. Both indicate malformed input and are not retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("TG-010: Step {index} uses task '{task_ref}' but no resolved specification was supplied")]
    MissingReference { index: usize, task_ref: String },

    #[error("TG-011: Param '{name}' is declared as {existing} but task '{task_ref}' declares it as {incoming}")]
    ParamTypeConflict {
        name: String,
        existing: ParamType,
        incoming: ParamType,
        task_ref: String,
    },
}

impl FixSuggestion for ResolveError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ResolveError::MissingReference { .. } => {
                Some("Resolve every uses: step before calling the resolver (check the task name)")
            }
            ResolveError::ParamTypeConflict { .. } => {
                Some("Rename one of the params or add a paramBindings entry mapping it to a group param")
            }
        }
    }
}

/// Errors from loading, gathering and rendering around the resolver
#[derive(Error, Debug)]
pub enum TaskGroupError {
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    // ─────────────────────────────────────────────────────────────
    // Manifest errors (TG-001 to TG-002)
    // ─────────────────────────────────────────────────────────────

    #[error("TG-001: Unsupported kind '{kind}' (expected TaskGroup or Task)")]
    InvalidKind { kind: String },

    #[error("TG-002: No TaskGroup document found in {source_name}")]
    MissingGroup { source_name: String },

    // ─────────────────────────────────────────────────────────────
    // Catalog errors (TG-020 to TG-022)
    // ─────────────────────────────────────────────────────────────

    #[error("TG-020: Step {index} uses task '{name}' which is not in the catalog")]
    TaskNotFound { index: usize, name: String },

    #[error("TG-021: Task '{name}' is defined more than once ({})", .origin.display())]
    DuplicateTask { name: String, origin: PathBuf },

    #[error("TG-022: Cannot scan task directory: {0}")]
    CatalogScan(String),

    // ─────────────────────────────────────────────────────────────
    // Validation (TG-030)
    // ─────────────────────────────────────────────────────────────

    #[error("TG-030: Task group is invalid ({errors} error(s))")]
    Invalid { errors: usize },
}

impl FixSuggestion for TaskGroupError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            TaskGroupError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            TaskGroupError::Json(_) => None,
            TaskGroupError::Io(_) => Some("Check file path and permissions"),
            TaskGroupError::Resolve(e) => e.fix_suggestion(),
            TaskGroupError::InvalidKind { .. } => Some("Use kind: TaskGroup or kind: Task"),
            TaskGroupError::MissingGroup { .. } => {
                Some("Add a document with kind: TaskGroup to the input file")
            }
            TaskGroupError::TaskNotFound { .. } => {
                Some("Define the task in the input file or pass its directory with --tasks")
            }
            TaskGroupError::DuplicateTask { .. } => Some("Give every Task a unique metadata.name"),
            TaskGroupError::CatalogScan(_) => Some("Check the --tasks directory path"),
            TaskGroupError::Invalid { .. } => Some("Run `taskgroup validate` to list the problems"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_reference_message() {
        let err = ResolveError::MissingReference {
            index: 1,
            task_ref: "foo".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("TG-010"));
        assert!(msg.contains("Step 1"));
        assert!(msg.contains("'foo'"));
    }

    #[test]
    fn conflict_message_names_both_types() {
        let err = ResolveError::ParamTypeConflict {
            name: "paramFoo".to_string(),
            existing: ParamType::String,
            incoming: ParamType::Array,
            task_ref: "foo".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("TG-011"));
        assert!(msg.contains("string"));
        assert!(msg.contains("array"));
    }

    #[test]
    fn resolve_errors_pass_through_transparently() {
        let inner = ResolveError::MissingReference {
            index: 0,
            task_ref: "x".to_string(),
        };
        let err = TaskGroupError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err.fix_suggestion(), inner.fix_suggestion());
    }

    #[test]
    fn every_manifest_error_has_suggestion() {
        let errors = [
            TaskGroupError::InvalidKind {
                kind: "Pipeline".to_string(),
            },
            TaskGroupError::MissingGroup {
                source_name: "group.yaml".to_string(),
            },
            TaskGroupError::TaskNotFound {
                index: 0,
                name: "foo".to_string(),
            },
        ];
        for err in &errors {
            assert!(err.fix_suggestion().is_some(), "no suggestion for {err}");
        }
    }
}
