//! TaskGroup - flatten composite tasks into a single task specification
//!
//! A task group lists steps; some run inline, others `use:` a separate task.
//! [`resolve`] splices every referenced task in place, merges params and
//! rewrites bound param references:
//!
//! ```
//! use taskgroup::{resolve, GroupStep, ResolvedReferences, Step, TaskGroupSpec, TaskSpec, Uses};
//!
//! let group = TaskGroupSpec {
//!     params: vec![],
//!     steps: vec![
//!         Step::script("bash:latest", "echo foo").into(),
//!         GroupStep::uses("foo", Uses::task("foo")),
//!     ],
//! };
//! let mut references = ResolvedReferences::new();
//! references.insert(1, TaskSpec {
//!     params: vec![],
//!     steps: vec![Step::script("bash:latest", "echo bar").named("baz")],
//! });
//!
//! let flat = resolve(&group, &references).unwrap();
//! assert_eq!(flat.steps[1].name, "foo-baz");
//! ```

pub mod catalog;
pub mod document;
pub mod error;
pub mod output;
pub mod param;
pub mod resolve;
pub mod spec;
pub mod step;
pub mod substitution;
pub mod validator;

pub use catalog::{gather_references, Catalog, CatalogLoader, TaskLookup};
pub use document::{Document, Manifests, Task, TaskGroup};
pub use error::{FixSuggestion, ResolveError, TaskGroupError};
pub use output::OutputFormat;
pub use param::{ParamSpec, ParamType, ParamValue};
pub use resolve::resolve;
pub use spec::{ResolvedReferences, TaskGroupSpec, TaskSpec};
pub use step::{EnvVar, GroupStep, ParamBinding, Step, TaskRef, Uses};
pub use validator::{Diagnostic, Severity, ValidationReport, Validator};
