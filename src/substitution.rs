//! Param reference rewriting for spliced steps
//!
//! A referenced task talks about its params by its own names. Once spliced
//! into a group, every bound param must be addressed by the group-side name
//! instead. Supported token forms:
//!
//! - `$(params.name)`
//! - `$(params["name"])` / `$(params['name'])`
//! - any of the above followed by an object key (`.key`) or an index (`[*]`, `[0]`)
//!
//! Rewriting is a single regex pass, so chained bindings (`a -> b`, `b -> c`)
//! never cascade.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashMap;

use crate::step::{Extra, ParamBinding, Step};

/// Pattern for `$(params.NAME)`, `$(params["NAME"])` and `$(params['NAME'])` references
static PARAM_REF_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\$\(params(?:\.(?P<dot>[\w-]+)|\["(?P<dq>[^"\]]+)"\]|\['(?P<sq>[^'\]]+)'\])(?P<rest>(?:\.[\w-]+)?(?:\[(?:\*|\d+)\])?)\)"#,
    )
    .unwrap()
});

/// Binding table for one `uses:` step (referenced name -> group name)
#[derive(Debug, Default)]
pub struct Bindings<'a> {
    table: HashMap<&'a str, &'a str>,
}

impl<'a> Bindings<'a> {
    /// Build the table; a later binding for the same name wins
    pub fn new(bindings: &'a [ParamBinding]) -> Self {
        Self {
            table: bindings
                .iter()
                .map(|b| (b.name.as_str(), b.param.as_str()))
                .collect(),
        }
    }

    /// Group-side name a referenced param is bound to
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.table.get(name).copied()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rewrite bound param references in `text`; unbound ones stay verbatim
    pub fn rewrite<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.is_empty() {
            return Cow::Borrowed(text);
        }

        PARAM_REF_PATTERN.replace_all(text, |caps: &Captures<'_>| {
            let rest = caps.name("rest").map_or("", |m| m.as_str());

            let (name, open, close) = match (caps.name("dot"), caps.name("dq"), caps.name("sq")) {
                (Some(m), _, _) => (m.as_str(), ".", ""),
                (_, Some(m), _) => (m.as_str(), "[\"", "\"]"),
                (_, _, Some(m)) => (m.as_str(), "['", "']"),
                _ => return caps[0].to_string(),
            };

            match self.get(name) {
                Some(bound) => format!("$(params{}{}{}{})", open, bound, close, rest),
                None => caps[0].to_string(),
            }
        })
    }

    /// Copy of `step` with every attribute except its name rewritten
    pub fn rewrite_step(&self, step: &Step) -> Step {
        let mut out = step.clone();
        if self.is_empty() {
            return out;
        }

        out.image = self.rewrite(&step.image).into_owned();
        out.command = step.command.iter().map(|c| self.rewrite(c).into_owned()).collect();
        out.args = step.args.iter().map(|a| self.rewrite(a).into_owned()).collect();
        out.working_dir = self.rewrite(&step.working_dir).into_owned();
        for env in &mut out.env {
            env.value = self.rewrite(&env.value).into_owned();
            self.rewrite_extra(&mut env.extra);
        }
        out.script = self.rewrite(&step.script).into_owned();
        self.rewrite_extra(&mut out.extra);
        out
    }

    /// Rewrite string scalars nested anywhere in unmodelled attributes; keys are left alone
    fn rewrite_extra(&self, extra: &mut Extra) {
        for value in extra.values_mut() {
            self.rewrite_value(value);
        }
    }

    fn rewrite_value(&self, value: &mut serde_yaml::Value) {
        match value {
            serde_yaml::Value::String(text) => {
                if let Cow::Owned(rewritten) = self.rewrite(text) {
                    *text = rewritten;
                }
            }
            serde_yaml::Value::Sequence(items) => {
                for item in items {
                    self.rewrite_value(item);
                }
            }
            serde_yaml::Value::Mapping(map) => {
                for item in map.values_mut() {
                    self.rewrite_value(item);
                }
            }
            serde_yaml::Value::Tagged(tagged) => self.rewrite_value(&mut tagged.value),
            _ => {}
        }
    }
}

/// Names of every param referenced in `text`, in order of appearance
pub fn param_references(text: &str) -> Vec<&str> {
    PARAM_REF_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            caps.name("dot")
                .or_else(|| caps.name("dq"))
                .or_else(|| caps.name("sq"))
        })
        .map(|m| m.as_str())
        .collect()
}

/// Param names referenced anywhere in a step except its name
pub fn step_param_references(step: &Step) -> Vec<&str> {
    let mut names = Vec::new();
    let texts = std::iter::once(&step.image)
        .chain(&step.command)
        .chain(&step.args)
        .chain(std::iter::once(&step.working_dir))
        .chain(step.env.iter().map(|env| &env.value))
        .chain(std::iter::once(&step.script));
    for text in texts {
        names.extend(param_references(text));
    }
    for env in &step.env {
        collect_extra(&env.extra, &mut names);
    }
    collect_extra(&step.extra, &mut names);
    names
}

fn collect_extra<'s>(extra: &'s Extra, names: &mut Vec<&'s str>) {
    for value in extra.values() {
        collect_value(value, names);
    }
}

fn collect_value<'s>(value: &'s serde_yaml::Value, names: &mut Vec<&'s str>) {
    match value {
        serde_yaml::Value::String(text) => names.extend(param_references(text)),
        serde_yaml::Value::Sequence(items) => items.iter().for_each(|v| collect_value(v, names)),
        serde_yaml::Value::Mapping(map) => map.values().for_each(|v| collect_value(v, names)),
        serde_yaml::Value::Tagged(tagged) => collect_value(&tagged.value, names),
        _ => {}
    }
}
