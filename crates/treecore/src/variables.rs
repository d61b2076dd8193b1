use crate::names::VariableName;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Marks a variable reference: `@{name}`.
pub const VAR_START: &str = "@{";
/// Marks a variable reference with environment fallback: `${name}`.
pub const ENV_START: &str = "${";
/// Closes either reference form.
pub const REF_END: &str = "}";

/// Named string substitutions, scoped to a flow instance.
///
/// Expansion is lazy: actors call [`Variables::expand`] (usually via
/// [`Expandable`]) at the moment they execute, so loop bodies observe
/// current values on every iteration. Every mutation bumps a revision
/// counter which invalidates all cached expansions.
#[derive(Debug, Default)]
pub struct Variables {
    values: RwLock<HashMap<VariableName, String>>,
    revision: AtomicU64,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: VariableName, value: impl Into<String>) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(name, value.into());
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self, name: &VariableName) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(name).cloned()
    }

    pub fn has(&self, name: &VariableName) -> bool {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.contains_key(name)
    }

    pub fn remove(&self, name: &VariableName) -> Option<String> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        let removed = values.remove(name);
        if removed.is_some() {
            self.revision.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    pub fn clear(&self) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        if !values.is_empty() {
            values.clear();
            self.revision.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn len(&self) -> usize {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current revision; moves forward on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Substitutes `@{name}` and `${name}` references in `input`.
    ///
    /// `@{name}` resolves only against this store. `${name}` falls back
    /// to the process environment when no variable matches. Unresolved
    /// references are left intact so failures stay visible downstream.
    pub fn expand(&self, input: &str) -> String {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        let lookup_var = |name: &str| {
            VariableName::new(name)
                .ok()
                .and_then(|n| values.get(&n).cloned())
        };
        let step = replace_refs(input, VAR_START, &lookup_var);
        replace_refs(&step, ENV_START, &|name: &str| {
            lookup_var(name).or_else(|| std::env::var(name).ok())
        })
    }
}

fn replace_refs(input: &str, start: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(start) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + start.len()..];
        match after.find(REF_END) {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str(start);
                        out.push_str(name);
                        out.push_str(REF_END);
                    }
                }
                rest = &after[end + REF_END.len()..];
            }
            None => {
                // unterminated reference, keep it literal
                out.push_str(start);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// A string-valued configuration option that may contain variable
/// references. Expansion results are cached against the store revision
/// and re-derived whenever any variable changed.
#[derive(Debug, Clone)]
pub struct Expandable {
    raw: String,
    cached: Option<(u64, String)>,
}

impl Expandable {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            cached: None,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Current expansion of the raw value against `variables`.
    pub fn resolve(&mut self, variables: &Variables) -> String {
        let revision = variables.revision();
        if let Some((cached_revision, cached)) = &self.cached {
            if *cached_revision == revision {
                return cached.clone();
            }
        }
        let expanded = variables.expand(&self.raw);
        self.cached = Some((revision, expanded.clone()));
        expanded
    }
}

impl From<&str> for Expandable {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Expandable {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> VariableName {
        VariableName::new(name).expect("valid name")
    }

    #[test]
    fn expands_variable_references() {
        let vars = Variables::new();
        vars.set(var("who"), "world");
        assert_eq!(vars.expand("hello @{who}!"), "hello world!");
        assert_eq!(vars.expand("hello ${who}!"), "hello world!");
    }

    #[test]
    fn unresolved_references_stay_intact() {
        let vars = Variables::new();
        assert_eq!(vars.expand("@{missing} stays"), "@{missing} stays");
        assert_eq!(vars.expand("broken @{ref"), "broken @{ref");
    }

    #[test]
    fn env_fallback_applies_only_to_dollar_form() {
        let vars = Variables::new();
        std::env::set_var("TREEFLOW_TEST_VAR", "env");
        assert_eq!(vars.expand("${TREEFLOW_TEST_VAR}"), "env");
        assert_eq!(vars.expand("@{TREEFLOW_TEST_VAR}"), "@{TREEFLOW_TEST_VAR}");
        // a flow variable shadows the environment
        vars.set(var("TREEFLOW_TEST_VAR"), "flow");
        assert_eq!(vars.expand("${TREEFLOW_TEST_VAR}"), "flow");
    }

    #[test]
    fn mutation_bumps_revision() {
        let vars = Variables::new();
        let before = vars.revision();
        vars.set(var("a"), "1");
        assert!(vars.revision() > before);
        let mid = vars.revision();
        vars.remove(&var("a"));
        assert!(vars.revision() > mid);
    }

    #[test]
    fn expandable_caches_until_store_changes() {
        let vars = Variables::new();
        vars.set(var("i"), "0");
        let mut opt = Expandable::new("value=@{i}");
        assert_eq!(opt.resolve(&vars), "value=0");
        // cached result is reused while the store is untouched
        assert_eq!(opt.resolve(&vars), "value=0");
        vars.set(var("i"), "1");
        assert_eq!(opt.resolve(&vars), "value=1");
    }
}
