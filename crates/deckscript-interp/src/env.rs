//! Variable environment
//!
//! Persistent (structurally shared) maps make every snapshot cheap, so each
//! [`CallRecord`](crate::CallRecord) carries the exact bindings that were
//! visible when the call was reached.
//!
//! Loop bodies run in a [`child`](Environment::child) scope. Names declared
//! inside the body stay there; assignments to names that already existed in
//! the parent are folded back with [`merge_from`](Environment::merge_from)
//! after each iteration.

use crate::value::Value;
use im::{HashMap, HashSet};

/// Identifier → value bindings
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, Value>,
    locals: HashSet<String>,
}

impl Environment {
    /// Create an empty environment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment pre-seeded with global bindings
    #[must_use]
    pub fn with_globals<I, K>(globals: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            vars: globals.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            locals: HashSet::new(),
        }
    }

    /// Look up a binding
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Whether a binding exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Introduce a binding owned by this scope (`let`/`const`/`var`)
    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.locals.insert(name.clone());
        self.vars.insert(name, value);
    }

    /// Assign to a binding, creating it if missing
    pub fn assign(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Mutable access to an existing binding
    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.vars.get_mut(name)
    }

    /// Open a child scope for one loop iteration
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            vars: self.vars.clone(),
            locals: HashSet::new(),
        }
    }

    /// Fold a finished child scope back into this one.
    ///
    /// Only names that exist here and were not re-declared in the child are
    /// copied; everything the child introduced is dropped.
    pub fn merge_from(&mut self, child: &Environment) {
        for (name, value) in &child.vars {
            if child.locals.contains(name) {
                continue;
            }
            if let Some(current) = self.vars.get(name) {
                if current != value {
                    self.vars.insert(name.clone(), value.clone());
                }
            }
        }
    }

    /// Number of bindings
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether there are no bindings
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate bindings (unordered)
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_assignments_merge_back() {
        let mut parent = Environment::new();
        parent.declare("offset", Value::Number(0.0));

        let mut child = parent.child();
        child.assign("offset", Value::Number(1.5));
        parent.merge_from(&child);

        assert_eq!(parent.get("offset"), Some(&Value::Number(1.5)));
    }

    #[test]
    fn child_declarations_do_not_leak() {
        let mut parent = Environment::new();
        parent.declare("x", Value::Number(1.0));

        let mut child = parent.child();
        child.declare("tmp", Value::from("local"));
        child.declare("x", Value::Number(99.0));
        parent.merge_from(&child);

        assert!(!parent.contains("tmp"));
        assert_eq!(parent.get("x"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn snapshots_are_independent() {
        let mut env = Environment::with_globals([("a", Value::Number(1.0))]);
        let snapshot = env.clone();
        env.assign("a", Value::Number(2.0));

        assert_eq!(snapshot.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(env.get("a"), Some(&Value::Number(2.0)));
    }
}
