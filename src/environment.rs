//! Scope records for the evaluator.
//!
//! Scopes are shared through [`EnvRef`] handles. A block or call scope lives
//! as long as the evaluator is inside it or some closure still holds it, and
//! is freed when the last handle drops. A function stored in the very scope
//! it closes over forms a cycle and stays alive for the session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to one scope.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// A scope with no parent (the globals).
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// An empty scope whose parent is `enclosing`.
    pub fn with_enclosing(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(Rc::clone(enclosing)),
        }))
    }

    /// Bind `name` in this scope, replacing any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Read a binding of this scope itself (no parent walk).
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Overwrite an existing binding of this scope. Returns `false` when the
    /// name is not bound here.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }
}

/// The scope exactly `distance` parent hops above `env`.
pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
    let mut current = Rc::clone(env);

    for _ in 0..distance {
        let next = current.borrow().enclosing()?;
        current = next;
    }

    Some(current)
}

pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
    ancestor(env, distance)?.borrow().get(name)
}

pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
    let Some(target) = ancestor(env, distance) else {
        return false;
    };
    let assigned = target.borrow_mut().assign(name, value);
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_reads_innermost_and_assign_hits_only_target() {
        let globals = Environment::new();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(&globals);
        inner.borrow_mut().define("a", Value::Number(2.0));

        assert_eq!(get_at(&inner, 0, "a"), Some(Value::Number(2.0)));
        assert_eq!(get_at(&inner, 1, "a"), Some(Value::Number(1.0)));

        assert!(assign_at(&inner, 0, "a", Value::Number(3.0)));
        assert_eq!(globals.borrow().get("a"), Some(Value::Number(1.0)));
        assert!(!inner.borrow_mut().assign("missing", Value::Nil));
    }

    #[test]
    fn distance_past_the_outermost_scope_finds_nothing() {
        let globals = Environment::new();
        globals.borrow_mut().define("x", Value::Bool(true));

        assert!(ancestor(&globals, 1).is_none());
        assert_eq!(get_at(&globals, 2, "x"), None);
        assert!(!assign_at(&globals, 1, "x", Value::Nil));
    }

    #[test]
    fn dropping_a_child_releases_its_hold_on_the_parent() {
        let globals = Environment::new();
        let child = Environment::with_enclosing(&globals);
        assert_eq!(Rc::strong_count(&globals), 2);

        drop(child);
        assert_eq!(Rc::strong_count(&globals), 1);
    }
}
