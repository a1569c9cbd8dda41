use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::lang::value::Value;

struct Scope {
    map: HashMap<String, Value>,
    consts: HashSet<String>,
    parent: Option<Env>,
}

/// What a chain store did, decided by the VM's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreResult {
    /// Written in place to the first scope that declares the name.
    Stored,
    /// The name is const-protected somewhere along the chain.
    ConstViolation,
    /// No scope declares the name; nothing was written.
    Unbound,
}

/// A lexical scope chain node. Cheap to clone: clones alias the same scope,
/// which is how closures keep their defining environment alive after the
/// block that created it has been popped.
#[derive(Clone)]
pub struct Env(Rc<RefCell<Scope>>);

impl Env {
    pub fn root() -> Env {
        Env(Rc::new(RefCell::new(Scope {
            map: HashMap::new(),
            consts: HashSet::new(),
            parent: None,
        })))
    }

    pub fn child(&self) -> Env {
        Env(Rc::new(RefCell::new(Scope {
            map: HashMap::new(),
            consts: HashSet::new(),
            parent: Some(self.clone()),
        })))
    }

    pub fn parent(&self) -> Option<Env> {
        self.0.borrow().parent.clone()
    }

    /// Declare `name` in this scope. Fails if this scope already declares it;
    /// shadowing an outer declaration is fine.
    pub fn declare(&self, name: &str, value: Value, is_const: bool) -> Result<(), ()> {
        let mut scope = self.0.borrow_mut();
        if scope.map.contains_key(name) {
            return Err(());
        }
        scope.map.insert(name.to_string(), value);
        if is_const {
            scope.consts.insert(name.to_string());
        }
        Ok(())
    }

    /// Bind `name` in this scope unconditionally (argument binding and the
    /// implicit-declaration store fallback).
    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().map.insert(name.to_string(), value);
    }

    /// Innermost-to-outermost lookup.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut env = self.clone();
        loop {
            let next = {
                let scope = env.0.borrow();
                if let Some(v) = scope.map.get(name) {
                    return Some(v.clone());
                }
                scope.parent.clone()
            };
            env = next?;
        }
    }

    /// Write in place to the first scope along the chain that declares
    /// `name`. Does not create bindings; the caller decides what an
    /// `Unbound` result means.
    pub fn store(&self, name: &str, value: Value) -> StoreResult {
        let mut env = self.clone();
        loop {
            let next = {
                let mut scope = env.0.borrow_mut();
                if scope.map.contains_key(name) {
                    if scope.consts.contains(name) {
                        return StoreResult::ConstViolation;
                    }
                    scope.map.insert(name.to_string(), value);
                    return StoreResult::Stored;
                }
                scope.parent.clone()
            };
            match next {
                Some(parent) => env = parent,
                None => return StoreResult::Unbound,
            }
        }
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope = self.0.borrow();
        write!(
            f,
            "Env({} names{})",
            scope.map.len(),
            if scope.parent.is_some() { ", has parent" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_the_chain() {
        let root = Env::root();
        root.declare("x", Value::Int(1), false).unwrap();
        let inner = root.child();
        assert_eq!(inner.lookup("x"), Some(Value::Int(1)));
        assert_eq!(inner.lookup("y"), None);
    }

    #[test]
    fn test_shadowing_is_allowed_redeclaration_is_not() {
        let root = Env::root();
        root.declare("x", Value::Int(1), false).unwrap();
        assert!(root.declare("x", Value::Int(2), false).is_err());
        let inner = root.child();
        assert!(inner.declare("x", Value::Int(2), false).is_ok());
        assert_eq!(inner.lookup("x"), Some(Value::Int(2)));
        assert_eq!(root.lookup("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_store_writes_to_declaring_scope() {
        let root = Env::root();
        root.declare("x", Value::Int(1), false).unwrap();
        let inner = root.child();
        assert_eq!(inner.store("x", Value::Int(9)), StoreResult::Stored);
        assert_eq!(root.lookup("x"), Some(Value::Int(9)));
    }

    #[test]
    fn test_store_const_violation_anywhere_in_chain() {
        let root = Env::root();
        root.declare("k", Value::Int(1), true).unwrap();
        let inner = root.child();
        assert_eq!(inner.store("k", Value::Int(2)), StoreResult::ConstViolation);
        assert_eq!(root.lookup("k"), Some(Value::Int(1)));
    }

    #[test]
    fn test_store_unbound_writes_nothing() {
        let root = Env::root();
        let inner = root.child();
        assert_eq!(inner.store("nope", Value::Int(1)), StoreResult::Unbound);
        assert_eq!(inner.lookup("nope"), None);
    }

    #[test]
    fn test_closure_keeps_scope_alive() {
        let captured = {
            let outer = Env::root().child();
            outer.declare("n", Value::Int(7), false).unwrap();
            outer
        };
        // the block scope that created `captured` is gone; the chain is not
        assert_eq!(captured.lookup("n"), Some(Value::Int(7)));
    }
}
