use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::value::Value;

/// Shared handle to a scope. Closures and call frames keep scopes alive.
pub type Env = Rc<RefCell<Environment>>;

/// One lexical scope. A slot holding `None` has been declared but not yet
/// defined.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Option<Value>>,
    enclosing: Option<Env>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Env) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap in the shared handle used everywhere at runtime.
    pub fn shared(self) -> Env {
        Rc::new(RefCell::new(self))
    }

    /// Same parent, same slots. Used to give every loop iteration its own
    /// copy of the loop variables.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn enclosing(&self) -> Option<Env> {
        self.enclosing.clone()
    }

    /// Declare `name` without a value. `_` is never stored.
    pub fn declare(&mut self, name: &str) {
        if name == "_" {
            return;
        }
        self.values.insert(name.to_string(), None);
    }

    pub fn define(&mut self, name: &str, value: Value) {
        if name == "_" {
            return;
        }
        self.values.insert(name.to_string(), Some(value));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Value, String> {
        match self.values.get(name) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(format!("'{}' has not been defined", name)),
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name),
                None => Err(format!("'{}' has not been declared", name)),
            },
        }
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), String> {
        if name == "_" {
            return Ok(());
        }

        if let Some(slot) = self.values.get_mut(name) {
            *slot = Some(value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(format!("'{}' has not been declared", name))
        }
    }

    /// Read `name` from the scope exactly `distance` hops up from `env`.
    pub fn get_at(env: &Env, distance: usize, name: &str) -> Result<Value, String> {
        let scope: Env = Self::ancestor(env, distance)?;
        let scope = scope.borrow();

        match scope.values.get(name) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(format!("'{}' has not been defined", name)),
            None => Err(format!("'{}' has not been declared", name)),
        }
    }

    pub fn assign_at(env: &Env, distance: usize, name: &str, value: Value) -> Result<(), String> {
        let scope: Env = Self::ancestor(env, distance)?;
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(format!("'{}' has not been declared", name)),
        }
    }

    fn ancestor(env: &Env, distance: usize) -> Result<Env, String> {
        let mut scope: Env = env.clone();

        for _ in 0..distance {
            let parent: Option<Env> = scope.borrow().enclosing.clone();
            scope = parent.ok_or_else(|| {
                debug!("Scope chain shorter than distance {}", distance);
                format!("scope {} levels up does not exist", distance)
            })?;
        }

        Ok(scope)
    }
}
