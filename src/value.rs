//! Runtime values.
//!
//! Scalars are stored inline. Everything with identity (functions, classes,
//! instances and lists) sits behind an `Rc` so copies of a [`Value`] alias the
//! same object.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast;
use crate::environment::{Environment, Env};

/// Host implementation of a built‑in. For bound methods the receiver is
/// passed as the first argument.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
    Function(Rc<Function>),
    NativeFunction(Rc<NativeFunction>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    List(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn list(elements: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    /// The name used for this value's type in messages and by `type()`.
    pub fn type_name(&self) -> String {
        match self {
            Value::Number(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Nil => "nil".to_string(),
            Value::Function(_) | Value::NativeFunction(_) => "function".to_string(),
            Value::Class(class) => format!("{} class", class.name),
            Value::Instance(instance) => instance.class.name.clone(),
            Value::List(_) => "list".to_string(),
        }
    }

    /// Like `Display`, but strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("{:?}", s),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    /// Never fails: values of different types are simply unequal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            _ => false,
        }
    }
}

/// Integers print without a fractional part.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buffer = itoa::Buffer::new();
        f.write_str(buffer.format(n as i64))
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write_number(f, *n),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),

            Value::Function(function) => write!(f, "{}", function),

            Value::NativeFunction(native) => write!(f, "{}", native),

            Value::Class(class) => write!(f, "[class {}]", class.name),

            Value::Instance(instance) => write!(f, "[{} object]", instance.class.name),

            Value::List(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callables
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Method,
    Initializer,
}

/// A closure: a function body plus the scope it was created in.
pub struct Function {
    pub name: String,
    pub declaration: Rc<ast::Function>,
    pub closure: Env,
    pub kind: FunctionKind,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        declaration: Rc<ast::Function>,
        closure: Env,
        kind: FunctionKind,
    ) -> Self {
        Self {
            name: name.into(),
            declaration,
            closure,
            kind,
        }
    }

    pub fn params(&self) -> Vec<&str> {
        self.declaration
            .params
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }

    /// A copy whose closure has `this` bound to `receiver`.
    pub fn bind(&self, receiver: Value) -> Rc<Function> {
        let mut scope: Environment = Environment::with_enclosing(self.closure.clone());
        scope.define("this", receiver);

        Rc::new(Function {
            name: self.name.clone(),
            declaration: self.declaration.clone(),
            closure: scope.shared(),
            kind: self.kind,
        })
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FunctionKind::Function => write!(f, "[function {}]", self.name),
            FunctionKind::Method | FunctionKind::Initializer => {
                write!(f, "[bound method {}]", self.name)
            }
        }
    }
}

/// A function implemented by the host.
pub struct NativeFunction {
    pub name: String,
    pub params: &'static [&'static str],
    pub func: NativeFn,
    pub receiver: Option<Value>,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>, params: &'static [&'static str], func: NativeFn) -> Self {
        Self {
            name: name.into(),
            params,
            func,
            receiver: None,
        }
    }

    pub fn bind(&self, receiver: Value) -> Rc<NativeFunction> {
        Rc::new(NativeFunction {
            name: self.name.clone(),
            params: self.params,
            func: self.func,
            receiver: Some(receiver),
        })
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value, String> {
        match &self.receiver {
            Some(receiver) => {
                let mut full: Vec<Value> = Vec::with_capacity(args.len() + 1);
                full.push(receiver.clone());
                full.extend(args);
                (self.func)(&full)
            }
            None => (self.func)(&args),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.receiver.is_some() {
            write!(f, "[built-in method {}]", self.name)
        } else {
            write!(f, "[built-in function {}]", self.name)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────────

/// A property backed by methods. Every setter has a matching getter.
#[derive(Debug, Clone)]
pub struct Accessors {
    pub getter: Rc<Function>,
    pub setter: Option<Rc<Function>>,
}

/// One method table: plain methods and property accessors.
#[derive(Debug, Default)]
pub struct MethodTable {
    pub methods: HashMap<String, Rc<Function>>,
    pub accessors: HashMap<String, Accessors>,
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: MethodTable,
    pub statics: MethodTable,

    /// Static fields, e.g. `Foo.count = 0`.
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Class {
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        self.lookup(|class| class.methods.methods.get(name).cloned())
    }

    pub fn find_accessors(&self, name: &str) -> Option<Accessors> {
        self.lookup(|class| class.methods.accessors.get(name).cloned())
    }

    pub fn find_static_method(&self, name: &str) -> Option<Rc<Function>> {
        self.lookup(|class| class.statics.methods.get(name).cloned())
    }

    pub fn find_static_accessors(&self, name: &str) -> Option<Accessors> {
        self.lookup(|class| class.statics.accessors.get(name).cloned())
    }

    /// Walk the superclass chain, returning the first hit.
    fn lookup<T>(&self, find: impl Fn(&Class) -> Option<T>) -> Option<T> {
        let mut class: &Class = self;

        loop {
            if let Some(found) = find(class) {
                return Some(found);
            }
            class = class.superclass.as_deref()?;
        }
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }
}
