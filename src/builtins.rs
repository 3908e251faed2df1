//! Built‑in functions and the methods available on lists.

use chrono::Utc;
use log::debug;

use crate::value::{NativeFunction, Value};

/// Names pre‑declared in every global scope.
pub const NAMES: [&str; 3] = ["clock", "type", "error"];

/// The built‑in globals, ready to be defined.
pub fn globals() -> Vec<NativeFunction> {
    vec![
        NativeFunction::new("clock", &[], clock),
        NativeFunction::new("type", &["value"], type_of),
        NativeFunction::new("error", &["msg"], error),
    ]
}

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> Result<Value, String> {
    let seconds: f64 = Utc::now().timestamp_micros() as f64 / 1_000_000.0;

    debug!("clock() returned {}", seconds);

    Ok(Value::Number(seconds))
}

fn type_of(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(args[0].type_name()))
}

/// Raise a runtime error carrying `msg`.
fn error(args: &[Value]) -> Result<Value, String> {
    Err(args[0].to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// List methods: the receiver comes first
// ─────────────────────────────────────────────────────────────────────────────

/// Look up a property of a list, binding methods to `list`.
pub fn list_property(list: &Value, name: &str) -> Option<Value> {
    let Value::List(elements) = list else {
        return None;
    };

    match name {
        "length" => Some(Value::Number(elements.borrow().len() as f64)),
        "push" => Some(Value::NativeFunction(
            NativeFunction::new("list.push", &["value"], list_push).bind(list.clone()),
        )),
        "pop" => Some(Value::NativeFunction(
            NativeFunction::new("list.pop", &[], list_pop).bind(list.clone()),
        )),
        _ => None,
    }
}

fn list_push(args: &[Value]) -> Result<Value, String> {
    if let Value::List(elements) = &args[0] {
        elements.borrow_mut().push(args[1].clone());
    }

    Ok(Value::Nil)
}

fn list_pop(args: &[Value]) -> Result<Value, String> {
    let Value::List(elements) = &args[0] else {
        return Ok(Value::Nil);
    };

    elements
        .borrow_mut()
        .pop()
        .ok_or_else(|| "pop from empty 'list'".to_string())
}
