//! Tree‑walking evaluator.
//!
//! Statements return a [`Flow`] so `break`, `continue` and `return` travel up
//! the Rust stack as ordinary values; a [`RuntimeError`] is the only thing
//! that unwinds with `?`. Locals are found through the resolver's binding
//! distances, globals by name.

use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{
    Accessor, BinaryOp, ClassDecl, Expr, ExprKind, Ident, LiteralValue, MethodDecl, Program, Stmt,
    StmtKind, UnaryOp,
};
use crate::builtins;
use crate::environment::{Env, Environment};
use crate::error::{RuntimeError, StackFrame};
use crate::resolver::Bindings;
use crate::token::{Position, Range};
use crate::value::{
    Accessors, Class, Function, FunctionKind, Instance, MethodTable, NativeFn, NativeFunction,
    Value,
};

/// Deepest allowed nesting of Lox calls.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Longest string (in bytes) or list a repetition may produce.
pub const MAX_REPEAT_LEN: usize = u32::MAX as usize;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Convenient alias for interpreter results.
pub type RResult<T> = Result<T, RuntimeError>;

/// An active call: who was called and from where.
#[derive(Debug)]
struct Call {
    function: String,
    site: Position,
}

pub struct Interpreter<W: Write = Stdout> {
    globals: Env,
    environment: Env,
    locals: Bindings,
    calls: Vec<Call>,
    output: W,
    repl: bool,
}

impl Interpreter<Stdout> {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Creates a new Interpreter writing to `output` and defines the
    /// built‑in functions.
    pub fn with_output(output: W) -> Self {
        info!("Initializing Interpreter");

        let globals: Env = Environment::new().shared();

        for native in builtins::globals() {
            debug!("Defining native function '{}'", native.name);
            let name: String = native.name.clone();
            globals
                .borrow_mut()
                .define(&name, Value::NativeFunction(Rc::new(native)));
        }

        Self {
            environment: globals.clone(),
            globals,
            locals: Bindings::new(),
            calls: Vec::new(),
            output,
            repl: false,
        }
    }

    /// Print the value of every expression statement.
    pub fn repl(mut self) -> Self {
        self.repl = true;
        self
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Define (or replace) a global host function.
    pub fn define_native(&mut self, name: &str, params: &'static [&'static str], func: NativeFn) {
        debug!("Defining native function '{}'", name);

        let native: NativeFunction = NativeFunction::new(name, params, func);
        self.globals
            .borrow_mut()
            .define(name, Value::NativeFunction(Rc::new(native)));
    }

    /// Run a resolved program. Globals survive between calls; a runtime error
    /// stops the program and leaves the call stack empty.
    pub fn interpret(&mut self, program: &Program, bindings: &Bindings) -> RResult<()> {
        info!("Interpreting {} statements", program.stmts.len());

        self.locals.extend(bindings.iter().map(|(id, d)| (*id, *d)));
        self.environment = self.globals.clone();
        self.calls.clear();

        self.hoist(program);

        for stmt in &program.stmts {
            if let Err(error) = self.execute(stmt) {
                info!("Interpretation aborted: {}", error.message());

                self.environment = self.globals.clone();
                self.calls.clear();
                self.output.flush().ok();

                return Err(error);
            }
        }

        self.output.flush().ok();

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Declare every top‑level name up front so an early reference reports
    /// "not defined" rather than "not declared".
    fn hoist(&mut self, program: &Program) {
        let mut globals = self.globals.borrow_mut();

        for stmt in &program.stmts {
            let name: &str = match &stmt.kind {
                StmtKind::Var { name, .. } | StmtKind::Fun { name, .. } => &name.name,
                StmtKind::Class(decl) => &decl.name.name,
                _ => continue,
            };

            if !globals.contains(name) {
                globals.declare(name);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> RResult<Flow> {
        match &stmt.kind {
            StmtKind::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.name);

                match initializer {
                    Some(expr) => {
                        let value: Value = self.evaluate(expr)?;
                        self.environment.borrow_mut().define(&name.name, value);
                    }
                    None => self.environment.borrow_mut().declare(&name.name),
                }

                Ok(Flow::Normal)
            }

            StmtKind::Fun { name, function } => {
                debug!("Defining function '{}'", name.name);

                let closure: Function = Function::new(
                    name.name.clone(),
                    function.clone(),
                    self.environment.clone(),
                    FunctionKind::Function,
                );
                self.environment
                    .borrow_mut()
                    .define(&name.name, Value::Function(Rc::new(closure)));

                Ok(Flow::Normal)
            }

            StmtKind::Class(decl) => {
                self.execute_class(decl)?;
                Ok(Flow::Normal)
            }

            StmtKind::Expression(expr) => {
                let value: Value = self.evaluate(expr)?;
                if self.repl {
                    self.print(&value, &stmt.range)?;
                }
                Ok(Flow::Normal)
            }

            StmtKind::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                self.print(&value, &stmt.range)?;
                Ok(Flow::Normal)
            }

            StmtKind::Block(stmts) => {
                let scope: Env = Environment::with_enclosing(self.environment.clone()).shared();
                self.execute_block(stmts, scope)
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            StmtKind::While { condition, body } => {
                debug!("Entering while loop");

                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }

                Ok(Flow::Normal)
            }

            StmtKind::For {
                initializer,
                condition,
                update,
                body,
            } => {
                debug!("Entering for loop");

                let scope: Env = Environment::with_enclosing(self.environment.clone()).shared();
                let previous: Env = std::mem::replace(&mut self.environment, scope);

                let result: RResult<Flow> = self.run_for(
                    initializer.as_deref(),
                    condition.as_ref(),
                    update.as_ref(),
                    body,
                );

                self.environment = previous;
                result
            }

            StmtKind::Break => Ok(Flow::Break),

            StmtKind::Continue => Ok(Flow::Continue),

            StmtKind::Return(value) => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            StmtKind::Illegal => Ok(Flow::Normal),
        }
    }

    fn print(&mut self, value: &Value, range: &Range) -> RResult<()> {
        let written: io::Result<()> = writeln!(self.output, "{}", value);
        written.map_err(|e| self.runtime_error(range, format!("failed to write output: {}", e)))
    }

    /// Run `stmts` in `scope`, restoring the current scope afterwards.
    pub fn execute_block(&mut self, stmts: &[Stmt], scope: Env) -> RResult<Flow> {
        let previous: Env = std::mem::replace(&mut self.environment, scope);

        let mut result: RResult<Flow> = Ok(Flow::Normal);
        for stmt in stmts {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    /// Runs with the loop scope already current. Each iteration after the
    /// first gets a fresh copy of the loop scope, so closures created in the
    /// body keep the value of that iteration's variables.
    fn run_for(
        &mut self,
        initializer: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> RResult<Flow> {
        if let Some(init) = initializer {
            self.execute(init)?;
        }

        loop {
            if let Some(cond) = condition {
                if !self.evaluate(cond)?.is_truthy() {
                    break;
                }
            }

            match self.execute(body)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }

            let next: Env = self.environment.borrow().copy().shared();
            self.environment = next;

            if let Some(update) = update {
                self.evaluate(update)?;
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_class(&mut self, decl: &ClassDecl) -> RResult<()> {
        debug!("Defining class '{}'", decl.name.name);

        let superclass: Option<Rc<Class>> = match &decl.superclass {
            Some(ident) => match self.look_up(ident)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(self.runtime_error(
                        &ident.range,
                        format!("superclass must be a class, not '{}'", other.type_name()),
                    ))
                }
            },
            None => None,
        };

        self.environment.borrow_mut().declare(&decl.name.name);

        let mut method_env: Env = self.environment.clone();
        if let Some(superclass) = &superclass {
            let mut scope: Environment = Environment::with_enclosing(method_env);
            scope.define("super", Value::Class(superclass.clone()));
            method_env = scope.shared();
        }

        let class: Class = Class {
            name: decl.name.name.clone(),
            superclass,
            methods: method_table(&decl.name.name, &decl.methods, false, &method_env),
            statics: method_table(&decl.name.name, &decl.methods, true, &method_env),
            fields: Default::default(),
        };

        info!(
            "Class '{}' defined with {} method(s)",
            decl.name.name,
            decl.methods.len()
        );

        self.environment
            .borrow_mut()
            .define(&decl.name.name, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> RResult<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Variable(ident) | ExprKind::This(ident) => self.look_up(ident),

            ExprKind::Assign { target, value } => {
                let value: Value = self.evaluate(value)?;
                self.assign(target, value.clone())?;
                Ok(value)
            }

            ExprKind::Unary { op, right } => {
                let right: Value = self.evaluate(right)?;

                match (op, right) {
                    (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                    (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Negate, value) => Err(self.runtime_error(
                        &expr.range,
                        format!(
                            "'{}' operator cannot be used with type '{}'",
                            op,
                            value.type_name()
                        ),
                    )),
                }
            }

            ExprKind::Binary {
                left,
                op,
                op_range,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                match op {
                    BinaryOp::Or if left.is_truthy() => return Ok(left),
                    BinaryOp::And if !left.is_truthy() => return Ok(left),
                    BinaryOp::Or | BinaryOp::And => return self.evaluate(right),
                    _ => {}
                }

                let right: Value = self.evaluate(right)?;

                match op {
                    BinaryOp::Comma => Ok(right),
                    BinaryOp::Equal => Ok(Value::Bool(left == right)),
                    BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
                    _ => binary(*op, &left, &right).map_err(|m| self.runtime_error(op_range, m)),
                }
            }

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            ExprKind::Call { callee, arguments } => {
                let callee_value: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee_value, args, expr, callee, arguments)
            }

            ExprKind::Get { object, name } => {
                let object: Value = self.evaluate(object)?;
                self.get_property(object, name)
            }

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;
                let value: Value = self.evaluate(value)?;
                self.set_property(object, name, value.clone())?;
                Ok(value)
            }

            ExprKind::Index { object, index } => {
                let object_value: Value = self.evaluate(object)?;
                let index: Value = self.evaluate(index)?;

                let Value::List(elements) = &object_value else {
                    return Err(self.not_indexable(&object_value, &object.range));
                };

                let len: usize = elements.borrow().len();
                let i: usize = list_index(&index, len).map_err(|m| self.runtime_error(&expr.range, m))?;

                let element: Value = elements.borrow()[i].clone();
                Ok(element)
            }

            ExprKind::IndexSet {
                object,
                index,
                value,
            } => {
                let object_value: Value = self.evaluate(object)?;
                let index: Value = self.evaluate(index)?;
                let value: Value = self.evaluate(value)?;

                let Value::List(elements) = &object_value else {
                    return Err(self.not_indexable(&object_value, &object.range));
                };

                let len: usize = elements.borrow().len();
                let i: usize = list_index(&index, len).map_err(|m| self.runtime_error(&expr.range, m))?;

                elements.borrow_mut()[i] = value.clone();
                Ok(value)
            }

            ExprKind::List(elements) => {
                let mut values: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::list(values))
            }

            ExprKind::Super { keyword, method } => self.evaluate_super(keyword, method),

            ExprKind::Function(function) => Ok(Value::Function(Rc::new(Function::new(
                "(anonymous)",
                function.clone(),
                self.environment.clone(),
                FunctionKind::Function,
            )))),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Illegal => Ok(Value::Nil),
        }
    }

    fn not_indexable(&self, object: &Value, range: &Range) -> RuntimeError {
        self.runtime_error(
            range,
            format!("'{}' object is not indexable", object.type_name()),
        )
    }

    /// Read a variable: resolved locals by distance, everything else from
    /// the globals.
    fn look_up(&self, ident: &Ident) -> RResult<Value> {
        let found: Result<Value, String> = match self.locals.get(&ident.id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &ident.name),
            None => self.globals.borrow().get(&ident.name),
        };

        found.map_err(|m| self.runtime_error(&ident.range, m))
    }

    fn assign(&self, ident: &Ident, value: Value) -> RResult<()> {
        let assigned: Result<(), String> = match self.locals.get(&ident.id) {
            Some(&distance) => Environment::assign_at(&self.environment, distance, &ident.name, value),
            None => self.globals.borrow_mut().assign(&ident.name, value),
        };

        assigned.map_err(|m| self.runtime_error(&ident.range, m))
    }

    /// `super.method`: look up from the superclass of the class the method
    /// was written in, and bind the current `this`.
    fn evaluate_super(&mut self, keyword: &Ident, method: &Ident) -> RResult<Value> {
        let Some(&distance) = self.locals.get(&keyword.id) else {
            return Err(self.runtime_error(&keyword.range, "'super' has not been declared"));
        };

        let superclass: Value = Environment::get_at(&self.environment, distance, "super")
            .map_err(|m| self.runtime_error(&keyword.range, m))?;
        let receiver: Value =
            Environment::get_at(&self.environment, distance.saturating_sub(1), "this")
                .map_err(|m| self.runtime_error(&keyword.range, m))?;

        let Value::Class(superclass) = superclass else {
            return Err(self.runtime_error(&keyword.range, "'super' is not a class"));
        };

        let is_static: bool = matches!(receiver, Value::Class(_));
        let found: Option<Rc<Function>> = if is_static {
            superclass.find_static_method(&method.name)
        } else {
            superclass.find_method(&method.name)
        };

        match found {
            Some(function) => Ok(Value::Function(function.bind(receiver))),
            None => Err(self.runtime_error(
                &method.range,
                format!(
                    "'{}' class has no {}method '{}'",
                    superclass.name,
                    if is_static { "static " } else { "" },
                    method.name
                ),
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    /// Accessor getter, then field, then method.
    fn get_property(&mut self, object: Value, name: &Ident) -> RResult<Value> {
        match &object {
            Value::Instance(instance) => {
                if let Some(accessors) = instance.class.find_accessors(&name.name) {
                    return self.call_function(&accessors.getter.bind(object.clone()), Vec::new(), &name.range);
                }

                let field: Option<Value> = instance.fields.borrow().get(&name.name).cloned();
                if let Some(value) = field {
                    return Ok(value);
                }

                if let Some(method) = instance.class.find_method(&name.name) {
                    return Ok(Value::Function(method.bind(object.clone())));
                }
            }

            Value::Class(class) => {
                if let Some(accessors) = class.find_static_accessors(&name.name) {
                    return self.call_function(&accessors.getter.bind(object.clone()), Vec::new(), &name.range);
                }

                let field: Option<Value> = class.fields.borrow().get(&name.name).cloned();
                if let Some(value) = field {
                    return Ok(value);
                }

                if let Some(method) = class.find_static_method(&name.name) {
                    return Ok(Value::Function(method.bind(object.clone())));
                }
            }

            Value::List(_) => {
                if let Some(value) = builtins::list_property(&object, &name.name) {
                    return Ok(value);
                }
            }

            _ => {}
        }

        Err(self.runtime_error(
            &name.range,
            format!(
                "'{}' object has no property '{}'",
                object.type_name(),
                name.name
            ),
        ))
    }

    /// Accessor setter, then field.
    fn set_property(&mut self, object: Value, name: &Ident, value: Value) -> RResult<()> {
        match &object {
            Value::Instance(instance) => {
                if let Some(accessors) = instance.class.find_accessors(&name.name) {
                    return self.call_setter(accessors, object.clone(), name, value);
                }

                instance.fields.borrow_mut().insert(name.name.clone(), value);
                Ok(())
            }

            Value::Class(class) => {
                if let Some(accessors) = class.find_static_accessors(&name.name) {
                    return self.call_setter(accessors, object.clone(), name, value);
                }

                class.fields.borrow_mut().insert(name.name.clone(), value);
                Ok(())
            }

            _ => Err(self.runtime_error(
                &name.range,
                format!(
                    "property assignment is not valid for '{}' object",
                    object.type_name()
                ),
            )),
        }
    }

    fn call_setter(&mut self, accessors: Accessors, receiver: Value, name: &Ident, value: Value) -> RResult<()> {
        match accessors.setter {
            Some(setter) => {
                self.call_function(&setter.bind(receiver), vec![value], &name.range)?;
                Ok(())
            }
            None => Err(self.runtime_error(
                &name.range,
                format!(
                    "property '{}' of '{}' object is read-only",
                    name.name,
                    receiver.type_name()
                ),
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Invokes a callable (user function, native function or class).
    fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        call: &Expr,
        callee_expr: &Expr,
        arguments: &[Expr],
    ) -> RResult<Value> {
        match callee {
            Value::Function(function) => {
                self.check_arity(&function.name, &function.params(), call, arguments)?;
                self.call_function(&function, args, &call.range)
            }

            Value::NativeFunction(native) => {
                debug!("Calling native function '{}'", native.name);

                self.check_arity(&native.name, native.params, call, arguments)?;
                native
                    .call(args)
                    .map_err(|m| self.runtime_error(&call.range, m))
            }

            Value::Class(class) => {
                let init: Option<Rc<Function>> = class.find_method("init");

                match &init {
                    Some(init) => self.check_arity(&init.name, &init.params(), call, arguments)?,
                    None => self.check_arity(&class.name, &[], call, arguments)?,
                }

                let instance: Value = Value::Instance(Rc::new(Instance::new(class.clone())));

                if let Some(init) = init {
                    self.call_function(&init.bind(instance.clone()), args, &call.range)?;
                }

                Ok(instance)
            }

            other => Err(self.runtime_error(
                &callee_expr.range,
                format!("'{}' object is not callable", other.type_name()),
            )),
        }
    }

    fn check_arity(&self, name: &str, params: &[&str], call: &Expr, arguments: &[Expr]) -> RResult<()> {
        let arity: usize = params.len();
        let given: usize = arguments.len();

        if given < arity {
            let missing: &[&str] = &params[given..];
            let list: String = match missing {
                [one] => one.to_string(),
                [first, second] => format!("{} and {}", first, second),
                [init @ .., last] => format!("{}, and {}", init.join(", "), last),
                [] => String::new(),
            };

            return Err(self.runtime_error(
                &call.range,
                format!(
                    "{}() missing {} argument{}: {}",
                    name,
                    missing.len(),
                    if missing.len() > 1 { "s" } else { "" },
                    list
                ),
            ));
        }

        if given > arity {
            let range: Range = arguments[arity].range.to(&arguments[given - 1].range);

            return Err(self.runtime_error(
                &range,
                format!(
                    "{}() accepts {} arguments but {} were given",
                    name, arity, given
                ),
            ));
        }

        Ok(())
    }

    /// Run a Lox function body in a fresh scope holding its parameters.
    fn call_function(&mut self, function: &Rc<Function>, args: Vec<Value>, site: &Range) -> RResult<Value> {
        if self.calls.len() >= MAX_CALL_DEPTH {
            return Err(self.runtime_error(site, "maximum call stack depth exceeded"));
        }

        debug!("Calling function '{}'", function.name);

        let mut scope: Environment = Environment::with_enclosing(function.closure.clone());
        for (param, arg) in function.declaration.params.iter().zip(args) {
            scope.define(&param.name, arg);
        }

        self.calls.push(Call {
            function: function.name.clone(),
            site: site.start.clone(),
        });
        let result: RResult<Flow> = self.execute_block(&function.declaration.body, scope.shared());
        self.calls.pop();

        let flow: Flow = result?;

        if function.kind == FunctionKind::Initializer {
            return Environment::get_at(&function.closure, 0, "this")
                .map_err(|m| self.runtime_error(site, m));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }

    /// Build a runtime error, snapshotting the call stack if inside a call.
    fn runtime_error(&self, range: &Range, message: impl Into<String>) -> RuntimeError {
        let mut error: RuntimeError = RuntimeError::new(range.clone(), message);

        debug!("Runtime error at {}: {}", range.start, error.message());

        if let Some(innermost) = self.calls.last() {
            let mut trace: Vec<StackFrame> = Vec::with_capacity(self.calls.len() + 1);

            trace.push(StackFrame {
                function: innermost.function.clone(),
                location: range.start.clone(),
            });

            for i in (0..self.calls.len()).rev() {
                let caller: String = match i {
                    0 => String::new(),
                    _ => self.calls[i - 1].function.clone(),
                };
                trace.push(StackFrame {
                    function: caller,
                    location: self.calls[i].site.clone(),
                });
            }

            error.trace = trace;
        }

        error
    }
}

/// Build one class method table (instance or static).
fn method_table(class_name: &str, methods: &[MethodDecl], statics: bool, env: &Env) -> MethodTable {
    let mut table: MethodTable = MethodTable::default();
    let mut getters: HashMap<String, Rc<Function>> = HashMap::new();
    let mut setters: HashMap<String, Rc<Function>> = HashMap::new();

    for method in methods.iter().filter(|m| m.is_static == statics) {
        let kind: FunctionKind = if method.is_init() {
            FunctionKind::Initializer
        } else {
            FunctionKind::Method
        };

        let qualified: String = format!("{}.{}", class_name, method.name.name);
        let display: String = match method.accessor {
            Some(Accessor::Get) => format!("get {}", qualified),
            Some(Accessor::Set) => format!("set {}", qualified),
            None => qualified,
        };

        let function: Rc<Function> = Rc::new(Function::new(display, method.function.clone(), env.clone(), kind));

        let target: &mut HashMap<String, Rc<Function>> = match method.accessor {
            None => &mut table.methods,
            Some(Accessor::Get) => &mut getters,
            Some(Accessor::Set) => &mut setters,
        };
        target.insert(method.name.name.clone(), function);
    }

    for (name, getter) in getters {
        let setter: Option<Rc<Function>> = setters.remove(&name);
        table.accessors.insert(name, Accessors { getter, setter });
    }

    table
}

/// Arithmetic and comparison on already evaluated operands.
fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    match (op, left, right) {
        (BinaryOp::Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut joined: Vec<Value> = a.borrow().clone();
            joined.extend(b.borrow().iter().cloned());
            Ok(Value::list(joined))
        }

        (BinaryOp::Subtract, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

        (BinaryOp::Multiply, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (BinaryOp::Multiply, Value::String(s), Value::Number(n))
        | (BinaryOp::Multiply, Value::Number(n), Value::String(s)) => {
            let times: usize = repeat_count("string", s.len(), *n)?;
            Ok(Value::String(s.repeat(times)))
        }
        (BinaryOp::Multiply, Value::List(l), Value::Number(n))
        | (BinaryOp::Multiply, Value::Number(n), Value::List(l)) => {
            let elements = l.borrow();
            let times: usize = repeat_count("list", elements.len(), *n)?;
            let repeated: Vec<Value> = elements
                .iter()
                .cycle()
                .take(elements.len() * times)
                .cloned()
                .collect();
            Ok(Value::list(repeated))
        }

        (BinaryOp::Divide, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
            Err("cannot divide by 0".to_string())
        }
        (BinaryOp::Divide, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

        (BinaryOp::Modulo, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
            Err("cannot modulo by 0".to_string())
        }
        (BinaryOp::Modulo, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),

        (BinaryOp::Less, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
        (BinaryOp::LessEqual, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
        (BinaryOp::Greater, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
        (BinaryOp::GreaterEqual, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

        (BinaryOp::Less, Value::String(a), Value::String(b)) => Ok(Value::Bool(a < b)),
        (BinaryOp::LessEqual, Value::String(a), Value::String(b)) => Ok(Value::Bool(a <= b)),
        (BinaryOp::Greater, Value::String(a), Value::String(b)) => Ok(Value::Bool(a > b)),
        (BinaryOp::GreaterEqual, Value::String(a), Value::String(b)) => Ok(Value::Bool(a >= b)),

        _ => Err(format!(
            "'{}' operator cannot be used with types '{}' and '{}'",
            op,
            left.type_name(),
            right.type_name()
        )),
    }
}

/// Validate `n` as a repeat count for a value of `unit_len` elements.
fn repeat_count(type_name: &str, unit_len: usize, n: f64) -> Result<usize, String> {
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(format!(
            "cannot multiply '{}' by non-integer 'number'",
            type_name
        ));
    }
    if n < 0.0 {
        return Err(format!("cannot multiply '{}' by negative 'number'", type_name));
    }

    let times: usize = n as usize;
    let fits: bool = unit_len
        .checked_mul(times)
        .is_some_and(|len| len <= MAX_REPEAT_LEN);

    if !fits {
        return Err(format!(
            "cannot multiply '{}' by 'number': result too large",
            type_name
        ));
    }

    Ok(times)
}

/// Validate `index` against a list of `len` elements.
fn list_index(index: &Value, len: usize) -> Result<usize, String> {
    let Value::Number(n) = index else {
        return Err(format!(
            "index ({}) must be a non-negative integer",
            index.repr()
        ));
    };

    if n.fract() != 0.0 || !n.is_finite() {
        return Err(format!("index ({}) must be a non-negative integer", index));
    }
    if *n < 0.0 {
        return Err(format!("index ({}) must not be negative", index));
    }

    let i: usize = *n as usize;
    if i >= len {
        return Err(format!(
            "index {} out of bounds for list of length {}",
            i, len
        ));
    }

    Ok(i)
}
