//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes, tracking for every name whether it has been
//!    declared, defined and used.
//! 2. Report static errors: redeclarations, unused locals, reads before
//!    declaration or definition, misplaced `break`/`continue`/`return`/`this`/
//!    `super`, malformed classes and oversized parameter lists.
//! 3. Record, for each identifier reference that names a local, how many
//!    scopes separate it from its declaration. References to globals are left
//!    out of the map and looked up by name at runtime.
//!
//! Globals are checked on a best‑effort basis. A function declared at the top
//! level may refer to a global declared further down the file; such a name is
//! treated as *forward‑declared* and whether it is defined in time is left to
//! the interpreter.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::ast::{
    Accessor, ClassDecl, Expr, ExprKind, Function, Ident, MethodDecl, NodeId, Program, Stmt,
    StmtKind,
};
use crate::builtins;
use crate::error::Diagnostics;
use crate::token::Range;

/// Maximum number of parameters a function may declare, and of arguments a
/// call may pass.
pub const MAX_PARAMS: usize = 255;

/// Scope distance for every identifier reference that resolved to a local.
pub type Bindings = HashMap<NodeId, usize>;

/// Resolve a program in script mode.
pub fn resolve(program: &Program) -> (Bindings, Diagnostics) {
    Resolver::new().resolve(program)
}

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone)]
struct Decl {
    id: Option<NodeId>,
    range: Option<Range>,
    defined: bool,
    used: bool,
    initialising: bool,
}

impl Decl {
    /// A name introduced by the runtime rather than by source code.
    fn implicit() -> Self {
        Self {
            id: None,
            range: None,
            defined: true,
            used: true,
            initialising: false,
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    decls: HashMap<String, Decl>,
    undeclared: Vec<(String, Range)>,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances for locals. In REPL mode the global scope survives between
/// calls to [`Resolver::resolve`].
pub struct Resolver {
    repl: bool,
    scopes: Vec<Scope>,
    bindings: Bindings,
    errors: Diagnostics,

    global_decls: HashMap<String, NodeId>,
    forward_declared: HashSet<String>,
    in_fun: bool,
    in_global_fun: bool,
    fun_scope_level: usize,

    current_function: FunctionType,
    current_class: ClassType,
    in_method: bool,
    in_loop: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Create a resolver for whole scripts.
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            repl: false,
            scopes: Vec::new(),
            bindings: Bindings::new(),
            errors: Diagnostics::new(),
            global_decls: HashMap::new(),
            forward_declared: HashSet::new(),
            in_fun: false,
            in_global_fun: false,
            fun_scope_level: 0,
            current_function: FunctionType::None,
            current_class: ClassType::None,
            in_method: false,
            in_loop: false,
        }
    }

    /// Create a resolver for interactive use: globals persist across inputs
    /// and are exempt from redeclaration and ordering checks.
    pub fn repl() -> Self {
        Resolver {
            repl: true,
            ..Self::new()
        }
    }

    /// Walk all top‑level statements. Diagnostics come back sorted by
    /// position.
    pub fn resolve(&mut self, program: &Program) -> (Bindings, Diagnostics) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            program.stmts.len()
        );

        if !self.repl || self.scopes.is_empty() {
            self.scopes = vec![Self::global_scope()];
            self.forward_declared.clear();
        }

        self.global_decls = read_global_decls(program);

        for stmt in &program.stmts {
            self.resolve_stmt(stmt);
        }

        if self.repl {
            if let Some(global) = self.scopes.first_mut() {
                global.undeclared.clear();
            }
        } else {
            self.end_scope();
        }

        let mut errors: Diagnostics = std::mem::take(&mut self.errors);
        errors.sort();

        info!(
            "Resolved {} local reference(s), {} error(s)",
            self.bindings.len(),
            errors.len()
        );

        (std::mem::take(&mut self.bindings), errors)
    }

    fn global_scope() -> Scope {
        let mut scope: Scope = Scope::default();

        for name in builtins::NAMES {
            scope.decls.insert(name.to_string(), Decl::implicit());
        }

        scope
    }

    fn error(&mut self, range: Range, message: impl Into<String>) {
        let message: String = message.into();

        debug!("Semantic error at {}: {}", range.start, message);

        self.errors.add(range, message);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Var { name, initializer } => match initializer {
                Some(init) if self.in_global_scope() => {
                    self.resolve_expr(init);
                    self.declare(name);
                    self.define(name);
                }
                Some(init) => {
                    self.declare(name);
                    self.set_initialising(name, true);
                    self.resolve_expr(init);
                    self.set_initialising(name, false);
                    self.define(name);
                }
                None => self.declare(name),
            },

            StmtKind::Fun { name, function } => {
                self.declare(name);
                self.define(name);

                let enclosing_level: usize = self.fun_scope_level;
                self.fun_scope_level = self.scopes.len() - 1;
                self.resolve_function(function, FunctionType::Function);
                self.fun_scope_level = enclosing_level;
            }

            StmtKind::Class(decl) => self.resolve_class(decl),

            StmtKind::Expression(expr) | StmtKind::Print(expr) => self.resolve_expr(expr),

            StmtKind::Block(stmts) => {
                self.begin_scope();
                for s in stmts {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            StmtKind::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_loop_body(body);
            }

            StmtKind::For {
                initializer,
                condition,
                update,
                body,
            } => {
                // the initializer gets its own scope, which every iteration copies
                self.begin_scope();
                if let Some(init) = initializer {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = condition {
                    self.resolve_expr(cond);
                }
                if let Some(update) = update {
                    self.resolve_expr(update);
                }
                self.resolve_loop_body(body);
                self.end_scope();
            }

            StmtKind::Break => {
                if !self.in_loop {
                    self.error(stmt.range.clone(), "'break' can only be used inside a loop");
                }
            }

            StmtKind::Continue => {
                if !self.in_loop {
                    self.error(
                        stmt.range.clone(),
                        "'continue' can only be used inside a loop",
                    );
                }
            }

            StmtKind::Return(value) => {
                if self.current_function == FunctionType::None {
                    self.error(
                        stmt.range.clone(),
                        "'return' can only be used inside a function definition",
                    );
                } else if self.current_function == FunctionType::Initializer && value.is_some() {
                    self.error(stmt.range.clone(), "init() cannot return a value");
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }

            StmtKind::Illegal => {}
        }
    }

    fn resolve_loop_body(&mut self, body: &Stmt) {
        let enclosing: bool = self.in_loop;
        self.in_loop = true;
        self.resolve_stmt(body);
        self.in_loop = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Illegal => {}

            ExprKind::Variable(ident) => {
                if ident.is_blank() {
                    self.error(ident.range.clone(), "'_' cannot be used as a value");
                    return;
                }

                let initialising: bool = !self.in_global_scope()
                    && self
                        .scopes
                        .last()
                        .and_then(|s| s.decls.get(&ident.name))
                        .is_some_and(|d| d.initialising);

                if initialising {
                    self.error(
                        expr.range.clone(),
                        format!("'{}' read in its own initialiser", ident.name),
                    );
                    return;
                }

                self.resolve_ident(ident, Access::Read);
            }

            ExprKind::Assign { target, value } => {
                self.resolve_ident(target, Access::Write);
                self.define(target);
                self.resolve_expr(value);
            }

            ExprKind::Unary { right, .. } => self.resolve_expr(right),

            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            ExprKind::Call { callee, arguments } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }

                if let Some(extra) = arguments.get(MAX_PARAMS) {
                    self.error(
                        extra.range.clone(),
                        format!("cannot pass more than {} arguments to function", MAX_PARAMS),
                    );
                }
            }

            ExprKind::Get { object, name } => {
                self.resolve_expr(object);
                self.check_property_name(name);
            }

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
                self.check_property_name(name);
            }

            ExprKind::Index { object, index } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }

            ExprKind::IndexSet {
                object,
                index,
                value,
            } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
                self.resolve_expr(value);
            }

            ExprKind::List(elements) => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }

            ExprKind::This(keyword) => {
                if !self.in_method {
                    self.error(
                        keyword.range.clone(),
                        "'this' can only be used inside a method definition",
                    );
                    return;
                }

                self.resolve_ident(keyword, Access::Read);
            }

            ExprKind::Super { keyword, .. } => {
                if !self.in_method {
                    self.error(
                        keyword.range.clone(),
                        "'super' can only be used inside a method definition",
                    );
                } else if self.current_class != ClassType::Subclass {
                    self.error(
                        keyword.range.clone(),
                        "'super' can only be used inside a subclass",
                    );
                } else {
                    self.resolve_ident(keyword, Access::Read);
                }
            }

            ExprKind::Function(function) => {
                let enclosing_level: usize = self.fun_scope_level;
                self.fun_scope_level = self.scopes.len() - 1;
                self.resolve_function(function, FunctionType::Function);
                self.fun_scope_level = enclosing_level;
            }

            ExprKind::Grouping(inner) => self.resolve_expr(inner),
        }
    }

    fn check_property_name(&mut self, name: &Ident) {
        if name.is_blank() {
            self.error(name.range.clone(), "'_' is not a valid property name");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Functions and classes
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope holding both the parameters and the body.
    fn resolve_function(&mut self, function: &Function, kind: FunctionType) {
        if let Some(extra) = function.params.get(MAX_PARAMS) {
            self.error(
                extra.range.clone(),
                format!("cannot define more than {} function parameters", MAX_PARAMS),
            );
        }

        let enclosing_function: FunctionType = self.current_function;
        let enclosing_in_fun: bool = self.in_fun;
        let enclosing_global_fun: bool = self.in_global_fun;
        let enclosing_loop: bool = self.in_loop;
        let enclosing_method: bool = self.in_method;

        if self.in_global_scope() {
            self.in_global_fun = true;
        }
        self.current_function = kind;
        self.in_fun = true;
        self.in_loop = false;
        if matches!(kind, FunctionType::Method | FunctionType::Initializer) {
            self.in_method = true;
        }

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &function.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
        self.in_fun = enclosing_in_fun;
        self.in_global_fun = enclosing_global_fun;
        self.in_loop = enclosing_loop;
        self.in_method = enclosing_method;
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        debug!("Resolving class '{}'", decl.name.name);

        self.declare(&decl.name);
        self.define(&decl.name);

        if let Some(superclass) = &decl.superclass {
            if superclass.name == decl.name.name {
                self.error(superclass.range.clone(), "class cannot inherit from itself");
            } else {
                self.resolve_ident(superclass, Access::Read);
            }
        }

        self.check_methods(&decl.methods);

        let enclosing_class: ClassType = self.current_class;
        let enclosing_level: usize = self.fun_scope_level;
        let enclosing_global_fun: bool = self.in_global_fun;

        if self.in_global_scope() {
            self.in_global_fun = true;
        }

        self.current_class = if decl.superclass.is_some() {
            ClassType::Subclass
        } else {
            ClassType::Class
        };

        if decl.superclass.is_some() {
            self.begin_scope();
            self.declare_implicit("super");
        }

        self.begin_scope();
        self.declare_implicit("this");
        self.fun_scope_level = self.scopes.len() - 1;

        for method in &decl.methods {
            self.check_accessor_params(method);

            if method.is_static && method.name.name == "init" && method.accessor.is_none() {
                self.error(method.name.range.clone(), "init() cannot be static");
            }

            let kind: FunctionType = if method.is_init() {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(&method.function, kind);
        }

        self.end_scope();
        if decl.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
        self.fun_scope_level = enclosing_level;
        self.in_global_fun = enclosing_global_fun;
    }

    /// Duplicate methods, method/accessor clashes and setters without getters.
    fn check_methods(&mut self, methods: &[MethodDecl]) {
        let mut full_names: HashSet<String> = HashSet::new();
        let mut methods_seen: HashSet<(bool, &str)> = HashSet::new();
        let mut accessors_seen: HashSet<(bool, &str)> = HashSet::new();
        let mut getters: HashSet<(bool, &str)> = HashSet::new();
        let mut setters: Vec<(bool, &Ident)> = Vec::new();

        for method in methods {
            let name: &str = &method.name.name;
            if method.name.is_blank() {
                continue;
            }

            let modifiers: String = method.modifiers();
            if !full_names.insert(format!("{}{}", modifiers, name)) {
                self.error(
                    method.name.range.clone(),
                    format!("{}'{}' has already been declared", modifiers, name),
                );
            }

            let key: (bool, &str) = (method.is_static, name);
            let static_prefix: &str = if method.is_static { "static " } else { "" };

            match method.accessor {
                Some(accessor) => {
                    match accessor {
                        Accessor::Get => {
                            getters.insert(key);
                        }
                        Accessor::Set => setters.push((method.is_static, &method.name)),
                    }

                    if methods_seen.contains(&key) {
                        self.error(
                            method.name.range.clone(),
                            format!("{}'{}' has already been declared as a method", static_prefix, name),
                        );
                    } else {
                        accessors_seen.insert(key);
                    }
                }
                None => {
                    if accessors_seen.contains(&key) {
                        self.error(
                            method.name.range.clone(),
                            format!(
                                "{}'{}' has already been declared as a property accessor",
                                static_prefix, name
                            ),
                        );
                    } else {
                        methods_seen.insert(key);
                    }
                }
            }
        }

        for (is_static, setter) in setters {
            if !getters.contains(&(is_static, setter.name.as_str())) {
                self.error(setter.range.clone(), "write-only properties are not allowed");
            }
        }
    }

    fn check_accessor_params(&mut self, method: &MethodDecl) {
        let params: &[Ident] = &method.function.params;

        match method.accessor {
            Some(Accessor::Get) if !params.is_empty() => {
                let range: Range = params[0].range.to(&params[params.len() - 1].range);
                self.error(range, "property getter cannot have parameters");
            }
            Some(Accessor::Set) if params.is_empty() => {
                self.error(
                    method.name.range.clone(),
                    "property setter must have a parameter",
                );
            }
            Some(Accessor::Set) if params.len() > 1 => {
                let range: Range = params[1].range.to(&params[params.len() - 1].range);
                self.error(range, "property setter can only have one parameter");
            }
            _ => {}
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn in_global_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope, reporting unused locals and names that were
    /// referenced before (or without) being declared in it.
    fn end_scope(&mut self) {
        let is_global: bool = self.in_global_scope();
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        if !is_global {
            for (name, decl) in &scope.decls {
                if decl.used || name == "this" || name == "super" {
                    continue;
                }
                if let Some(range) = &decl.range {
                    self.error(
                        range.clone(),
                        format!("'{}' has been declared but is never used", name),
                    );
                }
            }
        }

        for (name, range) in scope.undeclared {
            if scope.decls.contains_key(&name) {
                self.error(range, format!("'{}' has been used before its declaration", name));
            } else if self.repl {
                // may be a global from a later input; looked up by name at runtime
                debug!("Leaving '{}' unbound as a global", name);
            } else {
                self.error(range, format!("'{}' has not been declared", name));
            }
        }
    }

    fn declare_implicit(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.decls.insert(name.to_string(), Decl::implicit());
        }
    }

    fn declare(&mut self, ident: &Ident) {
        if ident.is_blank() {
            return;
        }

        let global: bool = self.in_global_scope();
        let repl: bool = self.repl;
        let forward: bool = self.forward_declared.contains(&ident.name);

        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        let fresh: Decl = Decl {
            id: Some(ident.id),
            range: Some(ident.range.clone()),
            defined: false,
            used: global || scope.undeclared.iter().any(|(n, _)| *n == ident.name),
            initialising: false,
        };

        if global && repl {
            scope.decls.insert(ident.name.clone(), fresh);
            return;
        }

        if global && forward {
            let same: bool = scope
                .decls
                .get(&ident.name)
                .is_some_and(|d| d.id == Some(ident.id));

            if !same {
                self.error(
                    ident.range.clone(),
                    format!("'{}' has already been declared", ident.name),
                );
            }
            return;
        }

        if scope.decls.contains_key(&ident.name) {
            self.error(
                ident.range.clone(),
                format!("'{}' has already been declared", ident.name),
            );
            return;
        }

        scope.decls.insert(ident.name.clone(), fresh);
    }

    /// Mark the nearest declaration of `ident` as defined.
    fn define(&mut self, ident: &Ident) {
        if ident.is_blank() {
            return;
        }

        if let Some(decl) = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|s| s.decls.get_mut(&ident.name))
        {
            decl.defined = true;
        }
    }

    fn set_initialising(&mut self, ident: &Ident, initialising: bool) {
        if let Some(decl) = self
            .scopes
            .last_mut()
            .and_then(|s| s.decls.get_mut(&ident.name))
        {
            decl.initialising = initialising;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this reference as a local at some distance, as a global, or as
    /// an undeclared use of the innermost scope.
    fn resolve_ident(&mut self, ident: &Ident, access: Access) {
        if ident.is_blank() {
            return;
        }

        let top: usize = self.scopes.len() - 1;

        // 1. check innermost → outermost
        for level in (0..=top).rev() {
            let Some(decl) = self.scopes[level].decls.get_mut(&ident.name) else {
                continue;
            };

            decl.used = true;
            let defined: bool = decl.defined;

            if level > 0 {
                debug!("Resolved '{}' at distance {}", ident.name, top - level);
                self.bindings.insert(ident.id, top - level);
            } else {
                debug!("Resolved '{}' as global", ident.name);
            }

            // A function declared at or inside the declaring scope might only
            // be called once the name has been defined.
            let maybe_later: bool = self.in_fun && level <= self.fun_scope_level;

            if access == Access::Read && !defined && !maybe_later {
                self.error(
                    ident.range.clone(),
                    format!("'{}' has not been defined", ident.name),
                );
            }

            return;
        }

        // 2. a top-level function referring to a global declared further down
        if self.in_global_fun {
            if let Some(&id) = self.global_decls.get(&ident.name) {
                debug!("Forward-declaring global '{}'", ident.name);

                let decl: Decl = Decl {
                    id: Some(id),
                    range: None,
                    defined: false,
                    used: true,
                    initialising: false,
                };
                self.scopes[0].decls.insert(ident.name.clone(), decl);
                self.forward_declared.insert(ident.name.clone());

                return;
            }
        }

        // 3. unknown so far; judged when the current scope closes
        if let Some(scope) = self.scopes.last_mut() {
            scope.undeclared.push((ident.name.clone(), ident.range.clone()));
        }
    }
}

/// The first declaration of every top‑level name.
fn read_global_decls(program: &Program) -> HashMap<String, NodeId> {
    let mut decls: HashMap<String, NodeId> = HashMap::new();

    for stmt in &program.stmts {
        let name: &Ident = match &stmt.kind {
            StmtKind::Var { name, .. } | StmtKind::Fun { name, .. } => name,
            StmtKind::Class(decl) => &decl.name,
            _ => continue,
        };

        decls.entry(name.name.clone()).or_insert(name.id);
    }

    decls
}
