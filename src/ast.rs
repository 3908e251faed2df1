//! Abstract syntax tree for Lox programs.
//!
//! Every statement and expression carries the source [`Range`] it was parsed
//! from. Identifier *references* carry a [`NodeId`] which the resolver uses as
//! the key of its binding map. Function bodies are shared behind `Rc` so the
//! runtime can create closures without copying the tree.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::token::Range;

/// Identity of an identifier node, unique within a parse (and across parses
/// when the caller threads the next id through).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// A name as it appears in source.
#[derive(Debug, Clone, Serialize)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub range: Range,
}

impl Ident {
    /// The placeholder identifier `_`.
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

/// A parsed source file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize)]
pub enum StmtKind {
    /// `var NAME (= initializer)? ;`
    Var {
        name: Ident,
        initializer: Option<Expr>,
    },

    /// `fun NAME (params) { body }`
    Fun { name: Ident, function: Rc<Function> },

    Class(ClassDecl),

    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Print(Expr),

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// Kept as its own node so every iteration can get a fresh copy of the
    /// loop variables.
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },

    Break,

    Continue,

    /// Absent value ⇒ `nil` is returned.
    Return(Option<Expr>),

    /// Tokens discarded while recovering from a syntax error.
    Illegal,
}

/// Parameters and body shared by function declarations, methods and
/// function literals.
#[derive(Debug, Serialize)]
pub struct Function {
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    pub name: Ident,
    pub superclass: Option<Ident>,
    pub methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Accessor {
    Get,
    Set,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodDecl {
    pub is_static: bool,
    pub accessor: Option<Accessor>,
    pub name: Ident,
    pub function: Rc<Function>,
}

impl MethodDecl {
    /// Instance constructor: a plain, non‑static method named `init`.
    pub fn is_init(&self) -> bool {
        !self.is_static && self.accessor.is_none() && self.name.name == "init"
    }

    /// Modifiers in source order, e.g. `static get `.
    pub fn modifiers(&self) -> String {
        let mut out: String = String::new();

        if self.is_static {
            out.push_str("static ");
        }

        match self.accessor {
            Some(Accessor::Get) => out.push_str("get "),
            Some(Accessor::Set) => out.push_str("set "),
            None => {}
        }

        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: Range,
}

/// A literal constant that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Comma,
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Comma => ",",
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    Literal(LiteralValue),

    /// Variable access.
    Variable(Ident),

    Assign {
        target: Ident,
        value: Box<Expr>,
    },

    /// Prefix unary operator expression, e.g. `!ready` or `-42`.
    Unary {
        op: UnaryOp,
        right: Box<Expr>,
    },

    /// Infix operator expression. `and`, `or` and `,` are included here and
    /// short‑circuit or sequence at runtime.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        op_range: Range,
        right: Box<Expr>,
    },

    /// `condition ? then : else`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },

    /// object.name
    Get {
        object: Box<Expr>,
        name: Ident,
    },

    /// object.name = value
    Set {
        object: Box<Expr>,
        name: Ident,
        value: Box<Expr>,
    },

    /// object[index]
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },

    /// object[index] = value
    IndexSet {
        object: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },

    /// `[a, b, c]`
    List(Vec<Expr>),

    This(Ident),

    /// `super.method`
    Super {
        keyword: Ident,
        method: Ident,
    },

    /// `fun (params) { body }`
    Function(Rc<Function>),

    Grouping(Box<Expr>),

    /// Placeholder produced by an error production.
    Illegal,
}
