use crate::ast::{
    Accessor, Expr, ExprKind, Function, Ident, LiteralValue, MethodDecl, Program, Stmt, StmtKind,
};

/// Renders the AST in a parenthesised prefix form, one top‑level statement
/// per line.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print_program(program: &Program) -> String {
        program
            .stmts
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match &stmt.kind {
            // ── declarations ────────────────────────────────────────────
            StmtKind::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.name, Self::print(init)),
                None => format!("(var {})", name.name),
            },

            StmtKind::Fun { name, function } => {
                format!("(fun {}{})", name.name, Self::function(function))
            }

            StmtKind::Class(decl) => {
                let mut s = format!("(class {}", decl.name.name);
                if let Some(superclass) = &decl.superclass {
                    s.push_str(" < ");
                    s.push_str(&superclass.name);
                }
                for method in &decl.methods {
                    s.push(' ');
                    s.push_str(&Self::method(method));
                }
                s.push(')');
                s
            }

            // ── statements ──────────────────────────────────────────────
            StmtKind::Expression(expr) => format!("(; {})", Self::print(expr)),

            StmtKind::Print(expr) => format!("(print {})", Self::print(expr)),

            StmtKind::Block(stmts) => Self::list("block", stmts.iter().map(Self::print_stmt)),

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_stmt) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_stmt)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            StmtKind::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            StmtKind::For {
                initializer,
                condition,
                update,
                body,
            } => format!(
                "(for {} {} {} {})",
                initializer
                    .as_deref()
                    .map_or_else(|| ";".to_string(), Self::print_stmt),
                condition.as_ref().map_or_else(|| ";".to_string(), Self::print),
                update.as_ref().map_or_else(|| ";".to_string(), Self::print),
                Self::print_stmt(body)
            ),

            StmtKind::Break => "(break)".into(),

            StmtKind::Continue => "(continue)".into(),

            StmtKind::Return(value) => match value {
                Some(expr) => format!("(return {})", Self::print(expr)),
                None => "(return)".into(),
            },

            StmtKind::Illegal => "(illegal)".into(),
        }
    }

    pub fn print(expr: &Expr) -> String {
        match &expr.kind {
            // ── literals ────────────────────────────────────────────────
            ExprKind::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.to_string(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            ExprKind::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            ExprKind::Unary { op, right } => format!("({} {})", op, Self::print(right)),

            ExprKind::Binary {
                left, op, right, ..
            } => format!("({} {} {})", op, Self::print(left), Self::print(right)),

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(?: {} {} {})",
                Self::print(condition),
                Self::print(then_branch),
                Self::print(else_branch)
            ),

            // ── names ───────────────────────────────────────────────────
            ExprKind::Variable(name) => name.name.clone(),

            ExprKind::This(_) => "this".into(),

            ExprKind::Super { method, .. } => format!("(super {})", method.name),

            ExprKind::Assign { target, value } => {
                format!("(= {} {})", target.name, Self::print(value))
            }

            // ── calls, properties, lists ────────────────────────────────
            ExprKind::Call { callee, arguments } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            ExprKind::Get { object, name } => format!("(. {} {})", Self::print(object), name.name),

            ExprKind::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.name,
                Self::print(value)
            ),

            ExprKind::Index { object, index } => {
                format!("([] {} {})", Self::print(object), Self::print(index))
            }

            ExprKind::IndexSet {
                object,
                index,
                value,
            } => format!(
                "(= ([] {} {}) {})",
                Self::print(object),
                Self::print(index),
                Self::print(value)
            ),

            ExprKind::List(elements) => Self::list("list", elements.iter().map(Self::print)),

            ExprKind::Function(function) => format!("(fun{})", Self::function(function)),

            ExprKind::Illegal => "(illegal)".into(),
        }
    }

    fn method(method: &MethodDecl) -> String {
        let mut s = String::from("(");
        if method.is_static {
            s.push_str("static ");
        }
        match method.accessor {
            Some(Accessor::Get) => s.push_str("get "),
            Some(Accessor::Set) => s.push_str("set "),
            None => {}
        }
        s.push_str(&method.name.name);
        s.push_str(&Self::function(method.function.as_ref()));
        s.push(')');
        s
    }

    /// ` (params) body...` with a leading space.
    fn function(function: &Function) -> String {
        let params: Vec<&str> = function.params.iter().map(|p: &Ident| p.name.as_str()).collect();

        let mut s = format!(" ({})", params.join(" "));
        for stmt in &function.body {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s
    }

    fn list(head: &str, items: impl Iterator<Item = String>) -> String {
        let mut s = format!("({}", head);
        for item in items {
            s.push(' ');
            s.push_str(&item);
        }
        s.push(')');
        s
    }
}
