/*!
Recursive‑descent parser for Lox.

Time & Space Complexity
=======================

* **n** = number of tokens (including the sole EOF).

| Phase / function              | Cost | Rationale                                              |
|-------------------------------|-----:|--------------------------------------------------------|
| `Parser::parse` main loop     | Θ(n) | Each token is consumed once via `advance()`.           |
| Error recovery `synchronize()`| O(k) | Discards tokens ≤ next statement boundary (`k ≤ n`).   |

Tokens are pulled from the [`Scanner`] on demand; only the current token and
one token of lookahead are held at any time.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| Error paths (`report`)       | `debug`| Context before recording the diagnostic.  |

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → declaration* EOF ;
declaration    → varDecl | funDecl | classDecl | statement ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
funDecl        → "fun" IDENT function ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" method* "}" ;
method         → "static"? ( "get" | "set" )? IDENT function ;
function       → "(" parameters? ")" block ;
parameters     → IDENT ( "," IDENT )* ;
statement      → exprStmt | printStmt | block | ifStmt | whileStmt
               | forStmt | breakStmt | continueStmt | returnStmt ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
block          → "{" declaration* "}" ;
expression     → comma ;
comma          → assignment ( "," assignment )* ;
assignment     → ( call "." IDENT | call "[" expression "]" | IDENT )
                 "=" assignment | ternary ;
ternary        → logic_or ( "?" expression ":" ternary )? ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT | "[" expression "]" )* ;
arguments      → assignment ( "," assignment )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | IDENT | "this"
               | "super" "." IDENT | "fun" function | "(" expression ")"
               | "[" ( assignment ( "," assignment )* ","? )? "]" ;
```

A binary operator with no left operand (`+ 1`, `== x`) is accepted by an
error production so the diagnostic can say what is wrong.
*/

use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{
    Accessor, BinaryOp, ClassDecl, Expr, ExprKind, Function, Ident, LiteralValue, MethodDecl,
    NodeId, Program, Stmt, StmtKind, UnaryOp,
};
use crate::error::Diagnostics;
use crate::scanner::Scanner;
use crate::token::{Position, Range, SourceFile, Token, TokenType};

/// Parse a whole file, returning a best‑effort program and every syntax error.
pub fn parse(file: &Rc<SourceFile>) -> (Program, Diagnostics) {
    Parser::new(file).parse()
}

/// Marker returned up the call stack after a syntax error has been recorded.
#[derive(Debug)]
struct Unwind;

type PResult<T> = std::result::Result<T, Unwind>;

/// Top‑level parser pulling tokens from a [`Scanner`].
pub struct Parser {
    scanner: Scanner,
    current: Token,
    next: Token,
    previous: Token,
    next_id: u32,
    errors: Diagnostics,
}

impl Parser {
    /// Construct a new parser.
    pub fn new(file: &Rc<SourceFile>) -> Self {
        Self::with_first_node_id(file, 0)
    }

    /// Construct a parser whose identifier ids start at `first_id`, so nodes
    /// from successive parses never collide.
    pub fn with_first_node_id(file: &Rc<SourceFile>, first_id: u32) -> Self {
        info!("Parser created over '{}' (first node id {})", file.name, first_id);

        let mut scanner: Scanner = Scanner::new(file);
        let current: Token = scanner.next_token();
        let next: Token = scanner.next_token();

        let mut parser: Parser = Self {
            scanner,
            previous: current.clone(),
            current,
            next,
            next_id: first_id,
            errors: Diagnostics::new(),
        };
        parser.drain_scanner_errors();

        parser
    }

    /// The id the next identifier node would receive.
    pub fn next_node_id(&self) -> u32 {
        self.next_id
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program. Parsing never stops at the first error: each
    /// failed declaration becomes an `Illegal` statement.
    pub fn parse(&mut self) -> (Program, Diagnostics) {
        info!("Beginning parse phase");

        let stmts: Vec<Stmt> = self.declarations(false);

        self.drain_scanner_errors();

        info!(
            "Parsed {} top-level statement(s) with {} error(s)",
            stmts.len(),
            self.errors.len()
        );

        (Program { stmts }, mem::take(&mut self.errors))
    }

    // ──────────────────────── declaration rules ───────────────────

    /// Declarations up to `}` (inside a block) or EOF.
    fn declarations(&mut self, in_block: bool) -> Vec<Stmt> {
        let mut stmts: Vec<Stmt> = Vec::new();

        while !self.is_at_end() && !(in_block && self.check(TokenType::RIGHT_BRACE)) {
            stmts.push(self.safely_parse_decl());
        }

        stmts
    }

    fn safely_parse_decl(&mut self) -> Stmt {
        let from: Token = self.current.clone();

        match self.declaration() {
            Ok(stmt) => stmt,
            Err(Unwind) => {
                let to: Token = self.synchronize(&from);

                debug!("Recovered from syntax error: discarded {}..{}", from.start, to.end);

                Stmt {
                    kind: StmtKind::Illegal,
                    range: Range::new(from.start, to.end),
                }
            }
        }
    }

    fn declaration(&mut self) -> PResult<Stmt> {
        debug!("Entering declaration at {}", self.current.start);

        let start: Token = self.current.clone();

        if self.matches(TokenType::VAR) {
            self.var_declaration(&start)
        } else if self.check(TokenType::FUN) && self.next.token_type == TokenType::IDENTIFIER {
            self.advance();
            self.fun_declaration(&start)
        } else if self.matches(TokenType::CLASS) {
            self.class_declaration(&start)
        } else {
            self.statement()
        }
    }

    fn var_declaration(&mut self, start: &Token) -> PResult<Stmt> {
        let name: Token = self.consume_with(TokenType::IDENTIFIER, "expected variable name")?;
        let name: Ident = self.ident(&name);

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON)?;

        Ok(self.finish_stmt(start, StmtKind::Var { name, initializer }))
    }

    fn fun_declaration(&mut self, start: &Token) -> PResult<Stmt> {
        let name: Token = self.consume_with(TokenType::IDENTIFIER, "expected function name")?;
        let name: Ident = self.ident(&name);
        let function: Rc<Function> = self.function()?;

        Ok(self.finish_stmt(start, StmtKind::Fun { name, function }))
    }

    fn class_declaration(&mut self, start: &Token) -> PResult<Stmt> {
        let name: Token = self.consume_with(TokenType::IDENTIFIER, "expected class name")?;
        let name: Ident = self.ident(&name);

        let superclass: Option<Ident> = if self.matches(TokenType::LESS) {
            let tok: Token = self.consume_with(TokenType::IDENTIFIER, "expected superclass name")?;
            Some(self.ident(&tok))
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE)?;

        let mut methods: Vec<MethodDecl> = Vec::new();
        while let Some(method) = self.method()? {
            methods.push(method);
        }

        self.consume(TokenType::RIGHT_BRACE)?;

        let decl: ClassDecl = ClassDecl {
            name,
            superclass,
            methods,
        };

        Ok(self.finish_stmt(start, StmtKind::Class(decl)))
    }

    /// `static? (get|set)? NAME function`, or `None` when the class body ends.
    fn method(&mut self) -> PResult<Option<MethodDecl>> {
        let is_static: bool = self.matches(TokenType::STATIC);

        let accessor: Option<Accessor> = if self.matches(TokenType::GET) {
            Some(Accessor::Get)
        } else if self.matches(TokenType::SET) {
            Some(Accessor::Set)
        } else {
            None
        };

        let name: Token = if is_static || accessor.is_some() {
            self.consume_with(TokenType::IDENTIFIER, "expected method name")?
        } else if self.check(TokenType::IDENTIFIER) {
            self.advance()
        } else {
            return Ok(None);
        };

        let name: Ident = self.ident(&name);
        let function: Rc<Function> = self.function()?;

        Ok(Some(MethodDecl {
            is_static,
            accessor,
            name,
            function,
        }))
    }

    /// `( params? ) { body }`, shared by declarations, methods and literals.
    fn function(&mut self) -> PResult<Rc<Function>> {
        let open: Token = self.consume(TokenType::LEFT_PAREN)?;

        let mut params: Vec<Ident> = Vec::new();
        if !self.matches(TokenType::RIGHT_PAREN) {
            loop {
                let param: Token =
                    self.consume_with(TokenType::IDENTIFIER, "expected parameter name")?;
                params.push(self.ident(&param));

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }

            self.consume(TokenType::RIGHT_PAREN)?;
        }

        self.consume(TokenType::LEFT_BRACE)?;
        let body: Vec<Stmt> = self.block_body()?;

        Ok(Rc::new(Function {
            params,
            body,
            range: Range::new(open.start, self.previous.end.clone()),
        }))
    }

    // ──────────────────────── statement rules ─────────────────────

    fn statement(&mut self) -> PResult<Stmt> {
        debug!("Entering statement at {}", self.current.start);

        let start: Token = self.current.clone();

        if self.matches(TokenType::PRINT) {
            let value: Expr = self.expression()?;
            self.consume(TokenType::SEMICOLON)?;

            Ok(self.finish_stmt(&start, StmtKind::Print(value)))
        } else if self.matches(TokenType::LEFT_BRACE) {
            let stmts: Vec<Stmt> = self.block_body()?;

            Ok(self.finish_stmt(&start, StmtKind::Block(stmts)))
        } else if self.matches(TokenType::IF) {
            self.if_statement(&start)
        } else if self.matches(TokenType::WHILE) {
            self.while_statement(&start)
        } else if self.matches(TokenType::FOR) {
            self.for_statement(&start)
        } else if self.matches(TokenType::BREAK) {
            self.consume(TokenType::SEMICOLON)?;

            Ok(self.finish_stmt(&start, StmtKind::Break))
        } else if self.matches(TokenType::CONTINUE) {
            self.consume(TokenType::SEMICOLON)?;

            Ok(self.finish_stmt(&start, StmtKind::Continue))
        } else if self.matches(TokenType::RETURN) {
            let value: Option<Expr> = if self.matches(TokenType::SEMICOLON) {
                None
            } else {
                let value: Expr = self.expression()?;
                self.consume(TokenType::SEMICOLON)?;
                Some(value)
            };

            Ok(self.finish_stmt(&start, StmtKind::Return(value)))
        } else {
            self.expression_statement()
        }
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let start: Token = self.current.clone();
        let expr: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON)?;

        Ok(self.finish_stmt(&start, StmtKind::Expression(expr)))
    }

    /// Statements after an opening `{`, through the closing `}`.
    fn block_body(&mut self) -> PResult<Vec<Stmt>> {
        let stmts: Vec<Stmt> = self.declarations(true);

        self.consume(TokenType::RIGHT_BRACE)?;

        Ok(stmts)
    }

    fn if_statement(&mut self, start: &Token) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN)?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN)?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(self.finish_stmt(
            start,
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
        ))
    }

    fn while_statement(&mut self, start: &Token) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN)?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN)?;

        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(self.finish_stmt(start, StmtKind::While { condition, body }))
    }

    fn for_statement(&mut self, start: &Token) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN)?;

        let init_start: Token = self.current.clone();
        let initializer: Option<Box<Stmt>> = if self.matches(TokenType::VAR) {
            Some(Box::new(self.var_declaration(&init_start)?))
        } else if self.matches(TokenType::SEMICOLON) {
            None
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition: Option<Expr> = if self.matches(TokenType::SEMICOLON) {
            None
        } else {
            let condition: Expr = self.expression()?;
            self.consume(TokenType::SEMICOLON)?;
            Some(condition)
        };

        let update: Option<Expr> = if self.matches(TokenType::RIGHT_PAREN) {
            None
        } else {
            let update: Expr = self.expression()?;
            self.consume(TokenType::RIGHT_PAREN)?;
            Some(update)
        };

        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(self.finish_stmt(
            start,
            StmtKind::For {
                initializer,
                condition,
                update,
                body,
            },
        ))
    }

    // ──────────────────────── expression rules ────────────────────

    fn expression(&mut self) -> PResult<Expr> {
        self.binary(Self::assignment, &[TokenType::COMMA])
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr: Expr = self.ternary()?;

        if !self.matches(TokenType::EQUAL) {
            return Ok(expr);
        }

        let value: Expr = self.assignment()?;
        let range: Range = expr.range.to(&value.range);
        let value: Box<Expr> = Box::new(value);

        let kind: ExprKind = match expr.kind {
            ExprKind::Variable(target) => ExprKind::Assign { target, value },
            ExprKind::Get { object, name } => ExprKind::Set {
                object,
                name,
                value,
            },
            ExprKind::Index { object, index } => ExprKind::IndexSet {
                object,
                index,
                value,
            },
            _ => {
                self.report(expr.range, "invalid assignment target");
                ExprKind::Illegal
            }
        };

        Ok(Expr { kind, range })
    }

    fn ternary(&mut self) -> PResult<Expr> {
        let condition: Expr = self.logical_or()?;

        if !self.matches(TokenType::QUESTION) {
            return Ok(condition);
        }

        let then_branch: Expr = self.expression()?;
        self.consume(TokenType::COLON)?;
        let else_branch: Expr = self.ternary()?;

        let range: Range = condition.range.to(&else_branch.range);

        Ok(Expr {
            kind: ExprKind::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            range,
        })
    }

    fn logical_or(&mut self) -> PResult<Expr> {
        self.binary(Self::logical_and, &[TokenType::OR])
    }

    fn logical_and(&mut self) -> PResult<Expr> {
        self.binary(Self::equality, &[TokenType::AND])
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary(
            Self::comparison,
            &[TokenType::EQUAL_EQUAL, TokenType::BANG_EQUAL],
        )
    }

    fn comparison(&mut self) -> PResult<Expr> {
        self.binary(
            Self::term,
            &[
                TokenType::LESS,
                TokenType::LESS_EQUAL,
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
            ],
        )
    }

    fn term(&mut self) -> PResult<Expr> {
        self.binary(Self::factor, &[TokenType::PLUS, TokenType::MINUS])
    }

    fn factor(&mut self) -> PResult<Expr> {
        self.binary(
            Self::unary,
            &[TokenType::STAR, TokenType::SLASH, TokenType::PERCENT],
        )
    }

    /// Left‑associative chain of `operators` over operands parsed by `next`.
    fn binary(
        &mut self,
        next: fn(&mut Self) -> PResult<Expr>,
        operators: &[TokenType],
    ) -> PResult<Expr> {
        let mut expr: Expr = next(self)?;

        while let Some(op_token) = self.match_any(operators) {
            let right: Expr = next(self)?;
            let range: Range = expr.range.to(&right.range);

            expr = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(expr),
                    op: binary_op(&op_token.token_type),
                    op_range: op_token.range(),
                    right: Box::new(right),
                },
                range,
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if let Some(op_token) = self.match_any(&[TokenType::BANG, TokenType::MINUS]) {
            let right: Expr = self.unary()?;
            let range: Range = op_token.range().to(&right.range);

            let op: UnaryOp = if op_token.token_type == TokenType::BANG {
                UnaryOp::Not
            } else {
                UnaryOp::Negate
            };

            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    right: Box::new(right),
                },
                range,
            });
        }

        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            let start: Position = expr.range.start.clone();

            let kind: ExprKind = if self.matches(TokenType::LEFT_PAREN) {
                let mut arguments: Vec<Expr> = Vec::new();

                if !self.matches(TokenType::RIGHT_PAREN) {
                    loop {
                        arguments.push(self.assignment()?);

                        if !self.matches(TokenType::COMMA) {
                            break;
                        }
                    }

                    self.consume(TokenType::RIGHT_PAREN)?;
                }

                ExprKind::Call {
                    callee: Box::new(expr),
                    arguments,
                }
            } else if self.matches(TokenType::DOT) {
                let name: Token =
                    self.consume_with(TokenType::IDENTIFIER, "expected property name")?;

                ExprKind::Get {
                    object: Box::new(expr),
                    name: self.ident(&name),
                }
            } else if self.matches(TokenType::LEFT_BRACKET) {
                let index: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_BRACKET)?;

                ExprKind::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                }
            } else {
                return Ok(expr);
            };

            let range: Range = Range::new(start, self.previous.end.clone());
            expr = Expr { kind, range };
        }
    }

    fn primary(&mut self) -> PResult<Expr> {
        let tok: Token = self.current.clone();

        let literal: Option<LiteralValue> = match &tok.token_type {
            TokenType::FALSE => Some(LiteralValue::False),
            TokenType::TRUE => Some(LiteralValue::True),
            TokenType::NIL => Some(LiteralValue::Nil),
            TokenType::NUMBER(n) => Some(LiteralValue::Number(*n)),
            TokenType::STRING(s) => Some(LiteralValue::Str(s.clone())),
            _ => None,
        };

        if let Some(value) = literal {
            self.advance();
            return Ok(Expr {
                kind: ExprKind::Literal(value),
                range: tok.range(),
            });
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr {
                kind: ExprKind::Variable(self.ident(&tok)),
                range: tok.range(),
            });
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr {
                kind: ExprKind::This(self.ident(&tok)),
                range: tok.range(),
            });
        }

        if self.matches(TokenType::SUPER) {
            self.consume(TokenType::DOT)?;
            let method: Token =
                self.consume_with(TokenType::IDENTIFIER, "expected superclass method name")?;

            let keyword: Ident = self.ident(&tok);
            let method: Ident = self.ident(&method);
            let range: Range = tok.range().to(&method.range);

            return Ok(Expr {
                kind: ExprKind::Super { keyword, method },
                range,
            });
        }

        if self.matches(TokenType::FUN) {
            let function: Rc<Function> = self.function()?;

            return Ok(Expr {
                kind: ExprKind::Function(function),
                range: Range::new(tok.start, self.previous.end.clone()),
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;
            self.consume(TokenType::RIGHT_PAREN)?;

            return Ok(Expr {
                kind: ExprKind::Grouping(Box::new(expr)),
                range: Range::new(tok.start, self.previous.end.clone()),
            });
        }

        if self.matches(TokenType::LEFT_BRACKET) {
            let mut elements: Vec<Expr> = Vec::new();

            while !self.check(TokenType::RIGHT_BRACKET) {
                elements.push(self.assignment()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }

            self.consume(TokenType::RIGHT_BRACKET)?;

            return Ok(Expr {
                kind: ExprKind::List(elements),
                range: Range::new(tok.start, self.previous.end.clone()),
            });
        }

        // ── error production: binary operator without a left operand ──
        let operand: Option<fn(&mut Self) -> PResult<Expr>> = match tok.token_type {
            TokenType::EQUAL_EQUAL | TokenType::BANG_EQUAL => Some(Self::equality),
            TokenType::LESS
            | TokenType::LESS_EQUAL
            | TokenType::GREATER
            | TokenType::GREATER_EQUAL => Some(Self::comparison),
            TokenType::PLUS => Some(Self::factor),
            TokenType::STAR | TokenType::SLASH | TokenType::PERCENT => Some(Self::unary),
            _ => None,
        };

        if let Some(operand) = operand {
            self.advance();
            self.report(
                tok.range(),
                format!(
                    "binary operator '{}' must have left and right operands",
                    tok.lexeme
                ),
            );

            let right: Expr = operand(self)?;

            return Ok(Expr {
                kind: ExprKind::Illegal,
                range: tok.range().to(&right.range),
            });
        }

        self.report(tok.range(), "expected expression");

        Err(Unwind)
    }

    // ────────────────────── utility helpers ───────────────────────

    fn ident(&mut self, token: &Token) -> Ident {
        let id: NodeId = NodeId(self.next_id);
        self.next_id += 1;

        Ident {
            id,
            name: token.lexeme.clone(),
            range: token.range(),
        }
    }

    fn finish_stmt(&self, start: &Token, kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            range: Range::new(start.start.clone(), self.previous.end.clone()),
        }
    }

    /// Record a diagnostic unless one already starts at the same position.
    fn report(&mut self, range: Range, message: impl Into<String>) {
        let message: String = message.into();

        if self.errors.iter().any(|d| d.range.start == range.start) {
            debug!("Suppressing duplicate error at {}: {}", range.start, message);
            return;
        }

        debug!("Syntax error at {}: {}", range.start, message);

        self.errors.add(range, message);
    }

    fn drain_scanner_errors(&mut self) {
        for diagnostic in self.scanner.take_errors() {
            self.report(diagnostic.range, diagnostic.message);
        }
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    fn match_any(&mut self, types: &[TokenType]) -> Option<Token> {
        if types.iter().any(|t| self.current.token_type == *t) {
            return Some(self.advance());
        }

        None
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType) -> PResult<Token> {
        let message: String = format!("expected '{}'", ttype.symbol());

        self.consume_with(ttype, &message)
    }

    fn consume_with(&mut self, ttype: TokenType, message: &str) -> PResult<Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        let range: Range = self.current.range();
        self.report(range, message);

        Err(Unwind)
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        self.current.token_type == ttype
    }

    /// Consume the current token and return it.
    fn advance(&mut self) -> Token {
        let upcoming: Token = mem::replace(&mut self.next, self.scanner.next_token());
        let consumed: Token = mem::replace(&mut self.current, upcoming);

        self.previous = consumed.clone();
        self.drain_scanner_errors();

        consumed
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.current.token_type, TokenType::EOF)
    }

    /// Discard tokens through the next `;`, or up to a token that starts a
    /// statement. Returns the last token discarded.
    fn synchronize(&mut self, from: &Token) -> Token {
        let mut last: Token = if self.previous.start >= from.start {
            self.previous.clone()
        } else {
            from.clone()
        };

        loop {
            match self.current.token_type {
                TokenType::SEMICOLON => return self.advance(),

                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::BREAK
                | TokenType::CONTINUE
                | TokenType::LEFT_BRACE
                | TokenType::EOF => return last,

                _ => last = self.advance(),
            }
        }
    }
}

fn binary_op(token_type: &TokenType) -> BinaryOp {
    match token_type {
        TokenType::COMMA => BinaryOp::Comma,
        TokenType::OR => BinaryOp::Or,
        TokenType::AND => BinaryOp::And,
        TokenType::EQUAL_EQUAL => BinaryOp::Equal,
        TokenType::BANG_EQUAL => BinaryOp::NotEqual,
        TokenType::LESS => BinaryOp::Less,
        TokenType::LESS_EQUAL => BinaryOp::LessEqual,
        TokenType::GREATER => BinaryOp::Greater,
        TokenType::GREATER_EQUAL => BinaryOp::GreaterEqual,
        TokenType::PLUS => BinaryOp::Add,
        TokenType::MINUS => BinaryOp::Subtract,
        TokenType::STAR => BinaryOp::Multiply,
        TokenType::SLASH => BinaryOp::Divide,
        _ => BinaryOp::Modulo,
    }
}
