//! Drives the whole pipeline (parse → resolve → interpret) over one source
//! file at a time, keeping state between runs.

use std::io::{Stdout, Write};
use std::rc::Rc;

use log::info;

use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::token::SourceFile;

/// A resolver, an interpreter and the node id counter they share.
pub struct Session<W: Write = Stdout> {
    resolver: Resolver,
    interpreter: Interpreter<W>,
    next_node_id: u32,
}

impl Session<Stdout> {
    /// Session for running whole scripts, printing to standard output.
    pub fn new() -> Self {
        Self::with_output(std::io::stdout())
    }

    /// Interactive session printing to standard output.
    pub fn repl() -> Self {
        Self::repl_with_output(std::io::stdout())
    }
}

impl Default for Session<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Session<W> {
    pub fn with_output(output: W) -> Self {
        Self {
            resolver: Resolver::new(),
            interpreter: Interpreter::with_output(output),
            next_node_id: 0,
        }
    }

    /// Globals persist between runs, expression statements print their value
    /// and top‑level redeclaration is allowed.
    pub fn repl_with_output(output: W) -> Self {
        Self {
            resolver: Resolver::repl(),
            interpreter: Interpreter::with_output(output).repl(),
            next_node_id: 0,
        }
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter<W> {
        &mut self.interpreter
    }

    /// Run one source file. Nothing executes unless it parses and resolves
    /// cleanly.
    pub fn run(&mut self, file: &Rc<SourceFile>) -> Result<()> {
        info!("Running '{}'", file.name);

        std::str::from_utf8(&file.contents)?;

        let mut parser: Parser = Parser::with_first_node_id(file, self.next_node_id);
        let (program, errors) = parser.parse();
        self.next_node_id = parser.next_node_id();

        if !errors.is_empty() {
            return Err(LoxError::syntax(errors));
        }

        let (bindings, errors) = self.resolver.resolve(&program);
        if !errors.is_empty() {
            return Err(LoxError::semantic(errors));
        }

        self.interpreter.interpret(&program, &bindings)?;

        Ok(())
    }

    /// Convenience wrapper around [`Session::run`] for in‑memory code.
    pub fn run_source(&mut self, name: &str, code: &str) -> Result<()> {
        let file: Rc<SourceFile> = SourceFile::new(name, code.to_string());
        self.run(&file)
    }
}
