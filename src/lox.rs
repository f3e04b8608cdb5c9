//! Pipeline driver: source text in, diagnostics and program output out.
//!
//! Each call to [`Lox::run`] scans, parses and resolves the whole unit,
//! reports every static error found, and only evaluates when there were
//! none. One [`Interpreter`] lives across calls, so globals defined by one
//! unit are visible to the next (interactive mode relies on this).

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use log::{debug, info};

use crate::error::{LoxError, Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::parser::{ParseOutput, Parser};
use crate::resolver::{Resolution, Resolver};
use crate::scanner::Scanner;

/// Exit status for a static (scan, parse or resolve) error.
pub const EXIT_STATIC_ERROR: i32 = 65;
/// Exit status for a runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 70;
/// Exit status for a malformed command line.
pub const EXIT_USAGE: i32 = 64;

pub struct Lox {
    interpreter: Interpreter,
    diagnostics: Box<dyn Write>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Program output to stdout, diagnostics to stderr.
    pub fn new() -> Self {
        Self::with_io(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_io(out: Box<dyn Write>, diagnostics: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            diagnostics,
            had_error: false,
            had_runtime_error: false,
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Run one unit of source.
    pub fn run(&mut self, source: &str) {
        let (tokens, lex_errors) = Scanner::new(source).scan_tokens();
        debug!("Scanned {} token(s)", tokens.len());

        let ParseOutput {
            statements,
            errors: parse_errors,
        } = Parser::new(tokens).parse();

        let Resolution {
            locals,
            errors: resolve_errors,
        } = Resolver::new().resolve(&statements);

        let mut static_errors = 0;
        for error in lex_errors
            .iter()
            .chain(parse_errors.iter())
            .chain(resolve_errors.iter())
        {
            self.error(error);
            static_errors += 1;
        }

        if static_errors > 0 {
            info!("Skipping evaluation after {} static error(s)", static_errors);
            return;
        }

        self.interpreter.resolve(locals);

        if let Err(e) = self.interpreter.interpret(&statements) {
            self.runtime_error(&e);
        }
    }

    /// Read and run a script. Returns the process exit status.
    pub fn run_file(&mut self, path: &Path) -> Result<i32> {
        info!("Reading file: {:?}", path);
        let bytes = fs::read(path)?;
        let source = std::str::from_utf8(&bytes)?;

        self.run(source);
        Ok(self.exit_code())
    }

    /// Read-eval-print loop: one line per unit, flags cleared after each.
    pub fn run_prompt<R: BufRead>(&mut self, input: R, prompt: &mut dyn Write) -> Result<()> {
        let mut lines = input.lines();

        loop {
            write!(prompt, "> ")?;
            prompt.flush()?;

            let Some(line) = lines.next() else {
                writeln!(prompt)?;
                break;
            };

            self.run(&line?);
            self.reset_errors();
        }

        info!("Prompt closed");
        Ok(())
    }

    /// Report a static error.
    pub fn error(&mut self, error: &LoxError) {
        debug!("Static error on line {:?}", error.line());
        if let Err(e) = writeln!(self.diagnostics, "{}", error) {
            debug!("Failed to write diagnostic: {}", e);
        }
        self.had_error = true;
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        debug!("Runtime error: {}", error.message);
        if let Err(e) = writeln!(self.diagnostics, "{}", error) {
            debug!("Failed to write diagnostic: {}", e);
        }
        self.had_runtime_error = true;
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn reset_errors(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    pub fn exit_code(&self) -> i32 {
        if self.had_error {
            EXIT_STATIC_ERROR
        } else if self.had_runtime_error {
            EXIT_RUNTIME_ERROR
        } else {
            0
        }
    }
}
