//! A tree-walking interpreter for Lox, extended with `break`/`continue`,
//! ternary and comma operators, anonymous functions, static class members,
//! indexing, and a small native library.
//!
//! ```
//! use rox::lox::Lox;
//!
//! let mut lox = Lox::new();
//! lox.run("var greeting = \"hi\"; print greeting;");
//! assert!(!lox.had_error());
//! ```

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lox;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stdlib;
pub mod token;
pub mod value;
