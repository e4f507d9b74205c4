//! A single-pass compiler for SIMPL-2021, a small imperative teaching
//! language with booleans, integers, one-dimensional arrays, and
//! procedures and functions.
//!
//! The compiler reads source text and produces a textual assembly
//! program for the JVM in Jasmin syntax. Scanning, parsing, type
//! checking and code emission happen in one left-to-right pass; there is
//! no syntax tree. The first error is fatal.

pub mod emitter;
pub mod error;
pub mod hashtable;
pub mod lexer;
pub mod parser;
pub mod pos;
pub mod symbols;
pub mod token;
pub mod types;

pub use emitter::Assembly;
pub use error::{Error, ErrorKind};

/// Compile a SIMPL-2021 source text into a Jasmin assembly program
pub fn compile(source: &str) -> error::Result<Assembly> {
	parser::Parser::compile(source)
}
