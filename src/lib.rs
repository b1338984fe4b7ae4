use std::sync::Arc;

use anyhow::Context;
use cmd::Eval;
use lex::Lex;
use parse::Parser;

pub mod arith;
pub mod cmd;
pub mod diagnostic;
pub mod expr;
pub mod law;
pub mod lex;
pub mod matching;
pub mod parse;
mod print;
pub mod proof;
pub mod rewrite;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use lex::{File, Location};

/// Parses the whole file, registers its laws, then checks its proofs in
/// order. Stops at the first problem.
pub fn check_file(file: Arc<File>) -> Result<(), Diagnostic> {
    let mut lex = Lex::new(file);
    let document = Parser::new(&mut lex).document()?;
    let mut eval = Eval::default();
    eval.run_document(&document)?;
    Ok(())
}

pub fn check_document(text: &str) -> Result<(), Diagnostic> {
    check_file(Arc::new(File::new("<input>", text)))
}

pub fn process(file: Arc<File>) -> anyhow::Result<()> {
    check_file(file).context("proof check failed")
}
