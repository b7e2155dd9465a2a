//! Code generator and linker for a small imperative language, targeting a
//! 16-bit stack machine with a handful of registers.
//!
//! [`lang`] holds the syntax tree the compiler consumes, [`bytecode`] the
//! checker, code generator, linker and listing printer.

pub mod bytecode;
pub mod lang;

use bytecode::{Bytecode, CompileError, Linker};
use lang::Program;

/// Compile and link `program` with the default options.
pub fn compile(program: &Program) -> Result<Bytecode, CompileError> {
    Linker::new().link(program)
}
