pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod link;
pub mod op;
pub mod validate;

#[cfg(test)]
pub mod machine;

pub use compile_error::CompileError;
pub use ir::{Bytecode, Instruction, Symbol};
pub use link::{CompileOptions, Linker};
pub use op::Opcode;
