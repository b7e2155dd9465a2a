//! # Source-level syntax tree
//!
//! The compiler does not parse text. A front end hands it a [`Program`]
//! built from the types in this module, either directly or as a postcard
//! blob (see [`Program::from_bytes`]).
//!
//! The tree is purely syntactic: any shape a Java-like parser could produce
//! for the supported subset is representable, including shapes the compiler
//! rejects (modifiers, compound assignment, qualified calls, ...).

pub mod node;
pub mod program;
pub mod samples;

pub use node::{AssignOp, BinaryOp, Call, Declarator, Expr, Stmt, TypeName, UnaryOp, VarDecl};
pub use program::{FunctionDecl, Param, Program};
