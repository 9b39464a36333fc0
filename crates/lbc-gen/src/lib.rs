//! LLVM code generation (`spec.md` §4.6 "CodeGen contract"): lowers a
//! fully-analyzed `lbc_ast::Ast` plus its `lbc_sem::SemaResult` side
//! tables to an LLVM module, ready for IR/object/assembly emission.

pub mod codegen;
pub mod error;
pub mod types;

pub use codegen::CodeGen;
pub use error::{CodeGenError, Result};
pub use types::TypeMapper;
