//! Codegen's own error type (`spec.md` §4.6, ambient error-handling stack
//! per `SPEC_FULL.md` §B.1) - distinct from the `Diagnostic` pipeline, which
//! is for user-facing source errors. By the time a module reaches `lbc-gen`
//! it has already passed the analyzer with zero errors, so anything that
//! goes wrong here is a codegen bug or an LLVM-side failure, not a BASIC
//! source mistake.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodeGenError {
    #[error("LLVM operation failed: {0}")]
    LlvmOperationFailed(String),
    #[error("function '{0}' was not pre-declared")]
    FunctionNotFound(String),
    #[error("symbol has no codegen value yet: {0}")]
    ValueNotFound(String),
    #[error("unsupported type for codegen: {0}")]
    TypeMappingError(String),
    #[error("target machine setup failed: {0}")]
    TargetError(String),
    #[error("failed to write output file '{0}': {1}")]
    OutputError(String, String),
}

pub type Result<T> = std::result::Result<T, CodeGenError>;
