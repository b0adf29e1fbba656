//! Error types for oracle synthesis.
//!
//! All variants are fatal: the driver aborts the whole compilation on the
//! first error, naming the offending construct. There is no per-pair
//! recovery — a partially synthesized module is worse than none.

use thiserror::Error;

/// Errors that can occur while synthesizing oracles.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Unsupported function signature.
    #[error(
        "function signature not supported for @{function}: \
         parameters must be i1 or i64 and the return type i1, i64, or %TupleHeader*"
    )]
    Signature { function: String },

    /// Unsupported instruction.
    #[error("unsupported op code {opcode} in @{function}")]
    Opcode { function: String, opcode: String },

    /// Unsupported comparison predicate.
    #[error("unsupported icmp predicate {predicate} in @{function}")]
    Predicate { function: String, predicate: String },

    /// Unexpected operand structure.
    #[error("unsupported {construct} in @{function}: {detail}")]
    Shape {
        function: String,
        construct: &'static str,
        detail: String,
    },

    /// A QIR type the writer needs is missing from the module.
    #[error("type %{0} not defined in source QIR")]
    MissingType(String),

    /// An operation the driver was asked to fill has an unusable shape.
    #[error("operation @{operation} does not match the source function: {detail}")]
    Operation { operation: String, detail: String },
}

/// Result type for synthesis operations.
pub type CompileResult<T> = Result<T, CompileError>;
