//! Error types for the QIR parser.

use thiserror::Error;

/// Errors that can occur while parsing a QIR module.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("invalid token at offset {position}: '{slice}'")]
    LexerError { position: usize, slice: String },

    /// Unexpected token.
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    /// Unexpected end of input.
    #[error("unexpected end of input: expected {0}")]
    UnexpectedEof(String),

    /// A type was defined twice.
    #[error("duplicate type definition: %{0}")]
    DuplicateType(String),

    /// A function was defined twice.
    #[error("duplicate function definition: @{0}")]
    DuplicateFunction(String),

    /// A function body without any basic block.
    #[error("function @{0} has an empty body")]
    EmptyBody(String),

    /// An operand form the subset does not cover.
    #[error("unsupported operand for type {ty}: {found}")]
    UnsupportedOperand { ty: String, found: String },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
