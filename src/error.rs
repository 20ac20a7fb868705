//! Error types for compiling scripts and decoding with the compiled transforms.

use crate::diagnostic::SourceDiagnostic;

/// Coarse outcome of a failed compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Lexical or syntax error, or no `main` transform.
    InvalidInput,
    Io,
    OutOfMemory,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Lexical(SourceDiagnostic),
    #[error("{0}")]
    Syntax(SourceDiagnostic),
    #[error("no \"main\" transform")]
    MissingMain,
    #[error("out of memory")]
    OutOfMemory,
}

impl CompileError {
    pub fn status(&self) -> Status {
        match self {
            CompileError::Io { .. } => Status::Io,
            CompileError::OutOfMemory => Status::OutOfMemory,
            CompileError::Lexical(_) | CompileError::Syntax(_) | CompileError::MissingMain => {
                Status::InvalidInput
            }
        }
    }

    /// The located diagnostic, for lexical and syntax errors.
    pub fn diagnostic(&self) -> Option<&SourceDiagnostic> {
        match self {
            CompileError::Lexical(d) | CompileError::Syntax(d) => Some(d),
            _ => None,
        }
    }
}

/// Failure while applying a compiled transform to input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("no case matched")]
    NoMatch,
    #[error("unexpected end of input: need {needed} bytes, have {available}")]
    ShortInput { needed: usize, available: usize },
    #[error("{consumed} of {total} bytes consumed")]
    TrailingBytes { consumed: usize, total: usize },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("no such member: {0}")]
    MissingMember(String),
    #[error("parameter {0} is not bound")]
    UnboundParameter(usize),
    #[error("no current node")]
    NoCurrentNode,
    #[error("value out of range: {0}")]
    OutOfRange(String),
    #[error("invalid ascii data")]
    InvalidAscii,
    #[error("missing zero terminator")]
    MissingTerminator,
}
