//! Compile diagnostics and the sinks they are reported to.
//!
//! At most one diagnostic is reported per compile: either the first lexical or
//! syntax error, or the missing-`main` notice once the whole file is read.

use std::fmt;

/// A located error message.
///
/// Renders as `<file>:<line>:<col>: <message>: "<lexeme>"`, where `<col>` is a
/// single column or an inclusive `start-end` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDiagnostic {
    pub file: String,
    pub line: usize,
    /// First column of the offending token (1-based).
    pub start_column: usize,
    /// Column just past the consumed text.
    pub end_column: usize,
    pub message: String,
    pub lexeme: String,
}

impl fmt::Display for SourceDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.file, self.line)?;
        if self.end_column.saturating_sub(self.start_column) <= 1 {
            write!(f, "{}: ", self.start_column)?;
        } else {
            write!(f, "{}-{}: ", self.start_column, self.end_column - 1)?;
        }
        write!(f, "{}: \"{}\"", self.message, self.lexeme)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Source(SourceDiagnostic),
    MissingMain { file: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Source(d) => d.fmt(f),
            Diagnostic::MissingMain { .. } => f.write_str("no \"main\" transform"),
        }
    }
}

/// Receives compile diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Prints each diagnostic as one line on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        eprintln!("{}", diagnostic);
    }
}

/// Collects diagnostics, mainly for tests and tools.
impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}
