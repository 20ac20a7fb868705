//! # bitscript — compile binary-format scripts into decode transforms
//!
//! A script is a list of named transform definitions. Compiling it yields the
//! transform bound to `main`, a reference-counted graph of decoders that can
//! be applied to bytes.
//!
//! ## Language
//!
//! - **Definitions**: `transform NAME = T;` or `transform NAME(a, b) = T;`
//!   (a later definition of the same name shadows the earlier one)
//! - **Invocation**: `NAME` or `NAME(expr, ...)`; the argument count must match
//!   the transform's parameters
//! - **Struct**: `struct { .field <- T; <- T; if (...) {...} switch (...) {...} }`
//! - **Conditionals**: `if (expr) { T } else { T }`, `switch (expr) { 1: T; else: T; }`
//! - **Composition**: `A <- B <- C` runs `A` on the input, then `B` on its
//!   result, then `C`
//! - **Expressions**: `true`, `false`, integers, parameter names, `.member`
//! - `#` starts a comment running to the end of the line
//!
//! ## Example
//!
//! ```text
//! transform pascal_string = struct {
//!     .len <- uint8;
//!     .data <- known_length(.len);
//! };
//!
//! transform main = struct {
//!     .kind <- uint8;
//!     switch (.kind) {
//!         1: { .name <- pascal_string; };
//!         else: { .raw <- uint32le; };
//!     }
//! };
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use bitscript::{compile_file, Registry, Scope, StderrSink, Value};
//!
//! let main = compile_file("format.bh", &Registry::builtin(), &mut StderrSink)?;
//! let decoded = main.apply(&Scope::default(), &Value::Bytes(vec![2, 0, 0, 0, 0]))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod diagnostic;
pub mod dump;
pub mod error;
pub mod expression;
pub mod parser;
pub mod primitives;
pub mod symbols;
pub mod token;
pub mod tokenizer;
pub mod transform;
pub mod value;

pub use diagnostic::{Diagnostic, DiagnosticSink, SourceDiagnostic, StderrSink};
pub use error::{CompileError, DecodeError, Status};
pub use expression::{BinaryOp, Expression, ExpressionKind};
pub use parser::{compile_file, compile_reader, compile_str};
pub use primitives::{Primitive, Registry};
pub use transform::{NamedTransform, Scope, Transform, TransformKind};
pub use value::Value;
