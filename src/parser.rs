//! Compile script source directly into transforms.
//!
//! There is no intermediate syntax tree: each production builds its runtime
//! objects as soon as it is recognized. The first error ends the compile; it
//! is reported once to the diagnostic sink and every handle built so far is
//! released as the builders unwind.
//!
//! ```text
//! script     := definition*
//! definition := 'transform' IDENT paramlist? '=' transform ';'
//! paramlist  := '(' (IDENT (',' IDENT)*)? ')'
//! transform  := atom ('<-' atom)*
//! atom       := IDENT arglist? | if | 'struct' '{' member* '}' | switch
//! arglist    := '(' (expr (',' expr)*)? ')'
//! member     := ('.' IDENT)? '<-' transform ';' | if | switch
//! if         := 'if' '(' expr ')' '{' body '}' ('else' '{' body '}')?
//! switch     := 'switch' '(' expr ')' '{' ((expr | 'else') ':' case_body ';')* '}'
//! expr       := 'true' | 'false' | INT | IDENT | '.' IDENT
//! ```
//!
//! Inside a struct, `if`/`switch` bodies are member lists that are merged into
//! the enclosing struct; elsewhere they are transforms.

use crate::diagnostic::{Diagnostic, DiagnosticSink, SourceDiagnostic};
use crate::error::CompileError;
use crate::expression::{BinaryOp, Expression};
use crate::primitives::Registry;
use crate::symbols::SymbolTable;
use crate::token::{Keyword, Token, TokenKind};
use crate::tokenizer::{LexError, Tokenizer};
use crate::transform::{NamedTransform, Transform};
use crate::value::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Deepest allowed nesting of atoms, conditionals and struct bodies.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Compile the script at `path` and return its `main` transform.
pub fn compile_file(
    path: impl AsRef<Path>,
    registry: &Registry,
    sink: &mut dyn DiagnosticSink,
) -> Result<Transform, CompileError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let file = File::open(path).map_err(|source| CompileError::Io {
        file: name.clone(),
        source,
    })?;
    compile_reader(&name, file, registry, sink)
}

/// Compile script source held in memory. `<input>` is used as the file name.
pub fn compile_str(
    source: &str,
    registry: &Registry,
    sink: &mut dyn DiagnosticSink,
) -> Result<Transform, CompileError> {
    compile_reader("<input>", source.as_bytes(), registry, sink)
}

/// Compile a script read from `reader`; `file` names it in diagnostics.
pub fn compile_reader<R: Read>(
    file: &str,
    reader: R,
    registry: &Registry,
    sink: &mut dyn DiagnosticSink,
) -> Result<Transform, CompileError> {
    debug!(file, "compiling script");
    let mut state = CompilerState::new(file, reader, registry, sink);
    state.advance()?;
    while state.token.kind != TokenKind::Eof {
        state.parse_definition()?;
    }
    state.resolve_main()
}

struct CompilerState<'r, 's, R> {
    file: String,
    tokens: Tokenizer<R>,
    token: Token,
    symbols: SymbolTable<'r>,
    /// Parameter names of the definition being parsed.
    params: Vec<String>,
    /// Number of nested atoms, conditionals and struct bodies being parsed.
    depth: usize,
    /// Set by the first error; later errors are not reported.
    failed: bool,
    sink: &'s mut dyn DiagnosticSink,
}

impl<'r, 's, R: Read> CompilerState<'r, 's, R> {
    fn new(file: &str, reader: R, registry: &'r Registry, sink: &'s mut dyn DiagnosticSink) -> Self {
        CompilerState {
            file: file.to_string(),
            tokens: Tokenizer::new(reader),
            token: Token {
                kind: TokenKind::Error,
                line: 1,
                column: 1,
            },
            symbols: SymbolTable::new(registry),
            params: Vec::new(),
            depth: 0,
            failed: false,
            sink,
        }
    }

    // ==================== Errors ====================

    /// Latch `err` as the compile's outcome, reporting it if it is the first.
    fn error(&mut self, err: CompileError) -> CompileError {
        if !self.failed {
            self.failed = true;
            if let Some(d) = err.diagnostic() {
                self.sink.report(&Diagnostic::Source(d.clone()));
            }
            self.token.kind = TokenKind::Error;
        }
        err
    }

    fn located(&self, message: &str) -> SourceDiagnostic {
        let (start_column, end_column) = self.tokens.columns();
        SourceDiagnostic {
            file: self.file.clone(),
            line: self.tokens.line(),
            start_column,
            end_column,
            message: message.to_string(),
            lexeme: self.tokens.lexeme(),
        }
    }

    fn syntax_error(&mut self, message: &str) -> CompileError {
        let d = self.located(message);
        self.error(CompileError::Syntax(d))
    }

    /// Run a recursive production one level deeper, refusing to go past
    /// [`MAX_NESTING_DEPTH`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.syntax_error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Append to a list being built, failing instead of aborting when memory runs out.
    fn push<T>(&mut self, list: &mut Vec<T>, item: T) -> Result<(), CompileError> {
        if list.try_reserve(1).is_err() {
            return Err(self.error(CompileError::OutOfMemory));
        }
        list.push(item);
        Ok(())
    }

    // ==================== Tokens ====================

    fn advance(&mut self) -> Result<(), CompileError> {
        match self.tokens.next_token() {
            Ok(token) => {
                self.token = token;
                Ok(())
            }
            Err(LexError::Io(source)) => {
                let file = self.file.clone();
                Err(self.error(CompileError::Io { file, source }))
            }
            Err(e) => {
                let d = self.located(&e.to_string());
                Err(self.error(CompileError::Lexical(d)))
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), CompileError> {
        if self.token.kind != kind {
            return Err(self.syntax_error("unexpected"));
        }
        self.advance()
    }

    fn expect_symbol(&mut self, c: char) -> Result<(), CompileError> {
        self.expect(TokenKind::Symbol(c))
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<(), CompileError> {
        self.expect(TokenKind::Keyword(k))
    }

    /// Consume an identifier, taking ownership of its text.
    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        match std::mem::replace(&mut self.token.kind, TokenKind::Error) {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            other => {
                self.token.kind = other;
                Err(self.syntax_error("unexpected (identifier expected)"))
            }
        }
    }

    // ==================== Expressions ====================

    fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        match &self.token.kind {
            TokenKind::Keyword(k @ (Keyword::True | Keyword::False)) => {
                let value = *k == Keyword::True;
                self.advance()?;
                Ok(Expression::constant(Value::Boolean(value)))
            }
            TokenKind::Integer(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expression::constant(Value::Integer(n)))
            }
            TokenKind::Identifier(name) => {
                let Some(index) = self.params.iter().position(|p| p == name) else {
                    return Err(self.syntax_error("unknown identifier"));
                };
                self.advance()?;
                Ok(Expression::param(index))
            }
            TokenKind::Symbol('.') => {
                self.advance()?;
                let key = self.expect_identifier()?;
                Ok(Expression::member(Expression::current_node(), key))
            }
            _ => Err(self.syntax_error("expression expected")),
        }
    }

    // ==================== Transforms ====================

    /// The current token must be an identifier. An argument count that does
    /// not match the transform's parameters is reported at the token after
    /// the argument list.
    fn parse_invocation(&mut self) -> Result<Transform, CompileError> {
        let resolved = match &self.token.kind {
            TokenKind::Identifier(name) => self.symbols.resolve(name),
            _ => None,
        };
        let Some(transform) = resolved else {
            return Err(self.syntax_error("transform not found"));
        };
        self.advance()?;

        let mut args = Vec::new();
        if self.token.is_symbol('(') {
            self.advance()?;
            while !self.token.is_symbol(')') {
                if !args.is_empty() {
                    self.expect_symbol(',')?;
                }
                let arg = self.parse_expression()?;
                self.push(&mut args, arg)?;
            }
            self.expect_symbol(')')?;
        }

        if transform.num_params() != args.len() {
            return Err(self.syntax_error("incorrect number of parameters before"));
        }
        if args.is_empty() {
            Ok(transform)
        } else {
            Ok(Transform::param_wrapper(transform, args))
        }
    }

    fn parse_body(&mut self, in_struct: bool) -> Result<Transform, CompileError> {
        if in_struct {
            self.parse_struct_body()
        } else {
            self.parse_transform()
        }
    }

    fn parse_if(&mut self, in_struct: bool) -> Result<Transform, CompileError> {
        self.nested(|state| state.parse_if_else(in_struct))
    }

    fn parse_if_else(&mut self, in_struct: bool) -> Result<Transform, CompileError> {
        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        let condition = self.parse_expression()?;
        self.expect_symbol(')')?;
        self.expect_symbol('{')?;
        let then_branch = self.parse_body(in_struct)?;
        self.expect_symbol('}')?;

        let else_branch = if self.token.is_keyword(Keyword::Else) {
            self.advance()?;
            self.expect_symbol('{')?;
            let branch = self.parse_body(in_struct)?;
            self.expect_symbol('}')?;
            branch
        } else if in_struct {
            Transform::empty()
        } else {
            return Err(self.syntax_error("else expected"));
        };

        Ok(Transform::if_else(condition, then_branch, else_branch))
    }

    /// Cases become nested if/else transforms, tried in declaration order. The
    /// innermost fallback is the registry's invalid transform.
    fn parse_switch(&mut self, in_struct: bool) -> Result<Transform, CompileError> {
        self.nested(|state| state.parse_switch_cases(in_struct))
    }

    fn parse_switch_cases(&mut self, in_struct: bool) -> Result<Transform, CompileError> {
        self.expect_keyword(Keyword::Switch)?;
        self.expect_symbol('(')?;
        let subject = self.parse_expression()?;
        self.expect_symbol(')')?;
        self.expect_symbol('{')?;

        let mut cases: Vec<(Expression, Transform)> = Vec::new();
        while !self.token.is_symbol('}') {
            let condition = if self.token.is_keyword(Keyword::Else) {
                self.advance()?;
                Expression::constant(Value::Boolean(true))
            } else {
                let value = self.parse_expression()?;
                Expression::binary(BinaryOp::Equals, subject.clone(), value)
            };
            self.expect_symbol(':')?;
            let body = if in_struct {
                self.expect_symbol('{')?;
                let body = self.parse_struct_body()?;
                self.expect_symbol('}')?;
                body
            } else {
                self.parse_transform()?
            };
            self.expect_symbol(';')?;
            self.push(&mut cases, (condition, body))?;
        }
        self.expect_symbol('}')?;

        let fallback = self.symbols.registry().invalid();
        Ok(cases
            .into_iter()
            .rev()
            .fold(fallback, |else_branch, (condition, then_branch)| {
                Transform::if_else(condition, then_branch, else_branch)
            }))
    }

    /// Members up to (not including) the closing `}`.
    fn parse_struct_body(&mut self) -> Result<Transform, CompileError> {
        self.nested(Self::parse_members)
    }

    fn parse_members(&mut self) -> Result<Transform, CompileError> {
        let mut members = Vec::new();
        while !self.token.is_symbol('}') {
            let member = if self.token.is_keyword(Keyword::If) {
                NamedTransform {
                    name: None,
                    transform: self.parse_if(true)?,
                }
            } else if self.token.is_keyword(Keyword::Switch) {
                NamedTransform {
                    name: None,
                    transform: self.parse_switch(true)?,
                }
            } else {
                let name = if self.token.is_symbol('.') {
                    self.advance()?;
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                self.expect(TokenKind::LeftArrow)?;
                let transform = self.parse_transform()?;
                self.expect_symbol(';')?;
                NamedTransform { name, transform }
            };
            self.push(&mut members, member)?;
        }
        Ok(Transform::new_struct(members))
    }

    /// A transform without composition.
    fn parse_atom(&mut self) -> Result<Transform, CompileError> {
        self.nested(Self::parse_atom_kind)
    }

    fn parse_atom_kind(&mut self) -> Result<Transform, CompileError> {
        match &self.token.kind {
            TokenKind::Identifier(_) => self.parse_invocation(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(false),
            TokenKind::Keyword(Keyword::Struct) => {
                self.advance()?;
                self.expect_symbol('{')?;
                let transform = self.parse_struct_body()?;
                self.expect_symbol('}')?;
                Ok(transform)
            }
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(false),
            _ => Err(self.syntax_error("unexpected (transform expected)")),
        }
    }

    fn parse_transform(&mut self) -> Result<Transform, CompileError> {
        let first = self.parse_atom()?;
        if self.token.kind != TokenKind::LeftArrow {
            return Ok(first);
        }
        let mut stages = Vec::new();
        self.push(&mut stages, first)?;
        while self.token.kind == TokenKind::LeftArrow {
            self.advance()?;
            let stage = self.parse_atom()?;
            self.push(&mut stages, stage)?;
        }
        Ok(Transform::composed(stages))
    }

    // ==================== Definitions ====================

    fn parse_definition(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Transform)?;
        let name = self.expect_identifier()?;

        let mut params = Vec::new();
        if self.token.is_symbol('(') {
            self.advance()?;
            while !self.token.is_symbol(')') {
                if !params.is_empty() {
                    self.expect_symbol(',')?;
                }
                let param = self.expect_identifier()?;
                self.push(&mut params, param)?;
            }
            self.expect_symbol(')')?;
        }

        self.params = params;
        let body = self.parse_definition_body();
        let num_params = std::mem::take(&mut self.params).len();
        let mut transform = body?;
        if num_params > 0 {
            transform = Transform::with_params(transform, num_params);
        }

        debug!(name = %name, num_params, "defined transform");
        if let Err(e) = self.symbols.define(name, transform) {
            return Err(self.error(e));
        }
        Ok(())
    }

    fn parse_definition_body(&mut self) -> Result<Transform, CompileError> {
        self.expect_symbol('=')?;
        let transform = self.parse_transform()?;
        self.expect_symbol(';')?;
        Ok(transform)
    }

    /// Look up `main` once the whole script has been read.
    fn resolve_main(self) -> Result<Transform, CompileError> {
        match self.symbols.resolve("main") {
            Some(main) => {
                debug!(definitions = self.symbols.len(), "resolved main");
                Ok(main)
            }
            None => {
                self.sink.report(&Diagnostic::MissingMain { file: self.file });
                Err(CompileError::MissingMain)
            }
        }
    }
}
