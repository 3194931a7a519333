//! Unified error types for Sable.
//!
//! ## Error Hierarchy
//!
//! ```text
//! Error (top-level wrapper)
//! ├── ParseError        - reference front end (lexing and parsing)
//! ├── RegistrationError - catalog construction
//! ├── CompilationError  - user-facing semantic errors, always with a location
//! └── InternalError     - compiler defects; never caused by valid user input
//! ```
//!
//! User-facing and internal errors are distinct types so a host can report
//! the former to script authors and treat the latter as bugs.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// An unexpected character was encountered by the lexer.
    UnexpectedChar,
    /// A string or regex literal was not terminated.
    UnterminatedLiteral,
    /// A block comment was not terminated.
    UnterminatedComment,
    /// A specific token was expected but not found.
    ExpectedToken,
    /// An unexpected token was encountered.
    UnexpectedToken,
    /// Unexpected end of input.
    UnexpectedEof,
    /// An expression was expected.
    ExpectedExpression,
    /// A type was expected.
    ExpectedType,
    /// An identifier was expected.
    ExpectedIdentifier,
    /// A statement terminator was omitted in picky mode.
    MissingSemicolon,
    /// Invalid escape sequence in a string literal.
    InvalidEscapeSequence,
}

impl ParseErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::UnexpectedChar => "unexpected character",
            ParseErrorKind::UnterminatedLiteral => "unterminated literal",
            ParseErrorKind::UnterminatedComment => "unterminated comment",
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::MissingSemicolon => "missing semicolon",
            ParseErrorKind::InvalidEscapeSequence => "invalid escape sequence",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parse error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct ParseError {
    /// The category of this error.
    pub kind: ParseErrorKind,
    /// The source location where the error occurred.
    pub span: Span,
    /// A detailed error message.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Create an "expected token" error.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    /// Create an "unexpected token" error.
    pub fn unexpected_token(span: Span, token: &str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedToken,
            span,
            format!("unexpected token: {token}"),
        )
    }

    /// Create an "expected expression" error.
    pub fn expected_expression(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedExpression,
            span,
            format!("expected expression, found {found}"),
        )
    }

    /// Format the error with the offending source line and a caret.
    pub fn display_with_source(&self, source: &str) -> String {
        let mut output = format!("Error at {}: {}\n", self.span, self.kind);
        if !self.message.is_empty() {
            output.push_str(&format!("  {}\n", self.message));
        }
        if let Some(line_text) = source.lines().nth((self.span.line as usize).saturating_sub(1)) {
            output.push_str("  |\n");
            output.push_str(&format!("{:>3} | {}\n", self.span.line, line_text));
            let indent = " ".repeat((self.span.col as usize).saturating_sub(1));
            let pointer = if self.span.len <= 1 {
                "^".to_string()
            } else {
                "^".to_string() + &"~".repeat((self.span.len - 1) as usize)
            };
            output.push_str(&format!("  | {indent}{pointer}\n"));
        }
        output
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors that occur while building a type catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// A referenced type was not found.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// The same member signature was registered twice.
    #[error("duplicate member: {type_name}.{member}")]
    DuplicateMember { type_name: String, member: String },

    /// The type is invalid or malformed.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// The inheritance graph contains a cycle.
    #[error("inheritance cycle involving {0}")]
    InheritanceCycle(String),

    /// A functional interface does not name exactly one of its methods.
    #[error("functional interface {type_name}: {reason}")]
    InvalidFunctionalInterface { type_name: String, reason: String },
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// User-facing errors found while compiling a script.
///
/// Every variant carries the location of the offending construct.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    #[error("at {span}: unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    #[error("at {span}: unknown variable '{name}'")]
    UnknownVariable { name: String, span: Span },

    #[error("at {span}: unknown call '{name}' with {arity} arguments")]
    UnknownFunction {
        name: String,
        arity: usize,
        span: Span,
    },

    #[error("at {span}: unknown field '{field}' on type '{type_name}'")]
    UnknownField {
        field: String,
        type_name: String,
        span: Span,
    },

    #[error("at {span}: unknown method '{method}' with {arity} arguments on type '{type_name}'")]
    UnknownMethod {
        method: String,
        type_name: String,
        arity: usize,
        span: Span,
    },

    #[error("at {span}: unknown constructor for '{type_name}' with {arity} arguments")]
    UnknownConstructor {
        type_name: String,
        arity: usize,
        span: Span,
    },

    #[error("at {span}: no matching overload for '{name}({args})' among {candidates} candidates")]
    NoMatchingOverload {
        name: String,
        args: String,
        candidates: usize,
        span: Span,
    },

    #[error("at {span}: ambiguous call to '{name}': {candidates} candidates match equally well")]
    AmbiguousOverload {
        name: String,
        candidates: usize,
        span: Span,
    },

    #[error("at {span}: cannot cast from '{from}' to '{to}'")]
    InvalidCast { from: String, to: String, span: Span },

    #[error("at {span}: {message}")]
    TypeMismatch { message: String, span: Span },

    #[error("at {span}: {message}")]
    InvalidOperation { message: String, span: Span },

    #[error("at {span}: invalid constant: {message}")]
    InvalidConstant { message: String, span: Span },

    #[error("at {span}: variable '{name}' is already defined")]
    VariableRedeclaration { name: String, span: Span },

    #[error("at {span}: function '{name}' with {arity} parameters is already defined")]
    DuplicateFunction {
        name: String,
        arity: usize,
        span: Span,
    },

    #[error("at {span}: '{name}' is read-only")]
    ReadOnly { name: String, span: Span },

    #[error("at {span}: not a statement")]
    NotAStatement { span: Span },

    #[error("at {span}: unreachable statement")]
    UnreachableStatement { span: Span },

    #[error("at {span}: extraneous {construct}: condition is always {value}")]
    ExtraneousStatement {
        construct: &'static str,
        value: bool,
        span: Span,
    },

    #[error("at {span}: not all paths provide a return value for '{function}'")]
    MissingReturn { function: String, span: Span },

    #[error("at {span}: break outside of a loop")]
    BreakOutsideLoop { span: Span },

    #[error("at {span}: continue outside of a loop")]
    ContinueOutsideLoop { span: Span },

    #[error("at {span}: type '{type_name}' is not throwable")]
    NotThrowable { type_name: String, span: Span },

    #[error("at {span}: regexes are disabled")]
    RegexesDisabled { span: Span },

    #[error("at {span}: invalid regex flag '{flag}'")]
    InvalidRegexFlag { flag: char, span: Span },

    #[error("at {span}: invalid function reference: {message}")]
    InvalidFunctionRef { message: String, span: Span },

    #[error("at {span}: invalid lambda: {message}")]
    InvalidLambda { message: String, span: Span },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnknownType { span, .. }
            | CompilationError::UnknownVariable { span, .. }
            | CompilationError::UnknownFunction { span, .. }
            | CompilationError::UnknownField { span, .. }
            | CompilationError::UnknownMethod { span, .. }
            | CompilationError::UnknownConstructor { span, .. }
            | CompilationError::NoMatchingOverload { span, .. }
            | CompilationError::AmbiguousOverload { span, .. }
            | CompilationError::InvalidCast { span, .. }
            | CompilationError::TypeMismatch { span, .. }
            | CompilationError::InvalidOperation { span, .. }
            | CompilationError::InvalidConstant { span, .. }
            | CompilationError::VariableRedeclaration { span, .. }
            | CompilationError::DuplicateFunction { span, .. }
            | CompilationError::ReadOnly { span, .. }
            | CompilationError::NotAStatement { span }
            | CompilationError::UnreachableStatement { span }
            | CompilationError::ExtraneousStatement { span, .. }
            | CompilationError::MissingReturn { span, .. }
            | CompilationError::BreakOutsideLoop { span }
            | CompilationError::ContinueOutsideLoop { span }
            | CompilationError::NotThrowable { span, .. }
            | CompilationError::RegexesDisabled { span }
            | CompilationError::InvalidRegexFlag { span, .. }
            | CompilationError::InvalidFunctionRef { span, .. }
            | CompilationError::InvalidLambda { span, .. } => *span,
        }
    }
}

// ============================================================================
// Internal Errors
// ============================================================================

/// A compiler defect: an impossible tree shape or a broken phase contract.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("internal compiler error: {message}")]
pub struct InternalError {
    pub message: String,
    pub span: Option<Span>,
}

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    /// Attach the location of the node being processed.
    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

// ============================================================================
// Unified Error
// ============================================================================

/// Which phase, and therefore which audience, an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Registration,
    Compile,
    Internal,
}

/// Top-level error wrapping every phase.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) => ErrorKind::Syntax,
            Error::Registration(_) => ErrorKind::Registration,
            Error::Compilation(_) => ErrorKind::Compile,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error should be shown to the script author.
    pub fn is_user_facing(&self) -> bool {
        matches!(self.kind(), ErrorKind::Syntax | ErrorKind::Compile)
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse(e) => Some(e.span),
            Error::Registration(_) => None,
            Error::Compilation(e) => Some(e.span()),
            Error::Internal(e) => e.span,
        }
    }
}

/// Result alias used across the compiler.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_errors_carry_location() {
        let err = CompilationError::UnknownVariable {
            name: "x".into(),
            span: Span::new(2, 7, 1),
        };
        assert_eq!(err.span(), Span::new(2, 7, 1));
        assert_eq!(err.to_string(), "at 2:7: unknown variable 'x'");
    }

    #[test]
    fn ambiguity_names_candidate_count() {
        let err = CompilationError::AmbiguousOverload {
            name: "max".into(),
            candidates: 3,
            span: Span::new(1, 1, 3),
        };
        assert!(err.to_string().contains("3 candidates"));
    }

    #[test]
    fn internal_errors_are_not_user_facing() {
        let internal: Error = InternalError::new("bad tree").at(Span::new(1, 2, 0)).into();
        assert_eq!(internal.kind(), ErrorKind::Internal);
        assert!(!internal.is_user_facing());
        assert_eq!(internal.span(), Some(Span::new(1, 2, 0)));

        let user: Error = CompilationError::NotAStatement {
            span: Span::new(1, 1, 1),
        }
        .into();
        assert!(user.is_user_facing());
    }

    #[test]
    fn parse_error_display_with_source() {
        let err = ParseError::expected_token(Span::new(1, 5, 2), "';'", "'}'");
        let rendered = err.display_with_source("int x }");
        assert!(rendered.contains("  1 | int x }"));
        assert!(rendered.contains("    ^~"));
    }
}
