//! Recursive-descent parser producing [`SyntaxNode`] trees.
//!
//! The parser stops at the first error; syntax errors in scripts are
//! reported, never recovered from.

mod expr;
mod stmt;

use bumpalo::Bump;
use sable_core::{InternalError, ParseError, ParseErrorKind};

use crate::kind::{SyntaxKind, TokenKind};
use crate::lexer::{Lexer, Token, TypeNames};
use crate::tree::{Checkpoint, SyntaxNode, TreeBuilder};

/// Options for the reference front end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject the final statement when its semicolon is omitted.
    pub picky: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<SyntaxError> for sable_core::Error {
    fn from(err: SyntaxError) -> Self {
        match err {
            SyntaxError::Parse(e) => e.into(),
            SyntaxError::Internal(e) => e.into(),
        }
    }
}

pub(crate) type PResult<T = ()> = Result<T, ParseError>;

pub struct Parser<'src, 'a> {
    tokens: Vec<Token<'src>>,
    position: usize,
    builder: TreeBuilder<'a>,
    options: ParseOptions,
}

impl<'src, 'a> Parser<'src, 'a> {
    pub fn new(
        source: &'src str,
        arena: &'a Bump,
        type_names: TypeNames<'_>,
        options: ParseOptions,
    ) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source, type_names).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            builder: TreeBuilder::new(arena),
            options,
        })
    }

    /// Parse a whole script: function definitions first, then statements.
    pub fn parse_source(mut self) -> Result<&'a SyntaxNode<'a>, SyntaxError> {
        tracing::trace!(tokens = self.tokens.len(), "parsing source");
        self.builder.start_node(SyntaxKind::Source);
        while self.at_function() {
            self.parse_function()?;
        }
        while !self.check(TokenKind::Eof) {
            self.parse_statement()?;
        }
        self.builder.finish_node();
        Ok(self.builder.finish()?)
    }

    // ========================================================================
    // Token Navigation
    // ========================================================================

    pub(crate) fn peek(&self) -> Token<'src> {
        self.peek_nth(0)
    }

    pub(crate) fn peek_nth(&self, n: usize) -> Token<'src> {
        let index = (self.position + n).min(self.tokens.len().saturating_sub(1));
        self.tokens[index]
    }

    pub(crate) fn peek_kind(&self, n: usize) -> TokenKind {
        self.peek_nth(n).kind
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume the current token into the current node.
    pub(crate) fn bump(&mut self) -> Token<'src> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        self.builder.token(token.kind, token.text, token.span);
        token
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> PResult<Token<'src>> {
        if self.check(kind) {
            return Ok(self.bump());
        }
        let found = self.peek();
        let kind_of_error = if found.kind == TokenKind::Eof {
            ParseErrorKind::UnexpectedEof
        } else {
            ParseErrorKind::ExpectedToken
        };
        Err(ParseError::new(
            kind_of_error,
            found.span,
            format!("expected {kind:?}, found {}", describe(found)),
        ))
    }

    pub(crate) fn expect_identifier(&mut self) -> PResult<Token<'src>> {
        if self.check(TokenKind::Identifier) {
            return Ok(self.bump());
        }
        let found = self.peek();
        Err(ParseError::new(
            ParseErrorKind::ExpectedIdentifier,
            found.span,
            format!("expected identifier, found {}", describe(found)),
        ))
    }

    /// A statement terminator. The last statement of the source may omit it
    /// unless the parser is picky.
    pub(crate) fn terminator(&mut self) -> PResult {
        if self.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        let found = self.peek();
        if found.kind == TokenKind::Eof {
            if !self.options.picky {
                return Ok(());
            }
            return Err(ParseError::new(
                ParseErrorKind::MissingSemicolon,
                found.span,
                "the final statement must end with ';'",
            ));
        }
        Err(ParseError::expected_token(found.span, "';'", &describe(found)))
    }

    // ========================================================================
    // Tree Building
    // ========================================================================

    pub(crate) fn start(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind);
    }

    pub(crate) fn finish(&mut self) {
        self.builder.finish_node();
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        self.builder.checkpoint()
    }

    pub(crate) fn start_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind);
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// `decltype ID (` starts a function definition.
    fn at_function(&self) -> bool {
        self.decltype_len(0)
            .is_some_and(|n| self.peek_kind(n) == TokenKind::Identifier && self.peek_kind(n + 1) == TokenKind::LParen)
    }

    /// Token length of a declared type starting `offset` tokens ahead.
    pub(crate) fn decltype_len(&self, offset: usize) -> Option<usize> {
        if !matches!(self.peek_kind(offset), TokenKind::TypeName | TokenKind::Def) {
            return None;
        }
        let mut n = offset + 1;
        while self.peek_kind(n) == TokenKind::LBrack && self.peek_kind(n + 1) == TokenKind::RBrack {
            n += 2;
        }
        Some(n - offset)
    }

    pub(crate) fn parse_decltype(&mut self) -> PResult {
        let Some(len) = self.decltype_len(0) else {
            let found = self.peek();
            return Err(ParseError::new(
                ParseErrorKind::ExpectedType,
                found.span,
                format!("expected a type, found {}", describe(found)),
            ));
        };
        self.start(SyntaxKind::DeclType);
        for _ in 0..len {
            self.bump();
        }
        self.finish();
        Ok(())
    }

    fn parse_function(&mut self) -> PResult {
        self.start(SyntaxKind::Function);
        self.parse_decltype()?;
        self.expect_identifier()?;
        self.start(SyntaxKind::Parameters);
        self.expect(TokenKind::LParen)?;
        if !self.check(TokenKind::RParen) {
            loop {
                self.start(SyntaxKind::Param);
                self.parse_decltype()?;
                self.expect_identifier()?;
                self.finish();
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.finish();
        self.parse_block()?;
        self.finish();
        Ok(())
    }
}

pub(crate) fn describe(token: Token<'_>) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        _ => format!("'{}'", token.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn parse_with(source: &str, options: ParseOptions) -> Result<String, SyntaxError> {
        let arena = Bump::new();
        let is_type = |name: &str| {
            matches!(
                name,
                "void" | "int" | "long" | "double" | "boolean" | "String" | "List" | "ArrayList"
                    | "Map" | "Math" | "Integer" | "Exception"
            )
        };
        let parser = Parser::new(source, &arena, &is_type, options)?;
        Ok(parser.parse_source()?.dump())
    }

    pub(crate) fn parse(source: &str) -> String {
        parse_with(source, ParseOptions::default()).unwrap()
    }

    #[test]
    fn functions_precede_statements() {
        let dump = parse("int twice(int x) { return x * 2; } twice(3)");
        let mut lines = dump.lines();
        assert_eq!(lines.next(), Some("Source"));
        assert_eq!(lines.next(), Some("  Function"));
        assert!(dump.contains("  ExprStatement\n    CallLocal"));
    }

    #[test]
    fn final_semicolon_is_optional_unless_picky() {
        assert!(parse_with("int x = 1", ParseOptions::default()).is_ok());
        let err = parse_with("int x = 1", ParseOptions { picky: true }).unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::Parse(ParseError { kind: ParseErrorKind::MissingSemicolon, .. })
        ));
        assert!(parse_with("int x = 1; x", ParseOptions { picky: true }).is_err());
    }

    #[test]
    fn inner_semicolons_are_required() {
        let err = parse_with("int x = 1 int y = 2;", ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::Parse(ParseError { kind: ParseErrorKind::ExpectedToken, .. })
        ));
    }

    #[test]
    fn array_return_types() {
        let dump = parse("int[] make() { return new int[2]; } make()");
        assert!(dump.contains("DeclType\n      TypeName \"int\"\n      LBrack \"[\"\n      RBrack \"]\""));
    }
}
