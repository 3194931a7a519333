//! Lexer for Sable source.
//!
//! The [`Lexer`] turns source text into a vector of [`Token`]s. Two decisions
//! need context the grammar alone cannot give:
//!
//! - an identifier that names a catalog type is lexed as
//!   [`TokenKind::TypeName`], using the type-name predicate supplied by the
//!   caller;
//! - a `/` opens a regex literal unless the previous token ends a value
//!   (see [`TokenKind::ends_value`]).

use sable_core::{ParseError, ParseErrorKind, Span};

use crate::cursor::{Cursor, is_ident_continue, is_ident_start};
use crate::kind::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}

/// Predicate telling type names from identifiers.
pub type TypeNames<'t> = &'t dyn Fn(&str) -> bool;

pub struct Lexer<'src, 't> {
    cursor: Cursor<'src>,
    is_type: TypeNames<'t>,
    previous: Option<TokenKind>,
}

impl<'src, 't> Lexer<'src, 't> {
    pub fn new(source: &'src str, is_type: TypeNames<'t>) -> Self {
        Self {
            cursor: Cursor::new(source),
            is_type,
            previous: None,
        }
    }

    /// Lex the whole source. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token<'src>>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            tokens.push(token);
            if token.kind == TokenKind::Eof {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'src>, ParseError> {
        self.skip_trivia()?;
        let start = self.start();
        let Some(c) = self.cursor.peek() else {
            return Ok(self.make(TokenKind::Eof, start));
        };
        let token = match c {
            '/' if !self.previous.is_some_and(TokenKind::ends_value) => self.scan_regex(start)?,
            '"' | '\'' => self.scan_string(c, start)?,
            c if c.is_ascii_digit() => self.scan_number(start),
            '.' if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.scan_number(start)
            }
            c if is_ident_start(c) => self.scan_identifier(start),
            _ => self.scan_operator(start)?,
        };
        self.previous = Some(token.kind);
        Ok(token)
    }

    fn start(&self) -> (u32, u32, u32) {
        (self.cursor.offset(), self.cursor.line(), self.cursor.column())
    }

    fn make(&self, kind: TokenKind, (offset, line, col): (u32, u32, u32)) -> Token<'src> {
        Token {
            kind,
            text: self.cursor.slice_from(offset),
            span: Span::at(offset, line, col, self.cursor.offset() - offset),
        }
    }

    fn error(
        &self,
        kind: ParseErrorKind,
        (offset, line, col): (u32, u32, u32),
        message: impl Into<String>,
    ) -> ParseError {
        let len = (self.cursor.offset() - offset).max(1);
        ParseError::new(kind, Span::at(offset, line, col, len), message)
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            self.cursor.eat('\u{FEFF}');
            self.cursor.eat_while(char::is_whitespace);
            if self.cursor.check_str("//") {
                self.cursor.eat_while(|c| c != '\n');
            } else if self.cursor.check_str("/*") {
                let start = self.start();
                self.cursor.eat_str("/*");
                loop {
                    if self.cursor.eat_str("*/") {
                        break;
                    }
                    if self.cursor.advance().is_none() {
                        return Err(self.error(
                            ParseErrorKind::UnterminatedComment,
                            start,
                            "block comment is never closed",
                        ));
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    /// A string literal in single or double quotes. Escapes are kept
    /// verbatim; the semantic builder unescapes them.
    fn scan_string(&mut self, quote: char, start: (u32, u32, u32)) -> Result<Token<'src>, ParseError> {
        self.cursor.advance();
        loop {
            match self.cursor.advance() {
                None => {
                    return Err(self.error(
                        ParseErrorKind::UnterminatedLiteral,
                        start,
                        "string literal is never closed",
                    ));
                }
                Some('\\') => {
                    self.cursor.advance();
                }
                Some(c) if c == quote => return Ok(self.make(TokenKind::StringLiteral, start)),
                Some(_) => {}
            }
        }
    }

    /// `/pattern/flags`. Flags are any trailing letters.
    fn scan_regex(&mut self, start: (u32, u32, u32)) -> Result<Token<'src>, ParseError> {
        self.cursor.advance();
        loop {
            match self.cursor.advance() {
                None | Some('\n') => {
                    return Err(self.error(
                        ParseErrorKind::UnterminatedLiteral,
                        start,
                        "regex literal is never closed",
                    ));
                }
                Some('\\') => {
                    self.cursor.advance();
                }
                Some('/') => break,
                Some(_) => {}
            }
        }
        self.cursor.eat_while(|c| c.is_ascii_alphabetic());
        Ok(self.make(TokenKind::RegexLiteral, start))
    }

    fn scan_number(&mut self, start: (u32, u32, u32)) -> Token<'src> {
        if self.cursor.check_str("0x") || self.cursor.check_str("0X") {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_hexdigit());
            self.eat_integer_suffix();
            return self.make(TokenKind::HexLiteral, start);
        }

        let int_part = self.cursor.eat_while(|c| c.is_ascii_digit());
        let mut decimal = false;
        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
            decimal = true;
        }
        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.cursor.peek_nth(1), Some('+' | '-')));
            if self.cursor.peek_nth(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.cursor.advance();
                if sign == 1 {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
                decimal = true;
            }
        }
        if matches!(self.cursor.peek(), Some('f' | 'F' | 'd' | 'D')) {
            self.cursor.advance();
            return self.make(TokenKind::DecimalLiteral, start);
        }
        if decimal {
            return self.make(TokenKind::DecimalLiteral, start);
        }

        self.eat_integer_suffix();
        let octal = int_part.len() > 1
            && int_part.starts_with('0')
            && int_part.bytes().all(|b| (b'0'..=b'7').contains(&b));
        let kind = if octal {
            TokenKind::OctalLiteral
        } else {
            TokenKind::IntegerLiteral
        };
        self.make(kind, start)
    }

    fn eat_integer_suffix(&mut self) {
        if matches!(self.cursor.peek(), Some('l' | 'L')) {
            self.cursor.advance();
        }
    }

    fn scan_identifier(&mut self, start: (u32, u32, u32)) -> Token<'src> {
        let text = self.cursor.eat_while(is_ident_continue);
        let kind = match TokenKind::keyword(text) {
            Some(keyword) => keyword,
            None if (self.is_type)(text) => TokenKind::TypeName,
            None => TokenKind::Identifier,
        };
        self.make(kind, start)
    }

    fn scan_operator(&mut self, start: (u32, u32, u32)) -> Result<Token<'src>, ParseError> {
        // Longest match first.
        const OPERATORS: &[(&str, TokenKind)] = &[
            (">>>=", TokenKind::UshrAssign),
            (">>>", TokenKind::Ushr),
            ("===", TokenKind::EqEqEq),
            ("!==", TokenKind::NotEqEq),
            ("==~", TokenKind::Match),
            ("<<=", TokenKind::ShlAssign),
            (">>=", TokenKind::ShrAssign),
            ("==", TokenKind::EqEq),
            ("!=", TokenKind::NotEq),
            ("=~", TokenKind::Find),
            ("<=", TokenKind::LtEq),
            (">=", TokenKind::GtEq),
            ("<<", TokenKind::Shl),
            (">>", TokenKind::Shr),
            ("&&", TokenKind::AmpAmp),
            ("||", TokenKind::PipePipe),
            ("++", TokenKind::PlusPlus),
            ("--", TokenKind::MinusMinus),
            ("+=", TokenKind::PlusAssign),
            ("-=", TokenKind::MinusAssign),
            ("*=", TokenKind::StarAssign),
            ("/=", TokenKind::SlashAssign),
            ("%=", TokenKind::PercentAssign),
            ("&=", TokenKind::AmpAssign),
            ("^=", TokenKind::CaretAssign),
            ("|=", TokenKind::PipeAssign),
            ("->", TokenKind::Arrow),
            ("::", TokenKind::DoubleColon),
            ("?.", TokenKind::NullSafeDot),
            ("?:", TokenKind::Elvis),
            ("{", TokenKind::LBrace),
            ("}", TokenKind::RBrace),
            ("[", TokenKind::LBrack),
            ("]", TokenKind::RBrack),
            ("(", TokenKind::LParen),
            (")", TokenKind::RParen),
            (".", TokenKind::Dot),
            (",", TokenKind::Comma),
            (";", TokenKind::Semicolon),
            (":", TokenKind::Colon),
            ("?", TokenKind::Question),
            ("+", TokenKind::Plus),
            ("-", TokenKind::Minus),
            ("*", TokenKind::Star),
            ("/", TokenKind::Slash),
            ("%", TokenKind::Percent),
            ("!", TokenKind::Bang),
            ("~", TokenKind::Tilde),
            ("<", TokenKind::Lt),
            (">", TokenKind::Gt),
            ("=", TokenKind::Assign),
            ("&", TokenKind::Amp),
            ("^", TokenKind::Caret),
            ("|", TokenKind::Pipe),
        ];

        for (text, kind) in OPERATORS {
            if self.cursor.eat_str(text) {
                return Ok(self.make(*kind, start));
            }
        }
        let c = self.cursor.advance().unwrap_or_default();
        Err(self.error(
            ParseErrorKind::UnexpectedChar,
            start,
            format!("unexpected character '{c}'"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let is_type = |name: &str| matches!(name, "int" | "String" | "List");
        Lexer::new(source, &is_type)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn type_names_are_classified() {
        assert_eq!(
            kinds("int x; def y; List z"),
            vec![
                TokenKind::TypeName,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Def,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::TypeName,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn slash_after_value_divides() {
        assert_eq!(
            kinds("a / b"),
            vec![TokenKind::Identifier, TokenKind::Slash, TokenKind::Identifier, TokenKind::Eof]
        );
        assert_eq!(
            kinds("x =~ /ab+c/i"),
            vec![TokenKind::Identifier, TokenKind::Find, TokenKind::RegexLiteral, TokenKind::Eof]
        );
    }

    #[test]
    fn regex_text_keeps_flags() {
        let none = |_: &str| false;
        let tokens = Lexer::new("/a\\/b/im", &none).tokenize().unwrap();
        assert_eq!(tokens[0].text, "/a\\/b/im");
    }

    #[test]
    fn numeric_literal_kinds() {
        assert_eq!(
            kinds("0x1F 017 0 12L 1.5 2f 3e4"),
            vec![
                TokenKind::HexLiteral,
                TokenKind::OctalLiteral,
                TokenKind::IntegerLiteral,
                TokenKind::IntegerLiteral,
                TokenKind::DecimalLiteral,
                TokenKind::DecimalLiteral,
                TokenKind::DecimalLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            kinds("a >>>= b ==~ c ?. d ?: e"),
            vec![
                TokenKind::Identifier,
                TokenKind::UshrAssign,
                TokenKind::Identifier,
                TokenKind::Match,
                TokenKind::Identifier,
                TokenKind::NullSafeDot,
                TokenKind::Identifier,
                TokenKind::Elvis,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n /* block */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let none = |_: &str| false;
        let err = Lexer::new("'abc", &none).tokenize().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedLiteral);
    }

    #[test]
    fn spans_record_offsets() {
        let none = |_: &str| false;
        let tokens = Lexer::new("a\n  bc", &none).tokenize().unwrap();
        assert_eq!(tokens[1].span, Span::at(4, 2, 3, 2));
    }
}
