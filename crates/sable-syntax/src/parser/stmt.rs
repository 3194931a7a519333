//! Statement parsing.

use sable_core::ParseError;

use super::{PResult, Parser, describe};
use crate::kind::{SyntaxKind, TokenKind};

impl<'src, 'a> Parser<'src, 'a> {
    pub(crate) fn parse_statement(&mut self) -> PResult {
        match self.peek_kind(0) {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do(),
            TokenKind::For => self.parse_for(),
            TokenKind::Try => self.parse_try(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Semicolon => {
                self.start(SyntaxKind::Empty);
                self.bump();
                self.finish();
                Ok(())
            }
            TokenKind::Return => {
                self.start(SyntaxKind::Return);
                self.bump();
                if !self.check(TokenKind::Semicolon) && !self.check(TokenKind::Eof) {
                    self.parse_expression()?;
                }
                self.terminator()?;
                self.finish();
                Ok(())
            }
            TokenKind::Throw => {
                self.start(SyntaxKind::Throw);
                self.bump();
                self.parse_expression()?;
                self.terminator()?;
                self.finish();
                Ok(())
            }
            TokenKind::Break | TokenKind::Continue => {
                let kind = if self.check(TokenKind::Break) {
                    SyntaxKind::Break
                } else {
                    SyntaxKind::Continue
                };
                self.start(kind);
                self.bump();
                self.terminator()?;
                self.finish();
                Ok(())
            }
            _ if self.at_declaration() => self.parse_declaration(),
            _ => {
                self.start(SyntaxKind::ExprStatement);
                self.parse_expression()?;
                self.terminator()?;
                self.finish();
                Ok(())
            }
        }
    }

    /// `decltype ID` starts a declaration.
    fn at_declaration(&self) -> bool {
        self.decltype_len(0)
            .is_some_and(|n| self.peek_kind(n) == TokenKind::Identifier)
    }

    fn parse_declaration(&mut self) -> PResult {
        self.parse_declaration_list()?;
        self.terminator()?;
        self.finish();
        Ok(())
    }

    /// Declaration without its terminator; leaves the node open.
    fn parse_declaration_list(&mut self) -> PResult {
        self.start(SyntaxKind::Declaration);
        self.parse_decltype()?;
        loop {
            self.start(SyntaxKind::DeclVar);
            self.expect_identifier()?;
            if self.eat(TokenKind::Assign) {
                self.parse_expression()?;
            }
            self.finish();
            if !self.eat(TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    pub(crate) fn parse_block(&mut self) -> PResult {
        self.start(SyntaxKind::Block);
        self.expect(TokenKind::LBrace)?;
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                self.expect(TokenKind::RBrace)?;
            }
            self.parse_statement()?;
        }
        self.bump();
        self.finish();
        Ok(())
    }

    fn parse_condition(&mut self) -> PResult {
        self.expect(TokenKind::LParen)?;
        self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(())
    }

    /// Loop and branch bodies; a bare `;` is an empty body.
    fn parse_trailer(&mut self) -> PResult {
        self.parse_statement()
    }

    fn parse_if(&mut self) -> PResult {
        self.start(SyntaxKind::If);
        self.bump();
        self.parse_condition()?;
        self.parse_trailer()?;
        if self.eat(TokenKind::Else) {
            self.parse_trailer()?;
        }
        self.finish();
        Ok(())
    }

    fn parse_while(&mut self) -> PResult {
        self.start(SyntaxKind::While);
        self.bump();
        self.parse_condition()?;
        self.parse_trailer()?;
        self.finish();
        Ok(())
    }

    fn parse_do(&mut self) -> PResult {
        self.start(SyntaxKind::Do);
        self.bump();
        self.parse_block()?;
        self.expect(TokenKind::While)?;
        self.parse_condition()?;
        self.terminator()?;
        self.finish();
        Ok(())
    }

    fn parse_for(&mut self) -> PResult {
        // Shape is decided by lookahead past `for (`.
        let typed_each = self
            .decltype_len(2)
            .is_some_and(|n| self.peek_kind(2 + n) == TokenKind::Identifier && self.peek_kind(3 + n) == TokenKind::Colon);
        let untyped_each =
            self.peek_kind(2) == TokenKind::Identifier && self.peek_kind(3) == TokenKind::In;
        if typed_each || untyped_each {
            return self.parse_each(typed_each);
        }

        self.start(SyntaxKind::For);
        self.bump();
        self.expect(TokenKind::LParen)?;

        self.start(SyntaxKind::ForInit);
        if self.at_declaration() {
            self.parse_declaration_list()?;
            self.finish();
        } else {
            self.parse_expression_list(TokenKind::Semicolon)?;
        }
        self.finish();
        self.expect(TokenKind::Semicolon)?;

        self.start(SyntaxKind::ForCond);
        if !self.check(TokenKind::Semicolon) {
            self.parse_expression()?;
        }
        self.finish();
        self.expect(TokenKind::Semicolon)?;

        self.start(SyntaxKind::ForUpdate);
        self.parse_expression_list(TokenKind::RParen)?;
        self.finish();
        self.expect(TokenKind::RParen)?;

        self.parse_trailer()?;
        self.finish();
        Ok(())
    }

    /// `for (Type x : iterable)` or `for (x in iterable)`.
    fn parse_each(&mut self, typed: bool) -> PResult {
        self.start(if typed { SyntaxKind::Each } else { SyntaxKind::InEach });
        self.bump();
        self.expect(TokenKind::LParen)?;
        if typed {
            self.parse_decltype()?;
        }
        self.expect_identifier()?;
        self.bump();
        self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        self.parse_trailer()?;
        self.finish();
        Ok(())
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> PResult {
        if self.check(end) {
            return Ok(());
        }
        loop {
            self.parse_expression()?;
            if !self.eat(TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    fn parse_try(&mut self) -> PResult {
        self.start(SyntaxKind::Try);
        self.bump();
        self.parse_block()?;
        if !self.check(TokenKind::Catch) {
            let found = self.peek();
            return Err(ParseError::expected_token(found.span, "'catch'", &describe(found)));
        }
        while self.check(TokenKind::Catch) {
            self.start(SyntaxKind::Trap);
            self.bump();
            self.expect(TokenKind::LParen)?;
            self.parse_decltype()?;
            self.expect_identifier()?;
            self.expect(TokenKind::RParen)?;
            self.parse_block()?;
            self.finish();
        }
        self.finish();
        Ok(())
    }
}
