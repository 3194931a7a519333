//! Expression parsing.
//!
//! Precedence, loosest first: assignment, elvis `?:`, conditional `? :`,
//! binary operators by [`TokenKind::binary_precedence`], unary and casts,
//! postfix chains, primaries.

use sable_core::ParseError;

use super::{PResult, Parser, describe};
use crate::kind::{SyntaxKind, TokenKind};

impl<'src, 'a> Parser<'src, 'a> {
    pub(crate) fn parse_expression(&mut self) -> PResult {
        let checkpoint = self.checkpoint();
        self.parse_elvis()?;
        if self.peek_kind(0).is_assignment() {
            self.start_at(checkpoint, SyntaxKind::Assignment);
            self.bump();
            self.parse_expression()?;
            self.finish();
        }
        Ok(())
    }

    fn parse_elvis(&mut self) -> PResult {
        let checkpoint = self.checkpoint();
        self.parse_conditional()?;
        if self.check(TokenKind::Elvis) {
            self.start_at(checkpoint, SyntaxKind::Elvis);
            self.bump();
            self.parse_elvis()?;
            self.finish();
        }
        Ok(())
    }

    fn parse_conditional(&mut self) -> PResult {
        let checkpoint = self.checkpoint();
        self.parse_binary(1)?;
        if self.check(TokenKind::Question) {
            self.start_at(checkpoint, SyntaxKind::Conditional);
            self.bump();
            self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            self.parse_conditional()?;
            self.finish();
        }
        Ok(())
    }

    /// Precedence climbing over left-associative binary operators.
    fn parse_binary(&mut self, min_precedence: u8) -> PResult {
        let checkpoint = self.checkpoint();
        self.parse_unary()?;
        loop {
            let op = self.peek_kind(0);
            let Some(precedence) = op.binary_precedence() else {
                return Ok(());
            };
            if precedence < min_precedence {
                return Ok(());
            }
            if op == TokenKind::Instanceof {
                self.start_at(checkpoint, SyntaxKind::Instanceof);
                self.bump();
                self.parse_decltype()?;
                self.finish();
                continue;
            }
            self.start_at(checkpoint, SyntaxKind::Binary);
            self.bump();
            self.parse_binary(precedence + 1)?;
            self.finish();
        }
    }

    fn parse_unary(&mut self) -> PResult {
        match self.peek_kind(0) {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.start(SyntaxKind::Pre);
                self.bump();
                self.parse_unary()?;
                self.finish();
                Ok(())
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::Bang | TokenKind::Tilde => {
                self.start(SyntaxKind::Unary);
                self.bump();
                self.parse_unary()?;
                self.finish();
                Ok(())
            }
            TokenKind::LParen if self.at_cast() => {
                self.start(SyntaxKind::Cast);
                self.bump();
                self.parse_decltype()?;
                self.expect(TokenKind::RParen)?;
                self.parse_unary()?;
                self.finish();
                Ok(())
            }
            _ => self.parse_postfix(),
        }
    }

    /// `( decltype )` followed by something other than `->`.
    fn at_cast(&self) -> bool {
        self.decltype_len(1).is_some_and(|n| {
            self.peek_kind(1 + n) == TokenKind::RParen && self.peek_kind(2 + n) != TokenKind::Arrow
        })
    }

    fn parse_postfix(&mut self) -> PResult {
        let checkpoint = self.checkpoint();
        self.parse_primary()?;
        loop {
            match self.peek_kind(0) {
                TokenKind::Dot | TokenKind::NullSafeDot => {
                    let is_call = self.peek_kind(2) == TokenKind::LParen;
                    let kind = if is_call {
                        SyntaxKind::CallInvoke
                    } else {
                        SyntaxKind::FieldAccess
                    };
                    self.start_at(checkpoint, kind);
                    self.bump();
                    self.expect_member_name()?;
                    if is_call {
                        self.parse_arguments()?;
                    }
                    self.finish();
                }
                TokenKind::LBrack => {
                    self.start_at(checkpoint, SyntaxKind::BraceAccess);
                    self.bump();
                    self.parse_expression()?;
                    self.expect(TokenKind::RBrack)?;
                    self.finish();
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    self.start_at(checkpoint, SyntaxKind::Post);
                    self.bump();
                    self.finish();
                    return Ok(());
                }
                _ => return Ok(()),
            }
        }
    }

    /// Member names may coincide with type names, as in `x.List`.
    fn expect_member_name(&mut self) -> PResult {
        if self.check(TokenKind::TypeName) {
            self.bump();
            return Ok(());
        }
        self.expect_identifier().map(|_| ())
    }

    pub(crate) fn parse_arguments(&mut self) -> PResult {
        self.start(SyntaxKind::Arguments);
        self.expect(TokenKind::LParen)?;
        if !self.check(TokenKind::RParen) {
            loop {
                self.parse_expression()?;
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.finish();
        Ok(())
    }

    fn parse_primary(&mut self) -> PResult {
        let token = self.peek();
        match token.kind {
            TokenKind::LParen if self.at_lambda() => self.parse_lambda(),
            TokenKind::Identifier if self.peek_kind(1) == TokenKind::Arrow => self.parse_lambda(),
            TokenKind::LParen => {
                self.start(SyntaxKind::Paren);
                self.bump();
                self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                self.finish();
                Ok(())
            }
            kind if kind.is_numeric_literal() => self.leaf(SyntaxKind::Numeric),
            TokenKind::True | TokenKind::False => self.leaf(SyntaxKind::Boolean),
            TokenKind::Null => self.leaf(SyntaxKind::Null),
            TokenKind::StringLiteral => self.leaf(SyntaxKind::StringLit),
            TokenKind::RegexLiteral => self.leaf(SyntaxKind::RegexLit),
            TokenKind::LBrack => self.parse_collection(),
            TokenKind::Identifier if self.peek_kind(1) == TokenKind::LParen => {
                self.start(SyntaxKind::CallLocal);
                self.bump();
                self.parse_arguments()?;
                self.finish();
                Ok(())
            }
            TokenKind::Identifier => self.leaf(SyntaxKind::Variable),
            TokenKind::This if self.peek_kind(1) == TokenKind::DoubleColon => {
                self.start(SyntaxKind::FuncRef);
                self.bump();
                self.bump();
                self.expect_identifier()?;
                self.finish();
                Ok(())
            }
            TokenKind::TypeName | TokenKind::Def => self.parse_type_primary(),
            TokenKind::New => self.parse_new(),
            _ => Err(ParseError::expected_expression(token.span, &describe(token))),
        }
    }

    fn leaf(&mut self, kind: SyntaxKind) -> PResult {
        self.start(kind);
        self.bump();
        self.finish();
        Ok(())
    }

    /// `Type::method`, `Type[]::new`, or `Type.` static access.
    fn parse_type_primary(&mut self) -> PResult {
        if let Some(n) = self.decltype_len(0)
            && self.peek_kind(n) == TokenKind::DoubleColon
        {
            self.start(SyntaxKind::FuncRef);
            self.parse_decltype()?;
            self.bump();
            if !self.eat(TokenKind::New) {
                self.expect_identifier()?;
            }
            self.finish();
            return Ok(());
        }
        if self.check(TokenKind::TypeName) && self.peek_kind(1) == TokenKind::Dot {
            return self.leaf(SyntaxKind::StaticRef);
        }
        let token = self.peek();
        Err(ParseError::expected_expression(token.span, &describe(token)))
    }

    fn parse_new(&mut self) -> PResult {
        let Some(n) = self.decltype_len(1) else {
            self.start(SyntaxKind::NewObject);
            self.bump();
            let found = self.peek();
            return Err(ParseError::new(
                sable_core::ParseErrorKind::ExpectedType,
                found.span,
                format!("expected a type after 'new', found {}", describe(found)),
            ));
        };

        // new Type[] ... { elements }
        if n > 1 {
            self.start(SyntaxKind::NewInitializedArray);
            self.bump();
            self.parse_decltype()?;
            self.expect(TokenKind::LBrace)?;
            if !self.check(TokenKind::RBrace) {
                loop {
                    self.parse_expression()?;
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RBrace)?;
            self.finish();
            return Ok(());
        }

        // new Type[size]...[]
        if self.peek_kind(2) == TokenKind::LBrack {
            self.start(SyntaxKind::NewArray);
            self.bump();
            self.parse_decltype()?;
            while self.check(TokenKind::LBrack) && self.peek_kind(1) != TokenKind::RBrack {
                self.bump();
                self.parse_expression()?;
                self.expect(TokenKind::RBrack)?;
            }
            while self.check(TokenKind::LBrack) && self.peek_kind(1) == TokenKind::RBrack {
                self.bump();
                self.bump();
            }
            self.finish();
            return Ok(());
        }

        self.start(SyntaxKind::NewObject);
        self.bump();
        self.expect(TokenKind::TypeName)?;
        self.parse_arguments()?;
        self.finish();
        Ok(())
    }

    /// `[a, b]`, `[]`, `[k: v, ...]`, `[:]`.
    fn parse_collection(&mut self) -> PResult {
        if self.peek_kind(1) == TokenKind::Colon && self.peek_kind(2) == TokenKind::RBrack {
            self.start(SyntaxKind::MapInit);
            self.bump();
            self.bump();
            self.bump();
            self.finish();
            return Ok(());
        }
        // The node kind is known only after the first element, so tokens
        // collect in the parent and are adopted at the end.
        let checkpoint = self.checkpoint();
        self.bump();
        if self.eat(TokenKind::RBrack) {
            self.start_at(checkpoint, SyntaxKind::ListInit);
            self.finish();
            return Ok(());
        }

        let entry = self.checkpoint();
        self.parse_expression()?;
        if !self.check(TokenKind::Colon) {
            while self.eat(TokenKind::Comma) {
                self.parse_expression()?;
            }
            self.expect(TokenKind::RBrack)?;
            self.start_at(checkpoint, SyntaxKind::ListInit);
            self.finish();
            return Ok(());
        }

        self.start_at(entry, SyntaxKind::MapEntry);
        self.bump();
        self.parse_expression()?;
        self.finish();
        while self.eat(TokenKind::Comma) {
            self.start(SyntaxKind::MapEntry);
            self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            self.parse_expression()?;
            self.finish();
        }
        self.expect(TokenKind::RBrack)?;
        self.start_at(checkpoint, SyntaxKind::MapInit);
        self.finish();
        Ok(())
    }

    /// `(` ... `)` `->` ahead.
    fn at_lambda(&self) -> bool {
        let mut depth = 0usize;
        let mut n = 0;
        loop {
            match self.peek_kind(n) {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_kind(n + 1) == TokenKind::Arrow;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            n += 1;
        }
    }

    fn parse_lambda(&mut self) -> PResult {
        self.start(SyntaxKind::Lambda);
        if self.check(TokenKind::Identifier) {
            self.lambda_param()?;
        } else {
            self.bump();
            if !self.check(TokenKind::RParen) {
                loop {
                    self.lambda_param()?;
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        self.expect(TokenKind::Arrow)?;
        if self.check(TokenKind::LBrace) {
            self.parse_block()?;
        } else {
            self.parse_expression()?;
        }
        self.finish();
        Ok(())
    }

    fn lambda_param(&mut self) -> PResult {
        self.start(SyntaxKind::LambdaParam);
        if self.decltype_len(0).is_some() {
            self.parse_decltype()?;
        }
        self.expect_identifier()?;
        self.finish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::tests::parse;

    #[test]
    fn multiplication_nests_under_addition() {
        let dump = parse("a + b * c;");
        assert!(dump.contains("Binary\n      Variable"));
        assert!(dump.contains("Plus \"+\"\n      Binary"));
    }

    #[test]
    fn left_associative_subtraction() {
        let dump = parse("a - b - c;");
        assert!(dump.contains("ExprStatement\n    Binary\n      Binary"));
    }

    #[test]
    fn assignment_is_right_associative() {
        let dump = parse("a = b = 1;");
        assert!(dump.contains("Assign \"=\"\n      Assignment"));
    }

    #[test]
    fn casts_and_parens() {
        assert!(parse("(int) x;").contains("Cast"));
        assert!(parse("(x) + 1;").contains("Paren"));
    }

    #[test]
    fn postfix_chains_wrap_left_to_right() {
        let dump = parse("a.b[0].c(1)++;");
        assert!(dump.contains("Post\n      CallInvoke\n        BraceAccess\n          FieldAccess"));
    }

    #[test]
    fn static_refs_and_function_refs() {
        assert!(parse("Math.max(1, 2);").contains("CallInvoke\n      StaticRef"));
        assert!(parse("f(Integer::parseInt);").contains("FuncRef"));
        assert!(parse("f(this::g);").contains("FuncRef\n          This"));
        assert!(parse("f(int[]::new);").contains("New \"new\""));
    }

    #[test]
    fn lambdas() {
        assert!(parse("f(x -> x + 1);").contains("Lambda\n          LambdaParam"));
        assert!(parse("f((int a, b) -> { return a; });").contains("Block"));
        assert!(parse("f(() -> 1);").contains("Lambda"));
    }

    #[test]
    fn collection_literals() {
        assert!(parse("[1, 2, 3];").contains("ListInit"));
        assert!(parse("[];").contains("ListInit"));
        let map = parse("['a': 1, 'b': 2];");
        assert!(map.contains("MapInit"));
        assert_eq!(map.matches("MapEntry").count(), 2);
        assert!(!map.contains("ListInit"));
        assert!(parse("[:];").contains("MapInit"));
    }

    #[test]
    fn new_forms() {
        assert!(parse("new ArrayList();").contains("NewObject"));
        assert!(parse("new int[3][];").contains("NewArray"));
        assert!(parse("new int[] {1, 2};").contains("NewInitializedArray"));
    }

    #[test]
    fn conditional_and_elvis() {
        assert!(parse("a ? b : c;").contains("Conditional"));
        let dump = parse("a ?: b ? c : d;");
        assert!(dump.contains("Elvis\n      Variable"));
        assert!(dump.contains("Elvis \"?:\"\n      Conditional"));
    }

    #[test]
    fn instanceof_takes_a_type() {
        assert!(parse("x instanceof List;").contains("Instanceof\n      Variable"));
    }

    #[test]
    fn regex_operators() {
        assert!(parse("s =~ /a+/;").contains("RegexLit"));
        assert!(parse("a / b / c;").contains("Slash"));
    }
}
