//! Expression building.

use sable_syntax::{SyntaxKind, SyntaxNode, SyntaxToken, TokenKind};

use super::literal;
use super::{AstBuilder, BuildResult, child, exactly, identifier, internal, nth, token};
use crate::ast::{
    BinaryOp, BoolOp, CompareOp, Expr, ExprKind, IncDec, LambdaBody, LambdaParam, RefOwner,
    TypeName, UnaryOp,
};

impl AstBuilder {
    pub(crate) fn expression(&self, node: &SyntaxNode<'_>) -> BuildResult<Expr> {
        let kind = match node.kind {
            SyntaxKind::Paren => return self.expression(nth(node, 0)?),
            SyntaxKind::Assignment => {
                let nodes = exactly(node, 2)?;
                let op = operator(node, TokenKind::is_assignment)?;
                ExprKind::Assign {
                    target: Box::new(self.expression(nodes[0])?),
                    op: compound_op(op.kind),
                    value: Box::new(self.expression(nodes[1])?),
                }
            }
            SyntaxKind::Elvis => {
                let nodes = exactly(node, 2)?;
                ExprKind::Elvis {
                    left: Box::new(self.expression(nodes[0])?),
                    right: Box::new(self.expression(nodes[1])?),
                }
            }
            SyntaxKind::Conditional => {
                let nodes = exactly(node, 3)?;
                ExprKind::Conditional {
                    condition: Box::new(self.expression(nodes[0])?),
                    then: Box::new(self.expression(nodes[1])?),
                    otherwise: Box::new(self.expression(nodes[2])?),
                }
            }
            SyntaxKind::Binary => self.binary(node)?,
            SyntaxKind::Instanceof => ExprKind::Instanceof {
                expr: Box::new(self.expression(nth(node, 0)?)?),
                ty: self.decltype(child(node, SyntaxKind::DeclType)?)?,
            },
            SyntaxKind::Pre | SyntaxKind::Post => {
                let target = Box::new(self.expression(nth(node, 0)?)?);
                let op = match operator(node, |k| {
                    matches!(k, TokenKind::PlusPlus | TokenKind::MinusMinus)
                })?
                .kind
                {
                    TokenKind::PlusPlus => IncDec::Increment,
                    _ => IncDec::Decrement,
                };
                if node.kind == SyntaxKind::Pre {
                    ExprKind::Pre { op, target }
                } else {
                    ExprKind::Post { op, target }
                }
            }
            SyntaxKind::Unary => {
                let op = match node.first_token().map(|t| t.kind) {
                    Some(TokenKind::Minus) => UnaryOp::Neg,
                    Some(TokenKind::Plus) => UnaryOp::Plus,
                    Some(TokenKind::Bang) => UnaryOp::Not,
                    Some(TokenKind::Tilde) => UnaryOp::BitNot,
                    _ => return Err(internal(node, "unknown unary operator")),
                };
                ExprKind::Unary {
                    op,
                    operand: Box::new(self.expression(nth(node, 0)?)?),
                }
            }
            SyntaxKind::Cast => {
                let nodes = exactly(node, 2)?;
                ExprKind::Cast {
                    ty: self.decltype(nodes[0])?,
                    expr: Box::new(self.expression(nodes[1])?),
                }
            }
            SyntaxKind::Numeric => {
                let token = leaf(node)?;
                literal::numeric(token.kind, token.text)
                    .ok_or_else(|| internal(node, "malformed numeric literal"))?
            }
            SyntaxKind::Boolean => ExprKind::Boolean(leaf(node)?.kind == TokenKind::True),
            SyntaxKind::Null => ExprKind::Null,
            SyntaxKind::StringLit => ExprKind::Str(literal::unescape(leaf(node)?.text)),
            SyntaxKind::RegexLit => {
                let token = leaf(node)?;
                let (pattern, flags) = literal::regex(token.text, token.span)?;
                ExprKind::Regex { pattern, flags }
            }
            SyntaxKind::ListInit => ExprKind::ListInit(self.expressions(node)?),
            SyntaxKind::MapInit => ExprKind::MapInit(
                node.nodes()
                    .map(|entry| {
                        let pair = exactly(entry, 2)?;
                        Ok((self.expression(pair[0])?, self.expression(pair[1])?))
                    })
                    .collect::<BuildResult<Vec<_>>>()?,
            ),
            SyntaxKind::Variable => ExprKind::Variable(identifier(node)?),
            SyntaxKind::CallLocal => ExprKind::CallLocal {
                name: identifier(node)?,
                args: self.arguments(node)?,
            },
            SyntaxKind::StaticRef => {
                let name = token(node, TokenKind::TypeName)?;
                ExprKind::StaticRef(TypeName {
                    name: name.text.to_string(),
                    dims: 0,
                    span: name.span,
                })
            }
            SyntaxKind::NewObject => {
                let name = token(node, TokenKind::TypeName)?;
                ExprKind::NewObject {
                    ty: TypeName {
                        name: name.text.to_string(),
                        dims: 0,
                        span: name.span,
                    },
                    args: self.arguments(node)?,
                }
            }
            SyntaxKind::NewArray => {
                let ty = self.decltype(child(node, SyntaxKind::DeclType)?)?;
                let dims = node
                    .nodes()
                    .filter(|n| n.kind != SyntaxKind::DeclType)
                    .map(|e| self.expression(e))
                    .collect::<BuildResult<Vec<_>>>()?;
                let brackets = node.tokens().filter(|t| t.kind == TokenKind::LBrack).count();
                let extra_dims = brackets
                    .checked_sub(dims.len())
                    .and_then(|extra| u8::try_from(extra).ok())
                    .ok_or_else(|| internal(node, "array dimensions out of range"))?;
                if dims.is_empty() {
                    return Err(internal(node, "array allocation without a size"));
                }
                ExprKind::NewArray {
                    ty,
                    dims,
                    extra_dims,
                }
            }
            SyntaxKind::NewInitializedArray => ExprKind::NewInitializedArray {
                ty: self.decltype(child(node, SyntaxKind::DeclType)?)?,
                values: node
                    .nodes()
                    .filter(|n| n.kind != SyntaxKind::DeclType)
                    .map(|e| self.expression(e))
                    .collect::<BuildResult<Vec<_>>>()?,
            },
            SyntaxKind::Lambda => self.lambda(node)?,
            SyntaxKind::FuncRef => {
                let owner = if node.has_token(TokenKind::This) {
                    RefOwner::This
                } else {
                    RefOwner::Type(self.decltype(child(node, SyntaxKind::DeclType)?)?)
                };
                let name = if node.has_token(TokenKind::New) {
                    "new".to_string()
                } else {
                    identifier(node)?
                };
                ExprKind::FuncRef { owner, name }
            }
            SyntaxKind::FieldAccess => ExprKind::Field {
                receiver: Box::new(self.expression(nth(node, 0)?)?),
                name: member_name(node)?,
                null_safe: node.has_token(TokenKind::NullSafeDot),
            },
            SyntaxKind::CallInvoke => ExprKind::Call {
                receiver: Box::new(self.expression(nth(node, 0)?)?),
                name: member_name(node)?,
                args: self.arguments(node)?,
                null_safe: node.has_token(TokenKind::NullSafeDot),
            },
            SyntaxKind::BraceAccess => {
                let nodes = exactly(node, 2)?;
                ExprKind::Index {
                    receiver: Box::new(self.expression(nodes[0])?),
                    index: Box::new(self.expression(nodes[1])?),
                }
            }
            _ => return Err(internal(node, "not an expression node")),
        };
        Ok(Expr::new(kind, node.span))
    }

    fn expressions(&self, node: &SyntaxNode<'_>) -> BuildResult<Vec<Expr>> {
        node.nodes().map(|e| self.expression(e)).collect()
    }

    fn arguments(&self, node: &SyntaxNode<'_>) -> BuildResult<Vec<Expr>> {
        self.expressions(child(node, SyntaxKind::Arguments)?)
    }

    fn binary(&self, node: &SyntaxNode<'_>) -> BuildResult<ExprKind> {
        let nodes = exactly(node, 2)?;
        let op = operator(node, |k| k.binary_precedence().is_some())?;
        let left = Box::new(self.expression(nodes[0])?);
        let right = Box::new(self.expression(nodes[1])?);
        if let Some(op) = bool_op(op.kind) {
            return Ok(ExprKind::Bool { op, left, right });
        }
        if let Some(op) = compare_op(op.kind) {
            return Ok(ExprKind::Compare { op, left, right });
        }
        match arithmetic_op(op.kind) {
            Some(op) => Ok(ExprKind::Binary { op, left, right }),
            None => Err(internal(node, "unknown binary operator")),
        }
    }

    fn lambda(&self, node: &SyntaxNode<'_>) -> BuildResult<ExprKind> {
        let mut params = Vec::new();
        let mut body = None;
        for child_node in node.nodes() {
            match child_node.kind {
                SyntaxKind::LambdaParam => {
                    if body.is_some() {
                        return Err(internal(node, "lambda parameter after body"));
                    }
                    let ty = match child_node.child(SyntaxKind::DeclType) {
                        Some(decl) => Some(self.decltype(decl)?),
                        None => None,
                    };
                    params.push(LambdaParam {
                        ty,
                        name: identifier(child_node)?,
                        span: child_node.span,
                    });
                }
                SyntaxKind::Block => body = Some(LambdaBody::Block(self.block(child_node)?)),
                _ => body = Some(LambdaBody::Expr(Box::new(self.expression(child_node)?))),
            }
        }
        let body = body.ok_or_else(|| internal(node, "lambda without a body"))?;
        Ok(ExprKind::Lambda { params, body })
    }
}

fn leaf<'a>(node: &SyntaxNode<'a>) -> BuildResult<&'a SyntaxToken<'a>> {
    node.first_token()
        .ok_or_else(|| internal(node, "literal without a token"))
}

fn operator<'a>(
    node: &SyntaxNode<'a>,
    accept: impl Fn(TokenKind) -> bool,
) -> BuildResult<&'a SyntaxToken<'a>> {
    node.tokens()
        .find(|t| accept(t.kind))
        .ok_or_else(|| internal(node, "missing operator"))
}

/// The member name is the last identifier-like token.
fn member_name(node: &SyntaxNode<'_>) -> BuildResult<String> {
    node.tokens()
        .filter(|t| matches!(t.kind, TokenKind::Identifier | TokenKind::TypeName))
        .last()
        .map(|t| t.text.to_string())
        .ok_or_else(|| internal(node, "missing member name"))
}

fn bool_op(kind: TokenKind) -> Option<BoolOp> {
    match kind {
        TokenKind::AmpAmp => Some(BoolOp::And),
        TokenKind::PipePipe => Some(BoolOp::Or),
        _ => None,
    }
}

fn compare_op(kind: TokenKind) -> Option<CompareOp> {
    Some(match kind {
        TokenKind::EqEq => CompareOp::Eq,
        TokenKind::NotEq => CompareOp::Ne,
        TokenKind::EqEqEq => CompareOp::EqRef,
        TokenKind::NotEqEq => CompareOp::NeRef,
        TokenKind::Lt => CompareOp::Lt,
        TokenKind::LtEq => CompareOp::Le,
        TokenKind::Gt => CompareOp::Gt,
        TokenKind::GtEq => CompareOp::Ge,
        _ => return None,
    })
}

fn arithmetic_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::Ushr => BinaryOp::Ushr,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Find => BinaryOp::Find,
        TokenKind::Match => BinaryOp::Match,
        _ => return None,
    })
}

fn compound_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::PlusAssign => Some(BinaryOp::Add),
        TokenKind::MinusAssign => Some(BinaryOp::Sub),
        TokenKind::StarAssign => Some(BinaryOp::Mul),
        TokenKind::SlashAssign => Some(BinaryOp::Div),
        TokenKind::PercentAssign => Some(BinaryOp::Rem),
        TokenKind::AmpAssign => Some(BinaryOp::BitAnd),
        TokenKind::CaretAssign => Some(BinaryOp::BitXor),
        TokenKind::PipeAssign => Some(BinaryOp::BitOr),
        TokenKind::ShlAssign => Some(BinaryOp::Shl),
        TokenKind::ShrAssign => Some(BinaryOp::Shr),
        TokenKind::UshrAssign => Some(BinaryOp::Ushr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, CompareOp, Expr, ExprKind, IncDec, LambdaBody, RefOwner, StmtKind};
    use crate::builder::tests::build_ok;

    fn expr(source: &str) -> Expr {
        let source = build_ok(source);
        match source.statements.into_iter().last().map(|s| s.kind) {
            Some(StmtKind::Expr(expr)) => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn comparisons_and_boolean_operators() {
        assert!(matches!(
            expr("a == b").kind,
            ExprKind::Compare { op: CompareOp::Eq, .. }
        ));
        assert!(matches!(
            expr("a !== b").kind,
            ExprKind::Compare { op: CompareOp::NeRef, .. }
        ));
        assert!(matches!(expr("a && b").kind, ExprKind::Bool { .. }));
        assert!(matches!(
            expr("a >>> 2").kind,
            ExprKind::Binary { op: BinaryOp::Ushr, .. }
        ));
    }

    #[test]
    fn compound_assignments() {
        let ExprKind::Assign { op, .. } = expr("x += 1").kind else {
            panic!("expected assignment");
        };
        assert_eq!(op, Some(BinaryOp::Add));
        let ExprKind::Assign { op, .. } = expr("x = 1").kind else {
            panic!("expected assignment");
        };
        assert_eq!(op, None);
    }

    #[test]
    fn increments() {
        assert!(matches!(
            expr("++x").kind,
            ExprKind::Pre { op: IncDec::Increment, .. }
        ));
        assert!(matches!(
            expr("x--").kind,
            ExprKind::Post { op: IncDec::Decrement, .. }
        ));
    }

    #[test]
    fn member_access_and_calls() {
        let ExprKind::Call { name, args, null_safe, .. } = expr("a?.foo(1, 2)").kind else {
            panic!("expected call");
        };
        assert_eq!(name, "foo");
        assert_eq!(args.len(), 2);
        assert!(null_safe);
        let ExprKind::Field { name, .. } = expr("a.b").kind else {
            panic!("expected field");
        };
        assert_eq!(name, "b");
    }

    #[test]
    fn static_refs() {
        let ExprKind::Call { receiver, .. } = expr("Math.max(1, 2)").kind else {
            panic!("expected call");
        };
        assert!(matches!(receiver.kind, ExprKind::StaticRef(ref ty) if ty.name == "Math"));
    }

    #[test]
    fn new_arrays_count_extra_dimensions() {
        let ExprKind::NewArray { ty, dims, extra_dims } = expr("new int[3][]").kind else {
            panic!("expected array allocation");
        };
        assert_eq!(ty.name, "int");
        assert_eq!(dims.len(), 1);
        assert_eq!(extra_dims, 1);

        let ExprKind::NewInitializedArray { ty, values } = expr("new int[] {1, 2, 3}").kind else {
            panic!("expected initialized array");
        };
        assert_eq!(ty.dims, 1);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn collections() {
        assert!(matches!(expr("[1, 2]").kind, ExprKind::ListInit(ref v) if v.len() == 2));
        assert!(matches!(expr("[]").kind, ExprKind::ListInit(ref v) if v.is_empty()));
        assert!(matches!(expr("['a': 1]").kind, ExprKind::MapInit(ref v) if v.len() == 1));
        assert!(matches!(expr("[:]").kind, ExprKind::MapInit(ref v) if v.is_empty()));
    }

    #[test]
    fn lambdas_and_references() {
        let ExprKind::Call { args, .. } = expr("l.removeIf(x -> x == 1)").kind else {
            panic!("expected call");
        };
        let ExprKind::Lambda { params, body } = &args[0].kind else {
            panic!("expected lambda");
        };
        assert_eq!(params[0].name, "x");
        assert!(params[0].ty.is_none());
        assert!(matches!(body, LambdaBody::Expr(_)));

        let ExprKind::CallLocal { args, .. } = expr("f(this::g, Integer::parseInt, ArrayList::new)").kind
        else {
            panic!("expected call");
        };
        assert!(matches!(&args[0].kind, ExprKind::FuncRef { owner: RefOwner::This, name } if name == "g"));
        assert!(matches!(&args[2].kind, ExprKind::FuncRef { name, .. } if name == "new"));
    }

    #[test]
    fn literals_are_unescaped() {
        assert!(matches!(expr("'it\\'s'").kind, ExprKind::Str(ref s) if s == "it's"));
        let ExprKind::Numeric { digits, radix, .. } = expr("0x1F").kind else {
            panic!("expected number");
        };
        assert_eq!(digits, "1F");
        assert_eq!(radix, 16);
    }
}
