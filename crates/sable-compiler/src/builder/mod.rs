//! AST builder: syntax tree to semantic tree.
//!
//! The input is known to be syntactically valid, so any shape the builder
//! does not expect is an [`InternalError`]: a defect in the front end, not a
//! user mistake. The only user-facing error raised here is an unknown regex
//! flag.
//!
//! Lexical conventions are stripped on the way: string quotes and escapes,
//! regex delimiters and flags, numeric radix prefixes.

mod expr;
mod literal;
mod stmt;

use sable_core::{Error, InternalError, Span};
use sable_syntax::{SyntaxKind, SyntaxNode, SyntaxToken, TokenKind};

use crate::ast::{Block, Function, Param, Source, TypeName};

pub use literal::{regex_flag_bits, unescape};

type BuildResult<T> = Result<T, Error>;

/// Builds semantic trees. Stateless: building the same tree twice yields
/// equal results.
#[derive(Debug, Default, Clone, Copy)]
pub struct AstBuilder;

impl AstBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the semantic tree of a whole script.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&self, root: &SyntaxNode<'_>) -> BuildResult<Source> {
        expect_kind(root, SyntaxKind::Source)?;
        let mut functions = Vec::new();
        let mut statements = Vec::new();
        for node in root.nodes() {
            if node.kind == SyntaxKind::Function {
                if !statements.is_empty() {
                    return Err(internal(node, "function definition after statements"));
                }
                functions.push(self.function(node)?);
            } else {
                statements.push(self.statement(node)?);
            }
        }
        tracing::trace!(
            functions = functions.len(),
            statements = statements.len(),
            "built semantic tree"
        );
        Ok(Source {
            functions,
            statements,
            span: root.span,
        })
    }

    fn function(&self, node: &SyntaxNode<'_>) -> BuildResult<Function> {
        let return_type = self.decltype(child(node, SyntaxKind::DeclType)?)?;
        let name = identifier(node)?;
        let params = child(node, SyntaxKind::Parameters)?
            .nodes()
            .map(|param| {
                expect_kind(param, SyntaxKind::Param)?;
                Ok(Param {
                    ty: self.decltype(child(param, SyntaxKind::DeclType)?)?,
                    name: identifier(param)?,
                    span: param.span,
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;
        let body = self.block(child(node, SyntaxKind::Block)?)?;
        Ok(Function {
            name,
            return_type,
            params,
            body,
            span: node.span,
        })
    }

    /// A `DeclType` node: a type name or `def`, then `[` `]` pairs.
    fn decltype(&self, node: &SyntaxNode<'_>) -> BuildResult<TypeName> {
        expect_kind(node, SyntaxKind::DeclType)?;
        let base = node
            .first_token()
            .filter(|t| matches!(t.kind, TokenKind::TypeName | TokenKind::Def))
            .ok_or_else(|| internal(node, "declared type without a type name"))?;
        let dims = node.tokens().filter(|t| t.kind == TokenKind::LBrack).count();
        Ok(TypeName {
            name: base.text.to_string(),
            dims: u8::try_from(dims).map_err(|_| internal(node, "too many array dimensions"))?,
            span: node.span,
        })
    }

    pub(crate) fn block(&self, node: &SyntaxNode<'_>) -> BuildResult<Block> {
        expect_kind(node, SyntaxKind::Block)?;
        let statements = node
            .nodes()
            .map(|stmt| self.statement(stmt))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(Block {
            statements,
            span: node.span,
        })
    }
}

// ============================================================================
// Tree Navigation
// ============================================================================

fn internal(node: &SyntaxNode<'_>, message: &str) -> Error {
    InternalError::new(format!("{message} in {:?}", node.kind))
        .at(node.span)
        .into()
}

fn expect_kind(node: &SyntaxNode<'_>, kind: SyntaxKind) -> BuildResult<()> {
    if node.kind == kind {
        Ok(())
    } else {
        Err(InternalError::new(format!("expected {kind:?}, found {:?}", node.kind))
            .at(node.span)
            .into())
    }
}

fn child<'a>(node: &SyntaxNode<'a>, kind: SyntaxKind) -> BuildResult<&'a SyntaxNode<'a>> {
    node.child(kind)
        .ok_or_else(|| internal(node, &format!("missing {kind:?}")))
}

fn nth<'a>(node: &SyntaxNode<'a>, n: usize) -> BuildResult<&'a SyntaxNode<'a>> {
    node.nth_node(n)
        .ok_or_else(|| internal(node, &format!("missing child {n}")))
}

fn token<'a>(node: &SyntaxNode<'a>, kind: TokenKind) -> BuildResult<&'a SyntaxToken<'a>> {
    node.token(kind)
        .ok_or_else(|| internal(node, &format!("missing {kind:?} token")))
}

/// Text of the node's identifier token.
fn identifier(node: &SyntaxNode<'_>) -> BuildResult<String> {
    Ok(token(node, TokenKind::Identifier)?.text.to_string())
}

fn exactly<'a>(node: &SyntaxNode<'a>, count: usize) -> BuildResult<Vec<&'a SyntaxNode<'a>>> {
    let nodes: Vec<_> = node.nodes().collect();
    if nodes.len() == count {
        Ok(nodes)
    } else {
        Err(internal(
            node,
            &format!("expected {count} children, found {}", nodes.len()),
        ))
    }
}

fn span_end(node: &SyntaxNode<'_>) -> Span {
    Span::at(node.span.end(), node.span.line, node.span.col, 0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ast::{ExprKind, StmtKind};
    use bumpalo::Bump;
    use sable_syntax::{ParseOptions, parse};

    pub(crate) fn is_type(name: &str) -> bool {
        matches!(
            name,
            "void" | "boolean" | "byte" | "short" | "char" | "int" | "long" | "float" | "double"
                | "String" | "List" | "ArrayList" | "Map" | "HashMap" | "Math" | "Integer"
                | "Exception" | "Object" | "Function" | "Predicate"
        )
    }

    pub(crate) fn build(source: &str) -> BuildResult<Source> {
        let arena = Bump::new();
        let root = parse(source, &arena, &is_type, ParseOptions::default()).unwrap();
        AstBuilder::new().build(root)
    }

    pub(crate) fn build_ok(source: &str) -> Source {
        build(source).unwrap()
    }

    #[test]
    fn functions_and_statements() {
        let source = build_ok("int twice(int x) { return x * 2; } twice(3)");
        assert_eq!(source.functions.len(), 1);
        let function = &source.functions[0];
        assert_eq!(function.name, "twice");
        assert_eq!(function.params[0].name, "x");
        assert_eq!(function.return_type.name, "int");
        assert_eq!(source.statements.len(), 1);
    }

    #[test]
    fn array_types_count_dimensions() {
        let source = build_ok("int[][] grid;");
        let StmtKind::Declaration { ty, vars } = &source.statements[0].kind else {
            panic!("expected declaration");
        };
        assert_eq!(ty.dims, 2);
        assert_eq!(ty.display(), "int[][]");
        assert!(vars[0].init.is_empty());
    }

    #[test]
    fn building_is_deterministic() {
        let text = "def x = [1, 2]; for (int i = 0; i < 3; ++i) { x[i] += 1; } x";
        let arena = Bump::new();
        let root = parse(text, &arena, &is_type, ParseOptions::default()).unwrap();
        let builder = AstBuilder::new();
        assert_eq!(builder.build(root).unwrap(), builder.build(root).unwrap());
    }

    #[test]
    fn wrong_root_is_internal() {
        let arena = Bump::new();
        let root = parse("1", &arena, &is_type, ParseOptions::default()).unwrap();
        let statement = root.nth_node(0).unwrap();
        let err = AstBuilder::new().build(statement).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn parens_are_transparent() {
        let source = build_ok("(((1)))");
        let StmtKind::Expr(expr) = &source.statements[0].kind else {
            panic!("expected expression statement");
        };
        assert!(matches!(expr.kind, ExprKind::Numeric { .. }));
    }
}
