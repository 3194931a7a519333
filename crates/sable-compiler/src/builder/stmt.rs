//! Statement building.

use sable_syntax::{SyntaxKind, SyntaxNode, TokenKind};

use super::{AstBuilder, BuildResult, child, exactly, identifier, internal, nth, span_end};
use crate::ast::{Block, DeclVar, Expr, ForInit, Stmt, StmtKind, Trap, TypeName};

impl AstBuilder {
    pub(crate) fn statement(&self, node: &SyntaxNode<'_>) -> BuildResult<Stmt> {
        let kind = match node.kind {
            SyntaxKind::Block => StmtKind::Block(self.block(node)?),
            SyntaxKind::If => {
                let nodes: Vec<_> = node.nodes().collect();
                if !(2..=3).contains(&nodes.len()) {
                    return Err(internal(node, "if needs a condition and one or two branches"));
                }
                let otherwise = match nodes.get(2) {
                    Some(branch) => self.body(branch)?,
                    None => Block::empty(span_end(node)),
                };
                StmtKind::If {
                    condition: self.expression(nodes[0])?,
                    then: self.body(nodes[1])?,
                    otherwise,
                }
            }
            SyntaxKind::While => {
                let nodes = exactly(node, 2)?;
                StmtKind::While {
                    condition: self.expression(nodes[0])?,
                    body: self.body(nodes[1])?,
                }
            }
            SyntaxKind::Do => {
                let nodes = exactly(node, 2)?;
                StmtKind::DoWhile {
                    body: self.block(nodes[0])?,
                    condition: self.expression(nodes[1])?,
                }
            }
            SyntaxKind::For => self.for_loop(node)?,
            SyntaxKind::Each => {
                let nodes = exactly(node, 3)?;
                StmtKind::ForEach {
                    ty: self.decltype(nodes[0])?,
                    name: identifier(node)?,
                    iterable: self.expression(nodes[1])?,
                    body: self.body(nodes[2])?,
                }
            }
            SyntaxKind::InEach => {
                let nodes = exactly(node, 2)?;
                let name_token = super::token(node, TokenKind::Identifier)?;
                StmtKind::ForEach {
                    ty: TypeName::def(name_token.span),
                    name: name_token.text.to_string(),
                    iterable: self.expression(nodes[0])?,
                    body: self.body(nodes[1])?,
                }
            }
            SyntaxKind::Try => {
                let body = self.block(child(node, SyntaxKind::Block)?)?;
                let traps = node
                    .nodes()
                    .filter(|n| n.kind == SyntaxKind::Trap)
                    .map(|trap| self.trap(trap))
                    .collect::<BuildResult<Vec<_>>>()?;
                if traps.is_empty() {
                    return Err(internal(node, "try without catch"));
                }
                StmtKind::Try { body, traps }
            }
            SyntaxKind::Throw => StmtKind::Throw(self.expression(nth(node, 0)?)?),
            SyntaxKind::Return => match node.nth_node(0) {
                Some(value) => StmtKind::Return(self.expression(value)?),
                None => StmtKind::Return(Expr::empty(span_end(node))),
            },
            SyntaxKind::Break => StmtKind::Break,
            SyntaxKind::Continue => StmtKind::Continue,
            SyntaxKind::Declaration => {
                let (ty, vars) = self.declaration(node)?;
                StmtKind::Declaration { ty, vars }
            }
            SyntaxKind::ExprStatement => StmtKind::Expr(self.expression(nth(node, 0)?)?),
            SyntaxKind::Empty => StmtKind::Empty,
            _ => return Err(internal(node, "not a statement node")),
        };
        Ok(Stmt {
            kind,
            span: node.span,
        })
    }

    /// A branch or loop body as a block; `;` is an empty block.
    fn body(&self, node: &SyntaxNode<'_>) -> BuildResult<Block> {
        match node.kind {
            SyntaxKind::Block => self.block(node),
            SyntaxKind::Empty => Ok(Block::empty(node.span)),
            _ => Ok(Block {
                statements: vec![self.statement(node)?],
                span: node.span,
            }),
        }
    }

    fn declaration(&self, node: &SyntaxNode<'_>) -> BuildResult<(TypeName, Vec<DeclVar>)> {
        let ty = self.decltype(child(node, SyntaxKind::DeclType)?)?;
        let vars = node
            .nodes()
            .filter(|n| n.kind == SyntaxKind::DeclVar)
            .map(|var| {
                let init = match var.nth_node(0) {
                    Some(value) => self.expression(value)?,
                    None => Expr::empty(span_end(var)),
                };
                Ok(DeclVar {
                    name: identifier(var)?,
                    init,
                    span: var.span,
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;
        if vars.is_empty() {
            return Err(internal(node, "declaration without variables"));
        }
        Ok((ty, vars))
    }

    fn for_loop(&self, node: &SyntaxNode<'_>) -> BuildResult<StmtKind> {
        let init_node = child(node, SyntaxKind::ForInit)?;
        let cond_node = child(node, SyntaxKind::ForCond)?;
        let update_node = child(node, SyntaxKind::ForUpdate)?;
        let body_node = node
            .nodes()
            .last()
            .filter(|n| {
                !matches!(
                    n.kind,
                    SyntaxKind::ForInit | SyntaxKind::ForCond | SyntaxKind::ForUpdate
                )
            })
            .ok_or_else(|| internal(node, "for without a body"))?;

        let init = match init_node.nth_node(0) {
            None => ForInit::Empty,
            Some(decl) if decl.kind == SyntaxKind::Declaration => {
                let (ty, vars) = self.declaration(decl)?;
                ForInit::Declaration { ty, vars }
            }
            Some(_) => ForInit::Expressions(
                init_node
                    .nodes()
                    .map(|e| self.expression(e))
                    .collect::<BuildResult<Vec<_>>>()?,
            ),
        };
        let condition = match cond_node.nth_node(0) {
            Some(cond) => self.expression(cond)?,
            None => Expr::empty(cond_node.span),
        };
        let update = update_node
            .nodes()
            .map(|e| self.expression(e))
            .collect::<BuildResult<Vec<_>>>()?;

        Ok(StmtKind::For {
            init,
            condition,
            update,
            body: self.body(body_node)?,
        })
    }

    fn trap(&self, node: &SyntaxNode<'_>) -> BuildResult<Trap> {
        Ok(Trap {
            ty: self.decltype(child(node, SyntaxKind::DeclType)?)?,
            name: identifier(node)?,
            body: self.block(child(node, SyntaxKind::Block)?)?,
            span: node.span,
        })
    }
}
