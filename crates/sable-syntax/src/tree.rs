//! Arena-allocated syntax tree.
//!
//! Nodes and tokens live in a [`Bump`] arena and are immutable once built.
//! Each node keeps every child, punctuation included, in source order.

use std::fmt::{self, Write};

use bumpalo::Bump;
use sable_core::{InternalError, Span};

use crate::kind::{SyntaxKind, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxToken<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxElement<'a> {
    Node(&'a SyntaxNode<'a>),
    Token(&'a SyntaxToken<'a>),
}

impl<'a> SyntaxElement<'a> {
    pub fn span(&self) -> Span {
        match self {
            SyntaxElement::Node(node) => node.span,
            SyntaxElement::Token(token) => token.span,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SyntaxNode<'a> {
    pub kind: SyntaxKind,
    pub span: Span,
    pub children: &'a [SyntaxElement<'a>],
}

impl<'a> SyntaxNode<'a> {
    /// Child nodes, skipping tokens.
    pub fn nodes(&self) -> impl Iterator<Item = &'a SyntaxNode<'a>> + 'a {
        self.children.iter().filter_map(|child| match child {
            SyntaxElement::Node(node) => Some(*node),
            SyntaxElement::Token(_) => None,
        })
    }

    /// Child tokens, skipping nodes.
    pub fn tokens(&self) -> impl Iterator<Item = &'a SyntaxToken<'a>> + 'a {
        self.children.iter().filter_map(|child| match child {
            SyntaxElement::Token(token) => Some(*token),
            SyntaxElement::Node(_) => None,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn nth_node(&self, n: usize) -> Option<&'a SyntaxNode<'a>> {
        self.nodes().nth(n)
    }

    /// First child node of the given kind.
    pub fn child(&self, kind: SyntaxKind) -> Option<&'a SyntaxNode<'a>> {
        self.nodes().find(|node| node.kind == kind)
    }

    /// First child token of the given kind.
    pub fn token(&self, kind: TokenKind) -> Option<&'a SyntaxToken<'a>> {
        self.tokens().find(|token| token.kind == kind)
    }

    pub fn has_token(&self, kind: TokenKind) -> bool {
        self.token(kind).is_some()
    }

    pub fn first_token(&self) -> Option<&'a SyntaxToken<'a>> {
        self.tokens().next()
    }

    /// Render the tree as an indented outline, for debugging and tests.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        let _ = writeln!(out, "{:indent$}{:?}", "", self.kind, indent = depth * 2);
        for child in self.children {
            match child {
                SyntaxElement::Node(node) => node.dump_into(out, depth + 1),
                SyntaxElement::Token(token) => {
                    let _ = writeln!(
                        out,
                        "{:indent$}{:?} {:?}",
                        "",
                        token.kind,
                        token.text,
                        indent = (depth + 1) * 2
                    );
                }
            }
        }
    }
}

impl fmt::Display for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

/// Position in the current node's children, for wrapping already-built
/// children into a new parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

struct Frame<'a> {
    kind: SyntaxKind,
    children: Vec<SyntaxElement<'a>>,
}

/// Bottom-up builder for syntax trees.
///
/// ```
/// use bumpalo::Bump;
/// use sable_core::Span;
/// use sable_syntax::{SyntaxKind, TokenKind, TreeBuilder};
///
/// let arena = Bump::new();
/// let mut builder = TreeBuilder::new(&arena);
/// builder.start_node(SyntaxKind::Source);
/// builder.start_node(SyntaxKind::ExprStatement);
/// builder.start_node(SyntaxKind::Numeric);
/// builder.token(TokenKind::IntegerLiteral, "1", Span::at(0, 1, 1, 1));
/// builder.finish_node();
/// builder.finish_node();
/// builder.finish_node();
/// let root = builder.finish().unwrap();
/// assert_eq!(root.node_count(), 1);
/// ```
pub struct TreeBuilder<'a> {
    arena: &'a Bump,
    stack: Vec<Frame<'a>>,
    root: Option<&'a SyntaxNode<'a>>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            stack: Vec::new(),
            root: None,
        }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.stack.last().map_or(0, |frame| frame.children.len()))
    }

    /// Start a node that adopts every child added since `checkpoint`.
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        let adopted = match self.stack.last_mut() {
            Some(frame) if checkpoint.0 <= frame.children.len() => {
                frame.children.split_off(checkpoint.0)
            }
            _ => Vec::new(),
        };
        self.stack.push(Frame {
            kind,
            children: adopted,
        });
    }

    /// Add a token to the current node. The text is copied into the arena.
    pub fn token(&mut self, kind: TokenKind, text: &str, span: Span) {
        let text = self.arena.alloc_str(text);
        self.push_token(self.arena.alloc(SyntaxToken { kind, text, span }));
    }

    /// Add an arena-allocated token to the current node.
    pub fn push_token(&mut self, token: &'a SyntaxToken<'a>) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(SyntaxElement::Token(token));
        }
    }

    pub fn finish_node(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let span = match (frame.children.first(), frame.children.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => Span::default(),
        };
        let children = self.arena.alloc_slice_copy(&frame.children);
        let node = self.arena.alloc(SyntaxNode {
            kind: frame.kind,
            span,
            children,
        });
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(SyntaxElement::Node(node)),
            None => self.root = Some(node),
        }
    }

    /// The finished root node.
    pub fn finish(self) -> Result<&'a SyntaxNode<'a>, InternalError> {
        if !self.stack.is_empty() {
            return Err(InternalError::new(format!(
                "{} syntax nodes left unfinished",
                self.stack.len()
            )));
        }
        self.root
            .ok_or_else(|| InternalError::new("syntax tree has no root"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_wraps_built_children() {
        let arena = Bump::new();
        let mut builder = TreeBuilder::new(&arena);
        builder.start_node(SyntaxKind::ExprStatement);
        let cp = builder.checkpoint();
        builder.start_node(SyntaxKind::Variable);
        builder.token(TokenKind::Identifier, "a", Span::at(0, 1, 1, 1));
        builder.finish_node();
        builder.start_node_at(cp, SyntaxKind::Binary);
        builder.token(TokenKind::Plus, "+", Span::at(2, 1, 3, 1));
        builder.start_node(SyntaxKind::Variable);
        builder.token(TokenKind::Identifier, "b", Span::at(4, 1, 5, 1));
        builder.finish_node();
        builder.finish_node();
        builder.finish_node();

        let root = builder.finish().unwrap();
        let binary = root.nth_node(0).unwrap();
        assert_eq!(binary.kind, SyntaxKind::Binary);
        assert_eq!(binary.node_count(), 2);
        assert_eq!(binary.token(TokenKind::Plus).map(|t| t.text), Some("+"));
        assert_eq!(binary.span.len, 5);
    }

    #[test]
    fn unfinished_nodes_are_an_internal_error() {
        let arena = Bump::new();
        let mut builder = TreeBuilder::new(&arena);
        builder.start_node(SyntaxKind::Source);
        assert!(builder.finish().is_err());
    }

    #[test]
    fn dump_lists_tokens() {
        let arena = Bump::new();
        let mut builder = TreeBuilder::new(&arena);
        builder.start_node(SyntaxKind::Variable);
        builder.token(TokenKind::Identifier, "x", Span::default());
        builder.finish_node();
        let root = builder.finish().unwrap();
        assert_eq!(root.dump(), "Variable\n  Identifier \"x\"\n");
    }
}
