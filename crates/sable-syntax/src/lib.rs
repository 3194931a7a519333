//! Reference front end for Sable: lexer, parser, and arena syntax tree.
//!
//! The compiler consumes [`SyntaxNode`] trees; this crate is one way to
//! produce them.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use sable_syntax::{ParseOptions, SyntaxKind, parse};
//!
//! let arena = Bump::new();
//! let is_type = |name: &str| name == "int";
//! let root = parse("int x = 1; x + 2", &arena, &is_type, ParseOptions::default()).unwrap();
//! assert_eq!(root.kind, SyntaxKind::Source);
//! assert_eq!(root.node_count(), 2);
//! ```

mod cursor;
mod kind;
mod lexer;
mod parser;
mod tree;

pub use kind::{SyntaxKind, TokenKind};
pub use lexer::{Lexer, Token, TypeNames};
pub use parser::{ParseOptions, Parser, SyntaxError};
pub use tree::{Checkpoint, SyntaxElement, SyntaxNode, SyntaxToken, TreeBuilder};

use bumpalo::Bump;

/// Parse a whole script into a tree allocated in `arena`.
///
/// `type_names` tells type names from identifiers; pass
/// `&|name| catalog.is_valid_type_name(name)` to use a catalog.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse<'a>(
    source: &str,
    arena: &'a Bump,
    type_names: TypeNames<'_>,
    options: ParseOptions,
) -> Result<&'a SyntaxNode<'a>, SyntaxError> {
    Parser::new(source, arena, type_names, options)?.parse_source()
}
