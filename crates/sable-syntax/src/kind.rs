//! Node and token kinds of the syntax tree.

/// One kind per grammar production.
///
/// Child layout per kind (nodes in order; tokens interleaved as written):
///
/// | Kind | Child nodes |
/// |---|---|
/// | `Source` | `Function`*, statement* |
/// | `Function` | `DeclType`, `Parameters`, `Block`; name token |
/// | `Parameters` | `Param`* |
/// | `Param` | `DeclType`; name token |
/// | `DeclType` | none; a type-name or `def` token then `[` `]` pairs |
/// | `If` | condition, then-statement, else-statement? |
/// | `While` | condition, body statement |
/// | `Do` | `Block`, condition |
/// | `For` | `ForInit`?, `ForCond`?, `ForUpdate`?, body statement |
/// | `Each` | `DeclType`, iterable, body; variable token |
/// | `InEach` | iterable, body; variable token |
/// | `Try` | `Block`, `Trap`+ |
/// | `Trap` | `DeclType`, `Block`; variable token |
/// | `Declaration` | `DeclType`, `DeclVar`+ |
/// | `DeclVar` | initializer?; name token |
/// | `Binary` | left, right; operator token |
/// | `Assignment` | target, value; operator token |
/// | `NewArray` | `DeclType` (base type), dimension expressions |
/// | `NewInitializedArray` | `DeclType` (array type), element expressions |
/// | `Lambda` | `LambdaParam`*, then `Block` or expression |
/// | `FieldAccess` | receiver; `.`/`?.` and name tokens |
/// | `CallInvoke` | receiver, `Arguments`; `.`/`?.` and name tokens |
/// | `BraceAccess` | receiver, index |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Source,
    Function,
    Parameters,
    Param,
    DeclType,
    Block,
    // Statements
    If,
    While,
    Do,
    For,
    ForInit,
    ForCond,
    ForUpdate,
    Each,
    InEach,
    Try,
    Trap,
    Throw,
    Return,
    Break,
    Continue,
    Declaration,
    DeclVar,
    ExprStatement,
    Empty,
    // Expressions
    Assignment,
    Elvis,
    Conditional,
    Binary,
    Instanceof,
    Pre,
    Post,
    Unary,
    Cast,
    Paren,
    Numeric,
    Boolean,
    Null,
    StringLit,
    RegexLit,
    ListInit,
    MapInit,
    MapEntry,
    Variable,
    CallLocal,
    StaticRef,
    NewObject,
    NewArray,
    NewInitializedArray,
    Lambda,
    LambdaParam,
    FuncRef,
    FieldAccess,
    CallInvoke,
    BraceAccess,
    Arguments,
}

impl SyntaxKind {
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            SyntaxKind::Block
                | SyntaxKind::If
                | SyntaxKind::While
                | SyntaxKind::Do
                | SyntaxKind::For
                | SyntaxKind::Each
                | SyntaxKind::InEach
                | SyntaxKind::Try
                | SyntaxKind::Throw
                | SyntaxKind::Return
                | SyntaxKind::Break
                | SyntaxKind::Continue
                | SyntaxKind::Declaration
                | SyntaxKind::ExprStatement
                | SyntaxKind::Empty
        )
    }

    pub fn is_expression(self) -> bool {
        matches!(
            self,
            SyntaxKind::Assignment
                | SyntaxKind::Elvis
                | SyntaxKind::Conditional
                | SyntaxKind::Binary
                | SyntaxKind::Instanceof
                | SyntaxKind::Pre
                | SyntaxKind::Post
                | SyntaxKind::Unary
                | SyntaxKind::Cast
                | SyntaxKind::Paren
                | SyntaxKind::Numeric
                | SyntaxKind::Boolean
                | SyntaxKind::Null
                | SyntaxKind::StringLit
                | SyntaxKind::RegexLit
                | SyntaxKind::ListInit
                | SyntaxKind::MapInit
                | SyntaxKind::Variable
                | SyntaxKind::CallLocal
                | SyntaxKind::StaticRef
                | SyntaxKind::NewObject
                | SyntaxKind::NewArray
                | SyntaxKind::NewInitializedArray
                | SyntaxKind::Lambda
                | SyntaxKind::FuncRef
                | SyntaxKind::FieldAccess
                | SyntaxKind::CallInvoke
                | SyntaxKind::BraceAccess
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    /// An identifier the catalog recognizes as a type name.
    TypeName,
    IntegerLiteral,
    OctalLiteral,
    HexLiteral,
    DecimalLiteral,
    StringLiteral,
    RegexLiteral,

    // Keywords
    If,
    Else,
    While,
    Do,
    For,
    In,
    Continue,
    Break,
    Return,
    New,
    Try,
    Catch,
    Throw,
    This,
    Instanceof,
    True,
    False,
    Null,
    Def,

    // Punctuation
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    LParen,
    RParen,
    Dot,
    NullSafeDot,
    Comma,
    Semicolon,
    Colon,
    DoubleColon,
    Arrow,
    Question,
    Elvis,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    Lt,
    LtEq,
    Gt,
    GtEq,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Amp,
    Caret,
    Pipe,
    AmpAmp,
    PipePipe,
    Shl,
    Shr,
    Ushr,
    Find,
    Match,
    PlusPlus,
    MinusMinus,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    CaretAssign,
    PipeAssign,
    ShlAssign,
    ShrAssign,
    UshrAssign,

    Eof,
}

impl TokenKind {
    /// Keyword lookup for identifier-shaped lexemes.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "continue" => TokenKind::Continue,
            "break" => TokenKind::Break,
            "return" => TokenKind::Return,
            "new" => TokenKind::New,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "throw" => TokenKind::Throw,
            "this" => TokenKind::This,
            "instanceof" => TokenKind::Instanceof,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "def" => TokenKind::Def,
            _ => return None,
        })
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::PercentAssign
                | TokenKind::AmpAssign
                | TokenKind::CaretAssign
                | TokenKind::PipeAssign
                | TokenKind::ShlAssign
                | TokenKind::ShrAssign
                | TokenKind::UshrAssign
        )
    }

    pub fn is_numeric_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntegerLiteral
                | TokenKind::OctalLiteral
                | TokenKind::HexLiteral
                | TokenKind::DecimalLiteral
        )
    }

    /// Binding power of binary operators; higher binds tighter.
    pub fn binary_precedence(self) -> Option<u8> {
        Some(match self {
            TokenKind::PipePipe => 1,
            TokenKind::AmpAmp => 2,
            TokenKind::Pipe => 3,
            TokenKind::Caret => 4,
            TokenKind::Amp => 5,
            TokenKind::EqEq | TokenKind::EqEqEq | TokenKind::NotEq | TokenKind::NotEqEq => 6,
            TokenKind::Lt
            | TokenKind::LtEq
            | TokenKind::Gt
            | TokenKind::GtEq
            | TokenKind::Instanceof => 7,
            TokenKind::Shl | TokenKind::Shr | TokenKind::Ushr => 8,
            TokenKind::Find | TokenKind::Match => 9,
            TokenKind::Plus | TokenKind::Minus => 10,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 11,
            _ => return None,
        })
    }

    /// Whether a `/` after this token divides rather than opening a regex.
    pub fn ends_value(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::TypeName
                | TokenKind::IntegerLiteral
                | TokenKind::OctalLiteral
                | TokenKind::HexLiteral
                | TokenKind::DecimalLiteral
                | TokenKind::StringLiteral
                | TokenKind::RegexLiteral
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::This
                | TokenKind::RParen
                | TokenKind::RBrack
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(TokenKind::keyword("def"), Some(TokenKind::Def));
        assert_eq!(TokenKind::keyword("instanceof"), Some(TokenKind::Instanceof));
        assert_eq!(TokenKind::keyword("int"), None);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert!(
            TokenKind::Star.binary_precedence() > TokenKind::Plus.binary_precedence()
        );
        assert!(
            TokenKind::AmpAmp.binary_precedence() > TokenKind::PipePipe.binary_precedence()
        );
    }

    #[test]
    fn statement_and_expression_kinds_are_disjoint() {
        assert!(SyntaxKind::If.is_statement());
        assert!(!SyntaxKind::If.is_expression());
        assert!(SyntaxKind::CallInvoke.is_expression());
        assert!(!SyntaxKind::Arguments.is_expression());
    }
}
