//! The semantic tree.
//!
//! Produced by the [builder](crate::builder) from a syntax tree. Nodes carry
//! source locations but no types. Optional statement and expression children
//! are explicit placeholders ([`ExprKind::Empty`], an empty [`Block`],
//! [`ForInit::Empty`]) so every consumer can rely on fixed arity.

use sable_core::Span;

/// A whole script.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub functions: Vec<Function>,
    /// Top-level statements: the body of the main function.
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A user function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: TypeName,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeName,
    pub name: String,
    pub span: Span,
}

/// A type as written: base name plus array dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub name: String,
    pub dims: u8,
    pub span: Span,
}

impl TypeName {
    /// The dynamic type, for untyped loop and lambda variables.
    pub fn def(span: Span) -> Self {
        Self {
            name: "def".to_string(),
            dims: 0,
            span,
        }
    }

    /// `name[]...` as written in scripts.
    pub fn display(&self) -> String {
        let mut text = self.name.clone();
        for _ in 0..self.dims {
            text.push_str("[]");
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    /// The placeholder for an omitted body or branch.
    pub fn empty(span: Span) -> Self {
        Self {
            statements: Vec::new(),
            span,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Block),
    If {
        condition: Expr,
        then: Block,
        /// Empty when there is no `else`.
        otherwise: Block,
    },
    While {
        condition: Expr,
        body: Block,
    },
    DoWhile {
        body: Block,
        condition: Expr,
    },
    For {
        init: ForInit,
        /// [`ExprKind::Empty`] when omitted.
        condition: Expr,
        update: Vec<Expr>,
        body: Block,
    },
    /// `for (T x : e)` and `for (x in e)`; the latter declares `def`.
    ForEach {
        ty: TypeName,
        name: String,
        iterable: Expr,
        body: Block,
    },
    Try {
        body: Block,
        traps: Vec<Trap>,
    },
    Throw(Expr),
    /// [`ExprKind::Empty`] for a bare `return`.
    Return(Expr),
    Break,
    Continue,
    Declaration {
        ty: TypeName,
        vars: Vec<DeclVar>,
    },
    Expr(Expr),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Empty,
    Declaration { ty: TypeName, vars: Vec<DeclVar> },
    Expressions(Vec<Expr>),
}

/// One `catch` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Trap {
    pub ty: TypeName,
    pub name: String,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclVar {
    pub name: String,
    /// [`ExprKind::Empty`] without an initializer.
    pub init: Expr,
    pub span: Span,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The placeholder for an omitted expression.
    pub fn empty(span: Span) -> Self {
        Self::new(ExprKind::Empty, span)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, ExprKind::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Empty,
    /// Digits without radix prefix or type suffix.
    Numeric {
        digits: String,
        radix: u32,
        suffix: Option<char>,
        /// Has a fraction, an exponent, or a floating suffix.
        decimal: bool,
    },
    Boolean(bool),
    Null,
    /// Unescaped string contents.
    Str(String),
    /// Pattern text and flag bits.
    Regex {
        pattern: String,
        flags: i32,
    },
    ListInit(Vec<Expr>),
    MapInit(Vec<(Expr, Expr)>),
    Variable(String),
    /// A call without receiver: user function or imported static.
    CallLocal {
        name: String,
        args: Vec<Expr>,
    },
    /// A type used as the receiver of static access.
    StaticRef(TypeName),
    NewObject {
        ty: TypeName,
        args: Vec<Expr>,
    },
    /// `new T[a][b][]`: `ty` is the element base type.
    NewArray {
        ty: TypeName,
        dims: Vec<Expr>,
        extra_dims: u8,
    },
    /// `new T[] { ... }`: `ty` is the array type.
    NewInitializedArray {
        ty: TypeName,
        values: Vec<Expr>,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: LambdaBody,
    },
    FuncRef {
        owner: RefOwner,
        /// Function name, or `new`.
        name: String,
    },
    Field {
        receiver: Box<Expr>,
        name: String,
        null_safe: bool,
    },
    Call {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
        null_safe: bool,
    },
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
    /// `=` when `op` is `None`, otherwise a compound assignment.
    Assign {
        target: Box<Expr>,
        op: Option<BinaryOp>,
        value: Box<Expr>,
    },
    Pre {
        op: IncDec,
        target: Box<Expr>,
    },
    Post {
        op: IncDec,
        target: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Bool {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `left ?: right`.
    Elvis {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Instanceof {
        expr: Box<Expr>,
        ty: TypeName,
    },
    Cast {
        ty: TypeName,
        expr: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParam {
    /// `None` when the type is taken from the target interface.
    pub ty: Option<TypeName>,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Block(Block),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefOwner {
    This,
    Type(TypeName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    BitAnd,
    BitOr,
    BitXor,
    /// `=~`
    Find,
    /// `==~`
    Match,
}

impl BinaryOp {
    /// Operator name used by dynamic call sites.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::Shl => "lsh",
            BinaryOp::Shr => "rsh",
            BinaryOp::Ushr => "ush",
            BinaryOp::BitAnd => "and",
            BinaryOp::BitOr => "or",
            BinaryOp::BitXor => "xor",
            BinaryOp::Find => "find",
            BinaryOp::Match => "matches",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Find => "=~",
            BinaryOp::Match => "==~",
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Plus => "plus",
            UnaryOp::Not => "not",
            UnaryOp::BitNot => "bwnot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncDec {
    Increment,
    Decrement,
}

impl IncDec {
    /// The binary operator the increment applies.
    pub fn op(self) -> BinaryOp {
        match self {
            IncDec::Increment => BinaryOp::Add,
            IncDec::Decrement => BinaryOp::Sub,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `==`: value equality.
    Eq,
    Ne,
    /// `===`: identity.
    EqRef,
    NeRef,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn name(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::EqRef => "eqr",
            CompareOp::NeRef => "ner",
            CompareOp::Lt => "lt",
            CompareOp::Le => "lte",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "gte",
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(
            self,
            CompareOp::Eq | CompareOp::Ne | CompareOp::EqRef | CompareOp::NeRef
        )
    }

    pub fn is_negated(self) -> bool {
        matches!(self, CompareOp::Ne | CompareOp::NeRef)
    }
}
