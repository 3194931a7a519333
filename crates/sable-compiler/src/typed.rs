//! The typed tree: the semantic tree after resolution.
//!
//! Every expression carries a static type, [`DataType::DEF`] when only the
//! runtime can tell. Members are bound to catalog hashes, locals to
//! [`VarId`]s, and conversions are explicit [`ExprKind::Cast`] nodes.

use sable_core::{DataType, Span, TypeHash};

use crate::FunctionFlags;
use crate::ast::{BinaryOp, CompareOp, UnaryOp};
use crate::dispatch::{CallSite, DefRef, FunctionRef};
use crate::resolve::cast::Cast;
use crate::resolve::scope::VarId;

/// A resolved script: every function of the unit plus its constant fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedUnit {
    /// Main first, then user functions, lifted lambdas, and the static
    /// initializer last.
    pub functions: Vec<TypedFunction>,
    pub constants: Vec<ConstantField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedFunction {
    pub name: String,
    pub index: u16,
    /// Captures first for lifted lambdas.
    pub params: Vec<Local>,
    pub return_type: DataType,
    pub flags: FunctionFlags,
    pub body: Vec<Stmt>,
    /// First unused variable id, for temporaries introduced after resolution.
    pub next_var: u32,
    pub span: Span,
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub var: VarId,
    pub name: String,
    pub ty: DataType,
}

/// A constant field of the unit, set once by the static initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantField {
    pub name: String,
    pub ty: DataType,
    /// Source text the constant was built from, for diagnostics.
    pub source: String,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Declare {
        local: Local,
        init: Option<Expr>,
    },
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        /// Condition is constant `true`.
        continuous: bool,
    },
    DoWhile {
        body: Vec<Stmt>,
        condition: Expr,
        continuous: bool,
    },
    For {
        init: Vec<Stmt>,
        /// `None` when omitted.
        condition: Option<Expr>,
        update: Vec<Expr>,
        body: Vec<Stmt>,
        continuous: bool,
    },
    ForEach {
        local: Local,
        source: EachSource,
        iterable: Expr,
        /// Conversion from the element type to the declared type.
        cast: Option<Cast>,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        traps: Vec<Trap>,
    },
    Throw(Expr),
    Return(Option<Expr>),
    Break,
    Continue,
}

/// How a for-each loop walks its iterable.
#[derive(Debug, Clone, PartialEq)]
pub enum EachSource {
    Array {
        element: DataType,
    },
    Iterable {
        iterator: MethodTarget,
        has_next: MethodTarget,
        next: MethodTarget,
    },
    /// Iterator acquired through a call site.
    Dynamic {
        iterator: CallSite,
        has_next: MethodTarget,
        next: MethodTarget,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trap {
    pub local: Local,
    pub catch_type: DataType,
    pub body: Vec<Stmt>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub ty: DataType,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: DataType, span: Span) -> Self {
        Self { span, ty, kind }
    }

    pub fn constant(value: Literal, ty: DataType, span: Span) -> Self {
        Self::new(ExprKind::Constant(value), ty, span)
    }

    pub fn load(place: Place, ty: DataType, span: Span) -> Self {
        Self::new(ExprKind::Load(place), ty, span)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(Literal::Null))
    }

    /// The value of a boolean constant, after folding `!`.
    pub fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            ExprKind::Constant(Literal::Bool(value)) => Some(*value),
            ExprKind::Not(inner) => inner.as_bool().map(|v| !v),
            _ => None,
        }
    }
}

/// A compile-time constant. Sub-int integral types use `Int`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

/// A bound member call target.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodTarget {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    pub params: Vec<DataType>,
    pub return_type: DataType,
    pub invocation: Invocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Static,
    Virtual,
    Interface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldTarget {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    pub ty: DataType,
}

/// How a comparison is carried out once operands are converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    /// Operands are primitives of this type (booleans included).
    Primitive(DataType),
    /// Identity.
    Reference,
    /// Null-tolerant `equals`.
    Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(Literal),
    /// Read of a storage location.
    Load(Place),
    Assign {
        place: Box<Place>,
        value: Box<Expr>,
    },
    /// `place op= value`, and increments.
    Compound {
        place: Box<Place>,
        operation: Operation,
        value: Box<Expr>,
        /// From the stored type to the operation type.
        widen: Option<Cast>,
        /// From the operation result back to the stored type.
        narrow: Option<Cast>,
        /// Postfix increment: the expression yields the old value.
        post: bool,
    },
    Call {
        receiver: Option<Box<Expr>>,
        target: MethodTarget,
        args: Vec<Expr>,
    },
    /// A function of the unit.
    CallLocal {
        index: u16,
        name: String,
        args: Vec<Expr>,
    },
    /// Operands, receiver first, of a call site.
    Dynamic {
        site: CallSite,
        args: Vec<Expr>,
    },
    New {
        owner: TypeHash,
        ctor: TypeHash,
        args: Vec<Expr>,
    },
    /// `new T[a][b][]`: `self.ty` is the full array type.
    NewArray {
        dims: Vec<Expr>,
    },
    ArrayInit {
        values: Vec<Expr>,
    },
    ListInit {
        ctor: TypeHash,
        add: MethodTarget,
        values: Vec<Expr>,
    },
    MapInit {
        ctor: TypeHash,
        put: MethodTarget,
        entries: Vec<(Expr, Expr)>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Arithmetic and bitwise operators on primitives of `self.ty`.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        kind: CompareKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Comparison against the `null` literal.
    IsNull {
        operand: Box<Expr>,
        negated: bool,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Elvis {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Instanceof {
        operand: Box<Expr>,
        target: DataType,
    },
    Cast {
        cast: Cast,
        expr: Box<Expr>,
    },
    /// String `+`; nested concatenations flatten during lowering.
    Concat(Box<Expr>, Box<Expr>),
    FunctionRef {
        reference: FunctionRef,
        captures: Vec<Expr>,
    },
    /// Reference for a call site; the interface is bound at run time.
    DefRef {
        reference: DefRef,
        captures: Vec<Expr>,
    },
    /// `receiver?.access`: `access` reads the receiver from `temp`.
    NullSafe {
        temp: VarId,
        receiver: Box<Expr>,
        access: Box<Expr>,
    },
}

/// The operator of a compound assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// On primitives of the given type.
    Static { op: BinaryOp, ty: DataType },
    Dynamic(CallSite),
    /// String `+=`.
    Concat,
}

/// A storage location.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Local {
        var: VarId,
        name: String,
    },
    /// A host-supplied value on the script instance.
    Member {
        hash: TypeHash,
        name: String,
    },
    Field {
        receiver: Box<Expr>,
        field: FieldTarget,
    },
    StaticField {
        field: FieldTarget,
    },
    /// A constant field of the unit.
    UnitStatic {
        index: u16,
    },
    ArrayElement {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayLength {
        array: Box<Expr>,
    },
    ListElement {
        list: Box<Expr>,
        index: Box<Expr>,
        get: MethodTarget,
        set: MethodTarget,
        size: MethodTarget,
    },
    MapEntry {
        map: Box<Expr>,
        key: Box<Expr>,
        get: MethodTarget,
        put: MethodTarget,
    },
    /// Getter/setter pair standing in for a field.
    Shortcut {
        receiver: Box<Expr>,
        name: String,
        getter: Option<MethodTarget>,
        setter: Option<MethodTarget>,
    },
    DefField {
        receiver: Box<Expr>,
        name: String,
    },
    DefIndex {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
}
