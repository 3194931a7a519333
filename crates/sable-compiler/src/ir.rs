//! The lowered intermediate representation.
//!
//! IR has the shape of the typed tree with every storage operation made
//! explicit: reads are [`Access`] loads, writes are [`StoreNode`]s that know
//! how to set up their receiver once, calls carry a [`Dispatch`], and loops
//! carry their budget instrumentation. The emitter walks it post-order
//! without consulting the catalog again.

use sable_core::{DataType, Span, TypeHash};

use crate::FunctionFlags;
use crate::ast::{BinaryOp, CompareOp, UnaryOp};
use crate::dispatch::{CallSite, DefRef, FunctionRef};
use crate::resolve::cast::Cast;
use crate::resolve::scope::VarId;
use crate::typed::{CompareKind, FieldTarget, Literal, MethodTarget};

#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub index: u16,
    pub params: Vec<IrLocal>,
    pub return_type: DataType,
    pub flags: FunctionFlags,
    pub body: Vec<IrStmt>,
    /// Iteration budget shared by every loop of the function; zero when
    /// no loop is counted.
    pub max_loop_counter: u32,
    pub span: Span,
}

impl IrFunction {
    /// Whether any loop of this function decrements the budget.
    pub fn counts_loops(&self) -> bool {
        self.max_loop_counter > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrLocal {
    pub var: VarId,
    pub name: String,
    pub ty: DataType,
}

// ============================================================================
// Statements
// ============================================================================

/// Instrumentation of one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopFlags {
    /// Decrement and check the function's iteration budget per iteration.
    pub counted: bool,
    /// The condition is constant `true` and is never evaluated.
    pub continuous: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrStmt {
    /// An expression evaluated for its effect; a non-void value is popped.
    Expr(IrExpr),
    Declare {
        local: IrLocal,
        init: Option<IrExpr>,
    },
    Block(Vec<IrStmt>),
    If {
        condition: IrExpr,
        then: Vec<IrStmt>,
        otherwise: Vec<IrStmt>,
    },
    /// `while` and `for`: condition first, then body, then updates.
    While {
        /// `None` for continuous loops.
        condition: Option<IrExpr>,
        body: Vec<IrStmt>,
        /// Where `continue` lands.
        update: Vec<IrStmt>,
        flags: LoopFlags,
    },
    DoWhile {
        body: Vec<IrStmt>,
        condition: Option<IrExpr>,
        flags: LoopFlags,
    },
    /// Indexed walk over an array held in a hidden variable.
    ForEachArray {
        array_var: VarId,
        index_var: VarId,
        array: IrExpr,
        local: IrLocal,
        /// `array[index]`, converted to the declared type.
        element: IrExpr,
        body: Vec<IrStmt>,
        flags: LoopFlags,
    },
    /// `hasNext`/`next` walk over an iterator held in a hidden variable.
    ForEachIterator {
        iterator_var: VarId,
        /// Produces the iterator: a bound call, or a call site under `def`.
        iterator: IrExpr,
        has_next: IrExpr,
        local: IrLocal,
        /// `next()`, converted to the declared type.
        element: IrExpr,
        body: Vec<IrStmt>,
        flags: LoopFlags,
    },
    Try {
        body: Vec<IrStmt>,
        traps: Vec<IrTrap>,
    },
    Throw(IrExpr),
    Return(Option<IrExpr>),
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrTrap {
    pub local: IrLocal,
    pub catch_type: DataType,
    pub body: Vec<IrStmt>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IrExpr {
    pub span: Span,
    pub ty: DataType,
    pub kind: IrExprKind,
}

impl IrExpr {
    pub fn new(kind: IrExprKind, ty: DataType, span: Span) -> Self {
        Self { span, ty, kind }
    }

    pub fn load(access: Access, ty: DataType, span: Span) -> Self {
        Self::new(IrExprKind::Load(Box::new(access)), ty, span)
    }

    pub fn local(var: VarId, name: impl Into<String>, ty: DataType, span: Span) -> Self {
        Self::load(
            Access::Local {
                var,
                name: name.into(),
            },
            ty,
            span,
        )
    }

    /// Whether this is a store whose value nobody reads.
    pub fn is_silent_store(&self) -> bool {
        matches!(&self.kind, IrExprKind::Store(store) if store.read_back == ReadBack::None)
    }
}

/// How a call reaches its target.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Static(MethodTarget),
    Dynamic(CallSite),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrExprKind {
    Constant(Literal),
    Load(Box<Access>),
    Store(Box<StoreNode>),
    /// A catalog method, or a call site whose operands start with the
    /// receiver.
    Invoke {
        dispatch: Dispatch,
        receiver: Option<Box<IrExpr>>,
        args: Vec<IrExpr>,
    },
    /// A function of the unit.
    InvokeLocal {
        index: u16,
        args: Vec<IrExpr>,
    },
    New {
        ctor: TypeHash,
        args: Vec<IrExpr>,
    },
    /// `self.ty` is the full array type.
    NewArray {
        dims: Vec<IrExpr>,
    },
    /// One-dimensional array filled in order.
    ArrayInit {
        values: Vec<IrExpr>,
    },
    ArrayLength(Box<IrExpr>),
    /// Every operand of a flattened `+` chain, in order.
    Concat(Vec<IrExpr>),
    /// A list or map literal: the allocation, then one insertion per entry.
    Collection {
        ctor: TypeHash,
        insert: MethodTarget,
        entries: Vec<Vec<IrExpr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<IrExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    Compare {
        op: CompareOp,
        kind: CompareKind,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    IsNull {
        operand: Box<IrExpr>,
        negated: bool,
    },
    And(Box<IrExpr>, Box<IrExpr>),
    Or(Box<IrExpr>, Box<IrExpr>),
    Not(Box<IrExpr>),
    Conditional {
        condition: Box<IrExpr>,
        then: Box<IrExpr>,
        otherwise: Box<IrExpr>,
    },
    Elvis {
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    Instanceof {
        operand: Box<IrExpr>,
        target: DataType,
    },
    Cast {
        cast: Cast,
        expr: Box<IrExpr>,
    },
    FunctionRef {
        reference: FunctionRef,
        captures: Vec<IrExpr>,
    },
    /// The reference constant, then its captured values.
    DefRef {
        reference: DefRef,
        captures: Vec<IrExpr>,
    },
    NullSafe {
        temp: VarId,
        receiver: Box<IrExpr>,
        access: Box<IrExpr>,
    },
}

// ============================================================================
// Storage
// ============================================================================

/// One link of an access chain.
///
/// Receiver and index operands form the *setup* of the access: they are
/// evaluated once, and a compound store duplicates them instead of
/// evaluating them again.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
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
        receiver: IrExpr,
        field: FieldTarget,
    },
    StaticField {
        field: FieldTarget,
    },
    UnitStatic {
        index: u16,
    },
    ArrayElement {
        array: IrExpr,
        index: IrExpr,
        /// Rewrite a negative index to `length + index` first.
        normalize: bool,
    },
    ListElement {
        list: IrExpr,
        index: IrExpr,
        get: MethodTarget,
        set: MethodTarget,
        /// Present when the index is normalized.
        size: Option<MethodTarget>,
    },
    MapEntry {
        map: IrExpr,
        key: IrExpr,
        get: MethodTarget,
        put: MethodTarget,
    },
    Shortcut {
        receiver: IrExpr,
        getter: Option<MethodTarget>,
        setter: Option<MethodTarget>,
    },
    DefField {
        receiver: IrExpr,
        load: CallSite,
        store: CallSite,
    },
    DefIndex {
        receiver: IrExpr,
        index: IrExpr,
        normalize: CallSite,
        load: CallSite,
        store: CallSite,
    },
}

impl Access {
    /// Number of stack values the setup leaves for the load or store.
    pub fn setup_size(&self) -> usize {
        match self {
            Access::Local { .. }
            | Access::Member { .. }
            | Access::StaticField { .. }
            | Access::UnitStatic { .. } => 0,
            Access::Field { .. } | Access::Shortcut { .. } | Access::DefField { .. } => 1,
            Access::ArrayElement { .. }
            | Access::ListElement { .. }
            | Access::MapEntry { .. }
            | Access::DefIndex { .. } => 2,
        }
    }
}

/// Which value a store leaves on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBack {
    /// Statement context: nothing.
    None,
    /// The value before the operation, for postfix increments.
    Old,
    /// The value written.
    New,
}

/// The operator of a compound store.
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundOp {
    Static { op: BinaryOp, ty: DataType },
    Dynamic(CallSite),
    /// String `+=`, with the operand types of the concatenation.
    Concat(Vec<DataType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub operation: CompoundOp,
    pub widen: Option<Cast>,
    pub narrow: Option<Cast>,
}

/// A write: setup, optional load and operation, then the store itself.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreNode {
    pub access: Access,
    /// The value stored, or the right operand of a compound operation.
    pub value: IrExpr,
    pub compound: Option<Compound>,
    pub read_back: ReadBack,
    /// Type of the storage location.
    pub stored: DataType,
}
