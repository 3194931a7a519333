//! The dynamic-dispatch contract between compiled units and the runtime.
//!
//! Every `def` operation the resolver cannot bind becomes an
//! `InvokeDynamic` instruction naming a [`CallSite`] constant. The runtime
//! owns a bootstrap entry point per [`DispatchKind`]; on first execution it
//! resolves a concrete target from the observed argument types and caches it
//! at the call site, re-resolving when the types change.
//!
//! ## Recipes
//!
//! A [`Recipe`] has one byte per script-level argument:
//!
//! | Byte | Meaning |
//! |---|---|
//! | `0` | plain value |
//! | `n + 1` | function reference followed by `n` captured values on the stack |
//!
//! ```
//! use sable_compiler::dispatch::{ArgShape, Recipe};
//!
//! let mut recipe = Recipe::default();
//! recipe.push(ArgShape::Value);
//! recipe.push(ArgShape::Capture { captures: 2 });
//! assert_eq!(recipe.bytes(), &[0, 3]);
//! assert_eq!(recipe.stack_size(), 4);
//! ```

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use sable_core::{DataType, TypeHash};

/// Which runtime bootstrap resolves a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DispatchKind {
    /// Method call on a `def` receiver, or with `def` arguments.
    MethodCall = 0,
    /// Field or getter read on a `def` receiver.
    Load,
    /// Field or setter write on a `def` receiver.
    Store,
    /// Subscript read on a `def` receiver.
    ArrayLoad,
    /// Subscript write on a `def` receiver.
    ArrayStore,
    /// Iterator acquisition for `for` loops over `def`.
    Iterator,
    /// Negative index normalization for a `def` receiver.
    IndexNormalize,
    /// Function reference bound at run time.
    Reference,
    UnaryOperator,
    BinaryOperator,
    /// Shift, whose right operand keeps its own promotion.
    ShiftOperator,
    /// Null-tolerant comparison.
    Comparison,
}

impl DispatchKind {
    /// Name of the runtime bootstrap entry point.
    pub fn bootstrap(self) -> &'static str {
        match self {
            DispatchKind::MethodCall => "methodCall",
            DispatchKind::Load => "load",
            DispatchKind::Store => "store",
            DispatchKind::ArrayLoad => "arrayLoad",
            DispatchKind::ArrayStore => "arrayStore",
            DispatchKind::Iterator => "iterator",
            DispatchKind::IndexNormalize => "indexNormalize",
            DispatchKind::Reference => "reference",
            DispatchKind::UnaryOperator => "unaryOperator",
            DispatchKind::BinaryOperator => "binaryOperator",
            DispatchKind::ShiftOperator => "shiftOperator",
            DispatchKind::Comparison => "comparison",
        }
    }
}

/// Shape of one argument in a [`Recipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgShape {
    Value,
    /// A function reference carrying `captures` values after it.
    Capture { captures: u8 },
}

/// Per-argument encoding of a dynamic call site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Recipe(Vec<u8>);

impl Recipe {
    /// A recipe of `arity` plain values.
    pub fn values(arity: usize) -> Self {
        Self(vec![0; arity])
    }

    pub fn push(&mut self, shape: ArgShape) {
        self.0.push(match shape {
            ArgShape::Value => 0,
            ArgShape::Capture { captures } => captures.saturating_add(1),
        });
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn shapes(&self) -> impl Iterator<Item = ArgShape> + '_ {
        self.0.iter().map(|&byte| match byte {
            0 => ArgShape::Value,
            n => ArgShape::Capture { captures: n - 1 },
        })
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Whether any argument is a function reference.
    pub fn has_references(&self) -> bool {
        self.0.iter().any(|&byte| byte != 0)
    }

    /// Stack values the arguments occupy, captures included.
    pub fn stack_size(&self) -> usize {
        self.0
            .iter()
            .map(|&byte| if byte == 0 { 1 } else { byte as usize })
            .sum()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CallSiteFlags: u8 {
        /// Operator of a compound assignment; the runtime may keep the
        /// left operand's type.
        const COMPOUND = 1 << 0;
        /// Reached through `?.`; the receiver is known non-null.
        const NULL_SAFE = 1 << 1;
        /// Conversion written as an explicit cast.
        const EXPLICIT = 1 << 2;
    }
}

/// One `InvokeDynamic` call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub kind: DispatchKind,
    /// Member or operator name: `add`, `eq`, a field name, a method name.
    pub name: String,
    /// Script-level argument count, receiver excluded.
    pub arity: u8,
    pub recipe: Recipe,
    pub flags: CallSiteFlags,
    /// Static types of the stack operands, receiver first.
    pub arg_types: Vec<DataType>,
    pub return_type: DataType,
}

/// What a statically bound function reference calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// A function of the compiled unit: user function or lifted lambda.
    Local { index: u16, name: String },
    Method { hash: TypeHash, is_static: bool },
    Constructor { hash: TypeHash },
    /// `Type[]::new`.
    ArrayConstructor { ty: DataType },
}

/// A statically bound function reference: `MakeRef` pops `captures`
/// values and pushes an instance of `interface`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub interface: TypeHash,
    /// The functional method being implemented.
    pub interface_method: TypeHash,
    pub target: RefTarget,
    pub captures: u8,
}

/// A captured variable of a dynamic reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Capture {
    pub name: String,
    pub ty: DataType,
}

/// A reference whose interface is only known at run time.
///
/// `owner` is `this` for unit functions and lifted lambdas, or a type name;
/// `name` is a function name, `new`, or `lambda$N`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefRef {
    pub owner: String,
    pub name: String,
    /// Captured variables in declaration order.
    pub captures: Vec<Capture>,
}

impl DefRef {
    /// `owner::name`, as written in scripts.
    pub fn describe(&self) -> String {
        format!("{}::{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipes_mark_reference_positions() {
        let mut recipe = Recipe::values(1);
        recipe.push(ArgShape::Capture { captures: 0 });
        assert_eq!(recipe.bytes(), &[0, 1]);
        assert!(recipe.has_references());
        assert_eq!(
            recipe.shapes().collect::<Vec<_>>(),
            vec![ArgShape::Value, ArgShape::Capture { captures: 0 }]
        );
        assert_eq!(recipe.stack_size(), 2);
    }

    #[test]
    fn plain_recipes() {
        let recipe = Recipe::values(3);
        assert_eq!(recipe.arity(), 3);
        assert!(!recipe.has_references());
        assert_eq!(recipe.stack_size(), 3);
    }

    #[test]
    fn dispatch_kinds_encode_as_bytes() {
        assert_eq!(u8::from(DispatchKind::MethodCall), 0);
        assert_eq!(DispatchKind::try_from(11u8).ok(), Some(DispatchKind::Comparison));
        assert_eq!(DispatchKind::Iterator.bootstrap(), "iterator");
    }

    #[test]
    fn def_refs_describe_their_target() {
        let reference = DefRef {
            owner: "this".into(),
            name: "lambda$0".into(),
            captures: vec![Capture {
                name: "x".into(),
                ty: DataType::INT,
            }],
        };
        assert_eq!(reference.describe(), "this::lambda$0");
    }
}
