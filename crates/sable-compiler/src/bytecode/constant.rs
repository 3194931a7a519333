//! Constant pool for compiled units.
//!
//! The constant pool stores values referenced by bytecode instructions:
//! numeric and string literals, type and member handles, and the
//! descriptors of dynamic call sites and function references.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use sable_core::{DataType, TypeHash};

use crate::dispatch::{CallSite, DefRef, FunctionRef};

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    /// String literal text, escapes already resolved.
    String(String),
    /// A type operand for casts, boxing, `instanceof` and array allocation.
    Type(DataType),
    Method(TypeHash),
    Field(TypeHash),
    Constructor(TypeHash),
    CallSite(CallSite),
    FunctionRef(FunctionRef),
    DefRef(DefRef),
    /// Operand types of one `Concat` instruction, in push order.
    ConcatRecipe(Vec<DataType>),
}

/// Unit-level constant pool with deduplication.
///
/// Shared across all functions in a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<Constant, u32>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get an existing constant; returns its index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        if let Some(&idx) = self.index.get(&constant) {
            return idx;
        }
        let idx = self.constants.len() as u32;
        self.constants.push(constant.clone());
        self.index.insert(constant, idx);
        idx
    }

    pub fn add_int(&mut self, value: i32) -> u32 {
        self.add(Constant::Int(value))
    }

    pub fn add_long(&mut self, value: i64) -> u32 {
        self.add(Constant::Long(value))
    }

    pub fn add_float(&mut self, value: f32) -> u32 {
        self.add(Constant::Float(OrderedFloat(value)))
    }

    pub fn add_double(&mut self, value: f64) -> u32 {
        self.add(Constant::Double(OrderedFloat(value)))
    }

    pub fn add_string(&mut self, value: impl Into<String>) -> u32 {
        self.add(Constant::String(value.into()))
    }

    pub fn add_type(&mut self, ty: DataType) -> u32 {
        self.add(Constant::Type(ty))
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Every call site in the pool, in insertion order.
    pub fn call_sites(&self) -> impl Iterator<Item = &CallSite> {
        self.constants.iter().filter_map(|c| match c {
            Constant::CallSite(site) => Some(site),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{CallSiteFlags, DispatchKind, Recipe};

    #[test]
    fn deduplicates_values() {
        let mut pool = ConstantPool::new();
        let a = pool.add_int(42);
        let b = pool.add_long(42);
        let c = pool.add_int(42);
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn floats_hash_by_value() {
        let mut pool = ConstantPool::new();
        let a = pool.add_double(1.5);
        let b = pool.add_double(1.5);
        let nan_a = pool.add_float(f32::NAN);
        let nan_b = pool.add_float(f32::NAN);
        assert_eq!(a, b);
        assert_eq!(nan_a, nan_b);
        assert_eq!(pool.get(a), Some(&Constant::Double(OrderedFloat(1.5))));
    }

    #[test]
    fn call_sites_are_constants() {
        let mut pool = ConstantPool::new();
        let site = CallSite {
            kind: DispatchKind::BinaryOperator,
            name: "add".into(),
            arity: 2,
            recipe: Recipe::values(2),
            flags: CallSiteFlags::empty(),
            arg_types: vec![DataType::DEF, DataType::INT],
            return_type: DataType::DEF,
        };
        let a = pool.add(Constant::CallSite(site.clone()));
        let b = pool.add(Constant::CallSite(site));
        assert_eq!(a, b);
        assert_eq!(pool.call_sites().count(), 1);
    }

    #[test]
    fn strings() {
        let mut pool = ConstantPool::new();
        let idx = pool.add_string("hello");
        assert_eq!(pool.get(idx), Some(&Constant::String("hello".into())));
        assert!(pool.get(99).is_none());
    }
}
