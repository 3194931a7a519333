//! Storage locations: places to access links.

use sable_core::{DataType, InternalError, Span};

use super::{Lowered, Lowerer};
use crate::dispatch::{CallSite, CallSiteFlags, DispatchKind, Recipe};
use crate::ir::Access;
use crate::typed::{Expr, ExprKind, Literal, Place};

impl Lowerer<'_> {
    pub(super) fn access(&mut self, place: &Place, span: Span) -> Lowered<Access> {
        Ok(match place {
            Place::Local { var, name } => Access::Local {
                var: *var,
                name: name.clone(),
            },
            Place::Member { hash, name } => Access::Member {
                hash: *hash,
                name: name.clone(),
            },
            Place::Field { receiver, field } => Access::Field {
                receiver: self.value(receiver)?,
                field: field.clone(),
            },
            Place::StaticField { field } => Access::StaticField {
                field: field.clone(),
            },
            Place::UnitStatic { index } => Access::UnitStatic { index: *index },
            Place::ArrayElement { array, index } => Access::ArrayElement {
                normalize: may_be_negative(index),
                array: self.value(array)?,
                index: self.value(index)?,
            },
            Place::ListElement {
                list,
                index,
                get,
                set,
                size,
            } => Access::ListElement {
                size: may_be_negative(index).then(|| size.clone()),
                list: self.value(list)?,
                index: self.value(index)?,
                get: get.clone(),
                set: set.clone(),
            },
            Place::MapEntry { map, key, get, put } => Access::MapEntry {
                map: self.value(map)?,
                key: self.value(key)?,
                get: get.clone(),
                put: put.clone(),
            },
            Place::Shortcut {
                receiver,
                getter,
                setter,
                ..
            } => Access::Shortcut {
                receiver: self.value(receiver)?,
                getter: getter.clone(),
                setter: setter.clone(),
            },
            Place::DefField { receiver, name } => {
                let receiver = self.value(receiver)?;
                Access::DefField {
                    load: site(DispatchKind::Load, name, vec![receiver.ty], DataType::DEF),
                    store: site(
                        DispatchKind::Store,
                        name,
                        vec![receiver.ty, DataType::DEF],
                        DataType::VOID,
                    ),
                    receiver,
                }
            }
            Place::DefIndex { receiver, index } => {
                let receiver = self.value(receiver)?;
                let index = self.value(index)?;
                let (rty, ity) = (receiver.ty, index.ty);
                Access::DefIndex {
                    normalize: site(DispatchKind::IndexNormalize, "normalizeIndex", vec![rty, ity], ity),
                    load: site(DispatchKind::ArrayLoad, "arrayLoad", vec![rty, ity], DataType::DEF),
                    store: site(
                        DispatchKind::ArrayStore,
                        "arrayStore",
                        vec![rty, ity, DataType::DEF],
                        DataType::VOID,
                    ),
                    receiver,
                    index,
                }
            }
            Place::ArrayLength { .. } => {
                return Err(InternalError::new("array length is not a storage location").at(span));
            }
        })
    }
}

/// Whether an index needs the negative-index rewrite. Only non-negative
/// constants are known to be safe.
fn may_be_negative(index: &Expr) -> bool {
    !matches!(index.kind, ExprKind::Constant(Literal::Int(value)) if value >= 0)
}

/// A field or subscript call site; operands are the receiver, the key, and
/// for stores the value.
fn site(kind: DispatchKind, name: &str, arg_types: Vec<DataType>, return_type: DataType) -> CallSite {
    let arity = arg_types.len().saturating_sub(1);
    CallSite {
        kind,
        name: name.to_string(),
        arity: arity as u8,
        recipe: Recipe::values(arity),
        flags: CallSiteFlags::empty(),
        arg_types,
        return_type,
    }
}
