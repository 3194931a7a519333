//! Loads and stores through access links.
//!
//! A store runs in four steps:
//!
//! ```text
//! [setup]               receiver and key, evaluated once
//! Dup / Dup2            compound only: copy the setup for the load
//! [load] [op value]     compound only
//! DupX1 / DupX2         read-back: copy the result under the setup
//! [store]
//! ```

use sable_core::InternalError;

use super::{Emitted, FunctionCompiler};
use crate::bytecode::{Constant, OpCode};
use crate::dispatch::CallSite;
use crate::ir::{Access, CompoundOp, IrExpr, ReadBack, StoreNode};
use crate::typed::MethodTarget;

impl FunctionCompiler<'_> {
    /// Push the operands a load or store of `access` consumes.
    pub(super) fn setup(&mut self, access: &Access) -> Emitted {
        match access {
            Access::Local { .. } | Access::Member { .. } | Access::StaticField { .. } | Access::UnitStatic { .. } => {
                Ok(())
            }
            Access::Field { receiver, .. } | Access::Shortcut { receiver, .. } | Access::DefField { receiver, .. } => {
                self.expr(receiver)
            }
            Access::ArrayElement {
                array,
                index,
                normalize,
            } => {
                self.pair(array, index)?;
                if *normalize {
                    // [array, index] -> [array, index, length]
                    self.emitter.emit_byte(OpCode::Pick, 1);
                    self.emitter.emit(OpCode::ArrayLength);
                    self.emitter.emit(OpCode::NormalizeIndex);
                }
                Ok(())
            }
            Access::ListElement { list, index, size, .. } => {
                self.pair(list, index)?;
                if let Some(size) = size {
                    self.emitter.emit_byte(OpCode::Pick, 1);
                    self.call(size)?;
                    self.emitter.emit(OpCode::NormalizeIndex);
                }
                Ok(())
            }
            Access::MapEntry { map, key, .. } => self.pair(map, key),
            Access::DefIndex {
                receiver,
                index,
                normalize,
                ..
            } => {
                self.pair(receiver, index)?;
                // [receiver, index] -> [receiver, receiver, index]
                self.emitter.emit_byte(OpCode::Pick, 1);
                self.emitter.emit(OpCode::Swap);
                self.site(normalize)
            }
        }
    }

    fn pair(&mut self, first: &IrExpr, second: &IrExpr) -> Emitted {
        self.expr(first)?;
        self.expr(second)
    }

    /// Read through `access`, consuming its setup.
    pub(super) fn load(&mut self, access: &Access) -> Emitted {
        match access {
            Access::Local { var, .. } => {
                let slot = self.slots.slot(*var)?;
                self.emitter.emit_get_local(slot);
                Ok(())
            }
            Access::Member { hash, name } => {
                let receiver = self
                    .receiver
                    .ok_or_else(|| InternalError::new(format!("member `{name}` read without a receiver")))?;
                self.emitter.emit_get_local(receiver);
                self.emitter.emit_with(OpCode::GetField, Constant::Field(*hash))
            }
            Access::Field { field, .. } => self.emitter.emit_with(OpCode::GetField, Constant::Field(field.hash)),
            Access::StaticField { field } => self.emitter.emit_with(OpCode::GetStatic, Constant::Field(field.hash)),
            Access::UnitStatic { index } => {
                self.emitter.emit_u16(OpCode::GetUnitStatic, *index);
                Ok(())
            }
            Access::ArrayElement { .. } => {
                self.emitter.emit(OpCode::ArrayLoad);
                Ok(())
            }
            Access::ListElement { get, .. } | Access::MapEntry { get, .. } => self.call(get),
            Access::Shortcut { getter, .. } => {
                let getter = getter.as_ref().ok_or_else(|| InternalError::new("shortcut without a getter"))?;
                self.call(getter)
            }
            Access::DefField { load, .. } | Access::DefIndex { load, .. } => self.site(load),
        }
    }

    /// Write the value on top of the stack through `access`, consuming its
    /// setup. Setter results are dropped.
    fn store_to(&mut self, access: &Access) -> Emitted {
        match access {
            Access::Local { var, .. } => {
                let slot = self.slots.slot(*var)?;
                self.emitter.emit_set_local(slot);
                Ok(())
            }
            Access::Member { name, .. } => Err(InternalError::new(format!("member `{name}` is read-only"))),
            Access::Field { field, .. } => self.emitter.emit_with(OpCode::SetField, Constant::Field(field.hash)),
            Access::StaticField { field } => self.emitter.emit_with(OpCode::SetStatic, Constant::Field(field.hash)),
            Access::UnitStatic { index } => {
                self.emitter.emit_u16(OpCode::SetUnitStatic, *index);
                Ok(())
            }
            Access::ArrayElement { .. } => {
                self.emitter.emit(OpCode::ArrayStore);
                Ok(())
            }
            Access::ListElement { set: method, .. } | Access::MapEntry { put: method, .. } => self.call_discarding(method),
            Access::Shortcut { setter, .. } => {
                let setter = setter.as_ref().ok_or_else(|| InternalError::new("shortcut without a setter"))?;
                self.call_discarding(setter)
            }
            Access::DefField { store, .. } | Access::DefIndex { store, .. } => {
                self.site(store)?;
                self.discard(store.return_type);
                Ok(())
            }
        }
    }

    pub(super) fn store(&mut self, node: &StoreNode) -> Emitted {
        let depth = node.access.setup_size();
        self.setup(&node.access)?;

        match &node.compound {
            None => {
                self.expr(&node.value)?;
                if node.read_back != ReadBack::None {
                    self.emitter.emit_dup_under(depth)?;
                }
            }
            Some(compound) => {
                self.emitter.emit_dup(depth)?;
                self.load(&node.access)?;
                if node.read_back == ReadBack::Old {
                    self.emitter.emit_dup_under(depth)?;
                }
                if let Some(widen) = &compound.widen {
                    self.cast(widen)?;
                }

                self.expr(&node.value)?;
                match &compound.operation {
                    CompoundOp::Static { op, ty } => {
                        let code = super::ops::binary(*op, *ty).map_err(|e| e.at(node.value.span))?;
                        self.emitter.emit(code);
                    }
                    CompoundOp::Dynamic(site) => self.site(site)?,
                    CompoundOp::Concat(types) => {
                        self.emitter
                            .emit_with(OpCode::Concat, Constant::ConcatRecipe(types.clone()))?;
                    }
                }

                if let Some(narrow) = &compound.narrow {
                    self.cast(narrow)?;
                }
                if node.read_back == ReadBack::New {
                    self.emitter.emit_dup_under(depth)?;
                }
            }
        }

        self.store_to(&node.access)
    }

    fn site(&mut self, site: &CallSite) -> Emitted {
        self.emitter
            .emit_with(OpCode::InvokeDynamic, Constant::CallSite(site.clone()))
    }

    fn call_discarding(&mut self, method: &MethodTarget) -> Emitted {
        self.call(method)?;
        self.discard(method.return_type);
        Ok(())
    }
}
