//! Expression compilation.
//!
//! Every expression leaves exactly one value on the stack, except `void`
//! calls and silent stores, which leave none. Boolean operators compile
//! to branches; [`branch`](FunctionCompiler::branch) is the entry point
//! for conditions, and a boolean *value* is a branch that pushes `true`
//! or `false`.

use ordered_float::OrderedFloat;
use sable_core::{DataType, InternalError};

use super::{Emitted, FunctionCompiler, ops};
use crate::ast::CompareOp;
use crate::bytecode::{Constant, OpCode};
use crate::emit::JumpLabel;
use crate::ir::{Dispatch, IrExpr, IrExprKind};
use crate::resolve::cast::{Cast, CastKind};
use crate::typed::{CompareKind, Invocation, Literal, MethodTarget};

impl FunctionCompiler<'_> {
    pub(super) fn expr(&mut self, expr: &IrExpr) -> Emitted {
        self.emitter.set_line(expr.span.line);

        match &expr.kind {
            IrExprKind::Constant(literal) => self.literal(literal),
            IrExprKind::Load(access) => {
                self.setup(access)?;
                self.load(access)
            }
            IrExprKind::Store(store) => self.store(store),
            IrExprKind::Invoke {
                dispatch,
                receiver,
                args,
            } => {
                if let Some(receiver) = receiver {
                    self.expr(receiver)?;
                }
                self.exprs(args)?;
                self.dispatch(dispatch)
            }
            IrExprKind::InvokeLocal { index, args } => {
                self.exprs(args)?;
                self.emitter.emit_u16(OpCode::CallLocal, *index);
                Ok(())
            }
            IrExprKind::New { ctor, args } => {
                self.exprs(args)?;
                self.emitter.emit_with(OpCode::New, Constant::Constructor(*ctor))
            }
            IrExprKind::NewArray { dims } => {
                self.exprs(dims)?;
                let count = u8::try_from(dims.len())
                    .map_err(|_| InternalError::new("too many array dimensions").at(expr.span))?;
                self.emitter.emit_new_array(expr.ty, count)
            }
            IrExprKind::ArrayInit { values } => {
                let length = i32::try_from(values.len())
                    .map_err(|_| InternalError::new("array initializer too long").at(expr.span))?;
                self.emitter.emit_int(length)?;
                self.emitter.emit_new_array(expr.ty, 1)?;
                for (i, value) in (0..).zip(values) {
                    self.emitter.emit(OpCode::Dup);
                    self.emitter.emit_int(i)?;
                    self.expr(value)?;
                    self.emitter.emit(OpCode::ArrayStore);
                }
                Ok(())
            }
            IrExprKind::ArrayLength(array) => {
                self.expr(array)?;
                self.emitter.emit(OpCode::ArrayLength);
                Ok(())
            }
            IrExprKind::Concat(operands) => {
                self.exprs(operands)?;
                let recipe = operands.iter().map(|operand| operand.ty).collect();
                self.emitter.emit_with(OpCode::Concat, Constant::ConcatRecipe(recipe))
            }
            IrExprKind::Collection { ctor, insert, entries } => {
                self.emitter.emit_with(OpCode::New, Constant::Constructor(*ctor))?;
                for entry in entries {
                    self.emitter.emit(OpCode::Dup);
                    self.exprs(entry)?;
                    self.call(insert)?;
                    self.discard(insert.return_type);
                }
                Ok(())
            }
            IrExprKind::Unary { op, operand } => {
                self.expr(operand)?;
                if let Some(code) = ops::unary(*op, expr.ty).map_err(|e| e.at(expr.span))? {
                    self.emitter.emit(code);
                }
                Ok(())
            }
            IrExprKind::Binary { op, left, right } => {
                self.expr(left)?;
                self.expr(right)?;
                let code = ops::binary(*op, expr.ty).map_err(|e| e.at(expr.span))?;
                self.emitter.emit(code);
                Ok(())
            }
            IrExprKind::Compare { op, kind, left, right } => {
                self.expr(left)?;
                self.expr(right)?;
                self.compare(*op, *kind).map_err(|e| e.at(expr.span))
            }
            IrExprKind::IsNull { operand, negated } => {
                self.expr(operand)?;
                self.emitter.emit(OpCode::IsNull);
                if *negated {
                    self.emitter.emit(OpCode::Not);
                }
                Ok(())
            }
            IrExprKind::Not(operand) => {
                self.expr(operand)?;
                self.emitter.emit(OpCode::Not);
                Ok(())
            }
            IrExprKind::And(..) | IrExprKind::Or(..) => {
                let when_false = self.branch(expr, false)?;
                self.emitter.emit_bool(true);
                let end = self.emitter.emit_jump(OpCode::Jump);
                self.emitter.patch_all(when_false)?;
                self.emitter.emit_bool(false);
                self.emitter.patch_jump(end)
            }
            IrExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let when_false = self.branch(condition, false)?;
                self.expr(then)?;
                let end = self.emitter.emit_jump(OpCode::Jump);
                self.emitter.patch_all(when_false)?;
                self.expr(otherwise)?;
                self.emitter.patch_jump(end)
            }
            IrExprKind::Elvis { left, right } => {
                self.expr(left)?;
                self.emitter.emit(OpCode::Dup);
                let end = self.emitter.emit_jump(OpCode::JumpIfNonNull);
                self.emitter.emit_pop();
                self.expr(right)?;
                self.emitter.patch_jump(end)
            }
            IrExprKind::Instanceof { operand, target } => {
                self.expr(operand)?;
                self.emitter.emit_type(OpCode::InstanceOf, *target)
            }
            IrExprKind::Cast { cast, expr: inner } => {
                self.expr(inner)?;
                self.cast(cast).map_err(|e| e.at(expr.span))
            }
            IrExprKind::FunctionRef { reference, captures } => {
                self.exprs(captures)?;
                self.emitter
                    .emit_with(OpCode::MakeRef, Constant::FunctionRef(reference.clone()))
            }
            IrExprKind::DefRef { reference, captures } => {
                self.emitter.emit_constant(Constant::DefRef(reference.clone()))?;
                self.exprs(captures)
            }
            // The null receiver is the result when the jump is taken.
            IrExprKind::NullSafe {
                temp,
                receiver,
                access,
            } => {
                self.expr(receiver)?;
                self.emitter.emit(OpCode::Dup);
                let is_null = self.emitter.emit_jump(OpCode::JumpIfNull);
                let slot = self.slots.slot_or_declare(*temp)?;
                self.emitter.emit_set_local(slot);
                self.expr(access)?;
                self.void_as_null(access);
                self.emitter.patch_jump(is_null)
            }
        }
    }

    fn exprs(&mut self, exprs: &[IrExpr]) -> Emitted {
        exprs.iter().try_for_each(|expr| self.expr(expr))
    }

    fn literal(&mut self, literal: &Literal) -> Emitted {
        match literal {
            Literal::Null => self.emitter.emit_null(),
            Literal::Bool(value) => self.emitter.emit_bool(*value),
            Literal::Int(value) => self.emitter.emit_int(*value)?,
            Literal::Long(value) => self.emitter.emit_constant(Constant::Long(*value))?,
            Literal::Float(value) => self.emitter.emit_constant(Constant::Float(OrderedFloat(*value)))?,
            Literal::Double(value) => self.emitter.emit_constant(Constant::Double(OrderedFloat(*value)))?,
            Literal::String(value) => self.emitter.emit_string(value)?,
        }
        Ok(())
    }

    /// A `void` result under `?.` still needs a value on the non-null path.
    fn void_as_null(&mut self, access: &IrExpr) {
        if access.ty.is_void() {
            self.emitter.emit_null();
        }
    }

    /// Pop a call result nobody reads.
    pub(super) fn discard(&mut self, ty: DataType) {
        if !ty.is_void() {
            self.emitter.emit_pop();
        }
    }

    pub(super) fn call(&mut self, target: &MethodTarget) -> Emitted {
        let op = match target.invocation {
            Invocation::Static => OpCode::CallStatic,
            Invocation::Virtual => OpCode::CallVirtual,
            Invocation::Interface => OpCode::CallInterface,
        };
        self.emitter.emit_with(op, Constant::Method(target.hash))
    }

    pub(super) fn dispatch(&mut self, dispatch: &Dispatch) -> Emitted {
        match dispatch {
            Dispatch::Static(target) => self.call(target),
            Dispatch::Dynamic(site) => {
                self.emitter
                    .emit_with(OpCode::InvokeDynamic, Constant::CallSite(site.clone()))
            }
        }
    }

    fn compare(&mut self, op: CompareOp, kind: CompareKind) -> Emitted {
        let code = match kind {
            CompareKind::Primitive(ty) => ops::compare(op, ty)?,
            CompareKind::Reference => OpCode::EqRef,
            CompareKind::Value => OpCode::EqValue,
        };
        self.emitter.emit(code);

        if !matches!(kind, CompareKind::Primitive(_)) {
            match op {
                CompareOp::Eq | CompareOp::EqRef => {}
                CompareOp::Ne | CompareOp::NeRef => self.emitter.emit(OpCode::Not),
                other => {
                    return Err(InternalError::new(format!("{other:?} is not an equality on references")));
                }
            }
        }
        Ok(())
    }

    /// Compile a condition as jumps: the returned labels are taken when the
    /// condition evaluates to `when`; otherwise control falls through.
    pub(super) fn branch(&mut self, condition: &IrExpr, when: bool) -> Result<Vec<JumpLabel>, InternalError> {
        self.emitter.set_line(condition.span.line);

        match &condition.kind {
            IrExprKind::Constant(Literal::Bool(value)) => Ok(if *value == when {
                vec![self.emitter.emit_jump(OpCode::Jump)]
            } else {
                Vec::new()
            }),
            IrExprKind::Not(operand) => self.branch(operand, !when),
            IrExprKind::And(left, right) => {
                if when {
                    let skip = self.branch(left, false)?;
                    let taken = self.branch(right, true)?;
                    self.emitter.patch_all(skip)?;
                    Ok(taken)
                } else {
                    let mut taken = self.branch(left, false)?;
                    taken.extend(self.branch(right, false)?);
                    Ok(taken)
                }
            }
            IrExprKind::Or(left, right) => {
                if when {
                    let mut taken = self.branch(left, true)?;
                    taken.extend(self.branch(right, true)?);
                    Ok(taken)
                } else {
                    let skip = self.branch(left, true)?;
                    let taken = self.branch(right, false)?;
                    self.emitter.patch_all(skip)?;
                    Ok(taken)
                }
            }
            IrExprKind::IsNull { operand, negated } => {
                self.expr(operand)?;
                let op = if when != *negated {
                    OpCode::JumpIfNull
                } else {
                    OpCode::JumpIfNonNull
                };
                Ok(vec![self.emitter.emit_jump(op)])
            }
            _ => {
                self.expr(condition)?;
                let op = if when { OpCode::JumpIfTrue } else { OpCode::JumpIfFalse };
                Ok(vec![self.emitter.emit_jump(op)])
            }
        }
    }

    pub(super) fn cast(&mut self, cast: &Cast) -> Emitted {
        let primitive = |ty: DataType| {
            ty.primitive()
                .ok_or_else(|| InternalError::new(format!("{ty:?} is not a primitive")))
        };

        match cast.kind {
            CastKind::Numeric => {
                for code in ops::numeric(primitive(cast.from)?, primitive(cast.to)?) {
                    self.emitter.emit(code);
                }
                Ok(())
            }
            CastKind::Box => self.emitter.emit_type(OpCode::Box, cast.from),
            CastKind::Unbox { checked: false, then } => {
                let unboxed = cast
                    .from
                    .boxed_primitive()
                    .ok_or_else(|| InternalError::new(format!("{:?} is not a box", cast.from)))?;
                self.emitter.emit_type(OpCode::Unbox, DataType::primitive_type(unboxed))?;
                if let Some(then) = then {
                    for code in ops::numeric(unboxed, then) {
                        self.emitter.emit(code);
                    }
                }
                Ok(())
            }
            CastKind::Unbox { checked: true, .. } => {
                let target = primitive(cast.to)?;
                self.emitter
                    .emit_type(OpCode::CheckCast, DataType::simple(target.boxed()))?;
                self.emitter.emit_type(OpCode::Unbox, cast.to)
            }
            CastKind::Upcast => Ok(()),
            CastKind::Downcast => self.emitter.emit_type(OpCode::CheckCast, cast.to),
            CastKind::Dynamic => self.emitter.emit_type(OpCode::DefCast, cast.to),
            CastKind::StringToChar => {
                self.emitter.emit(OpCode::StringToChar);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::generate_source;
    use crate::bytecode::{BytecodeChunk, Constant, OpCode};
    use crate::dispatch::DispatchKind;

    fn main_chunk(source: &str) -> BytecodeChunk {
        generate_source(source).0.swap_remove(0).chunk
    }

    #[test]
    fn and_short_circuits() {
        let chunk = main_chunk("boolean a = true; boolean b = false; a && b");
        // Both operands jump to the false arm.
        assert_eq!(chunk.count_op(OpCode::JumpIfFalse), 2);
        chunk.assert_contains_sequence(&[OpCode::PushTrue, OpCode::Jump, OpCode::PushFalse]);
    }

    #[test]
    fn or_short_circuits() {
        let chunk = main_chunk("boolean a = true; boolean b = false; if (a || b) { return 1; } 2");
        assert_eq!(chunk.count_op(OpCode::JumpIfTrue), 1);
        assert_eq!(chunk.count_op(OpCode::JumpIfFalse), 1);
    }

    #[test]
    fn negation_flips_branches() {
        let chunk = main_chunk("boolean a = true; if (!a) { return 1; } 2");
        assert_eq!(chunk.count_op(OpCode::Not), 0);
        assert_eq!(chunk.count_op(OpCode::JumpIfTrue), 1);
    }

    #[test]
    fn null_checks_jump_on_null() {
        let chunk = main_chunk("String s = null; if (s == null) { return 1; } 2");
        assert_eq!(chunk.count_op(OpCode::JumpIfNonNull), 1);
        assert_eq!(chunk.count_op(OpCode::IsNull), 0);
    }

    #[test]
    fn elvis_keeps_the_non_null_value() {
        let chunk = main_chunk("String s = null; s ?: 'x'");
        chunk.assert_contains_sequence(&[OpCode::Dup, OpCode::JumpIfNonNull, OpCode::Pop, OpCode::Constant]);
    }

    #[test]
    fn null_safe_access_skips_on_null() {
        let chunk = main_chunk("String s = null; s?.length()");
        chunk.assert_contains_sequence(&[OpCode::Dup, OpCode::JumpIfNull, OpCode::SetLocal, OpCode::GetLocal]);
    }

    #[test]
    fn def_calls_use_call_sites() {
        let (functions, constants) = generate_source("def d = 'abc'; d.length()");
        functions[0].chunk.assert_contains_opcodes(&[OpCode::InvokeDynamic]);
        let site = constants.call_sites().next().expect("a call site");
        assert_eq!((site.kind, site.name.as_str()), (DispatchKind::MethodCall, "length"));
    }

    #[test]
    fn bound_calls_use_method_constants() {
        let (functions, constants) = generate_source("String s = 'abc'; s.length()");
        functions[0].chunk.assert_contains_opcodes(&[OpCode::CallVirtual]);
        assert!(constants.constants().iter().any(|c| matches!(c, Constant::Method(_))));
        assert_eq!(constants.call_sites().count(), 0);
    }

    #[test]
    fn concatenation_uses_one_recipe() {
        let (functions, constants) = generate_source("int n = 2; 'a' + n + 'b'");
        assert_eq!(functions[0].chunk.count_op(OpCode::Concat), 1);
        assert!(constants
            .constants()
            .iter()
            .any(|c| matches!(c, Constant::ConcatRecipe(types) if types.len() == 3)));
    }

    #[test]
    fn list_literals_construct_then_add() {
        let chunk = main_chunk("[1, 2]");
        assert_eq!(chunk.opcodes()[0], OpCode::New);
        assert_eq!(chunk.count_op(OpCode::New), 1);
        assert_eq!(chunk.count_op(OpCode::Dup), 2);
    }

    #[test]
    fn array_initializers_store_each_value() {
        let chunk = main_chunk("int[] a = new int[] {4, 5}; a.length");
        assert_eq!(chunk.count_op(OpCode::ArrayStore), 2);
        chunk.assert_contains_opcodes(&[OpCode::ArrayLength]);
    }

    #[test]
    fn widening_emits_conversions() {
        let chunk = main_chunk("int i = 3; long l = i; l");
        chunk.assert_contains_opcodes(&[OpCode::I2L]);
    }

    #[test]
    fn def_results_convert_dynamically() {
        let chunk = main_chunk("def d = 1; int i = d; i");
        chunk.assert_contains_opcodes(&[OpCode::DefCast]);
    }
}
