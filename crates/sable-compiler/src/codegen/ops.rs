//! Opcode selection for operators and conversions.

use sable_core::{DataType, InternalError, PrimitiveKind, StackKind};

use crate::ast::{BinaryOp, CompareOp, UnaryOp};
use crate::bytecode::OpCode;

/// Stack width of a primitive operand type; booleans are ints.
fn stack_kind(ty: DataType) -> Result<StackKind, InternalError> {
    ty.primitive()
        .map(PrimitiveKind::stack_kind)
        .ok_or_else(|| InternalError::new(format!("operator on non-primitive type {ty:?}")))
}

pub(super) fn binary(op: BinaryOp, ty: DataType) -> Result<OpCode, InternalError> {
    use OpCode::*;
    use StackKind::*;

    let kind = stack_kind(ty)?;
    let code = match (op, kind) {
        (BinaryOp::Add, I32) => AddI32,
        (BinaryOp::Add, I64) => AddI64,
        (BinaryOp::Add, F32) => AddF32,
        (BinaryOp::Add, F64) => AddF64,
        (BinaryOp::Sub, I32) => SubI32,
        (BinaryOp::Sub, I64) => SubI64,
        (BinaryOp::Sub, F32) => SubF32,
        (BinaryOp::Sub, F64) => SubF64,
        (BinaryOp::Mul, I32) => MulI32,
        (BinaryOp::Mul, I64) => MulI64,
        (BinaryOp::Mul, F32) => MulF32,
        (BinaryOp::Mul, F64) => MulF64,
        (BinaryOp::Div, I32) => DivI32,
        (BinaryOp::Div, I64) => DivI64,
        (BinaryOp::Div, F32) => DivF32,
        (BinaryOp::Div, F64) => DivF64,
        (BinaryOp::Rem, I32) => RemI32,
        (BinaryOp::Rem, I64) => RemI64,
        (BinaryOp::Rem, F32) => RemF32,
        (BinaryOp::Rem, F64) => RemF64,
        (BinaryOp::Shl, I32) => ShlI32,
        (BinaryOp::Shl, I64) => ShlI64,
        (BinaryOp::Shr, I32) => ShrI32,
        (BinaryOp::Shr, I64) => ShrI64,
        (BinaryOp::Ushr, I32) => UshrI32,
        (BinaryOp::Ushr, I64) => UshrI64,
        (BinaryOp::BitAnd, I32) => AndI32,
        (BinaryOp::BitAnd, I64) => AndI64,
        (BinaryOp::BitOr, I32) => OrI32,
        (BinaryOp::BitOr, I64) => OrI64,
        (BinaryOp::BitXor, I32) => XorI32,
        (BinaryOp::BitXor, I64) => XorI64,
        _ => {
            return Err(InternalError::new(format!(
                "no {op:?} instruction for {kind:?} operands"
            )));
        }
    };
    Ok(code)
}

/// `None` for unary plus, which emits nothing.
pub(super) fn unary(op: UnaryOp, ty: DataType) -> Result<Option<OpCode>, InternalError> {
    use StackKind::*;

    let code = match (op, stack_kind(ty)?) {
        (UnaryOp::Plus, _) => return Ok(None),
        (UnaryOp::Not, _) => OpCode::Not,
        (UnaryOp::Neg, I32) => OpCode::NegI32,
        (UnaryOp::Neg, I64) => OpCode::NegI64,
        (UnaryOp::Neg, F32) => OpCode::NegF32,
        (UnaryOp::Neg, F64) => OpCode::NegF64,
        (UnaryOp::BitNot, I32) => OpCode::NotI32,
        (UnaryOp::BitNot, I64) => OpCode::NotI64,
        (UnaryOp::BitNot, kind) => {
            return Err(InternalError::new(format!("no bitwise not for {kind:?} operands")));
        }
    };
    Ok(Some(code))
}

/// A primitive comparison. Identity operators on primitives compare values.
pub(super) fn compare(op: CompareOp, ty: DataType) -> Result<OpCode, InternalError> {
    use OpCode::*;
    use StackKind::*;

    Ok(match (op, stack_kind(ty)?) {
        (CompareOp::Eq | CompareOp::EqRef, I32) => EqI32,
        (CompareOp::Eq | CompareOp::EqRef, I64) => EqI64,
        (CompareOp::Eq | CompareOp::EqRef, F32) => EqF32,
        (CompareOp::Eq | CompareOp::EqRef, F64) => EqF64,
        (CompareOp::Ne | CompareOp::NeRef, I32) => NeI32,
        (CompareOp::Ne | CompareOp::NeRef, I64) => NeI64,
        (CompareOp::Ne | CompareOp::NeRef, F32) => NeF32,
        (CompareOp::Ne | CompareOp::NeRef, F64) => NeF64,
        (CompareOp::Lt, I32) => LtI32,
        (CompareOp::Lt, I64) => LtI64,
        (CompareOp::Lt, F32) => LtF32,
        (CompareOp::Lt, F64) => LtF64,
        (CompareOp::Le, I32) => LeI32,
        (CompareOp::Le, I64) => LeI64,
        (CompareOp::Le, F32) => LeF32,
        (CompareOp::Le, F64) => LeF64,
        (CompareOp::Gt, I32) => GtI32,
        (CompareOp::Gt, I64) => GtI64,
        (CompareOp::Gt, F32) => GtF32,
        (CompareOp::Gt, F64) => GtF64,
        (CompareOp::Ge, I32) => GeI32,
        (CompareOp::Ge, I64) => GeI64,
        (CompareOp::Ge, F32) => GeF32,
        (CompareOp::Ge, F64) => GeF64,
    })
}

/// Instructions converting one primitive to another.
pub(super) fn numeric(from: PrimitiveKind, to: PrimitiveKind) -> Vec<OpCode> {
    use OpCode::*;
    use StackKind::*;

    if from == to {
        return Vec::new();
    }

    let mut codes = Vec::with_capacity(2);
    match (from.stack_kind(), to.stack_kind()) {
        (I32, I64) => codes.push(I2L),
        (I32, F32) => codes.push(I2F),
        (I32, F64) => codes.push(I2D),
        (I64, I32) => codes.push(L2I),
        (I64, F32) => codes.push(L2F),
        (I64, F64) => codes.push(L2D),
        (F32, I32) => codes.push(F2I),
        (F32, I64) => codes.push(F2L),
        (F32, F64) => codes.push(F2D),
        (F64, I32) => codes.push(D2I),
        (F64, I64) => codes.push(D2L),
        (F64, F32) => codes.push(D2F),
        _ => {}
    }

    // Truncate to a narrower int type unless the source already fits.
    let fits = |narrow: &[PrimitiveKind]| narrow.contains(&from);
    match to {
        PrimitiveKind::Byte => codes.push(I2B),
        PrimitiveKind::Short if !fits(&[PrimitiveKind::Byte]) => codes.push(I2S),
        PrimitiveKind::Char => codes.push(I2C),
        _ => {}
    }
    codes
}
