//! The numeric promotion lattice.
//!
//! `double > float > long > int`; `byte`, `short` and `char` promote to
//! `int`. Boxed operands take part through the primitive they box.

use sable_core::{DataType, PrimitiveKind};

/// The primitive a numeric operand contributes, unboxing boxes.
pub fn numeric(ty: DataType) -> Option<PrimitiveKind> {
    ty.primitive()
        .or_else(|| ty.boxed_primitive())
        .filter(|kind| kind.is_numeric())
}

/// The primitive a boolean operand contributes.
pub fn boolean(ty: DataType) -> bool {
    matches!(
        ty.primitive().or_else(|| ty.boxed_primitive()),
        Some(PrimitiveKind::Boolean)
    )
}

/// Unary promotion: sub-int integral types widen to `int`.
pub fn unary(kind: PrimitiveKind) -> PrimitiveKind {
    match kind {
        PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char => PrimitiveKind::Int,
        other => other,
    }
}

/// Binary promotion of two numeric kinds.
pub fn binary(left: PrimitiveKind, right: PrimitiveKind) -> PrimitiveKind {
    use PrimitiveKind::*;
    match (unary(left), unary(right)) {
        (Double, _) | (_, Double) => Double,
        (Float, _) | (_, Float) => Float,
        (Long, _) | (_, Long) => Long,
        _ => Int,
    }
}

/// Promoted operand type of an arithmetic operator, or `None` when either
/// side is not numeric.
pub fn arithmetic(left: DataType, right: DataType) -> Option<DataType> {
    Some(DataType::primitive_type(binary(numeric(left)?, numeric(right)?)))
}

/// Promoted operand type of `&`, `|`, `^`: integral or boolean.
pub fn bitwise(left: DataType, right: DataType) -> Option<DataType> {
    if boolean(left) && boolean(right) {
        return Some(DataType::BOOLEAN);
    }
    let (l, r) = (numeric(left)?, numeric(right)?);
    (l.is_integral() && r.is_integral()).then(|| DataType::primitive_type(binary(l, r)))
}

/// Promoted type of one integral operand of a shift.
pub fn shift_operand(ty: DataType) -> Option<DataType> {
    let kind = numeric(ty).filter(|k| k.is_integral())?;
    Some(DataType::primitive_type(unary(kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::known;

    #[test]
    fn narrow_integrals_promote_to_int() {
        assert_eq!(arithmetic(DataType::BYTE, DataType::SHORT), Some(DataType::INT));
        assert_eq!(arithmetic(DataType::CHAR, DataType::CHAR), Some(DataType::INT));
    }

    #[test]
    fn wider_side_wins() {
        assert_eq!(arithmetic(DataType::INT, DataType::LONG), Some(DataType::LONG));
        assert_eq!(arithmetic(DataType::INT, DataType::FLOAT), Some(DataType::FLOAT));
        assert_eq!(arithmetic(DataType::LONG, DataType::FLOAT), Some(DataType::FLOAT));
        assert_eq!(arithmetic(DataType::FLOAT, DataType::DOUBLE), Some(DataType::DOUBLE));
    }

    #[test]
    fn boxes_take_part() {
        let integer = DataType::simple(known::INTEGER);
        assert_eq!(arithmetic(integer, DataType::LONG), Some(DataType::LONG));
        assert_eq!(arithmetic(DataType::STRING, DataType::INT), None);
        assert_eq!(arithmetic(DataType::BOOLEAN, DataType::INT), None);
    }

    #[test]
    fn bitwise_and_shift_operands() {
        assert_eq!(bitwise(DataType::BOOLEAN, DataType::BOOLEAN), Some(DataType::BOOLEAN));
        assert_eq!(bitwise(DataType::INT, DataType::LONG), Some(DataType::LONG));
        assert_eq!(bitwise(DataType::INT, DataType::DOUBLE), None);
        assert_eq!(shift_operand(DataType::SHORT), Some(DataType::INT));
        assert_eq!(shift_operand(DataType::LONG), Some(DataType::LONG));
        assert_eq!(shift_operand(DataType::FLOAT), None);
    }
}
