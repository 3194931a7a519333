//! Conversions between static types.
//!
//! A [`Cast`] describes one conversion step that bridges an expression to
//! the type its context expects. Lookups follow a fixed order:
//!
//! 1. `def` on either side (box or upcast into it, defer out of it)
//! 2. `null` to any reference
//! 3. primitive to primitive (widening implicit, narrowing explicit)
//! 4. boxing and unboxing
//! 5. the reference hierarchy (upcast implicit, downcast explicit)
//!
//! The cost of an implicit conversion ranks overload candidates.

use sable_catalog::TypeCatalog;
use sable_core::{CompilationError, DataType, PrimitiveKind, Span, known};

use crate::typed::{Expr, ExprKind, Literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Between primitives.
    Numeric,
    /// Primitive into its box, or into a supertype of the box.
    Box,
    /// Box to primitive, then an optional widening.
    Unbox {
        /// The source is a supertype of the box and must be checked first.
        checked: bool,
        then: Option<PrimitiveKind>,
    },
    /// No-op at run time.
    Upcast,
    /// Checked at run time.
    Downcast,
    /// Out of `def`, resolved by the runtime.
    Dynamic,
    /// One-character string to `char`.
    StringToChar,
}

/// One conversion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cast {
    pub from: DataType,
    pub to: DataType,
    /// Written as a cast expression in the script.
    pub explicit: bool,
    pub kind: CastKind,
}

impl Cast {
    pub const COST_UPCAST: u32 = 1;
    pub const COST_BOX: u32 = 10;
    pub const COST_DYNAMIC: u32 = 20;
    /// Marker for conversions that are never implicit.
    pub const COST_EXPLICIT_ONLY: u32 = 100;

    fn new(from: DataType, to: DataType, kind: CastKind) -> Self {
        Self {
            from,
            to,
            explicit: false,
            kind,
        }
    }

    /// Rank of this conversion during overload resolution.
    pub fn cost(&self) -> u32 {
        match self.kind {
            CastKind::Numeric => match (self.from.primitive(), self.to.primitive()) {
                (Some(from), Some(to)) => from
                    .widening_distance(to)
                    .unwrap_or(Self::COST_EXPLICIT_ONLY),
                _ => Self::COST_EXPLICIT_ONLY,
            },
            CastKind::Box => {
                let exact = self.from.primitive().map(|p| p.boxed()) == Some(self.to.type_hash);
                if exact { Self::COST_BOX } else { Self::COST_BOX + 1 }
            }
            CastKind::Unbox { checked: false, then } => {
                let widen = match (self.from.boxed_primitive(), then) {
                    (Some(from), Some(to)) => from.widening_distance(to).unwrap_or(0),
                    _ => 0,
                };
                Self::COST_BOX + widen
            }
            CastKind::Upcast => Self::COST_UPCAST,
            CastKind::Dynamic => Self::COST_DYNAMIC,
            CastKind::Unbox { checked: true, .. }
            | CastKind::Downcast
            | CastKind::StringToChar => Self::COST_EXPLICIT_ONLY,
        }
    }
}

/// The implicit conversion from `from` to `to`, when one exists.
///
/// `from == to` needs no conversion and yields `None`.
pub fn implicit(catalog: &dyn TypeCatalog, from: DataType, to: DataType) -> Option<Cast> {
    find(catalog, from, to).filter(|cast| cast.cost() < Cast::COST_EXPLICIT_ONLY)
}

/// The conversion a cast expression `(to) value` performs.
pub fn explicit(catalog: &dyn TypeCatalog, from: DataType, to: DataType) -> Option<Cast> {
    let mut cast = find(catalog, from, to)?;
    cast.explicit = true;
    Some(cast)
}

/// Conversion cost for overload ranking; `None` when not implicit.
pub fn cost(catalog: &dyn TypeCatalog, from: DataType, to: DataType) -> Option<u32> {
    if from == to {
        return Some(0);
    }
    if from.is_null() && to.is_reference() {
        return Some(Cast::COST_UPCAST);
    }
    implicit(catalog, from, to).map(|cast| cast.cost())
}

fn find(catalog: &dyn TypeCatalog, from: DataType, to: DataType) -> Option<Cast> {
    if from == to || from.is_void() || to.is_void() {
        return None;
    }

    if to.is_def() {
        let kind = if from.is_primitive() {
            CastKind::Box
        } else {
            CastKind::Upcast
        };
        return Some(Cast::new(from, to, kind));
    }
    if from.is_def() {
        return Some(Cast::new(from, to, CastKind::Dynamic));
    }
    if from.is_null() {
        return to.is_reference().then(|| Cast::new(from, to, CastKind::Upcast));
    }

    match (from.primitive(), to.primitive()) {
        (Some(PrimitiveKind::Boolean), Some(_)) | (Some(_), Some(PrimitiveKind::Boolean)) => None,
        (Some(_), Some(_)) => Some(Cast::new(from, to, CastKind::Numeric)),
        (Some(prim), None) => {
            let boxed = prim.boxed();
            (!to.is_array() && catalog.is_subtype(boxed, to.type_hash))
                .then(|| Cast::new(from, to, CastKind::Box))
        }
        (None, Some(target)) => unbox(catalog, from, to, target),
        (None, None) => reference(catalog, from, to),
    }
}

fn unbox(catalog: &dyn TypeCatalog, from: DataType, to: DataType, target: PrimitiveKind) -> Option<Cast> {
    if let Some(boxed) = from.boxed_primitive() {
        // Widening after unboxing is implicit, narrowing never is.
        boxed.widening_distance(target)?;
        let then = (boxed != target).then_some(target);
        return Some(Cast::new(
            from,
            to,
            CastKind::Unbox {
                checked: false,
                then,
            },
        ));
    }
    if from.is_string() && target == PrimitiveKind::Char {
        return Some(Cast::new(from, to, CastKind::StringToChar));
    }
    (!from.is_array() && catalog.is_subtype(target.boxed(), from.type_hash)).then(|| {
        Cast::new(
            from,
            to,
            CastKind::Unbox {
                checked: true,
                then: None,
            },
        )
    })
}

fn reference(catalog: &dyn TypeCatalog, from: DataType, to: DataType) -> Option<Cast> {
    if from.is_array() || to.is_array() {
        if to == DataType::OBJECT {
            return Some(Cast::new(from, to, CastKind::Upcast));
        }
        if from == DataType::OBJECT {
            return Some(Cast::new(from, to, CastKind::Downcast));
        }
        if from.dims == to.dims
            && from.element().is_reference()
            && to.element().is_reference()
            && catalog.is_subtype(from.type_hash, to.type_hash)
        {
            return Some(Cast::new(from, to, CastKind::Upcast));
        }
        return None;
    }

    if catalog.is_subtype(from.type_hash, to.type_hash) {
        return Some(Cast::new(from, to, CastKind::Upcast));
    }
    let is_interface = |ty: DataType| {
        catalog
            .get_type(ty.type_hash)
            .is_some_and(|entry| entry.is_interface())
    };
    if catalog.is_subtype(to.type_hash, from.type_hash) || is_interface(from) || is_interface(to) {
        return Some(Cast::new(from, to, CastKind::Downcast));
    }
    None
}

/// Bridge `expr` to `to` with an implicit conversion.
pub fn coerce(catalog: &dyn TypeCatalog, expr: Expr, to: DataType) -> Result<Expr, CompilationError> {
    convert(catalog, expr, to, false)
}

/// Apply a cast expression.
pub fn cast_to(catalog: &dyn TypeCatalog, expr: Expr, to: DataType) -> Result<Expr, CompilationError> {
    convert(catalog, expr, to, true)
}

fn convert(
    catalog: &dyn TypeCatalog,
    mut expr: Expr,
    to: DataType,
    explicit_cast: bool,
) -> Result<Expr, CompilationError> {
    if expr.ty == to {
        return Ok(expr);
    }
    if expr.is_null() && to.is_reference() {
        expr.ty = to;
        return Ok(expr);
    }
    if let Some(folded) = narrow_constant(&expr, to, explicit_cast) {
        return Ok(folded);
    }
    let found = if explicit_cast {
        explicit(catalog, expr.ty, to)
    } else {
        implicit(catalog, expr.ty, to)
    };
    match found {
        Some(cast) => Ok(wrap(expr, cast)),
        None => Err(invalid_cast(catalog, expr.ty, to, expr.span)),
    }
}

/// Wrap `expr` in a cast node.
pub fn wrap(expr: Expr, cast: Cast) -> Expr {
    let span = expr.span;
    Expr::new(
        ExprKind::Cast {
            cast,
            expr: Box::new(expr),
        },
        cast.to,
        span,
    )
}

/// Int constants that fit a narrower integral context, and one-character
/// strings in a `char` context, convert without a cast node.
fn narrow_constant(expr: &Expr, to: DataType, explicit_cast: bool) -> Option<Expr> {
    let ExprKind::Constant(literal) = &expr.kind else {
        return None;
    };
    let target = to.primitive()?;
    match literal {
        Literal::Int(value) if expr.ty == DataType::INT => {
            let fits = match target {
                PrimitiveKind::Byte => i8::try_from(*value).is_ok(),
                PrimitiveKind::Short => i16::try_from(*value).is_ok(),
                PrimitiveKind::Char => u16::try_from(*value).is_ok(),
                _ => false,
            };
            fits.then(|| Expr::constant(Literal::Int(*value), to, expr.span))
        }
        Literal::String(text) if target == PrimitiveKind::Char && !explicit_cast => {
            let mut chars = text.chars();
            let c = chars.next()?;
            let code = u16::try_from(u32::from(c)).ok()?;
            chars
                .next()
                .is_none()
                .then(|| Expr::constant(Literal::Int(i32::from(code)), to, expr.span))
        }
        _ => None,
    }
}

pub fn invalid_cast(catalog: &dyn TypeCatalog, from: DataType, to: DataType, span: Span) -> CompilationError {
    CompilationError::InvalidCast {
        from: catalog.type_name(from),
        to: catalog.type_name(to),
        span,
    }
}

/// Whether values of `ty` may be thrown and caught.
pub fn is_throwable(catalog: &dyn TypeCatalog, ty: DataType) -> bool {
    !ty.is_array()
        && catalog
            .get_type(ty.type_hash)
            .is_some_and(|entry| entry.throwable || catalog.is_subtype(ty.type_hash, known::THROWABLE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_catalog::Catalog;
    use sable_core::{TypeHash, known};

    fn catalog() -> Catalog {
        Catalog::standard().unwrap()
    }

    fn kind(from: DataType, to: DataType) -> Option<CastKind> {
        implicit(&catalog(), from, to).map(|cast| cast.kind)
    }

    #[test]
    fn widening_is_implicit_narrowing_is_not() {
        assert_eq!(kind(DataType::INT, DataType::LONG), Some(CastKind::Numeric));
        assert_eq!(kind(DataType::LONG, DataType::INT), None);
        let narrowing = explicit(&catalog(), DataType::LONG, DataType::INT).unwrap();
        assert!(narrowing.explicit);
        assert_eq!(narrowing.kind, CastKind::Numeric);
    }

    #[test]
    fn def_conversions() {
        assert_eq!(kind(DataType::INT, DataType::DEF), Some(CastKind::Box));
        assert_eq!(kind(DataType::STRING, DataType::DEF), Some(CastKind::Upcast));
        assert_eq!(kind(DataType::DEF, DataType::INT), Some(CastKind::Dynamic));
    }

    #[test]
    fn boxing_reaches_supertypes_of_the_box() {
        let integer = DataType::simple(known::INTEGER);
        assert_eq!(kind(DataType::INT, integer), Some(CastKind::Box));
        assert_eq!(kind(DataType::INT, DataType::OBJECT), Some(CastKind::Box));
        assert_eq!(kind(DataType::INT, DataType::simple(known::NUMBER)), Some(CastKind::Box));
        assert_eq!(kind(DataType::INT, DataType::simple(known::LONG_BOX)), None);
    }

    #[test]
    fn unboxing_then_widening() {
        let integer = DataType::simple(known::INTEGER);
        assert_eq!(
            kind(integer, DataType::LONG),
            Some(CastKind::Unbox {
                checked: false,
                then: Some(PrimitiveKind::Long)
            })
        );
        assert_eq!(kind(DataType::OBJECT, DataType::INT), None);
        let checked = explicit(&catalog(), DataType::OBJECT, DataType::INT).unwrap();
        assert_eq!(
            checked.kind,
            CastKind::Unbox {
                checked: true,
                then: None
            }
        );
    }

    #[test]
    fn hierarchy_casts() {
        let list = DataType::simple(known::LIST);
        let array_list = DataType::simple(known::ARRAY_LIST);
        assert_eq!(kind(array_list, list), Some(CastKind::Upcast));
        assert_eq!(kind(list, array_list), None);
        assert_eq!(
            explicit(&catalog(), list, array_list).map(|c| c.kind),
            Some(CastKind::Downcast)
        );
        assert_eq!(kind(DataType::STRING, list), None);
    }

    #[test]
    fn costs_rank_conversions() {
        let catalog = catalog();
        assert_eq!(cost(&catalog, DataType::INT, DataType::INT), Some(0));
        assert_eq!(cost(&catalog, DataType::INT, DataType::LONG), Some(1));
        assert_eq!(cost(&catalog, DataType::INT, DataType::DOUBLE), Some(3));
        assert!(cost(&catalog, DataType::INT, DataType::DEF).unwrap() >= Cast::COST_BOX);
        assert_eq!(cost(&catalog, DataType::NULL, DataType::STRING), Some(1));
        assert_eq!(cost(&catalog, DataType::NULL, DataType::INT), None);
    }

    #[test]
    fn constants_narrow_when_they_fit() {
        let catalog = catalog();
        let span = Span::new(1, 1, 3);
        let small = Expr::constant(Literal::Int(100), DataType::INT, span);
        let narrowed = coerce(&catalog, small, DataType::BYTE).unwrap();
        assert_eq!(narrowed.ty, DataType::BYTE);
        assert!(matches!(narrowed.kind, ExprKind::Constant(_)));

        let large = Expr::constant(Literal::Int(1000), DataType::INT, span);
        assert!(coerce(&catalog, large, DataType::BYTE).is_err());
    }

    #[test]
    fn single_character_strings_become_chars() {
        let catalog = catalog();
        let span = Span::new(1, 1, 3);
        let text = Expr::constant(Literal::String("a".into()), DataType::STRING, span);
        let c = coerce(&catalog, text, DataType::CHAR).unwrap();
        assert_eq!(c.kind, ExprKind::Constant(Literal::Int(97)));

        let long = Expr::constant(Literal::String("ab".into()), DataType::STRING, span);
        assert!(coerce(&catalog, long, DataType::CHAR).is_err());
    }

    #[test]
    fn throwables() {
        let catalog = catalog();
        assert!(is_throwable(&catalog, DataType::simple(TypeHash::from_name("Exception"))));
        assert!(!is_throwable(&catalog, DataType::STRING));
    }
}
