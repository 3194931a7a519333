//! Operators, literals and allocations.

use sable_core::{CompilationError, DataType, Span, known};

use super::{Resolved, Resolver, cast, internal, invalid, promote};
use crate::ast::{self, BinaryOp, BoolOp, CompareOp, UnaryOp};
use crate::dispatch::{CallSite, CallSiteFlags, DispatchKind, Recipe};
use crate::typed::{CompareKind, ConstantField, Expr, ExprKind, Literal, Place};

impl Resolver<'_> {
    /// Resolve an expression in value position.
    pub(super) fn expr(&mut self, node: &ast::Expr) -> Resolved<Expr> {
        let span = node.span;
        match &node.kind {
            ast::ExprKind::Empty => Err(internal("empty expression in value position", span)),
            ast::ExprKind::Numeric {
                digits,
                radix,
                suffix,
                decimal,
            } => numeric(digits, *radix, *suffix, *decimal, false, span),
            ast::ExprKind::Boolean(value) => {
                Ok(Expr::constant(Literal::Bool(*value), DataType::BOOLEAN, span))
            }
            ast::ExprKind::Null => Ok(Expr::constant(Literal::Null, DataType::NULL, span)),
            ast::ExprKind::Str(text) => Ok(Expr::constant(
                Literal::String(text.clone()),
                DataType::STRING,
                span,
            )),
            ast::ExprKind::Regex { pattern, flags } => self.regex(pattern, *flags, span),
            ast::ExprKind::ListInit(values) => self.list_init(values, span),
            ast::ExprKind::MapInit(entries) => self.map_init(entries, span),
            ast::ExprKind::Variable(name) => {
                let slot = self.variable_slot(name, span)?;
                self.load(slot, span)
            }
            ast::ExprKind::CallLocal { name, args } => self.call_local(name, args, span),
            ast::ExprKind::StaticRef(ty) => Err(invalid(
                format!("type '{}' is not a value", ty.display()),
                span,
            )),
            ast::ExprKind::NewObject { ty, args } => self.new_object(ty, args, span),
            ast::ExprKind::NewArray {
                ty,
                dims,
                extra_dims,
            } => self.new_array(ty, dims, *extra_dims, span),
            ast::ExprKind::NewInitializedArray { ty, values } => self.array_init(ty, values, span),
            ast::ExprKind::Lambda { .. } => Err(CompilationError::InvalidLambda {
                message: "a lambda needs a functional interface target".to_string(),
                span,
            }
            .into()),
            ast::ExprKind::FuncRef { .. } => Err(CompilationError::InvalidFunctionRef {
                message: "a function reference needs a functional interface target".to_string(),
                span,
            }
            .into()),
            ast::ExprKind::Field {
                receiver,
                name,
                null_safe,
            } => self.field_read(receiver, name, *null_safe, span),
            ast::ExprKind::Call {
                receiver,
                name,
                args,
                null_safe,
            } => self.call(receiver, name, args, *null_safe, span),
            ast::ExprKind::Index { receiver, index } => {
                let slot = self.index_slot(receiver, index, span)?;
                self.load(slot, span)
            }
            ast::ExprKind::Assign { target, op, value } => self.assign(target, *op, value, span),
            ast::ExprKind::Pre { op, target } => self.increment(target, *op, false, span),
            ast::ExprKind::Post { op, target } => self.increment(target, *op, true, span),
            ast::ExprKind::Unary { op, operand } => self.unary(*op, operand, span),
            ast::ExprKind::Binary { op, left, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                self.binary(*op, left, right, span)
            }
            ast::ExprKind::Bool { op, left, right } => {
                let left = Box::new(self.condition(left)?);
                let right = Box::new(self.condition(right)?);
                let kind = match op {
                    BoolOp::And => ExprKind::And(left, right),
                    BoolOp::Or => ExprKind::Or(left, right),
                };
                Ok(Expr::new(kind, DataType::BOOLEAN, span))
            }
            ast::ExprKind::Compare { op, left, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                self.compare(*op, left, right, span)
            }
            ast::ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => self.conditional(condition, then, otherwise, span),
            ast::ExprKind::Elvis { left, right } => self.elvis(left, right, span),
            ast::ExprKind::Instanceof { expr, ty } => {
                let target = self.data_type(ty)?;
                let operand = self.expr(expr)?;
                let operand = self.boxed_receiver(operand)?;
                Ok(Expr::new(
                    ExprKind::Instanceof {
                        operand: Box::new(operand),
                        target,
                    },
                    DataType::BOOLEAN,
                    span,
                ))
            }
            ast::ExprKind::Cast { ty, expr } => {
                let target = self.data_type(ty)?;
                if is_function_value(expr) {
                    return self.function_value(expr, target);
                }
                let value = self.expr(expr)?;
                let mut result = cast::cast_to(self.catalog, value, target)?;
                result.span = span;
                Ok(result)
            }
        }
    }

    /// Resolve an expression and bridge it to `ty`.
    pub(super) fn expr_to(&mut self, node: &ast::Expr, ty: DataType) -> Resolved<Expr> {
        if is_function_value(node) {
            return self.function_value(node, ty);
        }
        let value = self.expr(node)?;
        Ok(cast::coerce(self.catalog, value, ty)?)
    }

    pub(super) fn condition(&mut self, node: &ast::Expr) -> Resolved<Expr> {
        self.expr_to(node, DataType::BOOLEAN)
    }

    // ==========================================================================
    // Literals
    // ==========================================================================

    fn regex(&mut self, pattern: &str, flags: i32, span: Span) -> Resolved<Expr> {
        if !self.settings.regexes_enabled {
            return Err(CompilationError::RegexesDisabled { span }.into());
        }
        let index = self.index(self.constants.len(), span)?;
        let ty = DataType::simple(known::PATTERN);
        self.constants.push(ConstantField {
            name: format!("$regex{index}"),
            ty,
            source: format!("/{pattern}/"),
        });
        self.patterns.push(super::PatternConstant {
            pattern: pattern.to_string(),
            flags,
            span,
        });
        Ok(Expr::load(Place::UnitStatic { index }, ty, span))
    }

    fn list_init(&mut self, values: &[ast::Expr], span: Span) -> Resolved<Expr> {
        let ty = DataType::simple(known::ARRAY_LIST);
        let ctor = self.default_constructor(ty, span)?;
        let add = self.method(known::ARRAY_LIST, "add", 1, span)?;
        let values = values
            .iter()
            .map(|value| self.expr_to(value, DataType::DEF))
            .collect::<Resolved<Vec<_>>>()?;
        Ok(Expr::new(ExprKind::ListInit { ctor, add, values }, ty, span))
    }

    fn map_init(&mut self, entries: &[(ast::Expr, ast::Expr)], span: Span) -> Resolved<Expr> {
        let ty = DataType::simple(known::HASH_MAP);
        let ctor = self.default_constructor(ty, span)?;
        let put = self.method(known::HASH_MAP, "put", 2, span)?;
        let entries = entries
            .iter()
            .map(|(key, value)| Ok((self.expr_to(key, DataType::DEF)?, self.expr_to(value, DataType::DEF)?)))
            .collect::<Resolved<Vec<_>>>()?;
        Ok(Expr::new(ExprKind::MapInit { ctor, put, entries }, ty, span))
    }

    fn default_constructor(&self, ty: DataType, span: Span) -> Resolved<sable_core::TypeHash> {
        self.catalog
            .resolve_constructor(ty.type_hash, &[])
            .map(|ctor| ctor.hash)
            .ok_or_else(|| {
                CompilationError::UnknownConstructor {
                    type_name: self.type_name(ty),
                    arity: 0,
                    span,
                }
                .into()
            })
    }

    // ==========================================================================
    // Allocation
    // ==========================================================================

    fn new_object(&mut self, name: &ast::TypeName, args: &[ast::Expr], span: Span) -> Resolved<Expr> {
        let ty = self.data_type(name)?;
        if ty.is_array() || !ty.is_reference() || ty.is_def() {
            return Err(invalid(format!("cannot construct '{}'", name.display()), span));
        }
        let catalog = self.catalog;
        let ctors = catalog.lookup_constructors(ty.type_hash, args.len());
        if ctors.is_empty() {
            return Err(CompilationError::UnknownConstructor {
                type_name: self.type_name(ty),
                arity: args.len(),
                span,
            }
            .into());
        }
        let args = self.arguments(args)?;
        let candidates: Vec<&[DataType]> = ctors.iter().map(|c| c.params.as_slice()).collect();
        let chosen = self.select(&candidates, &args, &self.type_name(ty), span)?;
        let ctor = ctors[chosen];
        let args = self.bind_args(args, &ctor.params)?;
        Ok(Expr::new(
            ExprKind::New {
                owner: ty.type_hash,
                ctor: ctor.hash,
                args,
            },
            ty,
            span,
        ))
    }

    fn new_array(
        &mut self,
        name: &ast::TypeName,
        dims: &[ast::Expr],
        extra: u8,
        span: Span,
    ) -> Resolved<Expr> {
        let base = self.value_type(name)?;
        let total = u8::try_from(dims.len())
            .ok()
            .and_then(|n| n.checked_add(extra))
            .and_then(|n| n.checked_add(base.dims))
            .ok_or_else(|| invalid("too many array dimensions", span))?;
        let dims = dims
            .iter()
            .map(|dim| self.expr_to(dim, DataType::INT))
            .collect::<Resolved<Vec<_>>>()?;
        Ok(Expr::new(
            ExprKind::NewArray { dims },
            DataType::array(base.type_hash, total),
            span,
        ))
    }

    fn array_init(&mut self, name: &ast::TypeName, values: &[ast::Expr], span: Span) -> Resolved<Expr> {
        let ty = self.value_type(name)?;
        if !ty.is_array() {
            return Err(invalid(format!("'{}' is not an array type", name.display()), span));
        }
        let element = ty.element();
        let values = values
            .iter()
            .map(|value| self.expr_to(value, element))
            .collect::<Resolved<Vec<_>>>()?;
        Ok(Expr::new(ExprKind::ArrayInit { values }, ty, span))
    }

    // ==========================================================================
    // Operators
    // ==========================================================================

    fn unary(&mut self, op: UnaryOp, operand: &ast::Expr, span: Span) -> Resolved<Expr> {
        if let (
            UnaryOp::Neg,
            ast::ExprKind::Numeric {
                digits,
                radix,
                suffix,
                decimal,
            },
        ) = (op, &operand.kind)
        {
            return numeric(digits, *radix, *suffix, *decimal, true, span);
        }
        if op == UnaryOp::Not {
            let operand = self.condition(operand)?;
            return Ok(Expr::new(ExprKind::Not(Box::new(operand)), DataType::BOOLEAN, span));
        }

        let operand = self.expr(operand)?;
        if operand.ty.is_def() {
            return Ok(operator(
                DispatchKind::UnaryOperator,
                op.name(),
                vec![operand],
                DataType::DEF,
                CallSiteFlags::empty(),
                span,
            ));
        }
        let kind = promote::numeric(operand.ty)
            .filter(|kind| op != UnaryOp::BitNot || kind.is_integral())
            .ok_or_else(|| {
                invalid(
                    format!("cannot apply '{}' to '{}'", op.name(), self.type_name(operand.ty)),
                    span,
                )
            })?;
        let ty = DataType::primitive_type(promote::unary(kind));
        let mut operand = cast::coerce(self.catalog, operand, ty)?;
        if op == UnaryOp::Plus {
            operand.span = span;
            return Ok(operand);
        }
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        ))
    }

    /// A binary operator over resolved operands.
    pub(super) fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr, span: Span) -> Resolved<Expr> {
        if matches!(op, BinaryOp::Find | BinaryOp::Match) {
            return self.regex_match(op, left, right, span);
        }
        // Checked before concatenation: `'a' + def` is resolved at run time.
        if left.ty.is_def() || right.ty.is_def() {
            let kind = if op.is_shift() {
                DispatchKind::ShiftOperator
            } else {
                DispatchKind::BinaryOperator
            };
            return Ok(operator(
                kind,
                op.name(),
                vec![left, right],
                DataType::DEF,
                CallSiteFlags::empty(),
                span,
            ));
        }
        if op == BinaryOp::Add && (left.ty.is_string() || right.ty.is_string()) {
            if left.ty.is_void() || right.ty.is_void() {
                return Err(invalid("cannot concatenate 'void'", span));
            }
            return Ok(Expr::new(
                ExprKind::Concat(Box::new(left), Box::new(right)),
                DataType::STRING,
                span,
            ));
        }

        let undefined = || {
            invalid(
                format!(
                    "cannot apply '{}' to '{}' and '{}'",
                    op.symbol(),
                    self.type_name(left.ty),
                    self.type_name(right.ty)
                ),
                span,
            )
        };
        if op.is_shift() {
            let lty = promote::shift_operand(left.ty).ok_or_else(undefined)?;
            let rty = promote::shift_operand(right.ty).ok_or_else(undefined)?;
            let left = cast::coerce(self.catalog, left, lty)?;
            let right = shift_distance(self, right, rty)?;
            return Ok(Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                lty,
                span,
            ));
        }
        let ty = if op.is_bitwise() {
            promote::bitwise(left.ty, right.ty)
        } else {
            promote::arithmetic(left.ty, right.ty)
        }
        .ok_or_else(undefined)?;
        let left = cast::coerce(self.catalog, left, ty)?;
        let right = cast::coerce(self.catalog, right, ty)?;
        Ok(Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        ))
    }

    /// `text =~ pattern` and `text ==~ pattern`.
    fn regex_match(&mut self, op: BinaryOp, left: Expr, right: Expr, span: Span) -> Resolved<Expr> {
        if !self.settings.regexes_enabled {
            return Err(CompilationError::RegexesDisabled { span }.into());
        }
        let text = cast::coerce(self.catalog, left, DataType::simple(known::CHAR_SEQUENCE))?;
        let pattern = cast::coerce(self.catalog, right, DataType::simple(known::PATTERN))?;
        let matcher = self.method(known::PATTERN, "matcher", 1, span)?;
        let test = self.method(known::MATCHER, op.name(), 0, span)?;
        let matcher = Expr::new(
            ExprKind::Call {
                receiver: Some(Box::new(pattern)),
                target: matcher,
                args: vec![text],
            },
            DataType::simple(known::MATCHER),
            span,
        );
        Ok(Expr::new(
            ExprKind::Call {
                receiver: Some(Box::new(matcher)),
                target: test,
                args: Vec::new(),
            },
            DataType::BOOLEAN,
            span,
        ))
    }

    fn compare(&mut self, op: CompareOp, left: Expr, right: Expr, span: Span) -> Resolved<Expr> {
        let boolean = |left: Expr, right: Expr, kind: CompareKind| {
            Expr::new(
                ExprKind::Compare {
                    op,
                    kind,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                DataType::BOOLEAN,
                span,
            )
        };
        let undefined = |this: &Self, left: &Expr, right: &Expr| {
            invalid(
                format!(
                    "cannot compare '{}' and '{}'",
                    this.type_name(left.ty),
                    this.type_name(right.ty)
                ),
                span,
            )
        };

        if op.is_equality() && (left.is_null() || right.is_null()) {
            let operand = if left.is_null() { right } else { left };
            if operand.ty.is_primitive() || operand.ty.is_void() {
                return Err(invalid(
                    format!("'{}' is never null", self.type_name(operand.ty)),
                    span,
                ));
            }
            return Ok(Expr::new(
                ExprKind::IsNull {
                    operand: Box::new(operand),
                    negated: op.is_negated(),
                },
                DataType::BOOLEAN,
                span,
            ));
        }

        if left.ty.is_def() || right.ty.is_def() {
            if matches!(op, CompareOp::EqRef | CompareOp::NeRef) {
                let left = cast::coerce(self.catalog, left, DataType::DEF)?;
                let right = cast::coerce(self.catalog, right, DataType::DEF)?;
                return Ok(boolean(left, right, CompareKind::Reference));
            }
            return Ok(operator(
                DispatchKind::Comparison,
                op.name(),
                vec![left, right],
                DataType::BOOLEAN,
                CallSiteFlags::empty(),
                span,
            ));
        }

        if let Some(ty) = promote::arithmetic(left.ty, right.ty) {
            let left = cast::coerce(self.catalog, left, ty)?;
            let right = cast::coerce(self.catalog, right, ty)?;
            return Ok(boolean(left, right, CompareKind::Primitive(ty)));
        }
        if !op.is_equality() {
            return Err(undefined(self, &left, &right));
        }
        if promote::boolean(left.ty) && promote::boolean(right.ty) {
            let left = cast::coerce(self.catalog, left, DataType::BOOLEAN)?;
            let right = cast::coerce(self.catalog, right, DataType::BOOLEAN)?;
            return Ok(boolean(left, right, CompareKind::Primitive(DataType::BOOLEAN)));
        }
        if left.ty.is_reference() && right.ty.is_reference() {
            let kind = match op {
                CompareOp::EqRef | CompareOp::NeRef => CompareKind::Reference,
                _ => CompareKind::Value,
            };
            return Ok(boolean(left, right, kind));
        }
        Err(undefined(self, &left, &right))
    }

    fn conditional(
        &mut self,
        condition: &ast::Expr,
        then: &ast::Expr,
        otherwise: &ast::Expr,
        span: Span,
    ) -> Resolved<Expr> {
        let condition = self.condition(condition)?;
        let then = self.expr(then)?;
        let otherwise = self.expr(otherwise)?;
        let ty = self.unify(then.ty, otherwise.ty, span)?;
        let then = cast::coerce(self.catalog, then, ty)?;
        let otherwise = cast::coerce(self.catalog, otherwise, ty)?;
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            ty,
            span,
        ))
    }

    fn elvis(&mut self, left: &ast::Expr, right: &ast::Expr, span: Span) -> Resolved<Expr> {
        let left = self.expr(left)?;
        if !left.ty.is_reference() || left.is_null() {
            return Err(invalid(
                format!("'?:' needs a reference on the left, found '{}'", self.type_name(left.ty)),
                span,
            ));
        }
        let right = self.expr(right)?;
        let mut ty = self.unify(left.ty, right.ty, span)?;
        if let Some(kind) = ty.primitive() {
            ty = DataType::simple(kind.boxed());
        }
        let left = cast::coerce(self.catalog, left, ty)?;
        let right = cast::coerce(self.catalog, right, ty)?;
        Ok(Expr::new(
            ExprKind::Elvis {
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        ))
    }

    /// The common type of two branches.
    fn unify(&self, a: DataType, b: DataType, span: Span) -> Resolved<DataType> {
        if a.is_void() || b.is_void() {
            return Err(invalid("a branch has no value", span));
        }
        if a == b {
            return Ok(a);
        }
        if a.is_def() || b.is_def() {
            return Ok(DataType::DEF);
        }
        if let Some(ty) = promote::arithmetic(a, b)
            && (a.is_primitive() || b.is_primitive())
        {
            return Ok(ty);
        }
        if promote::boolean(a) && promote::boolean(b) {
            return Ok(DataType::BOOLEAN);
        }
        let reference = |ty: DataType| match ty.primitive() {
            Some(kind) => DataType::simple(kind.boxed()),
            None => ty,
        };
        let (a, b) = (reference(a), reference(b));
        if a.is_null() {
            return Ok(b);
        }
        if b.is_null() {
            return Ok(a);
        }
        if cast::implicit(self.catalog, a, b).is_some_and(|c| c.cost() == cast::Cast::COST_UPCAST) {
            return Ok(b);
        }
        if cast::implicit(self.catalog, b, a).is_some_and(|c| c.cost() == cast::Cast::COST_UPCAST) {
            return Ok(a);
        }
        Ok(DataType::OBJECT)
    }
}

/// Whether a node is typed by its context rather than by itself.
pub(super) fn is_function_value(node: &ast::Expr) -> bool {
    matches!(
        node.kind,
        ast::ExprKind::Lambda { .. } | ast::ExprKind::FuncRef { .. }
    )
}

/// The right operand of a shift: promoted on its own, `long` narrowed.
pub(super) fn shift_distance(resolver: &Resolver<'_>, right: Expr, ty: DataType) -> Resolved<Expr> {
    let right = cast::coerce(resolver.catalog, right, ty)?;
    if ty == DataType::LONG {
        return Ok(cast::cast_to(resolver.catalog, right, DataType::INT)?);
    }
    Ok(right)
}

/// An `InvokeDynamic` operator over `operands`, the first being the receiver.
pub(super) fn operator(
    kind: DispatchKind,
    name: &str,
    operands: Vec<Expr>,
    return_type: DataType,
    flags: CallSiteFlags,
    span: Span,
) -> Expr {
    let arity = u8::from(operands.len() > 1);
    let site = CallSite {
        kind,
        name: name.to_string(),
        arity,
        recipe: Recipe::values(usize::from(arity)),
        flags,
        arg_types: operands.iter().map(|operand| operand.ty).collect(),
        return_type,
    };
    Expr::new(
        ExprKind::Dynamic {
            site,
            args: operands,
        },
        return_type,
        span,
    )
}

/// A numeric literal, negated when it is the operand of unary minus.
fn numeric(
    digits: &str,
    radix: u32,
    suffix: Option<char>,
    decimal: bool,
    negative: bool,
    span: Span,
) -> Resolved<Expr> {
    let text = if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    };
    let out_of_range = |kind: &str| -> sable_core::Error {
        CompilationError::InvalidConstant {
            message: format!("'{text}' is not a valid {kind}"),
            span,
        }
        .into()
    };

    if decimal {
        return match suffix {
            Some('f') => {
                let value: f32 = text.parse().map_err(|_| out_of_range("float"))?;
                if !value.is_finite() {
                    return Err(out_of_range("float"));
                }
                Ok(Expr::constant(Literal::Float(value), DataType::FLOAT, span))
            }
            _ => {
                let value: f64 = text.parse().map_err(|_| out_of_range("double"))?;
                if !value.is_finite() {
                    return Err(out_of_range("double"));
                }
                Ok(Expr::constant(Literal::Double(value), DataType::DOUBLE, span))
            }
        };
    }

    let sign = |value: i64| if negative { value.wrapping_neg() } else { value };
    match suffix {
        Some('l') => {
            let value = if radix == 10 {
                text.parse::<i64>().ok()
            } else {
                u64::from_str_radix(digits, radix).ok().map(|v| sign(v as i64))
            };
            let value = value.ok_or_else(|| out_of_range("long"))?;
            Ok(Expr::constant(Literal::Long(value), DataType::LONG, span))
        }
        None => {
            let value = if radix == 10 {
                text.parse::<i32>().ok()
            } else {
                u32::from_str_radix(digits, radix).ok().map(|v| {
                    let v = v as i32;
                    if negative { v.wrapping_neg() } else { v }
                })
            };
            let value = value.ok_or_else(|| out_of_range("int"))?;
            Ok(Expr::constant(Literal::Int(value), DataType::INT, span))
        }
        Some(other) => Err(out_of_range(&format!("number with suffix '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{compile_error, resolve_source, resolve_with};
    use super::*;
    use crate::interface::ScriptInterface;
    use crate::typed::{Stmt, TypedUnit};
    use sable_core::CompilerSettings;

    /// The value returned by the main function.
    fn returned(unit: &TypedUnit) -> &Expr {
        unit.functions[0]
            .body
            .iter()
            .rev()
            .find_map(|stmt| match stmt {
                Stmt::Return(Some(value)) => Some(value),
                _ => None,
            })
            .expect("main returns a value")
    }

    fn returned_type(source: &str) -> DataType {
        let unit = resolve_source(source).unwrap();
        let value = returned(&unit);
        // Main returns `def`; look through the boxing cast.
        match &value.kind {
            ExprKind::Cast { expr, .. } => expr.ty,
            _ => value.ty,
        }
    }

    #[test]
    fn numeric_literal_types() {
        assert_eq!(returned_type("1"), DataType::INT);
        assert_eq!(returned_type("1L"), DataType::LONG);
        assert_eq!(returned_type("1.5"), DataType::DOUBLE);
        assert_eq!(returned_type("1.5f"), DataType::FLOAT);
        assert_eq!(returned_type("0xFF"), DataType::INT);
    }

    #[test]
    fn minimum_values_are_legal() {
        let unit = resolve_source("-2147483648").unwrap();
        let ExprKind::Cast { expr, .. } = &returned(&unit).kind else {
            panic!("expected a boxing cast");
        };
        assert_eq!(expr.kind, ExprKind::Constant(Literal::Int(i32::MIN)));
        assert!(resolve_source("-9223372036854775808L").is_ok());
    }

    #[test]
    fn out_of_range_literals_are_rejected() {
        assert!(matches!(
            compile_error("2147483648"),
            CompilationError::InvalidConstant { .. }
        ));
        assert!(matches!(
            compile_error("1e999"),
            CompilationError::InvalidConstant { .. }
        ));
    }

    #[test]
    fn hex_literals_reinterpret_bits() {
        let unit = resolve_source("0xFFFFFFFF").unwrap();
        let ExprKind::Cast { expr, .. } = &returned(&unit).kind else {
            panic!("expected a boxing cast");
        };
        assert_eq!(expr.kind, ExprKind::Constant(Literal::Int(-1)));
    }

    #[test]
    fn promotion_follows_the_lattice() {
        assert_eq!(returned_type("byte a = 1; short b = 2; a + b"), DataType::INT);
        assert_eq!(returned_type("int a = 1; long b = 2; a * b"), DataType::LONG);
        assert_eq!(returned_type("long a = 1; float b = 2; a - b"), DataType::FLOAT);
        assert_eq!(returned_type("float a = 1; double b = 2; a / b"), DataType::DOUBLE);
        assert_eq!(returned_type("Integer a = 1; a + 1L"), DataType::LONG);
    }

    #[test]
    fn shifts_promote_each_side_alone() {
        assert_eq!(returned_type("int a = 1; long b = 2; a << b"), DataType::INT);
        assert_eq!(returned_type("long a = 1; a >> 2"), DataType::LONG);
        assert!(matches!(
            compile_error("double d = 1; d << 1"),
            CompilationError::InvalidOperation { .. }
        ));
    }

    #[test]
    fn string_plus_is_concatenation() {
        let unit = resolve_source("1 + 2 + 'a'").unwrap();
        let ExprKind::Cast { expr, .. } = &returned(&unit).kind else {
            panic!("expected an upcast");
        };
        let ExprKind::Concat(left, _) = &expr.kind else {
            panic!("expected concatenation, got {:?}", expr.kind);
        };
        assert_eq!(left.ty, DataType::INT);
    }

    #[test]
    fn def_operands_dispatch_dynamically() {
        let unit = resolve_source("def x = 1; x + 1").unwrap();
        let value = returned(&unit);
        let ExprKind::Dynamic { site, args } = &value.kind else {
            panic!("expected a call site, got {:?}", value.kind);
        };
        assert_eq!(site.kind, DispatchKind::BinaryOperator);
        assert_eq!(site.name, "add");
        assert_eq!(site.arity, 1);
        assert_eq!(site.arg_types, vec![DataType::DEF, DataType::INT]);
        assert_eq!(args.len(), 2);

        let unit = resolve_source("def x = 1; x << 1L").unwrap();
        let ExprKind::Dynamic { site, .. } = &returned(&unit).kind else {
            panic!("expected a call site");
        };
        assert_eq!(site.kind, DispatchKind::ShiftOperator);
    }

    #[test]
    fn def_operands_defer_concatenation() {
        for (source, arg_types) in [
            ("def x = 1; x + 'a'", [DataType::DEF, DataType::STRING]),
            ("def x = 1; 'a' + x", [DataType::STRING, DataType::DEF]),
        ] {
            let unit = resolve_source(source).unwrap();
            let value = returned(&unit);
            assert!(value.ty.is_def(), "{source}: {:?}", value.ty);
            let ExprKind::Dynamic { site, .. } = &value.kind else {
                panic!("{source}: expected a call site, got {:?}", value.kind);
            };
            assert_eq!(site.kind, DispatchKind::BinaryOperator);
            assert_eq!(site.name, "add");
            assert_eq!(site.arg_types, arg_types);
        }
    }

    #[test]
    fn every_def_binary_operator_is_dynamic() {
        for op in ["+", "-", "*", "/", "%", "&", "|", "^", "<<", ">>", ">>>"] {
            for source in [format!("def x = 1; x {op} 2"), format!("def x = 1; 2 {op} x")] {
                let unit = resolve_source(&source).unwrap();
                assert!(returned(&unit).ty.is_def(), "{source}");
            }
        }
    }

    #[test]
    fn equality_against_null_is_a_null_check() {
        let unit = resolve_source("def x = null; x == null").unwrap();
        let ExprKind::Cast { expr, .. } = &returned(&unit).kind else {
            panic!("expected boxing");
        };
        assert!(matches!(expr.kind, ExprKind::IsNull { negated: false, .. }));
        assert!(matches!(
            compile_error("int i = 0; i == null"),
            CompilationError::InvalidOperation { .. }
        ));
    }

    #[test]
    fn equality_kinds() {
        let kind_of = |source: &str| {
            let unit = resolve_source(source).unwrap();
            let value = returned(&unit).clone();
            let ExprKind::Cast { expr, .. } = value.kind else {
                panic!("expected boxing");
            };
            match expr.kind {
                ExprKind::Compare { kind, .. } => Some(kind),
                ExprKind::Dynamic { site, .. } => {
                    assert_eq!(site.kind, DispatchKind::Comparison);
                    None
                }
                other => panic!("unexpected {other:?}"),
            }
        };
        assert_eq!(kind_of("1 == 2L"), Some(CompareKind::Primitive(DataType::LONG)));
        assert_eq!(kind_of("true != false"), Some(CompareKind::Primitive(DataType::BOOLEAN)));
        assert_eq!(kind_of("String a = 'x'; a == 'y'"), Some(CompareKind::Value));
        assert_eq!(kind_of("String a = 'x'; a === 'y'"), Some(CompareKind::Reference));
        assert_eq!(kind_of("def a = 1; a == 1"), None);
        assert_eq!(kind_of("def a = 1; a === 1"), Some(CompareKind::Reference));
    }

    #[test]
    fn conditional_branches_unify() {
        assert_eq!(returned_type("boolean b = true; b ? 1 : 2L"), DataType::LONG);
        assert_eq!(returned_type("boolean b = true; b ? 'a' : null"), DataType::STRING);
        assert_eq!(returned_type("boolean b = true; b ? new ArrayList() : new HashMap()"), DataType::OBJECT);
    }

    #[test]
    fn elvis_needs_a_reference() {
        assert_eq!(returned_type("String s = null; s ?: 'x'"), DataType::STRING);
        assert!(matches!(
            compile_error("int i = 0; i ?: 1"),
            CompilationError::InvalidOperation { .. }
        ));
    }

    #[test]
    fn regexes_respect_settings() {
        let disabled = CompilerSettings::default().with_regexes(false);
        let err = resolve_with("'abc' =~ /b/", &ScriptInterface::generic(), &disabled).unwrap_err();
        assert!(matches!(
            err,
            sable_core::Error::Compilation(CompilationError::RegexesDisabled { .. })
        ));
        assert!(resolve_source("'abc' =~ /b/").is_ok());
    }

    #[test]
    fn collection_literals() {
        assert_eq!(returned_type("[1, 2, 3]"), DataType::simple(known::ARRAY_LIST));
        assert_eq!(returned_type("['a': 1]"), DataType::simple(known::HASH_MAP));
    }

    #[test]
    fn arrays() {
        assert_eq!(
            returned_type("new int[2][3]"),
            DataType::array(sable_core::primitives::INT, 2)
        );
        assert_eq!(
            returned_type("new String[] {'a', 'b'}"),
            DataType::array(known::STRING, 1)
        );
        assert!(matches!(
            compile_error("new int[] {1, 'a'}"),
            CompilationError::InvalidCast { .. }
        ));
    }

    #[test]
    fn lambdas_need_a_target() {
        assert!(matches!(
            compile_error("def f = x -> x; f"),
            CompilationError::InvalidLambda { .. }
        ));
    }
}
