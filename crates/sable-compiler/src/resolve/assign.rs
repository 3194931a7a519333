//! Assignment, compound assignment, and increments.

use sable_core::{CompilationError, DataType, PrimitiveKind, Span};

use super::access::Slot;
use super::expr::shift_distance;
use super::{Resolved, Resolver, cast, invalid, promote};
use crate::ast::{self, BinaryOp, IncDec};
use crate::dispatch::{CallSite, CallSiteFlags, DispatchKind, Recipe};
use crate::typed::{Expr, ExprKind, Literal, Operation};

impl Resolver<'_> {
    /// `target = value`, or `target op= value` when `op` is set.
    pub(super) fn assign(
        &mut self,
        target: &ast::Expr,
        op: Option<BinaryOp>,
        value: &ast::Expr,
        span: Span,
    ) -> Resolved<Expr> {
        let slot = self.writable(target)?;
        match op {
            None => {
                let value = self.expr_to(value, slot.ty)?;
                let ty = slot.ty;
                Ok(Expr::new(
                    ExprKind::Assign {
                        place: Box::new(slot.place),
                        value: Box::new(value),
                    },
                    ty,
                    span,
                ))
            }
            Some(op) => {
                let value = self.expr(value)?;
                self.compound(slot, op, value, false, span)
            }
        }
    }

    /// `++x`, `x--` and friends: a compound add or subtract of one.
    pub(super) fn increment(&mut self, target: &ast::Expr, op: IncDec, post: bool, span: Span) -> Resolved<Expr> {
        let slot = self.writable(target)?;
        let one = if slot.ty.is_def() {
            one(PrimitiveKind::Int, span)
        } else {
            let kind = promote::numeric(slot.ty).ok_or_else(|| {
                invalid(
                    format!("cannot increment '{}'", self.type_name(slot.ty)),
                    span,
                )
            })?;
            one(promote::unary(kind), span)
        };
        self.compound(slot, op.op(), one, post, span)
    }

    /// The left side of an assignment.
    fn writable(&mut self, target: &ast::Expr) -> Resolved<Slot> {
        let span = target.span;
        let slot = match &target.kind {
            ast::ExprKind::Variable(name) => self.variable_slot(name, span)?,
            ast::ExprKind::Field {
                null_safe: true, ..
            } => return Err(invalid("cannot assign through '?.'", span)),
            ast::ExprKind::Field { receiver, name, .. } => match &receiver.kind {
                ast::ExprKind::StaticRef(owner) => self.static_field(owner, name, span)?,
                _ => {
                    let receiver = self.expr(receiver)?;
                    self.member_slot(receiver, name, span)?
                }
            },
            ast::ExprKind::Index { receiver, index } => self.index_slot(receiver, index, span)?,
            _ => return Err(invalid("invalid assignment target", span)),
        };
        if let Some(name) = &slot.read_only {
            return Err(CompilationError::ReadOnly {
                name: name.clone(),
                span,
            }
            .into());
        }
        Ok(slot)
    }

    fn compound(&mut self, slot: Slot, op: BinaryOp, value: Expr, post: bool, span: Span) -> Resolved<Expr> {
        self.readable(&slot, span)?;
        let stored = slot.ty;
        if matches!(op, BinaryOp::Find | BinaryOp::Match) {
            return Err(invalid(format!("'{}' cannot be compounded", op.symbol()), span));
        }
        if value.ty.is_void() {
            return Err(invalid("cannot assign 'void'", value.span));
        }

        let (operation, value, widen, narrow) = if stored.is_def() || value.ty.is_def() {
            let kind = if op.is_shift() {
                DispatchKind::ShiftOperator
            } else {
                DispatchKind::BinaryOperator
            };
            let site = CallSite {
                kind,
                name: op.name().to_string(),
                arity: 1,
                recipe: Recipe::values(1),
                flags: CallSiteFlags::COMPOUND,
                arg_types: vec![stored, value.ty],
                return_type: stored,
            };
            (Operation::Dynamic(site), value, None, None)
        } else if op == BinaryOp::Add && stored.is_string() {
            (Operation::Concat, value, None, None)
        } else {
            let undefined = || {
                invalid(
                    format!(
                        "cannot apply '{}=' to '{}' and '{}'",
                        op.symbol(),
                        self.type_name(stored),
                        self.type_name(value.ty)
                    ),
                    span,
                )
            };
            let (ty, value) = if op.is_shift() {
                let ty = promote::shift_operand(stored).ok_or_else(undefined)?;
                let distance = promote::shift_operand(value.ty).ok_or_else(undefined)?;
                (ty, shift_distance(self, value, distance)?)
            } else {
                let ty = if op.is_bitwise() {
                    promote::bitwise(stored, value.ty)
                } else {
                    promote::arithmetic(stored, value.ty)
                }
                .ok_or_else(undefined)?;
                (ty, cast::coerce(self.catalog, value, ty)?)
            };
            let widen = cast::implicit(self.catalog, stored, ty);
            let narrow = if ty == stored {
                None
            } else {
                Some(
                    cast::explicit(self.catalog, ty, stored)
                        .ok_or_else(|| cast::invalid_cast(self.catalog, ty, stored, span))?,
                )
            };
            (Operation::Static { op, ty }, value, widen, narrow)
        };

        Ok(Expr::new(
            ExprKind::Compound {
                place: Box::new(slot.place),
                operation,
                value: Box::new(value),
                widen,
                narrow,
                post,
            },
            stored,
            span,
        ))
    }
}

fn one(kind: PrimitiveKind, span: Span) -> Expr {
    let literal = match kind {
        PrimitiveKind::Long => Literal::Long(1),
        PrimitiveKind::Float => Literal::Float(1.0),
        PrimitiveKind::Double => Literal::Double(1.0),
        _ => Literal::Int(1),
    };
    Expr::constant(literal, DataType::primitive_type(kind), span)
}
