//! Storage locations, member shortcuts, and calls.

use sable_catalog::{FieldEntry, MethodEntry};
use sable_core::{CompilationError, DataType, Span, known};

use super::overload::{self, Arg, Choice};
use super::{Resolved, Resolver, cast, internal, invalid, target};
use crate::ast;
use crate::dispatch::{ArgShape, CallSite, CallSiteFlags, DispatchKind, Recipe};
use crate::typed::{Expr, ExprKind, FieldTarget, Literal, Place};

/// A resolved storage location.
#[derive(Debug, Clone)]
pub(super) struct Slot {
    pub place: Place,
    pub ty: DataType,
    /// Names the location when it cannot be written.
    pub read_only: Option<String>,
}

impl Slot {
    fn new(place: Place, ty: DataType) -> Self {
        Self {
            place,
            ty,
            read_only: None,
        }
    }

    fn read_only(mut self, name: impl Into<String>) -> Self {
        self.read_only = Some(name.into());
        self
    }
}

impl Resolver<'_> {
    // ==========================================================================
    // Places
    // ==========================================================================

    /// Locals and captures first, then members of the script interface.
    pub(super) fn variable_slot(&mut self, name: &str, span: Span) -> Resolved<Slot> {
        if let Some(var) = self.scopes.lookup(name) {
            let slot = Slot::new(
                Place::Local {
                    var: var.id,
                    name: var.name.clone(),
                },
                var.ty,
            );
            return Ok(if var.read_only { slot.read_only(var.name) } else { slot });
        }
        if self.in_main()
            && let Some(member) = self.interface.find_member(name)
        {
            let place = Place::Member {
                hash: self.interface.member_hash(name),
                name: name.to_string(),
            };
            return Ok(Slot::new(place, member.ty).read_only(name));
        }
        Err(CompilationError::UnknownVariable {
            name: name.to_string(),
            span,
        }
        .into())
    }

    /// Read a slot.
    pub(super) fn load(&self, slot: Slot, span: Span) -> Resolved<Expr> {
        self.readable(&slot, span)?;
        Ok(Expr::load(slot.place, slot.ty, span))
    }

    /// Shortcuts with only a setter cannot be read.
    pub(super) fn readable(&self, slot: &Slot, span: Span) -> Resolved<()> {
        if let Place::Shortcut {
            receiver,
            name,
            getter: None,
            ..
        } = &slot.place
        {
            return Err(CompilationError::UnknownField {
                field: name.clone(),
                type_name: self.type_name(receiver.ty),
                span,
            }
            .into());
        }
        Ok(())
    }

    pub(super) fn field_read(
        &mut self,
        receiver: &ast::Expr,
        name: &str,
        null_safe: bool,
        span: Span,
    ) -> Resolved<Expr> {
        if let ast::ExprKind::StaticRef(owner) = &receiver.kind {
            let slot = self.static_field(owner, name, span)?;
            return self.load(slot, span);
        }
        let receiver = self.expr(receiver)?;
        if null_safe {
            return self.null_safe(receiver, span, |this, receiver| {
                let slot = this.member_slot(receiver, name, span)?;
                this.load(slot, span)
            });
        }
        let slot = self.member_slot(receiver, name, span)?;
        self.load(slot, span)
    }

    pub(super) fn static_field(&self, owner: &ast::TypeName, name: &str, span: Span) -> Resolved<Slot> {
        let ty = self.data_type(owner)?;
        match self.catalog.resolve_field(ty.type_hash, name) {
            Some(field) if field.is_static => {
                let slot = Slot::new(
                    Place::StaticField {
                        field: field_target(field),
                    },
                    field.data_type,
                );
                Ok(if field.is_final { slot.read_only(name) } else { slot })
            }
            _ => Err(CompilationError::UnknownField {
                field: name.to_string(),
                type_name: owner.display(),
                span,
            }
            .into()),
        }
    }

    /// `receiver.name`: a field, a getter/setter pair, a map key, or the
    /// length of an array.
    pub(super) fn member_slot(&self, receiver: Expr, name: &str, span: Span) -> Resolved<Slot> {
        let receiver = self.boxed_receiver(receiver)?;
        let ty = receiver.ty;
        if ty.is_def() {
            let place = Place::DefField {
                receiver: Box::new(receiver),
                name: name.to_string(),
            };
            return Ok(Slot::new(place, DataType::DEF));
        }
        if ty.is_null() {
            return Err(invalid("'null' has no members", span));
        }
        let unknown = || -> sable_core::Error {
            CompilationError::UnknownField {
                field: name.to_string(),
                type_name: self.type_name(ty),
                span,
            }
            .into()
        };
        if ty.is_array() {
            if name != "length" {
                return Err(unknown());
            }
            let place = Place::ArrayLength {
                array: Box::new(receiver),
            };
            return Ok(Slot::new(place, DataType::INT).read_only("length"));
        }

        let catalog = self.catalog;
        if let Some(field) = catalog
            .resolve_field(ty.type_hash, name)
            .filter(|field| !field.is_static)
        {
            let slot = Slot::new(
                Place::Field {
                    receiver: Box::new(receiver),
                    field: field_target(field),
                },
                field.data_type,
            );
            return Ok(if field.is_final { slot.read_only(name) } else { slot });
        }

        let suffix = capitalize(name);
        let instance = |method: &str, arity: usize| {
            catalog
                .lookup_methods(ty.type_hash, method, arity)
                .into_iter()
                .find(|m| !m.is_static)
        };
        let getter = instance(&format!("get{suffix}"), 0)
            .filter(|m| !m.return_type.is_void())
            .or_else(|| {
                instance(&format!("is{suffix}"), 0).filter(|m| m.return_type == DataType::BOOLEAN)
            });
        let setter = instance(&format!("set{suffix}"), 1);
        if getter.is_some() || setter.is_some() {
            let value_type = getter
                .map(|m| m.return_type)
                .or_else(|| setter.and_then(|m| m.params.first().copied()))
                .unwrap_or(DataType::DEF);
            let slot = Slot::new(
                Place::Shortcut {
                    receiver: Box::new(receiver),
                    name: name.to_string(),
                    getter: getter.map(target),
                    setter: setter.map(target),
                },
                value_type,
            );
            return Ok(if setter.is_none() { slot.read_only(name) } else { slot });
        }

        if catalog.is_subtype(ty.type_hash, known::MAP) {
            let key = Expr::constant(Literal::String(name.to_string()), DataType::STRING, span);
            let key = cast::coerce(catalog, key, DataType::DEF)?;
            let place = Place::MapEntry {
                map: Box::new(receiver),
                key: Box::new(key),
                get: self.method(ty.type_hash, "get", 1, span)?,
                put: self.method(ty.type_hash, "put", 2, span)?,
            };
            return Ok(Slot::new(place, DataType::DEF));
        }
        Err(unknown())
    }

    /// `receiver[index]` on arrays, lists, maps and `def`.
    pub(super) fn index_slot(&mut self, receiver: &ast::Expr, index: &ast::Expr, span: Span) -> Resolved<Slot> {
        let receiver = self.expr(receiver)?;
        let ty = receiver.ty;
        if ty.is_array() {
            let index = self.expr_to(index, DataType::INT)?;
            let place = Place::ArrayElement {
                array: Box::new(receiver),
                index: Box::new(index),
            };
            return Ok(Slot::new(place, ty.element()));
        }
        if ty.is_def() {
            let index = self.expr(index)?;
            let place = Place::DefIndex {
                receiver: Box::new(receiver),
                index: Box::new(index),
            };
            return Ok(Slot::new(place, DataType::DEF));
        }
        if !ty.is_primitive() && self.catalog.is_subtype(ty.type_hash, known::MAP) {
            let key = self.expr_to(index, DataType::DEF)?;
            let place = Place::MapEntry {
                map: Box::new(receiver),
                key: Box::new(key),
                get: self.method(ty.type_hash, "get", 1, span)?,
                put: self.method(ty.type_hash, "put", 2, span)?,
            };
            return Ok(Slot::new(place, DataType::DEF));
        }
        if !ty.is_primitive() && self.catalog.is_subtype(ty.type_hash, known::LIST) {
            let index = self.expr_to(index, DataType::INT)?;
            let place = Place::ListElement {
                list: Box::new(receiver),
                index: Box::new(index),
                get: self.method(ty.type_hash, "get", 1, span)?,
                set: self.method(ty.type_hash, "set", 2, span)?,
                size: self.method(ty.type_hash, "size", 0, span)?,
            };
            return Ok(Slot::new(place, DataType::DEF));
        }
        Err(invalid(format!("cannot index '{}'", self.type_name(ty)), span))
    }

    /// `receiver?.access`: `access` sees the receiver through a hidden local.
    fn null_safe<F>(&mut self, receiver: Expr, span: Span, access: F) -> Resolved<Expr>
    where
        F: FnOnce(&mut Self, Expr) -> Resolved<Expr>,
    {
        if !receiver.ty.is_reference() || receiver.is_null() {
            return Err(invalid(
                format!("'?.' needs a reference, found '{}'", self.type_name(receiver.ty)),
                span,
            ));
        }
        let temp = self
            .scopes
            .temporary()
            .ok_or_else(|| internal("null-safe access outside of a function", span))?;
        let stand_in = Expr::load(
            Place::Local {
                var: temp,
                name: "$receiver".to_string(),
            },
            receiver.ty,
            receiver.span,
        );
        let mut value = access(self, stand_in)?;
        if let Some(kind) = value.ty.primitive() {
            value = cast::coerce(self.catalog, value, DataType::simple(kind.boxed()))?;
        }
        let ty = value.ty;
        Ok(Expr::new(
            ExprKind::NullSafe {
                temp,
                receiver: Box::new(receiver),
                access: Box::new(value),
            },
            ty,
            span,
        ))
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    pub(super) fn call(
        &mut self,
        receiver: &ast::Expr,
        name: &str,
        args: &[ast::Expr],
        null_safe: bool,
        span: Span,
    ) -> Resolved<Expr> {
        if let ast::ExprKind::StaticRef(owner) = &receiver.kind {
            return self.static_call(owner, name, args, span);
        }
        let receiver = self.expr(receiver)?;
        if null_safe {
            return self.null_safe(receiver, span, |this, receiver| {
                this.method_call(receiver, name, args, CallSiteFlags::NULL_SAFE, span)
            });
        }
        self.method_call(receiver, name, args, CallSiteFlags::empty(), span)
    }

    fn method_call(
        &mut self,
        receiver: Expr,
        name: &str,
        args: &[ast::Expr],
        flags: CallSiteFlags,
        span: Span,
    ) -> Resolved<Expr> {
        let receiver = self.boxed_receiver(receiver)?;
        if receiver.is_null() {
            return Err(invalid("'null' has no members", span));
        }
        let args = self.arguments(args)?;
        if receiver.ty.is_def() || args.iter().any(Arg::is_def) {
            return self.dynamic_call(receiver, name, args, flags, span);
        }

        let owner = if receiver.ty.is_array() {
            known::OBJECT
        } else {
            receiver.ty.type_hash
        };
        let catalog = self.catalog;
        let methods: Vec<&MethodEntry> = catalog
            .lookup_methods(owner, name, args.len())
            .into_iter()
            .filter(|m| !m.is_static)
            .collect();
        if methods.is_empty() {
            return Err(CompilationError::UnknownMethod {
                method: name.to_string(),
                type_name: self.type_name(receiver.ty),
                arity: args.len(),
                span,
            }
            .into());
        }
        let method = methods[self.select_method(&methods, &args, name, span)?];
        let args = self.bind_args(args, &method.params)?;
        Ok(Expr::new(
            ExprKind::Call {
                receiver: Some(Box::new(receiver)),
                target: target(method),
                args,
            },
            method.return_type,
            span,
        ))
    }

    /// A method call bound at run time. Function arguments travel as
    /// references followed by their captured values.
    fn dynamic_call(
        &mut self,
        receiver: Expr,
        name: &str,
        args: Vec<Arg<'_>>,
        flags: CallSiteFlags,
        span: Span,
    ) -> Resolved<Expr> {
        let mut recipe = Recipe::default();
        let mut arg_types = vec![receiver.ty];
        let mut operands = vec![receiver];
        for arg in args {
            match arg {
                Arg::Value(value) => {
                    recipe.push(ArgShape::Value);
                    arg_types.push(value.ty);
                    operands.push(value);
                }
                Arg::Function { node, .. } => {
                    let (reference, captured) = self.def_reference(node)?;
                    let captures = u8::try_from(captured.len())
                        .map_err(|_| invalid("too many captured variables", node.span))?;
                    recipe.push(ArgShape::Capture { captures });
                    arg_types.push(DataType::DEF);
                    arg_types.extend(captured);
                    operands.push(reference);
                }
            }
        }
        let arity = u8::try_from(recipe.arity()).map_err(|_| invalid("too many arguments", span))?;
        let site = CallSite {
            kind: DispatchKind::MethodCall,
            name: name.to_string(),
            arity,
            recipe,
            flags,
            arg_types,
            return_type: DataType::DEF,
        };
        Ok(Expr::new(
            ExprKind::Dynamic {
                site,
                args: operands,
            },
            DataType::DEF,
            span,
        ))
    }

    fn static_call(
        &mut self,
        owner: &ast::TypeName,
        name: &str,
        args: &[ast::Expr],
        span: Span,
    ) -> Resolved<Expr> {
        let ty = self.data_type(owner)?;
        let catalog = self.catalog;
        let methods: Vec<&MethodEntry> = catalog
            .lookup_methods(ty.type_hash, name, args.len())
            .into_iter()
            .filter(|m| m.is_static)
            .collect();
        if methods.is_empty() {
            return Err(CompilationError::UnknownMethod {
                method: name.to_string(),
                type_name: owner.display(),
                arity: args.len(),
                span,
            }
            .into());
        }
        self.bind_static(&methods, args, name, span)
    }

    /// A call without receiver: a user function, then an imported static.
    pub(super) fn call_local(&mut self, name: &str, args: &[ast::Expr], span: Span) -> Resolved<Expr> {
        if let Some(&position) = self.by_arity.get(&(name.to_string(), args.len())) {
            let signature = self.signatures[position].clone();
            let args = args
                .iter()
                .zip(&signature.params)
                .map(|(arg, (_, ty))| self.expr_to(arg, *ty))
                .collect::<Resolved<Vec<_>>>()?;
            return Ok(Expr::new(
                ExprKind::CallLocal {
                    index: signature.index,
                    name: signature.name,
                    args,
                },
                signature.return_type,
                span,
            ));
        }
        let catalog = self.catalog;
        let imports = catalog.lookup_imports(name, args.len());
        if imports.is_empty() {
            return Err(CompilationError::UnknownFunction {
                name: name.to_string(),
                arity: args.len(),
                span,
            }
            .into());
        }
        self.bind_static(&imports, args, name, span)
    }

    fn bind_static(
        &mut self,
        methods: &[&MethodEntry],
        args: &[ast::Expr],
        name: &str,
        span: Span,
    ) -> Resolved<Expr> {
        let args = self.arguments(args)?;
        let method = methods[self.select_method(methods, &args, name, span)?];
        let args = self.bind_args(args, &method.params)?;
        Ok(Expr::new(
            ExprKind::Call {
                receiver: None,
                target: target(method),
                args,
            },
            method.return_type,
            span,
        ))
    }

    // ==========================================================================
    // Arguments
    // ==========================================================================

    /// Resolve arguments; lambdas and references wait for their parameter.
    pub(super) fn arguments<'a>(&mut self, args: &'a [ast::Expr]) -> Resolved<Vec<Arg<'a>>> {
        args.iter()
            .map(|arg| match &arg.kind {
                ast::ExprKind::Lambda { params, .. } => Ok(Arg::Function {
                    node: arg,
                    arity: Some(params.len()),
                }),
                ast::ExprKind::FuncRef { .. } => Ok(Arg::Function {
                    node: arg,
                    arity: None,
                }),
                _ => Ok(Arg::Value(self.expr(arg)?)),
            })
            .collect()
    }

    pub(super) fn bind_args(&mut self, args: Vec<Arg<'_>>, params: &[DataType]) -> Resolved<Vec<Expr>> {
        args.into_iter()
            .zip(params)
            .map(|(arg, &param)| match arg {
                Arg::Value(value) => Ok(cast::coerce(self.catalog, value, param)?),
                Arg::Function { node, .. } => self.function_value(node, param),
            })
            .collect()
    }

    fn select_method(&self, methods: &[&MethodEntry], args: &[Arg<'_>], name: &str, span: Span) -> Resolved<usize> {
        let candidates: Vec<&[DataType]> = methods.iter().map(|m| m.params.as_slice()).collect();
        self.select(&candidates, args, name, span)
    }

    pub(super) fn select(
        &self,
        candidates: &[&[DataType]],
        args: &[Arg<'_>],
        name: &str,
        span: Span,
    ) -> Resolved<usize> {
        match overload::choose_args(self.catalog, candidates, args) {
            Choice::Best(index) => Ok(index),
            Choice::Ambiguous(candidates) => Err(CompilationError::AmbiguousOverload {
                name: name.to_string(),
                candidates,
                span,
            }
            .into()),
            Choice::NoMatch => Err(CompilationError::NoMatchingOverload {
                name: name.to_string(),
                args: overload::describe(self.catalog, args),
                candidates: candidates.len(),
                span,
            }
            .into()),
        }
    }
}

fn field_target(field: &FieldEntry) -> FieldTarget {
    FieldTarget {
        hash: field.hash,
        owner: field.owner,
        name: field.name.clone(),
        ty: field.data_type,
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{compile_error, resolve_source};
    use super::*;
    use crate::typed::{Invocation, Stmt, TypedUnit};

    /// The first expression statement of main, or its returned value,
    /// without the conversion to the result type.
    fn first_expr(unit: &TypedUnit) -> &Expr {
        let mut expr = unit.functions[0]
            .body
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::Expr(expr) | Stmt::Return(Some(expr)) => Some(expr),
                _ => None,
            })
            .expect("an expression statement");
        while let ExprKind::Cast { expr: inner, .. } = &expr.kind {
            expr = inner;
        }
        expr
    }

    #[test]
    fn capitalizes_shortcut_names() {
        assert_eq!(capitalize("name"), "Name");
        assert_eq!(capitalize("x"), "X");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn array_length_is_read_only() {
        assert!(resolve_source("int[] a = new int[3]; a.length").is_ok());
        assert!(matches!(
            compile_error("int[] a = new int[3]; a.length = 2;"),
            CompilationError::ReadOnly { ref name, .. } if name == "length"
        ));
    }

    #[test]
    fn map_keys_are_shortcuts() {
        let unit = resolve_source("Map m = new HashMap(); m.count = 1; m.count").unwrap();
        let ExprKind::Assign { place, .. } = &first_expr(&unit).kind else {
            panic!("expected an assignment");
        };
        let Place::MapEntry { key, put, .. } = place.as_ref() else {
            panic!("expected a map entry, got {place:?}");
        };
        assert_eq!(put.name, "put");
        assert!(matches!(&key.kind, ExprKind::Cast { expr, .. } if expr.kind == ExprKind::Constant(Literal::String("count".into()))));
    }

    #[test]
    fn indexing_lists_and_maps() {
        let unit = resolve_source("List l = new ArrayList(); l[0] = 1;").unwrap();
        let ExprKind::Assign { place, .. } = &first_expr(&unit).kind else {
            panic!("expected an assignment");
        };
        assert!(matches!(place.as_ref(), Place::ListElement { .. }));
        assert!(matches!(
            compile_error("String s = 'abc'; s[0]"),
            CompilationError::InvalidOperation { .. }
        ));
    }

    #[test]
    fn interface_methods_use_interface_dispatch() {
        let unit = resolve_source("List l = new ArrayList(); l.add(1);").unwrap();
        let ExprKind::Call { target, args, .. } = &first_expr(&unit).kind else {
            panic!("expected a call");
        };
        assert_eq!(target.invocation, Invocation::Interface);
        assert_eq!(args[0].ty, DataType::DEF);
    }

    #[test]
    fn def_receivers_and_arguments_dispatch_dynamically() {
        let unit = resolve_source("def x = 'a'; x.foo(1, 2);").unwrap();
        let ExprKind::Dynamic { site, args } = &first_expr(&unit).kind else {
            panic!("expected a call site");
        };
        assert_eq!(site.kind, DispatchKind::MethodCall);
        assert_eq!(site.arity, 2);
        assert_eq!(args.len(), 3);

        let unit = resolve_source("def x = 'a'; String s = 'abc'; s.indexOf(x);").unwrap();
        let ExprKind::Dynamic { site, .. } = &first_expr(&unit).kind else {
            panic!("expected a call site");
        };
        assert_eq!(site.arg_types[0], DataType::STRING);
    }

    #[test]
    fn static_targets_accept_def_arguments() {
        let unit = resolve_source("def x = 2.0; Math.sqrt(x);").unwrap();
        let ExprKind::Call { target, args, .. } = &first_expr(&unit).kind else {
            panic!("expected a bound call");
        };
        assert_eq!(target.invocation, Invocation::Static);
        assert!(matches!(args[0].kind, ExprKind::Cast { .. }));
    }

    #[test]
    fn overloads_pick_the_cheapest() {
        let unit = resolve_source("long a = 1; Math.max(a, 2);").unwrap();
        let ExprKind::Call { target, .. } = &first_expr(&unit).kind else {
            panic!("expected a call");
        };
        assert_eq!(target.params, vec![DataType::LONG, DataType::LONG]);
        assert!(matches!(
            compile_error("def a = 1; def b = 2; Math.max(a, b);"),
            CompilationError::AmbiguousOverload { candidates: 3, .. }
        ));
        assert!(matches!(
            compile_error("Math.max('a', 'b');"),
            CompilationError::NoMatchingOverload { candidates: 3, .. }
        ));
    }

    #[test]
    fn imports_and_unknown_calls() {
        assert!(resolve_source("max(1, 2)").is_ok());
        assert!(matches!(
            compile_error("nothing(1)"),
            CompilationError::UnknownFunction { arity: 1, .. }
        ));
        assert!(matches!(
            compile_error("String s = 'a'; s.nothing();"),
            CompilationError::UnknownMethod { .. }
        ));
    }

    #[test]
    fn null_safe_access_boxes_primitives() {
        let unit = resolve_source("String s = null; s?.length()").unwrap();
        let value = unit.functions[0]
            .body
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::Return(Some(value)) => Some(value),
                _ => None,
            })
            .unwrap();
        let ExprKind::Cast { expr, .. } = &value.kind else {
            panic!("expected an upcast to def");
        };
        assert!(matches!(expr.kind, ExprKind::NullSafe { .. }));
        assert_eq!(expr.ty, DataType::simple(known::INTEGER));

        assert!(matches!(
            compile_error("Map m = null; m?.x = 1;"),
            CompilationError::InvalidOperation { .. }
        ));
    }

    #[test]
    fn static_fields() {
        assert!(resolve_source("Math.PI").is_ok());
        assert!(matches!(
            compile_error("Math.PI = 3;"),
            CompilationError::ReadOnly { .. }
        ));
        assert!(matches!(
            compile_error("Math.TAU"),
            CompilationError::UnknownField { .. }
        ));
    }
}
