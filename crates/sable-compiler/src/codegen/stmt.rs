//! Statement compilation.
//!
//! Loop layout shared by `while` and `for`:
//!
//! ```text
//! start:
//!     [condition]           omitted for continuous loops
//!     JumpIfFalse -> exit
//!     LoopCheck counter     counted loops only
//!     [body]
//! continue:
//!     [update]
//!     Loop -> start
//! exit:
//! ```

use sable_core::{DataType, PrimitiveKind, Span};

use super::{Emitted, FunctionCompiler};
use crate::bytecode::{Constant, ExceptionHandler, OpCode};
use crate::ir::{IrExpr, IrLocal, IrStmt, IrTrap, LoopFlags};
use ordered_float::OrderedFloat;

impl FunctionCompiler<'_> {
    pub(super) fn statements(&mut self, stmts: &[IrStmt]) -> Emitted {
        stmts.iter().try_for_each(|stmt| self.statement(stmt))
    }

    /// Statements in their own block scope.
    fn scoped(&mut self, stmts: &[IrStmt]) -> Emitted {
        self.slots.push_block();
        let result = self.statements(stmts);
        self.slots.pop_block();
        result
    }

    fn statement(&mut self, stmt: &IrStmt) -> Emitted {
        if let Some(span) = leading_span(stmt) {
            self.mark(span);
        }

        match stmt {
            IrStmt::Expr(expr) => {
                self.expr(expr)?;
                if !expr.ty.is_void() {
                    self.emitter.emit_pop();
                }
                Ok(())
            }
            IrStmt::Declare { local, init } => self.declare(local, init.as_ref()),
            IrStmt::Block(stmts) => self.scoped(stmts),
            IrStmt::If {
                condition,
                then,
                otherwise,
            } => self.compile_if(condition, then, otherwise),
            IrStmt::While {
                condition,
                body,
                update,
                flags,
            } => self.compile_while(condition.as_ref(), body, update, *flags),
            IrStmt::DoWhile {
                body,
                condition,
                flags,
            } => self.compile_do_while(body, condition.as_ref(), *flags),
            IrStmt::ForEachArray {
                array_var,
                index_var,
                array,
                local,
                element,
                body,
                flags,
            } => {
                self.slots.push_block();
                self.expr(array)?;
                let array_slot = self.slots.declare(*array_var)?;
                self.emitter.emit_set_local(array_slot);
                self.emitter.emit(OpCode::PushZero);
                let index_slot = self.slots.declare(*index_var)?;
                self.emitter.emit_set_local(index_slot);

                let start = self.emitter.current_offset();
                self.emitter.emit_get_local(index_slot);
                self.emitter.emit_get_local(array_slot);
                self.emitter.emit(OpCode::ArrayLength);
                self.emitter.emit(OpCode::LtI32);
                let exit = self.emitter.emit_jump(OpCode::JumpIfFalse);

                self.each_iteration(local, element, body, *flags)?;
                self.emitter.emit_get_local(index_slot);
                self.emitter.emit(OpCode::PushOne);
                self.emitter.emit(OpCode::AddI32);
                self.emitter.emit_set_local(index_slot);

                self.emitter.emit_loop(start)?;
                self.emitter.patch_jump(exit)?;
                self.emitter.exit_loop()?;
                self.slots.pop_block();
                Ok(())
            }
            IrStmt::ForEachIterator {
                iterator_var,
                iterator,
                has_next,
                local,
                element,
                body,
                flags,
            } => {
                self.slots.push_block();
                self.expr(iterator)?;
                let slot = self.slots.declare(*iterator_var)?;
                self.emitter.emit_set_local(slot);

                let start = self.emitter.current_offset();
                self.expr(has_next)?;
                let exit = self.emitter.emit_jump(OpCode::JumpIfFalse);

                self.each_iteration(local, element, body, *flags)?;

                self.emitter.emit_loop(start)?;
                self.emitter.patch_jump(exit)?;
                self.emitter.exit_loop()?;
                self.slots.pop_block();
                Ok(())
            }
            IrStmt::Try { body, traps } => self.compile_try(body, traps),
            IrStmt::Throw(value) => {
                self.expr(value)?;
                self.emitter.emit(OpCode::Throw);
                Ok(())
            }
            IrStmt::Return(Some(value)) => {
                self.expr(value)?;
                self.emitter.emit(OpCode::Return);
                Ok(())
            }
            IrStmt::Return(None) => {
                self.emitter.emit(OpCode::ReturnVoid);
                Ok(())
            }
            IrStmt::Break => self.emitter.emit_break(),
            IrStmt::Continue => self.emitter.emit_continue(),
        }
    }

    /// Record the start of a statement.
    fn mark(&mut self, span: Span) {
        self.emitter.set_line(span.line);
        self.statements.push(span.offset);
    }

    /// A declaration without an initializer stores the type's default.
    fn declare(&mut self, local: &IrLocal, init: Option<&IrExpr>) -> Emitted {
        match init {
            Some(init) => self.expr(init)?,
            None => self.default_value(local.ty)?,
        }
        let slot = self.slots.declare(local.var)?;
        self.emitter.emit_set_local(slot);
        Ok(())
    }

    fn default_value(&mut self, ty: DataType) -> Emitted {
        match ty.primitive() {
            None => self.emitter.emit_null(),
            Some(PrimitiveKind::Boolean) => self.emitter.emit_bool(false),
            Some(PrimitiveKind::Long) => self.emitter.emit_constant(Constant::Long(0))?,
            Some(PrimitiveKind::Float) => self.emitter.emit_constant(Constant::Float(OrderedFloat(0.0)))?,
            Some(PrimitiveKind::Double) => self.emitter.emit_constant(Constant::Double(OrderedFloat(0.0)))?,
            Some(_) => self.emitter.emit(OpCode::PushZero),
        }
        Ok(())
    }

    fn compile_if(&mut self, condition: &IrExpr, then: &[IrStmt], otherwise: &[IrStmt]) -> Emitted {
        let skip_then = self.branch(condition, false)?;
        self.scoped(then)?;
        if otherwise.is_empty() {
            return self.emitter.patch_all(skip_then);
        }
        let skip_else = self.emitter.emit_jump(OpCode::Jump);
        self.emitter.patch_all(skip_then)?;
        self.scoped(otherwise)?;
        self.emitter.patch_jump(skip_else)
    }

    fn compile_while(
        &mut self,
        condition: Option<&IrExpr>,
        body: &[IrStmt],
        update: &[IrStmt],
        flags: LoopFlags,
    ) -> Emitted {
        let start = self.emitter.current_offset();
        let exits = match condition {
            Some(condition) => self.branch(condition, false)?,
            None => Vec::new(),
        };
        self.loop_check(flags)?;

        self.emitter.enter_loop();
        self.scoped(body)?;
        self.emitter.bind_continue()?;
        self.statements(update)?;
        self.emitter.emit_loop(start)?;
        self.emitter.patch_all(exits)?;
        self.emitter.exit_loop()
    }

    /// ```text
    /// start:
    ///     LoopCheck counter
    ///     [body]
    /// continue:
    ///     [condition]
    ///     JumpIfFalse -> exit
    ///     Loop -> start
    /// exit:
    /// ```
    fn compile_do_while(&mut self, body: &[IrStmt], condition: Option<&IrExpr>, flags: LoopFlags) -> Emitted {
        let start = self.emitter.current_offset();
        self.loop_check(flags)?;

        self.emitter.enter_loop();
        self.scoped(body)?;
        self.emitter.bind_continue()?;
        let exits = match condition {
            Some(condition) => self.branch(condition, false)?,
            None => Vec::new(),
        };
        self.emitter.emit_loop(start)?;
        self.emitter.patch_all(exits)?;
        self.emitter.exit_loop()
    }

    /// The part of a for-each loop after its exit test: budget check,
    /// element binding, body. Leaves the continue point bound.
    fn each_iteration(&mut self, local: &IrLocal, element: &IrExpr, body: &[IrStmt], flags: LoopFlags) -> Emitted {
        self.loop_check(flags)?;
        self.emitter.enter_loop();

        self.slots.push_block();
        self.expr(element)?;
        let slot = self.slots.declare(local.var)?;
        self.emitter.emit_set_local(slot);
        let result = self.statements(body);
        self.slots.pop_block();
        result?;

        self.emitter.bind_continue()
    }

    fn loop_check(&mut self, flags: LoopFlags) -> Emitted {
        if !flags.counted {
            return Ok(());
        }
        let slot = self
            .loop_counter
            .ok_or_else(|| Self::internal("counted loop in a function without a loop counter"))?;
        self.emitter.emit_u16(OpCode::LoopCheck, slot);
        Ok(())
    }

    /// ```text
    /// start:
    ///     [body]
    /// end:
    ///     Jump -> done
    /// handler:              one per trap, caught value in the trap's slot
    ///     [trap body]
    ///     Jump -> done
    /// done:
    /// ```
    fn compile_try(&mut self, body: &[IrStmt], traps: &[IrTrap]) -> Emitted {
        let start = offset(self.emitter.current_offset())?;
        self.scoped(body)?;
        let end = offset(self.emitter.current_offset())?;

        let mut done = vec![self.emitter.emit_jump(OpCode::Jump)];
        for (i, trap) in traps.iter().enumerate() {
            let handler = offset(self.emitter.current_offset())?;
            self.slots.push_block();
            let slot = self.slots.declare(trap.local.var)?;
            let catch_type = self.emitter.constant(Constant::Type(trap.catch_type))?;
            self.emitter.add_handler(ExceptionHandler {
                start,
                end,
                handler,
                catch_type,
                slot,
            });
            let result = self.statements(&trap.body);
            self.slots.pop_block();
            result?;

            if i + 1 < traps.len() {
                done.push(self.emitter.emit_jump(OpCode::Jump));
            }
        }
        self.emitter.patch_all(done)
    }
}

fn offset(position: usize) -> Result<u32, sable_core::InternalError> {
    u32::try_from(position).map_err(|_| sable_core::InternalError::new("function body exceeds u32::MAX bytes"))
}

/// Where a statement starts in the source, taken from its first expression.
fn leading_span(stmt: &IrStmt) -> Option<Span> {
    match stmt {
        IrStmt::Expr(expr) | IrStmt::Throw(expr) | IrStmt::Return(Some(expr)) => Some(expr.span),
        IrStmt::Declare { init: Some(init), .. } => Some(init.span),
        IrStmt::If { condition, .. } => Some(condition.span),
        IrStmt::While {
            condition: Some(condition),
            ..
        } => Some(condition.span),
        IrStmt::ForEachArray { array, .. } => Some(array.span),
        IrStmt::ForEachIterator { iterator, .. } => Some(iterator.span),
        _ => None,
    }
    .filter(|span| span.line > 0)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{generate_source, generate_with};
    use crate::bytecode::OpCode;
    use sable_core::CompilerSettings;

    fn main_ops(source: &str) -> crate::bytecode::BytecodeChunk {
        generate_with(source, &CompilerSettings::default().with_max_loop_counter(0))
            .0
            .swap_remove(0)
            .chunk
    }

    #[test]
    fn while_loops_test_then_jump_back() {
        let chunk = main_ops("int i = 0; while (i < 3) { i = i + 1; } i");
        chunk.assert_contains_sequence(&[OpCode::GetLocal, OpCode::Constant, OpCode::LtI32, OpCode::JumpIfFalse]);
        assert_eq!(chunk.count_op(OpCode::Loop), 1);
    }

    #[test]
    fn counted_loops_check_each_iteration() {
        let (functions, _) = generate_source("int i = 0; while (i < 3) { i = i + 1; } i");
        functions[0]
            .chunk
            .assert_contains_sequence(&[OpCode::JumpIfFalse, OpCode::LoopCheck]);
    }

    #[test]
    fn continuous_loops_have_no_exit_test() {
        let chunk = main_ops("int i = 0; while (true) { if (i > 3) { break; } i = i + 1; } i");
        // The only conditional jump is the `if`.
        assert_eq!(chunk.count_op(OpCode::JumpIfFalse), 1);
        assert_eq!(chunk.count_op(OpCode::Loop), 1);
    }

    #[test]
    fn do_while_tests_after_the_body() {
        let chunk = main_ops("int i = 0; do { i = i + 1; } while (i < 3); i");
        chunk.assert_contains_sequence(&[OpCode::LtI32, OpCode::JumpIfFalse, OpCode::Loop]);
    }

    #[test]
    fn array_for_each_walks_by_index() {
        let chunk = main_ops("int sum = 0; int[] a = new int[] {1, 2}; for (int x : a) { sum += x; } sum");
        chunk.assert_contains_sequence(&[
            OpCode::GetLocal,
            OpCode::GetLocal,
            OpCode::ArrayLength,
            OpCode::LtI32,
            OpCode::JumpIfFalse,
        ]);
        chunk.assert_contains_sequence(&[OpCode::PushOne, OpCode::AddI32, OpCode::SetLocal, OpCode::Loop]);
    }

    #[test]
    fn iterable_for_each_calls_has_next() {
        let chunk = main_ops("int sum = 0; List l = [1, 2]; for (def x : l) { sum += 1; } sum");
        chunk.assert_contains_sequence(&[OpCode::GetLocal, OpCode::CallInterface, OpCode::JumpIfFalse]);
    }

    #[test]
    fn try_registers_a_handler() {
        let (functions, _) = generate_source("int x = 0; try { x = 1; } catch (Exception e) { x = 2; } x");
        let handlers = functions[0].chunk.handlers();
        assert_eq!(handlers.len(), 1);
        assert!(handlers[0].start < handlers[0].end);
        assert!(handlers[0].end < handlers[0].handler);
    }

    #[test]
    fn declarations_without_initializers_default() {
        let chunk = main_ops("int x; String s; x");
        chunk.assert_contains_sequence(&[OpCode::PushZero, OpCode::SetLocal, OpCode::PushNull, OpCode::SetLocal]);
    }
}
