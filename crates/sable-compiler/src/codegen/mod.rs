//! Code generation: IR functions to bytecode.
//!
//! [`FunctionCompiler`] walks one [`IrFunction`] post-order and writes it
//! through a [`BytecodeEmitter`]. Slot layout of a compiled function:
//!
//! ```text
//! 0          receiver (non-static functions only)
//! 1..        parameters, captures first for lifted lambdas
//! next       loop counter (functions with counted loops only)
//! rest       block-scoped locals and hidden loop variables
//! ```

mod expr;
mod ops;
mod stmt;
mod store;

use sable_core::InternalError;

use crate::CompiledFunction;
use crate::FunctionFlags;
use crate::bytecode::{Constant, ConstantPool, OpCode};
use crate::emit::{BytecodeEmitter, SlotAllocator};
use crate::ir::IrFunction;

type Emitted = Result<(), InternalError>;

/// Compile every function of a unit into the shared constant pool.
///
/// Returns the functions in unit order and the sorted, deduplicated source
/// offsets at which statements start.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn generate(
    functions: &[IrFunction],
    constants: &mut ConstantPool,
) -> Result<(Vec<CompiledFunction>, Vec<u32>), InternalError> {
    let mut statements = Vec::new();
    let compiled = functions
        .iter()
        .map(|function| {
            let mut compiler = FunctionCompiler::new(constants, function)?;
            compiler.compile_body(function)?;
            let (compiled, offsets) = compiler.finish(function);
            statements.extend(offsets);
            Ok(compiled)
        })
        .collect::<Result<Vec<_>, InternalError>>()?;
    statements.sort_unstable();
    statements.dedup();
    Ok((compiled, statements))
}

/// Compiles a single function body to bytecode.
pub struct FunctionCompiler<'pool> {
    emitter: BytecodeEmitter<'pool>,
    slots: SlotAllocator,
    /// Slot 0 when the function has a receiver.
    receiver: Option<u16>,
    loop_counter: Option<u16>,
    /// Source offsets of the statements compiled so far.
    statements: Vec<u32>,
}

impl<'pool> FunctionCompiler<'pool> {
    /// Lay out the receiver, parameter and loop-counter slots.
    pub fn new(constants: &'pool mut ConstantPool, function: &IrFunction) -> Result<Self, InternalError> {
        let mut slots = SlotAllocator::new();
        let receiver = if function.flags.contains(FunctionFlags::STATIC) {
            None
        } else {
            Some(slots.reserve()?)
        };
        for param in &function.params {
            slots.declare(param.var)?;
        }
        let loop_counter = if function.counts_loops() {
            Some(slots.reserve()?)
        } else {
            None
        };

        let mut emitter = BytecodeEmitter::new(constants);
        emitter.set_line(function.span.line);

        Ok(Self {
            emitter,
            slots,
            receiver,
            loop_counter,
            statements: Vec::new(),
        })
    }

    /// Compile the body, initializing the loop counter first.
    pub fn compile_body(&mut self, function: &IrFunction) -> Emitted {
        tracing::trace!(function = %function.name, "generating bytecode");

        if let Some(slot) = self.loop_counter {
            let budget = i32::try_from(function.max_loop_counter).unwrap_or(i32::MAX);
            self.emitter.emit_constant(Constant::Int(budget))?;
            self.emitter.emit_set_local(slot);
        }

        self.statements(&function.body)?;

        // A void body may run off its end.
        let terminated = matches!(
            self.emitter.chunk().opcodes().last(),
            Some(OpCode::Return | OpCode::ReturnVoid | OpCode::Throw)
        );
        if function.return_type.is_void() && !terminated {
            self.emitter.emit(OpCode::ReturnVoid);
        }
        Ok(())
    }

    pub fn finish(self, function: &IrFunction) -> (CompiledFunction, Vec<u32>) {
        let compiled = CompiledFunction {
            name: function.name.clone(),
            index: function.index,
            params: function.params.iter().map(|param| param.ty).collect(),
            return_type: function.return_type,
            flags: function.flags,
            max_slots: self.slots.max_slots(),
            max_loop_counter: function.max_loop_counter,
            loop_counter_slot: self.loop_counter,
            chunk: self.emitter.finish(),
        };
        (compiled, self.statements)
    }

    fn internal(message: impl Into<String>) -> InternalError {
        InternalError::new(message)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lower::tests::lower_with;
    use sable_core::CompilerSettings;

    pub(crate) fn generate_with(source: &str, settings: &CompilerSettings) -> (Vec<CompiledFunction>, ConstantPool) {
        let functions = lower_with(source, settings);
        let mut constants = ConstantPool::new();
        let (compiled, _) = generate(&functions, &mut constants).unwrap();
        (compiled, constants)
    }

    pub(crate) fn generate_source(source: &str) -> (Vec<CompiledFunction>, ConstantPool) {
        generate_with(source, &CompilerSettings::default())
    }

    #[test]
    fn main_reserves_the_receiver() {
        let (functions, _) = generate_source("1");
        assert!(!functions[0].flags.contains(FunctionFlags::STATIC));
        assert_eq!(functions[0].max_slots, 1);
        assert_eq!(functions[0].loop_counter_slot, None);
    }

    #[test]
    fn counted_functions_initialize_their_budget() {
        let (functions, constants) = generate_source("int i = 0; while (i < 3) { i++; } i");
        let main = &functions[0];
        assert_eq!(main.loop_counter_slot, Some(1));
        assert_eq!(main.max_loop_counter, 1_000_000);

        let code = main.chunk.instructions();
        assert_eq!(code[0].op, OpCode::Constant);
        assert_eq!(
            code[0].operand.and_then(|i| constants.get(u32::from(i))),
            Some(&Constant::Int(1_000_000))
        );
        assert_eq!((code[1].op, code[1].operand), (OpCode::SetLocal, Some(1)));
        main.chunk.assert_contains_opcodes(&[OpCode::LoopCheck]);
    }

    #[test]
    fn zero_budget_emits_no_checks() {
        let settings = CompilerSettings::default().with_max_loop_counter(0);
        let (functions, _) = generate_with("int i = 0; while (i < 3) { i++; } i", &settings);
        assert_eq!(functions[0].chunk.count_op(OpCode::LoopCheck), 0);
        assert_eq!(functions[0].loop_counter_slot, None);
    }

    #[test]
    fn user_functions_are_static() {
        let (functions, _) = generate_source("int twice(int x) { return x * 2; } twice(4)");
        let twice = &functions[1];
        assert_eq!(twice.name, "twice");
        assert!(twice.flags.contains(FunctionFlags::STATIC));
        // Parameter `x` takes slot 0.
        twice
            .chunk
            .assert_opcodes(&[OpCode::GetLocal, OpCode::Constant, OpCode::MulI32, OpCode::Return]);
        functions[0].chunk.assert_contains_opcodes(&[OpCode::CallLocal]);
    }

    #[test]
    fn void_bodies_return_implicitly() {
        let (functions, _) = generate_source("void noop() { } noop(); 1");
        functions[1].chunk.assert_opcodes(&[OpCode::ReturnVoid]);
    }

    #[test]
    fn statement_offsets_are_sorted() {
        let settings = CompilerSettings::default();
        let functions = lower_with("int a = 1;\nint b = 2;\na + b", &settings);
        let mut constants = ConstantPool::new();
        let (_, offsets) = generate(&functions, &mut constants).unwrap();
        assert!(offsets.len() >= 3);
        assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
