//! Bytecode emitter.
//!
//! The [`BytecodeEmitter`] is the low-level assembler the code generator
//! writes through: opcodes with their operands, pooled constants, forward
//! jumps and backward loops, and `break`/`continue` patching.
//!
//! # Example
//!
//! ```
//! use sable_compiler::bytecode::{ConstantPool, OpCode};
//! use sable_compiler::emit::BytecodeEmitter;
//!
//! let mut constants = ConstantPool::new();
//! let mut emitter = BytecodeEmitter::new(&mut constants);
//!
//! emitter.set_line(1);
//! emitter.emit_int(42).unwrap();
//! emitter.emit_int(1).unwrap();
//! emitter.emit(OpCode::AddI32);
//! emitter.emit(OpCode::Return);
//!
//! let chunk = emitter.finish();
//! chunk.assert_opcodes(&[OpCode::Constant, OpCode::PushOne, OpCode::AddI32, OpCode::Return]);
//! ```

mod jumps;
pub mod slots;

use sable_core::{DataType, InternalError};

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, ExceptionHandler, OpCode};
use jumps::JumpManager;

pub use slots::SlotAllocator;

/// A forward jump awaiting its target: the offset of its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLabel(pub(crate) usize);

type Emitted = Result<(), InternalError>;

/// Emits bytecode for one function.
///
/// Constants go to the unit-level pool, shared and deduplicated across
/// every function of the unit.
pub struct BytecodeEmitter<'pool> {
    chunk: BytecodeChunk,
    constants: &'pool mut ConstantPool,
    jumps: JumpManager,
    /// Source line recorded for subsequent instructions.
    current_line: u32,
}

impl<'pool> BytecodeEmitter<'pool> {
    pub fn new(constants: &'pool mut ConstantPool) -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            constants,
            jumps: JumpManager::new(),
            current_line: 1,
        }
    }

    /// All subsequent instructions are attributed to this line. Line zero
    /// (synthetic code) keeps the current line.
    pub fn set_line(&mut self, line: u32) {
        if line > 0 {
            self.current_line = line;
        }
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.current_line);
    }

    /// Emit an opcode with an 8-bit operand.
    pub fn emit_byte(&mut self, op: OpCode, byte: u8) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_byte(byte, self.current_line);
    }

    /// Emit an opcode with a 16-bit operand.
    pub fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_u16(value, self.current_line);
    }

    /// Add a constant to the unit pool and return its operand.
    pub fn constant(&mut self, constant: Constant) -> Result<u16, InternalError> {
        let index = self.constants.add(constant);
        u16::try_from(index).map_err(|_| InternalError::new(format!("constant pool index {index} exceeds u16::MAX")))
    }

    /// Emit `op` with a pooled constant as its operand.
    pub fn emit_with(&mut self, op: OpCode, constant: Constant) -> Emitted {
        let index = self.constant(constant)?;
        self.emit_u16(op, index);
        Ok(())
    }

    /// Push a pooled constant.
    pub fn emit_constant(&mut self, constant: Constant) -> Emitted {
        self.emit_with(OpCode::Constant, constant)
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// `0` and `1` use `PushZero`/`PushOne`.
    pub fn emit_int(&mut self, value: i32) -> Emitted {
        match value {
            0 => self.emit(OpCode::PushZero),
            1 => self.emit(OpCode::PushOne),
            _ => self.emit_constant(Constant::Int(value))?,
        }
        Ok(())
    }

    pub fn emit_string(&mut self, value: &str) -> Emitted {
        self.emit_constant(Constant::String(value.to_string()))
    }

    pub fn emit_null(&mut self) {
        self.emit(OpCode::PushNull);
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.emit(if value {
            OpCode::PushTrue
        } else {
            OpCode::PushFalse
        });
    }

    pub fn emit_type(&mut self, op: OpCode, ty: DataType) -> Emitted {
        self.emit_with(op, Constant::Type(ty))
    }

    // ==========================================================================
    // Stack and Locals
    // ==========================================================================

    pub fn emit_pop(&mut self) {
        self.emit(OpCode::Pop);
    }

    pub fn emit_get_local(&mut self, slot: u16) {
        self.emit_u16(OpCode::GetLocal, slot);
    }

    pub fn emit_set_local(&mut self, slot: u16) {
        self.emit_u16(OpCode::SetLocal, slot);
    }

    /// Duplicate the top `count` values (`0` to `2`).
    pub fn emit_dup(&mut self, count: usize) -> Emitted {
        match count {
            0 => {}
            1 => self.emit(OpCode::Dup),
            2 => self.emit(OpCode::Dup2),
            _ => return Err(InternalError::new(format!("cannot duplicate {count} values"))),
        }
        Ok(())
    }

    /// Copy the top value below the `depth` values under it (`0` to `2`).
    pub fn emit_dup_under(&mut self, depth: usize) -> Emitted {
        match depth {
            0 => self.emit(OpCode::Dup),
            1 => self.emit(OpCode::DupX1),
            2 => self.emit(OpCode::DupX2),
            _ => return Err(InternalError::new(format!("cannot insert a value {depth} deep"))),
        }
        Ok(())
    }

    pub fn emit_new_array(&mut self, ty: DataType, dims: u8) -> Emitted {
        let index = self.constant(Constant::Type(ty))?;
        self.emit_u16(OpCode::NewArray, index);
        self.chunk.write_byte(dims, self.current_line);
        Ok(())
    }

    // ==========================================================================
    // Jumps and Control Flow
    // ==========================================================================

    /// Emit a forward jump to patch later with [`patch_jump`](Self::patch_jump).
    pub fn emit_jump(&mut self, op: OpCode) -> JumpLabel {
        JumpLabel(self.chunk.emit_jump(op, self.current_line))
    }

    /// Point a forward jump at the current position.
    pub fn patch_jump(&mut self, label: JumpLabel) -> Emitted {
        self.chunk.patch_jump(label.0)
    }

    pub fn patch_all(&mut self, labels: impl IntoIterator<Item = JumpLabel>) -> Emitted {
        labels.into_iter().try_for_each(|label| self.patch_jump(label))
    }

    /// Emit a backward jump to `target`.
    pub fn emit_loop(&mut self, target: usize) -> Emitted {
        self.chunk.emit_loop(target, self.current_line)
    }

    pub fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    pub fn add_handler(&mut self, handler: ExceptionHandler) {
        self.chunk.add_handler(handler);
    }

    // ==========================================================================
    // Loop Control (Break/Continue)
    // ==========================================================================

    pub fn enter_loop(&mut self) {
        self.jumps.enter_loop();
    }

    /// Patch the innermost loop's breaks to the current position.
    pub fn exit_loop(&mut self) -> Emitted {
        let breaks = self
            .jumps
            .exit_loop()
            .ok_or_else(|| InternalError::new("loop exited with unbound continues"))?;
        self.patch_all(breaks)
    }

    /// Patch pending continues to the current position, where the next
    /// iteration starts.
    pub fn bind_continue(&mut self) -> Emitted {
        let continues = self.jumps.take_continues();
        self.patch_all(continues)
    }

    pub fn emit_break(&mut self) -> Emitted {
        let label = self.emit_jump(OpCode::Jump);
        if self.jumps.add_break(label) {
            Ok(())
        } else {
            Err(InternalError::new("break outside a loop"))
        }
    }

    pub fn emit_continue(&mut self) -> Emitted {
        let label = self.emit_jump(OpCode::Jump);
        if self.jumps.add_continue(label) {
            Ok(())
        } else {
            Err(InternalError::new("continue outside a loop"))
        }
    }

    pub fn in_loop(&self) -> bool {
        self.jumps.in_loop()
    }

    pub fn loop_depth(&self) -> usize {
        self.jumps.loop_depth()
    }

    // ==========================================================================
    // Finalization
    // ==========================================================================

    /// The bytecode emitted so far.
    pub fn chunk(&self) -> &BytecodeChunk {
        &self.chunk
    }

    pub fn finish(self) -> BytecodeChunk {
        self.chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_use_push_ops() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.emit_int(0).unwrap();
        emitter.emit_int(1).unwrap();
        emitter.emit_int(7).unwrap();
        emitter.emit_int(7).unwrap();
        let chunk = emitter.finish();
        chunk.assert_opcodes(&[OpCode::PushZero, OpCode::PushOne, OpCode::Constant, OpCode::Constant]);
        assert_eq!(constants.len(), 1);
    }

    #[test]
    fn lines_follow_set_line() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.set_line(3);
        emitter.emit(OpCode::PushNull);
        emitter.set_line(0);
        emitter.emit(OpCode::Pop);
        emitter.set_line(5);
        emitter.emit(OpCode::ReturnVoid);
        let chunk = emitter.finish();
        assert_eq!(chunk.lines(), &[3, 3, 5]);
    }

    #[test]
    fn breaks_patch_past_the_loop() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.enter_loop();
        let start = emitter.current_offset();
        emitter.emit_break().unwrap();
        emitter.emit_loop(start).unwrap();
        emitter.exit_loop().unwrap();
        emitter.emit(OpCode::ReturnVoid);

        let chunk = emitter.finish();
        // Jump skips the three bytes of the loop instruction.
        assert_eq!(chunk.read_u16(1), Some(3));
    }

    #[test]
    fn continues_bind_forward() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.enter_loop();
        let start = emitter.current_offset();
        emitter.emit_continue().unwrap();
        emitter.emit(OpCode::PushOne);
        emitter.emit(OpCode::Pop);
        emitter.bind_continue().unwrap();
        emitter.emit_loop(start).unwrap();
        emitter.exit_loop().unwrap();

        let chunk = emitter.finish();
        assert_eq!(chunk.read_u16(1), Some(2));
    }

    #[test]
    fn break_outside_loop_is_internal() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        assert!(emitter.emit_break().is_err());
        assert!(emitter.emit_continue().is_err());
        assert!(emitter.exit_loop().is_err());
    }

    #[test]
    fn dup_helpers_pick_by_depth() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.emit_dup(1).unwrap();
        emitter.emit_dup(2).unwrap();
        emitter.emit_dup_under(1).unwrap();
        emitter.emit_dup_under(2).unwrap();
        assert!(emitter.emit_dup(3).is_err());
        emitter.emit_new_array(DataType::INT.array_of(), 1).unwrap();
        emitter
            .finish()
            .assert_opcodes(&[OpCode::Dup, OpCode::Dup2, OpCode::DupX1, OpCode::DupX2, OpCode::NewArray]);
    }
}
