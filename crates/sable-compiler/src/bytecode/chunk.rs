//! Bytecode chunk for compiled functions.
//!
//! A `BytecodeChunk` contains the compiled bytecode for a single function,
//! its line table, and its exception-handler table.

use sable_core::InternalError;

use super::OpCode;

/// A protected range of code and where control goes when it throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// First protected byte.
    pub start: u32,
    /// One past the last protected byte.
    pub end: u32,
    /// Offset of the handler code.
    pub handler: u32,
    /// Type constant of the caught type.
    pub catch_type: u16,
    /// Slot receiving the caught value.
    pub slot: u16,
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub op: OpCode,
    /// The first operand, for opcodes that have one.
    pub operand: Option<u16>,
}

/// A chunk of compiled bytecode for a single function.
///
/// Constants are stored at unit level in a `ConstantPool`, not per-function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeChunk {
    /// The bytecode instructions.
    code: Vec<u8>,
    /// Line numbers, parallel to `code`.
    lines: Vec<u32>,
    handlers: Vec<ExceptionHandler>,
}

impl BytecodeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
            lines: Vec::with_capacity(capacity),
            handlers: Vec::new(),
        }
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.code.push(op as u8);
        self.lines.push(line);
    }

    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Current code offset, for jump patching.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a jump instruction and return the offset to patch later.
    ///
    /// The jump offset is initialized to 0xFFFF as a placeholder.
    pub fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.write_op(op, line);
        let offset = self.code.len();
        self.write_u16(0xFFFF, line);
        offset
    }

    /// Patch the jump whose operand is at `offset` to land on the current position.
    pub fn patch_jump(&mut self, offset: usize) -> Result<(), InternalError> {
        let distance = self
            .code
            .len()
            .checked_sub(offset + 2)
            .ok_or_else(|| InternalError::new(format!("jump operand {offset} is past the end")))?;
        let distance = u16::try_from(distance)
            .map_err(|_| InternalError::new(format!("jump distance {distance} exceeds u16::MAX")))?;
        let [high, low] = distance.to_be_bytes();
        self.code[offset] = high;
        self.code[offset + 1] = low;
        Ok(())
    }

    /// Emit a loop instruction that jumps back to `loop_start`.
    pub fn emit_loop(&mut self, loop_start: usize, line: u32) -> Result<(), InternalError> {
        self.write_op(OpCode::Loop, line);
        // +2 for the operand bytes about to be written
        let offset = self.code.len() - loop_start + 2;
        let offset = u16::try_from(offset)
            .map_err(|_| InternalError::new(format!("loop offset {offset} exceeds u16::MAX")))?;
        self.write_u16(offset, line);
        Ok(())
    }

    pub fn add_handler(&mut self, handler: ExceptionHandler) {
        self.handlers.push(handler);
    }

    pub fn handlers(&self) -> &[ExceptionHandler] {
        &self.handlers
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u16 at the given offset (big-endian).
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.code.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// Decode every instruction with its first operand.
    pub fn instructions(&self) -> Vec<Instruction> {
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < self.code.len() {
            let Some(op) = self.read_op(offset) else {
                offset += 1;
                continue;
            };
            let operand = match op.operand_size() {
                0 => None,
                1 => self.read_byte(offset + 1).map(u16::from),
                _ => self.read_u16(offset + 1),
            };
            out.push(Instruction {
                offset,
                op,
                operand,
            });
            offset += 1 + op.operand_size();
        }
        out
    }

    /// Extract all opcodes from the chunk, skipping operands.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions().into_iter().map(|i| i.op).collect()
    }

    /// How many times `op` occurs.
    pub fn count_op(&self, op: OpCode) -> usize {
        self.opcodes().iter().filter(|&&o| o == op).count()
    }

    /// Check that this chunk contains exactly the given opcode sequence.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check that the given opcodes appear in order, not necessarily contiguous.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }

    /// Number of places the given contiguous opcode run occurs.
    pub fn count_sequence(&self, sequence: &[OpCode]) -> usize {
        if sequence.is_empty() {
            return 0;
        }
        self.opcodes()
            .windows(sequence.len())
            .filter(|window| *window == sequence)
            .count()
    }

    /// Check that the given opcodes occur contiguously somewhere.
    #[track_caller]
    pub fn assert_contains_sequence(&self, sequence: &[OpCode]) {
        if self.count_sequence(sequence) == 0 {
            panic!(
                "Missing contiguous sequence.\nExpected: {:?}\nActual:   {:?}",
                sequence.iter().map(|op| op.name()).collect::<Vec<_>>(),
                self.opcodes().iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }

    /// A line per instruction, for debugging output.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for instruction in self.instructions() {
            let line = self.line_at(instruction.offset).unwrap_or(0);
            match instruction.operand {
                Some(operand) => out.push_str(&format!(
                    "{:04} {:>4} {} {}\n",
                    instruction.offset,
                    line,
                    instruction.op.name(),
                    operand
                )),
                None => out.push_str(&format!(
                    "{:04} {:>4} {}\n",
                    instruction.offset,
                    line,
                    instruction.op.name()
                )),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_is_empty() {
        let chunk = BytecodeChunk::new();
        assert!(chunk.is_empty());
        assert_eq!(chunk.len(), 0);
    }

    #[test]
    fn write_op() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Pick, 1);
        chunk.write_byte(2, 1);

        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.read_op(0), Some(OpCode::Pick));
        assert_eq!(chunk.read_byte(1), Some(2));
        assert_eq!(chunk.line_at(1), Some(1));
    }

    #[test]
    fn write_u16_is_big_endian() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_u16(0x1234, 5);
        assert_eq!(chunk.code(), &[0x12, 0x34]);
        assert_eq!(chunk.read_u16(0), Some(0x1234));
    }

    #[test]
    fn emit_and_patch_jump() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::PushTrue, 1);
        let jump = chunk.emit_jump(OpCode::JumpIfFalse, 2);
        chunk.write_op(OpCode::PushOne, 3);
        chunk.write_op(OpCode::PushZero, 3);
        chunk.patch_jump(jump).unwrap();

        // Skips PushOne and PushZero.
        assert_eq!(chunk.read_u16(jump), Some(2));
    }

    #[test]
    fn emit_loop() {
        let mut chunk = BytecodeChunk::new();
        let start = chunk.current_offset();
        chunk.write_op(OpCode::PushOne, 1);
        chunk.write_op(OpCode::Pop, 1);
        chunk.emit_loop(start, 2).unwrap();

        // Back over the loop operand, the opcode and two instructions.
        assert_eq!(chunk.read_u16(3), Some(5));
    }

    #[test]
    fn oversized_jump_is_an_internal_error() {
        let mut chunk = BytecodeChunk::new();
        let jump = chunk.emit_jump(OpCode::Jump, 1);
        for _ in 0..70_000 {
            chunk.write_op(OpCode::Pop, 1);
        }
        assert!(chunk.patch_jump(jump).is_err());
    }

    #[test]
    fn instructions_decode_operands() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::GetLocal, 1);
        chunk.write_u16(3, 1);
        chunk.write_op(OpCode::Pick, 1);
        chunk.write_byte(1, 1);
        chunk.write_op(OpCode::Return, 1);

        let instructions = chunk.instructions();
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].operand, Some(3));
        assert_eq!(instructions[1].operand, Some(1));
        assert_eq!(instructions[2].operand, None);
        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::Pick, OpCode::Return]);
    }

    #[test]
    fn sequences() {
        let mut chunk = BytecodeChunk::new();
        for op in [OpCode::Dup, OpCode::Pop, OpCode::Dup, OpCode::Pop, OpCode::Return] {
            chunk.write_op(op, 1);
        }
        assert_eq!(chunk.count_sequence(&[OpCode::Dup, OpCode::Pop]), 2);
        chunk.assert_contains_sequence(&[OpCode::Pop, OpCode::Return]);
        chunk.assert_contains_opcodes(&[OpCode::Dup, OpCode::Return]);
        assert_eq!(chunk.count_op(OpCode::Dup), 2);
    }

    #[test]
    #[should_panic(expected = "Missing contiguous sequence")]
    fn missing_sequence_panics() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Dup, 1);
        chunk.write_op(OpCode::Return, 1);
        chunk.assert_contains_sequence(&[OpCode::Return, OpCode::Dup]);
    }
}
