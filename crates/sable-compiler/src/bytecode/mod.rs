//! Bytecode types.
//!
//! - [`OpCode`] - the instruction set
//! - [`BytecodeChunk`] - compiled bytecode for one function
//! - [`Constant`] and [`ConstantPool`] - unit-level constant storage

mod chunk;
mod constant;
mod opcode;

pub use chunk::{BytecodeChunk, ExceptionHandler, Instruction};
pub use constant::{Constant, ConstantPool};
pub use opcode::OpCode;
