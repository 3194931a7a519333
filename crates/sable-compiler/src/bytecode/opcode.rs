//! Bytecode operation codes.
//!
//! Each opcode is a single byte, with operands following inline in
//! big-endian order. The machine is stack based: operations pop their
//! operands and push their result.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from the unit pool.
    /// Operand: u16 constant index
    Constant = 0,
    PushNull,
    PushTrue,
    PushFalse,
    /// Push int 0.
    PushZero,
    /// Push int 1.
    PushOne,

    // =========================================================================
    // Stack Operations
    // =========================================================================
    Pop,
    /// Duplicate the top value.
    Dup,
    /// Duplicate the top two values, keeping their order.
    Dup2,
    /// Duplicate the top value and insert it below the second.
    DupX1,
    /// Duplicate the top value and insert it below the third.
    DupX2,
    Swap,
    /// Push a copy of the value `n` below the top.
    /// Operand: u8 depth
    Pick,

    // =========================================================================
    // Locals, Fields and Unit Statics
    // =========================================================================
    /// Operand: u16 slot
    GetLocal,
    /// Pops the value. Operand: u16 slot
    SetLocal,
    /// Pops the receiver. Operand: u16 field constant
    GetField,
    /// Pops value then receiver. Operand: u16 field constant
    SetField,
    /// Operand: u16 field constant
    GetStatic,
    /// Operand: u16 field constant
    SetStatic,
    /// Read a constant field of the compiled unit.
    /// Operand: u16 constant field index
    GetUnitStatic,
    /// Operand: u16 constant field index
    SetUnitStatic,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    AddI32,
    SubI32,
    MulI32,
    DivI32,
    RemI32,
    NegI32,
    AddI64,
    SubI64,
    MulI64,
    DivI64,
    RemI64,
    NegI64,
    AddF32,
    SubF32,
    MulF32,
    DivF32,
    RemF32,
    NegF32,
    AddF64,
    SubF64,
    MulF64,
    DivF64,
    RemF64,
    NegF64,

    // =========================================================================
    // Bitwise
    // =========================================================================
    AndI32,
    OrI32,
    XorI32,
    NotI32,
    ShlI32,
    ShrI32,
    UshrI32,
    AndI64,
    OrI64,
    XorI64,
    NotI64,
    /// Shift count is an int.
    ShlI64,
    ShrI64,
    UshrI64,

    // =========================================================================
    // Comparisons (push boolean)
    // =========================================================================
    EqI32,
    NeI32,
    LtI32,
    LeI32,
    GtI32,
    GeI32,
    EqI64,
    NeI64,
    LtI64,
    LeI64,
    GtI64,
    GeI64,
    EqF32,
    NeF32,
    LtF32,
    LeF32,
    GtF32,
    GeF32,
    EqF64,
    NeF64,
    LtF64,
    LeF64,
    GtF64,
    GeF64,
    /// Reference identity.
    EqRef,
    /// Null-tolerant `equals` call on two references.
    EqValue,
    /// Push whether the popped reference is null.
    IsNull,
    /// Boolean negation.
    Not,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Operand: u16 forward offset
    Jump,
    /// Pops the condition. Operand: u16 forward offset
    JumpIfFalse,
    /// Pops the condition. Operand: u16 forward offset
    JumpIfTrue,
    /// Pops the reference. Operand: u16 forward offset
    JumpIfNull,
    /// Pops the reference. Operand: u16 forward offset
    JumpIfNonNull,
    /// Operand: u16 backward offset
    Loop,
    /// Decrement the loop counter in a slot, faulting with
    /// [`Fault::LoopLimitExceeded`](sable_core::Fault) when it runs out.
    /// Operand: u16 slot
    LoopCheck,

    // =========================================================================
    // Calls
    // =========================================================================
    /// Operand: u16 method constant
    CallStatic,
    /// Operand: u16 method constant
    CallVirtual,
    /// Operand: u16 method constant
    CallInterface,
    /// Allocate and construct. Operand: u16 constructor constant
    New,
    /// Call a function of this unit. Operand: u16 function index
    CallLocal,
    /// Operand: u16 call-site constant
    InvokeDynamic,
    Return,
    ReturnVoid,

    // =========================================================================
    // Arrays
    // =========================================================================
    /// Operands: u16 array type constant, u8 dimension count
    NewArray,
    ArrayLoad,
    ArrayStore,
    ArrayLength,
    /// Pops length then index; pushes `index + length` when index is negative.
    NormalizeIndex,

    // =========================================================================
    // Conversions
    // =========================================================================
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2S,
    I2C,
    /// Operand: u16 type constant (the primitive)
    Box,
    /// Operand: u16 type constant (the primitive)
    Unbox,
    /// Operand: u16 type constant
    CheckCast,
    /// Operand: u16 type constant
    InstanceOf,
    /// Runtime conversion of a `def` value. Operand: u16 type constant
    DefCast,
    /// Single-character string to char.
    StringToChar,

    // =========================================================================
    // Other
    // =========================================================================
    /// Operand: u16 concat recipe constant
    Concat,
    /// Build a function reference. Operand: u16 reference constant
    MakeRef,
    Throw,
}

impl OpCode {
    /// Decode an opcode byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Number of inline operand bytes following the opcode.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::Pick => 1,
            OpCode::NewArray => 3,
            OpCode::Constant
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetField
            | OpCode::SetField
            | OpCode::GetStatic
            | OpCode::SetStatic
            | OpCode::GetUnitStatic
            | OpCode::SetUnitStatic
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfTrue
            | OpCode::JumpIfNull
            | OpCode::JumpIfNonNull
            | OpCode::Loop
            | OpCode::LoopCheck
            | OpCode::CallStatic
            | OpCode::CallVirtual
            | OpCode::CallInterface
            | OpCode::New
            | OpCode::CallLocal
            | OpCode::InvokeDynamic
            | OpCode::Box
            | OpCode::Unbox
            | OpCode::CheckCast
            | OpCode::InstanceOf
            | OpCode::DefCast
            | OpCode::Concat
            | OpCode::MakeRef => 2,
            _ => 0,
        }
    }

    /// Whether this is a forward jump with a patchable offset.
    pub fn is_forward_jump(&self) -> bool {
        matches!(
            self,
            OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::JumpIfTrue
                | OpCode::JumpIfNull
                | OpCode::JumpIfNonNull
        )
    }

    /// Human-readable name for disassembly.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::PushZero => "PUSH_ZERO",
            OpCode::PushOne => "PUSH_ONE",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Dup2 => "DUP2",
            OpCode::DupX1 => "DUP_X1",
            OpCode::DupX2 => "DUP_X2",
            OpCode::Swap => "SWAP",
            OpCode::Pick => "PICK",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetField => "GET_FIELD",
            OpCode::SetField => "SET_FIELD",
            OpCode::GetStatic => "GET_STATIC",
            OpCode::SetStatic => "SET_STATIC",
            OpCode::GetUnitStatic => "GET_UNIT_STATIC",
            OpCode::SetUnitStatic => "SET_UNIT_STATIC",
            OpCode::AddI32 => "ADD_I32",
            OpCode::SubI32 => "SUB_I32",
            OpCode::MulI32 => "MUL_I32",
            OpCode::DivI32 => "DIV_I32",
            OpCode::RemI32 => "REM_I32",
            OpCode::NegI32 => "NEG_I32",
            OpCode::AddI64 => "ADD_I64",
            OpCode::SubI64 => "SUB_I64",
            OpCode::MulI64 => "MUL_I64",
            OpCode::DivI64 => "DIV_I64",
            OpCode::RemI64 => "REM_I64",
            OpCode::NegI64 => "NEG_I64",
            OpCode::AddF32 => "ADD_F32",
            OpCode::SubF32 => "SUB_F32",
            OpCode::MulF32 => "MUL_F32",
            OpCode::DivF32 => "DIV_F32",
            OpCode::RemF32 => "REM_F32",
            OpCode::NegF32 => "NEG_F32",
            OpCode::AddF64 => "ADD_F64",
            OpCode::SubF64 => "SUB_F64",
            OpCode::MulF64 => "MUL_F64",
            OpCode::DivF64 => "DIV_F64",
            OpCode::RemF64 => "REM_F64",
            OpCode::NegF64 => "NEG_F64",
            OpCode::AndI32 => "AND_I32",
            OpCode::OrI32 => "OR_I32",
            OpCode::XorI32 => "XOR_I32",
            OpCode::NotI32 => "NOT_I32",
            OpCode::ShlI32 => "SHL_I32",
            OpCode::ShrI32 => "SHR_I32",
            OpCode::UshrI32 => "USHR_I32",
            OpCode::AndI64 => "AND_I64",
            OpCode::OrI64 => "OR_I64",
            OpCode::XorI64 => "XOR_I64",
            OpCode::NotI64 => "NOT_I64",
            OpCode::ShlI64 => "SHL_I64",
            OpCode::ShrI64 => "SHR_I64",
            OpCode::UshrI64 => "USHR_I64",
            OpCode::EqI32 => "EQ_I32",
            OpCode::NeI32 => "NE_I32",
            OpCode::LtI32 => "LT_I32",
            OpCode::LeI32 => "LE_I32",
            OpCode::GtI32 => "GT_I32",
            OpCode::GeI32 => "GE_I32",
            OpCode::EqI64 => "EQ_I64",
            OpCode::NeI64 => "NE_I64",
            OpCode::LtI64 => "LT_I64",
            OpCode::LeI64 => "LE_I64",
            OpCode::GtI64 => "GT_I64",
            OpCode::GeI64 => "GE_I64",
            OpCode::EqF32 => "EQ_F32",
            OpCode::NeF32 => "NE_F32",
            OpCode::LtF32 => "LT_F32",
            OpCode::LeF32 => "LE_F32",
            OpCode::GtF32 => "GT_F32",
            OpCode::GeF32 => "GE_F32",
            OpCode::EqF64 => "EQ_F64",
            OpCode::NeF64 => "NE_F64",
            OpCode::LtF64 => "LT_F64",
            OpCode::LeF64 => "LE_F64",
            OpCode::GtF64 => "GT_F64",
            OpCode::GeF64 => "GE_F64",
            OpCode::EqRef => "EQ_REF",
            OpCode::EqValue => "EQ_VALUE",
            OpCode::IsNull => "IS_NULL",
            OpCode::Not => "NOT",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE",
            OpCode::JumpIfNull => "JUMP_IF_NULL",
            OpCode::JumpIfNonNull => "JUMP_IF_NON_NULL",
            OpCode::Loop => "LOOP",
            OpCode::LoopCheck => "LOOP_CHECK",
            OpCode::CallStatic => "CALL_STATIC",
            OpCode::CallVirtual => "CALL_VIRTUAL",
            OpCode::CallInterface => "CALL_INTERFACE",
            OpCode::New => "NEW",
            OpCode::CallLocal => "CALL_LOCAL",
            OpCode::InvokeDynamic => "INVOKE_DYNAMIC",
            OpCode::Return => "RETURN",
            OpCode::ReturnVoid => "RETURN_VOID",
            OpCode::NewArray => "NEW_ARRAY",
            OpCode::ArrayLoad => "ARRAY_LOAD",
            OpCode::ArrayStore => "ARRAY_STORE",
            OpCode::ArrayLength => "ARRAY_LENGTH",
            OpCode::NormalizeIndex => "NORMALIZE_INDEX",
            OpCode::I2L => "I2L",
            OpCode::I2F => "I2F",
            OpCode::I2D => "I2D",
            OpCode::L2I => "L2I",
            OpCode::L2F => "L2F",
            OpCode::L2D => "L2D",
            OpCode::F2I => "F2I",
            OpCode::F2L => "F2L",
            OpCode::F2D => "F2D",
            OpCode::D2I => "D2I",
            OpCode::D2L => "D2L",
            OpCode::D2F => "D2F",
            OpCode::I2B => "I2B",
            OpCode::I2S => "I2S",
            OpCode::I2C => "I2C",
            OpCode::Box => "BOX",
            OpCode::Unbox => "UNBOX",
            OpCode::CheckCast => "CHECK_CAST",
            OpCode::InstanceOf => "INSTANCE_OF",
            OpCode::DefCast => "DEF_CAST",
            OpCode::StringToChar => "STRING_TO_CHAR",
            OpCode::Concat => "CONCAT",
            OpCode::MakeRef => "MAKE_REF",
            OpCode::Throw => "THROW",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_repr() {
        assert_eq!(OpCode::Constant as u8, 0);
        assert_eq!(u8::from(OpCode::PushNull), 1);
    }

    #[test]
    fn opcode_from_u8() {
        assert_eq!(OpCode::from_u8(0), Some(OpCode::Constant));
        assert_eq!(OpCode::from_u8(OpCode::Throw as u8), Some(OpCode::Throw));
        assert_eq!(OpCode::from_u8(255), None);
    }

    #[test]
    fn opcode_name() {
        assert_eq!(OpCode::InvokeDynamic.name(), "INVOKE_DYNAMIC");
        assert_eq!(OpCode::LoopCheck.to_string(), "LOOP_CHECK");
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(OpCode::Pop.operand_size(), 0);
        assert_eq!(OpCode::Pick.operand_size(), 1);
        assert_eq!(OpCode::GetLocal.operand_size(), 2);
        assert_eq!(OpCode::NewArray.operand_size(), 3);
        assert_eq!(OpCode::LoopCheck.operand_size(), 2);
    }

    #[test]
    fn every_byte_decodes_consistently() {
        for byte in 0..=u8::MAX {
            if let Some(op) = OpCode::from_u8(byte) {
                assert_eq!(op as u8, byte);
                assert!(!op.name().is_empty());
            }
        }
    }
}
