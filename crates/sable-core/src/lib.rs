//! Core types shared by every Sable crate.
//!
//! - [`Span`]: source locations
//! - [`TypeHash`]: deterministic identity of types and members
//! - [`DataType`] / [`PrimitiveKind`]: static types
//! - [`error`]: the error taxonomy
//! - [`CompilerSettings`]: compiler configuration
//! - [`Fault`]: runtime faults raised by instrumented code

pub mod data_type;
pub mod error;
pub mod fault;
pub mod settings;
pub mod span;
pub mod type_hash;

pub use data_type::{DataType, PrimitiveKind, StackKind};
pub use error::{
    CompilationError, Error, ErrorKind, InternalError, ParseError, ParseErrorKind,
    RegistrationError, Result,
};
pub use fault::Fault;
pub use settings::{CompilerSettings, DEFAULT_MAX_LOOP_COUNTER};
pub use span::Span;
pub use type_hash::{TypeHash, known, primitives};
