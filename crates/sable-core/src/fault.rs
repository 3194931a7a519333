//! Runtime faults raised by instrumented bytecode.
//!
//! These are part of the contract between compiled units and the executing
//! runtime. A fault unwinds the whole script: no script-level catch handler
//! matches it, whatever type the handler names.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// A function exhausted its loop iteration budget.
    #[error(
        "the maximum number of statements that can be executed in a loop ({max}) has been reached"
    )]
    LoopLimitExceeded { max: u32 },
}

impl Fault {
    /// Faults are never visible to script catch handlers.
    pub fn is_catchable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_limit_is_not_catchable() {
        let fault = Fault::LoopLimitExceeded { max: 1000 };
        assert!(!fault.is_catchable());
        assert!(fault.to_string().contains("(1000)"));
    }
}
