//! Compiler configuration.
//!
//! [`CompilerSettings`] is plain data with serde support so hosts can keep it
//! in their own configuration files. Missing keys take their defaults.
//!
//! ```
//! use sable_core::CompilerSettings;
//!
//! let settings = CompilerSettings::default().with_max_loop_counter(1000);
//! assert_eq!(settings.max_loop_counter, 1000);
//! assert!(!settings.picky);
//! ```

use serde::{Deserialize, Serialize};

/// Default per-function loop iteration budget.
pub const DEFAULT_MAX_LOOP_COUNTER: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Loop iterations one function may run before faulting. Zero disables
    /// loop instrumentation entirely.
    pub max_loop_counter: u32,
    /// Turn silently tolerated parse ambiguities into errors.
    pub picky: bool,
    /// Whether regex literals and the `=~`/`==~` operators are accepted.
    pub regexes_enabled: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            max_loop_counter: DEFAULT_MAX_LOOP_COUNTER,
            picky: false,
            regexes_enabled: true,
        }
    }
}

impl CompilerSettings {
    pub fn with_max_loop_counter(mut self, max: u32) -> Self {
        self.max_loop_counter = max;
        self
    }

    pub fn with_picky(mut self, picky: bool) -> Self {
        self.picky = picky;
        self
    }

    pub fn with_regexes(mut self, enabled: bool) -> Self {
        self.regexes_enabled = enabled;
        self
    }

    /// Whether loops are instrumented with the iteration budget.
    pub fn counts_loops(&self) -> bool {
        self.max_loop_counter > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = CompilerSettings::default();
        assert_eq!(settings.max_loop_counter, DEFAULT_MAX_LOOP_COUNTER);
        assert!(settings.counts_loops());
        assert!(settings.regexes_enabled);
    }

    #[test]
    fn zero_budget_disables_counting() {
        assert!(!CompilerSettings::default().with_max_loop_counter(0).counts_loops());
    }

    #[test]
    fn deserializes_partial_json() {
        let settings: CompilerSettings =
            serde_json::from_str(r#"{ "max_loop_counter": 10, "picky": true }"#).unwrap();
        assert_eq!(settings.max_loop_counter, 10);
        assert!(settings.picky);
        assert!(settings.regexes_enabled);
    }

    #[test]
    fn serializes_all_fields() {
        let json = serde_json::to_string(&CompilerSettings::default()).unwrap();
        assert!(json.contains("\"max_loop_counter\":1000000"));
        assert!(json.contains("\"regexes_enabled\":true"));
    }
}
