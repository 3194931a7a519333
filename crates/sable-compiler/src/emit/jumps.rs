//! Jump management for control flow.
//!
//! Tracks one context per enclosing loop. `break` and `continue` are both
//! forward jumps: breaks are patched when the loop exits, continues when
//! the loop reaches the code that starts its next iteration (the update
//! of a `for`, the condition of a `do`-`while`).

use super::JumpLabel;

/// Tracks the loops enclosing the code being emitted.
#[derive(Debug, Default)]
pub struct JumpManager {
    /// Innermost last.
    loops: Vec<LoopContext>,
}

#[derive(Debug, Default)]
struct LoopContext {
    /// Pending break jumps, patched past the loop.
    break_labels: Vec<JumpLabel>,
    /// Pending continue jumps, patched at the continue point.
    continue_labels: Vec<JumpLabel>,
}

impl JumpManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_loop(&mut self) {
        self.loops.push(LoopContext::default());
    }

    /// Leave the innermost loop, returning its break jumps.
    ///
    /// `None` when no loop is open, or when continues were never bound.
    pub fn exit_loop(&mut self) -> Option<Vec<JumpLabel>> {
        let ctx = self.loops.pop()?;
        ctx.continue_labels.is_empty().then_some(ctx.break_labels)
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    /// Record a break; `false` outside any loop.
    pub fn add_break(&mut self, label: JumpLabel) -> bool {
        match self.loops.last_mut() {
            Some(ctx) => {
                ctx.break_labels.push(label);
                true
            }
            None => false,
        }
    }

    /// Record a continue; `false` outside any loop.
    pub fn add_continue(&mut self, label: JumpLabel) -> bool {
        match self.loops.last_mut() {
            Some(ctx) => {
                ctx.continue_labels.push(label);
                true
            }
            None => false,
        }
    }

    /// The innermost loop's pending continues, to patch at the current
    /// position.
    pub fn take_continues(&mut self) -> Vec<JumpLabel> {
        self.loops
            .last_mut()
            .map(|ctx| std::mem::take(&mut ctx.continue_labels))
            .unwrap_or_default()
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_manager_not_in_loop() {
        let manager = JumpManager::new();
        assert!(!manager.in_loop());
        assert_eq!(manager.loop_depth(), 0);
    }

    #[test]
    fn nested_loops_keep_their_own_jumps() {
        let mut manager = JumpManager::new();
        manager.enter_loop();
        assert!(manager.add_break(JumpLabel(5)));
        manager.enter_loop();
        assert!(manager.add_break(JumpLabel(10)));
        assert!(manager.add_continue(JumpLabel(12)));
        assert_eq!(manager.loop_depth(), 2);

        assert_eq!(manager.take_continues(), vec![JumpLabel(12)]);
        assert_eq!(manager.exit_loop(), Some(vec![JumpLabel(10)]));
        assert_eq!(manager.exit_loop(), Some(vec![JumpLabel(5)]));
    }

    #[test]
    fn unbound_continues_are_a_defect() {
        let mut manager = JumpManager::new();
        manager.enter_loop();
        manager.add_break(JumpLabel(100));
        manager.add_continue(JumpLabel(110));
        assert_eq!(manager.exit_loop(), None);
    }

    #[test]
    fn jumps_outside_loops_are_refused() {
        let mut manager = JumpManager::new();
        assert!(!manager.add_break(JumpLabel(1)));
        assert!(!manager.add_continue(JumpLabel(2)));
        assert!(manager.take_continues().is_empty());
        assert!(manager.exit_loop().is_none());
    }
}
