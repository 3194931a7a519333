//! Local variable slots.
//!
//! Slots are handed out densely in declaration order. A block releases the
//! slots of everything declared inside it when it closes, so siblings reuse
//! them; nothing is reused while the declaring block is still open.

use rustc_hash::FxHashMap;
use sable_core::InternalError;

use crate::resolve::scope::VarId;

#[derive(Debug, Default)]
pub struct SlotAllocator {
    slots: FxHashMap<VarId, u16>,
    /// Per open block: the first slot it owns and the variables it declared.
    blocks: Vec<(u16, Vec<VarId>)>,
    next: u16,
    high_water: u16,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot no variable owns, held for the whole function: the receiver
    /// or the loop counter.
    pub fn reserve(&mut self) -> Result<u16, InternalError> {
        if !self.blocks.is_empty() {
            return Err(InternalError::new("hidden slots are reserved before any block opens"));
        }
        self.take()
    }

    pub fn declare(&mut self, var: VarId) -> Result<u16, InternalError> {
        if self.slots.contains_key(&var) {
            return Err(InternalError::new(format!("variable {} declared twice", var.0)));
        }
        let slot = self.take()?;
        self.slots.insert(var, slot);
        if let Some((_, declared)) = self.blocks.last_mut() {
            declared.push(var);
        }
        Ok(slot)
    }

    pub fn slot(&self, var: VarId) -> Result<u16, InternalError> {
        self.slots
            .get(&var)
            .copied()
            .ok_or_else(|| InternalError::new(format!("variable {} has no slot", var.0)))
    }

    /// The slot of `var`, declaring it in the current block on first use.
    pub fn slot_or_declare(&mut self, var: VarId) -> Result<u16, InternalError> {
        match self.slots.get(&var) {
            Some(&slot) => Ok(slot),
            None => self.declare(var),
        }
    }

    pub fn push_block(&mut self) {
        self.blocks.push((self.next, Vec::new()));
    }

    pub fn pop_block(&mut self) {
        if let Some((first, declared)) = self.blocks.pop() {
            for var in declared {
                self.slots.remove(&var);
            }
            self.next = first;
        }
    }

    /// Slots the function needs at its high-water mark.
    pub fn max_slots(&self) -> u16 {
        self.high_water
    }

    fn take(&mut self) -> Result<u16, InternalError> {
        let slot = self.next;
        self.next = slot
            .checked_add(1)
            .ok_or_else(|| InternalError::new("too many local variables"))?;
        self.high_water = self.high_water.max(self.next);
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_dense() {
        let mut slots = SlotAllocator::new();
        assert_eq!(slots.reserve().unwrap(), 0);
        assert_eq!(slots.declare(VarId(0)).unwrap(), 1);
        assert_eq!(slots.declare(VarId(1)).unwrap(), 2);
        assert_eq!(slots.slot(VarId(1)).unwrap(), 2);
        assert_eq!(slots.max_slots(), 3);
    }

    #[test]
    fn closed_blocks_release_their_slots() {
        let mut slots = SlotAllocator::new();
        slots.declare(VarId(0)).unwrap();

        slots.push_block();
        assert_eq!(slots.declare(VarId(1)).unwrap(), 1);
        assert_eq!(slots.declare(VarId(2)).unwrap(), 2);
        slots.pop_block();
        assert!(slots.slot(VarId(1)).is_err());

        slots.push_block();
        assert_eq!(slots.declare(VarId(3)).unwrap(), 1);
        slots.pop_block();

        assert_eq!(slots.slot(VarId(0)).unwrap(), 0);
        assert_eq!(slots.max_slots(), 3);
    }

    #[test]
    fn open_blocks_keep_their_slots() {
        let mut slots = SlotAllocator::new();
        slots.push_block();
        let outer = slots.declare(VarId(0)).unwrap();
        slots.push_block();
        let inner = slots.declare(VarId(1)).unwrap();
        assert_ne!(outer, inner);
        slots.pop_block();
        assert_eq!(slots.slot(VarId(0)).unwrap(), outer);
    }

    #[test]
    fn declaring_twice_is_a_defect() {
        let mut slots = SlotAllocator::new();
        slots.declare(VarId(4)).unwrap();
        assert!(slots.declare(VarId(4)).is_err());
        assert_eq!(slots.slot_or_declare(VarId(4)).unwrap(), 0);
        assert_eq!(slots.slot_or_declare(VarId(5)).unwrap(), 1);
    }

    #[test]
    fn reserving_inside_a_block_is_a_defect() {
        let mut slots = SlotAllocator::new();
        slots.push_block();
        assert!(slots.reserve().is_err());
    }
}
