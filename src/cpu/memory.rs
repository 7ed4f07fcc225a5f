//! Sparse word-addressed memory.
//!
//! Every non-negative address is valid. Cells that were never written
//! read back as zero, so the store only keeps the cells a program touched.

use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

/// A machine word: memory cells, registers and stack entries all hold one.
pub type Word = i32;

/// A memory address.
pub type Address = u32;

/// Sparse memory of 32-bit words.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: BTreeMap<Address, Word>,
}

impl Memory {
    /// Create an empty memory (every cell reads as zero).
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }

    /// Read a cell. Unwritten cells are zero.
    #[inline]
    pub fn read(&self, addr: Address) -> Word {
        self.cells.get(&addr).copied().unwrap_or(0)
    }

    /// Write a cell.
    #[inline]
    pub fn write(&mut self, addr: Address, value: Word) {
        self.cells.insert(addr, value);
    }

    /// Forget every written cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Copy `program` into consecutive cells starting at `start_addr`.
    pub fn load_program(&mut self, start_addr: Address, program: &[Word]) {
        for (addr, &word) in (start_addr..).zip(program) {
            self.cells.insert(addr, word);
        }
    }

    /// Window of `count` cells starting at `start`, zeros included.
    pub fn dump(&self, start: Address, count: usize) -> Vec<(Address, Word)> {
        (start..)
            .take(count)
            .map(|addr| (addr, self.read(addr)))
            .collect()
    }

    /// Written cells in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
        self.cells.iter().map(|(&addr, &value)| (addr, value))
    }

    /// Number of cells that have been written.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.values().filter(|v| **v != 0).count();

        f.debug_struct("Memory")
            .field("written_cells", &self.cells.len())
            .field("non_zero_cells", &non_zero)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(10, 42);
        assert_eq!(mem.read(10), 42);

        mem.write(10, -7);
        assert_eq!(mem.read(10), -7);
        assert_eq!(mem.len(), 1);
    }

    #[test]
    fn test_far_addresses_are_valid() {
        let mut mem = Memory::new();
        mem.write(u32::MAX, 1);
        assert_eq!(mem.read(u32::MAX), 1);
        assert_eq!(mem.read(u32::MAX - 1), 0);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(4, &[1, 2, 3]);

        assert_eq!(mem.read(3), 0);
        assert_eq!(mem.read(4), 1);
        assert_eq!(mem.read(5), 2);
        assert_eq!(mem.read(6), 3);
    }

    #[test]
    fn test_dump_and_clear() {
        let mut mem = Memory::new();
        mem.write(1, 9);

        assert_eq!(mem.dump(0, 3), vec![(0, 0), (1, 9), (2, 0)]);

        mem.clear();
        assert!(mem.is_empty());
        assert_eq!(mem.read(1), 0);
    }

    #[test]
    fn test_iter_is_ordered() {
        let mut mem = Memory::new();
        mem.write(30, 3);
        mem.write(10, 1);
        mem.write(20, 2);

        let cells: Vec<_> = mem.iter().collect();
        assert_eq!(cells, vec![(10, 1), (20, 2), (30, 3)]);
    }

    proptest! {
        #[test]
        fn unwritten_cells_read_zero(addr in any::<u32>(), other in any::<u32>(), value in any::<i32>()) {
            prop_assume!(addr != other);
            let mut mem = Memory::new();
            mem.write(other, value);
            prop_assert_eq!(mem.read(addr), 0);
        }
    }
}
