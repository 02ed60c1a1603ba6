//! In-memory backend for the emulator.
use std::{collections::BTreeMap, sync::Mutex};

use sysbot_protocol::AddressSpace;

use crate::MemoryDevice;

/// Sparse byte addressable memory.
///
/// Heap and main offsets are translated to absolute addresses using the configured
/// bases, so the three address spaces alias each other the same way they do on a
/// console. Bytes that were never written read as zero.
#[derive(Debug)]
pub struct SparseMemory {
    main_nso_base: u64,
    heap_base: u64,
    bytes: Mutex<BTreeMap<u64, u8>>,
}

impl SparseMemory {
    pub const DEFAULT_MAIN_NSO_BASE: u64 = 0x0000_0080_0000_4000;
    pub const DEFAULT_HEAP_BASE: u64 = 0x0000_0021_0000_0000;

    pub fn new(main_nso_base: u64, heap_base: u64) -> SparseMemory {
        SparseMemory {
            main_nso_base,
            heap_base,
            bytes: Mutex::new(BTreeMap::new()),
        }
    }

    /// Absolute address of `offset` in `space`.
    pub fn resolve(&self, space: AddressSpace, offset: u64) -> u64 {
        match space {
            AddressSpace::Heap => self.heap_base.wrapping_add(offset),
            AddressSpace::Main => self.main_nso_base.wrapping_add(offset),
            AddressSpace::Absolute => offset,
        }
    }

    /// Number of bytes that were written at least once.
    pub fn len(&self) -> usize {
        self.bytes.lock().map(|bytes| bytes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SparseMemory {
    fn default() -> Self {
        SparseMemory::new(Self::DEFAULT_MAIN_NSO_BASE, Self::DEFAULT_HEAP_BASE)
    }
}

impl MemoryDevice for SparseMemory {
    fn peek(&self, space: AddressSpace, offset: u64, length: usize) -> Box<[u8]> {
        let start = self.resolve(space, offset);
        let mut out = vec![0u8; length].into_boxed_slice();
        let Ok(bytes) = self.bytes.lock() else {
            log::error!("Memory lock poisoned, answering peek with zeros");
            return out;
        };
        for (i, slot) in out.iter_mut().enumerate() {
            if let Some(byte) = bytes.get(&start.wrapping_add(i as u64)) {
                *slot = *byte;
            }
        }
        out
    }

    fn poke(&self, space: AddressSpace, offset: u64, data: &[u8]) {
        let start = self.resolve(space, offset);
        let Ok(mut bytes) = self.bytes.lock() else {
            log::error!("Memory lock poisoned, dropping poke");
            return;
        };
        for (i, byte) in data.iter().enumerate() {
            bytes.insert(start.wrapping_add(i as u64), *byte);
        }
    }

    fn main_nso_base(&self) -> u64 {
        self.main_nso_base
    }

    fn heap_base(&self) -> u64 {
        self.heap_base
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unwritten_memory_reads_zero() {
        let memory = SparseMemory::default();
        assert_eq!(&*memory.peek(AddressSpace::Heap, 0, 4), &[0, 0, 0, 0]);
        assert!(memory.is_empty());
    }

    #[test]
    fn spaces_alias_through_bases() {
        let memory = SparseMemory::new(0x8000, 0x1000);
        memory.poke(AddressSpace::Heap, 0x10, &[1, 2, 3]);
        assert_eq!(&*memory.peek(AddressSpace::Absolute, 0x1010, 3), &[1, 2, 3]);

        memory.poke(AddressSpace::Absolute, 0x8004, &[9]);
        assert_eq!(&*memory.peek(AddressSpace::Main, 0x3, 3), &[0, 9, 0]);
        assert_eq!(memory.len(), 4);
    }
}
