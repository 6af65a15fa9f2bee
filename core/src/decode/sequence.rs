//! Bounded sequence projection
//!
//! Exposes "count elements starting at some base" as an indexable view. The
//! displayed length is always capped; element addresses are computed on demand
//! so a failed read only affects the index that asked for it.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{InspectError, Result};
use crate::introspect::{Address, MemoryIntrospection, TypeId, ValueHandle, offset_address};

/// How element addresses are derived from a logical index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSource {
    /// `base + i * element_size`
    Contiguous { base: Address },
    /// Fixed buffer with wraparound: slot `(first + i) mod capacity`
    Ring {
        base: Address,
        first: u64,
        capacity: u64,
    },
    /// Table of chunk pointers, `chunk_size` elements per chunk
    Chunked {
        chunk_table: Address,
        first: u64,
        chunk_size: u64,
        pointer_size: u64,
    },
}

/// Elements per deque chunk: `max(min_chunk, page_size / element_size)`
pub fn chunk_size(element_size: u64, page_size: u64, min_chunk: u64) -> u64 {
    match page_size.checked_div(element_size) {
        Some(per_page) => per_page.max(min_chunk),
        None => min_chunk,
    }
}

/// An indexable, length-capped view over inspected elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceView {
    element_type: TypeId,
    element_size: u64,
    count: u64,
    limit: usize,
    source: ElementSource,
}

impl SequenceView {
    pub fn new(
        element_type: TypeId,
        element_size: u64,
        count: u64,
        limit: usize,
        source: ElementSource,
    ) -> Self {
        Self {
            element_type,
            element_size,
            count,
            limit,
            source,
        }
    }

    /// Displayed length: `min(count, limit)`; the true count is not otherwise signalled
    pub fn len(&self) -> usize {
        self.count.min(self.limit as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> TypeId {
        self.element_type
    }

    /// Physical slot backing logical index `i` (differs from `i` for rings)
    pub fn physical_index(&self, i: usize) -> Result<u64> {
        match self.source {
            ElementSource::Ring {
                first, capacity, ..
            } => {
                if capacity == 0 {
                    return Err(InspectError::ImplausibleValue {
                        what: "ring capacity",
                        value: 0,
                    });
                }
                Ok(Self::logical_slot(first, i)? % capacity)
            }
            ElementSource::Chunked { first, .. } => Self::logical_slot(first, i),
            ElementSource::Contiguous { .. } => Ok(i as u64),
        }
    }

    fn logical_slot(first: u64, i: usize) -> Result<u64> {
        first
            .checked_add(i as u64)
            .ok_or(InspectError::ImplausibleValue {
                what: "first element",
                value: first,
            })
    }

    /// Address of logical element `i`
    pub fn address_of(&self, mem: &dyn MemoryIntrospection, i: usize) -> Result<Address> {
        let len = self.len();
        if i >= len {
            return Err(InspectError::IndexOutOfRange { index: i, len });
        }
        let physical = self.physical_index(i)?;
        match self.source {
            ElementSource::Contiguous { base } | ElementSource::Ring { base, .. } => {
                offset_address(base, physical, self.element_size)
            }
            ElementSource::Chunked {
                chunk_table,
                chunk_size,
                pointer_size,
                ..
            } => {
                if chunk_size == 0 {
                    return Err(InspectError::ImplausibleValue {
                        what: "chunk size",
                        value: 0,
                    });
                }
                let (chunk_index, chunk_offset) = (physical / chunk_size, physical % chunk_size);
                let entry = mem.read_memory(
                    offset_address(chunk_table, chunk_index, pointer_size)?,
                    pointer_size as usize,
                )?;
                match LittleEndian::read_uint(&entry, pointer_size as usize) {
                    0 => Err(InspectError::InvalidAddress),
                    chunk => offset_address(chunk, chunk_offset, self.element_size),
                }
            }
        }
    }

    /// Handle to logical element `i`
    pub fn element_at(&self, mem: &dyn MemoryIntrospection, i: usize) -> Result<ValueHandle> {
        Ok(ValueHandle::at(self.address_of(mem, i)?, self.element_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::ScalarEncoding;
    use crate::snapshot::SnapshotBuilder;

    #[test]
    fn test_len_never_exceeds_limit() {
        for (count, expected) in [(0u64, 0usize), (1, 1), (256, 256), (257, 256), ((1u64 << 32) - 1, 256)] {
            let view = SequenceView::new(TypeId(0), 4, count, 256, ElementSource::Contiguous { base: 0 });
            assert_eq!(view.len(), expected, "count {}", count);
        }
    }

    #[test]
    fn test_contiguous_addresses() {
        let mut b = SnapshotBuilder::new();
        let int = b.scalar("int", 4, ScalarEncoding::Signed);
        let mem = b.build();
        let view = SequenceView::new(int, 4, 3, 256, ElementSource::Contiguous { base: 0x100 });

        assert_eq!(view.address_of(&mem, 0).unwrap(), 0x100);
        assert_eq!(view.address_of(&mem, 2).unwrap(), 0x108);
        assert_eq!(
            view.address_of(&mem, 3),
            Err(InspectError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_ring_wraps_around() {
        let mem = SnapshotBuilder::new().build();
        let source = ElementSource::Ring {
            base: 0x1000,
            first: 6,
            capacity: 8,
        };
        let view = SequenceView::new(TypeId(0), 2, 4, 256, source);

        let slots: Vec<u64> = (0..4).map(|i| view.physical_index(i).unwrap()).collect();
        assert_eq!(slots, vec![6, 7, 0, 1]);
        assert_eq!(view.address_of(&mem, 2).unwrap(), 0x1000);
    }

    #[test]
    fn test_address_overflow_is_per_index_error() {
        let mem = SnapshotBuilder::new().build();
        let view = SequenceView::new(TypeId(0), 4, 3, 256, ElementSource::Contiguous { base: u64::MAX - 4 });
        assert_eq!(view.address_of(&mem, 1).unwrap(), u64::MAX);
        assert_eq!(view.address_of(&mem, 2), Err(InspectError::InvalidAddress));

        let ring = ElementSource::Ring {
            base: 0x1000,
            first: u64::MAX,
            capacity: 8,
        };
        let view = SequenceView::new(TypeId(0), 4, 2, 256, ring);
        assert!(view.address_of(&mem, 0).is_ok());
        assert!(matches!(
            view.address_of(&mem, 1),
            Err(InspectError::ImplausibleValue { .. })
        ));

        let chunked = ElementSource::Chunked {
            chunk_table: u64::MAX,
            first: 0,
            chunk_size: 1,
            pointer_size: 8,
        };
        let view = SequenceView::new(TypeId(0), 4, 2, 256, chunked);
        assert_eq!(view.address_of(&mem, 1), Err(InspectError::InvalidAddress));
    }

    #[test]
    fn test_chunk_size_policy() {
        assert_eq!(chunk_size(4, 4096, 32), 1024);
        assert_eq!(chunk_size(256, 4096, 32), 32);
        assert_eq!(chunk_size(0, 4096, 32), 32);
    }

    #[test]
    fn test_chunked_indirection_and_per_index_failure() {
        let mut b = SnapshotBuilder::new();
        let int = b.scalar("int", 4, ScalarEncoding::Signed);
        let chunk_a = b.alloc(4 * 4, 8);
        let chunk_b = b.alloc(4 * 4, 8);
        let table = b.alloc(8 * 3, 8);
        b.write_uint(table, 8, chunk_a);
        b.write_uint(table + 8, 8, chunk_b);
        // third chunk pointer left null
        let mem = b.build();

        let source = ElementSource::Chunked {
            chunk_table: table,
            first: 2,
            chunk_size: 4,
            pointer_size: 8,
        };
        let view = SequenceView::new(int, 4, 12, 256, source);

        // logical 0 -> physical 2 -> chunk 0, offset 2
        assert_eq!(view.address_of(&mem, 0).unwrap(), chunk_a + 8);
        // logical 2 -> physical 4 -> chunk 1, offset 0
        assert_eq!(view.address_of(&mem, 2).unwrap(), chunk_b);
        // logical 6 -> physical 8 -> null chunk; neighbours unaffected
        assert_eq!(view.address_of(&mem, 6), Err(InspectError::InvalidAddress));
        assert_eq!(view.address_of(&mem, 5).unwrap(), chunk_b + 12);
    }
}
