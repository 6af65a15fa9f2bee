//! Packed-slot table decoding for open-addressed hash tables
//!
//! Each slot owns a 2-bit status field; sixteen fields are packed per storage
//! word. Decoding turns the sparse physical table into a dense list of the
//! occupied slots.

use bitflags::bitflags;

use crate::error::Result;

/// Slots whose status bits share one storage word
pub const SLOTS_PER_GROUP: u64 = 16;

bitflags! {
    /// Status bits of one hash table slot
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        /// Slot holds a live entry
        const VALID = 0b01;
        /// Slot held an entry that was removed
        const DELETED = 0b10;
    }
}

/// Status of `slot` extracted from the word holding its group
pub fn slot_flags(word: u64, slot: u64) -> SlotFlags {
    let shift = 2 * (slot % SLOTS_PER_GROUP);
    SlotFlags::from_bits_truncate(((word >> shift) & 0b11) as u8)
}

/// Occupied physical slots in ascending order; position is the logical index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactedIndexMap {
    slots: Vec<u64>,
    /// The scan stopped at the step bound rather than at the end of the table
    pub bound_reached: bool,
}

impl CompactedIndexMap {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Physical slot for a logical index
    pub fn physical(&self, logical: usize) -> Option<u64> {
        self.slots.get(logical).copied()
    }

    pub fn slots(&self) -> &[u64] {
        &self.slots
    }
}

/// Scan `capacity` slots, collecting at most `max_steps` occupied ones.
///
/// `read_group` fetches the packed word for a group index; it is called once per
/// group. A failed read ends the scan with what was collected so far.
pub fn compact(
    capacity: u64,
    max_steps: usize,
    mut read_group: impl FnMut(u64) -> Result<u64>,
) -> CompactedIndexMap {
    let mut map = CompactedIndexMap::default();
    let mut cached: Option<(u64, u64)> = None;

    for slot in 0..capacity {
        if map.slots.len() >= max_steps {
            map.bound_reached = true;
            tracing::warn!(
                "hash table scan stopped after {} entries (capacity {})",
                max_steps,
                capacity
            );
            break;
        }

        let group = slot / SLOTS_PER_GROUP;
        let word = match cached {
            Some((g, word)) if g == group => word,
            _ => match read_group(group) {
                Ok(word) => {
                    cached = Some((group, word));
                    word
                }
                Err(e) => {
                    tracing::debug!("hash flags for group {} unreadable: {}", group, e);
                    break;
                }
            },
        };

        if slot_flags(word, slot).contains(SlotFlags::VALID) {
            map.slots.push(slot);
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InspectError;

    fn words_with(occupied: &[u64], groups: usize) -> Vec<u64> {
        let mut words = vec![0u64; groups];
        for slot in occupied {
            words[(slot / SLOTS_PER_GROUP) as usize] |= 1 << (2 * (slot % SLOTS_PER_GROUP));
        }
        words
    }

    #[test]
    fn test_compacts_in_physical_order() {
        let words = words_with(&[31, 0, 5], 2);
        let map = compact(32, 255, |g| Ok(words[g as usize]));

        assert_eq!(map.slots(), &[0, 5, 31]);
        assert_eq!(map.physical(0), Some(0));
        assert_eq!(map.physical(1), Some(5));
        assert_eq!(map.physical(2), Some(31));
        assert_eq!(map.physical(3), None);
        assert!(!map.bound_reached);
    }

    #[test]
    fn test_deleted_slots_are_skipped() {
        // slot 0 deleted (0b10), slot 1 valid (0b01), slot 2 valid+deleted bits (0b11)
        let word = 0b11_01_10;
        let map = compact(16, 255, |_| Ok(word));
        assert_eq!(map.slots(), &[1, 2]);
        assert_eq!(slot_flags(word, 0), SlotFlags::DELETED);
    }

    #[test]
    fn test_stops_at_step_bound() {
        let all_valid = 0x5555_5555u64;
        let mut reads = 0;
        let map = compact(10_000, 255, |_| {
            reads += 1;
            Ok(all_valid)
        });

        assert_eq!(map.len(), 255);
        assert_eq!(map.physical(254), Some(254));
        assert!(map.bound_reached);
        // one read per group of sixteen slots
        assert_eq!(reads, 16);
    }

    #[test]
    fn test_unreadable_group_keeps_prefix() {
        let map = compact(64, 255, |g| {
            if g == 0 {
                Ok(0b01)
            } else {
                Err(InspectError::InvalidAddress)
            }
        });
        assert_eq!(map.slots(), &[0]);
    }
}
