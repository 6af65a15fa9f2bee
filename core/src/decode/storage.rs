//! Storage-mode decoding for hybrid containers
//!
//! Hybrid strings and small arrays keep short payloads in an inline buffer and
//! move to a heap allocation once they outgrow it.

use crate::error::Result;
use crate::introspect::Address;

/// Where a hybrid container's payload currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Inline,
    External,
}

/// Classify by count (strings) or capacity (small arrays).
///
/// Ties favor `Inline`: a payload that exactly fills the inline buffer is still inline.
pub fn classify(count_or_capacity: u64, inline_capacity: u64) -> StorageMode {
    if count_or_capacity <= inline_capacity {
        StorageMode::Inline
    } else {
        StorageMode::External
    }
}

/// Derived storage facts for one hybrid container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageDescriptor {
    pub mode: StorageMode,
    /// Inline capacity in elements
    pub inline_capacity: u64,
    /// Current logical count
    pub count: u64,
    /// Current physical capacity
    pub capacity: u64,
}

impl StorageDescriptor {
    /// Strings switch on their current count
    pub fn for_string(count: u64, capacity: u64, inline_capacity: u64) -> Self {
        Self {
            mode: classify(count, inline_capacity),
            inline_capacity,
            count,
            capacity,
        }
    }

    /// Small arrays switch on their current capacity
    pub fn for_small_array(count: u64, capacity: u64, inline_capacity: u64) -> Self {
        Self {
            mode: classify(capacity, inline_capacity),
            inline_capacity,
            count,
            capacity,
        }
    }

    /// Base address feeding element projection.
    ///
    /// The heap pointer is only read for external storage.
    pub fn base(
        &self,
        inline: Address,
        external: impl FnOnce() -> Result<Address>,
    ) -> Result<Address> {
        match self.mode {
            StorageMode::Inline => Ok(inline),
            StorageMode::External => external(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tie_is_inline() {
        assert_eq!(classify(16, 16), StorageMode::Inline);
        assert_eq!(classify(0, 0), StorageMode::Inline);
        assert_eq!(classify(17, 16), StorageMode::External);
        assert_eq!(classify(3, 16), StorageMode::Inline);
    }

    #[test]
    fn test_string_uses_count_small_array_uses_capacity() {
        // Count fits inline but the buffer has already grown
        let string = StorageDescriptor::for_string(4, 64, 16);
        assert_eq!(string.mode, StorageMode::Inline);

        let array = StorageDescriptor::for_small_array(4, 64, 16);
        assert_eq!(array.mode, StorageMode::External);
        assert_eq!(array.base(0x10, || Ok(0x2000)), Ok(0x2000));
        assert_eq!(
            string.base(0x10, || panic!("inline storage never reads the heap pointer")),
            Ok(0x10)
        );
    }
}
