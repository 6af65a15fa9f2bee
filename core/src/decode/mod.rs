//! Reconstruction algorithms
//!
//! Each decoder works from a handful of header values plus the
//! [`MemoryIntrospection`](crate::introspect::MemoryIntrospection) capability and
//! keeps no state beyond one update cycle.

pub mod enums;
pub mod sequence;
pub mod slots;
pub mod storage;
pub mod tree;
pub mod variant;

pub use enums::{render_bitflags, render_enum, wrapped_enum_members};
pub use sequence::{ElementSource, SequenceView, chunk_size};
pub use slots::{CompactedIndexMap, SLOTS_PER_GROUP, SlotFlags, compact, slot_flags};
pub use storage::{StorageDescriptor, StorageMode, classify};
pub use tree::{TreeLinks, TreeWalker};
pub use variant::{Resolution, VariantRegistry, VariantState, VariantStorage};
