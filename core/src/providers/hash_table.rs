//! Open-addressed hash tables and sets

use crate::decode::{CompactedIndexMap, compact};
use crate::display::DisplayNode;
use crate::error::{InspectError, Result};
use crate::introspect::{Address, TypeId, ValueHandle, offset_address};

use super::{LeadingFields, ProviderContext, SyntheticProvider, updated};

#[derive(Debug, Clone)]
struct HashTableState {
    fields: LeadingFields,
    count: u64,
    entries: Address,
    entry_type: TypeId,
    entry_size: u64,
    occupied: CompactedIndexMap,
}

/// `ezHashTable` / `ezHashSet`: occupied entries in physical slot order
#[derive(Debug, Default)]
pub struct HashTableProvider {
    state: Option<HashTableState>,
}

impl SyntheticProvider for HashTableProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let fields =
            LeadingFields::locate(mem, &value, &["m_uiCount", "m_uiCapacity", "m_pAllocator"])?;
        let count = mem.as_unsigned(&fields.get("m_uiCount")?, 0);
        let capacity = mem.as_unsigned(&fields.get("m_uiCapacity")?, 0);

        let entries = mem.field(&value, "m_pEntries")?;
        let entry_type = mem.pointee_type(entries.ty)?;
        let entry_size = mem.byte_size(entry_type)?;

        let flags = mem.field(&value, "m_pEntryFlags")?;
        let flags_type = mem.pointee_type(flags.ty)?;
        let flags_size = mem.byte_size(flags_type)?;
        let flags_base = mem.element_base(&flags)?;

        let occupied = compact(capacity, cx.limits.max_hash_steps, |group| {
            let word = offset_address(flags_base, group, flags_size)?;
            mem.try_unsigned(&ValueHandle::at(word, flags_type))
        });

        self.state = Some(HashTableState {
            fields,
            count,
            entries: mem.element_base(&entries)?,
            entry_type,
            entry_size,
            occupied,
        });
        Ok(())
    }

    fn child_count(&self, cx: &ProviderContext<'_>) -> Result<usize> {
        let state = updated(&self.state)?;
        Ok(state.fields.len() + cx.limits.display_len(state.count))
    }

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        if let Some(node) = state.fields.node(index) {
            return Ok(node);
        }
        let logical = index - state.fields.len();
        let Some(slot) = state.occupied.physical(logical) else {
            // entries past the scan cap were never located
            if state.occupied.bound_reached {
                return Err(InspectError::BoundExceeded(cx.limits.max_hash_steps));
            }
            return Err(InspectError::IndexOutOfRange {
                index: logical,
                len: state.occupied.len(),
            });
        };
        let entry = ValueHandle::at(
            offset_address(state.entries, slot, state.entry_size)?,
            state.entry_type,
        );
        Ok(DisplayNode::element(index, logical, entry))
    }
}
