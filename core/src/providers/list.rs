//! Doubly linked list

use crate::display::DisplayNode;
use crate::error::{InspectError, Result};
use crate::introspect::{MemoryIntrospection, TypeId, ValueHandle};

use super::{ProviderContext, SyntheticProvider, updated};

#[derive(Debug, Clone)]
struct ListState {
    count_field: ValueHandle,
    count: u64,
    elements: Vec<ValueHandle>,
}

/// `ezList`: `m_uiCount`, then each node's payload in link order
#[derive(Debug, Default)]
pub struct ListProvider {
    state: Option<ListState>,
}

impl ListProvider {
    /// Follow `m_pNext` from the anchor, collecting at most `limit` payloads.
    ///
    /// A null link or an unreadable node ends the walk early.
    fn gather(
        mem: &dyn MemoryIntrospection,
        anchor: &ValueHandle,
        element_type: TypeId,
        limit: usize,
    ) -> Result<Vec<ValueHandle>> {
        let mut elements = Vec::new();
        let mut link = mem.field(anchor, "m_pNext")?;

        while elements.len() < limit {
            let node = match mem.deref(&link) {
                Ok(node) => node,
                Err(InspectError::InvalidAddress) => break,
                Err(e) => {
                    tracing::debug!("list walk stopped after {} nodes: {}", elements.len(), e);
                    break;
                }
            };
            let data = mem.field(&node, "m_Data")?;
            elements.push(data.with_type(element_type));
            link = mem.field(&node, "m_pNext")?;
        }
        Ok(elements)
    }
}

impl SyntheticProvider for ListProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let count_field = mem.field(&value, "m_uiCount")?;
        let count = mem.as_unsigned(&count_field, 0);
        let element_type = mem.template_argument(value.ty, 0)?;
        let anchor = mem.field(&value, "m_First")?;
        let elements = Self::gather(mem, &anchor, element_type, cx.limits.display_len(count))?;

        self.state = Some(ListState {
            count_field,
            count,
            elements,
        });
        Ok(())
    }

    fn child_count(&self, cx: &ProviderContext<'_>) -> Result<usize> {
        Ok(1 + cx.limits.display_len(updated(&self.state)?.count))
    }

    fn child(&mut self, _cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        if index == 0 {
            return Ok(DisplayNode::typed("m_uiCount", 0, state.count_field));
        }
        let logical = index - 1;
        state
            .elements
            .get(logical)
            .map(|element| DisplayNode::element(index, logical, *element))
            .ok_or(InspectError::IndexOutOfRange {
                index: logical,
                len: state.elements.len(),
            })
    }
}
