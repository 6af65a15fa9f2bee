//! Ordered maps and sets backed by a red-black tree
//!
//! Nodes carry `m_pParent` and `m_pLink[2]` (left, right). Absent links point at
//! the container's embedded `m_NilNode`.

use crate::decode::{TreeLinks, TreeWalker};
use crate::display::DisplayNode;
use crate::error::{InspectError, Result};
use crate::introspect::{Address, MemoryIntrospection, TypeId, ValueHandle};

use super::{ProviderContext, SyntheticProvider, updated, updated_mut};

/// Tree links read from inspected memory; nodes are addresses
pub struct NodeLinks<'a> {
    mem: &'a dyn MemoryIntrospection,
    root: Address,
    nil: Address,
    node_type: TypeId,
}

impl<'a> NodeLinks<'a> {
    pub fn new(
        mem: &'a dyn MemoryIntrospection,
        root: Address,
        nil: Address,
        node_type: TypeId,
    ) -> Self {
        Self {
            mem,
            root,
            nil,
            node_type,
        }
    }

    fn node(&self, address: Address) -> ValueHandle {
        ValueHandle::at(address, self.node_type)
    }

    fn link(&self, node: Address, side: usize) -> Result<Address> {
        let links = self.mem.field(&self.node(node), "m_pLink")?;
        self.mem.pointer_value(&self.mem.index(&links, side)?)
    }
}

impl TreeLinks for NodeLinks<'_> {
    type Node = Address;

    fn root(&self) -> Result<Address> {
        Ok(self.root)
    }

    fn left(&self, node: Address) -> Result<Address> {
        self.link(node, 0)
    }

    fn right(&self, node: Address) -> Result<Address> {
        self.link(node, 1)
    }

    fn parent(&self, node: Address) -> Result<Address> {
        self.mem
            .pointer_value(&self.mem.field(&self.node(node), "m_pParent")?)
    }

    fn is_sentinel(&self, node: Address) -> bool {
        node == self.nil || node == 0
    }
}

#[derive(Debug, Clone)]
struct MapState {
    count_field: ValueHandle,
    count: u64,
    root: Address,
    nil: Address,
    node_type: TypeId,
    cursor: Option<(usize, Address)>,
}

/// `ezMap` / `ezSet`: `m_uiCount`, then the nodes in key order
#[derive(Debug, Default)]
pub struct OrderedMapProvider {
    state: Option<MapState>,
}

impl SyntheticProvider for OrderedMapProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let count_field = mem.field(&value, "m_uiCount")?;
        let root = mem.field(&value, "m_pRoot")?;
        let nil = mem.load_address(&mem.field(&value, "m_NilNode")?)?;

        self.state = Some(MapState {
            count_field,
            count: mem.as_unsigned(&count_field, 0),
            root: mem.pointer_value(&root)?,
            nil,
            node_type: mem.pointee_type(root.ty)?,
            cursor: None,
        });
        Ok(())
    }

    fn child_count(&self, cx: &ProviderContext<'_>) -> Result<usize> {
        let state = updated(&self.state)?;
        if state.count > cx.limits.max_map_count {
            tracing::warn!("map count {:#x} is implausible; showing no entries", state.count);
            return Ok(1);
        }
        Ok(1 + cx.limits.display_len(state.count))
    }

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let len = self.child_count(cx)?;
        let state = updated_mut(&mut self.state)?;
        if index == 0 {
            return Ok(DisplayNode::typed("m_uiCount", 0, state.count_field));
        }
        if index >= len {
            return Err(InspectError::IndexOutOfRange { index, len });
        }

        let logical = index - 1;
        let links = NodeLinks::new(cx.mem, state.root, state.nil, state.node_type);
        let mut walker = TreeWalker::with_cursor(links, cx.limits.max_tree_steps, state.cursor);
        let node = walker.nth(logical)?;
        state.cursor = walker.cursor();

        match node {
            Some(address) => Ok(DisplayNode::element(
                index,
                logical,
                ValueHandle::at(address, state.node_type),
            )),
            None => Err(InspectError::IndexOutOfRange { index, len }),
        }
    }
}
