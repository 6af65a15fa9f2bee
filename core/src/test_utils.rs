//! Shared test fixtures: engine container layouts built in a snapshot image

use crate::introspect::{Address, ScalarEncoding, TypeId, ValueHandle};
use crate::snapshot::{Snapshot, SnapshotBuilder};

// ============================================================================
// Fixture
// ============================================================================

/// A snapshot under construction plus the primitive types every layout uses
pub struct Fixture {
    pub b: SnapshotBuilder,
    pub u8: TypeId,
    pub u16: TypeId,
    pub u32: TypeId,
    pub u64: TypeId,
    pub int: TypeId,
    pub float: TypeId,
    pub chr: TypeId,
    pub boolean: TypeId,
    pub allocator: TypeId,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let mut b = SnapshotBuilder::new();
        let u8 = b.scalar("ezUInt8", 1, ScalarEncoding::Unsigned);
        let u16 = b.scalar("ezUInt16", 2, ScalarEncoding::Unsigned);
        let u32 = b.scalar("ezUInt32", 4, ScalarEncoding::Unsigned);
        let u64 = b.scalar("ezUInt64", 8, ScalarEncoding::Unsigned);
        let int = b.scalar("int", 4, ScalarEncoding::Signed);
        let float = b.scalar("float", 4, ScalarEncoding::Float);
        let chr = b.scalar("char", 1, ScalarEncoding::Char);
        let boolean = b.scalar("bool", 1, ScalarEncoding::Bool);
        let allocator_ty = b.structure("ezAllocator").field("m_uiId", u32).finish();
        let allocator = b.pointer(allocator_ty);
        Self {
            b,
            u8,
            u16,
            u32,
            u64,
            int,
            float,
            chr,
            boolean,
            allocator,
        }
    }

    pub fn build(self) -> Snapshot {
        self.b.build()
    }

    fn name(&self, ty: TypeId) -> String {
        self.b.type_name(ty).to_string()
    }

    /// Write integers of `ty`'s size back to back
    pub fn write_elements(&mut self, address: Address, ty: TypeId, values: &[u64]) {
        let size = self.b.size_of(ty);
        for (i, value) in values.iter().enumerate() {
            self.b.write_uint(address + i as u64 * size, size, *value);
        }
    }

    /// Heap copy of `values`, returning its address
    pub fn alloc_elements(&mut self, ty: TypeId, values: &[u64]) -> Address {
        let size = self.b.size_of(ty);
        let address = self.b.alloc(size * values.len().max(1) as u64, size.min(8));
        self.write_elements(address, ty, values);
        address
    }

    // ------------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------------

    /// `ezHybridString<N>` and its `ezHybridArray<char, N>` storage member type
    pub fn hybrid_string_type(&mut self, inline: u64) -> (TypeId, TypeId) {
        let chr = self.chr;
        let char_ptr = self.b.pointer(chr);
        let buffer = self.b.array(chr, inline);
        let (u32, allocator) = (self.u32, self.allocator);

        let array_base = self
            .b
            .structure("ezArrayBase<char>")
            .field("m_pElements", char_ptr)
            .field("m_uiCount", u32)
            .field("m_uiCapacity", u32)
            .field("m_pAllocator", allocator)
            .finish();
        let storage = self
            .b
            .structure(&format!("ezStaticArrayStorage<char,{}>", inline))
            .field("m_Data", buffer)
            .finish();
        let data_ty = self
            .b
            .structure(&format!("ezHybridArray<char,{}>", inline))
            .base(array_base)
            .field("m_StaticData", storage)
            .template_arg(chr)
            .finish();
        let string_ty = self
            .b
            .structure(&format!("ezHybridString<{}>", inline))
            .field("m_Data", data_ty)
            .finish();
        (string_ty, data_ty)
    }

    /// Fill the `ezHybridString<N>` at `address`, inline when `text` fits
    pub fn write_hybrid_string(&mut self, address: Address, inline: u64, text: &str) {
        let (string_ty, data_ty) = self.hybrid_string_type(inline);
        let data = self.b.field_address(address, string_ty, "m_Data");
        let inline_address = self.b.field_address(data, data_ty, "m_StaticData");

        let count = text.len() as u64;
        let (elements, capacity) = if count <= inline {
            self.b.write(inline_address, text.as_bytes());
            (inline_address, inline)
        } else {
            let external = self.b.alloc(count + 1, 1);
            self.b.write(external, text.as_bytes());
            (external, count + 1)
        };
        self.b
            .set_field(data, data_ty, "m_pElements", elements)
            .set_field(data, data_ty, "m_uiCount", count)
            .set_field(data, data_ty, "m_uiCapacity", capacity);
    }

    pub fn hybrid_string(&mut self, text: &str, inline: u64) -> ValueHandle {
        let (string_ty, _) = self.hybrid_string_type(inline);
        let address = self.b.alloc_value(string_ty);
        self.write_hybrid_string(address, inline, text);
        ValueHandle::at(address, string_ty)
    }

    pub fn string_view_type(&mut self) -> TypeId {
        let char_ptr = self.b.pointer(self.chr);
        let u32 = self.u32;
        self.b
            .structure("ezStringView")
            .field("m_pStart", char_ptr)
            .field("m_uiElementCount", u32)
            .finish()
    }

    /// Write a string view over a heap copy of `text` at `address`
    pub fn write_string_view(&mut self, address: Address, text: &str) {
        let view_ty = self.string_view_type();
        let start = if text.is_empty() {
            0
        } else {
            let start = self.b.alloc(text.len() as u64, 1);
            self.b.write(start, text.as_bytes());
            start
        };
        self.b
            .set_field(address, view_ty, "m_pStart", start)
            .set_field(address, view_ty, "m_uiElementCount", text.len() as u64);
    }

    pub fn string_view(&mut self, text: &str) -> ValueHandle {
        let view_ty = self.string_view_type();
        let address = self.b.alloc_value(view_ty);
        self.write_string_view(address, text);
        ValueHandle::at(address, view_ty)
    }

    // ------------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------------

    /// `ezDynamicArray<T>` with `values` on the heap
    pub fn dynamic_array(&mut self, element: TypeId, values: &[u64]) -> ValueHandle {
        let element_name = self.name(element);
        let element_ptr = self.b.pointer(element);
        let (u32, allocator) = (self.u32, self.allocator);

        let base = self
            .b
            .structure(&format!("ezArrayBase<{}>", element_name))
            .field("m_pElements", element_ptr)
            .field("m_uiCount", u32)
            .field("m_uiCapacity", u32)
            .finish();
        let array_ty = self
            .b
            .structure(&format!("ezDynamicArray<{}>", element_name))
            .base(base)
            .field("m_pAllocator", allocator)
            .template_arg(element)
            .finish();

        let elements = self.alloc_elements(element, values);
        let address = self.b.alloc_value(array_ty);
        self.b
            .set_field(address, array_ty, "m_pElements", elements)
            .set_field(address, array_ty, "m_uiCount", values.len() as u64)
            .set_field(address, array_ty, "m_uiCapacity", values.len() as u64);
        ValueHandle::at(address, array_ty)
    }

    /// `ezSmallArray<T, N>`; elements move to the heap once they outgrow `N`
    pub fn small_array(&mut self, element: TypeId, inline: u64, values: &[u64]) -> ValueHandle {
        let element_name = self.name(element);
        let element_ptr = self.b.pointer(element);
        let buffer = self.b.array(element, inline);
        let (u16, u32) = (self.u16, self.u32);

        let static_data = self
            .b
            .structure(&format!("ezSmallArrayStorage<{},{}>", element_name, inline))
            .field("m_Data", buffer)
            .finish();
        let storage = self
            .b
            .structure(&format!("ezSmallArrayBase<{},{}>::Storage", element_name, inline))
            .field_at("m_StaticData", 0, static_data)
            .field_at("m_pElements", 0, element_ptr)
            .finish();
        let base = self
            .b
            .structure(&format!("ezSmallArrayBase<{},{}>", element_name, inline))
            .field("m_uiCount", u16)
            .field("m_uiCapacity", u16)
            .field("m_uiUserData", u32)
            .field("m_Data", storage)
            .finish();
        let array_ty = self
            .b
            .structure(&format!("ezSmallArray<{},{}>", element_name, inline))
            .base(base)
            .template_arg(element)
            .finish();

        let address = self.b.alloc_value(array_ty);
        let storage_address = self.b.field_address(address, array_ty, "m_Data");
        let count = values.len() as u64;
        let capacity = if count <= inline {
            self.write_elements(storage_address, element, values);
            inline
        } else {
            let external = self.alloc_elements(element, values);
            self.b.write_uint(storage_address, 8, external);
            count
        };
        self.b
            .set_field(address, array_ty, "m_uiCount", count)
            .set_field(address, array_ty, "m_uiCapacity", capacity)
            .set_field(address, array_ty, "m_uiUserData", 0xab);
        ValueHandle::at(address, array_ty)
    }

    /// `ezStaticRingBuffer<T, N>` whose logical order starts at slot `first`
    pub fn ring_buffer(
        &mut self,
        element: TypeId,
        capacity: u64,
        first: u64,
        values: &[u64],
    ) -> ValueHandle {
        let element_name = self.name(element);
        let element_ptr = self.b.pointer(element);
        let buffer = self.b.array(element, capacity);
        let u32 = self.u32;

        let storage = self
            .b
            .structure(&format!("ezStaticRingBufferStorage<{},{}>", element_name, capacity))
            .field("m_Data", buffer)
            .finish();
        let ring_ty = self
            .b
            .structure(&format!("ezStaticRingBuffer<{},{}>", element_name, capacity))
            .field("m_Storage", storage)
            .field("m_pElements", element_ptr)
            .field("m_uiCount", u32)
            .field("m_uiFirstElement", u32)
            .template_arg(element)
            .finish();

        let address = self.b.alloc_value(ring_ty);
        let slots = self.b.field_address(address, ring_ty, "m_Storage");
        let size = self.b.size_of(element);
        for (i, value) in values.iter().enumerate() {
            let slot = (first + i as u64) % capacity;
            self.b.write_uint(slots + slot * size, size, *value);
        }
        self.b
            .set_field(address, ring_ty, "m_pElements", slots)
            .set_field(address, ring_ty, "m_uiCount", values.len() as u64)
            .set_field(address, ring_ty, "m_uiFirstElement", first);
        ValueHandle::at(address, ring_ty)
    }

    /// `ezDeque<T>` split into chunks of `chunk_size` elements, starting at `first`
    pub fn deque(
        &mut self,
        element: TypeId,
        chunk_size: u64,
        first: u64,
        values: &[u64],
    ) -> ValueHandle {
        let element_name = self.name(element);
        let element_ptr = self.b.pointer(element);
        let chunk_table_ptr = self.b.pointer(element_ptr);
        let (u32, allocator) = (self.u32, self.allocator);

        let deque_ty = self
            .b
            .structure(&format!("ezDeque<{}>", element_name))
            .field("m_pChunks", chunk_table_ptr)
            .field("m_uiChunks", u32)
            .field("m_uiFirstElement", u32)
            .field("m_uiCount", u32)
            .field("m_pAllocator", allocator)
            .template_arg(element)
            .finish();

        let last = first + values.len() as u64;
        let chunks = last.div_ceil(chunk_size).max(1);
        let size = self.b.size_of(element);
        let mut table = Vec::new();
        for _ in 0..chunks {
            table.push(self.b.alloc(chunk_size * size, size.min(8)));
        }
        for (i, value) in values.iter().enumerate() {
            let physical = first + i as u64;
            let chunk = table[(physical / chunk_size) as usize];
            self.b
                .write_uint(chunk + (physical % chunk_size) * size, size, *value);
        }
        let pointer_ty = self.u64;
        let table_address = self.alloc_elements(pointer_ty, &table);

        let address = self.b.alloc_value(deque_ty);
        self.b
            .set_field(address, deque_ty, "m_pChunks", table_address)
            .set_field(address, deque_ty, "m_uiChunks", chunks)
            .set_field(address, deque_ty, "m_uiFirstElement", first)
            .set_field(address, deque_ty, "m_uiCount", values.len() as u64);
        ValueHandle::at(address, deque_ty)
    }

    // ------------------------------------------------------------------------
    // Associative containers
    // ------------------------------------------------------------------------

    /// `ezHashSet<ezUInt32>` with the given `(slot, key)` entries occupied
    pub fn hash_set(&mut self, capacity: u64, entries: &[(u64, u64)]) -> ValueHandle {
        let (u32, allocator) = (self.u32, self.allocator);
        let entry_ty = self
            .b
            .structure("ezHashSetBase<ezUInt32>::Entry")
            .field("key", u32)
            .finish();
        let entry_ptr = self.b.pointer(entry_ty);
        let flags_ptr = self.b.pointer(u32);
        let set_ty = self
            .b
            .structure("ezHashSet<ezUInt32>")
            .field("m_pEntries", entry_ptr)
            .field("m_pEntryFlags", flags_ptr)
            .field("m_uiCount", u32)
            .field("m_uiCapacity", u32)
            .field("m_pAllocator", allocator)
            .template_arg(u32)
            .finish();

        let entry_size = self.b.size_of(entry_ty);
        let table = self.b.alloc(entry_size * capacity.max(1), 8);
        let mut words = vec![0u64; capacity.div_ceil(16).max(1) as usize];
        for (slot, key) in entries {
            self.b.write_uint(table + slot * entry_size, 4, *key);
            words[(slot / 16) as usize] |= 1 << (2 * (slot % 16));
        }
        let flags = self.alloc_elements(u32, &words);

        let address = self.b.alloc_value(set_ty);
        self.b
            .set_field(address, set_ty, "m_pEntries", table)
            .set_field(address, set_ty, "m_pEntryFlags", flags)
            .set_field(address, set_ty, "m_uiCount", entries.len() as u64)
            .set_field(address, set_ty, "m_uiCapacity", capacity);
        ValueHandle::at(address, set_ty)
    }

    /// `ezMap<ezUInt32, ezUInt32>` as a balanced tree over `pairs` (sorted by key)
    pub fn map(&mut self, pairs: &[(u64, u64)]) -> ValueHandle {
        let u32 = self.u32;
        let node_name = "ezMapBase<ezUInt32,ezUInt32>::Node";
        let node_decl = self.b.declare(node_name);
        let node_ptr = self.b.pointer(node_decl);
        let links = self.b.array(node_ptr, 2);
        let node_ty = self
            .b
            .structure(node_name)
            .field("m_pParent", node_ptr)
            .field("m_pLink", links)
            .field("m_uiLevel", u32)
            .field("m_Key", u32)
            .field("m_Value", u32)
            .finish();
        let map_ty = self
            .b
            .structure("ezMap<ezUInt32,ezUInt32>")
            .field("m_pRoot", node_ptr)
            .field("m_NilNode", node_ty)
            .field("m_uiCount", u32)
            .template_arg(u32)
            .template_arg(u32)
            .finish();

        let address = self.b.alloc_value(map_ty);
        let nil = self.b.field_address(address, map_ty, "m_NilNode");
        let link_offset = self.b.field_address(0, node_ty, "m_pLink");
        self.b
            .set_field(nil, node_ty, "m_pParent", nil)
            .write_uint(nil + link_offset, 8, nil)
            .write_uint(nil + link_offset + 8, 8, nil);

        let nodes: Vec<Address> = pairs
            .iter()
            .map(|(key, value)| {
                let node = self.b.alloc_value(node_ty);
                self.b
                    .set_field(node, node_ty, "m_Key", *key)
                    .set_field(node, node_ty, "m_Value", *value);
                node
            })
            .collect();

        let root = self.link_subtree(&nodes, nil, nil, node_ty, link_offset);
        self.b
            .set_field(address, map_ty, "m_pRoot", root)
            .set_field(address, map_ty, "m_uiCount", pairs.len() as u64);
        ValueHandle::at(address, map_ty)
    }

    fn link_subtree(
        &mut self,
        nodes: &[Address],
        parent: Address,
        nil: Address,
        node_ty: TypeId,
        link_offset: u64,
    ) -> Address {
        if nodes.is_empty() {
            return nil;
        }
        let mid = nodes.len() / 2;
        let node = nodes[mid];
        let left = self.link_subtree(&nodes[..mid], node, nil, node_ty, link_offset);
        let right = self.link_subtree(&nodes[mid + 1..], node, nil, node_ty, link_offset);
        self.b
            .set_field(node, node_ty, "m_pParent", parent)
            .write_uint(node + link_offset, 8, left)
            .write_uint(node + link_offset + 8, 8, right);
        node
    }

    /// `ezList<int>` holding `values` in link order
    pub fn list(&mut self, values: &[u64]) -> ValueHandle {
        let (int, u32) = (self.int, self.u32);
        let node_name = "ezListBase<int>::ListElement";
        let node_decl = self.b.declare(node_name);
        let node_ptr = self.b.pointer(node_decl);
        let anchor_ty = self
            .b
            .structure("ezListBase<int>::ListElementBase")
            .field("m_pPrev", node_ptr)
            .field("m_pNext", node_ptr)
            .finish();
        let node_ty = self
            .b
            .structure(node_name)
            .base(anchor_ty)
            .field("m_Data", int)
            .finish();
        let list_ty = self
            .b
            .structure("ezList<int>")
            .field("m_First", anchor_ty)
            .field("m_Last", anchor_ty)
            .field("m_uiCount", u32)
            .template_arg(int)
            .finish();

        let address = self.b.alloc_value(list_ty);
        let first = self.b.field_address(address, list_ty, "m_First");
        let last = self.b.field_address(address, list_ty, "m_Last");

        let mut previous = first;
        for value in values {
            let node = self.b.alloc_value(node_ty);
            self.b
                .set_field(node, node_ty, "m_Data", *value)
                .set_field(node, node_ty, "m_pPrev", previous)
                .set_field(previous, anchor_ty, "m_pNext", node);
            previous = node;
        }
        self.b
            .set_field(previous, anchor_ty, "m_pNext", last)
            .set_field(last, anchor_ty, "m_pPrev", previous)
            .set_field(address, list_ty, "m_uiCount", values.len() as u64);
        ValueHandle::at(address, list_ty)
    }

    // ------------------------------------------------------------------------
    // Value types
    // ------------------------------------------------------------------------

    /// `ezEnum<name>` over an enum table `name::Enum`
    pub fn wrapped_enum(&mut self, name: &str, members: &[(&str, u64)], raw: u64) -> ValueHandle {
        let u8 = self.u8;
        self.b.enumeration(&format!("{}::Enum", name), 1, members);
        let tag = self.b.structure(name).field("m_uiDummy", u8).finish();
        let wrapper = self
            .b
            .structure(&format!("ezEnum<{}>", name))
            .field("m_Value", u8)
            .template_arg(tag)
            .finish();
        let address = self.b.alloc_value(wrapper);
        self.b.set_field(address, wrapper, "m_Value", raw);
        ValueHandle::at(address, wrapper)
    }

    /// `ezBitflags<name>` over an enum table `name::Enum`
    pub fn bitflags(&mut self, name: &str, members: &[(&str, u64)], raw: u64) -> ValueHandle {
        let (u8, u32) = (self.u8, self.u32);
        self.b.enumeration(&format!("{}::Enum", name), 4, members);
        let tag = self.b.structure(name).field("m_uiDummy", u8).finish();
        let storage = self
            .b
            .structure(&format!("ezBitflags<{}>::Storage", name))
            .field("m_Value", u32)
            .finish();
        let wrapper = self
            .b
            .structure(&format!("ezBitflags<{}>", name))
            .field("m_Storage", storage)
            .template_arg(tag)
            .finish();
        let address = self.b.alloc_value(wrapper);
        self.b.write_uint(address, 4, raw);
        ValueHandle::at(address, wrapper)
    }

    pub fn angle(&mut self, radians: f32) -> ValueHandle {
        let float = self.float;
        let angle_ty = self.b.structure("ezAngle").field("m_fRadian", float).finish();
        let address = self.b.alloc_value(angle_ty);
        self.b.write_f32(address, radians);
        ValueHandle::at(address, angle_ty)
    }

    pub fn uuid(&mut self, high: u64, low: u64) -> ValueHandle {
        let u64 = self.u64;
        let uuid_ty = self
            .b
            .structure("ezUuid")
            .field("m_uiHigh", u64)
            .field("m_uiLow", u64)
            .finish();
        let address = self.b.alloc_value(uuid_ty);
        self.b
            .set_field(address, uuid_ty, "m_uiHigh", high)
            .set_field(address, uuid_ty, "m_uiLow", low);
        ValueHandle::at(address, uuid_ty)
    }

    pub fn vector_type(&mut self, dimension: usize) -> TypeId {
        let float = self.float;
        let mut vector = self.b.structure(&format!("ezVec{}", dimension));
        for component in ["x", "y", "z", "w"].iter().take(dimension) {
            vector = vector.field(component, float);
        }
        vector.finish()
    }

    /// `ezMat3` / `ezMat4` with column-major `elements`
    pub fn matrix(&mut self, dimension: usize, elements: &[f32]) -> ValueHandle {
        self.vector_type(dimension);
        let float = self.float;
        let n = dimension as u64;
        let storage = self.b.array(float, n * n);
        let matrix_ty = self
            .b
            .structure(&format!("ezMat{}", dimension))
            .field("m_fElementsCM", storage)
            .finish();
        let address = self.b.alloc_value(matrix_ty);
        for (i, value) in elements.iter().enumerate() {
            self.b.write_f32(address + 4 * i as u64, *value);
        }
        ValueHandle::at(address, matrix_ty)
    }
}
