//! Sequence containers
//!
//! All array-like containers share one provider: leading bookkeeping members,
//! then at most `max_display_elements` elements projected by
//! [`SequenceView`]. The layouts differ only in where the elements live.

use crate::decode::{ElementSource, SequenceView, StorageDescriptor, chunk_size};
use crate::display::DisplayNode;
use crate::error::{InspectError, Result};
use crate::introspect::{MemoryIntrospection, TypeId, ValueHandle};

use super::{LeadingFields, ProviderContext, ProviderKind, SyntheticProvider, updated};

/// Storage layout of a sequence container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLayout {
    /// Heap buffer behind `m_pElements` (`ezDynamicArray`, `ezHybridArray`)
    Dynamic,
    /// Inline buffer until the capacity outgrows it (`ezSmallArray`)
    Small,
    /// Fixed inline buffer (`ezStaticArray`)
    Static,
    /// Fixed inline buffer used as a ring (`ezStaticRingBuffer`)
    Ring,
    /// Borrowed `(pointer, count)` range (`ezArrayPtr`)
    Pointer,
    /// Chunk table with a moving start (`ezDeque`)
    Deque,
}

impl ArrayLayout {
    pub fn kind(self) -> ProviderKind {
        match self {
            ArrayLayout::Dynamic => ProviderKind::DynamicArray,
            ArrayLayout::Small => ProviderKind::SmallArray,
            ArrayLayout::Static => ProviderKind::StaticArray,
            ArrayLayout::Ring => ProviderKind::StaticRingBuffer,
            ArrayLayout::Pointer => ProviderKind::ArrayPtr,
            ArrayLayout::Deque => ProviderKind::Deque,
        }
    }

    /// Bookkeeping members shown before the elements
    pub fn leading_fields(self) -> &'static [&'static str] {
        match self {
            ArrayLayout::Dynamic => &["m_uiCount", "m_uiCapacity", "m_pAllocator"],
            ArrayLayout::Small => &["m_uiCount", "m_uiCapacity", "m_uiUserData"],
            ArrayLayout::Static => &["m_uiCount", "m_uiCapacity"],
            ArrayLayout::Ring => &["m_uiCount", "m_uiFirstElement"],
            ArrayLayout::Pointer => &["m_uiCount"],
            ArrayLayout::Deque => &["m_uiCount", "m_pAllocator"],
        }
    }
}

#[derive(Debug, Clone)]
struct ArrayState {
    fields: LeadingFields,
    view: SequenceView,
}

#[derive(Debug)]
pub struct ArrayProvider {
    layout: ArrayLayout,
    state: Option<ArrayState>,
}

impl ArrayProvider {
    pub fn new(layout: ArrayLayout) -> Self {
        Self {
            layout,
            state: None,
        }
    }

    pub fn layout(&self) -> ArrayLayout {
        self.layout
    }

    /// Elements needed to fill an inline buffer member
    fn inline_capacity(
        mem: &dyn MemoryIntrospection,
        buffer: &ValueHandle,
        element_size: u64,
    ) -> Result<u64> {
        Ok(mem.byte_size(buffer.ty)?.checked_div(element_size).unwrap_or(0))
    }

    fn element_source(
        &self,
        cx: &ProviderContext<'_>,
        value: &ValueHandle,
        count: u64,
    ) -> Result<(TypeId, u64, ElementSource)> {
        let mem = cx.mem;
        match self.layout {
            ArrayLayout::Dynamic => {
                let elements = mem.field(value, "m_pElements")?;
                let element = mem.pointee_type(elements.ty)?;
                let base = mem.element_base(&elements)?;
                Ok((element, mem.byte_size(element)?, ElementSource::Contiguous { base }))
            }
            ArrayLayout::Small => {
                let element = mem.template_argument(value.ty, 0)?;
                let element_size = mem.byte_size(element)?;
                // base class, then the storage union: inline buffer | heap pointer
                let storage = mem.index(&mem.index(value, 0)?, 3)?;
                let inline = mem.index(&mem.index(&storage, 0)?, 0)?;
                let capacity = mem.as_unsigned(&mem.field(value, "m_uiCapacity")?, 0);
                let inline_capacity = Self::inline_capacity(mem, &inline, element_size)?;

                let descriptor = StorageDescriptor::for_small_array(count, capacity, inline_capacity);
                let base = descriptor.base(inline.address()?, || {
                    mem.pointer_value(&mem.index(&storage, 1)?)
                })?;
                Ok((element, element_size, ElementSource::Contiguous { base }))
            }
            ArrayLayout::Static => {
                let element = mem.template_argument(value.ty, 0)?;
                let data = mem.index(&mem.index(value, 1)?, 0)?;
                let base = data.address()?;
                Ok((element, mem.byte_size(element)?, ElementSource::Contiguous { base }))
            }
            ArrayLayout::Ring => {
                let element = mem.template_argument(value.ty, 0)?;
                let element_size = mem.byte_size(element)?;
                let inline = mem.index(&mem.index(value, 0)?, 0)?;
                let source = ElementSource::Ring {
                    base: mem.element_base(&mem.field(value, "m_pElements")?)?,
                    first: mem.as_unsigned(&mem.field(value, "m_uiFirstElement")?, 0),
                    capacity: Self::inline_capacity(mem, &inline, element_size)?,
                };
                Ok((element, element_size, source))
            }
            ArrayLayout::Pointer => {
                let pointer = mem.field(value, "m_pPtr")?;
                // byte views are not templated; fall back to the pointee
                let element = match mem.template_argument(value.ty, 0) {
                    Ok(element) => element,
                    Err(_) => mem.pointee_type(pointer.ty)?,
                };
                let base = mem.pointer_value(&pointer)?;
                Ok((element, mem.byte_size(element)?, ElementSource::Contiguous { base }))
            }
            ArrayLayout::Deque => {
                let element = mem.template_argument(value.ty, 0)?;
                let element_size = mem.byte_size(element)?;
                let chunks = mem.field(value, "m_pChunks")?;
                let source = ElementSource::Chunked {
                    chunk_table: mem.pointer_value(&chunks)?,
                    first: mem.as_unsigned(&mem.field(value, "m_uiFirstElement")?, 0),
                    chunk_size: chunk_size(
                        element_size,
                        cx.limits.deque_page_size,
                        cx.limits.deque_min_chunk_elements,
                    ),
                    pointer_size: mem.byte_size(mem.pointee_type(chunks.ty)?)?,
                };
                Ok((element, element_size, source))
            }
        }
    }
}

impl SyntheticProvider for ArrayProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let fields = LeadingFields::locate(cx.mem, &value, self.layout.leading_fields())?;
        let count = cx.mem.as_unsigned(&fields.get("m_uiCount")?, 0);

        let (element, element_size, source) = self.element_source(cx, &value, count)?;
        let view = SequenceView::new(
            element,
            element_size,
            count,
            cx.limits.max_display_elements,
            source,
        );
        self.state = Some(ArrayState { fields, view });
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        let state = updated(&self.state)?;
        Ok(state.fields.len() + state.view.len())
    }

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        if let Some(node) = state.fields.node(index) {
            return Ok(node);
        }
        let logical = index - state.fields.len();
        if logical >= state.view.len() {
            return Err(InspectError::IndexOutOfRange {
                index,
                len: state.fields.len() + state.view.len(),
            });
        }
        let element = state.view.element_at(cx.mem, logical)?;
        Ok(DisplayNode::element(index, logical, element))
    }
}
