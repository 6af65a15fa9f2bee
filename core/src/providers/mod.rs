//! Synthetic child providers
//!
//! One provider per recognized container or value type. Providers cache handles
//! during [`SyntheticProvider::update`] and answer count/child/summary queries
//! from that cache. Dispatch is static through the closed [`Provider`] enum.

mod arrays;
mod basic;
mod enums;
mod hash_table;
mod list;
mod map;
mod strings;
mod variant;

pub use arrays::{ArrayLayout, ArrayProvider};
pub use basic::{AngleProvider, MatrixProvider, StructuralProvider, UuidProvider};
pub use enums::{BitflagsProvider, EnumProvider};
pub use hash_table::HashTableProvider;
pub use list::ListProvider;
pub use map::{NodeLinks, OrderedMapProvider};
pub use strings::{
    HashedStringProvider, HybridStringProvider, StringIteratorProvider, StringViewProvider,
    decode_text, string_view_text,
};
pub use variant::VariantProvider;

use smallvec::SmallVec;

use crate::config::Limits;
use crate::display::{DisplayAdapter, DisplayNode};
use crate::error::{InspectError, Result};
use crate::introspect::{MemoryIntrospection, ValueHandle};
use crate::registry::FormatterRegistry;

/// Summaries embedding other summaries stop after this many levels
pub const MAX_SUMMARY_NESTING: usize = 8;

/// Everything a provider may consult while answering a query
#[derive(Clone, Copy)]
pub struct ProviderContext<'a> {
    pub mem: &'a dyn MemoryIntrospection,
    pub registry: &'a FormatterRegistry,
    pub limits: &'a Limits,
    depth: usize,
}

impl<'a> ProviderContext<'a> {
    pub fn new(
        mem: &'a dyn MemoryIntrospection,
        registry: &'a FormatterRegistry,
        limits: &'a Limits,
    ) -> Self {
        Self {
            mem,
            registry,
            limits,
            depth: 0,
        }
    }

    /// Summary nesting level of this context
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn nested(&self) -> Result<Self> {
        if self.depth >= MAX_SUMMARY_NESTING {
            return Err(InspectError::NestingTooDeep(MAX_SUMMARY_NESTING));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..*self
        })
    }

    /// Fresh update cycle for `value`
    pub fn adapter(&self, value: ValueHandle) -> DisplayAdapter<'a> {
        DisplayAdapter::new(*self, value)
    }

    /// Summary of a value embedded in another value's summary
    pub fn summarize(&self, value: &ValueHandle) -> Result<Option<String>> {
        Ok(self.nested()?.adapter(*value).summary())
    }
}

/// The per-value contract between the display protocol and a provider.
///
/// Every query runs after a successful `update` of the same cycle; providers
/// return [`InspectError::NotUpdated`] otherwise.
pub trait SyntheticProvider {
    /// Locate and cache the handles later queries need
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()>;

    fn child_count(&self, cx: &ProviderContext<'_>) -> Result<usize>;

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode>;

    /// One-line summary; `None` when the provider has none
    fn summary(&self, _cx: &ProviderContext<'_>) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Provider families the registry can bind type patterns to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    HybridString,
    StringView,
    HashedString,
    StringIterator,
    DynamicArray,
    SmallArray,
    StaticArray,
    StaticRingBuffer,
    ArrayPtr,
    Deque,
    HashTable,
    OrderedMap,
    List,
    Enum,
    Bitflags,
    Variant,
    Angle,
    Uuid,
    Mat3,
    Mat4,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::HybridString => "hybrid-string",
            ProviderKind::StringView => "string-view",
            ProviderKind::HashedString => "hashed-string",
            ProviderKind::StringIterator => "string-iterator",
            ProviderKind::DynamicArray => "dynamic-array",
            ProviderKind::SmallArray => "small-array",
            ProviderKind::StaticArray => "static-array",
            ProviderKind::StaticRingBuffer => "static-ring-buffer",
            ProviderKind::ArrayPtr => "array-ptr",
            ProviderKind::Deque => "deque",
            ProviderKind::HashTable => "hash-table",
            ProviderKind::OrderedMap => "ordered-map",
            ProviderKind::List => "list",
            ProviderKind::Enum => "enum",
            ProviderKind::Bitflags => "bitflags",
            ProviderKind::Variant => "variant",
            ProviderKind::Angle => "angle",
            ProviderKind::Uuid => "uuid",
            ProviderKind::Mat3 => "mat3",
            ProviderKind::Mat4 => "mat4",
        }
    }

    /// A provider of this kind in its pre-update state
    pub fn instantiate(self) -> Provider {
        match self {
            ProviderKind::HybridString => Provider::HybridString(HybridStringProvider::default()),
            ProviderKind::StringView => Provider::StringView(StringViewProvider::default()),
            ProviderKind::HashedString => Provider::HashedString(HashedStringProvider::default()),
            ProviderKind::StringIterator => {
                Provider::StringIterator(StringIteratorProvider::default())
            }
            ProviderKind::DynamicArray => Provider::Array(ArrayProvider::new(ArrayLayout::Dynamic)),
            ProviderKind::SmallArray => Provider::Array(ArrayProvider::new(ArrayLayout::Small)),
            ProviderKind::StaticArray => Provider::Array(ArrayProvider::new(ArrayLayout::Static)),
            ProviderKind::StaticRingBuffer => Provider::Array(ArrayProvider::new(ArrayLayout::Ring)),
            ProviderKind::ArrayPtr => Provider::Array(ArrayProvider::new(ArrayLayout::Pointer)),
            ProviderKind::Deque => Provider::Array(ArrayProvider::new(ArrayLayout::Deque)),
            ProviderKind::HashTable => Provider::HashTable(HashTableProvider::default()),
            ProviderKind::OrderedMap => Provider::OrderedMap(OrderedMapProvider::default()),
            ProviderKind::List => Provider::List(ListProvider::default()),
            ProviderKind::Enum => Provider::Enum(EnumProvider::default()),
            ProviderKind::Bitflags => Provider::Bitflags(BitflagsProvider::default()),
            ProviderKind::Variant => Provider::Variant(VariantProvider::default()),
            ProviderKind::Angle => Provider::Angle(AngleProvider::default()),
            ProviderKind::Uuid => Provider::Uuid(UuidProvider::default()),
            ProviderKind::Mat3 => Provider::Matrix(MatrixProvider::new(3)),
            ProviderKind::Mat4 => Provider::Matrix(MatrixProvider::new(4)),
        }
    }
}

/// Closed set of providers
#[derive(Debug)]
pub enum Provider {
    HybridString(HybridStringProvider),
    StringView(StringViewProvider),
    HashedString(HashedStringProvider),
    StringIterator(StringIteratorProvider),
    Array(ArrayProvider),
    HashTable(HashTableProvider),
    OrderedMap(OrderedMapProvider),
    List(ListProvider),
    Enum(EnumProvider),
    Bitflags(BitflagsProvider),
    Variant(VariantProvider),
    Angle(AngleProvider),
    Uuid(UuidProvider),
    Matrix(MatrixProvider),
    /// Plain members of a type no pattern matched
    Structural(StructuralProvider),
}

macro_rules! dispatch {
    ($provider:expr, $p:ident => $body:expr) => {
        match $provider {
            Provider::HybridString($p) => $body,
            Provider::StringView($p) => $body,
            Provider::HashedString($p) => $body,
            Provider::StringIterator($p) => $body,
            Provider::Array($p) => $body,
            Provider::HashTable($p) => $body,
            Provider::OrderedMap($p) => $body,
            Provider::List($p) => $body,
            Provider::Enum($p) => $body,
            Provider::Bitflags($p) => $body,
            Provider::Variant($p) => $body,
            Provider::Angle($p) => $body,
            Provider::Uuid($p) => $body,
            Provider::Matrix($p) => $body,
            Provider::Structural($p) => $body,
        }
    };
}

impl Provider {
    /// Provider bound to the type of `value`, or the structural fallback
    pub fn for_value(cx: &ProviderContext<'_>, value: &ValueHandle) -> Self {
        let kind = cx
            .mem
            .type_name(value.ty)
            .ok()
            .and_then(|name| cx.registry.lookup(&name));
        match kind {
            Some(kind) => kind.instantiate(),
            None => Provider::Structural(StructuralProvider::default()),
        }
    }

    /// Name used in log messages
    pub fn name(&self) -> &'static str {
        match self {
            Provider::HybridString(_) => ProviderKind::HybridString.name(),
            Provider::StringView(_) => ProviderKind::StringView.name(),
            Provider::HashedString(_) => ProviderKind::HashedString.name(),
            Provider::StringIterator(_) => ProviderKind::StringIterator.name(),
            Provider::Array(p) => p.layout().kind().name(),
            Provider::HashTable(_) => ProviderKind::HashTable.name(),
            Provider::OrderedMap(_) => ProviderKind::OrderedMap.name(),
            Provider::List(_) => ProviderKind::List.name(),
            Provider::Enum(_) => ProviderKind::Enum.name(),
            Provider::Bitflags(_) => ProviderKind::Bitflags.name(),
            Provider::Variant(_) => ProviderKind::Variant.name(),
            Provider::Angle(_) => ProviderKind::Angle.name(),
            Provider::Uuid(_) => ProviderKind::Uuid.name(),
            Provider::Matrix(p) => p.kind().name(),
            Provider::Structural(_) => "structural",
        }
    }
}

impl SyntheticProvider for Provider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        dispatch!(self, p => p.update(cx, value))
    }

    fn child_count(&self, cx: &ProviderContext<'_>) -> Result<usize> {
        dispatch!(self, p => p.child_count(cx))
    }

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        dispatch!(self, p => p.child(cx, index))
    }

    fn summary(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        dispatch!(self, p => p.summary(cx))
    }
}

/// Cached state of a provider, present after a successful update
pub(crate) fn updated<S>(state: &Option<S>) -> Result<&S> {
    state.as_ref().ok_or(InspectError::NotUpdated)
}

pub(crate) fn updated_mut<S>(state: &mut Option<S>) -> Result<&mut S> {
    state.as_mut().ok_or(InspectError::NotUpdated)
}

/// Bookkeeping members shown ahead of a container's elements
#[derive(Debug, Clone, Default)]
pub struct LeadingFields {
    fields: SmallVec<[(&'static str, ValueHandle); 3]>,
}

impl LeadingFields {
    /// Locate each named member of `value`
    pub fn locate(
        mem: &dyn MemoryIntrospection,
        value: &ValueHandle,
        names: &[&'static str],
    ) -> Result<Self> {
        let fields = names
            .iter()
            .map(|name| Ok((*name, mem.field(value, name)?)))
            .collect::<Result<_>>()?;
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Node for leading child `index`, if `index` is a leading child
    pub fn node(&self, index: usize) -> Option<DisplayNode> {
        self.fields
            .get(index)
            .map(|(name, handle)| DisplayNode::typed(*name, index, *handle))
    }

    pub fn get(&self, name: &str) -> Result<ValueHandle> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, handle)| *handle)
            .ok_or_else(|| InspectError::UnavailableField(name.to_string()))
    }
}
