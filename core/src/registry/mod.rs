//! Formatter registry
//!
//! Maps displayed type names to the provider family that reconstructs them.
//! Bindings are consulted in registration order; the first match wins.


use std::fmt;

use crate::providers::ProviderKind;

/// Type-name pattern a provider is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePattern {
    /// The whole name, verbatim
    Exact(String),
    /// `base<...>` with at least one generic argument
    Template(String),
}

impl TypePattern {
    pub fn exact(name: impl Into<String>) -> Self {
        TypePattern::Exact(name.into())
    }

    pub fn template(base: impl Into<String>) -> Self {
        TypePattern::Template(base.into())
    }

    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            TypePattern::Exact(name) => type_name == name,
            TypePattern::Template(base) => type_name
                .strip_prefix(base.as_str())
                .and_then(|rest| rest.strip_prefix('<'))
                .and_then(|rest| rest.strip_suffix('>'))
                .is_some_and(|args| !args.is_empty()),
        }
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePattern::Exact(name) => write!(f, "{}", name),
            TypePattern::Template(base) => write!(f, "{}<...>", base),
        }
    }
}

/// One pattern bound to one provider family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub pattern: TypePattern,
    pub kind: ProviderKind,
}

/// Ordered pattern-to-provider bindings
#[derive(Debug, Clone, Default)]
pub struct FormatterRegistry {
    bindings: Vec<Binding>,
}

impl FormatterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering the engine's strings, containers and value types
    pub fn with_defaults() -> Self {
        use ProviderKind as K;
        use TypePattern as P;

        let mut registry = Self::new();
        registry
            // Strings
            .bind(P::template("ezHybridString"), K::HybridString)
            .bind(P::exact("ezStringBuilder"), K::HybridString)
            .bind(P::exact("ezStringView"), K::StringView)
            .bind(P::exact("ezHashedString"), K::HashedString)
            .bind(P::exact("ezStringIterator"), K::StringIterator)
            .bind(P::exact("ezStringReverseIterator"), K::StringIterator)
            // Containers
            .bind(P::template("ezDynamicArray"), K::DynamicArray)
            .bind(P::template("ezHybridArray"), K::DynamicArray)
            .bind(P::template("ezSmallArray"), K::SmallArray)
            .bind(P::template("ezStaticArray"), K::StaticArray)
            .bind(P::template("ezStaticRingBuffer"), K::StaticRingBuffer)
            .bind(P::template("ezArrayPtr"), K::ArrayPtr)
            .bind(P::exact("ezByteArrayPtr"), K::ArrayPtr)
            .bind(P::exact("ezConstByteArrayPtr"), K::ArrayPtr)
            .bind(P::template("ezHashTable"), K::HashTable)
            .bind(P::template("ezHashSet"), K::HashTable)
            .bind(P::template("ezMap"), K::OrderedMap)
            .bind(P::template("ezSet"), K::OrderedMap)
            .bind(P::template("ezList"), K::List)
            .bind(P::template("ezDeque"), K::Deque)
            // Value types
            .bind(P::template("ezEnum"), K::Enum)
            .bind(P::template("ezBitflags"), K::Bitflags)
            .bind(P::exact("ezAngle"), K::Angle)
            .bind(P::exact("ezUuid"), K::Uuid)
            .bind(P::exact("ezMat3"), K::Mat3)
            .bind(P::exact("ezMat4"), K::Mat4)
            .bind(P::exact("ezVariant"), K::Variant);
        registry
    }

    /// Append a binding; earlier bindings take precedence
    pub fn bind(&mut self, pattern: TypePattern, kind: ProviderKind) -> &mut Self {
        self.bindings.push(Binding { pattern, kind });
        self
    }

    /// Provider family for a type name, if any pattern matches
    pub fn lookup(&self, type_name: &str) -> Option<ProviderKind> {
        self.bindings
            .iter()
            .find(|binding| binding.pattern.matches(type_name))
            .map(|binding| binding.kind)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
