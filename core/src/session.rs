//! Inspection sessions
//!
//! An [`InspectSession`] binds one memory host to a formatter registry and a set
//! of limits. Every call starts a fresh update cycle; nothing read from memory
//! outlives the call that read it.

use crate::config::Limits;
use crate::display::{DisplayAdapter, NULL_PLACEHOLDER, NodeValue, RenderedNode, UNKNOWN_PLACEHOLDER};
use crate::introspect::{MemoryIntrospection, ValueHandle};
use crate::providers::ProviderContext;
use crate::registry::FormatterRegistry;

pub struct InspectSession<'m> {
    mem: &'m dyn MemoryIntrospection,
    registry: FormatterRegistry,
    limits: Limits,
}

impl<'m> InspectSession<'m> {
    pub fn new(mem: &'m dyn MemoryIntrospection, registry: FormatterRegistry, limits: Limits) -> Self {
        Self {
            mem,
            registry,
            limits,
        }
    }

    /// Session over the default registry and limits
    pub fn with_defaults(mem: &'m dyn MemoryIntrospection) -> Self {
        Self::new(mem, FormatterRegistry::with_defaults(), Limits::default())
    }

    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    fn context(&self) -> ProviderContext<'_> {
        ProviderContext::new(self.mem, &self.registry, &self.limits)
    }

    /// Run an update cycle for `value` and hand back its display adapter
    pub fn inspect(&self, value: ValueHandle) -> DisplayAdapter<'_> {
        self.context().adapter(value)
    }

    /// Provider summary, or the host's rendering of a primitive value
    pub fn summarize(&self, value: ValueHandle) -> Option<String> {
        self.inspect(value).summary()
    }

    /// Expand `value` into a printable tree, `depth` levels below the root
    pub fn render_tree(&self, name: &str, value: ValueHandle, depth: usize) -> RenderedNode {
        let mut adapter = self.inspect(value);
        let children = if depth == 0 {
            Vec::new()
        } else {
            adapter
                .children()
                .into_iter()
                .map(|node| match node.value {
                    NodeValue::Typed(handle) => self.render_tree(&node.name, handle, depth - 1),
                    NodeValue::Text(text) => Self::leaf(node.name, text),
                    NodeValue::Null => Self::leaf(node.name, NULL_PLACEHOLDER.to_string()),
                    NodeValue::Unavailable => Self::leaf(node.name, UNKNOWN_PLACEHOLDER.to_string()),
                })
                .collect()
        };

        RenderedNode {
            name: name.to_string(),
            type_name: self.mem.type_name(value.ty).ok(),
            summary: adapter.summary(),
            children,
        }
    }

    fn leaf(name: String, summary: String) -> RenderedNode {
        RenderedNode {
            name,
            type_name: None,
            summary: Some(summary),
            children: Vec::new(),
        }
    }
}
