//! Display protocol
//!
//! The host asks, per visible value: update, how many children, child `i`, and
//! optionally a one-line summary. [`DisplayAdapter`] answers those questions for
//! one value and one update cycle, turning every provider error into a
//! placeholder so a fault never spreads past the child that caused it.

use serde::Serialize;

use crate::error::InspectError;
use crate::introspect::{TypeKind, ValueHandle};
use crate::providers::{Provider, ProviderContext, SyntheticProvider};

/// Summary shown when a summary could not be produced
pub const ERROR_PLACEHOLDER: &str = "<error>";
/// Shown in place of an unreadable child value
pub const UNKNOWN_PLACEHOLDER: &str = "?";
/// Summary of an empty string or container
pub const EMPTY_PLACEHOLDER: &str = "<empty>";
/// Summary of a null value
pub const NULL_PLACEHOLDER: &str = "nullptr";

/// Terminal or typed content of a display node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    /// A located value the host can render or expand further
    Typed(ValueHandle),
    /// Precomputed text
    Text(String),
    /// An intentionally empty value
    Null,
    /// The child could not be produced
    Unavailable,
}

/// One child as seen by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNode {
    pub name: String,
    pub index: usize,
    pub value: NodeValue,
}

impl DisplayNode {
    pub fn typed(name: impl Into<String>, index: usize, handle: ValueHandle) -> Self {
        Self {
            name: name.into(),
            index,
            value: NodeValue::Typed(handle),
        }
    }

    pub fn text(name: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index,
            value: NodeValue::Text(text.into()),
        }
    }

    pub fn null(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            value: NodeValue::Null,
        }
    }

    pub fn unavailable(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            value: NodeValue::Unavailable,
        }
    }

    /// Element node named `[i]`
    pub fn element(index: usize, logical: usize, handle: ValueHandle) -> Self {
        Self::typed(format!("[{}]", logical), index, handle)
    }

    pub fn handle(&self) -> Option<ValueHandle> {
        match self.value {
            NodeValue::Typed(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Fault-isolating front of one provider for one displayed value.
///
/// Built fresh for every update cycle; nothing is carried over between cycles.
pub struct DisplayAdapter<'a> {
    cx: ProviderContext<'a>,
    value: ValueHandle,
    provider: Provider,
    update_error: Option<InspectError>,
}

impl<'a> DisplayAdapter<'a> {
    /// Select the provider for `value` and run its update
    pub fn new(cx: ProviderContext<'a>, value: ValueHandle) -> Self {
        let provider = Provider::for_value(&cx, &value);
        let mut adapter = Self {
            cx,
            value,
            provider,
            update_error: None,
        };
        adapter.update();
        adapter
    }

    /// Re-synchronize the provider with the current memory contents
    pub fn update(&mut self) {
        self.update_error = match self.provider.update(&self.cx, self.value) {
            Ok(()) => None,
            Err(e) => {
                tracing::debug!("{}: update failed: {}", self.provider.name(), e);
                Some(e)
            }
        };
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn value(&self) -> ValueHandle {
        self.value
    }

    /// Error recorded by the last update, if any
    pub fn update_error(&self) -> Option<&InspectError> {
        self.update_error.as_ref()
    }

    /// Child count; zero when it cannot be determined
    pub fn child_count(&self) -> usize {
        if self.update_error.is_some() {
            return 0;
        }
        match self.provider.child_count(&self.cx) {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!("{}: child_count failed: {}", self.provider.name(), e);
                0
            }
        }
    }

    /// Child `index`; an unavailable node when it cannot be produced
    pub fn child(&mut self, index: usize) -> DisplayNode {
        if self.update_error.is_some() {
            return DisplayNode::unavailable(format!("[{}]", index), index);
        }
        match self.provider.child(&self.cx, index) {
            Ok(node) => node,
            Err(e) => {
                tracing::debug!("{}: child({}) failed: {}", self.provider.name(), index, e);
                DisplayNode::unavailable(format!("[{}]", index), index)
            }
        }
    }

    /// All children in order
    pub fn children(&mut self) -> Vec<DisplayNode> {
        (0..self.child_count()).map(|i| self.child(i)).collect()
    }

    /// One-line summary.
    ///
    /// Falls back to the host's rendering for primitive values; `None` when the
    /// value has neither a provider summary nor a primitive rendering.
    pub fn summary(&self) -> Option<String> {
        let provided = match &self.update_error {
            Some(e) => Err(e.clone()),
            None => self.provider.summary(&self.cx),
        };
        match provided {
            Ok(Some(text)) => Some(text),
            Ok(None) => self.scalar_text(),
            Err(e) => {
                tracing::debug!("{}: summary failed: {}", self.provider.name(), e);
                Some(ERROR_PLACEHOLDER.to_string())
            }
        }
    }

    fn scalar_text(&self) -> Option<String> {
        let mem = self.cx.mem;
        match mem.type_kind(self.value.ty) {
            Ok(TypeKind::Scalar(_) | TypeKind::Pointer | TypeKind::Enum) => {
                Some(match mem.scalar_text(&self.value) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!("scalar rendering failed: {}", e);
                        UNKNOWN_PLACEHOLDER.to_string()
                    }
                })
            }
            _ => None,
        }
    }
}

/// Serializable form of a display node, for printing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    /// Indented text rendering, one node per line
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out, 0);
        out
    }

    fn write_text(&self, out: &mut String, level: usize) {
        out.push_str(&"  ".repeat(level));
        out.push_str(&self.name);
        if let Some(type_name) = &self.type_name {
            out.push_str(&format!(" ({})", type_name));
        }
        if let Some(summary) = &self.summary {
            out.push_str(" = ");
            out.push_str(summary);
        }
        out.push('\n');
        for child in &self.children {
            child.write_text(out, level + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_text_layout() {
        let tree = RenderedNode {
            name: "names".to_string(),
            type_name: Some("ezDynamicArray<int>".to_string()),
            summary: None,
            children: vec![
                RenderedNode {
                    name: "m_uiCount".to_string(),
                    type_name: Some("ezUInt32".to_string()),
                    summary: Some("1".to_string()),
                    children: Vec::new(),
                },
                RenderedNode {
                    name: "[0]".to_string(),
                    type_name: None,
                    summary: Some(UNKNOWN_PLACEHOLDER.to_string()),
                    children: Vec::new(),
                },
            ],
        };

        assert_eq!(
            tree.to_text(),
            "names (ezDynamicArray<int>)\n  m_uiCount (ezUInt32) = 1\n  [0] = ?\n"
        );
    }

    #[test]
    fn test_rendered_json_omits_empty_parts() {
        let leaf = RenderedNode {
            name: "Type".to_string(),
            type_name: None,
            summary: Some("Float".to_string()),
            children: Vec::new(),
        };
        let json = serde_json::to_string(&leaf).unwrap();
        assert_eq!(json, r#"{"name":"Type","summary":"Float"}"#);
    }
}
