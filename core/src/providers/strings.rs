//! String providers: hybrid strings, string views, hashed strings and iterators

use crate::decode::StorageDescriptor;
use crate::display::{DisplayNode, EMPTY_PLACEHOLDER};
use crate::error::{InspectError, Result};
use crate::introspect::{Address, MemoryIntrospection, ValueHandle};

use super::{LeadingFields, ProviderContext, StructuralProvider, SyntheticProvider, updated};

/// Text of captured string bytes: one trailing NUL dropped, invalid UTF-8 replaced
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(&[0u8]).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text)
}

/// Unquoted contents of a string view, at most `max_bytes` long
pub fn string_view_text(
    mem: &dyn MemoryIntrospection,
    view: &ValueHandle,
    max_bytes: usize,
) -> Result<String> {
    let start = mem.pointer_value(&mem.field(view, "m_pStart")?)?;
    let count = mem.as_unsigned(&mem.field(view, "m_uiElementCount")?, 0);
    if start == 0 || count == 0 {
        return Err(InspectError::InvalidAddress);
    }
    let len = count.min(max_bytes as u64) as usize;
    Ok(decode_text(&mem.read_memory(start, len)?))
}

#[derive(Debug, Clone)]
struct HybridStringState {
    fields: LeadingFields,
    contents: ValueHandle,
    count: u64,
}

/// Small-buffer-optimized string (`ezHybridString<N>`, `ezStringBuilder`).
///
/// Children: `contents` (the live characters), `m_uiCount`, `m_pAllocator`.
#[derive(Debug, Default)]
pub struct HybridStringProvider {
    state: Option<HybridStringState>,
}

impl SyntheticProvider for HybridStringProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let data = mem.field(&value, "m_Data")?;
        let elements = mem.field(&data, "m_pElements")?;
        let inline = mem.index(&mem.index(&data, 1)?, 0)?;
        let fields = LeadingFields::locate(mem, &data, &["m_uiCount", "m_pAllocator"])?;

        let char_type = mem.pointee_type(elements.ty)?;
        let char_size = mem.byte_size(char_type)?.max(1);
        let inline_capacity = mem.byte_size(inline.ty)? / char_size;
        let capacity = mem.as_unsigned(&mem.field(&data, "m_uiCapacity")?, 0);

        let mut count = mem.as_unsigned(&fields.get("m_uiCount")?, 0);
        if count > cx.limits.max_string_count {
            tracing::warn!("string count {:#x} looks uninitialized; showing it as empty", count);
            count = 0;
        }

        let storage = StorageDescriptor::for_string(count, capacity, inline_capacity);
        let base = storage.base(inline.address()?, || mem.pointer_value(&elements))?;
        let contents = mem.array_of(&ValueHandle::at(base, char_type), char_type, count)?;

        self.state = Some(HybridStringState {
            fields,
            contents,
            count,
        });
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        Ok(1 + updated(&self.state)?.fields.len())
    }

    fn child(&mut self, _cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        if index == 0 {
            return Ok(DisplayNode::typed("contents", 0, state.contents));
        }
        state
            .fields
            .node(index - 1)
            .map(|node| DisplayNode { index, ..node })
            .ok_or(InspectError::IndexOutOfRange {
                index,
                len: 1 + state.fields.len(),
            })
    }

    fn summary(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        let state = updated(&self.state)?;
        if state.count == 0 {
            return Ok(Some(EMPTY_PLACEHOLDER.to_string()));
        }
        let len = state.count.min(cx.limits.max_summary_bytes as u64) as usize;
        let bytes = cx.mem.read_bytes(&state.contents, len)?;
        Ok(Some(quoted(&decode_text(&bytes))))
    }
}

/// Non-owning `(start, count)` string view
#[derive(Debug, Default)]
pub struct StringViewProvider {
    // `None` inside: the view is empty (null start or zero count)
    state: Option<Option<ValueHandle>>,
}

impl SyntheticProvider for StringViewProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let start = mem.field(&value, "m_pStart")?;
        let count = mem.as_unsigned(&mem.field(&value, "m_uiElementCount")?, 0);
        let address = mem.as_unsigned(&start, 0);

        let contents = if address == 0 || count == 0 {
            None
        } else {
            let char_type = mem.pointee_type(start.ty)?;
            let shown = cx.limits.display_len(count) as u64;
            Some(mem.array_of(&ValueHandle::at(address, char_type), char_type, shown)?)
        };
        self.state = Some(contents);
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        updated(&self.state)?;
        Ok(1)
    }

    fn child(&mut self, _cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        match updated(&self.state)? {
            _ if index > 0 => Err(InspectError::IndexOutOfRange { index, len: 1 }),
            Some(contents) => Ok(DisplayNode::typed("contents", 0, *contents)),
            None => Ok(DisplayNode::null("contents", 0)),
        }
    }

    fn summary(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        let Some(contents) = updated(&self.state)? else {
            return Ok(Some(EMPTY_PLACEHOLDER.to_string()));
        };
        let len = cx.mem.byte_size(contents.ty)? as usize;
        let bytes = cx.mem.read_bytes(contents, len)?;
        Ok(Some(quoted(&decode_text(&bytes))))
    }
}

#[derive(Debug, Clone, Copy)]
struct HashedStringState {
    string: ValueHandle,
    key: ValueHandle,
}

/// Interned string: children are the pooled string and its hash
#[derive(Debug, Default)]
pub struct HashedStringProvider {
    state: Option<HashedStringState>,
}

impl SyntheticProvider for HashedStringProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let data = mem.field(&value, "m_Data")?;
        let element = mem.deref(&mem.field(&data, "m_pElement")?)?;
        let key = mem.field(&element, "m_Key")?;
        let string = mem.field(&mem.field(&element, "m_Value")?, "m_sString")?;

        self.state = Some(HashedStringState { string, key });
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        updated(&self.state)?;
        Ok(2)
    }

    fn child(&mut self, _cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        match index {
            0 => Ok(DisplayNode::typed("m_sString", 0, state.string)),
            1 => Ok(DisplayNode::typed("m_Key", 1, state.key)),
            _ => Err(InspectError::IndexOutOfRange { index, len: 2 }),
        }
    }

    fn summary(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        cx.summarize(&updated(&self.state)?.string)
    }
}

/// UTF-8 iterator: summary shows the character under the cursor.
///
/// Children are the iterator's own members.
#[derive(Debug, Default)]
pub struct StringIteratorProvider {
    cursor: Option<(Address, Address)>,
    members: StructuralProvider,
}

impl SyntheticProvider for StringIteratorProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.cursor = None;
        self.members.update(cx, value)?;

        let current = cx.mem.as_unsigned(&cx.mem.field(&value, "m_pCurPtr")?, 0);
        let end = cx.mem.as_unsigned(&cx.mem.field(&value, "m_pEndPtr")?, 0);
        self.cursor = Some((current, end));
        Ok(())
    }

    fn child_count(&self, cx: &ProviderContext<'_>) -> Result<usize> {
        self.members.child_count(cx)
    }

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        self.members.child(cx, index)
    }

    fn summary(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        let (current, end) = *updated(&self.cursor)?;
        let available = end.saturating_sub(current).min(4) as usize;
        if available == 0 {
            return Ok(Some(EMPTY_PLACEHOLDER.to_string()));
        }

        let bytes = cx.mem.read_memory(current, available)?;
        // one character: stop at the next lead byte
        let len = (1..bytes.len())
            .find(|i| bytes[*i] & 0xC0 != 0x80)
            .unwrap_or(bytes.len());
        let text = String::from_utf8_lossy(&bytes[..len]);
        match text.chars().next() {
            Some(c) => Ok(Some(format!("'{}'", c))),
            None => Ok(Some(EMPTY_PLACEHOLDER.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_strips_one_trailing_nul() {
        assert_eq!(decode_text(b"abc\0"), "abc");
        assert_eq!(decode_text(b"abc"), "abc");
        assert_eq!(decode_text(b"a\0\0"), "a\0");
        assert_eq!(decode_text(&[0x66, 0xff, 0x6f]), "f\u{fffd}o");
    }
}
