//! `ezEnum<T>` and `ezBitflags<T>` wrappers

use crate::decode::{render_bitflags, render_enum, wrapped_enum_members};
use crate::display::DisplayNode;
use crate::error::{InspectError, Result};
use crate::introspect::{EnumMember, ValueHandle};

use super::{ProviderContext, SyntheticProvider, updated};

fn member_table(cx: &ProviderContext<'_>, wrapper: &ValueHandle) -> Vec<EnumMember> {
    wrapped_enum_members(cx.mem, wrapper.ty).unwrap_or_else(|e| {
        tracing::debug!("no member table for enum wrapper: {}", e);
        Vec::new()
    })
}

/// Single `Value` child holding the symbolic rendering
#[derive(Debug, Default)]
pub struct EnumProvider {
    text: Option<String>,
}

impl SyntheticProvider for EnumProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.text = None;
        let raw = cx.mem.as_unsigned(&cx.mem.field(&value, "m_Value")?, 0);
        self.text = Some(render_enum(raw, &member_table(cx, &value)));
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        updated(&self.text)?;
        Ok(1)
    }

    fn child(&mut self, _cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let text = updated(&self.text)?;
        match index {
            0 => Ok(DisplayNode::text("Value", 0, text.clone())),
            _ => Err(InspectError::IndexOutOfRange { index, len: 1 }),
        }
    }

    fn summary(&self, _cx: &ProviderContext<'_>) -> Result<Option<String>> {
        Ok(Some(updated(&self.text)?.clone()))
    }
}

#[derive(Debug, Clone)]
struct BitflagsState {
    storage: ValueHandle,
    text: String,
}

/// Raw storage as the only child; the summary names the set flags
#[derive(Debug, Default)]
pub struct BitflagsProvider {
    state: Option<BitflagsState>,
}

impl SyntheticProvider for BitflagsProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let storage = cx.mem.index(&cx.mem.index(&value, 0)?, 0)?;
        let raw = cx.mem.try_unsigned(&storage)?;
        self.state = Some(BitflagsState {
            storage,
            text: render_bitflags(raw, &member_table(cx, &value)),
        });
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        updated(&self.state)?;
        Ok(1)
    }

    fn child(&mut self, _cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        match index {
            0 => Ok(DisplayNode::typed("m_Value", 0, state.storage)),
            _ => Err(InspectError::IndexOutOfRange { index, len: 1 }),
        }
    }

    fn summary(&self, _cx: &ProviderContext<'_>) -> Result<Option<String>> {
        Ok(Some(updated(&self.state)?.text.clone()))
    }
}
