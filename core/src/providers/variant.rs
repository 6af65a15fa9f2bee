//! `ezVariant`

use crate::decode::{Resolution, VariantRegistry, VariantState, VariantStorage};
use crate::display::{DisplayNode, NULL_PLACEHOLDER};
use crate::error::{InspectError, Result};
use crate::introspect::{Address, MemoryIntrospection, ValueHandle};

use super::{ProviderContext, SyntheticProvider, string_view_text, updated};

#[derive(Debug, Clone)]
struct VariantCache {
    label: String,
    data: ValueHandle,
    is_shared: ValueHandle,
    resolution: Result<Resolution>,
}

/// Children `Type`, `Value` and `m_bIsShared`; summary `(<Type>) <value>`
#[derive(Debug, Default)]
pub struct VariantProvider {
    state: Option<VariantCache>,
}

impl VariantProvider {
    fn shared_address(mem: &dyn MemoryIntrospection, data: &ValueHandle) -> Result<Address> {
        let shared = mem.deref(&mem.field(data, "shared")?)?;
        mem.pointer_value(&mem.field(&shared, "m_Ptr")?)
    }

    /// Dynamic type name stored in the payload's type descriptor
    fn typed_object_name(
        mem: &dyn MemoryIntrospection,
        data: &ValueHandle,
        storage: VariantStorage,
        max_bytes: usize,
    ) -> Result<String> {
        let descriptor = match storage {
            VariantStorage::Inline => mem.field(&mem.field(data, "inlined")?, "m_pType")?,
            VariantStorage::Shared => {
                mem.field(&mem.deref(&mem.field(data, "shared")?)?, "m_pType")?
            }
        };
        let rtti = mem.deref(&descriptor)?;
        string_view_text(mem, &mem.field(&rtti, "m_sTypeName")?, max_bytes)
    }
}

impl SyntheticProvider for VariantProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let tags = VariantRegistry::from_memory(mem).unwrap_or_else(|e| {
            tracing::debug!("variant tag names unavailable: {}", e);
            VariantRegistry::default()
        });

        let data = mem.field(&value, "m_Data")?;
        let tag = mem.as_unsigned(&mem.field(&value, "m_uiType")?, 0);
        let is_shared = mem.field(&value, "m_bIsShared")?;
        let storage = if mem.as_unsigned(&is_shared, 0) != 0 {
            VariantStorage::Shared
        } else {
            VariantStorage::Inline
        };

        let header = VariantState {
            tag,
            storage,
            inline_address: data.address()?,
            shared_address: match storage {
                VariantStorage::Shared => Self::shared_address(mem, &data).ok(),
                VariantStorage::Inline => None,
            },
        };
        let resolution = tags.resolve(mem, &header, || {
            Self::typed_object_name(mem, &data, storage, cx.limits.max_summary_bytes)
        });

        self.state = Some(VariantCache {
            label: tags.tag_label(tag),
            data,
            is_shared,
            resolution,
        });
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        updated(&self.state)?;
        Ok(3)
    }

    fn child(&mut self, _cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        match index {
            0 => Ok(DisplayNode::text("Type", 0, state.label.clone())),
            1 => match &state.resolution {
                Ok(Resolution::Value(value)) => Ok(DisplayNode::typed("Value", 1, *value)),
                Ok(Resolution::Null) => Ok(DisplayNode::null("Value", 1)),
                Ok(Resolution::Raw) => Ok(DisplayNode::typed("m_Data", 1, state.data)),
                Err(e) => Err(e.clone()),
            },
            2 => Ok(DisplayNode::typed("m_bIsShared", 2, state.is_shared)),
            _ => Err(InspectError::IndexOutOfRange { index, len: 3 }),
        }
    }

    fn summary(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        let state = updated(&self.state)?;
        let value = match &state.resolution {
            Ok(Resolution::Value(value)) => cx.summarize(value)?.unwrap_or_default(),
            Ok(Resolution::Null) => NULL_PLACEHOLDER.to_string(),
            Ok(Resolution::Raw) => String::new(),
            Err(e) => return Err(e.clone()),
        };
        Ok(Some(format!("({}) {}", state.label, value)))
    }
}
