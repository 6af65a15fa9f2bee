//! Tagged-union resolution
//!
//! A variant stores a small integer tag plus a payload that lives either in the
//! variant's inline buffer or behind a pointer to a shared allocation. The tag
//! names come from the runtime enum `ezVariantType::Enum`; each name maps to a
//! concrete type through a fixed table.

use hashbrown::HashMap;

use crate::error::{InspectError, Result};
use crate::introspect::{Address, EnumMember, MemoryIntrospection, ValueHandle};

/// Runtime enum listing the variant tags
pub const VARIANT_TAG_ENUM: &str = "ezVariantType::Enum";
/// Tag name of an empty variant
pub const INVALID_TAG: &str = "Invalid";
/// Tag name whose concrete type is named by an embedded type descriptor
pub const TYPED_OBJECT_TAG: &str = "TypedObject";

/// Concrete type stored under a tag name
pub fn target_type_name(tag_name: &str) -> Option<&'static str> {
    let target = match tag_name {
        "Bool" => "bool",
        "Int8" => "ezInt8",
        "UInt8" => "ezUInt8",
        "Int16" => "ezInt16",
        "UInt16" => "ezUInt16",
        "Int32" => "ezInt32",
        "UInt32" => "ezUInt32",
        "Int64" => "ezInt64",
        "UInt64" => "ezUInt64",
        "Float" => "float",
        "Double" => "double",
        "Color" => "ezColor",
        "Vector2" => "ezVec2",
        "Vector3" => "ezVec3",
        "Vector4" => "ezVec4",
        "Vector2I" => "ezVec2I32",
        "Vector3I" => "ezVec3I32",
        "Vector4I" => "ezVec4I32",
        "Vector2U" => "ezVec2U32",
        "Vector3U" => "ezVec3U32",
        "Vector4U" => "ezVec4U32",
        "Quaternion" => "ezQuat",
        "Matrix3" => "ezMat3",
        "Matrix4" => "ezMat4",
        "Transform" => "ezTransform",
        "String" => "ezString",
        "StringView" => "ezStringView",
        "DataBuffer" => "ezDataBuffer",
        "Time" => "ezTime",
        "Uuid" => "ezUuid",
        "Angle" => "ezAngle",
        "ColorGamma" => "ezColorGammaUB",
        "HashedString" => "ezHashedString",
        "TempHashedString" => "ezTempHashedString",
        "VariantArray" => "ezVariantArray",
        "VariantDictionary" => "ezVariantDictionary",
        "TypedPointer" => "ezTypedPointer",
        _ => return None,
    };
    Some(target)
}

/// Where the live payload of a variant is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStorage {
    Inline,
    Shared,
}

/// Decoded header of one variant value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantState {
    pub tag: u64,
    pub storage: VariantStorage,
    /// Address of the inline payload buffer
    pub inline_address: Address,
    /// Target of the shared payload pointer, when it could be read
    pub shared_address: Option<Address>,
}

impl VariantState {
    /// Address of the payload selected by the storage mode
    pub fn payload_address(&self) -> Result<Address> {
        match self.storage {
            VariantStorage::Inline => Ok(self.inline_address),
            VariantStorage::Shared => match self.shared_address {
                Some(0) | None => Err(InspectError::InvalidAddress),
                Some(address) => Ok(address),
            },
        }
    }
}

/// Outcome of resolving a variant's active value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Payload reinterpreted as its concrete type
    Value(ValueHandle),
    /// The variant is empty
    Null,
    /// Type unknown; show the untyped payload storage
    Raw,
}

/// Tag value to tag name mapping read from the runtime enum
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    tags: HashMap<u64, String>,
}

impl VariantRegistry {
    pub fn new(members: impl IntoIterator<Item = EnumMember>) -> Self {
        Self {
            tags: members.into_iter().map(|m| (m.value, m.name)).collect(),
        }
    }

    /// Registry built from the inspected program's `ezVariantType::Enum`
    pub fn from_memory(mem: &dyn MemoryIntrospection) -> Result<Self> {
        let enum_type = mem.find_type(VARIANT_TAG_ENUM)?;
        Ok(Self::new(mem.enum_members(enum_type)?))
    }

    pub fn tag_name(&self, tag: u64) -> Option<&str> {
        self.tags.get(&tag).map(String::as_str)
    }

    /// Tag name, or the number when the tag is unknown
    pub fn tag_label(&self, tag: u64) -> String {
        match self.tag_name(tag) {
            Some(name) => name.to_string(),
            None => tag.to_string(),
        }
    }

    /// Resolve the active value of `state`.
    ///
    /// `typed_object_name` is only consulted for the typed-object tag; a failure
    /// there, or a name that is not a known type, yields [`Resolution::Raw`].
    pub fn resolve(
        &self,
        mem: &dyn MemoryIntrospection,
        state: &VariantState,
        typed_object_name: impl FnOnce() -> Result<String>,
    ) -> Result<Resolution> {
        let Some(tag_name) = self.tag_name(state.tag) else {
            return Ok(Resolution::Raw);
        };

        if let Some(target) = target_type_name(tag_name) {
            let value = mem.reinterpret(state.payload_address()?, target)?;
            return Ok(Resolution::Value(value));
        }

        match tag_name {
            INVALID_TAG => Ok(Resolution::Null),
            TYPED_OBJECT_TAG => {
                let address = state.payload_address()?;
                let resolved = typed_object_name()
                    .and_then(|name| mem.reinterpret(address, name.trim_matches('"')));
                match resolved {
                    Ok(value) => Ok(Resolution::Value(value)),
                    Err(e) => {
                        tracing::debug!("typed object payload left untyped: {}", e);
                        Ok(Resolution::Raw)
                    }
                }
            }
            _ => Ok(Resolution::Raw),
        }
    }
}
