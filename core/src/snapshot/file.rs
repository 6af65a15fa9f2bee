//! Snapshot file format (JSON)
//!
//! ```json
//! {
//!   "types": [
//!     { "kind": "scalar", "name": "ezUInt32", "size": 4, "encoding": "unsigned" },
//!     { "kind": "pointer", "name": "ezUInt32*", "pointee": "ezUInt32" },
//!     { "kind": "struct", "name": "Pair", "size": 8, "template_args": [],
//!       "fields": [ { "name": "a", "offset": 0, "type": "ezUInt32" } ] }
//!   ],
//!   "regions": [ { "base": 4096, "bytes": "2a000000" } ],
//!   "variables": [ { "name": "pair", "type": "Pair", "address": 4096 } ]
//! }
//! ```
//!
//! Types refer to each other by name and may appear in any order.

use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::types::{FieldDef, TypeDef};
use super::{Region, Snapshot};
use crate::introspect::{Address, EnumMember, ScalarEncoding, TypeId, ValueHandle};

/// Snapshot loading error
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("region at {base:#x} has invalid hex bytes: {source}")]
    Hex {
        base: Address,
        #[source]
        source: hex::FromHexError,
    },

    #[error("type `{0}` is referenced but never defined")]
    UnknownType(String),

    #[error("type `{0}` is defined more than once")]
    DuplicateType(String),
}

/// On-disk snapshot document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    #[serde(default)]
    pub regions: Vec<RegionEntry>,
    #[serde(default)]
    pub variables: Vec<VariableEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeEntry {
    Scalar {
        name: String,
        size: u64,
        encoding: ScalarEncoding,
    },
    Pointer {
        name: String,
        pointee: String,
    },
    Struct {
        name: String,
        size: u64,
        #[serde(default)]
        template_args: Vec<String>,
        #[serde(default)]
        fields: Vec<FieldEntry>,
    },
    Array {
        name: String,
        element: String,
        count: u64,
    },
    Enum {
        name: String,
        size: u64,
        #[serde(default)]
        members: Vec<EnumMember>,
    },
}

impl TypeEntry {
    fn name(&self) -> &str {
        match self {
            TypeEntry::Scalar { name, .. }
            | TypeEntry::Pointer { name, .. }
            | TypeEntry::Struct { name, .. }
            | TypeEntry::Array { name, .. }
            | TypeEntry::Enum { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub offset: u64,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub base: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionEntry {
    pub base: Address,
    /// Hex-encoded bytes
    pub bytes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub address: Address,
}

impl SnapshotFile {
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Resolve type references and decode memory into a [`Snapshot`]
    pub fn into_snapshot(self) -> Result<Snapshot, SnapshotError> {
        let mut ids: HashMap<&str, TypeId> = HashMap::new();
        for (i, entry) in self.types.iter().enumerate() {
            if ids.insert(entry.name(), TypeId(i as u32)).is_some() {
                return Err(SnapshotError::DuplicateType(entry.name().to_string()));
            }
        }
        let resolve = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| SnapshotError::UnknownType(name.to_string()))
        };

        // Array sizes depend on element sizes, so resolve sizes lazily below
        let mut types = Vec::with_capacity(self.types.len());
        for entry in &self.types {
            let def = match entry {
                TypeEntry::Scalar {
                    name,
                    size,
                    encoding,
                } => TypeDef::Scalar {
                    name: name.clone(),
                    size: *size,
                    encoding: *encoding,
                },
                TypeEntry::Pointer { name, pointee } => TypeDef::Pointer {
                    name: name.clone(),
                    pointee: resolve(pointee)?,
                },
                TypeEntry::Struct {
                    name,
                    size,
                    template_args,
                    fields,
                } => TypeDef::Struct {
                    name: name.clone(),
                    size: *size,
                    template_args: template_args
                        .iter()
                        .map(|arg| resolve(arg))
                        .collect::<Result<_, _>>()?,
                    fields: fields
                        .iter()
                        .map(|f| {
                            Ok(FieldDef {
                                name: f.name.clone(),
                                offset: f.offset,
                                ty: resolve(&f.ty)?,
                                base: f.base,
                            })
                        })
                        .collect::<Result<_, SnapshotError>>()?,
                },
                TypeEntry::Array {
                    name,
                    element,
                    count,
                } => TypeDef::Array {
                    name: name.clone(),
                    element: resolve(element)?,
                    count: *count,
                    size: 0,
                },
                TypeEntry::Enum {
                    name,
                    size,
                    members,
                } => TypeDef::Enum {
                    name: name.clone(),
                    size: *size,
                    members: members.clone(),
                },
            };
            types.push(def);
        }
        for i in 0..types.len() {
            let size = array_size(&types, TypeId(i as u32), 0);
            if let TypeDef::Array { size: slot, .. } = &mut types[i] {
                *slot = size;
            }
        }

        let regions = self
            .regions
            .into_iter()
            .map(|r| {
                let bytes = hex::decode(r.bytes.trim())
                    .map_err(|source| SnapshotError::Hex { base: r.base, source })?;
                Ok(Region {
                    base: r.base,
                    bytes,
                })
            })
            .collect::<Result<Vec<_>, SnapshotError>>()?;

        let variables = self
            .variables
            .iter()
            .map(|v| Ok((v.name.clone(), ValueHandle::at(v.address, resolve(&v.ty)?))))
            .collect::<Result<Vec<_>, SnapshotError>>()?;

        Ok(Snapshot::from_parts(types, regions, variables))
    }
}

// Nested arrays are sized from their innermost element; cycles bottom out at 0.
fn array_size(types: &[TypeDef], ty: TypeId, depth: usize) -> u64 {
    match &types[ty.0 as usize] {
        TypeDef::Array { element, count, .. } if depth < 16 => {
            array_size(types, *element, depth + 1).saturating_mul(*count)
        }
        TypeDef::Array { .. } => 0,
        other => other.size(),
    }
}
