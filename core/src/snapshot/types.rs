//! Type table backing a snapshot

use crate::introspect::{EnumMember, ScalarEncoding, TypeId, TypeKind};

/// Size of a pointer in snapshot images
pub const POINTER_SIZE: u64 = 8;

/// A struct member at a fixed byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub offset: u64,
    pub ty: TypeId,
    /// Base-class subobject; its members are found by name through the derived type
    pub base: bool,
}

/// Static type metadata for one snapshot type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Scalar {
        name: String,
        size: u64,
        encoding: ScalarEncoding,
    },
    Pointer {
        name: String,
        pointee: TypeId,
    },
    Struct {
        name: String,
        size: u64,
        fields: Vec<FieldDef>,
        template_args: Vec<TypeId>,
    },
    Array {
        name: String,
        element: TypeId,
        count: u64,
        size: u64,
    },
    Enum {
        name: String,
        size: u64,
        members: Vec<EnumMember>,
    },
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Scalar { name, .. }
            | TypeDef::Pointer { name, .. }
            | TypeDef::Struct { name, .. }
            | TypeDef::Array { name, .. }
            | TypeDef::Enum { name, .. } => name,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            TypeDef::Pointer { .. } => POINTER_SIZE,
            TypeDef::Scalar { size, .. }
            | TypeDef::Struct { size, .. }
            | TypeDef::Array { size, .. }
            | TypeDef::Enum { size, .. } => *size,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDef::Scalar { encoding, .. } => TypeKind::Scalar(*encoding),
            TypeDef::Pointer { .. } => TypeKind::Pointer,
            TypeDef::Struct { .. } => TypeKind::Struct,
            TypeDef::Array { .. } => TypeKind::Array,
            TypeDef::Enum { .. } => TypeKind::Enum,
        }
    }

    /// Natural alignment of a non-array type when laying out builder structs
    pub fn align(&self) -> u64 {
        match self {
            TypeDef::Struct { .. } => 8,
            other => {
                let size = other.size().clamp(1, 8);
                if size.is_power_of_two() { size } else { 8 }
            }
        }
    }
}
