//! Memory Introspection API
//!
//! The single capability the engine consumes. A hosting debugger implements
//! [`MemoryIntrospection`] over the paused process; [`crate::snapshot::Snapshot`]
//! implements it over an in-memory image.
//!
//! All handles are plain `Copy` values borrowed for one update cycle. Nothing
//! here ever writes to inspected memory.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{InspectError, Result};

/// Address in the inspected process
pub type Address = u64;

/// Opaque static type descriptor issued by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// A located, typed region of inspected memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueHandle {
    /// Base address; `None` when the value is not backed by memory
    pub address: Option<Address>,
    /// Static type of the region
    pub ty: TypeId,
}

impl ValueHandle {
    /// Handle for a region of `ty` at `address`
    pub fn at(address: Address, ty: TypeId) -> Self {
        Self {
            address: Some(address),
            ty,
        }
    }

    /// Base address, or [`InspectError::InvalidAddress`] if absent
    pub fn address(&self) -> Result<Address> {
        self.address.ok_or(InspectError::InvalidAddress)
    }

    /// Handle `bytes` further into memory, retyped as `ty`
    pub fn displaced(self, bytes: u64, ty: TypeId) -> Result<Self> {
        let address = match self.address {
            Some(address) => Some(offset_address(address, 1, bytes)?),
            None => None,
        };
        Ok(Self { address, ty })
    }

    /// Same region retyped
    pub fn with_type(self, ty: TypeId) -> Self {
        Self { ty, ..self }
    }
}

/// `base + index * stride`.
///
/// Bases and indices come from inspected memory, so the result may not fit the
/// address space; that case is [`InspectError::InvalidAddress`].
pub fn offset_address(base: Address, index: u64, stride: u64) -> Result<Address> {
    index
        .checked_mul(stride)
        .and_then(|offset| base.checked_add(offset))
        .ok_or(InspectError::InvalidAddress)
}

/// Encoding of a primitive value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarEncoding {
    Unsigned,
    Signed,
    Float,
    Bool,
    Char,
}

/// Coarse classification of a type descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar(ScalarEncoding),
    Pointer,
    Struct,
    Array,
    Enum,
}

/// One entry of a runtime enum member table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: u64,
}

impl EnumMember {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Read-only access to a paused process's memory and type metadata.
///
/// Required methods mirror what a debugger exposes; provided methods build the
/// convenience reads the providers use on top of them.
pub trait MemoryIntrospection {
    /// Locate a named member of a struct value
    fn field(&self, handle: &ValueHandle, name: &str) -> Result<ValueHandle>;

    /// Locate the i-th structural member (struct field or array element)
    fn index(&self, handle: &ValueHandle, i: usize) -> Result<ValueHandle>;

    /// Read raw bytes from the inspected process
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>;

    /// Target type of a pointer type
    fn pointee_type(&self, ty: TypeId) -> Result<TypeId>;

    /// i-th generic argument of a templated type
    fn template_argument(&self, ty: TypeId, i: usize) -> Result<TypeId>;

    /// Size of a type in bytes
    fn byte_size(&self, ty: TypeId) -> Result<u64>;

    /// Fully qualified display name of a type
    fn type_name(&self, ty: TypeId) -> Result<String>;

    /// Classification of a type
    fn type_kind(&self, ty: TypeId) -> Result<TypeKind>;

    /// Fixed-length array type of `count` elements
    fn array_type(&self, element: TypeId, count: u64) -> Result<TypeId>;

    /// Look up a type by name
    fn find_type(&self, name: &str) -> Result<TypeId>;

    /// Member table of an enum type
    fn enum_members(&self, ty: TypeId) -> Result<Vec<EnumMember>>;

    /// The host's own rendering of a primitive value
    fn scalar_text(&self, handle: &ValueHandle) -> Result<String>;

    /// Names of a struct type's structural members, in `index` order
    fn member_names(&self, ty: TypeId) -> Result<Vec<String>>;

    /// Static type of a handle
    fn type_of(&self, handle: &ValueHandle) -> TypeId {
        handle.ty
    }

    /// Concrete location, used for identity comparisons
    fn load_address(&self, handle: &ValueHandle) -> Result<Address> {
        handle.address()
    }

    /// Read `count` bytes starting at the handle's address
    fn read_bytes(&self, handle: &ValueHandle, count: usize) -> Result<Vec<u8>> {
        self.read_memory(handle.address()?, count)
    }

    /// Value of an integral handle (1 to 8 bytes, little-endian)
    fn try_unsigned(&self, handle: &ValueHandle) -> Result<u64> {
        let size = self.byte_size(handle.ty)? as usize;
        if size == 0 || size > 8 {
            return Err(InspectError::TypeMismatch(format!(
                "{}-byte value is not an integer",
                size
            )));
        }
        let bytes = self.read_bytes(handle, size)?;
        Ok(LittleEndian::read_uint(&bytes, size))
    }

    /// Value of an integral handle, or `default` when unreadable
    fn as_unsigned(&self, handle: &ValueHandle, default: u64) -> u64 {
        self.try_unsigned(handle).unwrap_or(default)
    }

    /// Value of a 4- or 8-byte floating point handle
    fn as_float(&self, handle: &ValueHandle) -> Result<f64> {
        match self.byte_size(handle.ty)? {
            4 => Ok(LittleEndian::read_f32(&self.read_bytes(handle, 4)?) as f64),
            8 => Ok(LittleEndian::read_f64(&self.read_bytes(handle, 8)?)),
            size => Err(InspectError::TypeMismatch(format!(
                "{}-byte value is not a float",
                size
            ))),
        }
    }

    /// Reinterpret the handle's address as `count` elements of `element`
    fn array_of(&self, handle: &ValueHandle, element: TypeId, count: u64) -> Result<ValueHandle> {
        Ok(handle.with_type(self.array_type(element, count)?))
    }

    /// Cast an address to a named type
    fn reinterpret(&self, address: Address, type_name: &str) -> Result<ValueHandle> {
        let ty = self.find_type(type_name)?;
        Ok(ValueHandle::at(address, ty))
    }

    /// Address stored in a pointer value
    fn pointer_value(&self, handle: &ValueHandle) -> Result<Address> {
        if self.type_kind(handle.ty)? != TypeKind::Pointer {
            return Err(InspectError::NotAPointer(self.type_name(handle.ty)?));
        }
        self.try_unsigned(handle)
    }

    /// Follow a pointer to the value it targets
    fn deref(&self, pointer: &ValueHandle) -> Result<ValueHandle> {
        let pointee = self.pointee_type(pointer.ty)?;
        match self.pointer_value(pointer)? {
            0 => Err(InspectError::InvalidAddress),
            target => Ok(ValueHandle::at(target, pointee)),
        }
    }

    /// Base address of the elements a member designates.
    ///
    /// Pointer members designate their target; inline storage designates itself.
    fn element_base(&self, handle: &ValueHandle) -> Result<Address> {
        match self.type_kind(handle.ty)? {
            TypeKind::Pointer => self.pointer_value(handle),
            _ => handle.address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_address_rejects_overflow() {
        assert_eq!(offset_address(0x1000, 3, 4), Ok(0x100c));
        assert_eq!(offset_address(u64::MAX, 0, 4), Ok(u64::MAX));
        assert_eq!(offset_address(u64::MAX, 1, 4), Err(InspectError::InvalidAddress));
        assert_eq!(offset_address(0, u64::MAX, 2), Err(InspectError::InvalidAddress));
    }

    #[test]
    fn test_displaced_keeps_missing_address() {
        let register = ValueHandle {
            address: None,
            ty: TypeId(0),
        };
        assert_eq!(register.displaced(8, TypeId(1)).unwrap().address, None);
        assert_eq!(
            ValueHandle::at(u64::MAX - 1, TypeId(0)).displaced(4, TypeId(1)),
            Err(InspectError::InvalidAddress)
        );
    }
}
