//! In-memory inspection host
//!
//! A [`Snapshot`] is a captured memory image plus the static type metadata needed
//! to interpret it. It implements [`MemoryIntrospection`] so the engine can run
//! outside a live debugger: in tests, and in the `memlens` CLI over snapshot files.

mod builder;
mod file;
mod types;

pub use builder::{HEAP_BASE, SnapshotBuilder, StructBuilder};
pub use file::{SnapshotError, SnapshotFile};
pub use types::{FieldDef, POINTER_SIZE, TypeDef};

use std::cell::RefCell;

use byteorder::{ByteOrder, LittleEndian};
use hashbrown::HashMap;

use crate::error::{InspectError, Result};
use crate::introspect::{
    Address, EnumMember, MemoryIntrospection, ScalarEncoding, TypeId, TypeKind, ValueHandle,
};

// Inheritance chains deeper than this are not searched
const MAX_BASE_DEPTH: usize = 8;

/// A contiguous run of captured memory
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub base: Address,
    pub bytes: Vec<u8>,
}

impl Region {
    fn slice(&self, address: Address, len: usize) -> Option<&[u8]> {
        let start = address.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        self.bytes.get(start..end)
    }
}

/// Captured memory image with its type table
#[derive(Debug)]
pub struct Snapshot {
    regions: Vec<Region>,
    // Array types are created on demand by `array_type`
    types: RefCell<Vec<TypeDef>>,
    by_name: RefCell<HashMap<String, TypeId>>,
    variables: Vec<(String, ValueHandle)>,
}

impl Snapshot {
    pub(crate) fn from_parts(
        types: Vec<TypeDef>,
        regions: Vec<Region>,
        variables: Vec<(String, ValueHandle)>,
    ) -> Self {
        let by_name = types
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name().to_string(), TypeId(i as u32)))
            .collect();
        Self {
            regions,
            types: RefCell::new(types),
            by_name: RefCell::new(by_name),
            variables,
        }
    }

    /// Look up a named root variable
    pub fn variable(&self, name: &str) -> Option<ValueHandle> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, handle)| *handle)
    }

    /// All named root variables in declaration order
    pub fn variables(&self) -> impl Iterator<Item = (&str, ValueHandle)> {
        self.variables.iter().map(|(n, h)| (n.as_str(), *h))
    }

    /// Number of types, including arrays created on demand
    pub fn type_count(&self) -> usize {
        self.types.borrow().len()
    }

    fn with_def<R>(&self, ty: TypeId, f: impl FnOnce(&TypeDef) -> R) -> Result<R> {
        let types = self.types.borrow();
        types
            .get(ty.0 as usize)
            .map(f)
            .ok_or_else(|| InspectError::UnresolvableType(format!("#{}", ty.0)))
    }

    /// Named member of a struct, looked up through base classes
    fn find_member(&self, ty: TypeId, name: &str, depth: usize) -> Result<Option<(u64, TypeId)>> {
        let (direct, bases) = self.with_def(ty, |def| match def {
            TypeDef::Struct { fields, .. } => (
                fields
                    .iter()
                    .find(|f| f.name == name)
                    .map(|f| (f.offset, f.ty)),
                fields
                    .iter()
                    .filter(|f| f.base)
                    .map(|f| (f.offset, f.ty))
                    .collect::<Vec<_>>(),
            ),
            _ => (None, Vec::new()),
        })?;
        if direct.is_some() || depth >= MAX_BASE_DEPTH {
            return Ok(direct);
        }
        for (offset, base) in bases {
            if let Some((inner, ty)) = self.find_member(base, name, depth + 1)? {
                return Ok(Some((offset + inner, ty)));
            }
        }
        Ok(None)
    }

    fn scalar_from_bytes(bytes: &[u8], encoding: ScalarEncoding) -> String {
        let size = bytes.len();
        match encoding {
            ScalarEncoding::Unsigned => LittleEndian::read_uint(bytes, size).to_string(),
            ScalarEncoding::Signed => LittleEndian::read_int(bytes, size).to_string(),
            ScalarEncoding::Bool => (bytes.iter().any(|b| *b != 0)).to_string(),
            ScalarEncoding::Float if size == 4 => format!("{}", LittleEndian::read_f32(bytes)),
            ScalarEncoding::Float => format!("{}", LittleEndian::read_f64(bytes)),
            ScalarEncoding::Char => {
                let code = LittleEndian::read_uint(bytes, size);
                match char::from_u32(code as u32) {
                    Some(c) if !c.is_control() => format!("'{}'", c),
                    _ => code.to_string(),
                }
            }
        }
    }
}

impl MemoryIntrospection for Snapshot {
    fn field(&self, handle: &ValueHandle, name: &str) -> Result<ValueHandle> {
        let found = self.find_member(handle.ty, name, 0)?;
        let (offset, ty) = found.ok_or_else(|| InspectError::UnavailableField(name.to_string()))?;
        handle.displaced(offset, ty)
    }

    fn index(&self, handle: &ValueHandle, i: usize) -> Result<ValueHandle> {
        let found = self.with_def(handle.ty, |def| match def {
            TypeDef::Struct { fields, .. } => fields.get(i).map(|f| (f.offset, f.ty)),
            TypeDef::Array { element, count, .. } if (i as u64) < *count => {
                Some((i as u64, *element))
            }
            _ => None,
        })?;
        let (offset, ty) = found.ok_or(InspectError::UnavailableMember(i))?;
        let offset = if self.type_kind(handle.ty)? == TypeKind::Array {
            offset * self.byte_size(ty)?
        } else {
            offset
        };
        handle.displaced(offset, ty)
    }

    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>> {
        self.regions
            .iter()
            .find_map(|region| region.slice(address, len))
            .map(<[u8]>::to_vec)
            .ok_or(InspectError::UnavailableMemory { address, len })
    }

    fn pointee_type(&self, ty: TypeId) -> Result<TypeId> {
        let pointee = self.with_def(ty, |def| match def {
            TypeDef::Pointer { pointee, .. } => Ok(*pointee),
            other => Err(InspectError::NotAPointer(other.name().to_string())),
        })?;
        pointee
    }

    fn template_argument(&self, ty: TypeId, i: usize) -> Result<TypeId> {
        let arg = self.with_def(ty, |def| match def {
            TypeDef::Struct { template_args, .. } => template_args.get(i).copied(),
            _ => None,
        })?;
        match arg {
            Some(arg) => Ok(arg),
            None => Err(InspectError::UnresolvableType(format!(
                "{}<#{}>",
                self.type_name(ty)?,
                i
            ))),
        }
    }

    fn byte_size(&self, ty: TypeId) -> Result<u64> {
        self.with_def(ty, TypeDef::size)
    }

    fn type_name(&self, ty: TypeId) -> Result<String> {
        self.with_def(ty, |def| def.name().to_string())
    }

    fn type_kind(&self, ty: TypeId) -> Result<TypeKind> {
        self.with_def(ty, TypeDef::kind)
    }

    fn array_type(&self, element: TypeId, count: u64) -> Result<TypeId> {
        let (element_name, element_size) =
            self.with_def(element, |def| (def.name().to_string(), def.size()))?;
        let name = format!("{}[{}]", element_name, count);
        if let Some(id) = self.by_name.borrow().get(&name) {
            return Ok(*id);
        }

        let mut types = self.types.borrow_mut();
        let id = TypeId(types.len() as u32);
        types.push(TypeDef::Array {
            name: name.clone(),
            element,
            count,
            size: element_size.saturating_mul(count),
        });
        self.by_name.borrow_mut().insert(name, id);
        Ok(id)
    }

    fn find_type(&self, name: &str) -> Result<TypeId> {
        self.by_name
            .borrow()
            .get(name)
            .copied()
            .ok_or_else(|| InspectError::UnresolvableType(name.to_string()))
    }

    fn enum_members(&self, ty: TypeId) -> Result<Vec<EnumMember>> {
        let members = self.with_def(ty, |def| match def {
            TypeDef::Enum { members, .. } => Ok(members.clone()),
            other => Err(InspectError::TypeMismatch(format!(
                "`{}` is not an enum",
                other.name()
            ))),
        })?;
        members
    }

    fn member_names(&self, ty: TypeId) -> Result<Vec<String>> {
        self.with_def(ty, |def| match def {
            TypeDef::Struct { fields, .. } => fields.iter().map(|f| f.name.clone()).collect(),
            _ => Vec::new(),
        })
    }

    fn scalar_text(&self, handle: &ValueHandle) -> Result<String> {
        let def = self.with_def(handle.ty, Clone::clone)?;
        match def {
            TypeDef::Scalar { encoding, size, .. } if (1..=8).contains(&size) => {
                let bytes = self.read_bytes(handle, size as usize)?;
                Ok(Self::scalar_from_bytes(&bytes, encoding))
            }
            TypeDef::Pointer { .. } => Ok(format!("{:#x}", self.try_unsigned(handle)?)),
            TypeDef::Enum { members, .. } => {
                let value = self.try_unsigned(handle)?;
                Ok(members
                    .iter()
                    .find(|m| m.value == value)
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| value.to_string()))
            }
            other => Err(InspectError::TypeMismatch(format!(
                "`{}` has no scalar rendering",
                other.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup_through_base_class() {
        let mut b = SnapshotBuilder::new();
        let u32_ty = b.scalar("ezUInt32", 4, ScalarEncoding::Unsigned);
        let base = b
            .structure("ezArrayBase<int>")
            .field("m_uiCount", u32_ty)
            .field("m_uiCapacity", u32_ty)
            .finish();
        let derived = b
            .structure("ezDynamicArray<int>")
            .base(base)
            .field("m_uiExtra", u32_ty)
            .finish();
        let addr = b.alloc_value(derived);
        b.set_field(addr, derived, "m_uiCapacity", 12);
        b.set_field(addr, derived, "m_uiExtra", 3);
        let mem = b.build();

        let value = ValueHandle::at(addr, derived);
        let capacity = mem.field(&value, "m_uiCapacity").unwrap();
        assert_eq!(capacity.address, Some(addr + 4));
        assert_eq!(mem.as_unsigned(&capacity, 0), 12);
        assert_eq!(mem.as_unsigned(&mem.field(&value, "m_uiExtra").unwrap(), 0), 3);
        assert_eq!(
            mem.member_names(derived).unwrap(),
            vec!["ezArrayBase<int>".to_string(), "m_uiExtra".to_string()]
        );
        assert_eq!(
            mem.field(&value, "m_pElements"),
            Err(InspectError::UnavailableField("m_pElements".to_string()))
        );
    }

    #[test]
    fn test_reads_outside_regions_fail() {
        let mut b = SnapshotBuilder::new();
        b.write(0x100, &[1, 2, 3, 4]);
        let mem = b.build();

        assert_eq!(mem.read_memory(0x101, 2).unwrap(), vec![2, 3]);
        assert_eq!(
            mem.read_memory(0x102, 4),
            Err(InspectError::UnavailableMemory {
                address: 0x102,
                len: 4
            })
        );
    }

    #[test]
    fn test_array_types_are_created_once() {
        let mut b = SnapshotBuilder::new();
        let ch = b.scalar("char", 1, ScalarEncoding::Char);
        let mem = b.build();
        let before = mem.type_count();

        let first = mem.array_type(ch, 5).unwrap();
        let second = mem.array_type(ch, 5).unwrap();
        assert_eq!(first, second);
        assert_eq!(mem.type_count(), before + 1);
        assert_eq!(mem.type_name(first).unwrap(), "char[5]");
        assert_eq!(mem.byte_size(first).unwrap(), 5);
    }

    #[test]
    fn test_scalar_text() {
        let mut b = SnapshotBuilder::new();
        let int = b.scalar("int", 4, ScalarEncoding::Signed);
        let ch = b.scalar("char", 1, ScalarEncoding::Char);
        let ptr = b.pointer(int);
        let addr = b.alloc(16, 8);
        b.write_uint(addr, 4, (-7i32) as u32 as u64);
        b.write(addr + 4, b"x");
        b.write_uint(addr + 8, 8, 0x1234);
        let mem = b.build();

        assert_eq!(mem.scalar_text(&ValueHandle::at(addr, int)).unwrap(), "-7");
        assert_eq!(mem.scalar_text(&ValueHandle::at(addr + 4, ch)).unwrap(), "'x'");
        assert_eq!(mem.scalar_text(&ValueHandle::at(addr + 8, ptr)).unwrap(), "0x1234");
    }

    #[test]
    fn test_deref_null_pointer() {
        let mut b = SnapshotBuilder::new();
        let int = b.scalar("int", 4, ScalarEncoding::Signed);
        let ptr = b.pointer(int);
        let addr = b.alloc_value(ptr);
        let mem = b.build();

        let pointer = ValueHandle::at(addr, ptr);
        assert_eq!(mem.deref(&pointer), Err(InspectError::InvalidAddress));
        assert!(matches!(
            mem.pointer_value(&ValueHandle::at(addr, int)),
            Err(InspectError::NotAPointer(_))
        ));
    }
}
