//! Programmatic construction of snapshot images

use byteorder::{ByteOrder, LittleEndian};
use hashbrown::HashMap;

use super::types::{FieldDef, TypeDef};
use super::{Region, Snapshot};
use crate::introspect::{Address, EnumMember, ScalarEncoding, TypeId, ValueHandle};

/// Base address of the builder's bump-allocated heap.
///
/// Non-zero so that a zeroed pointer never designates builder memory.
pub const HEAP_BASE: Address = 0x1000_0000;

/// Builds a [`Snapshot`] from types and memory written piece by piece
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    types: Vec<TypeDef>,
    by_name: HashMap<String, TypeId>,
    heap: Vec<u8>,
    regions: Vec<Region>,
    variables: Vec<(String, ValueHandle)>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, def: TypeDef) -> TypeId {
        if let Some(id) = self.by_name.get(def.name()) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.by_name.insert(def.name().to_string(), id);
        self.types.push(def);
        id
    }

    /// Register (or fetch) a primitive type
    pub fn scalar(&mut self, name: &str, size: u64, encoding: ScalarEncoding) -> TypeId {
        self.insert(TypeDef::Scalar {
            name: name.to_string(),
            size,
            encoding,
        })
    }

    /// Register (or fetch) `pointee*`
    pub fn pointer(&mut self, pointee: TypeId) -> TypeId {
        let name = format!("{}*", self.types[pointee.0 as usize].name());
        self.insert(TypeDef::Pointer { name, pointee })
    }

    /// Register (or fetch) `element[count]`
    pub fn array(&mut self, element: TypeId, count: u64) -> TypeId {
        let def = &self.types[element.0 as usize];
        let name = format!("{}[{}]", def.name(), count);
        let size = def.size() * count;
        self.insert(TypeDef::Array {
            name,
            element,
            count,
            size,
        })
    }

    /// Register an enum with its member table
    pub fn enumeration(&mut self, name: &str, size: u64, members: &[(&str, u64)]) -> TypeId {
        self.insert(TypeDef::Enum {
            name: name.to_string(),
            size,
            members: members
                .iter()
                .map(|(n, v)| EnumMember::new(*n, *v))
                .collect(),
        })
    }

    /// Reserve a struct name so self-referential types can point at it.
    ///
    /// A later [`SnapshotBuilder::structure`] with the same name fills it in.
    pub fn declare(&mut self, name: &str) -> TypeId {
        self.insert(TypeDef::Struct {
            name: name.to_string(),
            size: 0,
            fields: Vec::new(),
            template_args: Vec::new(),
        })
    }

    /// Start laying out a struct
    pub fn structure(&mut self, name: &str) -> StructBuilder<'_> {
        StructBuilder {
            builder: self,
            name: name.to_string(),
            fields: Vec::new(),
            template_args: Vec::new(),
            offset: 0,
            size: None,
        }
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn type_name(&self, ty: TypeId) -> &str {
        self.types[ty.0 as usize].name()
    }

    pub fn size_of(&self, ty: TypeId) -> u64 {
        self.types[ty.0 as usize].size()
    }

    fn align_of(&self, ty: TypeId) -> u64 {
        match &self.types[ty.0 as usize] {
            TypeDef::Array { element, .. } => self.align_of(*element),
            other => other.align(),
        }
    }

    /// Offset of a named member of a struct type, searching base classes
    pub fn field_offset(&self, ty: TypeId, name: &str) -> Option<(u64, TypeId)> {
        let TypeDef::Struct { fields, .. } = &self.types[ty.0 as usize] else {
            return None;
        };
        if let Some(f) = fields.iter().find(|f| f.name == name) {
            return Some((f.offset, f.ty));
        }
        fields.iter().filter(|f| f.base).find_map(|f| {
            self.field_offset(f.ty, name)
                .map(|(offset, ty)| (f.offset + offset, ty))
        })
    }

    /// Allocate zeroed heap memory
    pub fn alloc(&mut self, size: u64, align: u64) -> Address {
        let align = align.max(1);
        let start = (self.heap.len() as u64).div_ceil(align) * align;
        self.heap.resize((start + size.max(1)) as usize, 0);
        HEAP_BASE + start
    }

    /// Allocate zeroed heap memory for one value of `ty`
    pub fn alloc_value(&mut self, ty: TypeId) -> Address {
        let size = self.size_of(ty);
        let align = self.align_of(ty);
        self.alloc(size, align)
    }

    /// Write bytes anywhere; memory outside the heap becomes its own region
    pub fn write(&mut self, address: Address, bytes: &[u8]) -> &mut Self {
        if address >= HEAP_BASE {
            let start = (address - HEAP_BASE) as usize;
            let end = start + bytes.len();
            if self.heap.len() < end {
                self.heap.resize(end, 0);
            }
            self.heap[start..end].copy_from_slice(bytes);
            return self;
        }

        let existing = self.regions.iter_mut().find(|r| {
            address >= r.base && address - r.base <= r.bytes.len() as u64
        });
        match existing {
            Some(region) => {
                let start = (address - region.base) as usize;
                let end = start + bytes.len();
                if region.bytes.len() < end {
                    region.bytes.resize(end, 0);
                }
                region.bytes[start..end].copy_from_slice(bytes);
            }
            None => self.regions.push(Region {
                base: address,
                bytes: bytes.to_vec(),
            }),
        }
        self
    }

    /// Write a little-endian integer of `size` bytes
    pub fn write_uint(&mut self, address: Address, size: u64, value: u64) -> &mut Self {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.write(address, &buf[..size as usize])
    }

    pub fn write_f32(&mut self, address: Address, value: f32) -> &mut Self {
        self.write(address, &value.to_le_bytes())
    }

    /// Write an integral member of a struct placed at `base`.
    ///
    /// # Panics
    ///
    /// Panics if `ty` has no member called `name`.
    pub fn set_field(&mut self, base: Address, ty: TypeId, name: &str, value: u64) -> &mut Self {
        let Some((offset, field_ty)) = self.field_offset(ty, name) else {
            panic!("type `{}` has no member `{}`", self.types[ty.0 as usize].name(), name);
        };
        let size = self.size_of(field_ty).min(8);
        self.write_uint(base + offset, size, value)
    }

    /// Address of a member of a struct placed at `base`.
    ///
    /// # Panics
    ///
    /// Panics if `ty` has no member called `name`.
    pub fn field_address(&self, base: Address, ty: TypeId, name: &str) -> Address {
        match self.field_offset(ty, name) {
            Some((offset, _)) => base + offset,
            None => panic!("type `{}` has no member `{}`", self.types[ty.0 as usize].name(), name),
        }
    }

    /// Add a captured region verbatim
    pub fn add_region(&mut self, base: Address, bytes: Vec<u8>) -> &mut Self {
        self.regions.push(Region { base, bytes });
        self
    }

    /// Name a root value
    pub fn variable(&mut self, name: &str, address: Address, ty: TypeId) -> &mut Self {
        self.variables
            .push((name.to_string(), ValueHandle::at(address, ty)));
        self
    }

    pub fn build(self) -> Snapshot {
        let mut regions = self.regions;
        if !self.heap.is_empty() {
            regions.push(Region {
                base: HEAP_BASE,
                bytes: self.heap,
            });
        }
        Snapshot::from_parts(self.types, regions, self.variables)
    }
}

/// Lays out one struct type; members are placed at their natural alignment
pub struct StructBuilder<'a> {
    builder: &'a mut SnapshotBuilder,
    name: String,
    fields: Vec<FieldDef>,
    template_args: Vec<TypeId>,
    offset: u64,
    size: Option<u64>,
}

impl StructBuilder<'_> {
    pub fn template_arg(mut self, ty: TypeId) -> Self {
        self.template_args.push(ty);
        self
    }

    /// Append a member after the previous one
    pub fn field(mut self, name: &str, ty: TypeId) -> Self {
        let align = self.builder.align_of(ty);
        let offset = self.offset.div_ceil(align) * align;
        self.offset = offset + self.builder.size_of(ty);
        self.fields.push(FieldDef {
            name: name.to_string(),
            offset,
            ty,
            base: false,
        });
        self
    }

    /// Append a base-class subobject, named after its type
    pub fn base(mut self, ty: TypeId) -> Self {
        let name = self.builder.types[ty.0 as usize].name().to_string();
        self = self.field(&name, ty);
        if let Some(last) = self.fields.last_mut() {
            last.base = true;
        }
        self
    }

    /// Place a member at an explicit offset (unions, overlapping storage)
    pub fn field_at(mut self, name: &str, offset: u64, ty: TypeId) -> Self {
        self.offset = self.offset.max(offset + self.builder.size_of(ty));
        self.fields.push(FieldDef {
            name: name.to_string(),
            offset,
            ty,
            base: false,
        });
        self
    }

    /// Override the computed size
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn finish(self) -> TypeId {
        let size = self.size.unwrap_or_else(|| self.offset.div_ceil(8) * 8);
        let def = TypeDef::Struct {
            name: self.name.clone(),
            size,
            fields: self.fields,
            template_args: self.template_args,
        };
        match self.builder.by_name.get(&self.name).copied() {
            // Fill in a forward declaration
            Some(id) => {
                self.builder.types[id.0 as usize] = def;
                id
            }
            None => self.builder.insert(def),
        }
    }
}
