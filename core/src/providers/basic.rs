//! Plain members, angles, uuids and matrices

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::display::DisplayNode;
use crate::error::{InspectError, Result};
use crate::introspect::{TypeId, TypeKind, ValueHandle, offset_address};

use super::{ProviderContext, ProviderKind, SyntheticProvider, updated};

#[derive(Debug, Clone)]
enum Members {
    Fields(Vec<String>),
    Elements(usize),
    None,
}

#[derive(Debug, Clone)]
struct StructuralState {
    value: ValueHandle,
    members: Members,
}

/// A value's own structural members: struct fields by name, array elements as `[i]`
#[derive(Debug, Default)]
pub struct StructuralProvider {
    state: Option<StructuralState>,
}

impl SyntheticProvider for StructuralProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let members = match mem.type_kind(value.ty)? {
            TypeKind::Struct => Members::Fields(mem.member_names(value.ty)?),
            TypeKind::Array => {
                let size = mem.byte_size(value.ty)?;
                let count = match mem.index(&value, 0) {
                    Ok(first) => size.checked_div(mem.byte_size(first.ty)?).unwrap_or(0),
                    Err(_) => 0,
                };
                Members::Elements(cx.limits.display_len(count))
            }
            _ => Members::None,
        };
        self.state = Some(StructuralState { value, members });
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        Ok(match &updated(&self.state)?.members {
            Members::Fields(names) => names.len(),
            Members::Elements(count) => *count,
            Members::None => 0,
        })
    }

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        let len = self.child_count(cx)?;
        if index >= len {
            return Err(InspectError::IndexOutOfRange { index, len });
        }
        let member = cx.mem.index(&state.value, index)?;
        match &state.members {
            Members::Fields(names) => Ok(DisplayNode::typed(names[index].clone(), index, member)),
            _ => Ok(DisplayNode::element(index, index, member)),
        }
    }
}

/// `ezAngle`: radians at member 0, summarized in degrees
#[derive(Debug, Default)]
pub struct AngleProvider {
    members: StructuralProvider,
    radians: Option<f64>,
}

impl SyntheticProvider for AngleProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.radians = None;
        self.members.update(cx, value)?;
        self.radians = Some(cx.mem.as_float(&cx.mem.index(&value, 0)?)?);
        Ok(())
    }

    fn child_count(&self, cx: &ProviderContext<'_>) -> Result<usize> {
        self.members.child_count(cx)
    }

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        self.members.child(cx, index)
    }

    fn summary(&self, _cx: &ProviderContext<'_>) -> Result<Option<String>> {
        let radians = *updated(&self.radians)?;
        Ok(Some(format!("{{ Degree={:.2}° }}", radians.to_degrees())))
    }
}

/// Canonical 8-4-4-4-12 text of a uuid stored as two little-endian halves
pub fn uuid_text(high: u64, low: u64) -> String {
    let mut high_bytes = [0u8; 8];
    let mut low_bytes = [0u8; 8];
    LittleEndian::write_u64(&mut high_bytes, high);
    LittleEndian::write_u64(&mut low_bytes, low);

    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        LittleEndian::read_u32(&high_bytes[0..4]),
        LittleEndian::read_u16(&high_bytes[4..6]),
        LittleEndian::read_u16(&high_bytes[6..8]),
        BigEndian::read_u16(&low_bytes[0..2]),
        BigEndian::read_uint(&low_bytes[2..8], 6),
    )
}

/// `ezUuid`: members `m_uiHigh`, `m_uiLow`
#[derive(Debug, Default)]
pub struct UuidProvider {
    members: StructuralProvider,
    text: Option<String>,
}

impl SyntheticProvider for UuidProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.text = None;
        self.members.update(cx, value)?;
        let high = cx.mem.try_unsigned(&cx.mem.index(&value, 0)?)?;
        let low = cx.mem.try_unsigned(&cx.mem.index(&value, 1)?)?;
        self.text = Some(uuid_text(high, low));
        Ok(())
    }

    fn child_count(&self, cx: &ProviderContext<'_>) -> Result<usize> {
        self.members.child_count(cx)
    }

    fn child(&mut self, cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        self.members.child(cx, index)
    }

    fn summary(&self, _cx: &ProviderContext<'_>) -> Result<Option<String>> {
        Ok(Some(updated(&self.text)?.clone()))
    }
}

#[derive(Debug, Clone, Copy)]
struct MatrixState {
    elements: ValueHandle,
    column_type: TypeId,
    column_stride: u64,
}

/// Square column-major matrix (`ezMat3`, `ezMat4`).
///
/// Children `Column0..`, each a vector over one column, then `m_fElementsCM`.
#[derive(Debug)]
pub struct MatrixProvider {
    dimension: usize,
    state: Option<MatrixState>,
}

impl MatrixProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: None,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self.dimension {
            3 => ProviderKind::Mat3,
            _ => ProviderKind::Mat4,
        }
    }

    fn column_type_name(&self) -> &'static str {
        match self.dimension {
            3 => "ezVec3",
            _ => "ezVec4",
        }
    }
}

impl SyntheticProvider for MatrixProvider {
    fn update(&mut self, cx: &ProviderContext<'_>, value: ValueHandle) -> Result<()> {
        self.state = None;
        let mem = cx.mem;

        let elements = mem.field(&value, "m_fElementsCM")?;
        let n = self.dimension as u64;
        let element_size = mem.byte_size(elements.ty)? / (n * n);
        if element_size == 0 {
            return Err(InspectError::TypeMismatch(format!(
                "`{}` is too small for a {}x{} matrix",
                mem.type_name(elements.ty)?,
                n,
                n
            )));
        }

        self.state = Some(MatrixState {
            elements,
            column_type: mem.find_type(self.column_type_name())?,
            column_stride: element_size * n,
        });
        Ok(())
    }

    fn child_count(&self, _cx: &ProviderContext<'_>) -> Result<usize> {
        updated(&self.state)?;
        Ok(self.dimension + 1)
    }

    fn child(&mut self, _cx: &ProviderContext<'_>, index: usize) -> Result<DisplayNode> {
        let state = updated(&self.state)?;
        if index == self.dimension {
            return Ok(DisplayNode::typed("m_fElementsCM", index, state.elements));
        }
        if index > self.dimension {
            return Err(InspectError::IndexOutOfRange {
                index,
                len: self.dimension + 1,
            });
        }
        let base = state.elements.address()?;
        let column = ValueHandle::at(
            offset_address(base, index as u64, state.column_stride)?,
            state.column_type,
        );
        Ok(DisplayNode::typed(format!("Column{}", index), index, column))
    }
}
