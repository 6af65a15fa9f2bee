//! Symbolic rendering of enums and bitflags
//!
//! Member tables come from the host's type metadata. Wrapper types name their
//! enum through template argument 0; the member table lives on `<arg>::Enum`.

use crate::error::Result;
use crate::introspect::{EnumMember, MemoryIntrospection, TypeId};

/// `"<name> (<value>)"` on an exact match, `"? (<value>)"` otherwise
pub fn render_enum(value: u64, members: &[EnumMember]) -> String {
    match members.iter().find(|m| m.value == value) {
        Some(member) => format!("{} ({})", member.name, value),
        None => format!("? ({})", value),
    }
}

/// Names of the single-bit members set in `value`, joined with `" | "`.
///
/// Members whose value is zero or has more than one bit set never match, and
/// set bits without a single-bit member are dropped. With no match at all the
/// result is `"None (0)"`, whatever `value` holds.
pub fn render_bitflags(value: u64, members: &[EnumMember]) -> String {
    let names: Vec<&str> = members
        .iter()
        .filter(|m| m.value.is_power_of_two() && value & m.value != 0)
        .map(|m| m.name.as_str())
        .collect();

    if names.is_empty() {
        return "None (0)".to_string();
    }
    format!("{} ({})", names.join(" | "), value)
}

/// Member table of the enum a wrapper type is parameterized with
pub fn wrapped_enum_members(mem: &dyn MemoryIntrospection, wrapper: TypeId) -> Result<Vec<EnumMember>> {
    let argument = mem.template_argument(wrapper, 0)?;
    let enum_name = format!("{}::Enum", mem.type_name(argument)?);
    let enum_type = mem.find_type(&enum_name)?;
    mem.enum_members(enum_type)
}
