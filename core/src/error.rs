//! Inspection error taxonomy
//!
//! Every provider operation returns [`Result`]. Errors never escape to the host:
//! the display adapter turns them into placeholder text.

use crate::introspect::Address;

/// Error raised while reconstructing a displayed value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InspectError {
    /// A named member could not be located
    #[error("member `{0}` not found")]
    UnavailableField(String),

    /// A structural member index could not be located
    #[error("member #{0} not found")]
    UnavailableMember(usize),

    /// Memory at the given range is not readable
    #[error("memory at {address:#x}..+{len} is not readable")]
    UnavailableMemory { address: Address, len: usize },

    /// The handle carries no address (e.g. a register or optimized-out value)
    #[error("value has no address")]
    InvalidAddress,

    /// A scan or traversal hit its step cap
    #[error("step bound of {0} exceeded")]
    BoundExceeded(usize),

    /// A type name did not resolve to a known type
    #[error("type `{0}` could not be resolved")]
    UnresolvableType(String),

    /// A count or length field is too large to be genuine
    #[error("implausible {what}: {value}")]
    ImplausibleValue { what: &'static str, value: u64 },

    /// A pointer operation was requested on a non-pointer type
    #[error("`{0}` is not a pointer type")]
    NotAPointer(String),

    /// A child index past the end of a decoded view
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The type of a value does not have the expected shape
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A provider was queried without a successful update
    #[error("provider queried before a successful update")]
    NotUpdated,

    /// Summaries nested deeper than the session allows
    #[error("summary nesting deeper than {0}")]
    NestingTooDeep(usize),
}

/// Result alias for inspection operations
pub type Result<T> = std::result::Result<T, InspectError>;
