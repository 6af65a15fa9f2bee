//! memlens core - value reconstruction for debugger display
//!
//! Turns the raw memory of engine containers, strings and tagged unions into
//! the logical values a developer expects to see while a program is paused.
//!
//! # Architecture
//!
//! - [`MemoryIntrospection`] - read-only capability supplied by the host debugger
//! - [`decode`] - reconstruction algorithms (storage modes, sequences, hash slots, trees, variants)
//! - [`providers`] - one synthetic-children provider per recognized type
//! - [`FormatterRegistry`] - type-name patterns bound to providers
//! - [`DisplayAdapter`] / [`InspectSession`] - the display protocol with fault isolation
//! - [`Snapshot`] - an in-memory host, for tests and offline inspection

pub mod config;
pub mod decode;
pub mod display;
pub mod error;
pub mod introspect;
pub mod providers;
pub mod registry;
pub mod session;
pub mod snapshot;
#[cfg(test)]
pub mod test_utils;

pub use config::{DisplayConfig, InspectorConfig, Limits};
pub use display::{DisplayAdapter, DisplayNode, NodeValue, RenderedNode};
pub use error::{InspectError, Result};
pub use introspect::{
    Address, EnumMember, MemoryIntrospection, ScalarEncoding, TypeId, TypeKind, ValueHandle,
};
pub use providers::{Provider, ProviderContext, ProviderKind, SyntheticProvider};
pub use registry::{Binding, FormatterRegistry, TypePattern};
pub use session::InspectSession;
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotError, SnapshotFile};
