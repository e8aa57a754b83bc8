//! Port registry: the canonical port-state mapping.
//!
//! Records are keyed by an opaque port id and hold an open map of scalar
//! fields. The registry is plain synchronous data; sharing, persistence and
//! change notification live in [`crate::session`].
//!
//! # Invariants
//!
//! - No two records share an id.
//! - `fields["port"]` always equals the record's id, re-asserted on every merge.
//! - Iteration follows first-seen order, which is not the display order.

mod record;
mod snapshot;
mod store;

pub use record::{
    FieldMap, FieldValue, PORT_FIELD, PortId, PortRecord, PortUpdate, REMOVED_FIELD,
    fields_from_json,
};
pub use snapshot::RegistrySnapshot;
pub use store::{PortRegistry, SortDirection, SortSpec};
