//! Immutable registry snapshots.
//!
//! A snapshot serializes as a JSON object keyed by port id:
//!
//! ```json
//! {"COM1":{"port":"COM1","signal":"-65"},"COM3":{"port":"COM3"}}
//! ```
//!
//! Key order is the registry's first-seen order, and deserialization keeps
//! the document order so a restored registry lists ports as before.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::record::{FieldMap, PortId, PortRecord};

/// Ordered, immutable copy of the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    records: Vec<PortRecord>,
}

impl RegistrySnapshot {
    pub(crate) fn from_records(records: Vec<PortRecord>) -> Self {
        Self { records }
    }

    /// Records in first-seen order.
    #[must_use]
    pub fn records(&self) -> &[PortRecord] {
        &self.records
    }

    /// Ids in first-seen order.
    #[must_use]
    pub fn ids(&self) -> Vec<PortId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Look up one record.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PortRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for RegistrySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.id, &record.fields)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RegistrySnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = RegistrySnapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of port id to field map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut records: Vec<PortRecord> = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, fields)) = access.next_entry::<PortId, FieldMap>()? {
                    // Later duplicates win, position of the first is kept.
                    if let Some(existing) = records.iter_mut().find(|r| r.id == id) {
                        existing.fields = fields;
                    } else {
                        records.push(PortRecord { id, fields });
                    }
                }
                Ok(RegistrySnapshot { records })
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}
