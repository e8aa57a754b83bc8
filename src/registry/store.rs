//! The canonical port registry.
//!
//! Only `merge`, `remove`, `remove_many` and `remove_all` mutate it. Every
//! mutator reports whether anything actually changed so callers can skip
//! redundant persistence writes and change notifications.

use std::collections::HashMap;

use super::record::{FieldMap, FieldValue, PORT_FIELD, PortId, PortRecord};
use super::snapshot::RegistrySnapshot;

/// Direction of a display sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// A to Z.
    #[default]
    Ascending,
    /// Z to A.
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

/// A display sort on one field key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field key to compare.
    pub key: String,
    /// Direction.
    pub direction: SortDirection,
}

/// Mapping of port id to record, iterated in first-seen order.
#[derive(Debug, Default)]
pub struct PortRegistry {
    records: HashMap<PortId, PortRecord>,
    /// First-seen order of the ids in `records`.
    order: Vec<PortId>,
}

impl PortRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a snapshot, re-asserting the `port` field.
    #[must_use]
    pub fn restore(snapshot: &RegistrySnapshot) -> Self {
        let mut registry = Self::new();
        for record in snapshot.records() {
            registry.merge(&record.id, record.fields.clone());
        }
        registry
    }

    /// Shallow-merge `partial` into the record for `id`, creating it if needed.
    ///
    /// Returns `true` when the record was created or any field's value
    /// changed. The `port` field is always reset to `id`.
    pub fn merge(&mut self, id: &str, partial: FieldMap) -> bool {
        let mut changed = false;

        if !self.records.contains_key(id) {
            self.order.push(id.to_string());
            self.records.insert(id.to_string(), PortRecord::new(id));
            changed = true;
        }
        let Some(record) = self.records.get_mut(id) else {
            return changed;
        };

        for (key, value) in partial {
            if key == PORT_FIELD {
                continue;
            }
            if record.fields.get(&key) != Some(&value) {
                record.fields.insert(key, value);
                changed = true;
            }
        }

        let port_value = FieldValue::Text(id.to_string());
        if record.fields.get(PORT_FIELD) != Some(&port_value) {
            record.fields.insert(PORT_FIELD.to_string(), port_value);
            changed = true;
        }

        changed
    }

    /// Delete the record for `id`. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.records.remove(id).is_some() {
            self.order.retain(|known| known != id);
            true
        } else {
            false
        }
    }

    /// Delete every listed record. Returns how many existed.
    pub fn remove_many<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.records.remove(id.as_ref()).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.order.retain(|known| self.records.contains_key(known));
        }
        removed
    }

    /// Delete everything. Returns how many records existed.
    pub fn remove_all(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        self.order.clear();
        removed
    }

    /// Immutable ordered copy of every record.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::from_records(
            self.order
                .iter()
                .filter_map(|id| self.records.get(id).cloned())
                .collect(),
        )
    }

    /// Ids in first-seen order.
    #[must_use]
    pub fn known_ids(&self) -> Vec<PortId> {
        self.order.clone()
    }

    /// Look up one record.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PortRecord> {
        self.records.get(id)
    }

    /// Whether `id` is known.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids ordered for display by one field.
    ///
    /// Comparison is case-insensitive on the text form; missing values sort
    /// as empty strings. Ties keep first-seen order.
    #[must_use]
    pub fn sorted_ids(&self, sort: &SortSpec) -> Vec<PortId> {
        let key_of = |id: &PortId| -> String {
            if sort.key == PORT_FIELD {
                return id.to_lowercase();
            }
            self.records
                .get(id)
                .and_then(|r| r.get(&sort.key))
                .map(|v| v.as_text().to_lowercase())
                .unwrap_or_default()
        };

        let mut ids = self.order.clone();
        ids.sort_by(|a, b| {
            let ord = key_of(a).cmp(&key_of(b));
            match sort.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_merge_creates_record() {
        let mut registry = PortRegistry::new();
        assert!(registry.merge("COM1", fields(&[("signal", "-70")])));
        let record = registry.get("COM1").unwrap();
        assert_eq!(record.get("signal"), Some(&FieldValue::from("-70")));
        assert_eq!(record.get(PORT_FIELD), Some(&FieldValue::from("COM1")));
    }

    #[test]
    fn test_merge_same_value_is_not_a_change() {
        let mut registry = PortRegistry::new();
        assert!(registry.merge("COM1", fields(&[("signal", "-70")])));
        assert!(!registry.merge("COM1", fields(&[("signal", "-70")])));
        assert!(!registry.merge("COM1", FieldMap::new()));
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut registry = PortRegistry::new();
        registry.merge("COM1", fields(&[("signal", "-70"), ("imei", "123")]));
        assert!(registry.merge("COM1", fields(&[("signal", "-65")])));
        let record = registry.get("COM1").unwrap();
        assert_eq!(record.get("signal"), Some(&FieldValue::from("-65")));
        assert_eq!(record.get("imei"), Some(&FieldValue::from("123")));
    }

    #[test]
    fn test_port_field_cannot_be_overwritten() {
        let mut registry = PortRegistry::new();
        registry.merge("COM1", fields(&[("port", "COM7"), ("signal", "-70")]));
        registry.merge("COM1", fields(&[("port", "OTHER")]));
        assert_eq!(
            registry.get("COM1").unwrap().get(PORT_FIELD),
            Some(&FieldValue::from("COM1"))
        );
    }

    #[test]
    fn test_port_invariant_over_many_merges() {
        let mut registry = PortRegistry::new();
        let ids = ["COM1", "COM2", "COM3"];
        for round in 0..20 {
            let id = ids[round % ids.len()];
            let other = ids[(round + 1) % ids.len()];
            registry.merge(id, fields(&[("port", other), ("n", round.to_string().as_str())]));
            for record in registry.snapshot().records() {
                assert_eq!(record.get(PORT_FIELD), Some(&FieldValue::Text(record.id.clone())));
            }
        }
    }

    #[test]
    fn test_known_ids_first_seen_order() {
        let mut registry = PortRegistry::new();
        registry.merge("COM3", FieldMap::new());
        registry.merge("COM1", FieldMap::new());
        registry.merge("COM3", fields(&[("signal", "-1")]));
        assert_eq!(registry.known_ids(), vec!["COM3", "COM1"]);
    }

    #[test]
    fn test_remove() {
        let mut registry = PortRegistry::new();
        registry.merge("COM1", FieldMap::new());
        assert!(registry.remove("COM1"));
        assert!(!registry.remove("COM1"));
        assert!(registry.known_ids().is_empty());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_remove_many_and_all() {
        let mut registry = PortRegistry::new();
        for id in ["COM1", "COM2", "COM3"] {
            registry.merge(id, FieldMap::new());
        }
        assert_eq!(registry.remove_many(&["COM1", "COM9", "COM3"]), 2);
        assert_eq!(registry.known_ids(), vec!["COM2"]);
        assert_eq!(registry.remove_all(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_readd_after_remove_goes_last() {
        let mut registry = PortRegistry::new();
        registry.merge("COM1", FieldMap::new());
        registry.merge("COM2", FieldMap::new());
        registry.remove("COM1");
        registry.merge("COM1", FieldMap::new());
        assert_eq!(registry.known_ids(), vec!["COM2", "COM1"]);
    }

    #[test]
    fn test_restore_reasserts_port_field() {
        let snapshot: RegistrySnapshot =
            serde_json::from_str(r#"{"COM1":{"port":"BOGUS","signal":"-65"},"COM3":{}}"#).unwrap();
        let registry = PortRegistry::restore(&snapshot);
        assert_eq!(registry.known_ids(), vec!["COM1", "COM3"]);
        assert_eq!(
            registry.get("COM1").unwrap().get(PORT_FIELD),
            Some(&FieldValue::from("COM1"))
        );
        assert_eq!(
            registry.get("COM3").unwrap().get(PORT_FIELD),
            Some(&FieldValue::from("COM3"))
        );
    }

    #[test]
    fn test_sorted_ids() {
        let mut registry = PortRegistry::new();
        registry.merge("COM2", fields(&[("operator", "beta")]));
        registry.merge("COM1", fields(&[("operator", "Alpha")]));
        registry.merge("COM3", FieldMap::new());

        let mut sort = SortSpec {
            key: "operator".to_string(),
            direction: SortDirection::Ascending,
        };
        assert_eq!(registry.sorted_ids(&sort), vec!["COM3", "COM1", "COM2"]);

        sort.direction = sort.direction.flip();
        assert_eq!(registry.sorted_ids(&sort), vec!["COM2", "COM1", "COM3"]);

        sort.key = PORT_FIELD.to_string();
        assert_eq!(registry.sorted_ids(&sort), vec!["COM3", "COM2", "COM1"]);

        // Display sort never touches first-seen order.
        assert_eq!(registry.known_ids(), vec!["COM2", "COM1", "COM3"]);
    }
}
