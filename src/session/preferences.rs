//! Display preferences: column order and hidden columns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::registry::{PORT_FIELD, RegistrySnapshot};

/// User-chosen column layout, persisted independently of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPreferences {
    /// Preferred column order. Columns not listed follow in key order.
    pub column_order: Vec<String>,
    /// Columns not shown.
    pub hidden_columns: BTreeSet<String>,
}

impl DisplayPreferences {
    /// Move `key` to position `to` (clamped). Unlisted keys are inserted.
    ///
    /// Returns whether the order changed.
    pub fn move_column(&mut self, key: &str, to: usize) -> bool {
        let before = self.column_order.clone();
        self.column_order.retain(|k| k != key);
        let to = to.min(self.column_order.len());
        self.column_order.insert(to, key.to_string());
        self.column_order != before
    }

    /// Hide or show `key`. Returns whether anything changed.
    pub fn set_hidden(&mut self, key: &str, hidden: bool) -> bool {
        if hidden {
            self.hidden_columns.insert(key.to_string())
        } else {
            self.hidden_columns.remove(key)
        }
    }

    /// Whether `key` is hidden.
    #[must_use]
    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden_columns.contains(key)
    }

    /// Visible columns for a snapshot.
    ///
    /// Ordered columns present in the snapshot come first, then `port`, then
    /// every other field key in lexical order.
    #[must_use]
    pub fn visible_columns(&self, snapshot: &RegistrySnapshot) -> Vec<String> {
        let present: BTreeSet<&str> = snapshot
            .records()
            .iter()
            .flat_map(|r| r.fields.keys().map(String::as_str))
            .collect();

        let mut columns: Vec<String> = self
            .column_order
            .iter()
            .filter(|k| present.contains(k.as_str()))
            .cloned()
            .collect();

        if present.contains(PORT_FIELD) && !columns.iter().any(|k| k == PORT_FIELD) {
            columns.push(PORT_FIELD.to_string());
        }
        for key in present {
            if !columns.iter().any(|k| k == key) {
                columns.push(key.to_string());
            }
        }

        columns.retain(|k| !self.is_hidden(k));
        columns
    }
}
