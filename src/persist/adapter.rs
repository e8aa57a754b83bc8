//! Typed save/restore of the registry and display preferences.
//!
//! All saves are best-effort: a failure is logged and reported as `false`,
//! never propagated, so the in-memory registry keeps working. All loads treat
//! missing or unparsable data as absent.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{PersistError, PersistResult};
use super::store::{MemoryStateStore, StateStore};
use crate::registry::RegistrySnapshot;
use crate::session::DisplayPreferences;

/// Storage key of the registry snapshot.
pub const REGISTRY_KEY: &str = "portInfo";

/// Storage key of the column order.
pub const COLUMN_ORDER_KEY: &str = "columnOrder";

/// Storage key of the hidden column set.
pub const HIDDEN_COLUMNS_KEY: &str = "hiddenCols";

/// Persistence adapter over a [`StateStore`].
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn StateStore>,
}

impl Persistence {
    /// Wrap a store.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Adapter over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStateStore::new()))
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Write the registry snapshot.
    pub fn save_registry(&self, snapshot: &RegistrySnapshot) -> bool {
        self.save(REGISTRY_KEY, snapshot)
    }

    /// Read the registry snapshot.
    pub fn load_registry(&self) -> Option<RegistrySnapshot> {
        self.load(REGISTRY_KEY)
    }

    /// Delete the persisted registry snapshot.
    pub fn clear_registry(&self) -> bool {
        match self.store.remove(REGISTRY_KEY) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to clear saved port state: {}", e);
                false
            }
        }
    }

    /// Write column order and hidden columns.
    pub fn save_display_preferences(&self, prefs: &DisplayPreferences) -> bool {
        let order = self.save(COLUMN_ORDER_KEY, &prefs.column_order);
        let hidden = self.save(HIDDEN_COLUMNS_KEY, &prefs.hidden_columns);
        order && hidden
    }

    /// Read display preferences; each part defaults independently.
    pub fn load_display_preferences(&self) -> DisplayPreferences {
        DisplayPreferences {
            column_order: self.load(COLUMN_ORDER_KEY).unwrap_or_default(),
            hidden_columns: self.load(HIDDEN_COLUMNS_KEY).unwrap_or_default(),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save {}: {}", key, e);
                false
            }
        }
    }

    fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PersistResult<()> {
        let json = serde_json::to_string(value).map_err(|e| PersistError::Codec {
            key: key.to_string(),
            source: e,
        })?;
        self.store.write(key, &json)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring saved {}: {}", key, e);
                None
            }
        }
    }

    fn try_load<T: DeserializeOwned>(&self, key: &str) -> PersistResult<Option<T>> {
        let Some(json) = self.store.read(key)? else {
            debug!("No saved {}", key);
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| PersistError::Codec {
                key: key.to_string(),
                source: e,
            })
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}
