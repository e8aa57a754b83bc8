//! Durable local state.
//!
//! Three JSON blobs are kept: the registry snapshot (`portInfo`), the column
//! order (`columnOrder`) and the hidden column set (`hiddenCols`). They live
//! in a [`StateStore`]: files on disk by default, memory for tests and
//! `--ephemeral` runs.

mod adapter;
mod error;
mod store;

pub use adapter::{COLUMN_ORDER_KEY, HIDDEN_COLUMNS_KEY, Persistence, REGISTRY_KEY};
pub use error::{PersistError, PersistResult};
pub use store::{FileStateStore, MemoryStateStore, StateStore};
