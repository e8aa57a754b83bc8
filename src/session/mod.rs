//! Session context shared by the engine's components.
//!
//! There are no process-wide singletons: the session is built once at
//! startup from persisted state and handed to every component through a
//! [`SessionHandle`]. Dropping the controller does not tear it down;
//! [`crate::controller::Controller::shutdown`] performs the final write.

mod context;
mod error;
mod handle;
mod preferences;

pub use context::{Origin, Session, StreamKind, UpdateOutcome};
pub use error::{SessionError, SessionResult};
pub use handle::SessionHandle;
pub use preferences::DisplayPreferences;
