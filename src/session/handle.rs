//! Shared handle to the session.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use super::context::Session;
use crate::registry::RegistrySnapshot;
use crate::telemetry::SessionEvent;

/// Cheaply cloneable handle to one [`Session`].
///
/// The lock is only taken inside [`SessionHandle::with`], which runs a
/// synchronous closure, so it can never be held across an `.await`.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    /// Share `session`.
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // A panic inside `with` leaves the session usable; every mutation is
        // complete before control returns to the caller.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the registry.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.with(|s| s.snapshot())
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.with(|s| s.subscribe())
    }

    /// Produce a user-visible log line.
    pub fn log(&self, message: impl Into<String>, port: Option<&str>) {
        self.with(|s| s.log(message, port));
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}
