//! The session context.
//!
//! A `Session` owns everything that is shared between the scan, the two
//! stream consumers and the controller: the registry, display preferences,
//! the interaction lock, action indicators, the connect lifecycle and the
//! event sink. Every effective registry change is persisted and announced
//! from here, so no caller can forget either step.
//!
//! Stream consumers tag their updates with a run generation. Starting or
//! cancelling a run bumps the generation under the same lock that applies
//! updates, so an update from a superseded run is dropped even if its frame
//! was already decoded.

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::error::{SessionError, SessionResult};
use super::preferences::DisplayPreferences;
use crate::persist::Persistence;
use crate::registry::{
    FieldMap, PortId, PortRegistry, PortUpdate, RegistrySnapshot, SortDirection, SortSpec,
};
use crate::telemetry::{ActionIndicators, ConnectState, EventSink, LogLine, SessionEvent};

/// The two long-lived stream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// The connect consumer.
    Connect,
    /// The monitor consumer.
    Monitor,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Connect => write!(f, "connect"),
            StreamKind::Monitor => write!(f, "monitor"),
        }
    }
}

/// Where an update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A stream consumer run.
    Stream(StreamKind, u64),
    /// A one-shot request (scan, single-port refresh).
    Direct,
}

/// What applying one update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Fields were merged.
    Merged {
        /// Whether any value changed.
        changed: bool,
    },
    /// A removal was applied.
    Removed {
        /// Whether the record existed.
        existed: bool,
    },
    /// The originating run was superseded; nothing was applied.
    Stale,
}

/// Shared engine state.
pub struct Session {
    registry: PortRegistry,
    preferences: DisplayPreferences,
    sort: Option<SortSpec>,
    interaction_disabled: bool,
    actions: ActionIndicators,
    connect_state: ConnectState,
    connect_generation: u64,
    monitor_generation: u64,
    persistence: Persistence,
    events: EventSink,
}

impl Session {
    /// Open a session, restoring the registry and preferences.
    ///
    /// Missing or corrupt saved state yields an empty registry.
    pub fn open(persistence: Persistence, events: EventSink) -> Self {
        let registry = match persistence.load_registry() {
            Some(snapshot) => {
                let registry = PortRegistry::restore(&snapshot);
                info!("Restored {} saved ports", registry.len());
                registry
            }
            None => PortRegistry::new(),
        };
        let preferences = persistence.load_display_preferences();

        Self {
            registry,
            preferences,
            sort: None,
            interaction_disabled: false,
            actions: ActionIndicators::default(),
            connect_state: ConnectState::Idle,
            connect_generation: 0,
            monitor_generation: 0,
            persistence,
            events,
        }
    }

    /// The registry.
    pub fn registry(&self) -> &PortRegistry {
        &self.registry
    }

    /// Snapshot of the registry.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Produce a user-visible log line.
    pub fn log(&mut self, message: impl Into<String>, port: Option<&str>) {
        self.events.log(LogLine::now(message, port.map(str::to_string)));
    }

    /// Recent log lines, oldest first.
    pub fn log_history(&self) -> Vec<LogLine> {
        self.events.history().cloned().collect()
    }

    /// Whether a disconnect has locked interaction.
    pub fn interaction_disabled(&self) -> bool {
        self.interaction_disabled
    }

    /// Set the interaction lock.
    pub fn set_interaction_disabled(&mut self, disabled: bool) {
        if self.interaction_disabled != disabled {
            self.interaction_disabled = disabled;
            self.events.emit(SessionEvent::InteractionDisabledChanged { disabled });
        }
    }

    /// Current action indicators.
    pub fn actions(&self) -> ActionIndicators {
        self.actions
    }

    /// Replace the action indicators.
    pub fn set_actions(&mut self, actions: ActionIndicators) {
        if self.actions != actions {
            self.actions = actions;
            self.events.emit(SessionEvent::ActionsChanged { actions });
        }
    }

    /// Current connect lifecycle state.
    pub fn connect_state(&self) -> ConnectState {
        self.connect_state
    }

    /// Move the connect run `generation` to `state`.
    ///
    /// Ignored when `generation` is no longer the current connect run.
    pub fn set_connect_state(&mut self, generation: u64, state: ConnectState) -> bool {
        if generation != self.connect_generation || self.connect_state == state {
            return false;
        }
        debug!("Connect run {}: {:?} -> {:?}", generation, self.connect_state, state);
        self.connect_state = state;
        self.events.emit(SessionEvent::ConnectStateChanged { state });
        true
    }

    /// Start a new run of `kind`, superseding the previous one.
    pub fn begin_run(&mut self, kind: StreamKind) -> u64 {
        let generation = self.bump(kind);
        debug!("Started {} run {}", kind, generation);
        generation
    }

    /// Invalidate the current run of `kind` without starting another.
    pub fn cancel_run(&mut self, kind: StreamKind) {
        if kind == StreamKind::Connect && self.connect_state.is_in_flight() {
            self.connect_state = ConnectState::Cancelled;
            self.events.emit(SessionEvent::ConnectStateChanged {
                state: ConnectState::Cancelled,
            });
        }
        let generation = self.bump(kind);
        debug!("Cancelled {} runs before {}", kind, generation);
    }

    /// Whether `generation` is the current run of `kind`.
    pub fn is_current(&self, kind: StreamKind, generation: u64) -> bool {
        self.generation(kind) == generation
    }

    fn generation(&self, kind: StreamKind) -> u64 {
        match kind {
            StreamKind::Connect => self.connect_generation,
            StreamKind::Monitor => self.monitor_generation,
        }
    }

    fn bump(&mut self, kind: StreamKind) -> u64 {
        let slot = match kind {
            StreamKind::Connect => &mut self.connect_generation,
            StreamKind::Monitor => &mut self.monitor_generation,
        };
        *slot = slot.wrapping_add(1);
        *slot
    }

    fn accepts(&self, origin: Origin) -> bool {
        match origin {
            Origin::Stream(kind, generation) => self.is_current(kind, generation),
            Origin::Direct => true,
        }
    }

    /// Apply one decoded update.
    pub fn apply_update(&mut self, origin: Origin, update: PortUpdate) -> UpdateOutcome {
        if !self.accepts(origin) {
            debug!("Dropped stale update for {} from {:?}", update.port, origin);
            return UpdateOutcome::Stale;
        }

        if update.removed {
            let existed = self.registry.remove(&update.port);
            if existed {
                self.commit();
            }
            return UpdateOutcome::Removed { existed };
        }

        let changed = self.registry.merge(&update.port, update.fields);
        if changed {
            self.commit();
        }
        UpdateOutcome::Merged { changed }
    }

    /// Merge a batch of per-port results; one persistence write at most.
    ///
    /// Returns `None` when `origin` is stale, else how many records changed.
    pub fn merge_batch(&mut self, origin: Origin, batch: Vec<(PortId, FieldMap)>) -> Option<usize> {
        if !self.accepts(origin) {
            return None;
        }
        let mut changed = 0;
        for (port, fields) in batch {
            if self.registry.merge(&port, fields) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.commit();
        }
        Some(changed)
    }

    /// Union-merge scanned ids; existing records are untouched.
    ///
    /// Returns how many records were created.
    pub fn merge_ports(&mut self, ids: &[PortId]) -> usize {
        let created = ids
            .iter()
            .filter(|id| self.registry.merge(id, FieldMap::new()))
            .count();
        if created > 0 {
            self.commit();
        }
        created
    }

    /// Remove the listed records.
    pub fn remove_ports(&mut self, ids: &[PortId]) -> usize {
        let removed = self.registry.remove_many(ids);
        if removed > 0 {
            self.commit();
        }
        removed
    }

    /// Remove every record and the persisted snapshot.
    pub fn clear(&mut self) -> usize {
        let removed = self.registry.remove_all();
        self.persistence.clear_registry();
        self.events.emit(SessionEvent::RegistryChanged {
            snapshot: self.registry.snapshot(),
        });
        removed
    }

    fn commit(&mut self) {
        let snapshot = self.registry.snapshot();
        self.persistence.save_registry(&snapshot);
        self.events.emit(SessionEvent::RegistryChanged { snapshot });
    }

    /// Sort the display by `key`, toggling direction when re-sorting the same key.
    pub fn sort_by(&mut self, key: &str) -> SessionResult<SortSpec> {
        if self.interaction_disabled {
            return Err(SessionError::InteractionDisabled("sort"));
        }
        if key.is_empty() {
            return Err(SessionError::EmptyColumnKey);
        }
        let direction = match &self.sort {
            Some(current) if current.key == key => current.direction.flip(),
            _ => SortDirection::Ascending,
        };
        let sort = SortSpec {
            key: key.to_string(),
            direction,
        };
        self.sort = Some(sort.clone());
        Ok(sort)
    }

    /// Current display sort.
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Ids in display order: sorted if a sort is set, else first-seen.
    pub fn display_ids(&self) -> Vec<PortId> {
        match &self.sort {
            Some(sort) => self.registry.sorted_ids(sort),
            None => self.registry.known_ids(),
        }
    }

    /// Display preferences.
    pub fn preferences(&self) -> &DisplayPreferences {
        &self.preferences
    }

    /// Visible columns for the current registry.
    pub fn visible_columns(&self) -> Vec<String> {
        self.preferences.visible_columns(&self.registry.snapshot())
    }

    /// Move a column; persisted when it changed.
    pub fn move_column(&mut self, key: &str, to: usize) -> SessionResult<bool> {
        self.edit_preferences("reorder columns", key, |p| p.move_column(key, to))
    }

    /// Hide or show a column; persisted when it changed.
    pub fn set_column_hidden(&mut self, key: &str, hidden: bool) -> SessionResult<bool> {
        self.edit_preferences("change column visibility", key, |p| p.set_hidden(key, hidden))
    }

    fn edit_preferences(
        &mut self,
        operation: &'static str,
        key: &str,
        edit: impl FnOnce(&mut DisplayPreferences) -> bool,
    ) -> SessionResult<bool> {
        if self.interaction_disabled {
            return Err(SessionError::InteractionDisabled(operation));
        }
        if key.is_empty() {
            return Err(SessionError::EmptyColumnKey);
        }
        let changed = edit(&mut self.preferences);
        if changed {
            self.persistence.save_display_preferences(&self.preferences);
        }
        Ok(changed)
    }

    /// Final write of registry and preferences.
    pub fn flush(&self) -> bool {
        let registry = self.persistence.save_registry(&self.registry.snapshot());
        let prefs = self.persistence.save_display_preferences(&self.preferences);
        registry && prefs
    }
}
