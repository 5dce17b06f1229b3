//! Lifecycle observers for chain execution.
//!
//! The driver emits a [`ChainEvent`] at each chain and link transition.
//! Observers registered on [`ChainHooks`] receive every event; they match on
//! the variants they care about.
//!
//! ```
//! use conduit_engine::hooks::{ChainEvent, ChainHooks};
//!
//! let hooks = ChainHooks::new();
//! hooks
//!     .register_observer("parked-logger", |event: &ChainEvent| {
//!         if let ChainEvent::ChoiceParked { key, .. } = event {
//!             tracing::info!(%key, "waiting for operator");
//!         }
//!     })
//!     .unwrap();
//! ```

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use conduit_workflow::{ChainId, JobStatus, LinkId};
use parking_lot::RwLock;

use crate::error::HookRegistrationError;
use crate::pending::PendingKey;
use crate::unit::UnitId;

/// Events emitted by the chain driver.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Chain-Level Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A chain started.
    ChainStart {
        /// The unit.
        unit_id: UnitId,
        /// The chain.
        chain_id: ChainId,
    },

    /// A driver run ended with the chain complete.
    ChainComplete {
        /// The unit.
        unit_id: UnitId,
        /// Links executed during this run.
        links_executed: usize,
        /// Duration of this run.
        duration: Duration,
    },

    /// A driver run ended with the chain failed.
    ChainFailed {
        /// The unit.
        unit_id: UnitId,
        /// The link where the chain failed.
        link_id: LinkId,
        /// Why.
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Link Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A link started.
    LinkStart {
        /// The unit.
        unit_id: UnitId,
        /// The link.
        link_id: LinkId,
        /// Name of the manager handling the link.
        manager: &'static str,
    },

    /// A link finished.
    LinkComplete {
        /// The unit.
        unit_id: UnitId,
        /// The link.
        link_id: LinkId,
        /// Status recorded for the job.
        job_status: JobStatus,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Choice Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A unit was parked for an operator decision.
    ChoiceParked {
        /// Key to submit against.
        key: PendingKey,
        /// Number of options offered.
        choice_count: usize,
    },

    /// An operator decision was accepted.
    ChoiceResolved {
        /// The key.
        key: PendingKey,
        /// The accepted selector.
        selector: String,
        /// Agent recorded for the operator.
        agent: Option<String>,
    },
}

impl ChainEvent {
    /// Returns the variant name, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ChainEvent::ChainStart { .. } => "chain_start",
            ChainEvent::ChainComplete { .. } => "chain_complete",
            ChainEvent::ChainFailed { .. } => "chain_failed",
            ChainEvent::LinkStart { .. } => "link_start",
            ChainEvent::LinkComplete { .. } => "link_complete",
            ChainEvent::ChoiceParked { .. } => "choice_parked",
            ChainEvent::ChoiceResolved { .. } => "choice_resolved",
        }
    }
}

type Observer = Arc<dyn Fn(&ChainEvent) + Send + Sync>;

struct ObserverEntry {
    name: String,
    observer: Observer,
}

/// Registry of event observers.
///
/// Uses a [`RwLock`] so observers can be added while chains are running.
/// Observers run synchronously on the driver's task and should be quick.
/// The lock is released before observers run, so an observer may register
/// or unregister observers; the change applies from the next event.
#[derive(Default)]
pub struct ChainHooks {
    observers: RwLock<Vec<ObserverEntry>>,
}

impl fmt::Debug for ChainHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .observers
            .read()
            .iter()
            .map(|entry| entry.name.clone())
            .collect();
        f.debug_struct("ChainHooks")
            .field("observers", &names)
            .finish()
    }
}

impl ChainHooks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer under a unique name.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if the name is taken.
    pub fn register_observer<F>(
        &self,
        name: impl Into<String>,
        observer: F,
    ) -> Result<(), HookRegistrationError>
    where
        F: Fn(&ChainEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        let mut observers = self.observers.write();
        if observers.iter().any(|entry| entry.name == name) {
            return Err(HookRegistrationError::DuplicateName(name));
        }
        observers.push(ObserverEntry {
            name,
            observer: Arc::new(observer),
        });
        Ok(())
    }

    /// Removes an observer. Returns true if it existed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|entry| entry.name != name);
        observers.len() != before
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns true if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Delivers an event to every observer in registration order.
    pub fn emit(&self, event: &ChainEvent) {
        let observers: Vec<Observer> = self
            .observers
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.observer))
            .collect();
        for observer in observers {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn start_event() -> ChainEvent {
        ChainEvent::ChainStart {
            unit_id: UnitId::new_v4(),
            chain_id: ChainId::from("c"),
        }
    }

    #[test]
    fn observers_receive_events() {
        let hooks = ChainHooks::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        hooks
            .register_observer("counter", move |_event: &ChainEvent| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        hooks.emit(&start_event());
        hooks.emit(&start_event());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let hooks = ChainHooks::new();
        hooks.register_observer("a", |_: &ChainEvent| {}).unwrap();
        assert_eq!(
            hooks.register_observer("a", |_: &ChainEvent| {}),
            Err(HookRegistrationError::DuplicateName("a".to_owned()))
        );
        assert_eq!(hooks.len(), 1);
    }

    #[test]
    fn unregister_removes_observer() {
        let hooks = ChainHooks::new();
        hooks.register_observer("a", |_: &ChainEvent| {}).unwrap();
        assert!(hooks.unregister("a"));
        assert!(!hooks.unregister("a"));
        assert!(hooks.is_empty());
    }

    #[test]
    fn observer_can_unregister_itself() {
        let hooks = Arc::new(ChainHooks::new());
        let count = Arc::new(AtomicUsize::new(0));
        let registry = Arc::downgrade(&hooks);
        let seen = Arc::clone(&count);
        hooks
            .register_observer("once", move |_event: &ChainEvent| {
                seen.fetch_add(1, Ordering::SeqCst);
                if let Some(hooks) = registry.upgrade() {
                    hooks.unregister("once");
                }
            })
            .unwrap();

        hooks.emit(&start_event());
        hooks.emit(&start_event());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(hooks.is_empty());
    }

    #[test]
    fn event_names() {
        assert_eq!(start_event().name(), "chain_start");
    }
}
