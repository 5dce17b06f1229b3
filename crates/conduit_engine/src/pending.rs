//! The pending-choice registry.
//!
//! Units waiting for an operator are parked in [`PendingChoices`], keyed by
//! the (link, unit) pair. The table is guarded by a single
//! [`parking_lot::Mutex`] that is held only inside each method; no method
//! awaits, so the guard never spans a suspension point.
//!
//! Removal is exactly-once: of two callers racing to
//! [`remove`](PendingChoices::remove) or [`take_if`](PendingChoices::take_if)
//! the same key, one gets the entry and the other gets
//! [`RegistryError::NotFound`].

use core::fmt;
use core::str::FromStr;

use conduit_workflow::LinkId;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RegistryError;
use crate::manager::PendingChoice;
use crate::render::PendingChoiceView;
use crate::unit::UnitId;

// ─────────────────────────────────────────────────────────────────────────────
// PendingKey
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies a parked decision: one unit at one link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingKey {
    /// The choice-point link.
    pub link_id: LinkId,
    /// The parked unit.
    pub unit_id: UnitId,
}

impl PendingKey {
    /// Creates a key.
    #[must_use]
    pub fn new(link_id: LinkId, unit_id: UnitId) -> Self {
        Self { link_id, unit_id }
    }
}

/// Formats as `link:unit`.
impl fmt::Display for PendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.link_id, self.unit_id)
    }
}

/// A string that is not a `link:unit` pending key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pending key `{0}`")]
pub struct ParsePendingKeyError(String);

impl FromStr for PendingKey {
    type Err = ParsePendingKeyError;

    // Unit ids never contain ':', so split from the right.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (link, unit) = s
            .rsplit_once(':')
            .ok_or_else(|| ParsePendingKeyError(s.to_owned()))?;
        if link.is_empty() {
            return Err(ParsePendingKeyError(s.to_owned()));
        }
        let unit_id = unit
            .parse::<UnitId>()
            .map_err(|_| ParsePendingKeyError(s.to_owned()))?;
        Ok(Self::new(LinkId::from(link), unit_id))
    }
}

impl Serialize for PendingKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PendingKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PendingChoices
// ─────────────────────────────────────────────────────────────────────────────

/// Concurrent table of parked decisions, in registration order.
pub struct PendingChoices<M = PendingChoice> {
    entries: Mutex<IndexMap<PendingKey, M>>,
}

impl<M> Default for PendingChoices<M> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }
}

impl<M> fmt::Debug for PendingChoices<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingChoices")
            .field("len", &self.len())
            .finish()
    }
}

impl<M> PendingChoices<M> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `entry` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if the key is taken;
    /// the existing entry is left untouched.
    pub fn register(&self, key: PendingKey, entry: M) -> Result<(), RegistryError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return Err(RegistryError::DuplicateRegistration(key));
        }
        entries.insert(key, entry);
        Ok(())
    }

    /// Removes and returns the entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no entry exists.
    pub fn remove(&self, key: &PendingKey) -> Result<M, RegistryError> {
        self.entries
            .lock()
            .shift_remove(key)
            .ok_or_else(|| RegistryError::NotFound(key.clone()))
    }

    /// Removes the entry only if `check` accepts it, in one critical section.
    ///
    /// Returns `Ok(None)` when `check` rejects the entry, which stays parked.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no entry exists.
    pub fn take_if<F>(&self, key: &PendingKey, check: F) -> Result<Option<M>, RegistryError>
    where
        F: FnOnce(&M) -> bool,
    {
        let mut entries = self.entries.lock();
        let entry = entries
            .get(key)
            .ok_or_else(|| RegistryError::NotFound(key.clone()))?;
        if !check(entry) {
            return Ok(None);
        }
        Ok(entries.shift_remove(key))
    }

    /// Runs `f` against the entry without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no entry exists.
    pub fn with_entry<R, F>(&self, key: &PendingKey, f: F) -> Result<R, RegistryError>
    where
        F: FnOnce(&M) -> R,
    {
        self.entries
            .lock()
            .get(key)
            .map(f)
            .ok_or_else(|| RegistryError::NotFound(key.clone()))
    }

    /// Returns true if an entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &PendingKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Returns the keys in registration order.
    #[must_use]
    pub fn keys(&self) -> Vec<PendingKey> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Number of parked entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Empties the table, returning every entry in registration order.
    pub fn drain(&self) -> Vec<(PendingKey, M)> {
        self.entries.lock().drain(..).collect()
    }
}

impl PendingChoices<PendingChoice> {
    /// Returns a read-only view of one parked decision.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no entry exists.
    pub fn lookup(&self, key: &PendingKey) -> Result<PendingChoiceView, RegistryError> {
        self.with_entry(key, |entry| entry.view(key))
    }

    /// Returns views of every parked decision in registration order.
    #[must_use]
    pub fn views(&self) -> Vec<PendingChoiceView> {
        self.entries
            .lock()
            .iter()
            .map(|(key, entry)| entry.view(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn key(link: &str) -> PendingKey {
        PendingKey::new(LinkId::from(link), UnitId::new_v4())
    }

    #[test]
    fn key_round_trips_through_display() {
        let original = key("ns:link");
        let parsed: PendingKey = original.to_string().parse().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn key_rejects_garbage() {
        assert!("no-separator".parse::<PendingKey>().is_err());
        assert!("link:not-a-uuid".parse::<PendingKey>().is_err());
        assert!(format!(":{}", UnitId::new_v4()).parse::<PendingKey>().is_err());
    }

    #[test]
    fn register_rejects_duplicates() {
        let registry = PendingChoices::new();
        let k = key("l");
        registry.register(k.clone(), 1).unwrap();
        assert_eq!(
            registry.register(k.clone(), 2),
            Err(RegistryError::DuplicateRegistration(k.clone()))
        );
        assert_eq!(registry.remove(&k), Ok(1));
    }

    #[test]
    fn remove_missing_is_not_found() {
        let registry: PendingChoices<u8> = PendingChoices::new();
        let k = key("l");
        assert_eq!(registry.remove(&k), Err(RegistryError::NotFound(k)));
    }

    #[test]
    fn take_if_leaves_rejected_entry() {
        let registry = PendingChoices::new();
        let k = key("l");
        registry.register(k.clone(), 5).unwrap();

        assert_eq!(registry.take_if(&k, |v| *v > 10), Ok(None));
        assert!(registry.contains(&k));
        assert_eq!(registry.take_if(&k, |v| *v == 5), Ok(Some(5)));
        assert!(registry.is_empty());
    }

    #[test]
    fn keys_and_drain_keep_registration_order() {
        let registry = PendingChoices::new();
        let keys: Vec<_> = ["c", "a", "b"].into_iter().map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            registry.register(k.clone(), i).unwrap();
        }
        registry.remove(&keys[1]).unwrap();

        assert_eq!(registry.keys(), vec![keys[0].clone(), keys[2].clone()]);
        let drained: Vec<_> = registry.drain().into_iter().map(|(_, v)| v).collect();
        assert_eq!(drained, vec![0, 2]);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn concurrent_removal_has_one_winner() {
        for _ in 0..50 {
            let registry = Arc::new(PendingChoices::new());
            let k = key("race");
            registry.register(k.clone(), ()).unwrap();

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    let k = k.clone();
                    thread::spawn(move || registry.remove(&k).is_ok())
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }
}
