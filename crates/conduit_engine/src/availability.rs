//! Filtering of chain choices by installed capabilities.
//!
//! Some chains only make sense when an optional component is installed (a
//! remote upload target, a storage backend). [`ChoiceAvailability`] decides
//! whether a chain is offered at a given choice point.

use conduit_workflow::{Chain, ChainId, Link};
use hashbrown::{HashMap, HashSet};

/// Decides whether a chain is offered at a chain-choice link.
pub trait ChoiceAvailability: Send + Sync {
    /// Returns true if `chain` may be offered at `link`.
    fn is_available(&self, link: &Link, chain: &Chain) -> bool;
}

/// Offers every chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllAvailable;

impl ChoiceAvailability for AllAvailable {
    fn is_available(&self, _link: &Link, _chain: &Chain) -> bool {
        true
    }
}

/// Offers a chain only when every capability it requires is installed.
///
/// ```
/// use conduit_engine::availability::{CapabilityTable, ChoiceAvailability};
/// use conduit_workflow::{Chain, Link};
///
/// let table = CapabilityTable::new().require("upload-atom", "atom");
/// let link = Link::chain_choice("upload", ["upload-atom"]);
/// let chain = Chain::new("upload-atom", "Upload DIP to AtoM", "start");
///
/// assert!(!table.is_available(&link, &chain));
/// assert!(table.with_capability("atom").is_available(&link, &chain));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    installed: HashSet<String>,
    requirements: HashMap<ChainId, Vec<String>>,
}

impl CapabilityTable {
    /// Creates a table with nothing installed and no requirements.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a capability as installed.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.installed.insert(capability.into());
        self
    }

    /// Declares that `chain` needs `capability`.
    #[must_use]
    pub fn require(mut self, chain: impl Into<ChainId>, capability: impl Into<String>) -> Self {
        self.requirements
            .entry(chain.into())
            .or_default()
            .push(capability.into());
        self
    }
}

impl ChoiceAvailability for CapabilityTable {
    fn is_available(&self, _link: &Link, chain: &Chain) -> bool {
        self.requirements
            .get(&chain.id)
            .is_none_or(|needed| needed.iter().all(|cap| self.installed.contains(cap)))
    }
}
