//! Chains: named entry points into the link graph.

use crate::id::{ChainId, LinkId};

/// An ordered sequence of links, identified by its starting link.
///
/// A chain does not enumerate its links; it only names where execution
/// begins. Exit-code routing on each link determines the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    /// Unique identifier.
    pub id: ChainId,
    /// Description shown to operators when the chain is a choice.
    pub description: String,
    /// First link executed when the chain starts.
    pub link_id: LinkId,
}

impl Chain {
    /// Creates a chain starting at `link_id`.
    #[must_use]
    pub fn new(
        id: impl Into<ChainId>,
        description: impl Into<String>,
        link_id: impl Into<LinkId>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            link_id: link_id.into(),
        }
    }
}
