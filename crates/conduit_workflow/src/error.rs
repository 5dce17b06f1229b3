//! Error types for workflow lookups and loading.

use crate::id::{ChainId, LinkId};

/// Errors raised by [`Workflow`](crate::Workflow) lookups and loading.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// No chain with the given identifier exists.
    #[error("chain not found: {0}")]
    ChainNotFound(ChainId),

    /// No link with the given identifier exists.
    #[error("link not found: {0}")]
    LinkNotFound(LinkId),

    /// The workflow document could not be deserialized.
    #[error("invalid workflow document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Structural problems found by [`Workflow::validate`](crate::Workflow::validate).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A chain starts at a link that does not exist.
    #[error("chain {chain} starts at unknown link {link}")]
    InvalidChainStart {
        /// The chain.
        chain: ChainId,
        /// The missing link.
        link: LinkId,
    },

    /// An exit route or fallback points at a link that does not exist.
    #[error("link {link} routes to unknown link {target}")]
    InvalidRouteTarget {
        /// The routing link.
        link: LinkId,
        /// The missing target.
        target: LinkId,
    },

    /// A chain-choice link offers a chain that does not exist.
    #[error("link {link} offers unknown chain {chain}")]
    InvalidChainChoice {
        /// The choice link.
        link: LinkId,
        /// The missing chain.
        chain: ChainId,
    },

    /// A link configuration references a link that does not exist.
    #[error("link {link} references unknown link {target} in its configuration")]
    InvalidConfigTarget {
        /// The referencing link.
        link: LinkId,
        /// The missing target.
        target: LinkId,
    },
}
