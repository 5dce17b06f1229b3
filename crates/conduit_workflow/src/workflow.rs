//! The workflow graph and its builder.
//!
//! A [`Workflow`] is immutable once built. Engines share it behind an `Arc`
//! and every lookup is a pure read, so any number of units can consult the
//! same graph concurrently.
//!
//! # Example
//!
//! ```
//! use conduit_workflow::{Chain, JobStatus, Link, Workflow};
//!
//! let workflow = Workflow::builder()
//!     .chain(Chain::new("ingest", "Ingest", "scan"))
//!     .link(Link::task("scan", "virus_scan").on_exit(0, "approve"))
//!     .link(Link::chain_choice("approve", ["store", "reject"]))
//!     .build();
//!
//! assert!(workflow.get_link(&"scan".into()).is_ok());
//! assert!(workflow.get_chain(&"missing".into()).is_err());
//! ```

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use serde::Deserialize;

use crate::chain::Chain;
use crate::error::{ValidationError, WorkflowError};
use crate::id::{ChainId, LinkId};
use crate::link::{ExitCode, ExitRoute, JobStatus, Link, LinkConfig};

/// Immutable directed graph of chains and links.
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    chains: HashMap<ChainId, Chain>,
    links: HashMap<LinkId, Link>,
}

impl Workflow {
    /// Starts building a workflow.
    #[must_use]
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::default()
    }

    /// Looks up a chain.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ChainNotFound`] if no chain has this id.
    pub fn get_chain(&self, id: &ChainId) -> Result<&Chain, WorkflowError> {
        self.chains
            .get(id)
            .ok_or_else(|| WorkflowError::ChainNotFound(id.clone()))
    }

    /// Looks up a link.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::LinkNotFound`] if no link has this id.
    pub fn get_link(&self, id: &LinkId) -> Result<&Link, WorkflowError> {
        self.links
            .get(id)
            .ok_or_else(|| WorkflowError::LinkNotFound(id.clone()))
    }

    /// Returns true if a chain with this id exists.
    #[must_use]
    pub fn has_chain(&self, id: &str) -> bool {
        self.chains.contains_key(id)
    }

    /// Returns true if a link with this id exists.
    #[must_use]
    pub fn has_link(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }

    /// Iterates over all chains in unspecified order.
    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.values()
    }

    /// Iterates over all links in unspecified order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Returns the number of chains.
    #[must_use]
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Returns the number of links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Loads a workflow from its JSON document.
    ///
    /// The document has two maps keyed by identifier:
    ///
    /// ```json
    /// {
    ///   "chains": { "c1": { "description": "Approve", "link_id": "l1" } },
    ///   "links": {
    ///     "l1": {
    ///       "description": "Approve transfer",
    ///       "config": { "manager": "chain_choice", "chain_choices": ["c2"] },
    ///       "exit_codes": { "0": { "link_id": "l2", "job_status": "completed_successfully" } },
    ///       "fallback_link_id": null,
    ///       "fallback_job_status": "failed"
    ///     }
    ///   }
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Parse`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        let document: WorkflowDocument = serde_json::from_str(json)?;
        Ok(document.into_workflow())
    }

    /// Checks that every reference in the graph resolves.
    ///
    /// Lookups already fail gracefully at runtime; validation reports all
    /// dangling references up front.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for chain in self.chains.values() {
            if !self.links.contains_key(&chain.link_id) {
                errors.push(ValidationError::InvalidChainStart {
                    chain: chain.id.clone(),
                    link: chain.link_id.clone(),
                });
            }
        }

        for link in self.links.values() {
            self.validate_link(link, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_link(&self, link: &Link, errors: &mut Vec<ValidationError>) {
        // Dedup so a target shared by several exit codes is reported once.
        let targets: HashSet<&LinkId> = link.successors().collect();
        for target in targets {
            if !self.links.contains_key(target) {
                errors.push(ValidationError::InvalidRouteTarget {
                    link: link.id.clone(),
                    target: target.clone(),
                });
            }
        }

        match &link.config {
            LinkConfig::ChainChoice(config) => {
                for chain in &config.chain_choices {
                    if !self.chains.contains_key(chain) {
                        errors.push(ValidationError::InvalidChainChoice {
                            link: link.id.clone(),
                            chain: chain.clone(),
                        });
                    }
                }
            }
            LinkConfig::SetUnitVariable(config) => {
                self.check_config_target(link, config.link_id.as_ref(), errors);
            }
            LinkConfig::UnitVariableLinkPull(config) => {
                self.check_config_target(link, config.default_link_id.as_ref(), errors);
            }
            LinkConfig::Task(_) | LinkConfig::ReplacementChoice(_) => {}
        }
    }

    fn check_config_target(
        &self,
        link: &Link,
        target: Option<&LinkId>,
        errors: &mut Vec<ValidationError>,
    ) {
        if let Some(target) = target
            && !self.links.contains_key(target)
        {
            errors.push(ValidationError::InvalidConfigTarget {
                link: link.id.clone(),
                target: target.clone(),
            });
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`Workflow`].
///
/// Adding a chain or link with an existing id replaces the earlier one.
#[derive(Debug, Default)]
pub struct WorkflowBuilder {
    chains: HashMap<ChainId, Chain>,
    links: HashMap<LinkId, Link>,
}

impl WorkflowBuilder {
    /// Adds a chain.
    #[must_use]
    pub fn chain(mut self, chain: Chain) -> Self {
        self.add_chain(chain);
        self
    }

    /// Adds a link.
    #[must_use]
    pub fn link(mut self, link: Link) -> Self {
        self.add_link(link);
        self
    }

    /// Adds a chain in place.
    pub fn add_chain(&mut self, chain: Chain) -> &mut Self {
        self.chains.insert(chain.id.clone(), chain);
        self
    }

    /// Adds a link in place.
    pub fn add_link(&mut self, link: Link) -> &mut Self {
        self.links.insert(link.id.clone(), link);
        self
    }

    /// Finishes the workflow. No validation is performed.
    #[must_use]
    pub fn build(self) -> Workflow {
        Workflow {
            chains: self.chains,
            links: self.links,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON document
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WorkflowDocument {
    #[serde(default)]
    chains: HashMap<ChainId, ChainDocument>,
    #[serde(default)]
    links: HashMap<LinkId, LinkDocument>,
}

#[derive(Deserialize)]
struct ChainDocument {
    #[serde(default)]
    description: String,
    link_id: LinkId,
}

#[derive(Deserialize)]
struct LinkDocument {
    #[serde(default)]
    description: String,
    #[serde(default)]
    group: Option<String>,
    config: LinkConfig,
    #[serde(default)]
    exit_codes: BTreeMap<ExitCode, ExitRoute>,
    #[serde(default)]
    fallback_link_id: Option<LinkId>,
    #[serde(default = "default_fallback_status")]
    fallback_job_status: JobStatus,
}

fn default_fallback_status() -> JobStatus {
    JobStatus::Failed
}

impl WorkflowDocument {
    fn into_workflow(self) -> Workflow {
        let mut builder = Workflow::builder();
        for (id, chain) in self.chains {
            builder.add_chain(Chain {
                id,
                description: chain.description,
                link_id: chain.link_id,
            });
        }
        for (id, link) in self.links {
            builder.add_link(Link {
                id,
                description: link.description,
                group: link.group,
                config: link.config,
                exit_codes: link.exit_codes,
                fallback_link_id: link.fallback_link_id,
                fallback_job_status: link.fallback_job_status,
            });
        }
        builder.build()
    }
}
