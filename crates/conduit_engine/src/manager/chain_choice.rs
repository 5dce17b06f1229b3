//! Chain-choice links: the operator picks which chain the unit runs next.

use conduit_workflow::{ChainChoiceConfig, ChainId, Link, LinkId, Workflow};

use super::Choice;
use crate::availability::ChoiceAvailability;

/// Options offered at a chain-choice link.
#[derive(Debug, Clone)]
pub struct ChainChoiceManager {
    link_id: LinkId,
    choices: Vec<Choice>,
}

impl ChainChoiceManager {
    /// Builds the options. Chains missing from the workflow or rejected by
    /// `availability` are skipped.
    #[must_use]
    pub fn new(
        link: &Link,
        config: &ChainChoiceConfig,
        workflow: &Workflow,
        availability: &dyn ChoiceAvailability,
    ) -> Self {
        let choices = config
            .chain_choices
            .iter()
            .filter_map(|chain_id| {
                let Ok(chain) = workflow.get_chain(chain_id) else {
                    tracing::debug!(link = %link.id, chain = %chain_id, "skipping unknown chain");
                    return None;
                };
                if !availability.is_available(link, chain) {
                    tracing::debug!(link = %link.id, chain = %chain_id, "chain not available");
                    return None;
                }
                Some(Choice {
                    id: chain_id.to_string(),
                    description: chain.description.clone(),
                    replacements: None,
                })
            })
            .collect();

        Self {
            link_id: link.id.clone(),
            choices,
        }
    }

    /// The choice-point link.
    #[must_use]
    pub fn link_id(&self) -> &LinkId {
        &self.link_id
    }

    /// The options offered, in configuration order.
    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Returns the chain if `selector` is one of the offered chain ids.
    #[must_use]
    pub fn validate(&self, selector: &str) -> Option<ChainId> {
        self.choices
            .iter()
            .any(|choice| choice.id == selector)
            .then(|| ChainId::from(selector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::{AllAvailable, CapabilityTable};
    use conduit_workflow::{Chain, LinkConfig};

    fn workflow() -> Workflow {
        Workflow::builder()
            .chain(Chain::new("a", "Chain A", "start"))
            .chain(Chain::new("b", "Chain B", "start"))
            .link(Link::chain_choice("choose", ["a", "ghost", "b"]))
            .build()
    }

    fn manager(availability: &dyn ChoiceAvailability) -> ChainChoiceManager {
        let workflow = workflow();
        let link = workflow.get_link(&LinkId::from("choose")).unwrap().clone();
        let LinkConfig::ChainChoice(config) = &link.config else {
            unreachable!()
        };
        ChainChoiceManager::new(&link, config, &workflow, availability)
    }

    #[test]
    fn skips_unknown_chains() {
        let manager = manager(&AllAvailable);
        let ids: Vec<_> = manager.choices().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(manager.choices()[1].description, "Chain B");
        assert!(manager.choices()[0].replacements.is_none());
    }

    #[test]
    fn skips_unavailable_chains() {
        let table = CapabilityTable::new().require("a", "never-installed");
        let manager = manager(&table);
        assert_eq!(manager.choices().len(), 1);
        assert_eq!(manager.choices()[0].id, "b");
    }

    #[test]
    fn validate_accepts_only_offered_chains() {
        let manager = manager(&AllAvailable);
        assert_eq!(manager.validate("b"), Some(ChainId::from("b")));
        assert_eq!(manager.validate("ghost"), None);
        assert_eq!(manager.validate("0"), None);
    }
}
