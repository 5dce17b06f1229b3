//! Replacement-dictionary choice links: the operator picks a set of
//! variables and the unit continues on the link's exit route for code 0.

use conduit_workflow::{LinkId, ReplacementChoiceConfig};

use super::Choice;
use crate::error::ReplacementError;
use crate::replacement::ReplacementDict;

/// Options offered at a replacement-dictionary link. Choice ids are item
/// indexes.
#[derive(Debug, Clone)]
pub struct ReplacementChoiceManager {
    link_id: LinkId,
    choices: Vec<Choice>,
}

impl ReplacementChoiceManager {
    /// Builds one option per configured item.
    ///
    /// # Errors
    ///
    /// Returns [`ReplacementError`] if an item has a malformed variable name.
    pub fn new(
        link_id: LinkId,
        config: &ReplacementChoiceConfig,
    ) -> Result<Self, ReplacementError> {
        let choices = config
            .replacements
            .iter()
            .enumerate()
            .map(|(index, item)| -> Result<Choice, ReplacementError> {
                Ok(Choice {
                    id: index.to_string(),
                    description: item.description.clone(),
                    replacements: Some(ReplacementDict::new(&item.items)?),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { link_id, choices })
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

    /// Returns the index if `selector` is a plain decimal number in range.
    #[must_use]
    pub fn validate(&self, selector: &str) -> Option<usize> {
        if selector.is_empty() || !selector.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        selector
            .parse::<usize>()
            .ok()
            .filter(|index| *index < self.choices.len())
    }

    /// The dictionary of the option at `index`.
    #[must_use]
    pub fn replacements(&self, index: usize) -> Option<&ReplacementDict> {
        self.choices.get(index)?.replacements.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_workflow::ReplacementItem;

    fn item(id: &str, key: &str, value: &str) -> ReplacementItem {
        ReplacementItem {
            id: id.to_owned(),
            description: format!("Item {id}"),
            items: [(key.to_owned(), value.to_owned())].into_iter().collect(),
        }
    }

    fn config(items: Vec<ReplacementItem>) -> ReplacementChoiceConfig {
        ReplacementChoiceConfig {
            replacements: items,
        }
    }

    #[test]
    fn choices_use_indexes_and_wrapped_keys() {
        let manager = ReplacementChoiceManager::new(
            LinkId::from("l"),
            &config(vec![item("x", "level", "1"), item("y", "level", "2")]),
        )
        .unwrap();

        assert_eq!(manager.choices()[1].id, "1");
        assert_eq!(manager.choices()[1].description, "Item y");
        assert_eq!(manager.replacements(1).unwrap().get("%level%"), Some("2"));
    }

    #[test]
    fn validate_rejects_bad_indexes() {
        let manager =
            ReplacementChoiceManager::new(LinkId::from("l"), &config(vec![item("x", "k", "v")]))
                .unwrap();
        assert_eq!(manager.validate("0"), Some(0));
        assert_eq!(manager.validate("1"), None);
        assert_eq!(manager.validate("-1"), None);
        assert_eq!(manager.validate("zero"), None);
        assert_eq!(manager.validate("+0"), None);
        assert_eq!(manager.validate(" 0 "), None);
        assert_eq!(manager.validate(""), None);
    }

    #[test]
    fn malformed_item_fails_construction() {
        let result =
            ReplacementChoiceManager::new(LinkId::from("l"), &config(vec![item("x", "%k%", "v")]));
        assert!(matches!(result, Err(ReplacementError::InvalidKey(_))));
    }
}
