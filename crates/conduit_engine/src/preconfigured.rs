//! Automatic answers for choice points.
//!
//! Two sources can answer a decision without an operator:
//!
//! - the unit's override document, `processingMCP.xml` in the unit's
//!   directory, holding `preconfiguredChoice` elements;
//! - stored settings, for replacement-dictionary links that offer nothing
//!   to choose from.
//!
//! Both are advisory. Anything that goes wrong while consulting them is
//! logged and treated as "no automatic answer".
//!
//! ```xml
//! <processingMCP>
//!   <preconfiguredChoices>
//!     <preconfiguredChoice>
//!       <appliesTo>f4d1a2c3-approve</appliesTo>
//!       <goToChain>a8b7c6d5-store</goToChain>
//!     </preconfiguredChoice>
//!   </preconfiguredChoices>
//! </processingMCP>
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conduit_core::EngineConfig;
use conduit_workflow::{ChainId, Link, LinkConfig, LinkId, Workflow};
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::ConfigParseError;
use crate::replacement::ReplacementDict;
use crate::settings::SettingsStore;
use crate::unit::Unit;

// ─────────────────────────────────────────────────────────────────────────────
// Override document
// ─────────────────────────────────────────────────────────────────────────────

/// One `preconfiguredChoice` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconfiguredChoice {
    /// Choice-point link the entry answers.
    pub applies_to: String,
    /// Chain id (chain choices) or replacement item id (dictionary choices).
    /// `None` when the element is missing or empty.
    pub go_to_chain: Option<String>,
}

impl PreconfiguredChoice {
    /// The desired outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigParseError::MissingField`] if the entry has no
    /// `goToChain` text.
    pub fn desired(&self) -> Result<&str, ConfigParseError> {
        self.go_to_chain
            .as_deref()
            .ok_or(ConfigParseError::MissingField("goToChain"))
    }
}

/// A parsed override document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingConfig {
    choices: Vec<PreconfiguredChoice>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    AppliesTo,
    GoToChain,
}

impl ProcessingConfig {
    /// Parses a document. `preconfiguredChoice` elements are collected at
    /// any depth, in document order. Entries without `appliesTo` can never
    /// match and are dropped; entries without `goToChain` are kept and only
    /// fail when they are looked up.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigParseError::Xml`] if the XML is malformed.
    pub fn parse(xml: &str) -> Result<Self, ConfigParseError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut choices = Vec::new();
        let mut in_choice = false;
        let mut field: Option<Field> = None;
        let mut applies_to: Option<String> = None;
        let mut go_to_chain: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"preconfiguredChoice" => {
                        in_choice = true;
                        applies_to = None;
                        go_to_chain = None;
                    }
                    b"appliesTo" if in_choice => field = Some(Field::AppliesTo),
                    b"goToChain" if in_choice => field = Some(Field::GoToChain),
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let Some(current) = field {
                        let text = e
                            .unescape()
                            .map_err(|err| ConfigParseError::Xml(err.to_string()))?
                            .into_owned();
                        match current {
                            Field::AppliesTo => applies_to = Some(text),
                            Field::GoToChain => go_to_chain = Some(text),
                        }
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"preconfiguredChoice" if in_choice => {
                        in_choice = false;
                        match applies_to.take() {
                            Some(applies_to) => choices.push(PreconfiguredChoice {
                                applies_to,
                                go_to_chain: go_to_chain.take(),
                            }),
                            None => {
                                tracing::warn!("preconfiguredChoice without appliesTo ignored");
                            }
                        }
                    }
                    b"appliesTo" | b"goToChain" => field = None,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(ConfigParseError::Xml(err.to_string())),
            }
        }

        Ok(Self { choices })
    }

    /// Returns the desired outcome of the first entry for `applies_to`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigParseError::MissingField`] if that entry has no
    /// `goToChain`.
    pub fn find(&self, applies_to: &str) -> Result<Option<&str>, ConfigParseError> {
        self.matching(applies_to)
            .next()
            .map(PreconfiguredChoice::desired)
            .transpose()
    }

    /// Every entry for `applies_to`, in document order.
    pub fn matching<'a, 'b>(
        &'a self,
        applies_to: &'b str,
    ) -> impl Iterator<Item = &'a PreconfiguredChoice> + use<'a, 'b> {
        self.choices
            .iter()
            .filter(move |choice| choice.applies_to == applies_to)
    }

    /// Returns every entry in document order.
    #[must_use]
    pub fn choices(&self) -> &[PreconfiguredChoice] {
        &self.choices
    }

    /// Location of a unit's override document.
    #[must_use]
    pub fn document_path(unit: &Unit, config: &EngineConfig) -> PathBuf {
        unit.resolved_path(config)
            .join(&config.processing_config_file)
    }

    /// Reads and parses a document.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigParseError`] if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Option<Self>, ConfigParseError> {
        match tokio::fs::read_to_string(path).await {
            Ok(xml) => Self::parse(&xml).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Answers choice points from override documents and stored settings.
pub struct ChoiceResolver {
    workflow: Arc<Workflow>,
    config: Arc<EngineConfig>,
    settings: Arc<dyn SettingsStore>,
}

impl ChoiceResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(
        workflow: Arc<Workflow>,
        config: Arc<EngineConfig>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            workflow,
            config,
            settings,
        }
    }

    /// Loads the unit's override document, logging and swallowing failures.
    async fn document(&self, unit: &Unit) -> Option<ProcessingConfig> {
        let path = ProcessingConfig::document_path(unit, &self.config);
        match ProcessingConfig::load(&path).await {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    unit = %unit.id(),
                    error = %err,
                    "error parsing override document for pre-configured choice"
                );
                None
            }
        }
    }

    /// Chain to start instead of asking the operator.
    ///
    /// A chain missing from the workflow is ignored.
    pub async fn chain_choice(&self, unit: &Unit, link: &Link) -> Option<ChainId> {
        let document = self.document(unit).await?;
        let desired = match document.find(link.id.as_str()) {
            Ok(desired) => desired?,
            Err(err) => {
                tracing::warn!(link = %link.id, error = %err, "unusable pre-configured choice");
                return None;
            }
        };
        if !self.workflow.has_chain(desired) {
            tracing::warn!(
                link = %link.id,
                chain = desired,
                "pre-configured chain does not exist, asking the operator"
            );
            return None;
        }
        tracing::info!(link = %link.id, chain = desired, "using pre-configured chain");
        Some(ChainId::from(desired))
    }

    /// Dictionary to apply instead of asking the operator.
    ///
    /// Both the choice point and the desired item go through the alias
    /// table, and the item is looked up on the canonical link. When several
    /// entries answer the same choice point the last one wins, and every one
    /// of them must name an existing item.
    pub async fn replacement_choice(&self, unit: &Unit, link: &Link) -> Option<ReplacementDict> {
        let document = self.document(unit).await?;
        let choice_point = self.config.canonical_choice(link.id.as_str());

        let mut chosen = None;
        for entry in document.matching(choice_point) {
            let desired = match entry.desired() {
                Ok(desired) => self.config.canonical_choice(desired),
                Err(err) => {
                    tracing::warn!(
                        link = choice_point,
                        error = %err,
                        "unusable pre-configured choice"
                    );
                    return None;
                }
            };
            chosen = Some(self.replacement_item(choice_point, desired)?);
        }
        let (desired, items) = chosen?;

        match ReplacementDict::new(items) {
            Ok(dict) => {
                tracing::info!(link = %link.id, item = desired, "using pre-configured replacement");
                Some(dict)
            }
            Err(err) => {
                tracing::warn!(
                    link = %link.id,
                    item = desired,
                    error = %err,
                    "malformed pre-configured replacement"
                );
                None
            }
        }
    }

    /// Finds item `desired` on the replacement link `choice_point`.
    fn replacement_item<'a>(
        &'a self,
        choice_point: &'a str,
        desired: &'a str,
    ) -> Option<(&'a str, &'a IndexMap<String, String>)> {
        let Ok(canonical) = self.workflow.get_link(&LinkId::from(choice_point)) else {
            tracing::warn!(link = choice_point, "canonical choice point does not exist");
            return None;
        };
        let LinkConfig::ReplacementChoice(config) = &canonical.config else {
            tracing::warn!(link = choice_point, "canonical choice point offers no replacements");
            return None;
        };
        let Some(item) = config.replacements.iter().find(|item| item.id == desired) else {
            tracing::warn!(
                link = choice_point,
                item = desired,
                "pre-configured replacement does not exist, asking the operator"
            );
            return None;
        };
        Some((desired, &item.items))
    }

    /// Dictionary built from the settings scope named by the link's
    /// fallback task.
    pub async fn stored_settings(&self, link: &Link) -> Option<ReplacementDict> {
        let fallback = link.fallback_link_id.as_ref()?;
        let fallback = self.workflow.get_link(fallback).ok()?;
        let LinkConfig::Task(task) = &fallback.config else {
            return None;
        };
        if task.execute.is_empty() {
            return None;
        }

        let values = match self.settings.get_dict(&task.execute).await {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(
                    link = %link.id,
                    scope = %task.execute,
                    error = %err,
                    "settings store failed"
                );
                return None;
            }
        };
        if values.is_empty() {
            return None;
        }

        match ReplacementDict::new(&values) {
            Ok(dict) => Some(dict),
            Err(err) => {
                tracing::warn!(scope = %task.execute, error = %err, "malformed stored settings");
                None
            }
        }
    }
}
