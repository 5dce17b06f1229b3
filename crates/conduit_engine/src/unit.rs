//! Processing units.
//!
//! A [`Unit`] is the thing travelling through the workflow: a transfer, SIP or
//! DIP. It is an owned value. While a chain runs the driver owns it; while
//! the unit waits for a decision the pending-choice entry owns it.

use core::fmt;
use std::path::PathBuf;

use conduit_core::EngineConfig;
use conduit_workflow::LinkId;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::replacement::ReplacementDict;

/// Token in unit locations standing for the shared directory.
pub const SHARED_PATH_TOKEN: &str = "%sharedPath%";

/// Stable identifier of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(Uuid);

impl UnitId {
    /// Generates a random identifier.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for UnitId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Kind of processing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Material received and not yet packaged.
    Transfer,
    /// Submission information package.
    #[serde(rename = "SIP")]
    Sip,
    /// Dissemination information package.
    #[serde(rename = "DIP")]
    Dip,
}

impl UnitKind {
    /// Returns the value exposed as `%unitType%`.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            UnitKind::Transfer => "Transfer",
            UnitKind::Sip => "SIP",
            UnitKind::Dip => "DIP",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named value stored on a unit, optionally pointing at a link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitVariable {
    /// Stored value.
    pub value: Option<String>,
    /// Link to jump to when the variable is pulled.
    pub link_id: Option<LinkId>,
}

/// A transfer, SIP or DIP moving through the workflow.
#[derive(Debug, Clone)]
pub struct Unit {
    id: UnitId,
    kind: UnitKind,
    name: String,
    current_path: String,
    variables: HashMap<String, UnitVariable>,
    pass_var: ReplacementDict,
    revision: u64,
}

impl Unit {
    /// Creates a unit with a fresh identifier.
    #[must_use]
    pub fn new(kind: UnitKind, name: impl Into<String>, current_path: impl Into<String>) -> Self {
        Self {
            id: UnitId::new_v4(),
            kind,
            name: name.into(),
            current_path: current_path.into(),
            variables: HashMap::new(),
            pass_var: ReplacementDict::default(),
            revision: 0,
        }
    }

    /// Replaces the identifier.
    #[must_use]
    pub fn with_id(mut self, id: UnitId) -> Self {
        self.id = id;
        self
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the location, possibly containing `%sharedPath%`.
    #[must_use]
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Returns the location with the first `%sharedPath%` expanded.
    #[must_use]
    pub fn resolved_path(&self, config: &EngineConfig) -> PathBuf {
        let shared = config.shared_directory.to_string_lossy();
        PathBuf::from(self.current_path.replacen(SHARED_PATH_TOKEN, &shared, 1))
    }

    /// Moves the unit.
    pub fn set_current_path(&mut self, path: impl Into<String>) {
        self.current_path = path.into();
        self.revision += 1;
    }

    /// Returns a unit variable.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&UnitVariable> {
        self.variables.get(name)
    }

    /// Stores a unit variable, replacing any previous value.
    pub fn set_variable(
        &mut self,
        name: impl Into<String>,
        value: Option<String>,
        link_id: Option<LinkId>,
    ) {
        self.variables
            .insert(name.into(), UnitVariable { value, link_id });
        self.revision += 1;
    }

    /// Returns the substitution variables threaded between links.
    #[must_use]
    pub fn pass_var(&self) -> &ReplacementDict {
        &self.pass_var
    }

    /// Layers `dict` over the threaded substitution variables.
    pub fn merge_pass_var(&mut self, dict: &ReplacementDict) {
        self.pass_var.extend(dict);
        self.revision += 1;
    }

    /// Mutation counter, bumped on every change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Builds the dictionary used for task arguments: the standard unit
    /// variables with the threaded variables layered on top.
    #[must_use]
    pub fn replacement_dict(&self, config: &EngineConfig) -> ReplacementDict {
        let standard = ReplacementDict::from_static([
            ("SIPUUID", self.id.to_string()),
            ("SIPName", self.name.clone()),
            (
                "SIPDirectory",
                self.resolved_path(config).to_string_lossy().into_owned(),
            ),
            (
                "sharedPath",
                config.shared_directory.to_string_lossy().into_owned(),
            ),
            ("unitType", self.kind.label().to_owned()),
        ]);
        standard.merge(&self.pass_var)
    }

    /// Returns a serializable snapshot for rendering and task requests.
    #[must_use]
    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            current_path: self.current_path.clone(),
            revision: self.revision,
        }
    }
}

/// Read-only view of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Identifier.
    pub id: UnitId,
    /// Kind.
    pub kind: UnitKind,
    /// Name.
    pub name: String,
    /// Location as stored on the unit.
    pub current_path: String,
    /// Revision at snapshot time.
    pub revision: u64,
}
