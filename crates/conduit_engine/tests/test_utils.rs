//! Shared test utilities for `conduit_engine` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use conduit_engine::backend::{ExecutionBackend, TaskRequest};
use conduit_engine::error::BackendError;
use conduit_engine::unit::{Unit, UnitKind};
use conduit_workflow::{
    Chain, ExitCode, ExitRoute, JobStatus, Link, LinkId, ReplacementItem, Workflow,
};
use hashbrown::HashMap;
use indexmap::IndexMap;

// ═══════════════════════════════════════════════════════════════════════════════
// BACKENDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Backend that answers each `execute` name with a scripted exit code and
/// remembers every request.
#[derive(Default)]
pub struct ScriptedBackend {
    exit_codes: HashMap<String, ExitCode>,
    broken: Vec<String>,
    requests: Mutex<Vec<TaskRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the exit code for `execute`. Unscripted tasks exit 0.
    pub fn exit_with(mut self, execute: &str, code: ExitCode) -> Self {
        self.exit_codes.insert(execute.to_owned(), code);
        self
    }

    /// Makes `execute` fail before producing an exit code.
    pub fn broken(mut self, execute: &str) -> Self {
        self.broken.push(execute.to_owned());
        self
    }

    pub fn requests(&self) -> Vec<TaskRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `execute` names in the order they ran.
    pub fn executed(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.execute)
            .collect()
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    async fn execute(&self, request: TaskRequest) -> Result<ExitCode, BackendError> {
        let execute = request.execute.clone();
        self.requests.lock().unwrap().push(request);
        if self.broken.contains(&execute) {
            return Err(BackendError::new(format!("{execute} is not installed")));
        }
        Ok(self.exit_codes.get(&execute).copied().unwrap_or(0))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WORKFLOWS
// ═══════════════════════════════════════════════════════════════════════════════

/// A task link whose exit code 0 ends the chain successfully.
pub fn final_task(id: &str, execute: &str) -> Link {
    Link::task(id, execute).with_exit_code(0, ExitRoute::end(JobStatus::CompletedSuccessfully))
}

/// `ingest` runs `check` then asks the operator to pick `store` or `reject`.
pub fn approval_workflow() -> Workflow {
    Workflow::builder()
        .chain(Chain::new("ingest", "Ingest", "check"))
        .chain(Chain::new("store", "Store AIP", "store_aip"))
        .chain(Chain::new("reject", "Reject transfer", "reject_transfer"))
        .link(Link::task("check", "check_transfer").on_exit(0, "approve"))
        .link(
            Link::chain_choice("approve", ["store", "reject"])
                .with_description("Approve transfer"),
        )
        .link(final_task("store_aip", "store_aip"))
        .link(final_task("reject_transfer", "remove_transfer"))
        .build()
}

/// Builds a replacement item from raw variable names.
pub fn item(id: &str, description: &str, items: &[(&str, &str)]) -> ReplacementItem {
    ReplacementItem {
        id: id.to_owned(),
        description: description.to_owned(),
        items: items
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<IndexMap<_, _>>(),
    }
}

/// `normalize` asks which normalization to run, then runs it with the
/// chosen `%normalizeType%`.
pub fn normalization_workflow(items: Vec<ReplacementItem>) -> Workflow {
    Workflow::builder()
        .chain(Chain::new("normalize", "Normalize", "select_normalization"))
        .link(
            Link::replacement_choice("select_normalization", items)
                .with_description("Select normalization")
                .on_exit(0, "run_normalization"),
        )
        .link(
            final_task("run_normalization", "normalize")
                .with_arguments("--type %normalizeType% --sip %SIPDirectory%"),
        )
        .build()
}

pub fn normalization_items() -> Vec<ReplacementItem> {
    vec![
        item("preservation", "Preservation only", &[("normalizeType", "preservation")]),
        item("access", "Access only", &[("normalizeType", "access")]),
        item("both", "Preservation and access", &[("normalizeType", "both")]),
    ]
}

/// A replacement link with no items whose fallback task names a settings
/// scope, the way dashboard settings are wired.
pub fn settings_workflow() -> Workflow {
    Workflow::builder()
        .chain(Chain::new("upload", "Upload DIP", "dip_settings"))
        .link(
            Link::replacement_choice("dip_settings", Vec::new())
                .on_exit(0, "upload_dip")
                .with_fallback(Some(LinkId::from("settings_scope")), JobStatus::Failed),
        )
        .link(final_task("settings_scope", "upload-atom_v0.0"))
        .link(final_task("upload_dip", "upload_dip").with_arguments("--url %url%"))
        .build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// UNITS AND OVERRIDE DOCUMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A transfer whose directory is `dir`.
pub fn unit_in(dir: &Path) -> Unit {
    Unit::new(UnitKind::Transfer, "transfer", format!("{}/", dir.display()))
}

/// A transfer in a directory that holds no override document.
pub fn unit_without_overrides() -> (tempfile::TempDir, Unit) {
    let dir = tempfile::tempdir().unwrap();
    let unit = unit_in(dir.path());
    (dir, unit)
}

/// Writes `processingMCP.xml` with one entry per `(applies_to, go_to_chain)`.
pub fn write_overrides(dir: &Path, entries: &[(&str, &str)]) {
    let mut xml = String::from("<processingMCP>\n  <preconfiguredChoices>\n");
    for (applies_to, go_to_chain) in entries {
        xml.push_str(&format!(
            "    <preconfiguredChoice>\n      <appliesTo>{applies_to}</appliesTo>\n      \
             <goToChain>{go_to_chain}</goToChain>\n    </preconfiguredChoice>\n"
        ));
    }
    xml.push_str("  </preconfiguredChoices>\n</processingMCP>\n");
    std::fs::write(dir.join("processingMCP.xml"), xml).unwrap();
}

