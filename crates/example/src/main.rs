//! Conduit demo CLI.
//!
//! Drives one transfer through a workflow, answering each decision as a demo
//! operator.
//!
//! # Usage
//!
//! ```bash
//! conduit-demo [workflow.json]
//! ```
//!
//! Without an argument the built-in demo workflow is used. Configuration
//! comes from `CONDUIT_*` environment variables (a `.env` file is honored),
//! and `CONDUIT_LOG_FORMAT` picks `pretty`, `compact` or `json` logs.

use std::sync::Arc;

use conduit_core::{EngineConfig, TracingFormat, TracingSetup};
use conduit_engine::Engine;
use conduit_engine::agents::{InMemoryAgents, UserId};
use conduit_engine::chain::ChainOutcome;
use conduit_engine::unit::{Unit, UnitKind};
use conduit_workflow::{ChainId, Workflow};
use example::{LoggingBackend, START_CHAIN, demo_workflow, run_unit};

const OPERATOR: UserId = UserId(1);

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let format = std::env::var("CONDUIT_LOG_FORMAT")
        .ok()
        .and_then(|value| value.parse::<TracingFormat>().ok())
        .unwrap_or_default();
    TracingSetup::new().with_format(format).init();

    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: invalid configuration: {e}");
        std::process::exit(1);
    });

    let workflow = match std::env::args().nth(1) {
        Some(path) => load_workflow(&path),
        None => demo_workflow(),
    };
    if let Err(problems) = workflow.validate() {
        for problem in problems {
            tracing::warn!(%problem, "workflow problem");
        }
    }

    let agents = InMemoryAgents::new().with_agent(OPERATOR, "Demo operator");
    let engine = Engine::builder(workflow, Arc::new(LoggingBackend))
        .with_config(config)
        .with_agents(Arc::new(agents))
        .build();

    let unit = Unit::new(
        UnitKind::Transfer,
        "demo-transfer",
        "%sharedPath%currentlyProcessing/demo-transfer/",
    );

    match run_unit(&engine, unit, &ChainId::from(START_CHAIN), OPERATOR).await {
        Ok(result) => match result.outcome {
            ChainOutcome::Completed(unit) => {
                tracing::info!(
                    unit = %unit.id(),
                    links = result.links_executed,
                    "transfer processed"
                );
            }
            ChainOutcome::Failed { link_id, reason, .. } => {
                tracing::error!(link = %link_id, error = %reason, "transfer failed");
            }
            ChainOutcome::AwaitingDecision(key) => {
                tracing::warn!(%key, "transfer left waiting for a decision");
            }
        },
        Err(e) => eprintln!("Error: {e}"),
    }

    let parked = engine.shutdown();
    if !parked.is_empty() {
        tracing::info!(count = parked.len(), "units still parked at shutdown");
    }
}

fn load_workflow(path: &str) -> Workflow {
    let loaded = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| Workflow::from_json(&json).map_err(|e| e.to_string()));
    loaded.unwrap_or_else(|e| {
        eprintln!("Error: cannot load workflow {path}: {e}");
        std::process::exit(1);
    })
}
