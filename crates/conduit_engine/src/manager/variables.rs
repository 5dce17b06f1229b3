//! Unit-variable links.
//!
//! A set link stores a value (and optionally a link) on the unit; a pull
//! link later jumps to the stored link. Together they let one part of the
//! workflow decide where a later part goes.

use conduit_workflow::{SetUnitVariableConfig, UnitVariableLinkPullConfig};

use super::Step;
use crate::unit::Unit;

/// Stores the configured variable and continues on exit code 0.
pub(crate) fn set(unit: &mut Unit, config: &SetUnitVariableConfig) -> Step {
    tracing::debug!(
        unit = %unit.id(),
        variable = %config.variable,
        value = ?config.variable_value,
        "setting unit variable"
    );
    unit.set_variable(
        config.variable.clone(),
        config.variable_value.clone(),
        config.link_id.clone(),
    );
    Step::Exit(0)
}

/// Jumps to the stored link, then the default link; completes the chain
/// when neither exists.
pub(crate) fn pull(unit: &Unit, config: &UnitVariableLinkPullConfig) -> Step {
    let target = unit
        .variable(&config.variable)
        .and_then(|variable| variable.link_id.clone())
        .or_else(|| config.default_link_id.clone());

    match target {
        Some(link_id) => Step::GoTo(link_id),
        None => {
            tracing::debug!(
                unit = %unit.id(),
                variable = %config.variable,
                "no link to pull, chain ends"
            );
            Step::Complete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitKind;
    use conduit_workflow::LinkId;

    fn pull_config(default: Option<&str>) -> UnitVariableLinkPullConfig {
        UnitVariableLinkPullConfig {
            variable: "next".to_owned(),
            default_link_id: default.map(LinkId::from),
        }
    }

    #[test]
    fn set_then_pull_jumps_to_stored_link() {
        let mut unit = Unit::new(UnitKind::Sip, "s", "/s/");
        let step = set(
            &mut unit,
            &SetUnitVariableConfig {
                variable: "next".to_owned(),
                variable_value: Some("yes".to_owned()),
                link_id: Some(LinkId::from("stored")),
            },
        );
        assert!(matches!(step, Step::Exit(0)));
        assert!(matches!(
            pull(&unit, &pull_config(Some("default"))),
            Step::GoTo(link) if link.as_str() == "stored"
        ));
    }

    #[test]
    fn pull_falls_back_to_default_then_completes() {
        let unit = Unit::new(UnitKind::Sip, "s", "/s/");
        assert!(matches!(
            pull(&unit, &pull_config(Some("default"))),
            Step::GoTo(link) if link.as_str() == "default"
        ));
        assert!(matches!(pull(&unit, &pull_config(None)), Step::Complete));
    }
}
