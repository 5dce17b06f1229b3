//! Read-only renderings of pending decisions for operator front ends.
//!
//! Views serialize with serde. [`render_listing`] also produces the XML
//! listing consumed by legacy dashboards:
//!
//! ```xml
//! <choicesAvailableForUnits>
//!   <choicesAvailableForUnit>
//!     <UUID>job uuid</UUID>
//!     <pendingKey>link:unit</pendingKey>
//!     <linkDescription>Approve transfer</linkDescription>
//!     <unit>
//!       <type>Transfer</type>
//!       <unitXML><UUID>unit uuid</UUID><currentPath>...</currentPath></unitXML>
//!     </unit>
//!     <choices>
//!       <choice><chainAvailable>chain id</chainAvailable><description>...</description></choice>
//!     </choices>
//!   </choicesAvailableForUnit>
//! </choicesAvailableForUnits>
//! ```

use core::fmt;
use std::io::Write;

use conduit_workflow::{ChainId, LinkId};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use uuid::Uuid;

use crate::error::RenderError;
use crate::pending::PendingKey;
use crate::unit::UnitSnapshot;

/// One option as shown to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    /// Identifier to submit.
    pub id: String,
    /// Description.
    pub description: String,
}

/// A parked decision as shown to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChoiceView {
    /// Key to submit the decision against.
    pub key: PendingKey,
    /// The parked job.
    pub job_id: Uuid,
    /// The choice-point link.
    pub link_id: LinkId,
    /// Its description.
    pub link_description: String,
    /// The chain the link was reached through.
    pub chain_id: ChainId,
    /// The unit.
    pub unit: UnitSnapshot,
    /// The options.
    pub choices: Vec<ChoiceView>,
}

impl PendingChoiceView {
    /// Renders this view as a `choicesAvailableForUnit` element.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if writing fails.
    pub fn to_xml(&self) -> Result<String, RenderError> {
        let mut writer = Writer::new(Vec::new());
        self.write_xml(&mut writer)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), RenderError> {
        start(writer, "choicesAvailableForUnit")?;
        text_element(writer, "UUID", &self.job_id.to_string())?;
        text_element(writer, "pendingKey", &self.key.to_string())?;
        text_element(writer, "linkDescription", &self.link_description)?;

        start(writer, "unit")?;
        text_element(writer, "type", self.unit.kind.label())?;
        start(writer, "unitXML")?;
        text_element(writer, "UUID", &self.unit.id.to_string())?;
        text_element(writer, "currentPath", &self.unit.current_path)?;
        end(writer, "unitXML")?;
        end(writer, "unit")?;

        start(writer, "choices")?;
        for choice in &self.choices {
            start(writer, "choice")?;
            text_element(writer, "chainAvailable", &choice.id)?;
            text_element(writer, "description", &choice.description)?;
            end(writer, "choice")?;
        }
        end(writer, "choices")?;

        end(writer, "choicesAvailableForUnit")
    }
}

/// Renders every view under a `choicesAvailableForUnits` root.
///
/// # Errors
///
/// Returns [`RenderError`] if writing fails.
pub fn render_listing(views: &[PendingChoiceView]) -> Result<String, RenderError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    start(&mut writer, "choicesAvailableForUnits")?;
    for view in views {
        view.write_xml(&mut writer)?;
    }
    end(&mut writer, "choicesAvailableForUnits")?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), RenderError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), RenderError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

fn text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), RenderError> {
    start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    end(writer, name)
}

fn xml_error(err: impl fmt::Display) -> RenderError {
    RenderError::Xml(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{UnitId, UnitKind};

    fn view() -> PendingChoiceView {
        let unit_id = UnitId::new_v4();
        PendingChoiceView {
            key: PendingKey::new(LinkId::from("approve"), unit_id),
            job_id: Uuid::new_v4(),
            link_id: LinkId::from("approve"),
            link_description: "Approve <standard> transfer".to_owned(),
            chain_id: ChainId::from("start"),
            unit: UnitSnapshot {
                id: unit_id,
                kind: UnitKind::Transfer,
                name: "t".to_owned(),
                current_path: "%sharedPath%t/".to_owned(),
                revision: 0,
            },
            choices: vec![
                ChoiceView {
                    id: "store".to_owned(),
                    description: "Store & finish".to_owned(),
                },
                ChoiceView {
                    id: "reject".to_owned(),
                    description: "Reject".to_owned(),
                },
            ],
        }
    }

    #[test]
    fn renders_escaped_xml() {
        let xml = view().to_xml().unwrap();
        assert!(xml.starts_with("<choicesAvailableForUnit><UUID>"));
        assert!(xml.contains("<type>Transfer</type>"));
        assert!(xml.contains("<chainAvailable>store</chainAvailable>"));
        assert!(xml.contains("Store &amp; finish"));
        assert!(xml.contains("Approve &lt;standard&gt; transfer"));
    }

    #[test]
    fn listing_wraps_every_view() {
        let xml = render_listing(&[view(), view()]).unwrap();
        assert!(xml.starts_with("<choicesAvailableForUnits>"));
        assert!(xml.trim_end().ends_with("</choicesAvailableForUnits>"));
        assert_eq!(xml.matches("<choicesAvailableForUnit>").count(), 2);
    }

    #[test]
    fn view_serializes_key_as_string() {
        let view = view();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["key"], view.key.to_string());
        assert_eq!(json["choices"][0]["id"], "store");
        assert_eq!(json["unit"]["kind"], "Transfer");
    }
}
