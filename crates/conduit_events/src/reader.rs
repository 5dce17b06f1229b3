//! Reading event rows from a transfer's metadata CSV.
//!
//! The first row names the columns. Each following row describes one event
//! on one file, plus any number of agents:
//!
//! ```text
//! filename,eventType,eventDateTime,agentIdentifierType,agentIdentifierValue,agentName,agentType
//! objects/a.tif,ingestion,2019-03-01T12:00:00Z,local,1,Jane Archivist,person
//! ```
//!
//! Agent columns repeat. An `agentType` cell closes the agent being read;
//! agent cells after the last `agentType` form one more agent. Blank cells are
//! ignored.

use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{Position, StringRecord};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Event columns of one row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFields {
    /// `eventType`.
    pub event_type: Option<String>,
    /// `eventDetail`.
    pub event_detail: Option<String>,
    /// `eventOutcome`.
    pub event_outcome: Option<String>,
    /// `eventOutcomeDetailNote`.
    pub event_outcome_detail: Option<String>,
    /// `eventDateTime`, absent when blank or unparseable.
    pub event_datetime: Option<DateTime<Utc>>,
}

/// One agent described by a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentRow {
    /// `agentIdentifierType`.
    pub identifier_type: Option<String>,
    /// `agentIdentifierValue`.
    pub identifier_value: Option<String>,
    /// `agentName`.
    pub name: Option<String>,
    /// `agentType`.
    pub agent_type: Option<String>,
}

/// One parsed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    /// Line of the row in the file, starting at 1 for the header.
    pub line: u64,
    /// The file the event happened to, relative to the transfer.
    pub filename: Option<String>,
    /// The event.
    pub event: EventFields,
    /// The agents, in column order.
    pub agents: Vec<AgentRow>,
}

/// Iterates over the rows of an events CSV.
pub struct EventReader<R> {
    reader: csv::Reader<R>,
    headers: StringRecord,
    record: StringRecord,
}

impl<R: Read> EventReader<R> {
    /// Wraps a reader and consumes the header row.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Csv`] if the header row cannot be read.
    pub fn from_reader(source: R) -> Result<Self, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);
        let headers = reader.headers()?.clone();
        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }

    /// Column names from the header row.
    #[must_use]
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    fn parse_record(&self) -> EventRow {
        let line = self.record.position().map_or(0, Position::line);
        let mut filename = None;
        let mut event = EventFields::default();
        let mut agent: Option<AgentRow> = None;
        let mut agents = Vec::new();

        // Extra cells beyond the header row are ignored.
        for (column, value) in self.headers.iter().zip(self.record.iter()) {
            if value.is_empty() {
                continue;
            }
            let value = value.to_owned();

            match column {
                "filename" => filename = Some(value),
                "eventType" => event.event_type = Some(value),
                "eventDetail" => event.event_detail = Some(value),
                "eventOutcome" => event.event_outcome = Some(value),
                "eventOutcomeDetailNote" => event.event_outcome_detail = Some(value),
                "eventDateTime" => {
                    event.event_datetime = parse_timestamp(&value);
                    if event.event_datetime.is_none() {
                        tracing::warn!(line, value = %value, "error parsing eventDateTime value");
                    }
                }
                "agentIdentifierType" => {
                    agent.get_or_insert_default().identifier_type = Some(value);
                }
                "agentIdentifierValue" => {
                    agent.get_or_insert_default().identifier_value = Some(value);
                }
                "agentName" => agent.get_or_insert_default().name = Some(value),
                "agentType" => {
                    let mut closed = agent.take().unwrap_or_default();
                    closed.agent_type = Some(value);
                    agents.push(closed);
                }
                _ => {}
            }
        }

        agents.extend(agent);

        EventRow {
            line,
            filename,
            event,
            agents,
        }
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = Result<EventRow, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(false) => return None,
                Ok(true) if self.record.iter().all(str::is_empty) => {}
                Ok(true) => return Some(Ok(self.parse_record())),
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

/// Parses an ISO 8601 datetime or date. Values without an offset are UTC;
/// plain dates are midnight UTC.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rows(csv: &str) -> Vec<EventRow> {
        EventReader::from_reader(csv.as_bytes())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn maps_event_columns() {
        let rows = rows(
            "filename,eventType,eventDetail,eventOutcome,eventOutcomeDetailNote\n\
             objects/a.tif,ingestion,scanner,pass,all good\n",
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].filename.as_deref(), Some("objects/a.tif"));
        assert_eq!(
            rows[0].event,
            EventFields {
                event_type: Some("ingestion".to_owned()),
                event_detail: Some("scanner".to_owned()),
                event_outcome: Some("pass".to_owned()),
                event_outcome_detail: Some("all good".to_owned()),
                event_datetime: None,
            }
        );
        assert!(rows[0].agents.is_empty());
    }

    #[test]
    fn agent_type_closes_each_agent() {
        let rows = rows(
            "filename,agentName,agentType,agentName,agentIdentifierValue,agentType\n\
             a,Jane,person,Scanner,42,software\n",
        );
        let agents = &rows[0].agents;
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].name.as_deref(), Some("Jane"));
        assert_eq!(agents[0].agent_type.as_deref(), Some("person"));
        assert_eq!(agents[1].identifier_value.as_deref(), Some("42"));
        assert_eq!(agents[1].agent_type.as_deref(), Some("software"));
    }

    #[test]
    fn trailing_agent_fields_form_an_agent() {
        let rows = rows(
            "filename,agentName,agentType,agentIdentifierType,agentIdentifierValue\n\
             a,Jane,person,local,7\n",
        );
        let agents = &rows[0].agents;
        assert_eq!(agents.len(), 2);
        assert_eq!(
            agents[1],
            AgentRow {
                identifier_type: Some("local".to_owned()),
                identifier_value: Some("7".to_owned()),
                name: None,
                agent_type: None,
            }
        );
    }

    #[test]
    fn blank_cells_and_rows_are_ignored() {
        let rows = rows(
            "filename,eventType,agentName,agentType\n\
             a,,,\n\
             ,,,\n\
             \n\
             b,creation,,\n",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event, EventFields::default());
        assert!(rows[0].agents.is_empty());
        assert_eq!(rows[1].filename.as_deref(), Some("b"));
        assert_eq!(rows[1].event.event_type.as_deref(), Some("creation"));
    }

    #[test]
    fn malformed_timestamp_is_absent() {
        let rows = rows("filename,eventDateTime\na,yesterday-ish\n");
        assert_eq!(rows[0].event.event_datetime, None);
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let noon = Utc.with_ymd_and_hms(2019, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2019-03-01T12:00:00Z"), Some(noon));
        assert_eq!(parse_timestamp("2019-03-01T14:00:00+02:00"), Some(noon));
        assert_eq!(parse_timestamp("2019-03-01 12:00:00"), Some(noon));
        assert_eq!(parse_timestamp("2019-03-01T12:00"), Some(noon));
        assert_eq!(
            parse_timestamp("2019-03-01"),
            Some(Utc.with_ymd_and_hms(2019, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("2019-02-30"), None);
    }
}
