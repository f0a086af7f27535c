//! JSON wire decoding for recorded events.
//!
//! Recordings use numeric `type` / `source` tags, which serde cannot use as
//! enum discriminants directly. Events are read into a raw envelope first and
//! then converted into the typed model.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ReplayError;

use super::incremental::{IncrementalData, IncrementalSource};
use super::types::{EventData, EventType, RecordedEvent};

#[derive(Debug, Deserialize)]
pub(crate) struct RawEvent {
    #[serde(rename = "type")]
    kind: u64,
    timestamp: f64,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawEvent> for RecordedEvent {
    type Error = String;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let kind = EventType::from_code(raw.kind)
            .ok_or_else(|| format!("unknown event type {}", raw.kind))?;
        let data = decode_data(kind, raw.data).map_err(|e| e.to_string())?;
        Ok(RecordedEvent {
            timestamp: raw.timestamp,
            data,
        })
    }
}

fn decode_data(kind: EventType, data: Value) -> Result<EventData, serde_json::Error> {
    Ok(match kind {
        EventType::DomContentLoaded => EventData::DomContentLoaded,
        EventType::Load => EventData::Load,
        EventType::FullSnapshot => EventData::FullSnapshot(serde_json::from_value(data)?),
        EventType::IncrementalSnapshot => {
            EventData::IncrementalSnapshot(decode_incremental(data)?)
        }
        EventType::Meta => EventData::Meta(serde_json::from_value(data)?),
        EventType::Custom => EventData::Custom(serde_json::from_value(data)?),
        EventType::Plugin => EventData::Plugin(serde_json::from_value(data)?),
        EventType::Asset => EventData::Asset(serde_json::from_value(data)?),
    })
}

fn decode_incremental(data: Value) -> Result<IncrementalData, serde_json::Error> {
    use serde::de::Error as _;

    let code = data
        .get("source")
        .and_then(Value::as_u64)
        .ok_or_else(|| serde_json::Error::custom("incremental data without source"))?;
    let source = IncrementalSource::from_code(code)
        .ok_or_else(|| serde_json::Error::custom(format!("unknown incremental source {code}")))?;

    Ok(match source {
        IncrementalSource::Mutation => IncrementalData::Mutation(serde_json::from_value(data)?),
        IncrementalSource::MouseMove => IncrementalData::MouseMove(serde_json::from_value(data)?),
        IncrementalSource::MouseInteraction => {
            IncrementalData::MouseInteraction(serde_json::from_value(data)?)
        }
        IncrementalSource::Scroll => IncrementalData::Scroll(serde_json::from_value(data)?),
        IncrementalSource::ViewportResize => {
            IncrementalData::ViewportResize(serde_json::from_value(data)?)
        }
        IncrementalSource::Input => IncrementalData::Input(serde_json::from_value(data)?),
        IncrementalSource::TouchMove => IncrementalData::TouchMove(serde_json::from_value(data)?),
        IncrementalSource::MediaInteraction => {
            IncrementalData::MediaInteraction(serde_json::from_value(data)?)
        }
        IncrementalSource::StyleSheetRule => {
            IncrementalData::StyleSheetRule(serde_json::from_value(data)?)
        }
        IncrementalSource::CanvasMutation => {
            IncrementalData::CanvasMutation(serde_json::from_value(data)?)
        }
        IncrementalSource::Font => IncrementalData::Font(serde_json::from_value(data)?),
        IncrementalSource::Drag => IncrementalData::Drag(serde_json::from_value(data)?),
        IncrementalSource::StyleDeclaration => {
            IncrementalData::StyleDeclaration(serde_json::from_value(data)?)
        }
        IncrementalSource::Selection => IncrementalData::Selection(serde_json::from_value(data)?),
        IncrementalSource::AdoptedStyleSheet => {
            IncrementalData::AdoptedStyleSheet(serde_json::from_value(data)?)
        }
    })
}

pub fn decode_event(value: Value) -> Result<RecordedEvent, ReplayError> {
    serde_json::from_value(value).map_err(|e| ReplayError::Decode(e.to_string()))
}

pub fn decode_event_str(raw: &str) -> Result<RecordedEvent, ReplayError> {
    serde_json::from_str(raw).map_err(|e| ReplayError::Decode(e.to_string()))
}

/// Decodes either a JSON array of events or one event per line.
///
/// Entries that fail to decode are returned separately so callers can decide
/// whether to skip them.
pub fn decode_recording(raw: &str) -> (Vec<RecordedEvent>, Vec<ReplayError>) {
    let mut events = Vec::new();
    let mut errors = Vec::new();

    let values: Vec<Value> = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Array(items)) => items,
        Ok(single @ Value::Object(_)) => vec![single],
        _ => raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| match serde_json::from_str::<Value>(l) {
                Ok(v) => Some(v),
                Err(e) => {
                    errors.push(ReplayError::Json(e));
                    None
                }
            })
            .collect(),
    };

    for value in values {
        match decode_event(value) {
            Ok(ev) => events.push(ev),
            Err(e) => errors.push(e),
        }
    }

    (events, errors)
}
