use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::incremental::{IncrementalData, IncrementalSource};
use super::snapshot::SerializedNode;
use super::wire::RawEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DomContentLoaded,
    Load,
    FullSnapshot,
    IncrementalSnapshot,
    Meta,
    Custom,
    Plugin,
    Asset,
}

impl EventType {
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => Self::DomContentLoaded,
            1 => Self::Load,
            2 => Self::FullSnapshot,
            3 => Self::IncrementalSnapshot,
            4 => Self::Meta,
            5 => Self::Custom,
            6 => Self::Plugin,
            7 => Self::Asset,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        match self {
            Self::DomContentLoaded => 0,
            Self::Load => 1,
            Self::FullSnapshot => 2,
            Self::IncrementalSnapshot => 3,
            Self::Meta => 4,
            Self::Custom => 5,
            Self::Plugin => 6,
            Self::Asset => 7,
        }
    }
}

/// One recorded event. The event type is carried by the [`EventData`] variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct RecordedEvent {
    pub timestamp: f64,
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    DomContentLoaded,
    Load,
    FullSnapshot(FullSnapshotData),
    IncrementalSnapshot(IncrementalData),
    Meta(MetaData),
    Custom(CustomData),
    Plugin(PluginData),
    Asset(AssetData),
}

impl RecordedEvent {
    pub fn new(timestamp: f64, data: EventData) -> Self {
        Self { timestamp, data }
    }

    pub fn event_type(&self) -> EventType {
        match &self.data {
            EventData::DomContentLoaded => EventType::DomContentLoaded,
            EventData::Load => EventType::Load,
            EventData::FullSnapshot(_) => EventType::FullSnapshot,
            EventData::IncrementalSnapshot(_) => EventType::IncrementalSnapshot,
            EventData::Meta(_) => EventType::Meta,
            EventData::Custom(_) => EventType::Custom,
            EventData::Plugin(_) => EventType::Plugin,
            EventData::Asset(_) => EventType::Asset,
        }
    }

    pub fn incremental(&self) -> Option<&IncrementalData> {
        match &self.data {
            EventData::IncrementalSnapshot(d) => Some(d),
            _ => None,
        }
    }

    pub fn incremental_source(&self) -> Option<IncrementalSource> {
        self.incremental().map(IncrementalData::source)
    }

    /// Offset of the first sub-position for batched pointer moves.
    pub fn first_position_offset(&self) -> Option<f64> {
        match self.incremental()? {
            IncrementalData::MouseMove(d)
            | IncrementalData::TouchMove(d)
            | IncrementalData::Drag(d) => d.positions.first().map(|p| p.time_offset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffset {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSnapshotData {
    pub node: SerializedNode,
    #[serde(default)]
    pub initial_offset: ScrollOffset,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub tag: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginData {
    pub plugin: String,
    #[serde(default)]
    pub payload: Value,
}

/// Captured bytes (or a capture failure) for an externally referenced url.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetData {
    pub url: String,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub failed: bool,
}
