//! Event unpackers for the supported recording encodings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use domreplay_core::api::{decode_event, RecordedEvent, ReplayError, Unpacker};
use serde_json::Value;

/// Marker field carried by packed events.
pub const PACK_MARK_FIELD: &str = "v";
pub const PACK_MARK: &str = "v1";

/// Plain JSON events. An event may also arrive as a JSON-encoded string,
/// which is how some transports forward recordings.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonUnpacker;

impl Unpacker for JsonUnpacker {
    fn unpack(&self, raw: &Value) -> Result<RecordedEvent, ReplayError> {
        match raw {
            Value::String(s) => {
                let value: Value = serde_json::from_str(s)?;
                decode_event(value)
            }
            other => decode_event(other.clone()),
        }
    }
}

/// Events stored as base64 JSON strings with a version mark.
///
/// Unpacked (object) events are accepted as they are, so recordings mixing
/// both forms still load.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackedUnpacker;

impl PackedUnpacker {
    pub fn pack(event: &Value) -> String {
        let mut marked = event.clone();
        if let Value::Object(map) = &mut marked {
            map.insert(PACK_MARK_FIELD.to_string(), Value::String(PACK_MARK.to_string()));
        }
        STANDARD.encode(marked.to_string())
    }
}

impl Unpacker for PackedUnpacker {
    fn unpack(&self, raw: &Value) -> Result<RecordedEvent, ReplayError> {
        let packed = match raw {
            Value::String(s) => s,
            Value::Object(_) => return decode_event(raw.clone()),
            other => {
                return Err(ReplayError::Decode(format!(
                    "packed event must be a string, got {other}"
                )))
            }
        };
        let bytes = STANDARD
            .decode(packed.trim())
            .map_err(|e| ReplayError::Decode(format!("invalid base64: {e}")))?;
        let mut value: Value = serde_json::from_slice(&bytes)?;
        let Value::Object(map) = &mut value else {
            return Err(ReplayError::Decode("packed event is not an object".into()));
        };
        match map.remove(PACK_MARK_FIELD) {
            Some(Value::String(mark)) if mark == PACK_MARK => {}
            Some(other) => {
                return Err(ReplayError::Decode(format!("unsupported pack version {other}")))
            }
            None => return Err(ReplayError::Decode("packed event without version mark".into())),
        }
        decode_event(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domreplay_core::api::EventData;
    use serde_json::json;

    fn custom() -> Value {
        json!({ "type": 5, "timestamp": 12, "data": { "tag": "t", "payload": 1 } })
    }

    #[test]
    fn json_accepts_objects_and_encoded_strings() {
        let a = JsonUnpacker.unpack(&custom()).unwrap();
        let b = JsonUnpacker.unpack(&Value::String(custom().to_string())).unwrap();
        assert_eq!(a, b);
        assert!(matches!(a.data, EventData::Custom(_)));
    }

    #[test]
    fn packed_strings_need_the_version_mark() {
        let packed = PackedUnpacker::pack(&custom());
        let event = PackedUnpacker.unpack(&Value::String(packed)).unwrap();
        assert_eq!(event.timestamp, 12.0);

        let unmarked = STANDARD.encode(custom().to_string());
        let err = PackedUnpacker.unpack(&Value::String(unmarked)).unwrap_err();
        assert!(err.to_string().contains("version mark"));
    }

    #[test]
    fn packed_passes_plain_objects_through() {
        assert!(PackedUnpacker.unpack(&custom()).is_ok());
        assert!(PackedUnpacker.unpack(&json!(3)).is_err());
    }
}
