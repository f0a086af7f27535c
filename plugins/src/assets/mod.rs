//! Asset resolvers.
//!
//! Captured payloads come in a few shapes: a data url string, or a
//! serialized blob `{ "type": mime, "data": [{ "base64": .. }, ..] }`.

mod blob_store;
mod http;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use domreplay_core::api::{AssetData, AssetError};
use serde_json::Value;

pub use blob_store::{Blob, BlobStoreResolver, BLOB_URL_PREFIX};
pub use http::HttpFetchResolver;

/// Decoded bytes of a captured asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Payload {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

fn unsupported(asset: &AssetData, reason: impl Into<String>) -> AssetError {
    AssetError::UnsupportedPayload {
        url: asset.url.clone(),
        reason: reason.into(),
    }
}

/// Parses a `data:` url. Non-base64 data is taken verbatim.
pub fn parse_data_url(url: &str) -> Option<Payload> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let (mime, is_base64) = match meta.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (meta, false),
    };
    let mime = if mime.is_empty() { "text/plain" } else { mime };
    let bytes = if is_base64 {
        STANDARD.decode(data).ok()?
    } else {
        data.as_bytes().to_vec()
    };
    Some(Payload {
        mime: mime.to_string(),
        bytes,
    })
}

/// Decodes the captured payload of `asset`. `Ok(None)` means the payload is
/// a plain reference that needs no decoding.
pub fn decode_payload(asset: &AssetData) -> Result<Option<Payload>, AssetError> {
    match &asset.payload {
        None => Err(unsupported(asset, "missing payload")),
        Some(Value::String(s)) if s.starts_with("data:") => parse_data_url(s)
            .map(Some)
            .ok_or_else(|| unsupported(asset, "malformed data url")),
        Some(Value::String(_)) => Ok(None),
        Some(Value::Object(map)) => {
            let mime = map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("application/octet-stream")
                .to_string();
            let chunks: Vec<&str> = match map.get("data") {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|c| c.get("base64").and_then(Value::as_str))
                    .collect(),
                _ => map.get("base64").and_then(Value::as_str).into_iter().collect(),
            };
            if chunks.is_empty() {
                return Err(unsupported(asset, "serialized blob without base64 data"));
            }
            let mut bytes = Vec::new();
            for chunk in chunks {
                let decoded = STANDARD
                    .decode(chunk)
                    .map_err(|e| unsupported(asset, format!("invalid base64: {e}")))?;
                bytes.extend(decoded);
            }
            Ok(Some(Payload { mime, bytes }))
        }
        Some(other) => Err(unsupported(asset, format!("unexpected payload {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(payload: Value) -> AssetData {
        AssetData {
            url: "https://a.test/x.png".into(),
            payload: Some(payload),
            failed: false,
        }
    }

    #[test]
    fn data_urls_decode_base64_and_plain_text() {
        let p = parse_data_url("data:image/png;base64,AAEC").unwrap();
        assert_eq!((p.mime.as_str(), p.bytes.as_slice()), ("image/png", &[0u8, 1, 2][..]));

        let p = parse_data_url("data:,hello").unwrap();
        assert_eq!((p.mime.as_str(), p.bytes.as_slice()), ("text/plain", &b"hello"[..]));
        assert!(parse_data_url("https://a.test").is_none());
    }

    #[test]
    fn serialized_blobs_concatenate_chunks() {
        let payload = decode_payload(&asset(json!({
            "type": "font/woff2",
            "data": [{ "base64": "AAE=" }, { "base64": "Ag==" }]
        })))
        .unwrap()
        .unwrap();
        assert_eq!(payload.mime, "font/woff2");
        assert_eq!(payload.bytes, vec![0, 1, 2]);
        assert_eq!(payload.to_data_url(), "data:font/woff2;base64,AAEC");
    }

    #[test]
    fn plain_references_and_bad_payloads() {
        assert_eq!(decode_payload(&asset(json!("blob:abc"))).unwrap(), None);
        assert!(decode_payload(&asset(json!(5))).is_err());
        assert!(decode_payload(&asset(json!({ "type": "image/png" }))).is_err());
    }
}
