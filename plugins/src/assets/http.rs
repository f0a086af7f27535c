use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use domreplay_core::api::{AssetData, AssetError, AssetResolver};

use super::decode_payload;

/// Resolves captured payloads inline and fetches urls whose payload is
/// missing, turning the response into a data url.
///
/// Fetches run on the ambient tokio runtime; the replayer must be ticked
/// from inside it.
#[derive(Debug, Clone)]
pub struct HttpFetchResolver {
    http: reqwest::Client,
}

impl HttpFetchResolver {
    pub fn new(timeout_ms: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self { http })
    }

    async fn fetch(&self, url: &str) -> Result<String, AssetError> {
        let fetch_err = |reason: String| AssetError::Fetch {
            url: url.to_string(),
            reason,
        };
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_err(format!("status {}", status.as_u16())));
        }
        let mime = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = resp.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        tracing::debug!(target: "domreplay", url, bytes = body.len(), "fetched asset");
        Ok(format!("data:{mime};base64,{}", STANDARD.encode(&body)))
    }
}

#[async_trait(?Send)]
impl AssetResolver for HttpFetchResolver {
    async fn resolve(&self, asset: &AssetData) -> Result<String, AssetError> {
        if asset.payload.is_none() {
            return self.fetch(&asset.url).await;
        }
        match decode_payload(asset)? {
            Some(payload) => Ok(payload.to_data_url()),
            None => Ok(asset
                .payload
                .as_ref()
                .and_then(|p| p.as_str())
                .unwrap_or_default()
                .to_string()),
        }
    }
}
