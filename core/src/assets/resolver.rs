use async_trait::async_trait;
use serde_json::Value;

use crate::error::AssetError;
use crate::event::AssetData;

/// Turns captured asset bytes into a reference the tree target can load.
#[async_trait(?Send)]
pub trait AssetResolver {
    async fn resolve(&self, asset: &AssetData) -> Result<String, AssetError>;

    /// Releases a reference returned by [`AssetResolver::resolve`].
    fn revoke(&self, _local: &str) {}
}

/// Accepts payloads that are already usable references (data urls or plain
/// strings).
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineResolver;

#[async_trait(?Send)]
impl AssetResolver for InlineResolver {
    async fn resolve(&self, asset: &AssetData) -> Result<String, AssetError> {
        match &asset.payload {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(AssetError::UnsupportedPayload {
                url: asset.url.clone(),
                reason: format!("expected a string payload, got {other}"),
            }),
            None => Err(AssetError::UnsupportedPayload {
                url: asset.url.clone(),
                reason: "missing payload".into(),
            }),
        }
    }
}
