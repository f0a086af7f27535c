use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use domreplay_core::api::{AssetData, AssetError, AssetResolver};
use uuid::Uuid;

use super::decode_payload;

pub const BLOB_URL_PREFIX: &str = "blob:domreplay/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Keeps decoded assets in memory under generated `blob:` urls.
///
/// Clones share the same store, so an embedder can keep a handle to read
/// blobs back while the replayer owns the resolver.
#[derive(Debug, Clone, Default)]
pub struct BlobStoreResolver {
    blobs: Rc<RefCell<HashMap<String, Blob>>>,
}

impl BlobStoreResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, local: &str) -> Option<Blob> {
        self.blobs.borrow().get(local).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.borrow().is_empty()
    }
}

#[async_trait(?Send)]
impl AssetResolver for BlobStoreResolver {
    async fn resolve(&self, asset: &AssetData) -> Result<String, AssetError> {
        let Some(payload) = decode_payload(asset)? else {
            // Already a usable reference.
            return Ok(asset
                .payload
                .as_ref()
                .and_then(|p| p.as_str())
                .unwrap_or_default()
                .to_string());
        };
        let local = format!("{BLOB_URL_PREFIX}{}", Uuid::new_v4());
        tracing::debug!(
            target: "domreplay",
            url = %asset.url,
            local = %local,
            bytes = payload.bytes.len(),
            "stored asset blob"
        );
        self.blobs.borrow_mut().insert(
            local.clone(),
            Blob {
                mime: payload.mime,
                bytes: payload.bytes,
            },
        );
        Ok(local)
    }

    fn revoke(&self, local: &str) {
        self.blobs.borrow_mut().remove(local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolved_blobs_can_be_read_back_and_revoked() {
        let store = BlobStoreResolver::new();
        let asset = AssetData {
            url: "https://a.test/a.png".into(),
            payload: Some(json!("data:image/png;base64,AAEC")),
            failed: false,
        };
        let local = futures::executor::block_on(store.resolve(&asset)).unwrap();
        assert!(local.starts_with(BLOB_URL_PREFIX));
        assert_eq!(
            store.get(&local),
            Some(Blob {
                mime: "image/png".into(),
                bytes: vec![0, 1, 2]
            })
        );

        store.revoke(&local);
        assert!(store.is_empty());
    }

    #[test]
    fn plain_references_are_returned_unchanged() {
        let store = BlobStoreResolver::new();
        let asset = AssetData {
            url: "https://a.test/a.png".into(),
            payload: Some(json!("blob:elsewhere/1")),
            failed: false,
        };
        let local = futures::executor::block_on(store.resolve(&asset)).unwrap();
        assert_eq!(local, "blob:elsewhere/1");
        assert!(store.is_empty());
    }
}
