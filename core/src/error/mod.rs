use thiserror::Error;

use crate::tree::TreeError;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("replayer needs at least 2 events, got {count}")]
    TooFewEvents { count: usize },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("asset error: {0}")]
    Asset(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("unsupported payload for {url}: {reason}")]
    UnsupportedPayload { url: String, reason: String },
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },
}
