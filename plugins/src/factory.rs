use std::rc::Rc;

use anyhow::Result;

use domreplay_core::api::{
    AppConfig, AssetProvider, AssetResolver, CodecKind, RecordedEvent, ReplayPlugin,
    ReplayerBuilder, TreeDiff, Unpacker,
};
use serde_json::Value;

use crate::assets::{BlobStoreResolver, HttpFetchResolver};
use crate::codec::{JsonUnpacker, PackedUnpacker};
use crate::console::ConsoleLogPlugin;
use crate::diff::ReplaceDiff;

pub fn build_unpacker(cfg: &AppConfig) -> Box<dyn Unpacker> {
    match cfg.codec.kind {
        CodecKind::Json => Box::new(JsonUnpacker),
        CodecKind::Packed => Box::new(PackedUnpacker),
    }
}

pub fn build_resolver(cfg: &AppConfig) -> Result<Rc<dyn AssetResolver>> {
    match cfg.assets.provider {
        AssetProvider::BlobStore => Ok(Rc::new(BlobStoreResolver::new())),
        AssetProvider::Http => Ok(Rc::new(HttpFetchResolver::new(cfg.assets.http_timeout_ms)?)),
    }
}

/// The tree diff only matters when the virtual fast path is enabled.
pub fn build_diff(cfg: &AppConfig) -> Option<Box<dyn TreeDiff>> {
    cfg.player
        .use_virtual_dom
        .then(|| Box::new(ReplaceDiff) as Box<dyn TreeDiff>)
}

pub fn build_plugins(_cfg: &AppConfig) -> Vec<Box<dyn ReplayPlugin>> {
    vec![Box::new(ConsoleLogPlugin::new())]
}

fn assemble(builder: ReplayerBuilder, cfg: &AppConfig) -> Result<ReplayerBuilder> {
    let mut builder = builder
        .config(cfg.player.clone())
        .resolver(build_resolver(cfg)?);
    if let Some(diff) = build_diff(cfg) {
        builder = builder.diff(diff);
    }
    for plugin in build_plugins(cfg) {
        builder = builder.plugin(plugin);
    }
    Ok(builder)
}

/// Builder for raw events, decoded with the configured codec.
pub fn builder_from_raw(cfg: &AppConfig, raw: &[Value]) -> Result<ReplayerBuilder> {
    assemble(ReplayerBuilder::from_raw(raw, build_unpacker(cfg)), cfg)
}

/// Builder for events that are already decoded.
pub fn builder_from_events(cfg: &AppConfig, events: Vec<RecordedEvent>) -> Result<ReplayerBuilder> {
    assemble(
        ReplayerBuilder::new(events).unpacker(build_unpacker(cfg)),
        cfg,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use domreplay_core::api::VirtualDocument;
    use serde_json::json;

    #[test]
    fn packed_codec_decodes_raw_recordings() {
        let mut cfg = AppConfig::default();
        cfg.codec.kind = CodecKind::Packed;
        let raw: Vec<Value> = [
            json!({ "type": 4, "timestamp": 0, "data": { "href": "", "width": 10, "height": 10 } }),
            json!({ "type": 5, "timestamp": 10, "data": { "tag": "x" } }),
        ]
        .iter()
        .map(|e| Value::String(PackedUnpacker::pack(e)))
        .collect();

        let replayer = builder_from_raw(&cfg, &raw)
            .unwrap()
            .build(VirtualDocument::new())
            .unwrap();
        assert_eq!(replayer.get_meta_data().total_time, 10.0);
        assert!(replayer.diagnostics().warnings().is_empty());
    }

    #[test]
    fn undecodable_events_become_warnings() {
        let cfg = AppConfig::default();
        let raw = vec![
            json!({ "type": 4, "timestamp": 0, "data": {} }),
            json!({ "type": 99, "timestamp": 5 }),
            json!({ "type": 5, "timestamp": 10, "data": { "tag": "x" } }),
        ];
        let replayer = builder_from_raw(&cfg, &raw)
            .unwrap()
            .build(VirtualDocument::new())
            .unwrap();
        assert_eq!(replayer.playback().events().len(), 2);
        assert_eq!(replayer.diagnostics().warnings().len(), 1);
    }

    #[test]
    fn diff_follows_the_virtual_dom_switch() {
        let mut cfg = AppConfig::default();
        assert!(build_diff(&cfg).is_none());
        cfg.player.use_virtual_dom = true;
        assert!(build_diff(&cfg).is_some());
    }
}
