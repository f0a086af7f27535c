use domreplay_core::api::{AppConfig, PlayerMetaData, VirtualDocument};
use domreplay_plugins::factory;
use serde::Serialize;

use crate::commands::cli::MetaArgs;
use crate::commands::recording::read_recording;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct MetaReport {
    #[serde(flatten)]
    meta: PlayerMetaData,
    events: usize,
    skipped: Vec<String>,
}

pub fn handle_meta(args: MetaArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    let raw = read_recording(&args.recording)?;
    // Metadata only; nothing is played.
    cfg.player.live_mode = false;
    let replayer = factory::builder_from_raw(&cfg, &raw)?.build(VirtualDocument::new())?;

    let report = MetaReport {
        meta: replayer.get_meta_data(),
        events: replayer.playback().events().len(),
        skipped: replayer.diagnostics().warnings(),
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::Command(format!("serialize meta: {e}")))?;
    println!("{json}");
    Ok(0)
}
