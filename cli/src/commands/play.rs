use domreplay_core::api::{AppConfig, VirtualDocument};
use domreplay_plugins::factory;

use crate::commands::cli::PlayArgs;
use crate::commands::frames::{FrameDriver, Pacing};
use crate::commands::recording::{read_recording, write_html};
use crate::error::CliError;

pub async fn handle_play(args: PlayArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    if args.offset < 0.0 {
        return Err(CliError::Command(format!(
            "--offset must not be negative, got {}",
            args.offset
        )));
    }
    if args.skip_inactive {
        cfg.player.skip_inactive = true;
    }

    let raw = read_recording(&args.recording)?;
    let pacing = Pacing::new(args.fast);
    let mut replayer = factory::builder_from_raw(&cfg, &raw)?
        .clock(pacing.clock())
        .build(VirtualDocument::new())?;

    let meta = replayer.get_meta_data();
    tracing::info!(
        target: "domreplay",
        "playing {} ({:.0}ms, speed x{})",
        args.recording.display(),
        meta.total_time,
        cfg.player.speed
    );

    let mut driver = FrameDriver::new(pacing, replayer.subscribe(), args.events);
    if args.seek_only {
        replayer.pause(Some(args.offset));
        driver.step(&mut replayer).await;
    } else {
        replayer.play(args.offset);
        driver.run(&mut replayer, args.max_ms).await;
    }

    let warnings = replayer.diagnostics().warnings();
    tracing::info!(
        target: "domreplay",
        "stopped at {:.0}ms after {} frames ({} warnings, finished: {})",
        replayer.get_current_time(),
        driver.stats.frames,
        warnings.len(),
        driver.stats.finished
    );

    if !args.no_html {
        write_html(&replayer.tree().document_html(), args.html.as_deref())?;
    }
    replayer.destroy();
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::EventFormat;
    use std::io::Write;

    const RECORDING: &str = r#"[
  {"type":4,"timestamp":1000,"data":{"href":"https://example.test/","width":800,"height":600}},
  {"type":2,"timestamp":1001,"data":{"node":{"type":0,"id":1,"childNodes":[
    {"type":2,"id":2,"tagName":"html","attributes":{},"childNodes":[
      {"type":2,"id":3,"tagName":"head","attributes":{},"childNodes":[]},
      {"type":2,"id":4,"tagName":"body","attributes":{},"childNodes":[]}]}]},
    "initialOffset":{"top":0,"left":0}}},
  {"type":3,"timestamp":1200,"data":{"source":0,"adds":[
    {"parentId":4,"nextId":null,"node":{"type":2,"id":10,"tagName":"p","attributes":{},"childNodes":[]}}]}}
]"#;

    fn args(recording: &std::path::Path, html: &std::path::Path) -> PlayArgs {
        PlayArgs {
            recording: recording.to_path_buf(),
            offset: 0.0,
            seek_only: false,
            skip_inactive: false,
            fast: true,
            max_ms: None,
            events: EventFormat::None,
            html: Some(html.to_path_buf()),
            no_html: false,
        }
    }

    #[tokio::test]
    async fn fast_play_writes_final_document() {
        let mut rec = tempfile::NamedTempFile::new().unwrap();
        rec.write_all(RECORDING.as_bytes()).unwrap();
        let out = tempfile::NamedTempFile::new().unwrap();

        let code = handle_play(args(rec.path(), out.path()), AppConfig::default())
            .await
            .unwrap();
        assert_eq!(code, 0);
        let html = std::fs::read_to_string(out.path()).unwrap();
        assert!(html.contains("<p"), "{html}");
    }

    #[tokio::test]
    async fn seek_only_stops_before_later_mutation() {
        let mut rec = tempfile::NamedTempFile::new().unwrap();
        rec.write_all(RECORDING.as_bytes()).unwrap();
        let out = tempfile::NamedTempFile::new().unwrap();

        let mut play = args(rec.path(), out.path());
        play.seek_only = true;
        play.offset = 50.0;
        handle_play(play, AppConfig::default()).await.unwrap();
        let html = std::fs::read_to_string(out.path()).unwrap();
        assert!(html.contains("<body"), "{html}");
        assert!(!html.contains("<p"), "{html}");
    }

    #[tokio::test]
    async fn single_event_recording_is_a_replay_error() {
        let mut rec = tempfile::NamedTempFile::new().unwrap();
        rec.write_all(br#"[{"type":4,"timestamp":1,"data":{"href":"x","width":1,"height":1}}]"#)
            .unwrap();
        let out = tempfile::NamedTempFile::new().unwrap();
        let err = handle_play(args(rec.path(), out.path()), AppConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 50);
    }
}
