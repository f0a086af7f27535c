use std::time::Duration;

use domreplay_core::api::{AppConfig, VirtualDocument};
use domreplay_plugins::factory;
use serde_json::Value;
use tokio::io::AsyncBufReadExt;

use crate::commands::cli::LiveArgs;
use crate::commands::frames::{FrameDriver, Pacing};
use crate::commands::recording::write_html;
use crate::error::CliError;

pub async fn handle_live(args: LiveArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    cfg.player.live_mode = true;
    let pacing = Pacing::new(false);
    let mut replayer = factory::builder_from_raw(&cfg, &[])?
        .clock(pacing.clock())
        .build(VirtualDocument::new())?;
    let mut driver = FrameDriver::new(pacing, replayer.subscribe(), args.events);
    replayer.start_live(args.baseline);

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut added = 0usize;
    let mut rejected = 0usize;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let parsed = serde_json::from_str::<Value>(line)
                    .map_err(|e| e.to_string())
                    .and_then(|raw| replayer.add_raw_event(&raw).map_err(|e| e.to_string()));
                match parsed {
                    Ok(()) => added += 1,
                    Err(e) => {
                        rejected += 1;
                        tracing::warn!(target: "domreplay", "skipping live event: {e}");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(target: "domreplay", "interrupted");
                break;
            }
            _ = driver.wait() => {
                driver.step(&mut replayer).await;
            }
        }
    }

    let linger = tokio::time::Instant::now() + Duration::from_millis(args.linger_ms);
    while tokio::time::Instant::now() < linger {
        driver.frame(&mut replayer).await;
    }

    tracing::info!(
        target: "domreplay",
        "live session ended: {added} events added, {rejected} rejected"
    );
    if !args.no_html {
        write_html(&replayer.tree().document_html(), args.html.as_deref())?;
    }
    replayer.destroy();
    Ok(0)
}
