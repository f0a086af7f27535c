use std::rc::Rc;
use std::time::Duration;

use domreplay_core::api::{
    Clock, ManualClock, PlayerState, Replayer, ReplayerEvent, SystemClock, TreeTarget,
};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::commands::cli::EventFormat;

pub const FRAME_MS: u64 = 16;

/// How frames are spaced: a real 16ms interval, or a simulated clock that
/// jumps 16ms per frame without sleeping.
#[derive(Clone)]
pub enum Pacing {
    Realtime(Rc<SystemClock>),
    Simulated(ManualClock),
}

impl Pacing {
    pub fn new(simulated: bool) -> Self {
        if simulated {
            Pacing::Simulated(ManualClock::new(0.0))
        } else {
            Pacing::Realtime(Rc::new(SystemClock::default()))
        }
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        match self {
            Pacing::Realtime(c) => c.clone() as Rc<dyn Clock>,
            Pacing::Simulated(c) => Rc::new(c.clone()) as Rc<dyn Clock>,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub events: u64,
    pub lagged: u64,
    pub finished: bool,
}

/// Drives `Replayer::tick` and prints published notifications.
pub struct FrameDriver {
    pacing: Pacing,
    interval: tokio::time::Interval,
    rx: broadcast::Receiver<ReplayerEvent>,
    format: EventFormat,
    pub stats: FrameStats,
}

impl FrameDriver {
    pub fn new(pacing: Pacing, rx: broadcast::Receiver<ReplayerEvent>, format: EventFormat) -> Self {
        let mut interval = tokio::time::interval(Duration::from_millis(FRAME_MS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        Self {
            pacing,
            interval,
            rx,
            format,
            stats: FrameStats::default(),
        }
    }

    /// Waits for the next frame boundary.
    pub async fn wait(&mut self) {
        match &self.pacing {
            Pacing::Realtime(_) => {
                self.interval.tick().await;
            }
            Pacing::Simulated(clock) => clock.advance(FRAME_MS as f64),
        }
    }

    /// Runs one frame without waiting.
    pub async fn step<T: TreeTarget>(&mut self, replayer: &mut Replayer<T>) {
        if replayer.assets().is_resolving() {
            let applied = replayer.flush_assets().await;
            if applied > 0 {
                tracing::debug!(target: "domreplay", "applied {applied} asset rewrites");
            }
        }
        replayer.tick();
        self.stats.frames += 1;
        self.drain(replayer);
    }

    pub async fn frame<T: TreeTarget>(&mut self, replayer: &mut Replayer<T>) {
        self.wait().await;
        self.step(replayer).await;
    }

    /// Runs frames until playback finishes, stops needing frames, or passes
    /// `limit_ms` of playback time.
    pub async fn run<T: TreeTarget>(&mut self, replayer: &mut Replayer<T>, limit_ms: Option<f64>) {
        self.drain(replayer);
        while replayer.needs_frame() && !self.stats.finished {
            self.frame(replayer).await;
            if let Some(limit) = limit_ms {
                if replayer.get_current_time() >= limit {
                    tracing::info!(target: "domreplay", "stopping at {limit}ms");
                    replayer.pause(None);
                    self.drain(replayer);
                    break;
                }
            }
            if replayer.state() == PlayerState::Paused && !replayer.needs_frame() {
                break;
            }
        }
    }

    /// Prints every notification published since the last call.
    pub fn drain<T: TreeTarget>(&mut self, replayer: &Replayer<T>) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.stats.events += 1;
                    if event == ReplayerEvent::Finish {
                        self.stats.finished = true;
                    }
                    if let Some(line) = render(&event, replayer.get_current_time(), self.format) {
                        println!("{line}");
                    }
                }
                Err(TryRecvError::Lagged(n)) => {
                    self.stats.lagged += n;
                    tracing::warn!(target: "domreplay", "dropped {n} notifications");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}

/// One output line for `event`, or `None` when printing is off.
pub fn render(event: &ReplayerEvent, at_ms: f64, format: EventFormat) -> Option<String> {
    match format {
        EventFormat::None => None,
        EventFormat::Json => {
            let mut value = serde_json::to_value(event).ok()?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("at".to_string(), serde_json::json!(at_ms));
            }
            Some(value.to_string())
        }
        EventFormat::Text => Some(format!("{at_ms:>10.1}ms  {}", describe(event))),
    }
}

fn describe(event: &ReplayerEvent) -> String {
    match event {
        ReplayerEvent::Resize { width, height } => format!("resize {width}x{height}"),
        ReplayerEvent::FullsnapshotRebuilded { timestamp } => {
            format!("full snapshot rebuilt ({timestamp})")
        }
        ReplayerEvent::SkipStart { speed } => format!("skip start x{speed}"),
        ReplayerEvent::SkipEnd { speed } => format!("skip end x{speed}"),
        ReplayerEvent::MouseInteraction { kind, target } => format!("{kind} on #{target}"),
        ReplayerEvent::EventCast {
            timestamp,
            event_type,
            source,
        } => match source {
            Some(source) => format!("cast {event_type:?}/{source:?} @{timestamp}"),
            None => format!("cast {event_type:?} @{timestamp}"),
        },
        ReplayerEvent::CustomEvent { tag, payload } => format!("custom {tag}: {payload}"),
        ReplayerEvent::StateChange { player, speed } => format!("state {player} / {speed}"),
        other => format!("{other:?}").to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_by_format() {
        let ev = ReplayerEvent::Resize {
            width: 800.0,
            height: 600.0,
        };
        assert_eq!(render(&ev, 0.0, EventFormat::None), None);

        let text = render(&ev, 12.0, EventFormat::Text).unwrap();
        assert!(text.ends_with("resize 800x600"), "{text}");

        let json = render(&ev, 12.0, EventFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "resize");
        assert_eq!(value["at"], 12.0);
    }

    #[test]
    fn unit_variants_print_lowercase() {
        let text = render(&ReplayerEvent::Finish, 0.0, EventFormat::Text).unwrap();
        assert!(text.ends_with("finish"), "{text}");
    }
}
