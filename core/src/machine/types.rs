use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::event::{NodeId, RecordedEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Paused,
    Playing,
    Live,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paused => "paused",
            Self::Playing => "playing",
            Self::Live => "live",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedState {
    Normal,
    Skipping,
}

impl fmt::Display for SpeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Skipping => "skipping",
        })
    }
}

/// A timeline event with its scheduling delay.
///
/// `seq` is unique per machine and identifies the entry independent of its
/// position in the list.
#[derive(Debug, Clone)]
pub struct EventEntry {
    pub seq: u64,
    pub delay: f64,
    pub event: Rc<RecordedEvent>,
}

impl EventEntry {
    pub fn timestamp(&self) -> f64 {
        self.event.timestamp
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

/// Work queued on the timer.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackAction {
    Cast(EventEntry),
    /// One sub-position of a batched pointer move.
    PointerMove {
        x: f64,
        y: f64,
        id: NodeId,
        touch: bool,
    },
    /// Keeps the timer alive until the end of a pointer batch.
    KeepAlive,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Play { time_offset: f64 },
    Pause,
    CastEvent(EventEntry),
    End,
    ToLive { baseline_time: Option<f64> },
    AddEvent(Rc<RecordedEvent>),
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play { .. } => "PLAY",
            Self::Pause => "PAUSE",
            Self::CastEvent(_) => "CAST_EVENT",
            Self::End => "END",
            Self::ToLive { .. } => "TO_LIVE",
            Self::AddEvent(_) => "ADD_EVENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedEvent {
    SetSpeed(f64),
    FastForward(f64),
    BackToNormal,
}

impl SpeedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetSpeed(_) => "SET_SPEED",
            Self::FastForward(_) => "FAST_FORWARD",
            Self::BackToNormal => "BACK_TO_NORMAL",
        }
    }
}

/// Side effects the replayer runs after a playback transition, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    /// The new baseline is before the last played event.
    PlayBack,
    /// Apply these events synchronously, in order, as one batch.
    ApplySync(Vec<EventEntry>),
    /// Apply a single event right now.
    CastSync(EventEntry),
    Flush,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
    pub effects: Vec<PlaybackEffect>,
}

impl<S: PartialEq> Transition<S> {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}
