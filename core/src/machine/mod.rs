//! # Playback state machines
//!
//! Two small machines drive playback:
//!
//! 1. **Playback** (`paused` / `playing` / `live`) owns the sorted event list,
//!    the timer and the baseline. It returns the side effects of each
//!    transition instead of running them, so the replayer stays the only code
//!    that touches the tree.
//! 2. **Speed** (`normal` / `skipping`) scales the timer while inactive
//!    periods are skipped.

pub mod playback;
pub mod speed;
pub mod transitions;
pub mod types;

pub use playback::{discard_prior_snapshots, PlaybackContext, PlaybackMachine};
pub use speed::{compute_skip_speed, SpeedMachine};
pub use transitions::{PlaybackTransition, TransitionError};
pub use types::{
    EventEntry, PlaybackAction, PlaybackEffect, PlayerEvent, PlayerState, SpeedEvent, SpeedState,
    Transition,
};
