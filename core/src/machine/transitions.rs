//! Transition tables.

use thiserror::Error;

use super::types::{PlayerEvent, PlayerState, SpeedEvent, SpeedState};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The event has no transition from the current state.
    #[error("{event} is not accepted in state {state}")]
    Ignored { state: String, event: &'static str },
}

pub struct PlaybackTransition;

impl PlaybackTransition {
    /// Target state of `event` from `from`.
    pub fn target(from: PlayerState, event: &PlayerEvent) -> Result<PlayerState, TransitionError> {
        use PlayerState::*;
        let to = match (from, event) {
            (Playing, PlayerEvent::Pause) => Paused,
            (Playing, PlayerEvent::CastEvent(_)) => Playing,
            (Playing, PlayerEvent::End) => Paused,
            (Playing, PlayerEvent::AddEvent(_)) => Playing,

            (Paused, PlayerEvent::Play { .. }) => Playing,
            (Paused, PlayerEvent::CastEvent(_)) => Paused,
            (Paused, PlayerEvent::ToLive { .. }) => Live,
            (Paused, PlayerEvent::AddEvent(_)) => Paused,

            (Live, PlayerEvent::AddEvent(_)) => Live,
            (Live, PlayerEvent::CastEvent(_)) => Live,

            _ => {
                return Err(TransitionError::Ignored {
                    state: from.to_string(),
                    event: event.name(),
                })
            }
        };
        Ok(to)
    }

    pub fn speed_target(from: SpeedState, event: &SpeedEvent) -> Result<SpeedState, TransitionError> {
        use SpeedState::*;
        match (from, event) {
            (_, SpeedEvent::SetSpeed(_)) => Ok(Normal),
            (Normal, SpeedEvent::FastForward(_)) => Ok(Skipping),
            (Skipping, SpeedEvent::BackToNormal) => Ok(Normal),
            _ => Err(TransitionError::Ignored {
                state: from.to_string(),
                event: event.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_ignores_play_and_pause() {
        assert!(PlaybackTransition::target(PlayerState::Live, &PlayerEvent::Pause).is_err());
        assert!(PlaybackTransition::target(
            PlayerState::Live,
            &PlayerEvent::Play { time_offset: 0.0 }
        )
        .is_err());
        assert!(PlaybackTransition::target(PlayerState::Live, &PlayerEvent::End).is_err());
    }

    #[test]
    fn end_only_leaves_playing() {
        assert_eq!(
            PlaybackTransition::target(PlayerState::Playing, &PlayerEvent::End),
            Ok(PlayerState::Paused)
        );
        assert!(PlaybackTransition::target(PlayerState::Paused, &PlayerEvent::End).is_err());
    }

    #[test]
    fn fast_forward_requires_normal() {
        assert_eq!(
            PlaybackTransition::speed_target(SpeedState::Normal, &SpeedEvent::FastForward(4.0)),
            Ok(SpeedState::Skipping)
        );
        assert!(PlaybackTransition::speed_target(
            SpeedState::Skipping,
            &SpeedEvent::FastForward(4.0)
        )
        .is_err());
        assert!(
            PlaybackTransition::speed_target(SpeedState::Normal, &SpeedEvent::BackToNormal)
                .is_err()
        );
    }
}
