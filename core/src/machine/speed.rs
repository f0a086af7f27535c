//! Speed machine.

use super::transitions::{PlaybackTransition, TransitionError};
use super::types::{SpeedEvent, SpeedState, Transition};
use crate::timer::Timer;

#[derive(Debug, Clone)]
pub struct SpeedMachine {
    state: SpeedState,
    normal_speed: f64,
}

impl SpeedMachine {
    pub fn new(speed: f64) -> Self {
        Self {
            state: SpeedState::Normal,
            normal_speed: speed,
        }
    }

    pub fn state(&self) -> SpeedState {
        self.state
    }

    /// Speed restored by BACK_TO_NORMAL.
    pub fn normal_speed(&self) -> f64 {
        self.normal_speed
    }

    pub fn send<A>(
        &mut self,
        event: SpeedEvent,
        timer: &mut Timer<A>,
    ) -> Result<Transition<SpeedState>, TransitionError> {
        let from = self.state;
        let to = PlaybackTransition::speed_target(from, &event)?;
        match event {
            SpeedEvent::SetSpeed(speed) => timer.set_speed(speed),
            SpeedEvent::FastForward(speed) => {
                self.normal_speed = timer.speed();
                timer.set_speed(speed);
            }
            SpeedEvent::BackToNormal => timer.set_speed(self.normal_speed),
        }
        self.state = to;
        Ok(Transition {
            from,
            to,
            effects: Vec::new(),
        })
    }
}

/// Fast-forward speed for an inactive gap, capped at `max_speed`.
pub fn compute_skip_speed(gap_ms: f64, interval_ms: f64, max_speed: f64) -> f64 {
    if interval_ms <= 0.0 {
        return max_speed;
    }
    (gap_ms / interval_ms).round().min(max_speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_forward_restores_the_recorded_speed() {
        let mut timer: Timer<()> = Timer::new(2.0, false);
        let mut speed = SpeedMachine::new(2.0);

        speed.send(SpeedEvent::FastForward(40.0), &mut timer).unwrap();
        assert_eq!(speed.state(), SpeedState::Skipping);
        assert_eq!(timer.speed(), 40.0);

        speed.send(SpeedEvent::BackToNormal, &mut timer).unwrap();
        assert_eq!(speed.state(), SpeedState::Normal);
        assert_eq!(timer.speed(), 2.0);
    }

    #[test]
    fn set_speed_while_skipping_returns_to_normal() {
        let mut timer: Timer<()> = Timer::new(1.0, false);
        let mut speed = SpeedMachine::new(1.0);
        speed.send(SpeedEvent::FastForward(8.0), &mut timer).unwrap();
        let t = speed.send(SpeedEvent::SetSpeed(3.0), &mut timer).unwrap();
        assert_eq!((t.from, t.to), (SpeedState::Skipping, SpeedState::Normal));
        assert_eq!(timer.speed(), 3.0);
    }

    #[test]
    fn skip_speed_is_rounded_and_capped() {
        assert_eq!(compute_skip_speed(20_000.0, 5_000.0, 360.0), 4.0);
        assert_eq!(compute_skip_speed(22_600.0, 5_000.0, 360.0), 5.0);
        assert_eq!(compute_skip_speed(10_000_000.0, 5_000.0, 360.0), 360.0);
    }
}
