//! Delay-ordered action scheduler.
//!
//! The timer does not own a frame source. The embedder calls [`Timer::tick`]
//! with the current clock reading once per frame, drains due actions with
//! [`Timer::pop_due`], then calls [`Timer::settle`] to decide whether another
//! frame is needed.

use crate::event::RecordedEvent;

/// Frame scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Cleared or never started.
    Idle,
    /// A frame is wanted.
    Scheduled,
    /// Started, queue drained, not live. Adding an action wakes it up.
    Parked,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAction<A> {
    pub delay: f64,
    pub action: A,
}

#[derive(Debug, Clone)]
pub struct Timer<A> {
    actions: Vec<ScheduledAction<A>>,
    time_offset: f64,
    speed: f64,
    live_mode: bool,
    last_timestamp: f64,
    frame: FrameState,
}

impl<A> Timer<A> {
    pub fn new(speed: f64, live_mode: bool) -> Self {
        Self {
            actions: Vec::new(),
            time_offset: 0.0,
            speed,
            live_mode,
            last_timestamp: 0.0,
            frame: FrameState::Idle,
        }
    }

    /// Inserts after every action with a delay less than or equal to `delay`.
    pub fn add_action(&mut self, delay: f64, action: A) {
        let at = match self.actions.last() {
            Some(last) if last.delay > delay => self.actions.partition_point(|a| a.delay <= delay),
            _ => self.actions.len(),
        };
        self.actions.insert(at, ScheduledAction { delay, action });
        if self.frame == FrameState::Parked {
            self.frame = FrameState::Scheduled;
        }
    }

    pub fn start(&mut self, now: f64) {
        self.time_offset = 0.0;
        self.last_timestamp = now;
        // Stable, so equal delays keep their insertion order.
        self.actions
            .sort_by(|a, b| a.delay.partial_cmp(&b.delay).unwrap_or(std::cmp::Ordering::Equal));
        self.frame = FrameState::Scheduled;
    }

    /// Advances the offset by the scaled elapsed time. No-op unless a frame
    /// was scheduled.
    pub fn tick(&mut self, now: f64) {
        if self.frame != FrameState::Scheduled {
            return;
        }
        self.time_offset += (now - self.last_timestamp) * self.speed;
        self.last_timestamp = now;
    }

    /// Removes the head action if it is due.
    pub fn pop_due(&mut self) -> Option<ScheduledAction<A>> {
        if self.frame == FrameState::Idle {
            return None;
        }
        match self.actions.first() {
            Some(head) if head.delay <= self.time_offset => Some(self.actions.remove(0)),
            _ => None,
        }
    }

    pub fn settle(&mut self) {
        if self.frame == FrameState::Idle {
            return;
        }
        self.frame = if !self.actions.is_empty() || self.live_mode {
            FrameState::Scheduled
        } else {
            FrameState::Parked
        };
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.frame = FrameState::Idle;
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn toggle_live_mode(&mut self, live: bool) {
        self.live_mode = live;
    }

    /// Started and not cleared since.
    pub fn is_active(&self) -> bool {
        self.frame != FrameState::Idle
    }

    pub fn wants_frame(&self) -> bool {
        self.frame == FrameState::Scheduled
    }

    pub fn frame_state(&self) -> FrameState {
        self.frame
    }

    pub fn time_offset(&self) -> f64 {
        self.time_offset
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_live(&self) -> bool {
        self.live_mode
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn delays(&self) -> Vec<f64> {
        self.actions.iter().map(|a| a.delay).collect()
    }

    pub fn actions(&self) -> impl Iterator<Item = &ScheduledAction<A>> {
        self.actions.iter()
    }
}

/// Delay of `event` from `baseline`. Batched pointer moves start at their
/// first sub-position.
pub fn add_delay(event: &RecordedEvent, baseline: f64) -> f64 {
    let start = event.timestamp + event.first_position_offset().unwrap_or(0.0);
    start - baseline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventData, IncrementalData, MousePosition, PointerMoveData};

    #[test]
    fn queue_stays_sorted_with_stable_ties() {
        // Small LCG so the sequence is reproducible without a rand dependency.
        let mut seed: u64 = 0x2545_f491;
        let mut timer = Timer::new(1.0, false);
        for i in 0..500u32 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let delay = ((seed >> 33) % 40) as f64;
            timer.add_action(delay, i);

            let items: Vec<_> = timer.actions().collect();
            for pair in items.windows(2) {
                assert!(pair[0].delay <= pair[1].delay);
                if pair[0].delay == pair[1].delay {
                    assert!(pair[0].action < pair[1].action);
                }
            }
        }
    }

    #[test]
    fn tick_releases_actions_in_order_at_speed() {
        let mut timer = Timer::new(2.0, false);
        timer.add_action(100.0, "b");
        timer.add_action(50.0, "a");
        timer.add_action(300.0, "c");
        timer.start(0.0);

        timer.tick(60.0);
        let mut fired = Vec::new();
        while let Some(a) = timer.pop_due() {
            fired.push(a.action);
        }
        timer.settle();
        assert_eq!(fired, vec!["a", "b"]);
        assert_eq!(timer.time_offset(), 120.0);
        assert!(timer.wants_frame());

        timer.tick(200.0);
        assert_eq!(timer.pop_due().map(|a| a.action), Some("c"));
        timer.settle();
        assert_eq!(timer.frame_state(), FrameState::Parked);
        assert!(timer.is_active());

        timer.add_action(10.0, "late");
        assert!(timer.wants_frame());
    }

    #[test]
    fn live_mode_keeps_frames_coming_and_clear_stops_them() {
        let mut timer: Timer<()> = Timer::new(1.0, true);
        timer.start(0.0);
        timer.tick(16.0);
        timer.settle();
        assert!(timer.wants_frame());

        timer.clear();
        assert!(!timer.is_active());
        timer.add_action(1.0, ());
        assert!(!timer.wants_frame());
    }

    #[test]
    fn speed_change_keeps_offset() {
        let mut timer: Timer<()> = Timer::new(1.0, true);
        timer.start(0.0);
        timer.tick(100.0);
        timer.set_speed(4.0);
        timer.tick(110.0);
        assert_eq!(timer.time_offset(), 140.0);
    }

    #[test]
    fn pointer_batches_are_delayed_by_their_first_position() {
        let event = RecordedEvent::new(
            1000.0,
            EventData::IncrementalSnapshot(IncrementalData::MouseMove(PointerMoveData {
                positions: vec![MousePosition {
                    x: 1.0,
                    y: 2.0,
                    id: 3,
                    time_offset: -40.0,
                }],
            })),
        );
        assert_eq!(add_delay(&event, 900.0), 60.0);
    }
}
