//! Playback machine.

use std::rc::Rc;

use super::transitions::{PlaybackTransition, TransitionError};
use super::types::{
    EventEntry, PlaybackAction, PlaybackEffect, PlayerEvent, PlayerState, Transition,
};
use crate::clock::Clock;
use crate::event::{EventData, RecordedEvent};
use crate::timer::{add_delay, Timer};

#[derive(Debug)]
pub struct PlaybackContext {
    pub events: Vec<EventEntry>,
    pub timer: Timer<PlaybackAction>,
    pub time_offset: f64,
    pub baseline_time: f64,
    pub last_played_event: Option<EventEntry>,
}

#[derive(Debug)]
pub struct PlaybackMachine {
    state: PlayerState,
    context: PlaybackContext,
    next_seq: u64,
}

/// Events from the last Meta at or before `baseline` onwards.
pub fn discard_prior_snapshots(events: &[EventEntry], baseline: f64) -> &[EventEntry] {
    events
        .iter()
        .rposition(|e| matches!(e.event.data, EventData::Meta(_)) && e.timestamp() <= baseline)
        .map(|idx| &events[idx..])
        .unwrap_or(events)
}

impl PlaybackMachine {
    /// `events` must already be sorted by timestamp.
    pub fn new(events: Vec<Rc<RecordedEvent>>, timer: Timer<PlaybackAction>) -> Self {
        let baseline_time = events.first().map(|e| e.timestamp).unwrap_or(0.0);
        let mut next_seq = 0;
        let events = events
            .into_iter()
            .map(|event| {
                next_seq += 1;
                EventEntry {
                    seq: next_seq,
                    delay: add_delay(&event, baseline_time),
                    event,
                }
            })
            .collect();
        Self {
            state: PlayerState::Paused,
            context: PlaybackContext {
                events,
                timer,
                time_offset: 0.0,
                baseline_time,
                last_played_event: None,
            },
            next_seq,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn context(&self) -> &PlaybackContext {
        &self.context
    }

    pub fn events(&self) -> &[EventEntry] {
        &self.context.events
    }

    pub fn timer(&self) -> &Timer<PlaybackAction> {
        &self.context.timer
    }

    pub fn timer_mut(&mut self) -> &mut Timer<PlaybackAction> {
        &mut self.context.timer
    }

    pub fn baseline_time(&self) -> f64 {
        self.context.baseline_time
    }

    /// Whether `entry` is the last event of the timeline right now.
    pub fn is_last(&self, entry: &EventEntry) -> bool {
        self.context.events.last().map(|e| e.seq) == Some(entry.seq)
    }

    pub fn send(
        &mut self,
        event: PlayerEvent,
        clock: &dyn Clock,
    ) -> Result<Transition<PlayerState>, TransitionError> {
        let from = self.state;
        let to = PlaybackTransition::target(from, &event)?;
        let mut effects = Vec::new();
        match event {
            PlayerEvent::Pause => self.context.timer.clear(),
            PlayerEvent::CastEvent(entry) => self.context.last_played_event = Some(entry),
            PlayerEvent::End => {
                self.context.last_played_event = None;
                self.context.timer.clear();
            }
            PlayerEvent::Play { time_offset } => {
                self.context.time_offset = time_offset;
                self.context.baseline_time = self
                    .context
                    .events
                    .first()
                    .map(|e| e.timestamp())
                    .unwrap_or(0.0)
                    + time_offset;
                self.play(clock.now(), &mut effects);
            }
            PlayerEvent::ToLive { baseline_time } => {
                self.context.timer.toggle_live_mode(true);
                self.context.timer.start(clock.now());
                self.context.baseline_time = baseline_time.unwrap_or_else(|| clock.epoch_ms());
            }
            PlayerEvent::AddEvent(event) => self.add_event(event, &mut effects),
        }
        self.state = to;
        Ok(Transition { from, to, effects })
    }

    fn play(&mut self, now: f64, effects: &mut Vec<PlaybackEffect>) {
        let ctx = &mut self.context;
        ctx.timer.clear();
        let baseline = ctx.baseline_time;
        for entry in ctx.events.iter_mut() {
            entry.delay = add_delay(&entry.event, baseline);
        }

        let last_played = ctx.last_played_event.as_ref();
        let last_played_ts = last_played.map(|e| add_delay(&e.event, 0.0));
        if last_played_ts.is_some_and(|ts| baseline < ts) {
            effects.push(PlaybackEffect::PlayBack);
        }

        let mut sync = Vec::new();
        for entry in discard_prior_snapshots(&ctx.events, baseline) {
            if let Some(ts) = last_played_ts.filter(|ts| *ts < baseline) {
                if entry.timestamp() <= ts || Some(entry) == last_played {
                    continue;
                }
            }
            if entry.timestamp() <= baseline {
                sync.push(entry.clone());
            } else {
                ctx.timer
                    .add_action(entry.delay, PlaybackAction::Cast(entry.clone()));
            }
        }
        effects.push(PlaybackEffect::ApplySync(sync));
        effects.push(PlaybackEffect::Flush);
        ctx.timer.start(now);
    }

    fn add_event(&mut self, event: Rc<RecordedEvent>, effects: &mut Vec<PlaybackEffect>) {
        self.next_seq += 1;
        let ctx = &mut self.context;
        let entry = EventEntry {
            seq: self.next_seq,
            delay: add_delay(&event, ctx.baseline_time),
            event,
        };
        let ts = entry.timestamp();
        let at = match ctx.events.last() {
            Some(last) if last.timestamp() > ts => {
                ctx.events.partition_point(|e| e.timestamp() <= ts)
            }
            _ => ctx.events.len(),
        };
        ctx.events.insert(at, entry.clone());

        if ts < ctx.baseline_time {
            effects.push(PlaybackEffect::CastSync(entry));
        } else if ctx.timer.is_active() {
            let delay = entry.delay;
            ctx.timer.add_action(delay, PlaybackAction::Cast(entry));
        }
    }
}
