//! Replay orchestrator.
//!
//! Owns the playback and speed machines, the tree being replayed into and
//! the asset cache. The embedder drives it by calling [`Replayer::tick`]
//! once per frame while [`Replayer::needs_frame`] is true.

mod cast;
mod catch_up;
mod interaction;
mod stage;

use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::assets::{apply_rewrite, AssetManager, AssetResolver, InlineResolver};
use crate::clock::{Clock, SystemClock};
use crate::config::{ReplayerConfig, ReplayerConfigPatch};
use crate::diagnostics::Diagnostics;
use crate::error::ReplayError;
use crate::event::{EventData, EventType, IncrementalSource, MouseInteractionKind, RecordedEvent};
use crate::machine::{
    PlaybackAction, PlaybackEffect, PlaybackMachine, PlayerEvent, PlayerState, SpeedEvent,
    SpeedMachine, SpeedState,
};
use crate::mirror::Mirror;
use crate::plugin::{PassthroughUnpacker, ReplayPlugin, TreeDiff, Unpacker};
use crate::timer::Timer;
use crate::tree::{html_element, toggle_class, TreeTarget};

pub use interaction::{MouseState, TailPoint, HOVER_CLASS};
pub use stage::StyleMirror;

use catch_up::CatchUp;
use stage::Stage;

pub const PAUSED_CLASS: &str = "rrweb-paused";

/// Notifications published to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayerEvent {
    Start,
    Pause,
    Resize {
        width: f64,
        height: f64,
    },
    Finish,
    FullsnapshotRebuilded {
        timestamp: f64,
    },
    PlayBack,
    SkipStart {
        speed: f64,
    },
    SkipEnd {
        speed: f64,
    },
    MouseInteraction {
        kind: String,
        target: i64,
    },
    EventCast {
        timestamp: f64,
        event_type: EventType,
        source: Option<IncrementalSource>,
    },
    CustomEvent {
        tag: String,
        payload: Value,
    },
    Flush,
    LoadStylesheetStart,
    LoadStylesheetEnd,
    StateChange {
        player: PlayerState,
        speed: SpeedState,
    },
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerMetaData {
    pub start_time: f64,
    pub end_time: f64,
    pub total_time: f64,
}

/// Handling of the first full snapshot, which is rendered at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstSnapshot {
    Unset,
    /// Pre-rendered; its cast is skipped once.
    Rendered(u64),
    Done,
}

#[derive(Debug, Clone, Copy)]
struct PendingFinish {
    at: f64,
    seq: u64,
}

#[derive(Debug, Clone)]
struct StylesheetWait {
    urls: Vec<String>,
    deadline: f64,
    resume: bool,
}

pub struct ReplayerBuilder {
    events: Vec<RecordedEvent>,
    decode_errors: Vec<String>,
    config: ReplayerConfig,
    plugins: Vec<Box<dyn ReplayPlugin>>,
    resolver: Option<Rc<dyn AssetResolver>>,
    diff: Option<Box<dyn TreeDiff>>,
    unpacker: Option<Box<dyn Unpacker>>,
    clock: Option<Rc<dyn Clock>>,
}

impl ReplayerBuilder {
    pub fn new(events: Vec<RecordedEvent>) -> Self {
        Self {
            events,
            decode_errors: Vec::new(),
            config: ReplayerConfig::default(),
            plugins: Vec::new(),
            resolver: None,
            diff: None,
            unpacker: None,
            clock: None,
        }
    }

    /// Decodes raw events with `unpacker`. Undecodable events are skipped and
    /// reported as warnings once the replayer is built.
    pub fn from_raw(raw: &[Value], unpacker: Box<dyn Unpacker>) -> Self {
        let mut events = Vec::with_capacity(raw.len());
        let mut decode_errors = Vec::new();
        for (idx, value) in raw.iter().enumerate() {
            match unpacker.unpack(value) {
                Ok(event) => events.push(event),
                Err(e) => decode_errors.push(format!("skipping event #{idx}: {e}")),
            }
        }
        let mut builder = Self::new(events);
        builder.decode_errors = decode_errors;
        builder.unpacker = Some(unpacker);
        builder
    }

    pub fn config(mut self, config: ReplayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn plugin(mut self, plugin: Box<dyn ReplayPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn resolver(mut self, resolver: Rc<dyn AssetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn diff(mut self, diff: Box<dyn TreeDiff>) -> Self {
        self.diff = Some(diff);
        self
    }

    pub fn unpacker(mut self, unpacker: Box<dyn Unpacker>) -> Self {
        self.unpacker = Some(unpacker);
        self
    }

    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build<T: TreeTarget>(self, tree: T) -> Result<Replayer<T>, ReplayError> {
        let config = self.config;
        if !config.live_mode && self.events.len() < 2 {
            return Err(ReplayError::TooFewEvents {
                count: self.events.len(),
            });
        }

        let diag = Diagnostics::new(
            config.diagnostic_capacity,
            config.show_warning,
            config.show_debug,
        );
        for msg in self.decode_errors {
            diag.warn(msg);
        }

        let resolver = self
            .resolver
            .unwrap_or_else(|| Rc::new(InlineResolver) as Rc<dyn AssetResolver>);
        let assets = AssetManager::new(resolver, config.hide_uncached_assets, diag.clone());
        let mut assets_enabled = false;
        let mut timeline = Vec::with_capacity(self.events.len());
        for event in self.events {
            match event.data {
                EventData::Asset(asset) => {
                    assets_enabled = true;
                    assets.add_pending(asset);
                }
                _ => timeline.push(Rc::new(event)),
            }
        }
        // Stable: equal timestamps keep production order.
        timeline.sort_by(|a, b| {
            a.timestamp
                .partial_cmp(&b.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let timer = Timer::new(config.speed, config.live_mode);
        let playback = PlaybackMachine::new(timeline, timer);
        let (events_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        let mut replayer = Replayer {
            speed: SpeedMachine::new(config.speed),
            stage: Stage::new(tree),
            playback,
            assets,
            assets_enabled,
            plugins: self.plugins,
            diff: self.diff,
            unpacker: self
                .unpacker
                .unwrap_or_else(|| Box::new(PassthroughUnpacker)),
            clock: self.clock.unwrap_or_else(|| Rc::new(SystemClock::default())),
            diag,
            events_tx,
            mouse: MouseState::default(),
            catch_up: None,
            first_snapshot: FirstSnapshot::Unset,
            next_user_interaction: None,
            pending_finish: None,
            stylesheet_wait: None,
            config,
        };
        replayer.render_first_snapshot();
        Ok(replayer)
    }
}

pub struct Replayer<T: TreeTarget> {
    config: ReplayerConfig,
    stage: Stage<T>,
    playback: PlaybackMachine,
    speed: SpeedMachine,
    assets: AssetManager,
    /// Set once any asset event was seen; attribute rewrites are only
    /// scheduled for recordings that carry assets.
    assets_enabled: bool,
    plugins: Vec<Box<dyn ReplayPlugin>>,
    diff: Option<Box<dyn TreeDiff>>,
    unpacker: Box<dyn Unpacker>,
    clock: Rc<dyn Clock>,
    diag: Diagnostics,
    events_tx: broadcast::Sender<ReplayerEvent>,
    mouse: MouseState,
    catch_up: Option<CatchUp>,
    first_snapshot: FirstSnapshot,
    /// Timeline seq of the interaction that ends the current skip.
    next_user_interaction: Option<u64>,
    pending_finish: Option<PendingFinish>,
    stylesheet_wait: Option<StylesheetWait>,
}

impl<T: TreeTarget> Replayer<T> {
    pub fn subscribe(&self) -> broadcast::Receiver<ReplayerEvent> {
        self.events_tx.subscribe()
    }

    fn emit(&self, event: ReplayerEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Plays from `time_offset` ms after the first event.
    pub fn play(&mut self, time_offset: f64) {
        match self.playback.state() {
            PlayerState::Live => {
                self.diag.debug("play ignored in live mode");
                return;
            }
            PlayerState::Playing => {
                self.send_player(PlayerEvent::Pause);
            }
            PlayerState::Paused => {}
        }
        self.send_player(PlayerEvent::Play { time_offset });
        self.set_paused_marker(false);
        if let Some(wait) = self.stylesheet_wait.as_mut() {
            wait.resume = true;
        }
        self.emit(ReplayerEvent::Start);
    }

    /// Pauses. With an offset, first seeks there so the paused frame shows it.
    pub fn pause(&mut self, time_offset: Option<f64>) {
        match time_offset {
            None => {
                if self.playback.state() == PlayerState::Playing {
                    self.send_player(PlayerEvent::Pause);
                }
            }
            Some(offset) => {
                self.play(offset);
                self.send_player(PlayerEvent::Pause);
            }
        }
        self.set_paused_marker(true);
        if let Some(wait) = self.stylesheet_wait.as_mut() {
            wait.resume = false;
        }
        self.emit(ReplayerEvent::Pause);
    }

    #[deprecated(note = "use `play`")]
    pub fn resume(&mut self, time_offset: f64) {
        self.play(time_offset);
    }

    /// Enters live mode. Without a baseline the current wall clock is used.
    pub fn start_live(&mut self, baseline_time: Option<f64>) {
        if self.playback.state() == PlayerState::Playing {
            self.send_player(PlayerEvent::Pause);
        }
        if self.send_player(PlayerEvent::ToLive { baseline_time }) {
            self.config.live_mode = true;
            self.pending_finish = None;
        }
    }

    pub fn add_event(&mut self, event: RecordedEvent) {
        if let EventData::Asset(asset) = event.data {
            self.assets_enabled = true;
            self.assets.add_pending(asset);
            return;
        }
        self.send_player(PlayerEvent::AddEvent(Rc::new(event)));
    }

    /// Decodes `raw` with the configured unpacker, then adds it.
    pub fn add_raw_event(&mut self, raw: &Value) -> Result<(), ReplayError> {
        let event = self.unpacker.unpack(raw)?;
        self.add_event(event);
        Ok(())
    }

    /// Playback position in ms from the first event.
    pub fn get_current_time(&self) -> f64 {
        let first = self
            .playback
            .events()
            .first()
            .map(|e| e.timestamp())
            .unwrap_or(0.0);
        self.playback.timer().time_offset() + (self.playback.baseline_time() - first)
    }

    pub fn get_meta_data(&self) -> PlayerMetaData {
        let events = self.playback.events();
        let start_time = events.first().map(|e| e.timestamp()).unwrap_or(0.0);
        let end_time = events.last().map(|e| e.timestamp()).unwrap_or(start_time);
        PlayerMetaData {
            start_time,
            end_time,
            total_time: end_time - start_time,
        }
    }

    pub fn set_config(&mut self, patch: ReplayerConfigPatch) {
        patch.merge_into(&mut self.config);
        if let Some(speed) = patch.speed {
            self.send_speed(SpeedEvent::SetSpeed(speed));
        }
        if patch.skip_inactive == Some(false) {
            self.back_to_normal();
        }
        if patch.show_warning.is_some() || patch.show_debug.is_some() {
            self.diag
                .set_visibility(self.config.show_warning, self.config.show_debug);
        }
        if let Some(hide) = patch.hide_uncached_assets {
            self.assets.set_hide_uncached(hide);
        }
        if let Some(live) = patch.live_mode {
            self.playback.timer_mut().toggle_live_mode(live);
        }
        if !self.config.mouse_tail.enabled {
            self.mouse.tail.clear();
        }
    }

    pub fn enable_interact(&mut self) {
        self.stage.tree.set_interactive(true);
    }

    pub fn disable_interact(&mut self) {
        self.stage.tree.set_interactive(false);
    }

    /// Runs one frame: asset rewrites, stylesheet wait, due actions and the
    /// finish check.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        self.apply_ready_assets();
        self.check_stylesheet_wait(now);

        self.playback.timer_mut().tick(now);
        while let Some(due) = self.playback.timer_mut().pop_due() {
            self.run_action(due.action);
        }
        self.playback.timer_mut().settle();

        if let Some(finish) = self.pending_finish {
            if now >= finish.at {
                self.pending_finish = None;
                self.finish(finish.seq);
            }
        }
        if self.config.mouse_tail.enabled {
            self.mouse.prune_tail(now, self.config.mouse_tail.duration_ms);
        }
    }

    pub fn needs_frame(&self) -> bool {
        self.playback.timer().wants_frame()
            || self.pending_finish.is_some()
            || self.stylesheet_wait.is_some()
            || self.assets.has_pending()
    }

    /// Drives every queued asset resolution to completion and applies the
    /// rewrites that became ready. Returns how many attributes changed.
    pub async fn flush_assets(&mut self) -> usize {
        let rewrites = self.assets.flush().await;
        let mut applied = 0;
        for rewrite in &rewrites {
            if apply_rewrite(&mut self.stage.tree, &self.stage.mirror, rewrite, &self.diag) {
                applied += 1;
            }
        }
        applied
    }

    /// Stops playback and releases every cached reference.
    pub fn destroy(&mut self) {
        self.pause(None);
        self.playback.timer_mut().clear();
        self.pending_finish = None;
        self.stylesheet_wait = None;
        self.assets.reset();
        self.stage.mirror.reset();
        self.stage.styles.reset();
        self.stage.legacy.clear(&self.diag);
        self.mouse = MouseState::default();
        self.emit(ReplayerEvent::Destroy);
    }

    pub fn state(&self) -> PlayerState {
        self.playback.state()
    }

    pub fn speed_state(&self) -> SpeedState {
        self.speed.state()
    }

    pub fn playback(&self) -> &PlaybackMachine {
        &self.playback
    }

    pub fn config(&self) -> &ReplayerConfig {
        &self.config
    }

    pub fn mirror(&self) -> &Mirror {
        &self.stage.mirror
    }

    pub fn tree(&self) -> &T {
        &self.stage.tree
    }

    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.stage.tree
    }

    pub fn style_mirror(&self) -> &StyleMirror {
        &self.stage.styles
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub fn assets(&self) -> &AssetManager {
        &self.assets
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn pending_legacy_nodes(&self) -> usize {
        self.stage.legacy.len()
    }

    fn send_player(&mut self, event: PlayerEvent) -> bool {
        let name = event.name();
        let transition = match self.playback.send(event, &*self.clock) {
            Ok(t) => t,
            Err(e) => {
                self.diag.debug(e.to_string());
                return false;
            }
        };
        tracing::debug!(
            target: crate::diagnostics::TARGET,
            event = name,
            from = %transition.from,
            to = %transition.to,
            "playback transition"
        );
        let changed = transition.changed();
        for effect in transition.effects {
            match effect {
                PlaybackEffect::PlayBack => self.on_play_back(),
                PlaybackEffect::ApplySync(entries) => self.apply_sync(entries),
                PlaybackEffect::CastSync(entry) => self.apply_sync(vec![entry]),
                PlaybackEffect::Flush => self.emit(ReplayerEvent::Flush),
            }
        }
        if changed {
            self.emit_state_change();
        }
        true
    }

    fn send_speed(&mut self, event: SpeedEvent) -> bool {
        match self.speed.send(event, self.playback.timer_mut()) {
            Ok(t) => {
                if t.changed() {
                    self.emit_state_change();
                }
                true
            }
            Err(e) => {
                self.diag.debug(e.to_string());
                false
            }
        }
    }

    fn emit_state_change(&self) {
        self.emit(ReplayerEvent::StateChange {
            player: self.playback.state(),
            speed: self.speed.state(),
        });
    }

    fn on_play_back(&mut self) {
        self.first_snapshot = FirstSnapshot::Unset;
        self.stage.mirror.reset();
        self.stage.styles.reset();
        self.emit(ReplayerEvent::PlayBack);
    }

    fn run_action(&mut self, action: PlaybackAction) {
        match action {
            PlaybackAction::Cast(entry) => self.cast(entry, false),
            PlaybackAction::PointerMove { x, y, id, touch } => self.pointer_move(x, y, id, touch),
            PlaybackAction::KeepAlive => {}
        }
    }

    fn pointer_move(&mut self, x: f64, y: f64, id: i64, touch: bool) {
        let target = self.stage.target();
        self.mouse.move_and_hover(target.tree, target.mirror, x, y, id);
        if touch {
            self.mouse.touch_active = true;
        }
        if self.config.mouse_tail.enabled && !touch {
            let now = self.clock.now();
            self.mouse.push_tail(x, y, now, self.config.mouse_tail.duration_ms);
        }
    }

    fn set_paused_marker(&mut self, paused: bool) {
        let Some(html) = html_element(&self.stage.tree) else {
            return;
        };
        if let Err(e) = toggle_class(&mut self.stage.tree, html, PAUSED_CLASS, paused) {
            self.diag.debug(format!("could not toggle {PAUSED_CLASS}: {e}"));
        }
    }

    fn back_to_normal(&mut self) {
        self.next_user_interaction = None;
        if self.speed.state() == SpeedState::Normal {
            return;
        }
        self.send_speed(SpeedEvent::BackToNormal);
        self.emit(ReplayerEvent::SkipEnd {
            speed: self.speed.normal_speed(),
        });
    }

    fn finish(&mut self, seq: u64) {
        // More events may have arrived since the finish was scheduled.
        if self.playback.events().last().map(|e| e.seq) != Some(seq) {
            return;
        }
        self.back_to_normal();
        // END is only accepted while playing.
        if self.send_player(PlayerEvent::End) {
            self.emit(ReplayerEvent::Finish);
        }
    }

    fn apply_ready_assets(&mut self) {
        for rewrite in self.assets.poll_ready() {
            apply_rewrite(&mut self.stage.tree, &self.stage.mirror, &rewrite, &self.diag);
        }
    }

    fn check_stylesheet_wait(&mut self, now: f64) {
        let Some(wait) = &self.stylesheet_wait else {
            return;
        };
        let loaded = wait
            .urls
            .iter()
            .all(|u| !matches!(self.assets.get(u), crate::assets::AssetStatus::Loading));
        if !loaded && now < wait.deadline {
            return;
        }
        let resume = wait.resume;
        self.stylesheet_wait = None;
        if resume {
            let current = self.get_current_time();
            self.play(current);
        }
        if loaded {
            self.emit(ReplayerEvent::LoadStylesheetEnd);
        } else {
            self.diag.debug("stylesheet wait timed out");
        }
    }
}

pub(crate) fn interaction_name(kind: MouseInteractionKind) -> String {
    kind.event_name().to_string()
}
