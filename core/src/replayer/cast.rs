//! Applying one timeline event.

use super::interaction::{declaration_op, media_command, rule_ops, selection_ranges};
use super::stage::ReplayHooks;
use super::{
    interaction_name, FirstSnapshot, PendingFinish, Replayer, ReplayerEvent, StylesheetWait,
    PAUSED_CLASS,
};
use crate::assets::AssetStatus;
use crate::config::ReplayerConfig;
use crate::event::{
    AdoptedStyleSheetData, EventData, FullSnapshotData, IncrementalData, MouseInteractionData,
    MouseInteractionKind, MutationData, PointerMoveData, RecordedEvent, StyleDeclarationData,
    StyleSheetRuleData,
};
use crate::machine::{compute_skip_speed, EventEntry, PlaybackAction, PlayerEvent, PlayerState, SpeedEvent};
use crate::reconcile::{ApplyReport, Reconciler};
use crate::tree::{
    descendants, head_element, html_element, rebuild, toggle_class, NodeSpec, StyleRuleOp,
    StyleSheet, TreeError, TreeTarget,
};

impl<T: TreeTarget> Replayer<T> {
    /// Renders the first full snapshot so the initial frame is visible
    /// before playback starts.
    pub(super) fn render_first_snapshot(&mut self) {
        let meta = self.playback.events().iter().find_map(|e| match &e.event.data {
            EventData::Meta(m) => Some((m.width, m.height)),
            _ => None,
        });
        if let Some((width, height)) = meta {
            self.emit(ReplayerEvent::Resize { width, height });
        }
        let first = self
            .playback
            .events()
            .iter()
            .find(|e| matches!(e.event.data, EventData::FullSnapshot(_)))
            .cloned();
        if let Some(entry) = first {
            if let EventData::FullSnapshot(data) = &entry.event.data {
                self.rebuild_full_snapshot(data, entry.timestamp(), true);
            }
            self.first_snapshot = FirstSnapshot::Rendered(entry.seq);
        }
    }

    pub(super) fn cast(&mut self, entry: EventEntry, is_sync: bool) {
        let event = std::rc::Rc::clone(&entry.event);
        let mut skipped = false;
        match &event.data {
            EventData::DomContentLoaded | EventData::Load | EventData::Plugin(_) => {}
            EventData::Custom(d) => self.emit(ReplayerEvent::CustomEvent {
                tag: d.tag.clone(),
                payload: d.payload.clone(),
            }),
            EventData::Meta(d) => self.emit(ReplayerEvent::Resize {
                width: d.width,
                height: d.height,
            }),
            EventData::FullSnapshot(d) => match self.first_snapshot {
                FirstSnapshot::Rendered(seq) if seq == entry.seq => {
                    self.first_snapshot = FirstSnapshot::Done;
                    skipped = true;
                }
                state => {
                    if state == FirstSnapshot::Unset {
                        self.first_snapshot = FirstSnapshot::Done;
                    }
                    self.rebuild_full_snapshot(d, event.timestamp, is_sync);
                }
            },
            EventData::IncrementalSnapshot(d) => {
                self.apply_incremental(&entry, d);
                if !is_sync {
                    self.check_skip_inactive(&entry);
                }
            }
            EventData::Asset(d) => {
                self.assets_enabled = true;
                self.assets.add_pending(d.clone());
            }
        }
        if !skipped {
            self.run_plugins(&event, is_sync);
        }

        self.send_player(PlayerEvent::CastEvent(entry.clone()));

        if !self.config.live_mode && self.playback.is_last(&entry) {
            let lead = event.first_position_offset().map(|o| (-o).max(0.0)).unwrap_or(0.0);
            self.pending_finish = Some(PendingFinish {
                at: self.clock.now() + self.config.finish_buffer_ms + lead,
                seq: entry.seq,
            });
        }
        self.emit(ReplayerEvent::EventCast {
            timestamp: event.timestamp,
            event_type: event.event_type(),
            source: event.incremental_source(),
        });
    }

    fn run_plugins(&mut self, event: &RecordedEvent, is_sync: bool) {
        if self.plugins.is_empty() {
            return;
        }
        let target = self.stage.target();
        for plugin in self.plugins.iter_mut() {
            plugin.handler(event, is_sync, target.tree, target.mirror);
        }
    }

    pub(super) fn rebuild_full_snapshot(
        &mut self,
        data: &FullSnapshotData,
        timestamp: f64,
        is_sync: bool,
    ) {
        let shadowed = self.stage.is_shadowed();
        let paused = self.playback.state() == PlayerState::Paused;
        {
            let plugins = if shadowed {
                &mut self.plugins[..0]
            } else {
                &mut self.plugins[..]
            };
            let assets = (self.assets_enabled && !shadowed).then_some(&self.assets);
            let mut hooks = ReplayHooks { plugins, assets };
            let target = self.stage.target();
            target.legacy.clear(&self.diag);
            target.mirror.reset();
            target.styles.reset();
            rebuild(target.tree, &data.node, target.mirror, &mut hooks, &self.diag);

            if let Err(e) = inject_style_rules(target.tree, &self.config) {
                self.diag.warn(format!("failed to inject replay styles: {e}"));
            }
            let root = target.tree.document();
            let offset = &data.initial_offset;
            if let Err(e) = target.tree.scroll_to(root, offset.left, offset.top, false) {
                self.diag.debug(format!("initial scroll failed: {e}"));
            }
            if paused {
                if let Some(html) = html_element(target.tree) {
                    let _ = toggle_class(target.tree, html, PAUSED_CLASS, true);
                }
            }
        }
        self.mouse.forget_nodes();
        if let Some(pending) = self.catch_up.as_mut() {
            pending.discard_positional();
        }
        self.emit(ReplayerEvent::FullsnapshotRebuilded { timestamp });
        if !is_sync && self.config.load_timeout_ms > 0 {
            self.wait_for_stylesheets();
        }
    }

    /// Pauses until stylesheet links in `head` whose assets are still
    /// loading resolve, or the load timeout elapses.
    fn wait_for_stylesheets(&mut self) {
        let tree = &self.stage.tree;
        let Some(head) = head_element(tree) else {
            return;
        };
        let mut urls = Vec::new();
        for node in descendants(tree, head) {
            if tree.describe(node).as_ref().and_then(NodeSpec::tag) != Some("link") {
                continue;
            }
            let rel = tree.get_attribute(node, "rel").unwrap_or_default();
            if !rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")) {
                continue;
            }
            let href = tree
                .get_attribute(node, "href")
                .or_else(|| tree.get_attribute(node, "rr_captured_href"));
            if let Some(href) = href {
                if self.assets.get(&href) == AssetStatus::Loading {
                    urls.push(href);
                }
            }
        }
        if urls.is_empty() {
            return;
        }
        let resume = self.playback.state() == PlayerState::Playing;
        self.send_player(PlayerEvent::Pause);
        self.emit(ReplayerEvent::LoadStylesheetStart);
        self.stylesheet_wait = Some(StylesheetWait {
            urls,
            deadline: self.clock.now() + self.config.load_timeout_ms as f64,
            resume,
        });
    }

    fn apply_incremental(&mut self, entry: &EventEntry, data: &IncrementalData) {
        match data {
            IncrementalData::Mutation(d) => {
                self.apply_mutation(d);
            }
            IncrementalData::MouseMove(d) | IncrementalData::Drag(d) => {
                self.pointer_moves(entry, d, false)
            }
            IncrementalData::TouchMove(d) => self.pointer_moves(entry, d, true),
            IncrementalData::MouseInteraction(d) => self.mouse_interaction(d),
            IncrementalData::Scroll(d) => {
                if d.id == -1 {
                    return;
                }
                match self.catch_up.as_mut() {
                    Some(pending) => pending.scroll(d),
                    None => self.apply_scroll(d, false),
                }
            }
            IncrementalData::ViewportResize(d) => self.emit(ReplayerEvent::Resize {
                width: d.width,
                height: d.height,
            }),
            IncrementalData::Input(d) => {
                if d.id == -1 {
                    return;
                }
                match self.catch_up.as_mut() {
                    Some(pending) => pending.input(d),
                    None => self.apply_input(d),
                }
            }
            IncrementalData::MediaInteraction(d) => {
                let target = self.stage.target();
                let Some(node) = target.mirror.get_node(d.id) else {
                    return self.node_not_found(d.id);
                };
                if let Err(e) = target.tree.apply_media(node, &media_command(d)) {
                    self.diag.warn(format!("failed to replay media interaction: {e}"));
                }
            }
            IncrementalData::StyleSheetRule(d) => self.apply_style_sheet_rule(d),
            IncrementalData::StyleDeclaration(d) => self.apply_style_declaration(d),
            IncrementalData::CanvasMutation(d) => {
                if !self.config.replay_canvas {
                    return;
                }
                let target = self.stage.target();
                let Some(node) = target.mirror.get_node(d.id) else {
                    return self.node_not_found(d.id);
                };
                if let Err(e) = target.tree.apply_canvas(node, d.context, &d.commands) {
                    self.diag.warn(format!("failed to replay canvas mutation: {e}"));
                }
            }
            IncrementalData::Font(d) => {
                let target = self.stage.target();
                if let Err(e) = target.tree.add_font(&d.family, &d.font_source, &d.descriptors) {
                    self.diag.warn(format!("failed to add font {}: {e}", d.family));
                }
            }
            IncrementalData::Selection(d) => match self.catch_up.as_mut() {
                Some(pending) => pending.selection = Some(d.clone()),
                None => self.apply_selection(d),
            },
            IncrementalData::AdoptedStyleSheet(d) => self.apply_adopted_style_sheet(d),
        }
    }

    pub(super) fn apply_mutation(&mut self, d: &MutationData) -> ApplyReport {
        let shadowed = self.stage.is_shadowed();
        let plugins = if shadowed {
            &mut self.plugins[..0]
        } else {
            &mut self.plugins[..]
        };
        let assets = (self.assets_enabled && !shadowed).then_some(&self.assets);
        let mut hooks = ReplayHooks { plugins, assets };
        let target = self.stage.target();
        let report = Reconciler {
            tree: target.tree,
            mirror: target.mirror,
            legacy: target.legacy,
            hooks: &mut hooks,
            diag: &self.diag,
            clock: &*self.clock,
            options: self.config.reconcile_options(),
        }
        .apply(d);
        if report.timed_out || report.dropped > 0 {
            tracing::debug!(
                target: crate::diagnostics::TARGET,
                added = report.added,
                dropped = report.dropped,
                timed_out = report.timed_out,
                "mutation left nodes unresolved"
            );
        }
        report
    }

    fn pointer_moves(&mut self, entry: &EventEntry, d: &PointerMoveData, touch: bool) {
        if let Some(pending) = self.catch_up.as_mut() {
            if let Some(last) = d.positions.last() {
                pending.pointer = Some((last.x, last.y, last.id));
            }
            return;
        }
        let Some(first) = d.positions.first() else {
            return;
        };
        let baseline = self.playback.baseline_time();
        let keep_alive = entry.delay - first.time_offset;
        let timer = self.playback.timer_mut();
        for p in &d.positions {
            timer.add_action(
                p.time_offset + entry.timestamp() - baseline,
                PlaybackAction::PointerMove {
                    x: p.x,
                    y: p.y,
                    id: p.id,
                    touch,
                },
            );
        }
        timer.add_action(keep_alive, PlaybackAction::KeepAlive);
    }

    fn mouse_interaction(&mut self, d: &MouseInteractionData) {
        if d.id == -1 {
            return;
        }
        let target = self.stage.target();
        let Some(node) = target.mirror.get_node(d.id) else {
            return self.node_not_found(d.id);
        };
        self.emit(ReplayerEvent::MouseInteraction {
            kind: interaction_name(d.kind),
            target: d.id,
        });
        let target = self.stage.target();
        match d.kind {
            MouseInteractionKind::Blur => {
                let _ = target.tree.blur(node);
            }
            MouseInteractionKind::Focus => {
                if self.config.trigger_focus {
                    let _ = target.tree.focus(node);
                }
            }
            MouseInteractionKind::Click
            | MouseInteractionKind::TouchStart
            | MouseInteractionKind::TouchEnd
            | MouseInteractionKind::MouseDown
            | MouseInteractionKind::MouseUp => {
                let (x, y) = (d.x.unwrap_or(self.mouse.x), d.y.unwrap_or(self.mouse.y));
                if let Some(pending) = self.catch_up.as_mut() {
                    match d.kind {
                        MouseInteractionKind::TouchStart => pending.touch_active = Some(true),
                        MouseInteractionKind::TouchEnd => pending.touch_active = Some(false),
                        _ => {}
                    }
                    pending.pointer = Some((x, y, d.id));
                    return;
                }
                if d.kind == MouseInteractionKind::TouchStart {
                    self.mouse.tail.clear();
                }
                self.mouse
                    .move_and_hover(target.tree, target.mirror, x, y, d.id);
                match d.kind {
                    MouseInteractionKind::Click => self.mouse.clicks += 1,
                    MouseInteractionKind::TouchStart => self.mouse.touch_active = true,
                    MouseInteractionKind::TouchEnd => self.mouse.touch_active = false,
                    _ => {}
                }
            }
            MouseInteractionKind::TouchCancel => match self.catch_up.as_mut() {
                Some(pending) => pending.touch_active = Some(false),
                None => self.mouse.touch_active = false,
            },
            MouseInteractionKind::ContextMenu
            | MouseInteractionKind::DblClick
            | MouseInteractionKind::TouchMoveDeparted => {
                if let Err(e) = target.tree.dispatch_event(node, d.kind.event_name()) {
                    self.diag.debug(format!("dispatch {} failed: {e}", d.kind.event_name()));
                }
            }
        }
    }

    pub(super) fn apply_scroll(&mut self, d: &crate::event::ScrollData, is_sync: bool) {
        let target = self.stage.target();
        let Some(node) = target.mirror.get_node(d.id) else {
            return self.node_not_found(d.id);
        };
        if let Err(e) = target.tree.scroll_to(node, d.x, d.y, !is_sync) {
            self.diag.debug(format!("scroll of node {} failed: {e}", d.id));
        }
    }

    pub(super) fn apply_input(&mut self, d: &crate::event::InputData) {
        let target = self.stage.target();
        let Some(node) = target.mirror.get_node(d.id) else {
            return self.node_not_found(d.id);
        };
        if let Err(e) = target.tree.set_input_value(node, &d.text, d.is_checked) {
            self.diag.warn(format!("failed to replay input on node {}: {e}", d.id));
        }
    }

    pub(super) fn apply_selection(&mut self, d: &crate::event::SelectionData) {
        let target = self.stage.target();
        let ranges = selection_ranges(target.mirror, d);
        if ranges.len() < d.ranges.len() {
            self.diag.debug("selection references nodes that are not replayed");
        }
        if let Err(e) = target.tree.set_selection(&ranges) {
            self.diag.debug(format!("selection failed: {e}"));
        }
    }

    fn apply_style_sheet_rule(&mut self, d: &StyleSheetRuleData) {
        let ops = rule_ops(d);
        self.apply_style_ops(d.id, d.style_id, &ops);
    }

    fn apply_style_declaration(&mut self, d: &StyleDeclarationData) {
        if let Some(op) = declaration_op(d) {
            self.apply_style_ops(d.id, d.style_id, &[op]);
        }
    }

    /// Routes rule operations to a `style` element's sheet, or to a
    /// constructed sheet which is then re-adopted by its hosts.
    fn apply_style_ops(&mut self, id: Option<i64>, style_id: Option<i64>, ops: &[StyleRuleOp]) {
        let target = self.stage.target();
        if let Some(id) = id {
            let Some(node) = target.mirror.get_node(id) else {
                return self.node_not_found(id);
            };
            for op in ops {
                if let Err(e) = target.tree.apply_style_rule(node, op) {
                    self.diag.warn(format!("style rule on node {id} failed: {e}"));
                }
            }
            return;
        }
        let Some(style_id) = style_id else {
            self.diag.debug("style rule without a target");
            return;
        };
        let sheet = target.styles.get_or_create(style_id);
        for op in ops {
            if let Err(e) = sheet.apply(op) {
                self.diag.warn(format!("style rule on sheet {style_id} failed: {e}"));
            }
        }
        for host in target.styles.adopters_of(style_id) {
            let Some(node) = target.mirror.get_node(host) else {
                continue;
            };
            let sheets = target.styles.adopted_by(host);
            if let Err(e) = target.tree.adopt_style_sheets(node, &sheets) {
                self.diag.debug(format!("re-adopting sheets on node {host} failed: {e}"));
            }
        }
    }

    fn apply_adopted_style_sheet(&mut self, d: &AdoptedStyleSheetData) {
        let target = self.stage.target();
        for style in &d.styles {
            let mut sheet = StyleSheet::default();
            for rule in &style.rules {
                let op = StyleRuleOp::Insert {
                    rule: rule.rule.clone(),
                    index: rule.index.as_ref().map(|i| i.to_path()),
                };
                if let Err(e) = sheet.apply(&op) {
                    self.diag.debug(format!("constructed sheet {}: {e}", style.style_id));
                }
            }
            target.styles.insert(style.style_id, sheet);
        }
        target.styles.set_adopted(d.id, d.style_ids.clone());
        let Some(node) = target.mirror.get_node(d.id) else {
            return self.node_not_found(d.id);
        };
        let sheets = target.styles.adopted_by(d.id);
        if let Err(e) = target.tree.adopt_style_sheets(node, &sheets) {
            self.diag.warn(format!("failed to adopt style sheets on node {}: {e}", d.id));
        }
    }

    fn node_not_found(&self, id: i64) {
        self.diag.debug(format!("node with id '{id}' not found"));
    }

    fn is_user_interaction(config: &ReplayerConfig, event: &RecordedEvent) -> bool {
        event
            .incremental_source()
            .is_some_and(|s| config.inactivity.is_interaction(s))
    }

    /// Starts or ends an inactivity skip after `entry` was cast in real time.
    fn check_skip_inactive(&mut self, entry: &EventEntry) {
        if self.next_user_interaction == Some(entry.seq) {
            self.back_to_normal();
        }
        if !self.config.skip_inactive || self.next_user_interaction.is_some() {
            return;
        }
        let threshold = self.config.inactivity.threshold_ms * self.playback.timer().speed();
        let mut next = None;
        for e in self.playback.events() {
            if e.timestamp() <= entry.timestamp() {
                continue;
            }
            if Self::is_user_interaction(&self.config, &e.event) {
                let gap = e.delay - entry.delay;
                if gap > threshold {
                    next = Some((e.seq, gap));
                }
                break;
            }
        }
        let Some((seq, gap)) = next else {
            return;
        };
        self.next_user_interaction = Some(seq);
        let speed = compute_skip_speed(gap, self.config.inactivity.interval_ms, self.config.max_speed);
        if self.send_speed(SpeedEvent::FastForward(speed)) {
            self.emit(ReplayerEvent::SkipStart { speed });
        }
    }
}

/// Appends the replay-only style element to `head`.
fn inject_style_rules(tree: &mut dyn TreeTarget, config: &ReplayerConfig) -> Result<(), TreeError> {
    let Some(html) = html_element(tree) else {
        return Ok(());
    };
    let parent = head_element(tree).unwrap_or(html);
    let mut rules = vec![
        format!(".{} {{ background: currentColor }}", config.block_class),
        "noscript { display: none !important; }".to_string(),
        format!(
            "html.{PAUSED_CLASS} *, html.{PAUSED_CLASS} *:before, html.{PAUSED_CLASS} *:after \
             {{ animation-play-state: paused !important; }}"
        ),
    ];
    rules.extend(config.insert_style_rules.iter().cloned());
    let style = tree.create_node(NodeSpec::Element {
        tag: "style".into(),
        svg: false,
    })?;
    tree.set_text_content(style, &rules.join("\n"))?;
    tree.append_child(parent, style)
}
