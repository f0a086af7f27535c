//! Synchronous batches: seeking and out-of-band casts.
//!
//! Positional sources (pointer, scroll, input, selection) are collected
//! while a batch is cast and only the final value per target is applied
//! afterwards.

use std::collections::HashMap;

use super::stage::ReplayHooks;
use super::Replayer;
use crate::event::{IncrementalSource, InputData, NodeId, ScrollData, SelectionData};
use crate::machine::EventEntry;
use crate::tree::TreeTarget;

#[derive(Debug, Default)]
pub(crate) struct CatchUp {
    pub pointer: Option<(f64, f64, NodeId)>,
    pub touch_active: Option<bool>,
    pub selection: Option<SelectionData>,
    scrolls: Vec<ScrollData>,
    scroll_index: HashMap<NodeId, usize>,
    inputs: Vec<InputData>,
    input_index: HashMap<NodeId, usize>,
}

impl CatchUp {
    pub fn scroll(&mut self, d: &ScrollData) {
        match self.scroll_index.get(&d.id) {
            Some(&i) => self.scrolls[i] = d.clone(),
            None => {
                self.scroll_index.insert(d.id, self.scrolls.len());
                self.scrolls.push(d.clone());
            }
        }
    }

    pub fn input(&mut self, d: &InputData) {
        match self.input_index.get(&d.id) {
            Some(&i) => self.inputs[i] = d.clone(),
            None => {
                self.input_index.insert(d.id, self.inputs.len());
                self.inputs.push(d.clone());
            }
        }
    }

    /// Drops state recorded against a tree that was just rebuilt.
    pub fn discard_positional(&mut self) {
        self.scrolls.clear();
        self.scroll_index.clear();
        self.inputs.clear();
        self.input_index.clear();
        self.selection = None;
    }
}

impl<T: TreeTarget> Replayer<T> {
    /// Casts `entries` in order as one synchronous batch.
    pub(super) fn apply_sync(&mut self, entries: Vec<EventEntry>) {
        if entries.is_empty() {
            return;
        }
        if self.catch_up.is_some() {
            for entry in entries {
                self.cast(entry, true);
            }
            return;
        }

        let shadowed = self.config.use_virtual_dom
            && self.diff.is_some()
            && self.stage.legacy.is_empty()
            && entries
                .iter()
                .any(|e| e.event.incremental_source() == Some(IncrementalSource::Mutation));
        if shadowed {
            self.stage.begin_shadow();
        }

        self.catch_up = Some(CatchUp::default());
        let count = entries.len();
        for entry in entries {
            self.cast(entry, true);
        }
        if shadowed {
            self.commit_shadow();
        }
        if let Some(pending) = self.catch_up.take() {
            self.apply_catch_up(pending);
        }
        tracing::debug!(
            target: crate::diagnostics::TARGET,
            events = count,
            shadowed,
            "applied synchronous batch"
        );
    }

    /// Diffs the shadow document into the live tree.
    fn commit_shadow(&mut self) {
        let Some(shadow) = self.stage.shadow.take() else {
            return;
        };
        if !shadow.legacy.is_empty() {
            self.diag.debug(format!(
                "{} nodes still waiting for a legacy sibling after catch-up",
                shadow.legacy.len()
            ));
        }
        let Some(diff) = self.diff.as_mut() else {
            return;
        };
        let assets = self.assets_enabled.then_some(&self.assets);
        let mut hooks = ReplayHooks {
            plugins: &mut self.plugins[..],
            assets,
        };
        if let Err(e) = diff.diff(
            &mut self.stage.tree,
            &mut self.stage.mirror,
            &shadow.doc,
            &shadow.mirror,
            &mut hooks,
        ) {
            self.diag.warn(format!("failed to apply catch-up diff: {e}"));
        }

        self.stage.styles = shadow.styles;
        for host in self.stage.styles.adopter_ids() {
            let Some(node) = self.stage.mirror.get_node(host) else {
                continue;
            };
            let sheets = self.stage.styles.adopted_by(host);
            if let Err(e) = self.stage.tree.adopt_style_sheets(node, &sheets) {
                self.diag.debug(format!("re-adopting sheets on node {host} failed: {e}"));
            }
        }
    }

    fn apply_catch_up(&mut self, pending: CatchUp) {
        if let Some((x, y, id)) = pending.pointer {
            self.mouse
                .move_and_hover(&mut self.stage.tree, &self.stage.mirror, x, y, id);
        }
        if let Some(active) = pending.touch_active {
            self.mouse.touch_active = active;
        }
        for d in &pending.scrolls {
            self.apply_scroll(d, true);
        }
        for d in &pending.inputs {
            self.apply_input(d);
        }
        if let Some(selection) = &pending.selection {
            self.apply_selection(selection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scroll(id: NodeId, y: f64) -> ScrollData {
        ScrollData { id, x: 0.0, y }
    }

    #[test]
    fn last_scroll_per_node_wins_in_first_seen_order() {
        let mut pending = CatchUp::default();
        pending.scroll(&scroll(4, 10.0));
        pending.scroll(&scroll(2, 5.0));
        pending.scroll(&scroll(4, 30.0));

        let ys: Vec<(NodeId, f64)> = pending.scrolls.iter().map(|s| (s.id, s.y)).collect();
        assert_eq!(ys, vec![(4, 30.0), (2, 5.0)]);
    }

    #[test]
    fn rebuild_discards_node_bound_state_but_keeps_pointer() {
        let mut pending = CatchUp::default();
        pending.pointer = Some((1.0, 2.0, 7));
        pending.input(&InputData {
            id: 7,
            text: "a".into(),
            is_checked: false,
            user_triggered: None,
        });
        pending.selection = Some(SelectionData::default());
        pending.discard_positional();

        assert!(pending.inputs.is_empty());
        assert!(pending.selection.is_none());
        assert_eq!(pending.pointer, Some((1.0, 2.0, 7)));
        pending.input(&InputData {
            id: 7,
            text: "b".into(),
            is_checked: false,
            user_triggered: None,
        });
        assert_eq!(pending.inputs.len(), 1);
    }
}
