//! Pointer state and the small appliers for non-structural sources.

use std::collections::VecDeque;

use crate::event::{
    MediaInteractionData, MediaInteractionKind, NodeId, RuleIndex, SelectionData,
    StyleDeclarationData, StyleSheetRuleData,
};
use crate::mirror::Mirror;
use crate::tree::{toggle_class, MediaAction, MediaCommand, NodeRef, SelectionRange, StyleRuleOp, TreeTarget};

pub const HOVER_CLASS: &str = ":hover";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailPoint {
    pub x: f64,
    pub y: f64,
    /// Clock reading when the pointer reached this point.
    pub at: f64,
}

/// Replayed pointer.
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    pub x: f64,
    pub y: f64,
    pub target: Option<NodeId>,
    /// Click animations started so far.
    pub clicks: u32,
    pub touch_active: bool,
    pub tail: VecDeque<TailPoint>,
    hovered: Vec<NodeRef>,
}

impl MouseState {
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Moves the pointer and the hover chain to `id`'s node.
    pub fn move_and_hover(
        &mut self,
        tree: &mut dyn TreeTarget,
        mirror: &Mirror,
        x: f64,
        y: f64,
        id: NodeId,
    ) {
        self.x = x;
        self.y = y;
        self.target = Some(id);
        let chain = match mirror.get_node(id) {
            Some(node) => ancestors_and_self(tree, node),
            None => Vec::new(),
        };
        if chain == self.hovered {
            return;
        }
        for node in std::mem::take(&mut self.hovered) {
            let _ = toggle_class(tree, node, HOVER_CLASS, false);
        }
        for node in &chain {
            let _ = toggle_class(tree, *node, HOVER_CLASS, true);
        }
        self.hovered = chain;
    }

    pub fn push_tail(&mut self, x: f64, y: f64, now: f64, duration_ms: f64) {
        self.tail.push_back(TailPoint { x, y, at: now });
        self.prune_tail(now, duration_ms);
    }

    pub fn prune_tail(&mut self, now: f64, duration_ms: f64) {
        while self.tail.front().is_some_and(|p| now - p.at > duration_ms) {
            self.tail.pop_front();
        }
    }

    /// Forgets hover bookkeeping for a tree that was rebuilt.
    pub fn forget_nodes(&mut self) {
        self.hovered.clear();
    }
}

fn ancestors_and_self(tree: &dyn TreeTarget, node: NodeRef) -> Vec<NodeRef> {
    let mut out = Vec::new();
    let mut cur = Some(node);
    while let Some(n) = cur {
        if tree.describe(n).and_then(|s| s.tag().map(str::to_string)).is_none() {
            break;
        }
        out.push(n);
        cur = tree.parent_node(n);
    }
    out
}

pub fn media_command(d: &MediaInteractionData) -> MediaCommand {
    let mut cmd = MediaCommand {
        volume: d.volume,
        muted: d.muted,
        looping: d.looping,
        ..Default::default()
    };
    match d.kind {
        MediaInteractionKind::Play => {
            cmd.action = Some(MediaAction::Play);
            cmd.current_time = d.current_time;
        }
        MediaInteractionKind::Pause => {
            cmd.action = Some(MediaAction::Pause);
            cmd.current_time = d.current_time;
        }
        MediaInteractionKind::Seeked => cmd.current_time = d.current_time,
        MediaInteractionKind::RateChange => cmd.playback_rate = d.playback_rate,
        MediaInteractionKind::VolumeChange => {}
    }
    cmd
}

/// Rule operations of a StyleSheetRule record, in application order.
pub fn rule_ops(d: &StyleSheetRuleData) -> Vec<StyleRuleOp> {
    let mut ops = Vec::new();
    for add in &d.adds {
        ops.push(StyleRuleOp::Insert {
            rule: add.rule.clone(),
            index: add.index.as_ref().map(RuleIndex::to_path),
        });
    }
    for remove in &d.removes {
        ops.push(StyleRuleOp::Delete {
            index: remove.index.to_path(),
        });
    }
    for text in [&d.replace, &d.replace_sync].into_iter().flatten() {
        ops.push(StyleRuleOp::Replace(text.clone()));
    }
    ops
}

pub fn declaration_op(d: &StyleDeclarationData) -> Option<StyleRuleOp> {
    if let Some(set) = &d.set {
        return Some(StyleRuleOp::SetProperty {
            index: d.index.clone(),
            property: set.property.clone(),
            value: set.value.clone(),
            priority: set.priority.clone(),
        });
    }
    d.remove.as_ref().map(|remove| StyleRuleOp::RemoveProperty {
        index: d.index.clone(),
        property: remove.property.clone(),
    })
}

/// Maps recorded ranges onto live nodes, dropping ranges with a missing end.
pub fn selection_ranges(mirror: &Mirror, d: &SelectionData) -> Vec<SelectionRange> {
    d.ranges
        .iter()
        .filter_map(|r| {
            Some(SelectionRange {
                start: mirror.get_node(r.start)?,
                start_offset: r.start_offset,
                end: mirror.get_node(r.end)?,
                end_offset: r.end_offset,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{StyleRuleAdd, StyleRuleRemove};
    use crate::tree::VirtualDocument;
    use crate::tree::{NodeSpec, TreeTarget};

    #[test]
    fn hover_follows_the_pointer_target() {
        let mut doc = VirtualDocument::new();
        let root = doc.document();
        let html = doc.create_node(NodeSpec::Element { tag: "html".into(), svg: false }).unwrap();
        let a = doc.create_node(NodeSpec::Element { tag: "a".into(), svg: false }).unwrap();
        let b = doc.create_node(NodeSpec::Element { tag: "b".into(), svg: false }).unwrap();
        doc.append_child(root, html).unwrap();
        doc.append_child(html, a).unwrap();
        doc.append_child(html, b).unwrap();
        let mut mirror = Mirror::new();
        mirror.add(a, 10);
        mirror.add(b, 11);

        let mut mouse = MouseState::default();
        mouse.move_and_hover(&mut doc, &mirror, 1.0, 2.0, 10);
        assert_eq!(doc.get_attribute(a, "class").as_deref(), Some(HOVER_CLASS));
        assert_eq!(doc.get_attribute(html, "class").as_deref(), Some(HOVER_CLASS));

        mouse.move_and_hover(&mut doc, &mirror, 3.0, 4.0, 11);
        assert_eq!(doc.get_attribute(a, "class"), None);
        assert_eq!(doc.get_attribute(b, "class").as_deref(), Some(HOVER_CLASS));
        assert_eq!(mouse.position(), (3.0, 4.0));
    }

    #[test]
    fn tail_keeps_recent_points_only() {
        let mut mouse = MouseState::default();
        mouse.push_tail(0.0, 0.0, 0.0, 500.0);
        mouse.push_tail(1.0, 1.0, 300.0, 500.0);
        mouse.push_tail(2.0, 2.0, 700.0, 500.0);
        let xs: Vec<f64> = mouse.tail.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn replace_runs_after_inserts_and_deletes() {
        let d = StyleSheetRuleData {
            replace: Some("a { }".into()),
            adds: vec![StyleRuleAdd { rule: "b { }".into(), index: Some(RuleIndex::Flat(1)) }],
            removes: vec![StyleRuleRemove { index: RuleIndex::Nested(vec![0, 1]) }],
            ..Default::default()
        };
        let ops = rule_ops(&d);
        assert_eq!(
            ops[0],
            StyleRuleOp::Insert { rule: "b { }".into(), index: Some(vec![1]) }
        );
        assert_eq!(ops[1], StyleRuleOp::Delete { index: vec![0, 1] });
        assert_eq!(ops[2], StyleRuleOp::Replace("a { }".into()));
    }
}
