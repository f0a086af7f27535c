//! Mutation reconciler.
//!
//! Applies one mutation record to the tree in a fixed order: removes, adds,
//! texts, attributes. Adds whose parent or next sibling is not materialised
//! yet are deferred and retried as a forest until nothing more can be placed
//! or the wall-clock budget runs out. Every tree failure is caught at the
//! granularity of one mutation.

mod legacy;
mod resolve_tree;

use std::collections::{HashMap, HashSet};

pub use legacy::LegacyMissingNodes;
pub use resolve_tree::ResolveForest;

use crate::clock::Clock;
use crate::diagnostics::Diagnostics;
use crate::event::{
    AddedNodeMutation, AttributeMutation, AttributeValue, MutationData, NodeId,
    SerializedNodeKind, SiblingRef, StyleValue, TextMutation,
};
use crate::mirror::Mirror;
use crate::tree::{build_node, BuildHooks, NodeRef, NodeSpec, TreeError, TreeTarget};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileOptions {
    /// Wall-clock budget for draining deferred adds, per batch.
    pub retry_budget_ms: f64,
    /// Batches a legacy entry may wait before it is abandoned.
    pub legacy_retry_batches: u32,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            retry_budget_ms: 500.0,
            legacy_retry_batches: 64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub removed: usize,
    pub added: usize,
    /// Deferred adds given up on.
    pub dropped: usize,
    pub texts: usize,
    pub attributes: usize,
    /// Draining deferred adds hit the budget.
    pub timed_out: bool,
    pub legacy_pending: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddOutcome {
    Applied,
    Deferred,
    Skipped,
}

pub struct Reconciler<'a> {
    pub tree: &'a mut dyn TreeTarget,
    pub mirror: &'a mut Mirror,
    pub legacy: &'a mut LegacyMissingNodes,
    pub hooks: &'a mut dyn BuildHooks,
    pub diag: &'a Diagnostics,
    pub clock: &'a dyn Clock,
    pub options: ReconcileOptions,
}

struct Batch {
    /// Ids unregistered by this batch's removes, descendants included.
    removed: HashSet<NodeId>,
    /// Ids named by this batch's removes.
    remove_targets: HashSet<NodeId>,
    report: ApplyReport,
}

impl Batch {
    fn expects_missing(&self, id: NodeId) -> bool {
        self.removed.contains(&id) || self.remove_targets.contains(&id)
    }
}

impl<'a> Reconciler<'a> {
    pub fn apply(&mut self, data: &MutationData) -> ApplyReport {
        let mut batch = Batch {
            removed: HashSet::new(),
            remove_targets: data.removes.iter().map(|r| r.id).collect(),
            report: ApplyReport::default(),
        };

        for remove in &data.removes {
            self.apply_remove(remove.id, remove.parent_id, &mut batch);
        }

        let mut queue = Vec::new();
        for add in &data.adds {
            if self.append_node(add, &mut batch) == AddOutcome::Deferred {
                queue.push(add);
            }
        }
        self.drain(queue, &mut batch);

        for text in dedup_texts(&data.texts) {
            self.apply_text(text, &mut batch);
        }
        for attr in &data.attributes {
            self.apply_attributes(attr, &mut batch);
        }

        self.legacy.age(
            self.mirror,
            &*self.tree,
            self.options.legacy_retry_batches,
            self.diag,
        );
        batch.report.legacy_pending = self.legacy.len();
        batch.report
    }

    fn warn(&self, batch: &mut Batch, message: String) {
        self.diag.warn(message.clone());
        batch.report.warnings.push(message);
    }

    fn warn_not_found(&self, batch: &mut Batch, id: NodeId) {
        self.warn(batch, format!("node with id '{id}' not found"));
    }

    fn apply_remove(&mut self, id: NodeId, parent_id: NodeId, batch: &mut Batch) {
        let Some(target) = self.mirror.get_node(id) else {
            // Gone with an ancestor removed earlier in this batch.
            if batch.removed.contains(&id) || batch.remove_targets.contains(&parent_id) {
                return;
            }
            return self.warn_not_found(batch, id);
        };
        let Some(parent) = self.mirror.get_node(parent_id) else {
            return self.warn_not_found(batch, parent_id);
        };
        batch
            .removed
            .extend(self.mirror.remove_node_from_map(&*self.tree, target));
        if let Err(e) = self.tree.remove_child(parent, target) {
            self.warn(batch, format!("parent could not remove child in mutation: {e}"));
            return;
        }
        batch.report.removed += 1;
    }

    fn append_node(&mut self, m: &AddedNodeMutation, batch: &mut Batch) -> AddOutcome {
        let Some(parent) = self.mirror.get_node(m.parent_id) else {
            return AddOutcome::Deferred;
        };
        if m.next_id.node().is_some_and(|next| !self.mirror.has(next)) {
            return AddOutcome::Deferred;
        }
        if m.node.root_id.is_some_and(|root| !self.mirror.has(root)) {
            return AddOutcome::Skipped;
        }
        let previous = m.previous_id.node().and_then(|id| self.mirror.get_node(id));
        let next = m.next_id.node().and_then(|id| self.mirror.get_node(id));

        let target = match build_node(self.tree, &m.node, self.diag) {
            Ok(node) => node,
            Err(e) => {
                self.warn(batch, format!("failed to build node {}: {e}", m.node.id));
                return AddOutcome::Skipped;
            }
        };
        self.mirror.add(target, m.node.id);

        if m.previous_id == SiblingRef::Legacy || m.next_id == SiblingRef::Legacy {
            self.legacy.insert(target, m);
            self.hooks.on_build(self.tree, target, m.node.id);
            batch.report.added += 1;
            return AddOutcome::Applied;
        }

        self.prepare_parent(parent, m);

        let placed = match (previous, next) {
            (Some(prev), _) if self.tree.parent_node(prev) == Some(parent) => {
                let anchor = self.tree.next_sibling(prev);
                self.tree.insert_before(parent, target, anchor)
            }
            (_, Some(next)) if self.tree.parent_node(next).is_some() => {
                let anchor = (self.tree.parent_node(next) == Some(parent)).then_some(next);
                self.tree.insert_before(parent, target, anchor)
            }
            _ => {
                if parent == self.tree.document() {
                    for child in self.tree.child_nodes(parent) {
                        let _ = self.tree.remove_child(parent, child);
                    }
                }
                self.tree.append_child(parent, target)
            }
        };
        if let Err(e) = placed {
            self.warn(batch, format!("failed to insert node {}: {e}", m.node.id));
            self.mirror.remove_node_from_map(&*self.tree, target);
            return AddOutcome::Skipped;
        }

        self.hooks.on_build(self.tree, target, m.node.id);
        batch.report.added += 1;

        if !self.legacy.is_empty() && (m.previous_id.is_set() || m.next_id.is_set()) {
            self.legacy
                .resolve(self.tree, parent, target, m.previous_id, m.next_id, self.diag);
        }
        AddOutcome::Applied
    }

    /// Clears what the new node is about to replace.
    fn prepare_parent(&mut self, parent: NodeRef, m: &AddedNodeMutation) {
        match self.tree.describe(parent) {
            Some(NodeSpec::Element { tag, .. })
                if tag == "textarea" && matches!(m.node.kind, SerializedNodeKind::Text { .. }) =>
            {
                // A textarea keeps a single text child as its value.
                for child in self.tree.child_nodes(parent) {
                    if self.tree.describe(child).is_some_and(|s| s.is_text()) {
                        let _ = self.tree.remove_child(parent, child);
                    }
                }
            }
            Some(NodeSpec::Document) => {
                let children = self.tree.child_nodes(parent);
                let replaced = children.into_iter().find(|c| {
                    match (&m.node.kind, self.tree.describe(*c)) {
                        (SerializedNodeKind::DocumentType { .. }, Some(NodeSpec::DocumentType { .. })) => true,
                        (SerializedNodeKind::Element { tag_name, .. }, Some(NodeSpec::Element { .. })) => {
                            tag_name == "html"
                        }
                        _ => false,
                    }
                });
                if let Some(old) = replaced {
                    self.mirror.remove_node_from_map(&*self.tree, old);
                    let _ = self.tree.remove_child(parent, old);
                }
            }
            _ => {}
        }
    }

    fn drain<'m>(&mut self, queue: Vec<&'m AddedNodeMutation>, batch: &mut Batch) {
        if queue.is_empty() {
            return;
        }
        let start = self.clock.now();
        let mut queue = queue;
        while !queue.is_empty() {
            let forest = ResolveForest::from_queue(&queue);
            if self.clock.now() - start > self.options.retry_budget_ms {
                let dump: Vec<String> = forest.roots().iter().map(|r| forest.describe(*r)).collect();
                self.warn(
                    batch,
                    format!("timeout while resolving queued nodes: [{}]", dump.join(", ")),
                );
                batch.report.timed_out = true;
                batch.report.dropped += forest.len();
                return;
            }

            let mut next = Vec::new();
            let mut held = Vec::new();
            let mut progress = false;
            for &root in forest.roots() {
                if !self.mirror.has(forest.mutation(root).parent_id) {
                    held.push(root);
                    continue;
                }
                for m in forest.apply_order(root) {
                    match self.append_node(m, batch) {
                        AddOutcome::Applied => progress = true,
                        AddOutcome::Deferred => next.push(m),
                        AddOutcome::Skipped => {}
                    }
                }
            }

            if !progress {
                for root in held {
                    self.diag.debug(format!(
                        "drop resolve tree since there is no parent for the root node: {}",
                        forest.describe(root)
                    ));
                    batch.report.dropped += forest.flatten(root).len();
                }
                if !next.is_empty() {
                    self.diag.debug(format!(
                        "drop {} queued nodes whose siblings never appeared",
                        next.len()
                    ));
                    batch.report.dropped += next.len();
                }
                return;
            }
            for root in held {
                next.extend(forest.flatten(root));
            }
            queue = next;
        }
    }

    fn apply_text(&mut self, text: &TextMutation, batch: &mut Batch) {
        let Some(node) = self.mirror.get_node(text.id) else {
            if !batch.expects_missing(text.id) {
                self.warn_not_found(batch, text.id);
            }
            return;
        };
        match self.tree.set_text_content(node, text.value.as_deref().unwrap_or("")) {
            Ok(()) => batch.report.texts += 1,
            Err(e) => self.warn(batch, format!("failed to set text of node {}: {e}", text.id)),
        }
    }

    fn apply_attributes(&mut self, attr: &AttributeMutation, batch: &mut Batch) {
        let Some(mut node) = self.mirror.get_node(attr.id) else {
            if !batch.expects_missing(attr.id) {
                self.warn_not_found(batch, attr.id);
            }
            return;
        };
        for (name, value) in &attr.attributes {
            let result = match value {
                AttributeValue::Removed => self.tree.remove_attribute(node, name),
                AttributeValue::Text(v) if name == "_cssText" => {
                    match self.tree.describe(node).as_ref().and_then(NodeSpec::tag) {
                        Some("style") => self.tree.set_text_content(node, v),
                        Some("link") => self.swap_link_for_style(node, attr.id, v).map(|style| {
                            node = style;
                        }),
                        _ => self.tree.set_attribute(node, name, v),
                    }
                }
                AttributeValue::Text(v) => self.tree.set_attribute(node, name, v).map(|()| {
                    self.hooks.on_attribute(self.tree, node, attr.id, name);
                }),
                AttributeValue::Style(props) => self.apply_style(node, props),
            };
            match result {
                Ok(()) => batch.report.attributes += 1,
                Err(e) => self.warn(
                    batch,
                    format!("failed to apply attribute {name} on node {}: {e}", attr.id),
                ),
            }
        }
    }

    fn apply_style(
        &mut self,
        node: NodeRef,
        props: &std::collections::BTreeMap<String, StyleValue>,
    ) -> Result<(), TreeError> {
        for (prop, value) in props {
            match value {
                StyleValue::Flag(false) => self.tree.remove_style_property(node, prop)?,
                StyleValue::Flag(true) => {}
                StyleValue::Value(v) => self.tree.set_style_property(node, prop, v, None)?,
                StyleValue::WithPriority(v, p) => {
                    self.tree.set_style_property(node, prop, v, Some(p))?
                }
            }
        }
        Ok(())
    }

    /// Replaces a stylesheet link by an inline style element under the same id.
    fn swap_link_for_style(
        &mut self,
        link: NodeRef,
        id: NodeId,
        css: &str,
    ) -> Result<NodeRef, TreeError> {
        let style = self.tree.create_node(NodeSpec::Element {
            tag: "style".into(),
            svg: false,
        })?;
        for (k, v) in self.tree.attributes(link) {
            if k != "href" {
                self.tree.set_attribute(style, &k, &v)?;
            }
        }
        self.tree.set_text_content(style, css)?;
        if let Some(parent) = self.tree.parent_node(link) {
            let anchor = self.tree.next_sibling(link);
            self.tree.remove_child(parent, link)?;
            self.tree.insert_before(parent, style, anchor)?;
        }
        self.mirror.add(style, id);
        self.hooks.on_build(self.tree, style, id);
        Ok(style)
    }
}

/// Keeps only the last text mutation per node, in first-seen order.
fn dedup_texts(texts: &[TextMutation]) -> Vec<&TextMutation> {
    let mut last: HashMap<NodeId, usize> = HashMap::new();
    for (i, t) in texts.iter().enumerate() {
        last.insert(t.id, i);
    }
    texts
        .iter()
        .enumerate()
        .filter(|(i, t)| last.get(&t.id) == Some(i))
        .map(|(_, t)| t)
        .collect()
}
