//! Table of adds anchored with the obsolete `-1` sibling marker.
//!
//! Such a node is built and registered right away but only inserted once a
//! node naming it as previous or next sibling is placed. Entries survive
//! across batches and are abandoned after a bounded number of them.

use std::collections::HashMap;

use crate::diagnostics::Diagnostics;
use crate::event::{AddedNodeMutation, NodeId, SiblingRef};
use crate::mirror::Mirror;
use crate::tree::{NodeRef, TreeTarget};

#[derive(Debug, Clone)]
struct LegacyEntry {
    node: NodeRef,
    previous_id: SiblingRef,
    next_id: SiblingRef,
    age: u32,
}

#[derive(Debug, Default)]
pub struct LegacyMissingNodes {
    entries: HashMap<NodeId, LegacyEntry>,
}

impl LegacyMissingNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn insert(&mut self, node: NodeRef, mutation: &AddedNodeMutation) {
        self.entries.insert(
            mutation.node.id,
            LegacyEntry {
                node,
                previous_id: mutation.previous_id,
                next_id: mutation.next_id,
                age: 0,
            },
        );
    }

    /// Places every waiting node anchored to `target`, cascading through
    /// nodes that become placeable. Returns how many were inserted.
    pub fn resolve(
        &mut self,
        tree: &mut dyn TreeTarget,
        parent: NodeRef,
        target: NodeRef,
        previous_id: SiblingRef,
        next_id: SiblingRef,
        diag: &Diagnostics,
    ) -> usize {
        let mut placed = 0;
        let mut work = vec![(target, previous_id, next_id)];
        while let Some((target, previous_id, next_id)) = work.pop() {
            let before = previous_id.node().and_then(|id| self.entries.remove(&id));
            let after = next_id.node().and_then(|id| self.entries.remove(&id));

            if let Some(entry) = &after {
                let anchor = tree.next_sibling(target);
                match tree.insert_before(parent, entry.node, anchor) {
                    Ok(()) => placed += 1,
                    Err(e) => diag.warn(format!("legacy node could not be placed: {e}")),
                }
            }
            if let Some(entry) = &before {
                match tree.insert_before(parent, entry.node, Some(target)) {
                    Ok(()) => placed += 1,
                    Err(e) => diag.warn(format!("legacy node could not be placed: {e}")),
                }
            }
            // Previous-side chains are resolved first.
            for entry in [after, before].into_iter().flatten() {
                if entry.previous_id.is_set() || entry.next_id.is_set() {
                    work.push((entry.node, entry.previous_id, entry.next_id));
                }
            }
        }
        placed
    }

    /// Ages every entry by one batch and drops those older than `max_batches`,
    /// unregistering their nodes.
    pub fn age(
        &mut self,
        mirror: &mut Mirror,
        tree: &dyn TreeTarget,
        max_batches: u32,
        diag: &Diagnostics,
    ) {
        let mut expired = Vec::new();
        for (id, entry) in self.entries.iter_mut() {
            entry.age += 1;
            if entry.age > max_batches {
                expired.push(*id);
            }
        }
        for id in expired {
            if let Some(entry) = self.entries.remove(&id) {
                diag.debug(format!("abandoning legacy node {id} after {max_batches} batches"));
                mirror.remove_node_from_map(tree, entry.node);
            }
        }
    }

    /// Clears the table, reporting leftovers.
    pub fn clear(&mut self, diag: &Diagnostics) {
        if !self.entries.is_empty() {
            let mut ids: Vec<_> = self.entries.keys().copied().collect();
            ids.sort_unstable();
            diag.warn(format!("found unresolved missing nodes {ids:?}"));
        }
        self.entries.clear();
    }
}
