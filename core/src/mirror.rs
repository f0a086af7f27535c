//! Bidirectional map between recorded node ids and live tree nodes.

use std::collections::HashMap;

use crate::event::NodeId;
use crate::tree::{NodeRef, TreeTarget};

/// Registry owned by one replayer instance.
///
/// Absent entries are reported as `None`; lookups never fail.
#[derive(Debug, Default, Clone)]
pub struct Mirror {
    by_id: HashMap<NodeId, NodeRef>,
    by_ref: HashMap<NodeRef, NodeId>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` under `id`, replacing whatever either side was bound to.
    pub fn add(&mut self, node: NodeRef, id: NodeId) {
        if let Some(old) = self.by_id.insert(id, node) {
            if old != node {
                self.by_ref.remove(&old);
            }
        }
        if let Some(old_id) = self.by_ref.insert(node, id) {
            if old_id != id {
                self.by_id.remove(&old_id);
            }
        }
    }

    pub fn get_id(&self, node: NodeRef) -> Option<NodeId> {
        self.by_ref.get(&node).copied()
    }

    pub fn get_node(&self, id: NodeId) -> Option<NodeRef> {
        self.by_id.get(&id).copied()
    }

    pub fn has(&self, id: NodeId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_id.keys().copied()
    }

    /// Unregisters `node` and every live descendant.
    ///
    /// Children are read from the tree before anything is unlinked. Returns
    /// the ids that were removed.
    pub fn remove_node_from_map(&mut self, tree: &dyn TreeTarget, node: NodeRef) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            stack.extend(tree.child_nodes(n));
            if let Some(id) = self.by_ref.remove(&n) {
                self.by_id.remove(&id);
                removed.push(id);
            }
        }
        removed
    }

    pub fn reset(&mut self) {
        self.by_id.clear();
        self.by_ref.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeSpec, VirtualDocument};

    #[test]
    fn lookups_report_absence() {
        let mirror = Mirror::new();
        assert_eq!(mirror.get_node(4), None);
        assert_eq!(mirror.get_id(NodeRef(9)), None);
        assert!(!mirror.has(4));
    }

    #[test]
    fn rebinding_an_id_drops_the_stale_reverse_entry() {
        let mut mirror = Mirror::new();
        mirror.add(NodeRef(1), 10);
        mirror.add(NodeRef(2), 10);
        assert_eq!(mirror.get_node(10), Some(NodeRef(2)));
        assert_eq!(mirror.get_id(NodeRef(1)), None);
        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn removal_walks_live_descendants() {
        let mut doc = VirtualDocument::new();
        let root = doc.document();
        let el = |doc: &mut VirtualDocument, tag: &str| {
            doc.create_node(NodeSpec::Element {
                tag: tag.into(),
                svg: false,
            })
            .unwrap()
        };
        let html = el(&mut doc, "html");
        let body = el(&mut doc, "body");
        let p = el(&mut doc, "p");
        doc.append_child(root, html).unwrap();
        doc.append_child(html, body).unwrap();
        doc.append_child(body, p).unwrap();

        let mut mirror = Mirror::new();
        mirror.add(root, 1);
        mirror.add(html, 2);
        mirror.add(body, 3);
        mirror.add(p, 4);

        let mut removed = mirror.remove_node_from_map(&doc, body);
        removed.sort();
        assert_eq!(removed, vec![3, 4]);
        assert!(mirror.has(2));
        assert!(!mirror.has(4));

        mirror.reset();
        assert!(mirror.is_empty());
    }
}
