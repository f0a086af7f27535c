//! Forest of deferred adds.
//!
//! Deferred adds are grouped by their parent and next-sibling linkage so a
//! parent is always applied before the adds that hang off it. Nodes live in
//! an arena and refer to each other by index.

use std::collections::HashMap;

use crate::event::{AddedNodeMutation, NodeId};

#[derive(Debug)]
struct ResolveNode<'m> {
    mutation: &'m AddedNodeMutation,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct ResolveForest<'m> {
    nodes: Vec<ResolveNode<'m>>,
    roots: Vec<usize>,
}

impl<'m> ResolveForest<'m> {
    pub fn from_queue(queue: &[&'m AddedNodeMutation]) -> Self {
        let mut forest = Self::default();
        let mut by_id: HashMap<NodeId, usize> = HashMap::new();

        for &mutation in queue {
            let idx = forest.nodes.len();

            // An add anchored before an already queued sibling goes right in
            // front of it, under the same parent.
            if let Some(next_idx) = mutation.next_id.node().and_then(|n| by_id.get(&n).copied()) {
                let parent = forest.nodes[next_idx].parent;
                forest.nodes.push(ResolveNode {
                    mutation,
                    parent,
                    children: Vec::new(),
                });
                let siblings = match parent {
                    Some(p) => &mut forest.nodes[p].children,
                    None => &mut forest.roots,
                };
                let at = siblings.iter().position(|s| *s == next_idx).unwrap_or(siblings.len());
                siblings.insert(at, idx);
                by_id.insert(mutation.node.id, idx);
                continue;
            }

            if let Some(parent_idx) = by_id.get(&mutation.parent_id).copied() {
                forest.nodes.push(ResolveNode {
                    mutation,
                    parent: Some(parent_idx),
                    children: Vec::new(),
                });
                forest.nodes[parent_idx].children.push(idx);
                by_id.insert(mutation.node.id, idx);
                continue;
            }

            forest.nodes.push(ResolveNode {
                mutation,
                parent: None,
                children: Vec::new(),
            });
            forest.roots.push(idx);
            by_id.insert(mutation.node.id, idx);
        }
        forest
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn mutation(&self, idx: usize) -> &'m AddedNodeMutation {
        self.nodes[idx].mutation
    }

    /// Application order: the node itself, then its children last to first.
    pub fn apply_order(&self, root: usize) -> Vec<&'m AddedNodeMutation> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            out.push(node.mutation);
            // Popped from the back, so pushing in order visits the last child first.
            stack.extend(node.children.iter().copied());
        }
        out
    }

    /// Parent-first, siblings in tree order. Rebuilding a forest from this
    /// order yields the same shape.
    pub fn flatten(&self, root: usize) -> Vec<&'m AddedNodeMutation> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            out.push(node.mutation);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Compact `id(parent)[children]` dump for diagnostics.
    pub fn describe(&self, root: usize) -> String {
        let node = &self.nodes[root];
        let mut out = format!("{}(parent {})", node.mutation.node.id, node.mutation.parent_id);
        if !node.children.is_empty() {
            let children: Vec<String> = node.children.iter().map(|c| self.describe(*c)).collect();
            out.push_str(&format!("[{}]", children.join(", ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{SerializedNode, SiblingRef};

    fn add(id: NodeId, parent: NodeId, next: Option<NodeId>) -> AddedNodeMutation {
        AddedNodeMutation {
            parent_id: parent,
            previous_id: SiblingRef::Unset,
            next_id: next.map(SiblingRef::Node).unwrap_or_default(),
            node: SerializedNode::element(id, "div"),
        }
    }

    fn ids(order: Vec<&AddedNodeMutation>) -> Vec<NodeId> {
        order.into_iter().map(|m| m.node.id).collect()
    }

    #[test]
    fn children_attach_to_queued_parents() {
        let q = [add(3, 1, None), add(5, 3, None), add(6, 3, None), add(9, 2, None)];
        let refs: Vec<_> = q.iter().collect();
        let forest = ResolveForest::from_queue(&refs);
        assert_eq!(forest.roots().len(), 2);
        assert_eq!(ids(forest.apply_order(forest.roots()[0])), vec![3, 6, 5]);
        assert_eq!(ids(forest.flatten(forest.roots()[0])), vec![3, 5, 6]);
        assert_eq!(forest.describe(forest.roots()[0]), "3(parent 1)[5(parent 3), 6(parent 3)]");
    }

    #[test]
    fn next_sibling_linkage_inserts_in_front() {
        let q = [add(3, 1, None), add(4, 3, None), add(5, 3, Some(4))];
        let refs: Vec<_> = q.iter().collect();
        let forest = ResolveForest::from_queue(&refs);
        assert_eq!(ids(forest.flatten(forest.roots()[0])), vec![3, 5, 4]);
        assert_eq!(ids(forest.apply_order(forest.roots()[0])), vec![3, 4, 5]);
    }
}
