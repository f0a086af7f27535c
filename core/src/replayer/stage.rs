//! The tree the replayer is currently writing to.
//!
//! Normally that is the live tree. During a catch-up batch with the virtual
//! fast path enabled it is a shadow copy that is diffed back afterwards.

use std::collections::HashMap;

use crate::assets::AssetManager;
use crate::event::NodeId;
use crate::mirror::Mirror;
use crate::plugin::ReplayPlugin;
use crate::reconcile::LegacyMissingNodes;
use crate::tree::{BuildHooks, NodeRef, StyleSheet, TreeTarget, VirtualDocument};

/// Constructed style sheets by `styleId`, and which nodes adopt them.
#[derive(Debug, Clone, Default)]
pub struct StyleMirror {
    sheets: HashMap<i64, StyleSheet>,
    adopters: HashMap<NodeId, Vec<i64>>,
}

impl StyleMirror {
    pub fn get(&self, style_id: i64) -> Option<&StyleSheet> {
        self.sheets.get(&style_id)
    }

    pub fn get_or_create(&mut self, style_id: i64) -> &mut StyleSheet {
        self.sheets.entry(style_id).or_default()
    }

    pub fn insert(&mut self, style_id: i64, sheet: StyleSheet) {
        self.sheets.insert(style_id, sheet);
    }

    pub fn set_adopted(&mut self, node_id: NodeId, style_ids: Vec<i64>) {
        self.adopters.insert(node_id, style_ids);
    }

    /// Sheets adopted by `node_id`, in adoption order. Unknown ids are skipped.
    pub fn adopted_by(&self, node_id: NodeId) -> Vec<StyleSheet> {
        self.adopters
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.sheets.get(id)).cloned().collect())
            .unwrap_or_default()
    }

    /// Nodes adopting `style_id`.
    pub fn adopters_of(&self, style_id: i64) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .adopters
            .iter()
            .filter(|(_, ids)| ids.contains(&style_id))
            .map(|(node, _)| *node)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn adopter_ids(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.adopters.keys().copied().collect();
        out.sort_unstable();
        out
    }

    pub fn reset(&mut self) {
        self.sheets.clear();
        self.adopters.clear();
    }
}

pub(crate) struct Shadow {
    pub doc: VirtualDocument,
    pub mirror: Mirror,
    pub legacy: LegacyMissingNodes,
    pub styles: StyleMirror,
}

pub(crate) struct Stage<T> {
    pub tree: T,
    pub mirror: Mirror,
    pub legacy: LegacyMissingNodes,
    pub styles: StyleMirror,
    pub shadow: Option<Shadow>,
}

/// Borrowed view of whichever tree is current.
pub(crate) struct Target<'a> {
    pub tree: &'a mut dyn TreeTarget,
    pub mirror: &'a mut Mirror,
    pub legacy: &'a mut LegacyMissingNodes,
    pub styles: &'a mut StyleMirror,
}

impl<T: TreeTarget> Stage<T> {
    pub fn new(tree: T) -> Self {
        Self {
            tree,
            mirror: Mirror::new(),
            legacy: LegacyMissingNodes::new(),
            styles: StyleMirror::default(),
            shadow: None,
        }
    }

    pub fn is_shadowed(&self) -> bool {
        self.shadow.is_some()
    }

    pub fn target(&mut self) -> Target<'_> {
        match &mut self.shadow {
            Some(s) => Target {
                tree: &mut s.doc,
                mirror: &mut s.mirror,
                legacy: &mut s.legacy,
                styles: &mut s.styles,
            },
            None => Target {
                tree: &mut self.tree,
                mirror: &mut self.mirror,
                legacy: &mut self.legacy,
                styles: &mut self.styles,
            },
        }
    }

    /// Starts writing to a copy of the live tree.
    pub fn begin_shadow(&mut self) {
        let (doc, pairs) = VirtualDocument::copy_of(&self.tree);
        let mut mirror = Mirror::new();
        for (live, copy) in pairs {
            if let Some(id) = self.mirror.get_id(live) {
                mirror.add(copy, id);
            }
        }
        self.shadow = Some(Shadow {
            doc,
            mirror,
            legacy: LegacyMissingNodes::new(),
            styles: self.styles.clone(),
        });
    }
}

/// Build hooks of the live tree: asset rewrites and plugin callbacks.
pub(crate) struct ReplayHooks<'a> {
    pub plugins: &'a mut [Box<dyn ReplayPlugin>],
    pub assets: Option<&'a AssetManager>,
}

impl BuildHooks for ReplayHooks<'_> {
    fn on_build(&mut self, tree: &mut dyn TreeTarget, node: NodeRef, id: NodeId) {
        if let Some(assets) = self.assets {
            let names: Vec<String> = tree.attributes(node).into_iter().map(|(k, _)| k).collect();
            for name in names {
                assets.manage_attribute(tree, node, id, &name);
            }
        }
        for plugin in self.plugins.iter_mut() {
            plugin.on_build(tree, node, id);
        }
    }

    fn on_attribute(&mut self, tree: &mut dyn TreeTarget, node: NodeRef, id: NodeId, name: &str) {
        if let Some(assets) = self.assets {
            assets.manage_attribute(tree, node, id, name);
        }
    }
}
