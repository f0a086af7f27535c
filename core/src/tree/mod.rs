//! Tree target contract.
//!
//! The replay engine never touches a concrete document type. Everything it
//! needs from the page being reconstructed goes through [`TreeTarget`], which
//! a browser binding or the bundled [`VirtualDocument`] implement alike.

mod build;
mod stylesheet;
mod virtual_dom;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::event::{CanvasCommand, CanvasContext};

pub use build::{build_node, rebuild, BuildHooks, NoopBuildHooks};
pub use stylesheet::{CssRule, Declaration, StyleRuleOp, StyleSheet};
pub use virtual_dom::{FontFace, MediaState, VirtualDocument};

/// Opaque handle to a live node of a tree target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub u64);

/// Shape of a node, used both to create nodes and to describe existing ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSpec {
    Document,
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag: String,
        svg: bool,
    },
    Text(String),
    CData(String),
    Comment(String),
}

impl NodeSpec {
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn can_have_children(&self) -> bool {
        matches!(self, Self::Document | Self::Element { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeRef),
    #[error("hierarchy request error: {0}")]
    HierarchyRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid attribute name {0:?}")]
    InvalidAttribute(String),
    #[error("rule index {0:?} out of range")]
    IndexOutOfRange(Vec<usize>),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaCommand {
    pub action: Option<MediaAction>,
    pub current_time: Option<f64>,
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    pub playback_rate: Option<f64>,
    pub looping: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: NodeRef,
    pub start_offset: u32,
    pub end: NodeRef,
    pub end_offset: u32,
}

/// Operations the replay engine performs on the reconstructed page.
pub trait TreeTarget {
    /// Root document node.
    fn document(&self) -> NodeRef;

    /// Drops every node and returns a fresh, empty document.
    fn reset_document(&mut self) -> NodeRef;

    fn create_node(&mut self, spec: NodeSpec) -> Result<NodeRef, TreeError>;

    fn describe(&self, node: NodeRef) -> Option<NodeSpec>;

    fn parent_node(&self, node: NodeRef) -> Option<NodeRef>;

    fn child_nodes(&self, node: NodeRef) -> Vec<NodeRef>;

    fn next_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let parent = self.parent_node(node)?;
        let children = self.child_nodes(parent);
        let pos = children.iter().position(|c| *c == node)?;
        children.get(pos + 1).copied()
    }

    fn contains(&self, ancestor: NodeRef, node: NodeRef) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent_node(n);
        }
        false
    }

    /// Inserts `child` before `reference`, or appends when `reference` is `None`.
    /// A child that already has a parent is moved.
    fn insert_before(
        &mut self,
        parent: NodeRef,
        child: NodeRef,
        reference: Option<NodeRef>,
    ) -> Result<(), TreeError>;

    fn append_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), TreeError> {
        self.insert_before(parent, child, None)
    }

    fn remove_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), TreeError>;

    fn get_attribute(&self, node: NodeRef, name: &str) -> Option<String>;

    fn attributes(&self, node: NodeRef) -> Vec<(String, String)>;

    fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<(), TreeError>;

    fn remove_attribute(&mut self, node: NodeRef, name: &str) -> Result<(), TreeError>;

    fn set_text_content(&mut self, node: NodeRef, text: &str) -> Result<(), TreeError>;

    fn set_style_property(
        &mut self,
        node: NodeRef,
        property: &str,
        value: &str,
        priority: Option<&str>,
    ) -> Result<(), TreeError>;

    fn remove_style_property(&mut self, node: NodeRef, property: &str) -> Result<(), TreeError>;

    fn scroll_to(&mut self, node: NodeRef, x: f64, y: f64, smooth: bool) -> Result<(), TreeError>;

    fn focus(&mut self, node: NodeRef) -> Result<(), TreeError>;

    fn blur(&mut self, node: NodeRef) -> Result<(), TreeError>;

    fn set_input_value(&mut self, node: NodeRef, value: &str, checked: bool)
        -> Result<(), TreeError>;

    fn dispatch_event(&mut self, node: NodeRef, event_type: &str) -> Result<(), TreeError>;

    fn apply_media(&mut self, node: NodeRef, command: &MediaCommand) -> Result<(), TreeError>;

    /// Applies a rule operation to the sheet owned by a `style` element.
    fn apply_style_rule(&mut self, node: NodeRef, op: &StyleRuleOp) -> Result<(), TreeError>;

    fn adopt_style_sheets(&mut self, node: NodeRef, sheets: &[StyleSheet])
        -> Result<(), TreeError>;

    fn apply_canvas(
        &mut self,
        node: NodeRef,
        context: CanvasContext,
        commands: &[CanvasCommand],
    ) -> Result<(), TreeError>;

    fn add_font(
        &mut self,
        family: &str,
        source: &str,
        descriptors: &BTreeMap<String, String>,
    ) -> Result<(), TreeError>;

    fn set_selection(&mut self, ranges: &[SelectionRange]) -> Result<(), TreeError>;

    /// Whether pointer interaction with the replayed page is allowed.
    fn set_interactive(&mut self, interactive: bool);
}

/// First element child of `node` with the given tag.
pub fn find_child_element(tree: &dyn TreeTarget, node: NodeRef, tag: &str) -> Option<NodeRef> {
    tree.child_nodes(node)
        .into_iter()
        .find(|c| matches!(tree.describe(*c), Some(NodeSpec::Element { tag: t, .. }) if t == tag))
}

/// The `html` element of the root document.
pub fn html_element(tree: &dyn TreeTarget) -> Option<NodeRef> {
    find_child_element(tree, tree.document(), "html")
}

/// The `head` element of the root document.
pub fn head_element(tree: &dyn TreeTarget) -> Option<NodeRef> {
    html_element(tree).and_then(|html| find_child_element(tree, html, "head"))
}

/// Adds or removes one token of the `class` attribute.
pub fn toggle_class(
    tree: &mut dyn TreeTarget,
    node: NodeRef,
    class: &str,
    on: bool,
) -> Result<(), TreeError> {
    let current = tree.get_attribute(node, "class").unwrap_or_default();
    let mut tokens: Vec<&str> = current.split_whitespace().filter(|t| *t != class).collect();
    if on {
        tokens.push(class);
    }
    if tokens.is_empty() {
        if tree.get_attribute(node, "class").is_some() {
            tree.remove_attribute(node, "class")?;
        }
        return Ok(());
    }
    tree.set_attribute(node, "class", &tokens.join(" "))
}

/// Depth-first list of `node` and its descendants.
pub fn descendants(tree: &dyn TreeTarget, node: NodeRef) -> Vec<NodeRef> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        out.push(n);
        let children = tree.child_nodes(n);
        stack.extend(children.into_iter().rev());
    }
    out
}
