//! In-memory [`TreeTarget`] implementation.
//!
//! Used for headless replays, for the batched fast path during seeks, and by
//! the tests. It enforces the subset of DOM hierarchy rules the reconciler
//! depends on: a document holds at most one element and one doctype, text can
//! not sit directly under a document, and a node can not be inserted into its
//! own subtree.

use std::collections::{BTreeMap, HashMap};

use super::{
    MediaAction, MediaCommand, NodeRef, NodeSpec, SelectionRange, StyleRuleOp, StyleSheet,
    TreeError, TreeTarget,
};
use crate::event::{CanvasCommand, CanvasContext};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MediaState {
    pub paused: bool,
    pub current_time: f64,
    pub volume: f64,
    pub muted: bool,
    pub playback_rate: f64,
    pub looping: bool,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            paused: true,
            current_time: 0.0,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            looping: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub family: String,
    pub source: String,
    pub descriptors: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct VNode {
    spec: NodeSpec,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
    attributes: Vec<(String, String)>,
    scroll: (f64, f64),
    value: Option<String>,
    checked: bool,
    media: MediaState,
    sheet: Option<StyleSheet>,
    adopted: Vec<StyleSheet>,
    canvas: Vec<(CanvasContext, CanvasCommand)>,
}

impl VNode {
    fn new(spec: NodeSpec) -> Self {
        Self {
            spec,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            scroll: (0.0, 0.0),
            value: None,
            checked: false,
            media: MediaState::default(),
            sheet: None,
            adopted: Vec::new(),
            canvas: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VirtualDocument {
    nodes: HashMap<u64, VNode>,
    next_ref: u64,
    root: NodeRef,
    focused: Option<NodeRef>,
    interactive: bool,
    fonts: Vec<FontFace>,
    selection: Vec<SelectionRange>,
    dispatched: Vec<(NodeRef, String)>,
    window_scroll: (f64, f64),
}

impl Default for VirtualDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualDocument {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: HashMap::new(),
            next_ref: 1,
            root: NodeRef(0),
            focused: None,
            interactive: false,
            fonts: Vec::new(),
            selection: Vec::new(),
            dispatched: Vec::new(),
            window_scroll: (0.0, 0.0),
        };
        doc.root = doc.alloc(NodeSpec::Document);
        doc
    }

    /// Structural copy of another tree.
    ///
    /// Returns the copy and the pairs `(source, copy)` for every node reached
    /// from the source document.
    pub fn copy_of(source: &dyn TreeTarget) -> (Self, Vec<(NodeRef, NodeRef)>) {
        let mut doc = Self::new();
        let mut pairs = vec![(source.document(), doc.root)];
        let mut stack = vec![(source.document(), doc.root)];
        while let Some((src, dst)) = stack.pop() {
            for child in source.child_nodes(src) {
                let Some(spec) = source.describe(child) else {
                    continue;
                };
                let copy = doc.alloc(spec);
                if let Some(node) = doc.nodes.get_mut(&copy.0) {
                    node.attributes = source.attributes(child);
                    node.parent = Some(dst);
                }
                if let Some(parent) = doc.nodes.get_mut(&dst.0) {
                    parent.children.push(copy);
                }
                pairs.push((child, copy));
                stack.push((child, copy));
            }
        }
        (doc, pairs)
    }

    fn alloc(&mut self, spec: NodeSpec) -> NodeRef {
        let r = NodeRef(self.next_ref);
        self.next_ref += 1;
        self.nodes.insert(r.0, VNode::new(spec));
        r
    }

    fn node(&self, r: NodeRef) -> Result<&VNode, TreeError> {
        self.nodes.get(&r.0).ok_or(TreeError::UnknownNode(r))
    }

    fn node_mut(&mut self, r: NodeRef) -> Result<&mut VNode, TreeError> {
        self.nodes.get_mut(&r.0).ok_or(TreeError::UnknownNode(r))
    }

    fn element_mut(&mut self, r: NodeRef) -> Result<&mut VNode, TreeError> {
        let node = self.node_mut(r)?;
        match node.spec {
            NodeSpec::Element { .. } => Ok(node),
            _ => Err(TreeError::Unsupported(format!("{r:?} is not an element"))),
        }
    }

    fn detach(&mut self, child: NodeRef) {
        let parent = self.nodes.get(&child.0).and_then(|n| n.parent);
        if let Some(p) = parent {
            if let Some(pn) = self.nodes.get_mut(&p.0) {
                pn.children.retain(|c| *c != child);
            }
            self.invalidate_sheet(p);
        }
        if let Some(n) = self.nodes.get_mut(&child.0) {
            n.parent = None;
        }
    }

    /// Drops the cached sheet of a style element whose text changed.
    fn invalidate_sheet(&mut self, node: NodeRef) {
        if let Some(n) = self.nodes.get_mut(&node.0) {
            if n.spec.tag() == Some("style") {
                n.sheet = None;
            }
        }
    }

    fn check_insert(&self, parent: NodeRef, child: NodeRef) -> Result<(), TreeError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if !parent_node.spec.can_have_children() {
            return Err(TreeError::HierarchyRequest(format!(
                "{parent:?} can not have children"
            )));
        }
        if matches!(child_node.spec, NodeSpec::Document) {
            return Err(TreeError::HierarchyRequest("document can not be inserted".into()));
        }
        if self.contains(child, parent) {
            return Err(TreeError::HierarchyRequest(format!(
                "{child:?} is an ancestor of {parent:?}"
            )));
        }
        if matches!(parent_node.spec, NodeSpec::Document) {
            let same_kind = |other: &NodeSpec| {
                matches!(
                    (&child_node.spec, other),
                    (NodeSpec::Element { .. }, NodeSpec::Element { .. })
                        | (NodeSpec::DocumentType { .. }, NodeSpec::DocumentType { .. })
                )
            };
            match child_node.spec {
                NodeSpec::Text(_) | NodeSpec::CData(_) => {
                    return Err(TreeError::HierarchyRequest(
                        "text can not be a child of a document".into(),
                    ));
                }
                NodeSpec::Element { .. } | NodeSpec::DocumentType { .. } => {
                    let occupied = parent_node.children.iter().any(|c| {
                        *c != child
                            && self
                                .nodes
                                .get(&c.0)
                                .map(|n| same_kind(&n.spec))
                                .unwrap_or(false)
                    });
                    if occupied {
                        return Err(TreeError::HierarchyRequest(
                            "document already has a node of this kind".into(),
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn sheet_mut(&mut self, node: NodeRef) -> Result<&mut StyleSheet, TreeError> {
        if self.element_mut(node)?.spec.tag() != Some("style") {
            return Err(TreeError::Unsupported(format!("{node:?} owns no style sheet")));
        }
        let text = self.text_content(node);
        let n = self.node_mut(node)?;
        Ok(n.sheet
            .get_or_insert_with(|| StyleSheet::from_css_text(&text)))
    }

    fn write_inline_style(
        &mut self,
        node: NodeRef,
        edit: impl FnOnce(&mut Vec<(String, String)>),
    ) -> Result<(), TreeError> {
        let current = self.get_attribute(node, "style").unwrap_or_default();
        let mut decls: Vec<(String, String)> = current
            .split(';')
            .filter_map(|d| {
                let (k, v) = d.split_once(':')?;
                let k = k.trim();
                (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
            })
            .collect();
        edit(&mut decls);
        let text = decls
            .iter()
            .map(|(k, v)| format!("{k}: {v};"))
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            self.remove_attribute(node, "style")
        } else {
            self.set_attribute(node, "style", &text)
        }
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeRef) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let Some(v) = self.nodes.get(&n.0) else {
                continue;
            };
            match &v.spec {
                NodeSpec::Text(t) | NodeSpec::CData(t) => out.push_str(t),
                _ => stack.extend(v.children.iter().rev().copied()),
            }
        }
        out
    }

    pub fn scroll_position(&self, node: NodeRef) -> Option<(f64, f64)> {
        if node == self.root {
            return Some(self.window_scroll);
        }
        self.nodes.get(&node.0).map(|n| n.scroll)
    }

    pub fn input_value(&self, node: NodeRef) -> Option<&str> {
        self.nodes.get(&node.0)?.value.as_deref()
    }

    pub fn is_checked(&self, node: NodeRef) -> bool {
        self.nodes.get(&node.0).map(|n| n.checked).unwrap_or(false)
    }

    pub fn focused(&self) -> Option<NodeRef> {
        self.focused
    }

    pub fn media_state(&self, node: NodeRef) -> Option<&MediaState> {
        self.nodes.get(&node.0).map(|n| &n.media)
    }

    /// Current sheet of a `style` element, parsed from its text if untouched.
    pub fn style_sheet(&self, node: NodeRef) -> Option<StyleSheet> {
        let n = self.nodes.get(&node.0)?;
        if n.spec.tag() != Some("style") {
            return None;
        }
        Some(
            n.sheet
                .clone()
                .unwrap_or_else(|| StyleSheet::from_css_text(&self.text_content(node))),
        )
    }

    pub fn adopted_sheets(&self, node: NodeRef) -> &[StyleSheet] {
        self.nodes
            .get(&node.0)
            .map(|n| n.adopted.as_slice())
            .unwrap_or(&[])
    }

    pub fn canvas_commands(&self, node: NodeRef) -> &[(CanvasContext, CanvasCommand)] {
        self.nodes
            .get(&node.0)
            .map(|n| n.canvas.as_slice())
            .unwrap_or(&[])
    }

    pub fn fonts(&self) -> &[FontFace] {
        &self.fonts
    }

    pub fn selection(&self) -> &[SelectionRange] {
        &self.selection
    }

    pub fn dispatched_events(&self) -> &[(NodeRef, String)] {
        &self.dispatched
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// First element in document order with the given tag.
    pub fn find_element(&self, tag: &str) -> Option<NodeRef> {
        super::descendants(self, self.root)
            .into_iter()
            .find(|n| self.nodes.get(&n.0).and_then(|v| v.spec.tag()) == Some(tag))
    }

    /// Serialized markup of the whole document.
    pub fn document_html(&self) -> String {
        self.outer_html(self.root)
    }

    pub fn outer_html(&self, node: NodeRef) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeRef, out: &mut String) {
        let Some(n) = self.nodes.get(&node.0) else {
            return;
        };
        match &n.spec {
            NodeSpec::Document => {
                for c in &n.children {
                    self.write_html(*c, out);
                }
            }
            NodeSpec::DocumentType { name, .. } => {
                out.push_str(&format!("<!DOCTYPE {name}>"));
            }
            NodeSpec::Element { tag, .. } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in &n.attributes {
                    out.push_str(&format!(" {k}=\"{}\"", v.replace('"', "&quot;")));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for c in &n.children {
                    self.write_html(*c, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
            NodeSpec::Text(t) => {
                let raw = n
                    .parent
                    .and_then(|p| self.nodes.get(&p.0))
                    .and_then(|p| p.spec.tag())
                    .map(|tag| tag == "style" || tag == "script")
                    .unwrap_or(false);
                if raw {
                    out.push_str(t);
                } else {
                    out.push_str(&t.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;"));
                }
            }
            NodeSpec::CData(t) => out.push_str(&format!("<![CDATA[{t}]]>")),
            NodeSpec::Comment(t) => out.push_str(&format!("<!--{t}-->")),
        }
    }
}

fn valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '='))
}

impl TreeTarget for VirtualDocument {
    fn document(&self) -> NodeRef {
        self.root
    }

    fn reset_document(&mut self) -> NodeRef {
        self.nodes.clear();
        self.focused = None;
        self.selection.clear();
        self.window_scroll = (0.0, 0.0);
        self.root = self.alloc(NodeSpec::Document);
        self.root
    }

    fn create_node(&mut self, spec: NodeSpec) -> Result<NodeRef, TreeError> {
        if let NodeSpec::Element { tag, .. } = &spec {
            if tag.is_empty() {
                return Err(TreeError::Unsupported("empty tag name".into()));
            }
        }
        Ok(self.alloc(spec))
    }

    fn describe(&self, node: NodeRef) -> Option<NodeSpec> {
        self.nodes.get(&node.0).map(|n| n.spec.clone())
    }

    fn parent_node(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.get(&node.0)?.parent
    }

    fn child_nodes(&self, node: NodeRef) -> Vec<NodeRef> {
        self.nodes
            .get(&node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn insert_before(
        &mut self,
        parent: NodeRef,
        child: NodeRef,
        reference: Option<NodeRef>,
    ) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        if let Some(r) = reference {
            if self.node(r)?.parent != Some(parent) {
                return Err(TreeError::NotFound(format!(
                    "{r:?} is not a child of {parent:?}"
                )));
            }
            if r == child {
                return Ok(());
            }
        }
        self.detach(child);
        let node = self.node_mut(parent)?;
        let at = reference
            .and_then(|r| node.children.iter().position(|c| *c == r))
            .unwrap_or(node.children.len());
        node.children.insert(at, child);
        self.node_mut(child)?.parent = Some(parent);
        self.invalidate_sheet(parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<(), TreeError> {
        if self.node(child)?.parent != Some(parent) {
            return Err(TreeError::NotFound(format!(
                "{child:?} is not a child of {parent:?}"
            )));
        }
        self.detach(child);
        if self.focused.is_some_and(|f| self.contains(child, f)) {
            self.focused = None;
        }
        Ok(())
    }

    fn get_attribute(&self, node: NodeRef, name: &str) -> Option<String> {
        self.nodes
            .get(&node.0)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn attributes(&self, node: NodeRef) -> Vec<(String, String)> {
        self.nodes
            .get(&node.0)
            .map(|n| n.attributes.clone())
            .unwrap_or_default()
    }

    fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<(), TreeError> {
        if !valid_attribute_name(name) {
            return Err(TreeError::InvalidAttribute(name.to_string()));
        }
        let n = self.element_mut(node)?;
        match n.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => n.attributes.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeRef, name: &str) -> Result<(), TreeError> {
        self.element_mut(node)?.attributes.retain(|(k, _)| k != name);
        Ok(())
    }

    fn set_text_content(&mut self, node: NodeRef, text: &str) -> Result<(), TreeError> {
        if matches!(self.node(node)?.spec, NodeSpec::Element { .. }) {
            for c in self.child_nodes(node) {
                self.detach(c);
            }
            if !text.is_empty() {
                let t = self.alloc(NodeSpec::Text(text.to_string()));
                self.insert_before(node, t, None)?;
            }
            self.invalidate_sheet(node);
            return Ok(());
        }
        let n = self.node_mut(node)?;
        let parent = n.parent;
        match &mut n.spec {
            NodeSpec::Text(t) | NodeSpec::CData(t) | NodeSpec::Comment(t) => *t = text.to_string(),
            _ => return Err(TreeError::Unsupported(format!("text content on {node:?}"))),
        }
        if let Some(p) = parent {
            self.invalidate_sheet(p);
        }
        Ok(())
    }

    fn set_style_property(
        &mut self,
        node: NodeRef,
        property: &str,
        value: &str,
        priority: Option<&str>,
    ) -> Result<(), TreeError> {
        let value = match priority.filter(|p| !p.is_empty()) {
            Some(p) => format!("{value} !{p}"),
            None => value.to_string(),
        };
        self.write_inline_style(node, |decls| {
            match decls.iter_mut().find(|(k, _)| k == property) {
                Some((_, v)) => *v = value,
                None => decls.push((property.to_string(), value)),
            }
        })
    }

    fn remove_style_property(&mut self, node: NodeRef, property: &str) -> Result<(), TreeError> {
        self.write_inline_style(node, |decls| decls.retain(|(k, _)| k != property))
    }

    fn scroll_to(&mut self, node: NodeRef, x: f64, y: f64, _smooth: bool) -> Result<(), TreeError> {
        if node == self.root {
            self.window_scroll = (x, y);
            return Ok(());
        }
        self.node_mut(node)?.scroll = (x, y);
        Ok(())
    }

    fn focus(&mut self, node: NodeRef) -> Result<(), TreeError> {
        self.element_mut(node)?;
        self.focused = Some(node);
        Ok(())
    }

    fn blur(&mut self, node: NodeRef) -> Result<(), TreeError> {
        if self.focused == Some(node) {
            self.focused = None;
        }
        Ok(())
    }

    fn set_input_value(
        &mut self,
        node: NodeRef,
        value: &str,
        checked: bool,
    ) -> Result<(), TreeError> {
        let n = self.element_mut(node)?;
        n.value = Some(value.to_string());
        n.checked = checked;
        Ok(())
    }

    fn dispatch_event(&mut self, node: NodeRef, event_type: &str) -> Result<(), TreeError> {
        self.node(node)?;
        self.dispatched.push((node, event_type.to_string()));
        Ok(())
    }

    fn apply_media(&mut self, node: NodeRef, command: &MediaCommand) -> Result<(), TreeError> {
        let n = self.element_mut(node)?;
        if !matches!(n.spec.tag(), Some("video" | "audio")) {
            return Err(TreeError::Unsupported(format!("{node:?} is not a media element")));
        }
        let media = &mut n.media;
        if let Some(t) = command.current_time {
            media.current_time = t;
        }
        if let Some(v) = command.volume {
            media.volume = v;
        }
        if let Some(m) = command.muted {
            media.muted = m;
        }
        if let Some(r) = command.playback_rate {
            media.playback_rate = r;
        }
        if let Some(l) = command.looping {
            media.looping = l;
        }
        match command.action {
            Some(MediaAction::Play) => media.paused = false,
            Some(MediaAction::Pause) => media.paused = true,
            None => {}
        }
        Ok(())
    }

    fn apply_style_rule(&mut self, node: NodeRef, op: &StyleRuleOp) -> Result<(), TreeError> {
        self.sheet_mut(node)?.apply(op)
    }

    fn adopt_style_sheets(
        &mut self,
        node: NodeRef,
        sheets: &[StyleSheet],
    ) -> Result<(), TreeError> {
        self.node_mut(node)?.adopted = sheets.to_vec();
        Ok(())
    }

    fn apply_canvas(
        &mut self,
        node: NodeRef,
        context: CanvasContext,
        commands: &[CanvasCommand],
    ) -> Result<(), TreeError> {
        let n = self.element_mut(node)?;
        if n.spec.tag() != Some("canvas") {
            return Err(TreeError::Unsupported(format!("{node:?} is not a canvas")));
        }
        n.canvas
            .extend(commands.iter().cloned().map(|c| (context, c)));
        Ok(())
    }

    fn add_font(
        &mut self,
        family: &str,
        source: &str,
        descriptors: &BTreeMap<String, String>,
    ) -> Result<(), TreeError> {
        self.fonts.push(FontFace {
            family: family.to_string(),
            source: source.to_string(),
            descriptors: descriptors.clone(),
        });
        Ok(())
    }

    fn set_selection(&mut self, ranges: &[SelectionRange]) -> Result<(), TreeError> {
        for r in ranges {
            self.node(r.start)?;
            self.node(r.end)?;
        }
        self.selection = ranges.to_vec();
        Ok(())
    }

    fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut VirtualDocument, tag: &str) -> NodeRef {
        doc.create_node(NodeSpec::Element {
            tag: tag.to_string(),
            svg: false,
        })
        .unwrap()
    }

    #[test]
    fn document_accepts_a_single_element_child() {
        let mut doc = VirtualDocument::new();
        let root = doc.document();
        let html = element(&mut doc, "html");
        let other = element(&mut doc, "html");
        doc.append_child(root, html).unwrap();

        let err = doc.append_child(root, other).unwrap_err();
        assert!(matches!(err, TreeError::HierarchyRequest(_)));

        let text = doc.create_node(NodeSpec::Text("x".into())).unwrap();
        assert!(doc.append_child(root, text).is_err());
    }

    #[test]
    fn insert_moves_and_rejects_cycles() {
        let mut doc = VirtualDocument::new();
        let root = doc.document();
        let html = element(&mut doc, "html");
        let body = element(&mut doc, "body");
        let a = element(&mut doc, "div");
        let b = element(&mut doc, "span");
        doc.append_child(root, html).unwrap();
        doc.append_child(html, body).unwrap();
        doc.append_child(body, a).unwrap();
        doc.append_child(body, b).unwrap();

        doc.insert_before(body, b, Some(a)).unwrap();
        assert_eq!(doc.child_nodes(body), vec![b, a]);

        assert!(doc.append_child(a, body).is_err());
        assert_eq!(doc.document_html(), "<html><body><span></span><div></div></body></html>");
    }

    #[test]
    fn inline_style_properties_update_the_attribute() {
        let mut doc = VirtualDocument::new();
        let div = element(&mut doc, "div");
        doc.set_attribute(div, "style", "color: red;").unwrap();
        doc.set_style_property(div, "top", "1px", Some("important"))
            .unwrap();
        assert_eq!(
            doc.get_attribute(div, "style").as_deref(),
            Some("color: red; top: 1px !important;")
        );
        doc.remove_style_property(div, "color").unwrap();
        doc.remove_style_property(div, "top").unwrap();
        assert_eq!(doc.get_attribute(div, "style"), None);
    }

    #[test]
    fn invalid_attribute_names_are_rejected() {
        let mut doc = VirtualDocument::new();
        let div = element(&mut doc, "div");
        assert_eq!(
            doc.set_attribute(div, "a b", "x"),
            Err(TreeError::InvalidAttribute("a b".into()))
        );
    }

    #[test]
    fn style_sheet_follows_text_until_edited() {
        let mut doc = VirtualDocument::new();
        let style = element(&mut doc, "style");
        doc.set_text_content(style, "a { color: red; }").unwrap();
        doc.apply_style_rule(
            style,
            &StyleRuleOp::Insert {
                rule: "b { top: 0; }".into(),
                index: Some(vec![1]),
            },
        )
        .unwrap();
        let sheet = doc.style_sheet(style).unwrap();
        assert_eq!(sheet.rules.len(), 2);

        doc.set_text_content(style, "i { left: 0; }").unwrap();
        assert_eq!(doc.style_sheet(style).unwrap().rules.len(), 1);
    }

    #[test]
    fn copy_preserves_structure_and_attributes() {
        let mut doc = VirtualDocument::new();
        let root = doc.document();
        let html = element(&mut doc, "html");
        doc.set_attribute(html, "lang", "en").unwrap();
        doc.append_child(root, html).unwrap();
        let text = doc.create_node(NodeSpec::Text("hi".into())).unwrap();
        doc.append_child(html, text).unwrap();

        let (copy, pairs) = VirtualDocument::copy_of(&doc);
        assert_eq!(pairs.len(), 3);
        assert_eq!(copy.document_html(), doc.document_html());
    }
}
