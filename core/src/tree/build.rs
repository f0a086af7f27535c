//! Materialises serialized nodes on a tree target.

use super::{MediaAction, MediaCommand, NodeRef, NodeSpec, TreeError, TreeTarget};
use crate::diagnostics::Diagnostics;
use crate::event::{AttributeLiteral, NodeId, SerializedNode, SerializedNodeKind};
use crate::mirror::Mirror;

/// Callbacks run for every node created from a snapshot or a mutation.
pub trait BuildHooks {
    fn on_build(&mut self, tree: &mut dyn TreeTarget, node: NodeRef, id: NodeId);

    /// Called after a mutation set `name` on an existing node.
    fn on_attribute(
        &mut self,
        _tree: &mut dyn TreeTarget,
        _node: NodeRef,
        _id: NodeId,
        _name: &str,
    ) {
    }
}

pub struct NoopBuildHooks;

impl BuildHooks for NoopBuildHooks {
    fn on_build(&mut self, _tree: &mut dyn TreeTarget, _node: NodeRef, _id: NodeId) {}
}

fn spec_of(sn: &SerializedNode) -> NodeSpec {
    match &sn.kind {
        SerializedNodeKind::Document { .. } => NodeSpec::Document,
        SerializedNodeKind::DocumentType {
            name,
            public_id,
            system_id,
        } => NodeSpec::DocumentType {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        SerializedNodeKind::Element {
            tag_name,
            is_svg,
            attributes,
            ..
        } => NodeSpec::Element {
            // Inlined stylesheet links are replayed as style elements.
            tag: if tag_name == "link" && attributes.contains_key("_cssText") {
                "style".to_string()
            } else {
                tag_name.clone()
            },
            svg: *is_svg,
        },
        SerializedNodeKind::Text { text_content, .. } => NodeSpec::Text(text_content.clone()),
        SerializedNodeKind::CData => NodeSpec::CData(String::new()),
        SerializedNodeKind::Comment { text_content } => NodeSpec::Comment(text_content.clone()),
    }
}

/// Creates one node without its children.
///
/// Attribute failures are reported and skipped; only node creation itself can
/// fail.
pub fn build_node(
    tree: &mut dyn TreeTarget,
    sn: &SerializedNode,
    diag: &Diagnostics,
) -> Result<NodeRef, TreeError> {
    let node = tree.create_node(spec_of(sn))?;
    if let SerializedNodeKind::Element {
        tag_name,
        attributes,
        need_block,
        ..
    } = &sn.kind
    {
        let mut media = MediaCommand::default();
        let mut scroll = (None, None);
        for (name, literal) in attributes {
            let Some(value) = literal.as_attribute_value() else {
                continue;
            };
            let applied = match name.as_str() {
                "_cssText" if tag_name == "style" || tag_name == "link" => {
                    tree.set_text_content(node, &value)
                }
                "value" if tag_name == "textarea" => tree
                    .create_node(NodeSpec::Text(value.clone()))
                    .and_then(|t| tree.append_child(node, t)),
                "rr_width" if *need_block => tree.set_style_property(node, "width", &value, None),
                "rr_height" if *need_block => {
                    tree.set_style_property(node, "height", &value, None)
                }
                "rr_scrollLeft" => {
                    scroll.0 = number(literal);
                    Ok(())
                }
                "rr_scrollTop" => {
                    scroll.1 = number(literal);
                    Ok(())
                }
                "rr_mediaState" => {
                    media.action = Some(if value == "played" {
                        MediaAction::Play
                    } else {
                        MediaAction::Pause
                    });
                    Ok(())
                }
                "rr_mediaCurrentTime" => {
                    media.current_time = number(literal);
                    Ok(())
                }
                "rr_mediaPlaybackRate" => {
                    media.playback_rate = number(literal);
                    Ok(())
                }
                "rr_mediaMuted" => {
                    media.muted = Some(matches!(literal, AttributeLiteral::Flag(true)));
                    Ok(())
                }
                "rr_mediaLoop" => {
                    media.looping = Some(matches!(literal, AttributeLiteral::Flag(true)));
                    Ok(())
                }
                "rr_mediaVolume" => {
                    media.volume = number(literal);
                    Ok(())
                }
                n if n.starts_with("rr_") => Ok(()),
                _ => tree.set_attribute(node, name, &value),
            };
            if let Err(e) = applied {
                diag.warn(format!("attribute {name} on node {}: {e}", sn.id));
            }
        }
        if media != MediaCommand::default() {
            if let Err(e) = tree.apply_media(node, &media) {
                diag.debug(format!("media state on node {}: {e}", sn.id));
            }
        }
        if scroll.0.is_some() || scroll.1.is_some() {
            let (x, y) = (scroll.0.unwrap_or(0.0), scroll.1.unwrap_or(0.0));
            if let Err(e) = tree.scroll_to(node, x, y, false) {
                diag.debug(format!("scroll state on node {}: {e}", sn.id));
            }
        }
    }
    Ok(node)
}

fn number(literal: &AttributeLiteral) -> Option<f64> {
    match literal {
        AttributeLiteral::Number(n) => Some(*n),
        AttributeLiteral::Text(s) => s.parse().ok(),
        _ => None,
    }
}

/// Replaces the whole document with `snapshot`, registering every node.
///
/// Nodes that can not be created or attached are skipped with their subtree.
pub fn rebuild(
    tree: &mut dyn TreeTarget,
    snapshot: &SerializedNode,
    mirror: &mut Mirror,
    hooks: &mut dyn BuildHooks,
    diag: &Diagnostics,
) -> NodeRef {
    let doc = tree.reset_document();
    let mut stack: Vec<(NodeRef, &SerializedNode)> = Vec::new();
    if snapshot.is_document() {
        mirror.add(doc, snapshot.id);
        hooks.on_build(tree, doc, snapshot.id);
        stack.extend(snapshot.child_nodes.iter().rev().map(|c| (doc, c)));
    } else {
        stack.push((doc, snapshot));
    }

    while let Some((parent, sn)) = stack.pop() {
        let node = match build_node(tree, sn, diag) {
            Ok(node) => node,
            Err(e) => {
                diag.warn(format!("failed to build node {}: {e}", sn.id));
                continue;
            }
        };
        if let Err(e) = tree.append_child(parent, node) {
            diag.warn(format!("failed to attach node {}: {e}", sn.id));
            continue;
        }
        mirror.add(node, sn.id);
        hooks.on_build(tree, node, sn.id);
        stack.extend(sn.child_nodes.iter().rev().map(|c| (node, c)));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::VirtualDocument;

    fn page() -> SerializedNode {
        SerializedNode::document(1).with_children(vec![
            SerializedNode::doctype(2, "html"),
            SerializedNode::element(3, "html").with_children(vec![
                SerializedNode::element(4, "head").with_children(vec![SerializedNode::element(
                    5, "style",
                )
                .with_attr("_cssText", "a { color: red; }")]),
                SerializedNode::element(6, "body").with_children(vec![
                    SerializedNode::element(7, "textarea").with_attr("value", "hi"),
                    SerializedNode::element(8, "p")
                        .with_attr("class", "x")
                        .with_children(vec![SerializedNode::text(9, "text")]),
                ]),
            ]),
        ])
    }

    #[test]
    fn rebuild_registers_every_node() {
        let mut doc = VirtualDocument::new();
        let mut mirror = Mirror::new();
        let diag = Diagnostics::default();
        rebuild(&mut doc, &page(), &mut mirror, &mut NoopBuildHooks, &diag);

        assert_eq!(mirror.len(), 9);
        assert_eq!(
            doc.document_html(),
            "<!DOCTYPE html><html><head><style>a { color: red; }</style></head>\
             <body><textarea>hi</textarea><p class=\"x\">text</p></body></html>"
        );
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn media_and_scroll_state_are_restored() {
        let mut doc = VirtualDocument::new();
        let video = SerializedNode::element(3, "video")
            .with_attr("rr_mediaState", "played")
            .with_attr("rr_mediaCurrentTime", "12.5")
            .with_attr("src", "a.mp4");
        let node = build_node(&mut doc, &video, &Diagnostics::default()).unwrap();
        let media = doc.media_state(node).unwrap();
        assert!(!media.paused);
        assert_eq!(media.current_time, 12.5);
        assert_eq!(doc.get_attribute(node, "rr_mediaState"), None);
        assert_eq!(doc.get_attribute(node, "src").as_deref(), Some("a.mp4"));
    }
}
