//! Replace-style tree diff.
//!
//! Rather than computing a minimal edit script, the live document is rebuilt
//! node by node from the virtual tree. Ids are carried over through the two
//! mirrors. State a tree target only exposes through setters (scroll
//! offsets, media state, rule edits on style sheets) is not copied.

use domreplay_core::api::{BuildHooks, Mirror, NodeRef, TreeDiff, TreeError, TreeTarget};

#[derive(Debug, Default, Clone, Copy)]
pub struct ReplaceDiff;

impl TreeDiff for ReplaceDiff {
    fn diff(
        &mut self,
        live: &mut dyn TreeTarget,
        mirror: &mut Mirror,
        virtual_tree: &dyn TreeTarget,
        virtual_mirror: &Mirror,
        hooks: &mut dyn BuildHooks,
    ) -> Result<(), TreeError> {
        mirror.reset();
        let root = live.reset_document();
        let virtual_root = virtual_tree.document();
        if let Some(id) = virtual_mirror.get_id(virtual_root) {
            mirror.add(root, id);
            hooks.on_build(live, root, id);
        }

        let mut stack: Vec<(NodeRef, NodeRef)> = virtual_tree
            .child_nodes(virtual_root)
            .into_iter()
            .rev()
            .map(|c| (root, c))
            .collect();
        let mut copied = 0usize;
        while let Some((parent, source)) = stack.pop() {
            let Some(spec) = virtual_tree.describe(source) else {
                continue;
            };
            let node = live.create_node(spec)?;
            for (name, value) in virtual_tree.attributes(source) {
                live.set_attribute(node, &name, &value)?;
            }
            live.append_child(parent, node)?;
            if let Some(id) = virtual_mirror.get_id(source) {
                mirror.add(node, id);
                hooks.on_build(live, node, id);
            }
            copied += 1;
            stack.extend(
                virtual_tree
                    .child_nodes(source)
                    .into_iter()
                    .rev()
                    .map(|c| (node, c)),
            );
        }
        tracing::debug!(target: "domreplay", nodes = copied, "replaced live tree");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domreplay_core::api::{NodeSpec, VirtualDocument};
    use domreplay_core::tree::NoopBuildHooks;
    use pretty_assertions::assert_eq;

    fn element(doc: &mut VirtualDocument, tag: &str) -> NodeRef {
        doc.create_node(NodeSpec::Element {
            tag: tag.into(),
            svg: false,
        })
        .unwrap()
    }

    #[test]
    fn live_tree_and_ids_follow_the_virtual_tree() {
        let mut shadow = VirtualDocument::new();
        let mut shadow_mirror = Mirror::new();
        let root = shadow.document();
        shadow_mirror.add(root, 1);
        let html = element(&mut shadow, "html");
        shadow.append_child(root, html).unwrap();
        shadow_mirror.add(html, 2);
        let body = element(&mut shadow, "body");
        shadow.set_attribute(body, "class", "x").unwrap();
        shadow.append_child(html, body).unwrap();
        shadow_mirror.add(body, 3);
        let text = shadow.create_node(NodeSpec::Text("hi".into())).unwrap();
        shadow.append_child(body, text).unwrap();
        shadow_mirror.add(text, 4);

        let mut live = VirtualDocument::new();
        let mut live_mirror = Mirror::new();
        live_mirror.add(live.document(), 99);
        ReplaceDiff
            .diff(
                &mut live,
                &mut live_mirror,
                &shadow,
                &shadow_mirror,
                &mut NoopBuildHooks,
            )
            .unwrap();

        assert_eq!(live.document_html(), shadow.document_html());
        assert!(!live_mirror.has(99));
        let live_body = live_mirror.get_node(3).unwrap();
        assert_eq!(live.outer_html(live_body), "<body class=\"x\">hi</body>");
        assert_eq!(live_mirror.len(), 4);
    }
}
