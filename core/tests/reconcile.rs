use std::cell::Cell;

use domreplay_core::clock::Clock;
use domreplay_core::diagnostics::Diagnostics;
use domreplay_core::event::{MutationData, SerializedNode};
use domreplay_core::mirror::Mirror;
use domreplay_core::reconcile::{LegacyMissingNodes, ReconcileOptions, Reconciler};
use domreplay_core::tree::{rebuild, NoopBuildHooks, VirtualDocument};
use serde_json::json;

/// Moves forward a full second on every reading.
struct SteppingClock(Cell<f64>);

impl Clock for SteppingClock {
    fn now(&self) -> f64 {
        let t = self.0.get() + 1_000.0;
        self.0.set(t);
        t
    }
}

#[test]
fn retry_budget_bounds_the_queue_drain() {
    let diag = Diagnostics::default();
    let mut doc = VirtualDocument::new();
    let mut mirror = Mirror::new();
    let snapshot = SerializedNode::document(1).with_children(vec![SerializedNode::element(
        2, "html",
    )
    .with_children(vec![SerializedNode::element(3, "body")])]);
    rebuild(&mut doc, &snapshot, &mut mirror, &mut NoopBuildHooks, &diag);

    let data: MutationData = serde_json::from_value(json!({
        "adds": [
            { "parentId": 20, "nextId": null, "node": { "type": 2, "id": 21, "tagName": "span" } },
            { "parentId": 3, "nextId": null, "node": { "type": 2, "id": 20, "tagName": "div" } }
        ]
    }))
    .unwrap();

    let mut legacy = LegacyMissingNodes::new();
    let clock = SteppingClock(Cell::new(0.0));
    let report = Reconciler {
        tree: &mut doc,
        mirror: &mut mirror,
        legacy: &mut legacy,
        hooks: &mut NoopBuildHooks,
        diag: &diag,
        clock: &clock,
        options: ReconcileOptions::default(),
    }
    .apply(&data);

    assert!(report.timed_out);
    assert_eq!(report.dropped, 1);
    assert!(report.warnings[0].starts_with("timeout while resolving queued nodes"));
    assert!(mirror.has(20));
    assert!(!mirror.has(21));
    assert_eq!(doc.outer_html(mirror.get_node(3).unwrap()), "<body><div></div></body>");
}
