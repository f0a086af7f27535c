mod common;

use common::*;
use domreplay_core::api::{
    PlayerState, ReplayError, ReplayerBuilder, ReplayerConfig, ReplayerEvent, SpeedState,
    TreeTarget, VirtualDocument,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn page_with_paragraph() -> Vec<domreplay_core::api::RecordedEvent> {
    vec![
        meta(0.0),
        full_snapshot(0.0, json!([])),
        mutation(100.0, json!({ "adds": [add(10, BODY, "p")] })),
    ]
}

#[test]
fn fewer_than_two_events_is_rejected() {
    let err = ReplayerBuilder::new(vec![meta(0.0)])
        .build(VirtualDocument::new())
        .err()
        .expect("one event is not a recording");
    assert!(matches!(err, ReplayError::TooFewEvents { count: 1 }));
}

#[test]
fn first_snapshot_is_visible_before_play() {
    let mut h = Harness::new(page_with_paragraph());
    assert_eq!(h.html(BODY), "<body></body>");
    assert_eq!(h.replayer.state(), PlayerState::Paused);

    let meta = h.replayer.get_meta_data();
    assert_eq!((meta.start_time, meta.end_time, meta.total_time), (0.0, 100.0, 100.0));
    assert!(h.drain_events().contains(&ReplayerEvent::Resize {
        width: 1024.0,
        height: 768.0
    }));
}

#[test]
fn mutations_apply_on_schedule_and_playback_finishes() {
    let mut h = Harness::new(page_with_paragraph());
    h.replayer.play(0.0);
    h.run_for(50.0);
    assert_eq!(h.html(BODY), "<body></body>");

    h.run_for(60.0);
    assert_eq!(h.html(BODY), "<body><p></p></body>");
    assert_eq!(h.replayer.state(), PlayerState::Playing);

    h.run_for(100.0);
    assert_eq!(h.replayer.state(), PlayerState::Paused);
    assert!(h.drain_events().contains(&ReplayerEvent::Finish));
    assert!(!h.replayer.needs_frame());
}

#[test]
fn forward_references_resolve_within_one_batch() {
    let mut h = Harness::new(vec![
        meta(0.0),
        full_snapshot(0.0, json!([])),
        mutation(
            100.0,
            json!({ "adds": [
                { "parentId": 5, "nextId": null, "node": element(6, "span") },
                { "parentId": BODY, "nextId": null, "node": element(5, "div") }
            ] }),
        ),
    ]);
    h.replayer.pause(Some(200.0));
    assert_eq!(h.html(BODY), "<body><div><span></span></div></body>");
}

#[test]
fn removing_a_child_of_a_removed_node_is_silent() {
    let mut h = Harness::new(vec![
        meta(0.0),
        full_snapshot(0.0, json!([])),
        mutation(
            100.0,
            json!({ "adds": [add(10, BODY, "div"), add(11, 10, "span")] }),
        ),
        mutation(
            200.0,
            json!({ "removes": [
                { "parentId": BODY, "id": 10 },
                { "parentId": 10, "id": 11 }
            ] }),
        ),
    ]);
    h.replayer.pause(Some(300.0));
    assert_eq!(h.html(BODY), "<body></body>");
    assert!(!h.replayer.mirror().has(11));
    assert_eq!(h.replayer.diagnostics().warnings(), Vec::<String>::new());
}

#[test]
fn removing_a_node_and_editing_its_text_in_one_batch_is_silent() {
    let mut h = Harness::new(vec![
        meta(0.0),
        full_snapshot(
            0.0,
            json!([{ "type": 2, "id": 7, "tagName": "p", "attributes": {}, "childNodes": [
                { "type": 3, "id": 8, "textContent": "old" }
            ] }]),
        ),
        mutation(
            100.0,
            json!({
                "removes": [{ "parentId": BODY, "id": 7 }],
                "texts": [{ "id": 7, "value": "new" }, { "id": 8, "value": "new" }]
            }),
        ),
    ]);
    h.replayer.pause(Some(200.0));
    assert_eq!(h.html(BODY), "<body></body>");
    assert!(!h.replayer.mirror().has(7));
    assert_eq!(h.replayer.diagnostics().warnings(), Vec::<String>::new());
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn out_of_order_adds_resolve_to_the_same_tree_in_any_order() {
    let adds = vec![
        add(10, BODY, "div"),
        json!({ "parentId": 10, "nextId": 11, "node": element(12, "c") }),
        add(11, 10, "b"),
        add(13, 12, "d"),
    ];

    let mut seen = Vec::new();
    for order in permutations(&adds) {
        let mut h = Harness::new(vec![
            meta(0.0),
            full_snapshot(0.0, json!([])),
            mutation(100.0, json!({ "adds": order })),
        ]);
        h.replayer.pause(Some(200.0));
        assert_eq!(h.replayer.diagnostics().warnings(), Vec::<String>::new());

        let mut ids: Vec<i64> = h.replayer.mirror().ids().collect();
        ids.sort_unstable();
        seen.push((h.html(BODY), ids));
    }

    assert_eq!(seen.len(), 24);
    let expected = (
        "<body><div><c><d></d></c><b></b></div></body>".to_string(),
        vec![DOC, HTML, HEAD, BODY, 10, 11, 12, 13],
    );
    for result in &seen {
        assert_eq!(result, &expected);
    }
}

fn text_lifecycle() -> Vec<domreplay_core::api::RecordedEvent> {
    vec![
        meta(0.0),
        full_snapshot(0.0, json!([])),
        mutation(100.0, json!({ "adds": [add(10, BODY, "p")] })),
        mutation(
            200.0,
            json!({ "adds": [{ "parentId": 10, "nextId": null,
                "node": { "type": 3, "id": 11, "textContent": "hi" } }] }),
        ),
        mutation(300.0, json!({ "texts": [{ "id": 11, "value": "bye" }] })),
        mutation(400.0, json!({ "removes": [{ "parentId": BODY, "id": 10 }] })),
    ]
}

#[test]
fn pausing_on_an_event_timestamp_shows_that_event() {
    let mut h = Harness::new(page_with_paragraph());
    h.replayer.pause(Some(100.0));
    assert_eq!(h.html(BODY), "<body><p></p></body>");
    assert_eq!(h.replayer.playback().timer().delays(), Vec::<f64>::new());
}

#[test]
fn replaying_the_same_offset_schedules_the_same_actions() {
    let mut once = Harness::new(text_lifecycle());
    once.replayer.play(250.0);

    let mut twice = Harness::new(text_lifecycle());
    twice.replayer.play(250.0);
    twice.replayer.play(250.0);

    assert_eq!(once.replayer.playback().timer().delays(), vec![50.0, 150.0]);
    assert_eq!(
        once.replayer.playback().timer().delays(),
        twice.replayer.playback().timer().delays()
    );
    assert_eq!(once.html(BODY), twice.html(BODY));
}

#[test]
fn seeking_matches_real_time_playback() {
    let mut sought = Harness::new(text_lifecycle());
    sought.replayer.pause(Some(350.0));

    let mut played = Harness::new(text_lifecycle());
    played.replayer.play(0.0);
    played.run_for(350.0);

    assert_eq!(sought.html(BODY), "<body><p>bye</p></body>");
    assert_eq!(sought.html(BODY), played.html(BODY));
}

#[test]
fn seeking_backwards_rebuilds_then_forwards_continues() {
    let mut h = Harness::new(text_lifecycle());
    h.replayer.pause(Some(350.0));
    h.drain_events();

    h.replayer.pause(Some(150.0));
    assert_eq!(h.html(BODY), "<body><p></p></body>");
    let events = h.drain_events();
    assert!(events.contains(&ReplayerEvent::PlayBack));
    assert!(events.contains(&ReplayerEvent::FullsnapshotRebuilded { timestamp: 0.0 }));

    h.replayer.pause(Some(450.0));
    assert!(!h.replayer.mirror().has(10));
    assert!(h.replayer.tree().document_html().contains("<body></body>"));
}

#[test]
fn events_with_equal_timestamps_keep_recorded_order() {
    let class = |value: &str| json!({ "attributes": [{ "id": BODY, "attributes": { "class": value } }] });
    let events = vec![
        meta(0.0),
        full_snapshot(0.0, json!([])),
        mutation(100.0, class("a")),
        mutation(100.0, class("b")),
    ];

    let mut sought = Harness::new(events.clone());
    sought.replayer.pause(Some(200.0));
    assert_eq!(sought.html(BODY), "<body class=\"b\"></body>");

    let mut played = Harness::new(events);
    played.replayer.play(0.0);
    played.run_for(120.0);
    assert_eq!(played.html(BODY), "<body class=\"b\"></body>");
}

#[test]
fn legacy_anchored_nodes_wait_for_their_sibling() {
    let mut h = Harness::new(vec![
        meta(0.0),
        full_snapshot(0.0, json!([])),
        mutation(
            100.0,
            json!({ "adds": [{ "parentId": BODY, "previousId": -1, "nextId": null,
                "node": element(10, "p") }] }),
        ),
        mutation(
            200.0,
            json!({ "adds": [{ "parentId": BODY, "nextId": 10, "node": element(11, "span") }] }),
        ),
    ]);
    h.replayer.pause(Some(150.0));
    assert_eq!(h.replayer.pending_legacy_nodes(), 1);
    assert_eq!(h.html(BODY), "<body></body>");

    h.replayer.pause(Some(250.0));
    assert_eq!(h.replayer.pending_legacy_nodes(), 0);
    assert_eq!(h.html(BODY), "<body><span></span><p></p></body>");
}

#[test]
fn seeking_applies_only_the_last_scroll_and_input() {
    let mut h = Harness::new(vec![
        meta(0.0),
        full_snapshot(0.0, json!([element(10, "div"), element(11, "input")])),
        scroll(100.0, 10, 50.0),
        input(150.0, 11, "a"),
        scroll(200.0, 10, 80.0),
        input(250.0, 11, "ab"),
    ]);
    h.replayer.pause(Some(300.0));

    let div = h.replayer.mirror().get_node(10).expect("div");
    let field = h.replayer.mirror().get_node(11).expect("input");
    assert_eq!(h.replayer.tree().scroll_position(div), Some((0.0, 80.0)));
    assert_eq!(h.replayer.tree().input_value(field), Some("ab"));
}

#[test]
fn skip_inactive_fast_forwards_to_the_next_interaction() {
    let config = ReplayerConfig {
        skip_inactive: true,
        ..ReplayerConfig::default()
    };
    let mut h = Harness::with_config(
        vec![
            meta(0.0),
            full_snapshot(0.0, json!([])),
            click(1_000.0, BODY),
            click(61_000.0, BODY),
        ],
        config,
    );
    h.replayer.play(0.0);
    h.run_for(1_010.0);
    assert_eq!(h.replayer.speed_state(), SpeedState::Skipping);
    let events = h.drain_events();
    assert!(events.contains(&ReplayerEvent::SkipStart { speed: 12.0 }));
    assert!(events.contains(&ReplayerEvent::MouseInteraction {
        kind: "click".into(),
        target: BODY
    }));

    h.run_for(5_000.0);
    assert_eq!(h.replayer.speed_state(), SpeedState::Normal);
    assert!(h.drain_events().contains(&ReplayerEvent::SkipEnd { speed: 1.0 }));
    assert_eq!(h.replayer.mouse().clicks, 2);
}

#[test]
fn finish_is_rechecked_when_events_arrive_during_the_buffer() {
    let mut h = Harness::new(vec![meta(0.0), full_snapshot(0.0, json!([])), custom(100.0, "a")]);
    h.replayer.play(0.0);
    h.run_for(112.0);
    h.replayer.add_event(custom(10_000.0, "late"));

    h.run_for(100.0);
    assert_eq!(h.replayer.state(), PlayerState::Playing);
    assert!(!h.drain_events().contains(&ReplayerEvent::Finish));

    h.run_for(10_000.0);
    assert_eq!(h.replayer.state(), PlayerState::Paused);
    let events = h.drain_events();
    assert!(events.contains(&ReplayerEvent::Finish));
    assert!(events.contains(&ReplayerEvent::CustomEvent {
        tag: "late".into(),
        payload: json!({})
    }));
}

#[test]
fn pausing_past_the_end_does_not_report_finish() {
    let mut h = Harness::new(vec![meta(0.0), full_snapshot(0.0, json!([])), custom(100.0, "a")]);
    h.replayer.pause(Some(500.0));
    h.run_for(200.0);

    assert_eq!(h.replayer.state(), PlayerState::Paused);
    assert!(!h.drain_events().contains(&ReplayerEvent::Finish));
    assert!(!h.replayer.needs_frame());
}

#[test]
fn paused_marker_follows_player_state() {
    let mut h = Harness::new(page_with_paragraph());
    let html = h.replayer.mirror().get_node(HTML).expect("html");
    h.replayer.pause(None);
    assert_eq!(
        h.replayer.tree().get_attribute(html, "class").as_deref(),
        Some("rrweb-paused")
    );
    h.replayer.play(0.0);
    assert_eq!(h.replayer.tree().get_attribute(html, "class"), None);
}
