mod common;

use common::*;
use domreplay_core::api::{PlayerState, ReplayerConfig, ReplayerEvent};
use pretty_assertions::assert_eq;
use serde_json::json;

fn live_harness() -> Harness {
    let config = ReplayerConfig {
        live_mode: true,
        ..ReplayerConfig::default()
    };
    Harness::with_config(Vec::new(), config)
}

#[test]
fn live_mode_accepts_an_empty_recording() {
    let h = live_harness();
    assert_eq!(h.replayer.state(), PlayerState::Paused);
    assert!(h.replayer.mirror().is_empty());
}

#[test]
fn late_events_are_cast_immediately_and_future_ones_on_schedule() {
    let mut h = live_harness();
    h.replayer.start_live(Some(1_000.0));
    assert_eq!(h.replayer.state(), PlayerState::Live);

    h.replayer.add_event(meta(900.0));
    h.replayer.add_event(full_snapshot(950.0, json!([])));
    assert_eq!(h.html(BODY), "<body></body>");

    h.replayer.add_event(mutation(1_100.0, json!({ "adds": [add(10, BODY, "p")] })));
    assert_eq!(h.html(BODY), "<body></body>");
    h.run_for(112.0);
    assert_eq!(h.html(BODY), "<body><p></p></body>");

    // Live playback never finishes on its own.
    h.run_for(500.0);
    assert_eq!(h.replayer.state(), PlayerState::Live);
    assert!(h.replayer.needs_frame());
    assert!(!h.drain_events().contains(&ReplayerEvent::Finish));
}

#[test]
fn play_is_ignored_while_live() {
    let mut h = live_harness();
    h.replayer.start_live(Some(0.0));
    h.replayer.play(0.0);
    assert_eq!(h.replayer.state(), PlayerState::Live);
}

#[test]
fn raw_events_go_through_the_unpacker() {
    let mut h = live_harness();
    h.replayer.start_live(Some(1_000.0));
    h.replayer
        .add_raw_event(&json!({ "type": 5, "timestamp": 10, "data": { "tag": "hello" } }))
        .expect("decodes");
    assert!(h.drain_events().contains(&ReplayerEvent::CustomEvent {
        tag: "hello".into(),
        payload: serde_json::Value::Null
    }));
    assert!(h.replayer.add_raw_event(&json!({ "type": 42 })).is_err());
}

#[test]
fn going_live_while_playing_pauses_first() {
    let mut h = Harness::new(vec![
        meta(0.0),
        full_snapshot(0.0, json!([])),
        mutation(100.0, json!({ "adds": [add(10, BODY, "p")] })),
    ]);
    h.replayer.play(0.0);
    h.run_for(16.0);
    assert_eq!(h.replayer.state(), PlayerState::Playing);
    assert!(!h.replayer.config().live_mode);

    h.replayer.start_live(Some(1_000.0));
    assert_eq!(h.replayer.state(), PlayerState::Live);
    assert!(h.replayer.config().live_mode);

    h.run_for(500.0);
    assert_eq!(h.replayer.state(), PlayerState::Live);
    assert!(!h.drain_events().contains(&ReplayerEvent::Finish));
}
