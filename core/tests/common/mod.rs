#![allow(dead_code)]

use std::rc::Rc;

use domreplay_core::api::{
    decode_event, Clock, ManualClock, RecordedEvent, Replayer, ReplayerBuilder, ReplayerConfig,
    ReplayerEvent, VirtualDocument,
};
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Ids of the skeleton page used by [`full_snapshot`].
pub const DOC: i64 = 1;
pub const HTML: i64 = 2;
pub const HEAD: i64 = 3;
pub const BODY: i64 = 4;

pub fn event(value: Value) -> RecordedEvent {
    decode_event(value).expect("valid event")
}

pub fn meta(ts: f64) -> RecordedEvent {
    event(json!({
        "type": 4,
        "timestamp": ts,
        "data": { "href": "https://example.test/", "width": 1024, "height": 768 }
    }))
}

/// Document with an empty `head` and `body` holding `body_children`.
pub fn full_snapshot(ts: f64, body_children: Value) -> RecordedEvent {
    event(json!({
        "type": 2,
        "timestamp": ts,
        "data": {
            "node": {
                "type": 0, "id": DOC, "childNodes": [{
                    "type": 2, "id": HTML, "tagName": "html", "attributes": {}, "childNodes": [
                        { "type": 2, "id": HEAD, "tagName": "head", "attributes": {}, "childNodes": [] },
                        { "type": 2, "id": BODY, "tagName": "body", "attributes": {}, "childNodes": body_children }
                    ]
                }]
            },
            "initialOffset": { "top": 0, "left": 0 }
        }
    }))
}

pub fn element(id: i64, tag: &str) -> Value {
    json!({ "type": 2, "id": id, "tagName": tag, "attributes": {}, "childNodes": [] })
}

pub fn incremental(ts: f64, source: u8, mut data: Value) -> RecordedEvent {
    data["source"] = json!(source);
    event(json!({ "type": 3, "timestamp": ts, "data": data }))
}

pub fn mutation(ts: f64, data: Value) -> RecordedEvent {
    incremental(ts, 0, data)
}

/// Add of an empty element appended to `parent`.
pub fn add(id: i64, parent: i64, tag: &str) -> Value {
    json!({ "parentId": parent, "nextId": null, "node": element(id, tag) })
}

pub fn click(ts: f64, id: i64) -> RecordedEvent {
    incremental(ts, 2, json!({ "type": 2, "id": id, "x": 10, "y": 20 }))
}

pub fn scroll(ts: f64, id: i64, y: f64) -> RecordedEvent {
    incremental(ts, 3, json!({ "id": id, "x": 0, "y": y }))
}

pub fn input(ts: f64, id: i64, text: &str) -> RecordedEvent {
    incremental(ts, 5, json!({ "id": id, "text": text, "isChecked": false }))
}

pub fn custom(ts: f64, tag: &str) -> RecordedEvent {
    event(json!({ "type": 5, "timestamp": ts, "data": { "tag": tag, "payload": {} } }))
}

pub struct Harness {
    pub replayer: Replayer<VirtualDocument>,
    pub clock: ManualClock,
    pub events: broadcast::Receiver<ReplayerEvent>,
}

impl Harness {
    pub fn new(events: Vec<RecordedEvent>) -> Self {
        Self::with_config(events, ReplayerConfig::default())
    }

    pub fn with_config(events: Vec<RecordedEvent>, config: ReplayerConfig) -> Self {
        Self::from_builder(ReplayerBuilder::new(events).config(config))
    }

    pub fn from_builder(builder: ReplayerBuilder) -> Self {
        let clock = ManualClock::new(0.0);
        let replayer = builder
            .clock(Rc::new(clock.clone()) as Rc<dyn Clock>)
            .build(VirtualDocument::new())
            .expect("replayer builds");
        let events = replayer.subscribe();
        Self {
            replayer,
            clock,
            events,
        }
    }

    /// Advances the clock in frame-sized steps, ticking after each.
    pub fn run_for(&mut self, ms: f64) {
        let mut left = ms;
        while left > 0.0 {
            let step = left.min(16.0);
            self.clock.advance(step);
            self.replayer.tick();
            left -= step;
        }
    }

    pub fn html(&self, id: i64) -> String {
        let node = self.replayer.mirror().get_node(id).expect("node is mirrored");
        self.replayer.tree().outer_html(node)
    }

    pub fn drain_events(&mut self) -> Vec<ReplayerEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }
}
