//! Replays recorded console output as log lines.

use domreplay_core::api::{EventData, Mirror, RecordedEvent, ReplayPlugin, TreeTarget};
use serde_json::Value;

pub const CONSOLE_PLUGIN_NAME: &str = "rrweb/console@1";

/// Logs console plugin events cast in real time. Events replayed while
/// seeking are skipped so a seek does not flood the output.
#[derive(Debug, Default)]
pub struct ConsoleLogPlugin {
    replayed: usize,
}

impl ConsoleLogPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replayed(&self) -> usize {
        self.replayed
    }
}

fn render_args(payload: &Value) -> String {
    match payload.get("payload") {
        Some(Value::Array(args)) => args
            .iter()
            .map(|a| match a {
                Value::String(s) => s.trim_matches('"').to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

impl ReplayPlugin for ConsoleLogPlugin {
    fn name(&self) -> &str {
        "console-log"
    }

    fn handler(
        &mut self,
        event: &RecordedEvent,
        is_sync: bool,
        _tree: &mut dyn TreeTarget,
        _mirror: &Mirror,
    ) {
        let EventData::Plugin(data) = &event.data else {
            return;
        };
        if data.plugin != CONSOLE_PLUGIN_NAME || is_sync {
            return;
        }
        let level = data
            .payload
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or("log");
        let line = render_args(&data.payload);
        match level {
            "error" | "assert" => tracing::error!(target: "domreplay::console", "{line}"),
            "warn" => tracing::warn!(target: "domreplay::console", "{line}"),
            "debug" | "trace" => tracing::debug!(target: "domreplay::console", "{line}"),
            _ => tracing::info!(target: "domreplay::console", level, "{line}"),
        }
        self.replayed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domreplay_core::api::{decode_event, VirtualDocument};
    use serde_json::json;

    fn console_event(level: &str) -> RecordedEvent {
        decode_event(json!({
            "type": 6,
            "timestamp": 5,
            "data": {
                "plugin": CONSOLE_PLUGIN_NAME,
                "payload": { "level": level, "payload": ["\"hello\"", "2"], "trace": [] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn only_real_time_console_events_are_replayed() {
        let mut plugin = ConsoleLogPlugin::new();
        let mut doc = VirtualDocument::new();
        let mirror = Mirror::new();
        plugin.handler(&console_event("warn"), false, &mut doc, &mirror);
        plugin.handler(&console_event("log"), true, &mut doc, &mirror);
        assert_eq!(plugin.replayed(), 1);
    }

    #[test]
    fn arguments_are_joined_without_json_quotes() {
        let payload = json!({ "payload": ["\"a\"", "{\"b\":1}"] });
        assert_eq!(render_args(&payload), "a {\"b\":1}");
    }
}
