use serde::{Deserialize, Serialize};

use crate::event::IncrementalSource;
use crate::reconcile::ReconcileOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub player: ReplayerConfig,

    #[serde(default)]
    pub codec: CodecConfig,

    #[serde(default)]
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "domreplay=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Json,
    /// Base64 wrapped JSON strings.
    Packed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodecConfig {
    #[serde(default)]
    pub kind: CodecKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetProvider {
    #[default]
    BlobStore,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default)]
    pub provider: AssetProvider,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            provider: AssetProvider::default(),
            http_timeout_ms: default_http_timeout_ms(),
        }
    }
}

/// Inactivity skipping tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipInactiveConfig {
    /// Gap to the next interaction, at current speed, that triggers skipping.
    #[serde(default = "default_inactive_threshold_ms")]
    pub threshold_ms: f64,
    /// Wall-clock time the skipped gap is compressed to.
    #[serde(default = "default_inactive_interval_ms")]
    pub interval_ms: f64,
    #[serde(default = "IncrementalSource::default_interactions")]
    pub interaction_sources: Vec<IncrementalSource>,
}

fn default_inactive_threshold_ms() -> f64 {
    10_000.0
}

fn default_inactive_interval_ms() -> f64 {
    5_000.0
}

impl Default for SkipInactiveConfig {
    fn default() -> Self {
        Self {
            threshold_ms: default_inactive_threshold_ms(),
            interval_ms: default_inactive_interval_ms(),
            interaction_sources: IncrementalSource::default_interactions(),
        }
    }
}

impl SkipInactiveConfig {
    pub fn is_interaction(&self, source: IncrementalSource) -> bool {
        self.interaction_sources.contains(&source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseTailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tail_duration_ms")]
    pub duration_ms: f64,
    #[serde(default = "default_tail_line_cap")]
    pub line_cap: String,
    #[serde(default = "default_tail_line_width")]
    pub line_width: f64,
    #[serde(default = "default_tail_stroke_style")]
    pub stroke_style: String,
}

fn default_tail_duration_ms() -> f64 {
    500.0
}

fn default_tail_line_cap() -> String {
    "round".to_string()
}

fn default_tail_line_width() -> f64 {
    3.0
}

fn default_tail_stroke_style() -> String {
    "red".to_string()
}

impl Default for MouseTailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: default_tail_duration_ms(),
            line_cap: default_tail_line_cap(),
            line_width: default_tail_line_width(),
            stroke_style: default_tail_stroke_style(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayerConfig {
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    /// Upper bound on waiting for stylesheets after a rebuild; 0 disables the wait.
    #[serde(default)]
    pub load_timeout_ms: u64,
    #[serde(default)]
    pub skip_inactive: bool,
    #[serde(default)]
    pub inactivity: SkipInactiveConfig,
    #[serde(default = "default_true")]
    pub show_warning: bool,
    #[serde(default)]
    pub show_debug: bool,
    #[serde(default = "default_block_class")]
    pub block_class: String,
    #[serde(default = "default_ignore_class")]
    pub ignore_class: String,
    #[serde(default)]
    pub live_mode: bool,
    #[serde(default = "default_true")]
    pub trigger_focus: bool,
    #[serde(default)]
    pub insert_style_rules: Vec<String>,
    #[serde(default)]
    pub mouse_tail: MouseTailConfig,
    #[serde(default)]
    pub replay_canvas: bool,
    #[serde(default)]
    pub use_virtual_dom: bool,
    #[serde(default = "default_retry_budget_ms")]
    pub retry_budget_ms: f64,
    #[serde(default = "default_legacy_retry_batches")]
    pub legacy_retry_batches: u32,
    #[serde(default)]
    pub hide_uncached_assets: bool,
    /// Grace period before the finish notification after the last event.
    #[serde(default = "default_finish_buffer_ms")]
    pub finish_buffer_ms: f64,
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    #[serde(default = "default_diagnostic_capacity")]
    pub diagnostic_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_speed() -> f64 {
    1.0
}

fn default_max_speed() -> f64 {
    360.0
}

fn default_block_class() -> String {
    "rr-block".to_string()
}

fn default_ignore_class() -> String {
    "rr-ignore".to_string()
}

fn default_retry_budget_ms() -> f64 {
    500.0
}

fn default_legacy_retry_batches() -> u32 {
    64
}

fn default_finish_buffer_ms() -> f64 {
    50.0
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_diagnostic_capacity() -> usize {
    256
}

impl Default for ReplayerConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            max_speed: default_max_speed(),
            load_timeout_ms: 0,
            skip_inactive: false,
            inactivity: SkipInactiveConfig::default(),
            show_warning: true,
            show_debug: false,
            block_class: default_block_class(),
            ignore_class: default_ignore_class(),
            live_mode: false,
            trigger_focus: true,
            insert_style_rules: Vec::new(),
            mouse_tail: MouseTailConfig::default(),
            replay_canvas: false,
            use_virtual_dom: false,
            retry_budget_ms: default_retry_budget_ms(),
            legacy_retry_batches: default_legacy_retry_batches(),
            hide_uncached_assets: false,
            finish_buffer_ms: default_finish_buffer_ms(),
            event_channel_capacity: default_event_channel_capacity(),
            diagnostic_capacity: default_diagnostic_capacity(),
        }
    }
}

impl ReplayerConfig {
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            retry_budget_ms: self.retry_budget_ms,
            legacy_retry_batches: self.legacy_retry_batches,
        }
    }
}

/// Partial update for a running replayer. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayerConfigPatch {
    pub speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub load_timeout_ms: Option<u64>,
    pub skip_inactive: Option<bool>,
    pub inactivity: Option<SkipInactiveConfig>,
    pub show_warning: Option<bool>,
    pub show_debug: Option<bool>,
    pub block_class: Option<String>,
    pub ignore_class: Option<String>,
    pub live_mode: Option<bool>,
    pub trigger_focus: Option<bool>,
    pub insert_style_rules: Option<Vec<String>>,
    pub mouse_tail: Option<MouseTailConfig>,
    pub replay_canvas: Option<bool>,
    pub use_virtual_dom: Option<bool>,
    pub retry_budget_ms: Option<f64>,
    pub legacy_retry_batches: Option<u32>,
    pub hide_uncached_assets: Option<bool>,
    pub finish_buffer_ms: Option<f64>,
}

macro_rules! merge_fields {
    ($patch:expr, $cfg:expr, $($field:ident),+ $(,)?) => {
        $(if let Some(v) = $patch.$field.clone() {
            $cfg.$field = v;
        })+
    };
}

impl ReplayerConfigPatch {
    pub fn speed(speed: f64) -> Self {
        Self {
            speed: Some(speed),
            ..Default::default()
        }
    }

    pub fn merge_into(&self, cfg: &mut ReplayerConfig) {
        merge_fields!(
            self,
            cfg,
            speed,
            max_speed,
            load_timeout_ms,
            skip_inactive,
            inactivity,
            show_warning,
            show_debug,
            block_class,
            ignore_class,
            live_mode,
            trigger_focus,
            insert_style_rules,
            mouse_tail,
            replay_canvas,
            use_virtual_dom,
            retry_budget_ms,
            legacy_retry_batches,
            hide_uncached_assets,
            finish_buffer_ms,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.player, ReplayerConfig::default());
        assert_eq!(cfg.player.max_speed, 360.0);
        assert_eq!(cfg.codec.kind, CodecKind::Json);
        assert_eq!(cfg.assets.provider, AssetProvider::BlobStore);
    }

    #[test]
    fn interaction_sources_parse_by_name() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [player]
            skip_inactive = true

            [player.inactivity]
            interaction_sources = ["mouse_interaction", "input"]
            "#,
        )
        .unwrap();
        assert!(cfg.player.skip_inactive);
        assert!(cfg.player.inactivity.is_interaction(IncrementalSource::Input));
        assert!(!cfg.player.inactivity.is_interaction(IncrementalSource::MouseMove));
        assert_eq!(cfg.player.inactivity.threshold_ms, 10_000.0);
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut cfg = ReplayerConfig::default();
        ReplayerConfigPatch {
            speed: Some(4.0),
            block_class: Some("blocked".into()),
            ..Default::default()
        }
        .merge_into(&mut cfg);
        assert_eq!(cfg.speed, 4.0);
        assert_eq!(cfg.block_class, "blocked");
        assert_eq!(cfg.ignore_class, "rr-ignore");
    }
}
