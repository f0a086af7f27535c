//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `domreplay_core::api` instead of reaching into internal modules.

pub use crate::assets::{
    apply_rewrite, AssetManager, AssetResolver, AssetStatus, AttributeRewrite, InlineResolver,
};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{
    apply_env_overrides, get_data_dir, load_default, load_from_path, AppConfig, AssetProvider,
    AssetsConfig, CodecConfig, CodecKind, LoggingConfig, MouseTailConfig, ReplayerConfig,
    ReplayerConfigPatch, SkipInactiveConfig,
};
pub use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
pub use crate::error::{AssetError, ReplayError};
pub use crate::event::wire::{decode_event, decode_event_str, decode_recording};
pub use crate::event::{AssetData, EventData, EventType, IncrementalSource, NodeId, RecordedEvent};
pub use crate::machine::{PlayerState, SpeedState};
pub use crate::mirror::Mirror;
pub use crate::plugin::{PassthroughUnpacker, ReplayPlugin, TreeDiff, Unpacker};
pub use crate::replayer::{
    MouseState, PlayerMetaData, Replayer, ReplayerBuilder, ReplayerEvent, StyleMirror,
};
pub use crate::tree::{BuildHooks, NodeRef, NodeSpec, TreeError, TreeTarget, VirtualDocument};
