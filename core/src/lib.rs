//! DOM session replay engine.
//!
//! Rebuilds a recorded page from its event stream: full snapshots become a
//! tree, incremental events mutate it on a timeline that can be played,
//! paused, sought and sped up.

pub mod api;
pub mod assets;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod machine;
pub mod mirror;
pub mod plugin;
pub mod reconcile;
pub mod replayer;
pub mod timer;
pub mod tree;
