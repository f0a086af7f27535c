//! Collaborator traits injected into the replayer.

use serde_json::Value;

use crate::error::ReplayError;
use crate::event::{wire, NodeId, RecordedEvent};
use crate::mirror::Mirror;
use crate::tree::{BuildHooks, NodeRef, TreeError, TreeTarget};

/// Extension called for every cast event and every rebuilt node.
pub trait ReplayPlugin {
    fn name(&self) -> &str;

    fn handler(
        &mut self,
        _event: &RecordedEvent,
        _is_sync: bool,
        _tree: &mut dyn TreeTarget,
        _mirror: &Mirror,
    ) {
    }

    fn on_build(&mut self, _tree: &mut dyn TreeTarget, _node: NodeRef, _id: NodeId) {}
}

/// Decodes one raw recorded event.
pub trait Unpacker {
    fn unpack(&self, raw: &Value) -> Result<RecordedEvent, ReplayError>;
}

/// Plain JSON events, no packing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughUnpacker;

impl Unpacker for PassthroughUnpacker {
    fn unpack(&self, raw: &Value) -> Result<RecordedEvent, ReplayError> {
        wire::decode_event(raw.clone())
    }
}

/// Brings `live` in line with a virtual tree that catch-up mutations were
/// applied to.
///
/// `virtual_mirror` maps ids to nodes of `virtual_tree`. On return `mirror`
/// must map the same ids to the corresponding live nodes. `hooks` is called
/// for every live node the diff creates.
pub trait TreeDiff {
    fn diff(
        &mut self,
        live: &mut dyn TreeTarget,
        mirror: &mut Mirror,
        virtual_tree: &dyn TreeTarget,
        virtual_mirror: &Mirror,
        hooks: &mut dyn BuildHooks,
    ) -> Result<(), TreeError>;
}
