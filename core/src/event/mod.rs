//! Recorded event model.
//!
//! Events arrive as `{ type, timestamp, data }` records. The `data` payload is
//! decoded into a closed set of variants so every consumer matches
//! exhaustively; numeric wire tags are handled in [`wire`].

mod incremental;
mod snapshot;
mod types;
pub mod wire;

pub use incremental::{
    AddedNodeMutation, AdoptedStyle, AdoptedStyleSheetData, AttributeMutation, AttributeValue,
    CanvasCommand, CanvasContext, CanvasMutationData, FontData, IncrementalData,
    IncrementalSource, InputData, MediaInteractionData, MediaInteractionKind,
    MouseInteractionData, MouseInteractionKind, MousePosition, MutationData, PointerMoveData,
    RemovedNodeMutation, RuleIndex, ScrollData, SelectionData, SelectionRangeData, SiblingRef,
    StyleDeclarationData, StyleDeclarationRemove, StyleDeclarationSet, StyleRuleAdd,
    StyleRuleRemove, StyleSheetRuleData, StyleValue, TextMutation, ViewportResizeData,
};
pub use snapshot::{AttributeLiteral, SerializedNode, SerializedNodeKind};
pub use types::{
    AssetData, CustomData, EventData, EventType, FullSnapshotData, MetaData, PluginData,
    RecordedEvent, ScrollOffset,
};

/// Stable node identifier assigned at recording time.
pub type NodeId = i64;
