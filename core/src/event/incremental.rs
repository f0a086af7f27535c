use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::SerializedNode;
use super::NodeId;

/// Origin of an incremental record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementalSource {
    Mutation,
    MouseMove,
    MouseInteraction,
    Scroll,
    ViewportResize,
    Input,
    TouchMove,
    MediaInteraction,
    StyleSheetRule,
    CanvasMutation,
    Font,
    Drag,
    StyleDeclaration,
    Selection,
    AdoptedStyleSheet,
}

impl IncrementalSource {
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => Self::Mutation,
            1 => Self::MouseMove,
            2 => Self::MouseInteraction,
            3 => Self::Scroll,
            4 => Self::ViewportResize,
            5 => Self::Input,
            6 => Self::TouchMove,
            7 => Self::MediaInteraction,
            8 => Self::StyleSheetRule,
            9 => Self::CanvasMutation,
            10 => Self::Font,
            12 => Self::Drag,
            13 => Self::StyleDeclaration,
            14 => Self::Selection,
            15 => Self::AdoptedStyleSheet,
            _ => return None,
        })
    }

    /// Sources between Mutation (exclusive) and Input (inclusive).
    pub fn default_interactions() -> Vec<Self> {
        vec![
            Self::MouseMove,
            Self::MouseInteraction,
            Self::Scroll,
            Self::ViewportResize,
            Self::Input,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncrementalData {
    Mutation(MutationData),
    MouseMove(PointerMoveData),
    MouseInteraction(MouseInteractionData),
    Scroll(ScrollData),
    ViewportResize(ViewportResizeData),
    Input(InputData),
    TouchMove(PointerMoveData),
    MediaInteraction(MediaInteractionData),
    StyleSheetRule(StyleSheetRuleData),
    CanvasMutation(CanvasMutationData),
    Font(FontData),
    Drag(PointerMoveData),
    StyleDeclaration(StyleDeclarationData),
    Selection(SelectionData),
    AdoptedStyleSheet(AdoptedStyleSheetData),
}

impl IncrementalData {
    pub fn source(&self) -> IncrementalSource {
        match self {
            Self::Mutation(_) => IncrementalSource::Mutation,
            Self::MouseMove(_) => IncrementalSource::MouseMove,
            Self::MouseInteraction(_) => IncrementalSource::MouseInteraction,
            Self::Scroll(_) => IncrementalSource::Scroll,
            Self::ViewportResize(_) => IncrementalSource::ViewportResize,
            Self::Input(_) => IncrementalSource::Input,
            Self::TouchMove(_) => IncrementalSource::TouchMove,
            Self::MediaInteraction(_) => IncrementalSource::MediaInteraction,
            Self::StyleSheetRule(_) => IncrementalSource::StyleSheetRule,
            Self::CanvasMutation(_) => IncrementalSource::CanvasMutation,
            Self::Font(_) => IncrementalSource::Font,
            Self::Drag(_) => IncrementalSource::Drag,
            Self::StyleDeclaration(_) => IncrementalSource::StyleDeclaration,
            Self::Selection(_) => IncrementalSource::Selection,
            Self::AdoptedStyleSheet(_) => IncrementalSource::AdoptedStyleSheet,
        }
    }
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationData {
    #[serde(default)]
    pub texts: Vec<TextMutation>,
    #[serde(default)]
    pub attributes: Vec<AttributeMutation>,
    #[serde(default)]
    pub removes: Vec<RemovedNodeMutation>,
    #[serde(default)]
    pub adds: Vec<AddedNodeMutation>,
    #[serde(default)]
    pub is_attach_iframe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMutation {
    pub id: NodeId,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMutation {
    pub id: NodeId,
    pub attributes: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Style(BTreeMap<String, StyleValue>),
    Removed,
}

/// One property of a style-object attribute mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    /// `false` removes the property.
    Flag(bool),
    Value(String),
    WithPriority(String, String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedNodeMutation {
    pub parent_id: NodeId,
    pub id: NodeId,
    #[serde(default)]
    pub is_shadow: bool,
}

/// Sibling anchor of an added node.
///
/// `Legacy` is the obsolete `-1` marker meaning "a sibling that has not been
/// replayed yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "Option<i64>")]
pub enum SiblingRef {
    #[default]
    Unset,
    Legacy,
    Node(NodeId),
}

impl From<Option<i64>> for SiblingRef {
    fn from(v: Option<i64>) -> Self {
        match v {
            None => Self::Unset,
            Some(-1) => Self::Legacy,
            Some(id) => Self::Node(id),
        }
    }
}

impl From<SiblingRef> for Option<i64> {
    fn from(v: SiblingRef) -> Self {
        match v {
            SiblingRef::Unset => None,
            SiblingRef::Legacy => Some(-1),
            SiblingRef::Node(id) => Some(id),
        }
    }
}

impl SiblingRef {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedNodeMutation {
    pub parent_id: NodeId,
    #[serde(default)]
    pub previous_id: SiblingRef,
    #[serde(default)]
    pub next_id: SiblingRef,
    pub node: SerializedNode,
}

// ---------------------------------------------------------------------------
// Pointer and interaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MousePosition {
    pub x: f64,
    pub y: f64,
    pub id: NodeId,
    #[serde(default)]
    pub time_offset: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerMoveData {
    #[serde(default)]
    pub positions: Vec<MousePosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub enum MouseInteractionKind {
    MouseUp,
    MouseDown,
    Click,
    ContextMenu,
    DblClick,
    Focus,
    Blur,
    TouchStart,
    TouchMoveDeparted,
    TouchEnd,
    TouchCancel,
}

impl TryFrom<u8> for MouseInteractionKind {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => Self::MouseUp,
            1 => Self::MouseDown,
            2 => Self::Click,
            3 => Self::ContextMenu,
            4 => Self::DblClick,
            5 => Self::Focus,
            6 => Self::Blur,
            7 => Self::TouchStart,
            8 => Self::TouchMoveDeparted,
            9 => Self::TouchEnd,
            10 => Self::TouchCancel,
            other => return Err(format!("unknown mouse interaction type {other}")),
        })
    }
}

impl MouseInteractionKind {
    /// DOM event name dispatched for kinds without a dedicated handler.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::MouseUp => "mouseup",
            Self::MouseDown => "mousedown",
            Self::Click => "click",
            Self::ContextMenu => "contextmenu",
            Self::DblClick => "dblclick",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::TouchStart => "touchstart",
            Self::TouchMoveDeparted => "touchmove",
            Self::TouchEnd => "touchend",
            Self::TouchCancel => "touchcancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseInteractionData {
    #[serde(rename = "type")]
    pub kind: MouseInteractionKind,
    pub id: NodeId,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollData {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportResizeData {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputData {
    pub id: NodeId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_checked: bool,
    #[serde(default)]
    pub user_triggered: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub enum MediaInteractionKind {
    Play,
    Pause,
    Seeked,
    VolumeChange,
    RateChange,
}

impl TryFrom<u8> for MediaInteractionKind {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => Self::Play,
            1 => Self::Pause,
            2 => Self::Seeked,
            3 => Self::VolumeChange,
            4 => Self::RateChange,
            other => return Err(format!("unknown media interaction type {other}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInteractionData {
    #[serde(rename = "type")]
    pub kind: MediaInteractionKind,
    pub id: NodeId,
    #[serde(default)]
    pub current_time: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub muted: Option<bool>,
    #[serde(default)]
    pub playback_rate: Option<f64>,
    #[serde(default, rename = "loop")]
    pub looping: Option<bool>,
}

// ---------------------------------------------------------------------------
// Style sheets
// ---------------------------------------------------------------------------

/// Position of a rule, flat or nested inside grouping rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleIndex {
    Flat(usize),
    Nested(Vec<usize>),
}

impl RuleIndex {
    pub fn to_path(&self) -> Vec<usize> {
        match self {
            Self::Flat(i) => vec![*i],
            Self::Nested(path) => path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRuleAdd {
    pub rule: String,
    #[serde(default)]
    pub index: Option<RuleIndex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRuleRemove {
    pub index: RuleIndex,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSheetRuleData {
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub style_id: Option<i64>,
    #[serde(default)]
    pub adds: Vec<StyleRuleAdd>,
    #[serde(default)]
    pub removes: Vec<StyleRuleRemove>,
    #[serde(default)]
    pub replace: Option<String>,
    #[serde(default)]
    pub replace_sync: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDeclarationSet {
    pub property: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDeclarationRemove {
    pub property: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDeclarationData {
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub style_id: Option<i64>,
    pub index: Vec<usize>,
    #[serde(default)]
    pub set: Option<StyleDeclarationSet>,
    #[serde(default)]
    pub remove: Option<StyleDeclarationRemove>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptedStyle {
    pub style_id: i64,
    #[serde(default)]
    pub rules: Vec<StyleRuleAdd>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptedStyleSheetData {
    pub id: NodeId,
    #[serde(default)]
    pub styles: Vec<AdoptedStyle>,
    #[serde(default)]
    pub style_ids: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Canvas, fonts, selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub enum CanvasContext {
    TwoD,
    WebGl,
    WebGl2,
}

impl TryFrom<u8> for CanvasContext {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => Self::TwoD,
            1 => Self::WebGl,
            2 => Self::WebGl2,
            other => return Err(format!("unknown canvas context {other}")),
        })
    }
}

/// Opaque drawing command; arguments stay in their serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasCommand {
    pub property: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub setter: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCanvasMutation")]
pub struct CanvasMutationData {
    pub id: NodeId,
    pub context: CanvasContext,
    pub commands: Vec<CanvasCommand>,
}

#[derive(Deserialize)]
struct RawCanvasMutation {
    id: NodeId,
    #[serde(rename = "type")]
    context: CanvasContext,
    #[serde(default)]
    commands: Option<Vec<CanvasCommand>>,
    #[serde(default)]
    property: Option<String>,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    setter: bool,
}

impl TryFrom<RawCanvasMutation> for CanvasMutationData {
    type Error = String;

    fn try_from(raw: RawCanvasMutation) -> Result<Self, Self::Error> {
        let commands = match (raw.commands, raw.property) {
            (Some(commands), _) => commands,
            (None, Some(property)) => vec![CanvasCommand {
                property,
                args: raw.args,
                setter: raw.setter,
            }],
            (None, None) => return Err("canvas mutation without commands".to_string()),
        };
        Ok(Self {
            id: raw.id,
            context: raw.context,
            commands,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontData {
    pub family: String,
    pub font_source: String,
    #[serde(default)]
    pub buffer: bool,
    #[serde(default)]
    pub descriptors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRangeData {
    pub start: NodeId,
    pub start_offset: u32,
    pub end: NodeId,
    pub end_offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionData {
    #[serde(default)]
    pub ranges: Vec<SelectionRangeData>,
}
