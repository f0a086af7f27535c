use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::NodeId;

/// Attribute value as captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeLiteral {
    Text(String),
    Number(f64),
    Flag(bool),
    Null,
}

impl AttributeLiteral {
    /// String form written to the tree; `None` means "do not set".
    pub fn as_attribute_value(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Flag(true) => Some(String::new()),
            Self::Flag(false) | Self::Null => None,
        }
    }
}

impl From<&str> for AttributeLiteral {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SerializedNodeKind {
    Document {
        compat_mode: Option<String>,
    },
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        tag_name: String,
        attributes: BTreeMap<String, AttributeLiteral>,
        is_svg: bool,
        need_block: bool,
    },
    Text {
        text_content: String,
        is_style: bool,
    },
    CData,
    Comment {
        text_content: String,
    },
}

/// Id-addressed description of a captured subtree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSerializedNode")]
pub struct SerializedNode {
    pub id: NodeId,
    /// Owning nested document (iframe or shadow root), if any.
    pub root_id: Option<NodeId>,
    pub kind: SerializedNodeKind,
    pub child_nodes: Vec<SerializedNode>,
    pub is_shadow_host: bool,
    pub is_shadow: bool,
}

impl SerializedNode {
    fn with_kind(id: NodeId, kind: SerializedNodeKind) -> Self {
        Self {
            id,
            root_id: None,
            kind,
            child_nodes: Vec::new(),
            is_shadow_host: false,
            is_shadow: false,
        }
    }

    pub fn document(id: NodeId) -> Self {
        Self::with_kind(id, SerializedNodeKind::Document { compat_mode: None })
    }

    pub fn doctype(id: NodeId, name: &str) -> Self {
        Self::with_kind(
            id,
            SerializedNodeKind::DocumentType {
                name: name.to_string(),
                public_id: String::new(),
                system_id: String::new(),
            },
        )
    }

    pub fn element(id: NodeId, tag_name: &str) -> Self {
        Self::with_kind(
            id,
            SerializedNodeKind::Element {
                tag_name: tag_name.to_ascii_lowercase(),
                attributes: BTreeMap::new(),
                is_svg: false,
                need_block: false,
            },
        )
    }

    pub fn text(id: NodeId, text: &str) -> Self {
        Self::with_kind(
            id,
            SerializedNodeKind::Text {
                text_content: text.to_string(),
                is_style: false,
            },
        )
    }

    pub fn comment(id: NodeId, text: &str) -> Self {
        Self::with_kind(
            id,
            SerializedNodeKind::Comment {
                text_content: text.to_string(),
            },
        )
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        if let SerializedNodeKind::Element { attributes, .. } = &mut self.kind {
            attributes.insert(name.to_string(), AttributeLiteral::from(value));
        }
        self
    }

    pub fn with_children(mut self, children: Vec<SerializedNode>) -> Self {
        self.child_nodes = children;
        self
    }

    pub fn with_root(mut self, root_id: NodeId) -> Self {
        self.root_id = Some(root_id);
        self
    }

    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            SerializedNodeKind::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self.kind, SerializedNodeKind::Document { .. })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSerializedNode {
    #[serde(rename = "type")]
    kind: u8,
    id: NodeId,
    #[serde(default)]
    root_id: Option<NodeId>,
    #[serde(default)]
    child_nodes: Vec<SerializedNode>,
    #[serde(default)]
    compat_mode: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    public_id: String,
    #[serde(default)]
    system_id: String,
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeLiteral>,
    #[serde(default, rename = "isSVG")]
    is_svg: bool,
    #[serde(default)]
    need_block: bool,
    #[serde(default)]
    text_content: Option<String>,
    #[serde(default)]
    is_style: bool,
    #[serde(default)]
    is_shadow_host: bool,
    #[serde(default)]
    is_shadow: bool,
}

impl TryFrom<RawSerializedNode> for SerializedNode {
    type Error = String;

    fn try_from(raw: RawSerializedNode) -> Result<Self, Self::Error> {
        let text = raw.text_content.unwrap_or_default();
        let kind = match raw.kind {
            0 => SerializedNodeKind::Document {
                compat_mode: raw.compat_mode,
            },
            1 => SerializedNodeKind::DocumentType {
                name: raw.name,
                public_id: raw.public_id,
                system_id: raw.system_id,
            },
            2 => SerializedNodeKind::Element {
                tag_name: raw.tag_name.to_ascii_lowercase(),
                attributes: raw.attributes,
                is_svg: raw.is_svg,
                need_block: raw.need_block,
            },
            3 => SerializedNodeKind::Text {
                text_content: text,
                is_style: raw.is_style,
            },
            4 => SerializedNodeKind::CData,
            5 => SerializedNodeKind::Comment { text_content: text },
            other => return Err(format!("unknown serialized node type {other}")),
        };
        Ok(Self {
            id: raw.id,
            root_id: raw.root_id,
            kind,
            child_nodes: raw.child_nodes,
            is_shadow_host: raw.is_shadow_host,
            is_shadow: raw.is_shadow,
        })
    }
}
