//! Query tree node records

use crate::tree::sort_key::SortKey;
use crate::types::{NodeID, PLACEHOLDER_ID, PLACEHOLDER_LABEL};
use serde::{Deserialize, Serialize};

/// Node kind. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

impl NodeKind {
    pub fn is_folder(self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

/// A folder or a saved query file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeID,
    /// `None` only for the root
    pub parent_id: Option<NodeID>,
    pub kind: NodeKind,
    pub name: String,
    pub sort_key: SortKey,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Transient loading node shown under `parent_id` while its children load.
    ///
    /// Only the rendering layer sees this record; it is never stored.
    pub fn placeholder(parent_id: &str) -> Self {
        Node {
            id: PLACEHOLDER_ID.to_string(),
            parent_id: Some(parent_id.to_string()),
            kind: NodeKind::Folder,
            name: PLACEHOLDER_LABEL.to_string(),
            sort_key: SortKey::lowest(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }
}

/// Creation request for a node; the sort key is derived from `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    pub id: NodeID,
    pub parent_id: NodeID,
    pub kind: NodeKind,
    pub name: String,
}

impl NewNode {
    pub fn folder(id: &str, parent_id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
            kind: NodeKind::Folder,
            name: name.to_string(),
        }
    }

    pub fn file(id: &str, parent_id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
            kind: NodeKind::File,
            name: name.to_string(),
        }
    }
}
