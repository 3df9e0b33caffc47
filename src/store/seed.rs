//! Seed data for a node store.
//!
//! Nodes are created outside the tree operations proper; a seed file is how
//! a store gets its initial hierarchy. JSON, YAML and TOML are accepted.

use crate::error::ApiError;
use crate::store::NodeStore;
use crate::tree::{NewNode, NodeKind};
use crate::types::{NodeID, ROOT_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One seeded node. A missing `parent_id` places the node under the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedNode {
    pub id: NodeID,
    #[serde(default)]
    pub parent_id: Option<NodeID>,
    pub kind: NodeKind,
    pub name: String,
}

/// Seed file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedFile {
    #[serde(default)]
    pub root_name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<SeedNode>,
}

impl SeedFile {
    /// Load a seed file, choosing the format from its extension
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApiError::ConfigError(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let parsed: Result<SeedFile, String> = match extension.as_deref() {
            Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            Some("toml") => toml::from_str(&content).map_err(|e| e.to_string()),
            _ => {
                return Err(ApiError::ConfigError(format!(
                    "Unsupported seed format for {} (expected json, yaml or toml)",
                    path.display()
                )))
            }
        };
        parsed.map_err(|e| {
            ApiError::ConfigError(format!("Failed to parse seed file {}: {}", path.display(), e))
        })
    }
}

/// Insert seed nodes so that every parent exists before its children,
/// whatever order the file lists them in.
pub(crate) fn populate(store: &NodeStore, nodes: &[SeedNode]) -> Result<(), ApiError> {
    let mut pending: Vec<&SeedNode> = nodes.iter().collect();

    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();

        for node in pending {
            let parent = node.parent_id.as_deref().unwrap_or(ROOT_ID);
            if store.get_item(parent).is_ok() {
                store.insert(NewNode {
                    id: node.id.clone(),
                    parent_id: parent.to_string(),
                    kind: node.kind,
                    name: node.name.clone(),
                })?;
            } else {
                deferred.push(node);
            }
        }

        if deferred.len() == before {
            let waiting: HashSet<&str> = deferred.iter().map(|n| n.id.as_str()).collect();
            let orphan = deferred
                .iter()
                .filter_map(|n| n.parent_id.as_deref())
                .find(|p| !waiting.contains(p));
            return Err(match orphan {
                Some(parent) => ApiError::NodeNotFound(parent.to_string()),
                None => ApiError::InvalidMove("seed nodes form a parent cycle".to_string()),
            });
        }
        pending = deferred;
    }

    debug!(nodes = nodes.len(), "Seeded node store");
    Ok(())
}

/// Small saved-query hierarchy used when no seed file is configured
pub fn demo_seed() -> SeedFile {
    let folder = |id: &str, parent: Option<&str>, name: &str| SeedNode {
        id: id.to_string(),
        parent_id: parent.map(str::to_string),
        kind: NodeKind::Folder,
        name: name.to_string(),
    };
    let file = |id: &str, parent: Option<&str>, name: &str| SeedNode {
        id: id.to_string(),
        parent_id: parent.map(str::to_string),
        kind: NodeKind::File,
        name: name.to_string(),
    };

    SeedFile {
        root_name: Some("Queries".to_string()),
        nodes: vec![
            folder("analytics", None, "Analytics"),
            folder("finance", None, "Finance"),
            folder("scratch", None, "Scratch"),
            file("q-readme", None, "README"),
            folder("analytics-daily", Some("analytics"), "Daily"),
            file("q-retention", Some("analytics"), "Retention cohort"),
            file("q-funnel", Some("analytics"), "Signup funnel"),
            file("q-daily-2", Some("analytics-daily"), "report 2"),
            file("q-daily-10", Some("analytics-daily"), "report 10"),
            file("q-daily-1", Some("analytics-daily"), "Report 1"),
            folder("analytics-daily-old", Some("analytics-daily"), "Archive"),
            file("q-daily-old", Some("analytics-daily-old"), "Legacy report"),
            file("q-revenue", Some("finance"), "Revenue by month"),
            file("q-refunds", Some("finance"), "Refunds"),
            file("q-tmp", Some("scratch"), "untitled 3"),
        ],
    }
}
