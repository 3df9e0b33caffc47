//! Node Store
//!
//! Authoritative in-memory query tree. Holds every node by id plus a
//! children-by-parent index ordered by sort key, and keeps both consistent
//! under rename and move.
//!
//! Mutations take the write lock for their whole duration and validate
//! fully before touching any state, so readers never observe a half-applied
//! move and a failed mutation leaves the tree unchanged.

pub mod reachability;
pub mod seed;

use crate::error::ApiError;
use crate::tree::sort_key::{self, SortKey};
use crate::tree::{NewNode, Node, NodeKind};
use crate::types::{NodeID, ROOT_ID};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

pub use seed::{SeedFile, SeedNode};

/// Result of a successful move: both folders whose listings changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub old_parent_id: NodeID,
    pub new_parent_id: NodeID,
}

/// Result of a successful rename: the folder whose listing changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub parent_id: NodeID,
}

/// Position of a child within its folder: sort key, then attach order
type ChildKey = (SortKey, u64);

struct StoredNode {
    node: Node,
    /// Attach sequence; breaks ties between equal sort keys
    seq: u64,
}

impl StoredNode {
    fn child_key(&self) -> ChildKey {
        (self.node.sort_key.clone(), self.seq)
    }
}

struct TreeState {
    nodes: HashMap<NodeID, StoredNode>,
    /// One entry per folder, files never get one
    children: HashMap<NodeID, BTreeMap<ChildKey, NodeID>>,
    next_seq: u64,
}

impl TreeState {
    fn stored(&self, id: &str) -> Result<&StoredNode, ApiError> {
        self.nodes
            .get(id)
            .ok_or_else(|| ApiError::NodeNotFound(id.to_string()))
    }

    fn child_index(&self, id: &str) -> Result<&BTreeMap<ChildKey, NodeID>, ApiError> {
        let stored = self.stored(id)?;
        if !stored.node.is_folder() {
            return Err(ApiError::NoChildren(id.to_string()));
        }
        self.children
            .get(id)
            .ok_or_else(|| ApiError::NodeNotFound(id.to_string()))
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|s| s.node.parent_id.as_deref())
    }

    fn is_descendant_or_self(&self, ancestor: &str, candidate: &str) -> bool {
        reachability::is_descendant_or_self(ancestor, candidate, self.nodes.len(), |id| {
            self.parent_of(id)
        })
    }
}

/// Shared, internally synchronized query tree
pub struct NodeStore {
    state: RwLock<TreeState>,
}

impl NodeStore {
    /// Create a store holding only the root folder
    pub fn new(root_name: &str) -> Self {
        let root = Node {
            id: ROOT_ID.to_string(),
            parent_id: None,
            kind: NodeKind::Folder,
            name: root_name.to_string(),
            // A root name never takes part in sibling ordering
            sort_key: sort_key::encode(root_name).unwrap_or_else(|_| SortKey::lowest()),
        };
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_ID.to_string(), StoredNode { node: root, seq: 0 });
        let mut children = HashMap::new();
        children.insert(ROOT_ID.to_string(), BTreeMap::new());

        Self {
            state: RwLock::new(TreeState {
                nodes,
                children,
                next_seq: 1,
            }),
        }
    }

    /// Build a store from seed data
    pub fn from_seed(seed: &SeedFile) -> Result<Self, ApiError> {
        let store = Self::new(seed.root_name.as_deref().unwrap_or("Queries"));
        seed::populate(&store, &seed.nodes)?;
        Ok(store)
    }

    /// Add a node under an existing folder
    pub fn insert(&self, new: NewNode) -> Result<Node, ApiError> {
        let sort_key = encode_name(&new.name)?;
        let mut state = self.state.write();

        if state.nodes.contains_key(&new.id) {
            return Err(ApiError::DuplicateNode(new.id));
        }
        let parent = state.stored(&new.parent_id)?;
        if !parent.node.is_folder() {
            return Err(ApiError::InvalidMove(format!(
                "cannot create {} inside file {}",
                new.id, new.parent_id
            )));
        }

        let node = Node {
            id: new.id.clone(),
            parent_id: Some(new.parent_id.clone()),
            kind: new.kind,
            name: new.name,
            sort_key,
        };
        let seq = state.take_seq();
        let stored = StoredNode {
            node: node.clone(),
            seq,
        };
        let key = stored.child_key();
        if node.is_folder() {
            state.children.insert(node.id.clone(), BTreeMap::new());
        }
        state
            .children
            .entry(new.parent_id.clone())
            .or_default()
            .insert(key, node.id.clone());
        state.nodes.insert(node.id.clone(), stored);

        debug!(node_id = %node.id, parent_id = %new.parent_id, kind = ?node.kind, "Inserted node");
        Ok(node)
    }

    pub fn get_item(&self, id: &str) -> Result<Node, ApiError> {
        let state = self.state.read();
        Ok(state.stored(id)?.node.clone())
    }

    /// Child ids of a folder in sibling order
    pub fn get_children_ids(&self, id: &str) -> Result<Vec<NodeID>, ApiError> {
        let state = self.state.read();
        Ok(state.child_index(id)?.values().cloned().collect())
    }

    /// Child records of a folder in sibling order
    pub fn get_children_with_data(&self, id: &str) -> Result<Vec<Node>, ApiError> {
        let state = self.state.read();
        let index = state.child_index(id)?;
        index
            .values()
            .map(|child| state.stored(child).map(|s| s.node.clone()))
            .collect()
    }

    /// Parent of a node; `None` for the root
    pub fn get_parent_id(&self, id: &str) -> Result<Option<NodeID>, ApiError> {
        let state = self.state.read();
        Ok(state.stored(id)?.node.parent_id.clone())
    }

    /// Rename a node and re-position it among its siblings
    pub fn rename_node(&self, id: &str, new_name: &str) -> Result<RenameOutcome, ApiError> {
        if new_name.trim().is_empty() {
            return Err(ApiError::EmptyName);
        }
        let new_key = encode_name(new_name)?;
        let mut state = self.state.write();

        let stored = state.stored(id)?;
        let parent_id = stored.node.parent_id.clone().ok_or(ApiError::RootImmutable)?;
        let old_key = stored.child_key();

        let seq = state.take_seq();
        let index = state
            .children
            .get_mut(&parent_id)
            .ok_or_else(|| ApiError::NodeNotFound(parent_id.clone()))?;
        index.remove(&old_key);
        index.insert((new_key.clone(), seq), id.to_string());

        if let Some(stored) = state.nodes.get_mut(id) {
            stored.node.name = new_name.to_string();
            stored.node.sort_key = new_key;
            stored.seq = seq;
        }

        info!(node_id = %id, parent_id = %parent_id, name = %new_name, "Renamed node");
        Ok(RenameOutcome { parent_id })
    }

    /// Reparent a node, keeping its sort key
    pub fn move_node(&self, id: &str, new_parent_id: &str) -> Result<MoveOutcome, ApiError> {
        let mut state = self.state.write();

        let stored = state.stored(id)?;
        let target = state.stored(new_parent_id)?;
        let old_parent_id = stored.node.parent_id.clone().ok_or(ApiError::RootImmutable)?;

        if id == new_parent_id {
            return Err(ApiError::InvalidMove(format!(
                "cannot move {} into itself",
                id
            )));
        }
        if !target.node.is_folder() {
            return Err(ApiError::InvalidMove(format!(
                "target {} is a file",
                new_parent_id
            )));
        }
        if state.is_descendant_or_self(id, new_parent_id) {
            return Err(ApiError::InvalidMove(format!(
                "target {} is inside {}",
                new_parent_id, id
            )));
        }

        if old_parent_id != new_parent_id {
            let old_key = stored.child_key();
            let seq = state.take_seq();
            let new_key = (old_key.0.clone(), seq);

            if let Some(index) = state.children.get_mut(&old_parent_id) {
                index.remove(&old_key);
            }
            state
                .children
                .entry(new_parent_id.to_string())
                .or_default()
                .insert(new_key, id.to_string());
            if let Some(stored) = state.nodes.get_mut(id) {
                stored.node.parent_id = Some(new_parent_id.to_string());
                stored.seq = seq;
            }
        }

        info!(
            node_id = %id,
            old_parent = %old_parent_id,
            new_parent = %new_parent_id,
            "Moved node"
        );
        Ok(MoveOutcome {
            old_parent_id,
            new_parent_id: new_parent_id.to_string(),
        })
    }

    /// Whether moving `id` under `new_parent_id` would create a cycle
    pub fn would_create_cycle(&self, id: &str, new_parent_id: &str) -> Result<bool, ApiError> {
        let state = self.state.read();
        state.stored(id)?;
        state.stored(new_parent_id)?;
        Ok(state.is_descendant_or_self(id, new_parent_id))
    }

    /// Number of ancestors between a node and the root (root is 0)
    pub fn depth_of(&self, id: &str) -> Result<usize, ApiError> {
        let state = self.state.read();
        state.stored(id)?;
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = state.parent_of(current) {
            depth += 1;
            current = parent;
        }
        Ok(depth)
    }

    /// Total node count, root included
    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every node id, unordered
    pub fn node_ids(&self) -> Vec<NodeID> {
        self.state.read().nodes.keys().cloned().collect()
    }

    /// Check the tree invariants; returns the first violation found
    pub fn verify_invariants(&self) -> Result<(), String> {
        let state = self.state.read();

        let roots: Vec<&str> = state
            .nodes
            .values()
            .filter(|s| s.node.parent_id.is_none())
            .map(|s| s.node.id.as_str())
            .collect();
        if roots != [ROOT_ID] {
            return Err(format!("expected a single root, found {:?}", roots));
        }

        for (id, stored) in &state.nodes {
            if let Some(parent) = &stored.node.parent_id {
                let index = state
                    .children
                    .get(parent)
                    .ok_or_else(|| format!("{} has non-folder parent {}", id, parent))?;
                if index.get(&stored.child_key()) != Some(id) {
                    return Err(format!("{} missing from children of {}", id, parent));
                }
                if state.is_descendant_or_self(id, parent) {
                    return Err(format!("{} is its own ancestor", id));
                }
            }
            if stored.node.is_folder() != state.children.contains_key(id) {
                return Err(format!("children index disagrees with kind of {}", id));
            }
        }

        for (parent, index) in &state.children {
            for child in index.values() {
                let owner = state.parent_of(child);
                if owner != Some(parent.as_str()) {
                    return Err(format!("{} listed under {} but owned by {:?}", child, parent, owner));
                }
            }
        }
        Ok(())
    }
}

fn encode_name(name: &str) -> Result<SortKey, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::EmptyName);
    }
    sort_key::encode(name)
}
