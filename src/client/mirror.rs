//! Client-side mirror of the tree.
//!
//! A partial projection of the node store: only folders that have been
//! loaded have children, and a child listed by id may not have its record yet.
//!
//! Every listing carries a generation that moves whenever the listing is
//! replaced from the source or invalidated. Optimistic edits leave it alone,
//! so a rollback can tell whether its snapshot is still the base it edited.

use super::optimistic::MutationKind;
use crate::tree::sort_key::{self, SortKey};
use crate::tree::Node;
use crate::types::{NodeID, ROOT_ID};
use std::collections::HashMap;

/// Something the rendering layer can draw as a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    /// Hydrated node
    Node(Node),
    /// Listed by id, record not fetched yet
    Unhydrated(NodeID),
    /// Transient loading row; never leaves the rendering layer
    Loading(Node),
}

impl TreeItem {
    pub fn id(&self) -> &str {
        match self {
            TreeItem::Node(node) | TreeItem::Loading(node) => &node.id,
            TreeItem::Unhydrated(id) => id,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, TreeItem::Loading(_))
    }
}

/// Loading placeholder shown under `parent_id`
pub fn placeholder(parent_id: &str) -> TreeItem {
    TreeItem::Loading(Node::placeholder(parent_id))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChildrenState {
    Unloaded,
    Loading { token: u64 },
    Loaded(Vec<NodeID>),
}

#[derive(Debug, Clone)]
pub(crate) struct MirrorEntry {
    pub(crate) data: Option<Node>,
    pub(crate) parent_id: Option<NodeID>,
    children: ChildrenState,
    generation: u64,
    pub(crate) expanded: bool,
}

impl MirrorEntry {
    fn new(parent_id: Option<NodeID>) -> Self {
        Self {
            data: None,
            parent_id,
            children: ChildrenState::Unloaded,
            generation: 0,
            expanded: false,
        }
    }

    pub(crate) fn children(&self) -> &ChildrenState {
        &self.children
    }

    /// Replace the listing state and start a new generation
    pub(crate) fn set_children(&mut self, children: ChildrenState) {
        self.children = children;
        self.generation += 1;
    }
}

/// Record of the node an optimistic change edits
#[derive(Debug, Clone)]
struct NodeSnapshot {
    id: NodeID,
    data: Option<Node>,
    parent_id: Option<NodeID>,
}

/// Loaded listing of a folder an optimistic change edits
#[derive(Debug, Clone)]
struct ListingSnapshot {
    id: NodeID,
    generation: u64,
    children: Vec<NodeID>,
}

/// Pre-mutation state of everything an optimistic change touches
#[derive(Debug, Clone, Default)]
pub struct MirrorSnapshot {
    node: Option<NodeSnapshot>,
    listings: Vec<ListingSnapshot>,
}

pub(crate) struct Mirror {
    entries: HashMap<NodeID, MirrorEntry>,
    next_token: u64,
}

impl Mirror {
    pub(crate) fn new() -> Self {
        let mut entries = HashMap::new();
        let mut root = MirrorEntry::new(None);
        root.expanded = true;
        entries.insert(ROOT_ID.to_string(), root);
        Self {
            entries,
            next_token: 1,
        }
    }

    pub(crate) fn entry(&self, id: &str) -> Option<&MirrorEntry> {
        self.entries.get(id)
    }

    pub(crate) fn entry_mut(&mut self, id: &str) -> Option<&mut MirrorEntry> {
        self.entries.get_mut(id)
    }

    fn entry_or_insert(&mut self, id: &str, parent_id: Option<&str>) -> &mut MirrorEntry {
        let entry = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| MirrorEntry::new(parent_id.map(str::to_string)));
        if parent_id.is_some() {
            entry.parent_id = parent_id.map(str::to_string);
        }
        entry
    }

    pub(crate) fn next_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    pub(crate) fn data(&self, id: &str) -> Option<&Node> {
        self.entries.get(id).and_then(|e| e.data.as_ref())
    }

    pub(crate) fn set_data(&mut self, node: Node) {
        let parent = node.parent_id.clone();
        let entry = self.entry_or_insert(&node.id, parent.as_deref());
        entry.data = Some(node);
    }

    pub(crate) fn loaded_children(&self, id: &str) -> Option<&[NodeID]> {
        match &self.entries.get(id)?.children {
            ChildrenState::Loaded(children) => Some(children),
            _ => None,
        }
    }

    /// Replace a folder's loading state with its fetched children, atomically
    pub(crate) fn apply_children_with_data(&mut self, parent_id: &str, nodes: Vec<Node>) {
        let ids = nodes.iter().map(|n| n.id.clone()).collect();
        for node in nodes {
            self.set_data(node);
        }
        if let Some(entry) = self.entries.get_mut(parent_id) {
            entry.set_children(ChildrenState::Loaded(ids));
        }
    }

    pub(crate) fn apply_children_ids(&mut self, parent_id: &str, ids: Vec<NodeID>) {
        for id in &ids {
            self.entry_or_insert(id, Some(parent_id));
        }
        if let Some(entry) = self.entries.get_mut(parent_id) {
            entry.set_children(ChildrenState::Loaded(ids));
        }
    }

    /// Number of folders between `id` and the root; root children are depth 0.
    ///
    /// `None` for the root and for nodes whose ancestry is unknown.
    pub(crate) fn row_depth(&self, id: &str) -> Option<usize> {
        let mut depth = 0usize;
        let mut current = self.entries.get(id)?.parent_id.as_deref()?;
        while current != ROOT_ID {
            depth += 1;
            current = self.entries.get(current)?.parent_id.as_deref()?;
            if depth > self.entries.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Capture `node` and the loaded listings of `folders`
    pub(crate) fn snapshot(&self, node: &str, folders: &[&str]) -> MirrorSnapshot {
        let node = self.entries.get(node).map(|entry| NodeSnapshot {
            id: node.to_string(),
            data: entry.data.clone(),
            parent_id: entry.parent_id.clone(),
        });
        let listings = folders
            .iter()
            .filter_map(|id| {
                let entry = self.entries.get(*id)?;
                match &entry.children {
                    ChildrenState::Loaded(children) => Some(ListingSnapshot {
                        id: id.to_string(),
                        generation: entry.generation,
                        children: children.clone(),
                    }),
                    _ => None,
                }
            })
            .collect();
        MirrorSnapshot { node, listings }
    }

    /// Put back the captured fields.
    ///
    /// A listing is restored only if it is still the generation the snapshot
    /// saw. Listings reloaded since are returned instead, for the caller to
    /// invalidate; listings that are loading or unloaded are left alone.
    pub(crate) fn restore(&mut self, snapshot: &MirrorSnapshot) -> Vec<NodeID> {
        if let Some(saved) = &snapshot.node {
            if let Some(entry) = self.entries.get_mut(&saved.id) {
                entry.data = saved.data.clone();
                entry.parent_id = saved.parent_id.clone();
            }
        }

        let mut stale = Vec::new();
        for saved in &snapshot.listings {
            let Some(entry) = self.entries.get_mut(&saved.id) else {
                continue;
            };
            if let ChildrenState::Loaded(children) = &mut entry.children {
                if entry.generation == saved.generation {
                    *children = saved.children.clone();
                } else {
                    stale.push(saved.id.clone());
                }
            }
        }
        stale
    }

    /// Re-apply optimistic changes still awaiting the source, oldest first.
    ///
    /// Used after a listing is replaced by a response that predates them.
    pub(crate) fn replay(&mut self, pending: &[MutationKind]) {
        for kind in pending {
            match kind {
                MutationKind::Move { id, new_parent_id } => {
                    self.apply_move(id, new_parent_id);
                }
                MutationKind::Rename { id, name } => {
                    self.apply_rename(id, name, sort_key::encode(name).ok());
                }
            }
        }
    }

    /// Sort key of a mirrored node, if its record is known
    fn sort_key(&self, id: &str) -> Option<&SortKey> {
        self.data(id).map(|n| &n.sort_key)
    }

    /// Insert `id` into a loaded listing after every sibling that does not
    /// order after it, matching the store's attach-order tie-break.
    fn insert_sorted(&mut self, parent_id: &str, id: &str) {
        let key = self.sort_key(id).cloned();
        let Some(listing) = self.loaded_children(parent_id).map(<[NodeID]>::to_vec) else {
            return;
        };
        let mut listing: Vec<NodeID> = listing.into_iter().filter(|c| c != id).collect();
        let position = match &key {
            Some(key) => listing
                .iter()
                .position(|sibling| self.sort_key(sibling).map_or(false, |k| k > key))
                .unwrap_or(listing.len()),
            None => listing.len(),
        };
        listing.insert(position, id.to_string());
        if let Some(entry) = self.entries.get_mut(parent_id) {
            if let ChildrenState::Loaded(children) = &mut entry.children {
                *children = listing;
            }
        }
    }

    fn remove_from_listing(&mut self, parent_id: &str, id: &str) {
        if let Some(entry) = self.entries.get_mut(parent_id) {
            if let ChildrenState::Loaded(children) = &mut entry.children {
                children.retain(|c| c != id);
            }
        }
    }

    /// Apply a move locally. Returns the previous parent, if known.
    pub(crate) fn apply_move(&mut self, id: &str, new_parent_id: &str) -> Option<NodeID> {
        let entry = self.entries.get_mut(id)?;
        let old_parent = entry.parent_id.replace(new_parent_id.to_string());
        if let Some(data) = entry.data.as_mut() {
            data.parent_id = Some(new_parent_id.to_string());
        }
        if let Some(old) = &old_parent {
            self.remove_from_listing(old, id);
        }
        self.insert_sorted(new_parent_id, id);
        old_parent
    }

    /// Apply a rename locally and re-position the node among its siblings.
    ///
    /// An unhydrated row has no key to sort by and keeps its position.
    pub(crate) fn apply_rename(&mut self, id: &str, name: &str, key: Option<SortKey>) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let Some(data) = entry.data.as_mut() else {
            return;
        };
        data.name = name.to_string();
        if let Some(key) = key {
            data.sort_key = key;
        }
        if let Some(parent) = entry.parent_id.clone() {
            self.insert_sorted(&parent, id);
        }
    }
}
