//! Row presentation rules: labels and the folder depth policy.
//!
//! These only shape what the rendering layer shows. They never change mirror
//! or store data.

use super::mirror::TreeItem;

/// Default relative depth at which folders stop being expandable
pub const DEFAULT_MAX_FOLDER_DEPTH: usize = 3;

/// Label for a row. Falls back to the id when there is no usable name.
pub fn item_name(item: &TreeItem) -> &str {
    match item {
        TreeItem::Node(node) | TreeItem::Loading(node) if !node.name.is_empty() => &node.name,
        other => other.id(),
    }
}

/// Folders at relative depth `max_folder_depth` or deeper render as leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthPolicy {
    pub max_folder_depth: usize,
}

impl Default for DepthPolicy {
    fn default() -> Self {
        Self {
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}

impl DepthPolicy {
    pub fn new(max_folder_depth: usize) -> Self {
        Self { max_folder_depth }
    }

    /// True only for a hydrated folder above the depth limit.
    ///
    /// Unhydrated rows and the loading placeholder never offer expansion.
    pub fn is_folder(&self, item: &TreeItem, depth: usize) -> bool {
        match item {
            TreeItem::Node(node) => node.is_folder() && depth < self.max_folder_depth,
            TreeItem::Unhydrated(_) | TreeItem::Loading(_) => false,
        }
    }
}
