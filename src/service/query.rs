//! Read side of the tree: lookups and ordered listings.

use crate::error::ApiError;
use crate::store::NodeStore;
use crate::tree::Node;
use crate::types::{NodeID, ROOT_ID};
use std::sync::Arc;
use tracing::debug;

/// Side-effect-free queries over the node store
#[derive(Clone)]
pub struct TreeQueryService {
    store: Arc<NodeStore>,
}

impl TreeQueryService {
    pub fn new(store: Arc<NodeStore>) -> Self {
        Self { store }
    }

    /// Fetch a node; `None` means the root
    pub fn get_item(&self, id: Option<&str>) -> Result<Node, ApiError> {
        self.store.get_item(id.unwrap_or(ROOT_ID))
    }

    /// Ordered child ids of a folder; `None` means the root
    pub fn get_children_ids(&self, id: Option<&str>) -> Result<Vec<NodeID>, ApiError> {
        let id = id.unwrap_or(ROOT_ID);
        let children = self.store.get_children_ids(id)?;
        debug!(node_id = %id, count = children.len(), "Listed children");
        Ok(children)
    }

    /// Ordered child records of a folder; `None` means the root
    pub fn get_children_with_data(&self, id: Option<&str>) -> Result<Vec<Node>, ApiError> {
        let id = id.unwrap_or(ROOT_ID);
        let children = self.store.get_children_with_data(id)?;
        debug!(node_id = %id, count = children.len(), "Listed children with data");
        Ok(children)
    }

    pub fn get_parent_id(&self, id: &str) -> Result<Option<NodeID>, ApiError> {
        self.store.get_parent_id(id)
    }

    pub fn store(&self) -> &Arc<NodeStore> {
        &self.store
    }
}
