//! Write side of the tree: rename and move.
//!
//! Each call returns the folder ids whose listings changed so callers can
//! refresh just those folders.

use crate::error::ApiError;
use crate::store::{MoveOutcome, NodeStore, RenameOutcome};
use std::sync::Arc;
use tracing::warn;

/// Serialized mutations over the node store
#[derive(Clone)]
pub struct TreeMutationService {
    store: Arc<NodeStore>,
}

impl TreeMutationService {
    pub fn new(store: Arc<NodeStore>) -> Self {
        Self { store }
    }

    pub fn move_node(&self, id: &str, new_parent_id: &str) -> Result<MoveOutcome, ApiError> {
        self.store.move_node(id, new_parent_id).map_err(|e| {
            warn!(node_id = %id, new_parent = %new_parent_id, error = %e, "Move rejected");
            e
        })
    }

    pub fn rename_node(&self, id: &str, name: &str) -> Result<RenameOutcome, ApiError> {
        self.store.rename_node(id, name).map_err(|e| {
            warn!(node_id = %id, error = %e, "Rename rejected");
            e
        })
    }
}
