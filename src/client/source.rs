//! Data source port for the client adapter.

use crate::error::ApiError;
use crate::service::{MoveOutcome, RenameOutcome};
use crate::tree::Node;
use crate::types::NodeID;
use async_trait::async_trait;

/// Optional operations a data source can serve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCapabilities {
    /// Child ids and child records in one round trip
    pub children_with_data: bool,
}

/// Everything the adapter needs from the tree backend.
///
/// `load_children_with_data` is only called when
/// [`SourceCapabilities::children_with_data`] is set.
#[async_trait]
pub trait TreeDataSource: Send + Sync {
    fn capabilities(&self) -> SourceCapabilities;

    async fn load_item(&self, id: &str) -> Result<Node, ApiError>;

    async fn load_children(&self, id: &str) -> Result<Vec<NodeID>, ApiError>;

    async fn load_children_with_data(&self, _id: &str) -> Result<Vec<Node>, ApiError> {
        Err(ApiError::Unsupported("load_children_with_data"))
    }

    async fn move_node(&self, id: &str, new_parent_id: &str) -> Result<MoveOutcome, ApiError>;

    async fn rename_node(&self, id: &str, name: &str) -> Result<RenameOutcome, ApiError>;
}
