//! In-process data source backed directly by the tree services.

use super::source::{SourceCapabilities, TreeDataSource};
use crate::error::ApiError;
use crate::service::{
    MoveOutcome, RenameOutcome, TreeMutationService, TreeQueryService,
};
use crate::store::NodeStore;
use crate::tree::Node;
use crate::types::NodeID;
use async_trait::async_trait;
use std::sync::Arc;

pub struct LocalDataSource {
    query: TreeQueryService,
    mutation: TreeMutationService,
}

impl LocalDataSource {
    pub fn new(store: Arc<NodeStore>) -> Self {
        let (query, mutation) = crate::service::services(store);
        Self { query, mutation }
    }
}

#[async_trait]
impl TreeDataSource for LocalDataSource {
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            children_with_data: true,
        }
    }

    async fn load_item(&self, id: &str) -> Result<Node, ApiError> {
        self.query.get_item(Some(id))
    }

    async fn load_children(&self, id: &str) -> Result<Vec<NodeID>, ApiError> {
        self.query.get_children_ids(Some(id))
    }

    async fn load_children_with_data(&self, id: &str) -> Result<Vec<Node>, ApiError> {
        self.query.get_children_with_data(Some(id))
    }

    async fn move_node(&self, id: &str, new_parent_id: &str) -> Result<MoveOutcome, ApiError> {
        self.mutation.move_node(id, new_parent_id)
    }

    async fn rename_node(&self, id: &str, name: &str) -> Result<RenameOutcome, ApiError> {
        self.mutation.rename_node(id, name)
    }
}
