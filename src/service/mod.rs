//! Tree services
//!
//! Read and write entry points over a shared [`NodeStore`]. Both services hold
//! an `Arc` to the same store, so a fresh store per test (or per workspace)
//! gives fully isolated trees.

pub mod mutation;
pub mod query;

pub use crate::store::{MoveOutcome, RenameOutcome};
pub use mutation::TreeMutationService;
pub use query::TreeQueryService;

use crate::store::NodeStore;
use std::sync::Arc;

/// Build both services over one store
pub fn services(store: Arc<NodeStore>) -> (TreeQueryService, TreeMutationService) {
    (
        TreeQueryService::new(store.clone()),
        TreeMutationService::new(store),
    )
}
