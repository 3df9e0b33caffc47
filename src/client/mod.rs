//! Client Tree Adapter
//!
//! Keeps a partial, lazily populated mirror of the node store for the
//! rendering layer. Folders are fetched on expand, at most one fetch per
//! folder is in flight, and move/rename are applied optimistically with a
//! rollback on failure.

pub mod adapter;
pub mod http;
pub mod inflight;
pub mod local;
pub mod mirror;
pub mod optimistic;
pub mod presentation;
pub mod source;

pub use adapter::{ExpandOutcome, TreeAdapter, TreeRow};
pub use http::HttpDataSource;
pub use local::LocalDataSource;
pub use mirror::TreeItem;
pub use optimistic::{MutationId, MutationKind, MutationRecord, MutationState};
pub use presentation::{item_name, DepthPolicy, DEFAULT_MAX_FOLDER_DEPTH};
pub use source::{SourceCapabilities, TreeDataSource};
