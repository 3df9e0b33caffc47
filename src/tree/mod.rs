//! Query tree node model and sibling ordering.

pub mod node;
pub mod sort_key;

pub use node::{NewNode, Node, NodeKind};
pub use sort_key::{SortKey, SORT_KEY_DIGIT_WIDTH};
