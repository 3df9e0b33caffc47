//! Core types for the query tree.

/// NodeID: Opaque identifier of a folder or file, stable for the node's lifetime
pub type NodeID = String;

/// Identifier of the single root folder
pub const ROOT_ID: &str = "root";

/// Reserved identifier of the client-side loading placeholder
pub const PLACEHOLDER_ID: &str = "__loading__";

/// Label shown for the loading placeholder
pub const PLACEHOLDER_LABEL: &str = "Loading…";
