//! querytree: a workspace query tree
//!
//! An authoritative node store that keeps a folder/file hierarchy acyclic and
//! naturally ordered under concurrent moves and renames, the query and
//! mutation services and HTTP routing over it, and a client adapter that
//! mirrors the tree lazily for a virtualized view.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod virtualization;
