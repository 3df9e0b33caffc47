//! Integration tests for the query tree

mod adapter_sync;
mod cli_contracts;
mod store_concurrency;
mod tree_api;
