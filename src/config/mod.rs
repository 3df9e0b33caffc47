//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, then
//! `<workspace>/querytree.toml`, then `QUERYTREE__SECTION__KEY` environment
//! variables.

pub mod facade;
pub mod merge;
pub mod sources;

pub use crate::logging::LoggingConfig;
pub use facade::ConfigLoader;

use crate::client::DEFAULT_MAX_FOLDER_DEPTH;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the per-workspace config file
pub const WORKSPACE_CONFIG_FILE: &str = "querytree.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTreeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl QueryTreeConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.view.row_height == 0 {
            return Err(ApiError::ConfigError(
                "view.row_height must be greater than zero".to_string(),
            ));
        }
        if self.adapter.max_folder_depth == 0 {
            return Err(ApiError::ConfigError(
                "adapter.max_folder_depth must be greater than zero".to_string(),
            ));
        }
        if self.tree.root_name.trim().is_empty() {
            return Err(ApiError::ConfigError("tree.root_name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Where the node store comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Seed file (json, yaml or toml); None uses the built-in demo tree
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
    #[serde(default = "default_root_name")]
    pub root_name: String,
}

fn default_root_name() -> String {
    "Queries".to_string()
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            root_name: default_root_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Relative depth at which folders stop being expandable
    #[serde(default = "default_max_folder_depth")]
    pub max_folder_depth: usize,
    /// Use the combined children-with-data call when the source has one
    #[serde(default = "default_true")]
    pub prefer_combined_loads: bool,
}

fn default_max_folder_depth() -> usize {
    DEFAULT_MAX_FOLDER_DEPTH
}

fn default_true() -> bool {
    true
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_folder_depth: default_max_folder_depth(),
            prefer_combined_loads: true,
        }
    }
}

/// Row geometry for the virtualization window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_row_height")]
    pub row_height: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_overscan")]
    pub overscan: usize,
}

fn default_row_height() -> u32 {
    28
}

fn default_viewport_height() -> u32 {
    280
}

fn default_overscan() -> usize {
    8
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            row_height: default_row_height(),
            viewport_height: default_viewport_height(),
            overscan: default_overscan(),
        }
    }
}

/// Remote tree endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Whether the server exposes the combined children-with-data endpoint
    #[serde(default = "default_true")]
    pub children_with_data: bool,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_prefix() -> String {
    crate::api::DEFAULT_PREFIX.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            prefix: default_prefix(),
            timeout_ms: default_timeout_ms(),
            children_with_data: true,
        }
    }
}
