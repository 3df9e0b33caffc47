//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::QueryTreeConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace: defaults, workspace file, environment.
    pub fn load(workspace_root: &Path) -> Result<QueryTreeConfig, ConfigError> {
        MergeService::load(workspace_root)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<QueryTreeConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    pub fn default() -> QueryTreeConfig {
        QueryTreeConfig::default()
    }
}
