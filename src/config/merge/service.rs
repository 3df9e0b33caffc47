//! MergeService: orchestrates sources, deserializes and validates QueryTreeConfig.

use super::policy;
use crate::config::sources::{environment, workspace_file};
use crate::config::QueryTreeConfig;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;
use tracing::debug;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> workspace file -> environment (highest).
    pub fn load(workspace_root: &Path) -> Result<QueryTreeConfig, ConfigError> {
        let builder = policy::builder_with_defaults()?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;
        finish(builder)
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<QueryTreeConfig, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let builder = policy::builder_with_defaults()?;
        let builder = builder.add_source(File::from(path));
        let builder = environment::add_to_builder(builder)?;
        finish(builder)
    }
}

fn finish(
    builder: ConfigBuilder<config::builder::DefaultState>,
) -> Result<QueryTreeConfig, ConfigError> {
    let config: QueryTreeConfig = builder.build()?.try_deserialize()?;
    config
        .validate()
        .map_err(|e| ConfigError::Message(e.to_string()))?;
    debug!(
        root_name = %config.tree.root_name,
        max_folder_depth = config.adapter.max_folder_depth,
        "Configuration loaded"
    );
    Ok(config)
}
