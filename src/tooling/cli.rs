//! CLI Tooling
//!
//! Command-line access to a query tree. Request-shaped commands go through
//! the same router the HTTP surface uses and print its JSON body; `tree`
//! drives the client adapter and renders the virtualized row window.

use crate::api::{HttpRequest, HttpResponse, TreeRouter};
use crate::client::{
    item_name, ExpandOutcome, HttpDataSource, LocalDataSource, TreeAdapter, TreeDataSource,
    TreeItem, TreeRow,
};
use crate::config::{ConfigLoader, LoggingConfig, QueryTreeConfig};
use crate::error::ApiError;
use crate::logging::resolve_log_file_path;
use crate::service::services;
use crate::store::seed::{demo_seed, SeedFile};
use crate::store::NodeStore;
use crate::tree::Node;
use crate::types::{NodeID, ROOT_ID};
use crate::virtualization::VisibleWindow;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// querytree - browse and reorganize a saved-query tree
#[derive(Parser)]
#[command(name = "querytree")]
#[command(about = "Browse, rename and move nodes of a saved-query tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides workspace config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed file (json, yaml or toml) loaded into the in-memory store
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging settings with command-line flags applied over `base`
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        config.file =
            resolve_log_file_path(self.log_file.clone(), config.file.take(), Some(&self.workspace))
                .ok();
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the children of a folder (root when --id is omitted)
    Children {
        #[arg(long)]
        id: Option<NodeID>,
        /// Return full node records instead of ids
        #[arg(long)]
        with_data: bool,
        #[arg(long, default_value = "json", value_parser = ["json", "text"])]
        format: String,
    },
    /// Show one node (root when --id is omitted)
    Item {
        #[arg(long)]
        id: Option<NodeID>,
    },
    /// Show a node's parent id
    Parent {
        #[arg(long)]
        id: NodeID,
    },
    /// Move a node under another folder
    Move {
        #[arg(long)]
        id: NodeID,
        /// Destination folder
        #[arg(long)]
        to: NodeID,
    },
    /// Rename a node
    Rename {
        #[arg(long)]
        id: NodeID,
        #[arg(long)]
        name: String,
    },
    /// Render the tree as the client sees it
    Tree {
        /// Folder to expand, in order; repeatable
        #[arg(long)]
        expand: Vec<NodeID>,
        /// Expand every folder the depth policy allows
        #[arg(long)]
        expand_all: bool,
        /// Scroll offset in pixels
        #[arg(long, default_value = "0")]
        scroll: u32,
        /// Read from the configured HTTP endpoint instead of the local store
        #[arg(long)]
        remote: bool,
    },
}

/// CLI context for command execution
pub struct CliContext {
    config: QueryTreeConfig,
    store: Arc<NodeStore>,
    router: TreeRouter,
    color: bool,
}

impl CliContext {
    /// Load configuration and seed the in-memory store
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        seed_path: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };

        let seed_path = seed_path.or_else(|| {
            config
                .tree
                .seed_path
                .as_deref()
                .map(|p| resolve_in_workspace(&workspace_root, p))
        });
        let mut seed = match &seed_path {
            Some(path) => SeedFile::load(path)?,
            None => demo_seed(),
        };
        seed.root_name
            .get_or_insert_with(|| config.tree.root_name.clone());

        let store = Arc::new(NodeStore::from_seed(&seed)?);
        info!(
            nodes = store.len(),
            seed = ?seed_path,
            "Loaded query tree"
        );
        Ok(Self::with_store(config, store))
    }

    /// Context over an existing store
    pub fn with_store(config: QueryTreeConfig, store: Arc<NodeStore>) -> Self {
        let (query, mutation) = services(store.clone());
        let router = TreeRouter::new(query, mutation, &config.http.prefix);
        Self {
            config,
            store,
            router,
            color: false,
        }
    }

    /// Enable ANSI colors in rendered trees
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn config(&self) -> &QueryTreeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<NodeStore> {
        &self.store
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Tree {
                expand,
                expand_all,
                scroll,
                remote,
            } => self.render_tree(expand, *expand_all, *scroll, *remote),
            Commands::Children {
                with_data, format, ..
            } if format == "text" => {
                let response = self.dispatch(command)?;
                format_children_table(&response, *with_data)
            }
            _ => {
                let response = self.dispatch(command)?;
                serde_json::to_string_pretty(&response.body)
                    .map_err(|e| ApiError::RequestFailed(format!("Failed to encode response: {}", e)))
            }
        }
    }

    fn dispatch(&self, command: &Commands) -> Result<HttpResponse, ApiError> {
        let request = self.request_for(command)?;
        let response = self.router.handle(&request);
        if response.is_success() {
            return Ok(response);
        }
        Err(ApiError::Remote {
            status: response.status,
            message: response
                .error_message()
                .unwrap_or("request failed")
                .to_string(),
        })
    }

    fn request_for(&self, command: &Commands) -> Result<HttpRequest, ApiError> {
        let path = |endpoint: &str| format!("{}/{}", self.router.prefix(), endpoint);
        let with_id = |request: HttpRequest, id: &Option<NodeID>| match id {
            Some(id) => request.with_query("id", id.as_str()),
            None => request,
        };

        let request = match command {
            Commands::Children { id, with_data, .. } => {
                let endpoint = if *with_data {
                    "children-with-data"
                } else {
                    "children"
                };
                with_id(HttpRequest::get(path(endpoint)), id)
            }
            Commands::Item { id } => with_id(HttpRequest::get(path("item")), id),
            Commands::Parent { id } => HttpRequest::get(path("parent")).with_query("id", id.as_str()),
            Commands::Move { id, to } => {
                HttpRequest::post_json(path("move"), &json!({ "id": id, "newParentId": to }))
            }
            Commands::Rename { id, name } => {
                HttpRequest::post_json(path("rename"), &json!({ "id": id, "name": name }))
            }
            Commands::Tree { .. } => return Err(ApiError::Unsupported("tree request")),
        };
        Ok(request)
    }

    fn render_tree(
        &self,
        expand: &[NodeID],
        expand_all: bool,
        scroll: u32,
        remote: bool,
    ) -> Result<String, ApiError> {
        let source: Arc<dyn TreeDataSource> = if remote {
            Arc::new(HttpDataSource::new(&self.config.http)?)
        } else {
            Arc::new(LocalDataSource::new(self.store.clone()))
        };
        let adapter = TreeAdapter::new(source, &self.config.adapter);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to start async runtime: {}", e)))?;

        runtime.block_on(async {
            adapter.expand(ROOT_ID).await?;
            if expand_all {
                expand_everything(&adapter).await?;
            }
            for id in expand {
                if adapter.expand(id).await? == ExpandOutcome::NotExpandable {
                    warn!(node_id = %id, "Not expandable at its depth");
                }
            }
            let (window, _) = adapter.window(&self.config.view, scroll);
            adapter.hydrate(window.range()).await?;
            Ok::<(), ApiError>(())
        })?;

        let (window, rows) = adapter.window(&self.config.view, scroll);
        let total = adapter.visible_rows().len();
        Ok(format_rows(&window, &rows, total, self.color))
    }
}

fn resolve_in_workspace(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        workspace_root.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Breadth-first expand of every folder the depth policy allows
async fn expand_everything(adapter: &TreeAdapter) -> Result<(), ApiError> {
    let mut queue: VecDeque<NodeID> = adapter.children(ROOT_ID).unwrap_or_default().into();
    while let Some(id) = queue.pop_front() {
        if adapter.expand(&id).await? == ExpandOutcome::NotExpandable {
            continue;
        }
        queue.extend(adapter.children(&id).unwrap_or_default());
    }
    Ok(())
}

fn format_children_table(response: &HttpResponse, with_data: bool) -> Result<String, ApiError> {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    if with_data {
        let nodes: Vec<Node> = serde_json::from_value(response.body.clone())
            .map_err(|e| ApiError::RequestFailed(format!("Unexpected response: {}", e)))?;
        table.set_header(vec!["Id", "Kind", "Name"]);
        for node in nodes {
            let kind = if node.is_folder() { "folder" } else { "file" };
            table.add_row(vec![node.id, kind.to_string(), node.name]);
        }
    } else {
        let ids: Vec<NodeID> = serde_json::from_value(response.body.clone())
            .map_err(|e| ApiError::RequestFailed(format!("Unexpected response: {}", e)))?;
        table.set_header(vec!["Id"]);
        for id in ids {
            table.add_row(vec![id]);
        }
    }
    Ok(table.to_string())
}

fn format_rows(window: &VisibleWindow, rows: &[TreeRow], total: usize, color: bool) -> String {
    let mut out = String::new();
    for row in rows {
        let marker = match (row.expandable, row.expanded) {
            (true, true) => "▾",
            (true, false) => "▸",
            (false, _) => " ",
        };
        let name = item_name(&row.item);
        let label = match (&row.item, color) {
            (_, false) => name.to_string(),
            (TreeItem::Loading(_), true) => name.dimmed().to_string(),
            (_, true) if row.expandable => name.blue().bold().to_string(),
            (_, true) => name.to_string(),
        };
        out.push_str(&format!("{}{} {}\n", "  ".repeat(row.depth), marker, label));
    }
    let footer = if total == 0 {
        "(empty)".to_string()
    } else {
        format!("rows {}-{} of {}", window.start + 1, window.end, total)
    };
    out.push_str(&footer);
    out
}
