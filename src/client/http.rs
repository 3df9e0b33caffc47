//! Remote data source speaking the tree HTTP endpoints.

use super::source::{SourceCapabilities, TreeDataSource};
use crate::config::HttpConfig;
use crate::error::ApiError;
use crate::service::{MoveOutcome, RenameOutcome};
use crate::tree::Node;
use crate::types::NodeID;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// reqwest-backed [`TreeDataSource`]
pub struct HttpDataSource {
    client: reqwest::Client,
    base: String,
    capabilities: SourceCapabilities,
}

impl HttpDataSource {
    pub fn new(config: &HttpConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base: endpoint_base(&config.base_url, &config.prefix),
            capabilities: SourceCapabilities {
                children_with_data: config.children_with_data,
            },
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base, endpoint)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, id: &str) -> Result<T, ApiError> {
        debug!(endpoint, node_id = %id, "GET tree endpoint");
        let response = self
            .client
            .get(self.url(endpoint))
            .query(&[("id", id)])
            .send()
            .await?;
        decode(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        debug!(endpoint, "POST tree endpoint");
        let response = self.client.post(self.url(endpoint)).json(&body).send().await?;
        decode(response).await
    }
}

fn endpoint_base(base_url: &str, prefix: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        prefix.trim_matches('/')
    )
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let text = response.text().await.unwrap_or_default();
    Err(remote_error(status.as_u16(), &text))
}

/// Error for a non-2xx response; prefers the `{ "error": .. }` message
fn remote_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());
    ApiError::Remote { status, message }
}

#[async_trait]
impl TreeDataSource for HttpDataSource {
    fn capabilities(&self) -> SourceCapabilities {
        self.capabilities
    }

    async fn load_item(&self, id: &str) -> Result<Node, ApiError> {
        self.get("item", id).await
    }

    async fn load_children(&self, id: &str) -> Result<Vec<NodeID>, ApiError> {
        self.get("children", id).await
    }

    async fn load_children_with_data(&self, id: &str) -> Result<Vec<Node>, ApiError> {
        self.get("children-with-data", id).await
    }

    async fn move_node(&self, id: &str, new_parent_id: &str) -> Result<MoveOutcome, ApiError> {
        self.post("move", json!({ "id": id, "newParentId": new_parent_id }))
            .await
    }

    async fn rename_node(&self, id: &str, name: &str) -> Result<RenameOutcome, ApiError> {
        self.post("rename", json!({ "id": id, "name": name })).await
    }
}
