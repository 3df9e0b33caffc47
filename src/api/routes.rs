//! Endpoint routing for the tree resource.

use super::{HttpRequest, HttpResponse, Method};
use crate::error::ApiError;
use crate::service::{TreeMutationService, TreeQueryService};
use crate::store::NodeStore;
use crate::types::NodeID;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Default path namespace for the tree endpoints
pub const DEFAULT_PREFIX: &str = "/api/fs-tree";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveBody {
    #[serde(default)]
    id: Option<NodeID>,
    #[serde(default)]
    new_parent_id: Option<NodeID>,
}

#[derive(Debug, Deserialize)]
struct RenameBody {
    #[serde(default)]
    id: Option<NodeID>,
    #[serde(default)]
    name: Option<String>,
}

enum Endpoint {
    Children,
    ChildrenWithData,
    Item,
    Parent,
    Move,
    Rename,
}

impl Endpoint {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "children" => Some(Endpoint::Children),
            "children-with-data" => Some(Endpoint::ChildrenWithData),
            "item" => Some(Endpoint::Item),
            "parent" => Some(Endpoint::Parent),
            "move" => Some(Endpoint::Move),
            "rename" => Some(Endpoint::Rename),
            _ => None,
        }
    }

    fn method(&self) -> Method {
        match self {
            Endpoint::Move | Endpoint::Rename => Method::Post,
            _ => Method::Get,
        }
    }
}

/// Dispatches tree requests to the query and mutation services
#[derive(Clone)]
pub struct TreeRouter {
    query: TreeQueryService,
    mutation: TreeMutationService,
    prefix: String,
}

impl TreeRouter {
    pub fn new(query: TreeQueryService, mutation: TreeMutationService, prefix: &str) -> Self {
        Self {
            query,
            mutation,
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Router over a store with the default namespace
    pub fn for_store(store: Arc<NodeStore>) -> Self {
        let (query, mutation) = crate::service::services(store);
        Self::new(query, mutation, DEFAULT_PREFIX)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let response = self.dispatch(request);
        debug!(
            method = ?request.method,
            path = %request.path,
            status = response.status,
            "Handled tree request"
        );
        response
    }

    fn dispatch(&self, request: &HttpRequest) -> HttpResponse {
        let endpoint = request
            .path
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.trim_end_matches('/'))
            .and_then(Endpoint::from_segment);

        let Some(endpoint) = endpoint else {
            return HttpResponse::error(404, format!("No route for {}", request.path));
        };
        if endpoint.method() != request.method {
            return HttpResponse::error(405, format!("Method not allowed for {}", request.path));
        }

        let result = match endpoint {
            Endpoint::Children => self.children(request),
            Endpoint::ChildrenWithData => self.children_with_data(request),
            Endpoint::Item => self.item(request),
            Endpoint::Parent => self.parent(request),
            Endpoint::Move => self.move_node(request),
            Endpoint::Rename => self.rename(request),
        };

        match result {
            Ok(body) => HttpResponse::ok(body),
            Err(RouteError::Api(e)) => HttpResponse::error(e.status_code(), e.to_string()),
            Err(RouteError::MalformedBody(msg)) => HttpResponse::error(400, msg),
        }
    }

    fn children(&self, request: &HttpRequest) -> Result<Value, RouteError> {
        let ids = self.query.get_children_ids(request.param("id"))?;
        Ok(json!(ids))
    }

    fn children_with_data(&self, request: &HttpRequest) -> Result<Value, RouteError> {
        let nodes = self.query.get_children_with_data(request.param("id"))?;
        Ok(json!(nodes))
    }

    fn item(&self, request: &HttpRequest) -> Result<Value, RouteError> {
        let node = self.query.get_item(request.param("id"))?;
        Ok(json!(node))
    }

    fn parent(&self, request: &HttpRequest) -> Result<Value, RouteError> {
        let id = request.param("id").ok_or(ApiError::MissingField("id"))?;
        let parent_id = self.query.get_parent_id(id)?;
        Ok(json!({ "parentId": parent_id }))
    }

    fn move_node(&self, request: &HttpRequest) -> Result<Value, RouteError> {
        let body: MoveBody = parse_body(request)?;
        let id = non_empty(body.id).ok_or(ApiError::MissingField("id"))?;
        let new_parent_id =
            non_empty(body.new_parent_id).ok_or(ApiError::MissingField("newParentId"))?;

        let outcome = self.mutation.move_node(&id, &new_parent_id)?;
        Ok(json!({
            "ok": true,
            "oldParentId": outcome.old_parent_id,
            "newParentId": outcome.new_parent_id,
        }))
    }

    fn rename(&self, request: &HttpRequest) -> Result<Value, RouteError> {
        let body: RenameBody = parse_body(request)?;
        let id = non_empty(body.id).ok_or(ApiError::MissingField("id"))?;
        let name = body.name.ok_or(ApiError::MissingField("name"))?;

        let outcome = self.mutation.rename_node(&id, &name)?;
        Ok(json!({ "ok": true, "parentId": outcome.parent_id }))
    }
}

enum RouteError {
    Api(ApiError),
    MalformedBody(String),
}

impl From<ApiError> for RouteError {
    fn from(err: ApiError) -> Self {
        RouteError::Api(err)
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(request: &HttpRequest) -> Result<T, RouteError> {
    let raw = request.body.as_deref().unwrap_or("{}");
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| RouteError::MalformedBody(format!("Invalid JSON body: {}", e)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
