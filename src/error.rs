//! Error types shared by the store, the services, the HTTP surface and the client.

use crate::types::NodeID;
use thiserror::Error;

/// Coarse classification surfaced at the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this kind
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => 400,
            ErrorKind::Internal => 500,
        }
    }
}

/// Errors produced by tree operations.
///
/// `Clone` so that one failed load can be handed to every caller awaiting it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeID),

    #[error("Node {0} is a file and has no children")]
    NoChildren(NodeID),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("The root node cannot be renamed or moved")]
    RootImmutable,

    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeID),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Operation not supported by this data source: {0}")]
    Unsupported(&'static str),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NodeNotFound(_) | ApiError::NoChildren(_) => ErrorKind::NotFound,
            ApiError::MissingField(_)
            | ApiError::EmptyName
            | ApiError::InvalidName(_)
            | ApiError::InvalidMove(_)
            | ApiError::RootImmutable
            | ApiError::DuplicateNode(_) => ErrorKind::BadRequest,
            ApiError::Remote { status: 404, .. } => ErrorKind::NotFound,
            ApiError::Remote { status: 400, .. } => ErrorKind::BadRequest,
            ApiError::ConfigError(_)
            | ApiError::RequestFailed(_)
            | ApiError::Remote { .. }
            | ApiError::Unsupported(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::RequestFailed(err.to_string())
    }
}
