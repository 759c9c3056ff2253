//! The server-listing control plane.
//!
//! Builds the merged parameter map, runs the query through the shared
//! session, and normalizes every outcome into the success/error envelope.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::error;

use crate::session::{BackendError, SessionError, SessionManager};

/// Opaque backend-defined description of one compute instance.
pub type ServerRecord = Map<String, Value>;

/// A validated request for the server-listing query.
#[derive(Debug, Clone)]
pub struct ListServersRequest {
    pub detailed: bool,
    pub all_projects: bool,
    pub filters: Option<Map<String, Value>>,
    pub limit: Option<u32>,
    pub marker: Option<String>,
}

impl Default for ListServersRequest {
    fn default() -> Self {
        Self {
            detailed: true,
            all_projects: false,
            filters: None,
            limit: None,
            marker: None,
        }
    }
}

impl ListServersRequest {
    /// Builds the parameter map handed to the backend.
    ///
    /// Base keys first, then filters merged on top (later keys win), then
    /// `limit` and `marker`. A zero limit and a blank marker are treated as
    /// unset.
    #[must_use]
    pub fn merged_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("detailed".to_string(), Value::Bool(self.detailed));
        params.insert("all_projects".to_string(), Value::Bool(self.all_projects));
        if let Some(filters) = &self.filters {
            for (key, value) in filters {
                params.insert(key.clone(), value.clone());
            }
        }
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            params.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(marker) = self.marker.as_deref().filter(|marker| !marker.is_empty()) {
            params.insert("marker".to_string(), Value::from(marker));
        }
        params
    }
}

/// Successful listing. `count` always equals `servers.len()`.
#[derive(Debug, Clone)]
pub struct ServerListing {
    pub servers: Vec<ServerRecord>,
    pub count: usize,
}

impl ServerListing {
    #[must_use]
    pub fn new(servers: Vec<ServerRecord>) -> Self {
        let count = servers.len();
        Self { servers, count }
    }
}

/// Distinguishes cloud-reported failures from everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    Backend,
    Unexpected,
}

/// Normalized query failure; `message` is the caller-facing text.
#[derive(Debug, Clone)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for QueryError {}

/// Outcome of one server-listing query.
pub type QueryResult = Result<ServerListing, QueryError>;

/// Read-only control plane over the shared compute session.
#[derive(Clone)]
pub struct ComputeControl {
    sessions: Arc<SessionManager>,
}

impl ComputeControl {
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Lists servers, materializing the full result eagerly.
    ///
    /// Nothing raised below this call crosses the tool boundary: cloud
    /// failures become [`QueryErrorKind::Backend`], everything else
    /// (including a missing credential configuration) becomes
    /// [`QueryErrorKind::Unexpected`].
    ///
    /// # Errors
    /// Every failure is returned as a [`QueryError`] value with a non-empty
    /// caller-facing message.
    pub async fn list_servers(&self, request: &ListServersRequest) -> QueryResult {
        let params = request.merged_params();
        let session = match self.sessions.get_or_init().await {
            Ok(session) => session,
            Err(SessionError::Auth(err)) => return Err(unexpected(err.to_string())),
            Err(SessionError::Connect(err)) => return Err(backend_failure(err)),
        };
        match session.list_servers(&params).await {
            Ok(servers) => Ok(ServerListing::new(servers)),
            Err(err) => Err(backend_failure(err)),
        }
    }
}

fn backend_failure(err: BackendError) -> QueryError {
    match err {
        BackendError::Cloud(message) => {
            error!(%message, "failed to list servers");
            QueryError {
                kind: QueryErrorKind::Backend,
                message: format!("Failed to list servers: {message}"),
            }
        }
        BackendError::Other(message) => unexpected(message),
    }
}

fn unexpected(message: String) -> QueryError {
    error!(%message, "unexpected error listing servers");
    QueryError {
        kind: QueryErrorKind::Unexpected,
        message: format!("Unexpected error: {message}"),
    }
}
