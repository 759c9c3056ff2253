//! Thin Keystone/Nova client behind the [`ComputeSession`] boundary.
//!
//! One token handshake per process: authenticate against the identity
//! service, pick the region's public compute endpoint out of the service
//! catalog, then answer listings with plain token-authenticated queries.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::compute::ServerRecord;
use crate::config::{AuthConfig, AuthMode};
use crate::session::{BackendError, ComputeSession, ConnectFn};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const COMPUTE_SERVICE_TYPE: &str = "compute";
const PUBLIC_INTERFACE: &str = "public";

/// Token-authenticated session bound to one region's compute endpoint.
pub struct KeystoneSession {
    http: reqwest::Client,
    token: String,
    compute_url: String,
}

/// Production connector for [`crate::session::SessionManager`].
#[must_use]
pub fn connector() -> ConnectFn {
    let connect: ConnectFn = Arc::new(|config: AuthConfig, mode: AuthMode| {
        Box::pin(async move {
            let session = KeystoneSession::connect(&config, &mode).await?;
            Ok(Arc::new(session) as Arc<dyn ComputeSession>)
        })
    });
    connect
}

impl KeystoneSession {
    /// Authenticates against Keystone and locates the compute endpoint.
    ///
    /// # Errors
    /// [`BackendError::Cloud`] when the identity service rejects the request
    /// or the catalog lacks a usable endpoint, [`BackendError::Other`] for
    /// transport and decoding failures.
    pub async fn connect(config: &AuthConfig, mode: &AuthMode) -> Result<Self, BackendError> {
        let http = reqwest::Client::new();
        let token_url = format!("{}/auth/tokens", config.auth_url.trim_end_matches('/'));

        let response = http
            .post(&token_url)
            .json(&auth_payload(config, mode))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(cloud_failure("authentication failed", status, &body));
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                BackendError::Cloud(format!(
                    "token response missing {SUBJECT_TOKEN_HEADER} header"
                ))
            })?;

        let body: TokenResponse = response.json().await.map_err(transport)?;
        let compute_url = compute_endpoint(&body.token.catalog, &config.region_name)?;
        debug!(%compute_url, "resolved compute endpoint");

        Ok(Self {
            http,
            token,
            compute_url,
        })
    }
}

#[async_trait]
impl ComputeSession for KeystoneSession {
    async fn list_servers(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Vec<ServerRecord>, BackendError> {
        let detailed = params
            .get("detailed")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let path = if detailed { "servers/detail" } else { "servers" };
        let url = format!("{}/{path}", self.compute_url.trim_end_matches('/'));

        let mut query = Vec::new();
        for (key, value) in params {
            match key.as_str() {
                "detailed" => {}
                // Nova spells the cross-project flag `all_tenants`.
                "all_projects" => {
                    if value.as_bool().unwrap_or(false) {
                        query.push(("all_tenants".to_string(), "true".to_string()));
                    }
                }
                _ => query.push((key.clone(), query_text(value))),
            }
        }

        let response = self
            .http
            .get(&url)
            .header(AUTH_TOKEN_HEADER, &self.token)
            .query(&query)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(cloud_failure("server listing failed", status, &body));
        }

        let body: ServersResponse = response.json().await.map_err(transport)?;
        Ok(body.servers)
    }
}

fn auth_payload(config: &AuthConfig, mode: &AuthMode) -> Value {
    match mode {
        AuthMode::Password {
            username,
            password,
            user_domain_name,
        } => json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": username,
                            "domain": { "name": user_domain_name },
                            "password": password
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": config.project_name,
                        "domain": { "name": config.project_domain_name }
                    }
                }
            }
        }),
        // Application credentials are pre-scoped; Keystone rejects an
        // explicit scope alongside them.
        AuthMode::ApplicationCredential { id, secret } => json!({
            "auth": {
                "identity": {
                    "methods": ["application_credential"],
                    "application_credential": { "id": id, "secret": secret }
                }
            }
        }),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    interface: String,
    region: Option<String>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ServersResponse {
    #[serde(default)]
    servers: Vec<ServerRecord>,
}

fn compute_endpoint(catalog: &[CatalogEntry], region: &str) -> Result<String, BackendError> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == COMPUTE_SERVICE_TYPE)
        .flat_map(|entry| entry.endpoints.iter())
        .find(|endpoint| {
            endpoint.interface == PUBLIC_INTERFACE
                && endpoint
                    .region
                    .as_deref()
                    .is_none_or(|endpoint_region| endpoint_region == region)
        })
        .map(|endpoint| endpoint.url.clone())
        .ok_or_else(|| {
            BackendError::Cloud(format!(
                "no public compute endpoint for region {region} in the service catalog"
            ))
        })
}

fn cloud_failure(context: &str, status: reqwest::StatusCode, body: &str) -> BackendError {
    let body = body.trim();
    if body.is_empty() {
        BackendError::Cloud(format!("{context} ({status})"))
    } else {
        BackendError::Cloud(format!("{context} ({status}): {body}"))
    }
}

fn query_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Other(err.to_string())
}
