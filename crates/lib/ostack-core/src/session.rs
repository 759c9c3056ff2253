use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::info;

use crate::compute::ServerRecord;
use crate::config::{AuthConfig, AuthError, AuthMode};

/// Failure surface of the compute backend boundary.
#[derive(Debug)]
pub enum BackendError {
    /// The cloud reported the failure (auth rejection, quota, bad request).
    Cloud(String),
    /// Anything outside the cloud's error contract (transport, decoding).
    Other(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud(message) | Self::Other(message) => f.write_str(message),
        }
    }
}

impl Error for BackendError {}

/// An authenticated handle to the compute backend.
///
/// Shared, read-only, and owned by the [`SessionManager`] for the process
/// lifetime; there is no invalidation path.
#[async_trait]
pub trait ComputeSession: Send + Sync {
    /// Runs one server-listing query with the merged parameter map from
    /// [`crate::compute::ListServersRequest::merged_params`].
    ///
    /// # Errors
    /// [`BackendError::Cloud`] when the backend rejects or fails the query,
    /// [`BackendError::Other`] for anything outside its error contract.
    async fn list_servers(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Vec<ServerRecord>, BackendError>;
}

pub type ConnectFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn ComputeSession>, BackendError>> + Send + 'static>>;
pub type ConnectFn = Arc<dyn Fn(AuthConfig, AuthMode) -> ConnectFuture + Send + Sync + 'static>;

#[derive(Debug)]
pub enum SessionError {
    Auth(AuthError),
    Connect(BackendError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(err) => write!(f, "{err}"),
            Self::Connect(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {}

/// Owns the single backend session for the process lifetime.
pub struct SessionManager {
    config: AuthConfig,
    connect: ConnectFn,
    session: OnceCell<Arc<dyn ComputeSession>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: AuthConfig, connect: ConnectFn) -> Self {
        Self {
            config,
            connect,
            session: OnceCell::new(),
        }
    }

    /// Returns the shared session, establishing it on first use.
    ///
    /// Concurrent first callers share one construction. The credential mode
    /// resolves before any network activity, so a configuration without
    /// credentials fails without a connection attempt. A failed construction
    /// leaves the cell empty and the next call retries.
    ///
    /// # Errors
    /// [`SessionError::Auth`] when no credential pair is usable,
    /// [`SessionError::Connect`] when the backend handshake fails.
    pub async fn get_or_init(&self) -> Result<Arc<dyn ComputeSession>, SessionError> {
        let session = self
            .session
            .get_or_try_init(|| async {
                let mode = self.config.auth_mode().map_err(SessionError::Auth)?;
                let session = (self.connect)(self.config.clone(), mode)
                    .await
                    .map_err(SessionError::Connect)?;
                info!(
                    auth_url = %self.config.auth_url,
                    region = %self.config.region_name,
                    "compute session established"
                );
                Ok(session)
            })
            .await?;
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::{
        DEFAULT_PROJECT_DOMAIN_NAME,
        DEFAULT_REGION_NAME,
        DEFAULT_USER_DOMAIN_NAME,
    };

    struct StaticSession;

    #[async_trait]
    impl ComputeSession for StaticSession {
        async fn list_servers(
            &self,
            _params: &Map<String, Value>,
        ) -> Result<Vec<ServerRecord>, BackendError> {
            Ok(Vec::new())
        }
    }

    fn counting_connector(calls: Arc<AtomicUsize>) -> ConnectFn {
        Arc::new(move |_config, _mode| {
            let calls = calls.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(StaticSession) as Arc<dyn ComputeSession>)
            })
        })
    }

    fn flaky_connector(calls: Arc<AtomicUsize>) -> ConnectFn {
        Arc::new(move |_config, _mode| {
            let calls = calls.clone();
            Box::pin(async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                if attempt == 0 {
                    Err(BackendError::Other("connection refused".to_string()))
                } else {
                    Ok(Arc::new(StaticSession) as Arc<dyn ComputeSession>)
                }
            })
        })
    }

    fn password_config() -> AuthConfig {
        AuthConfig {
            auth_url: "https://keystone.example:5000/v3".to_string(),
            project_name: "demo".to_string(),
            project_domain_name: DEFAULT_PROJECT_DOMAIN_NAME.to_string(),
            region_name: DEFAULT_REGION_NAME.to_string(),
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            user_domain_name: DEFAULT_USER_DOMAIN_NAME.to_string(),
            application_credential_id: None,
            application_credential_secret: None,
        }
    }

    fn credentialless_config() -> AuthConfig {
        AuthConfig {
            username: None,
            password: None,
            ..password_config()
        }
    }

    #[tokio::test]
    async fn concurrent_first_use_builds_one_session() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = Arc::new(SessionManager::new(
            password_config(),
            counting_connector(calls.clone()),
        ));

        let left = manager.clone();
        let right = manager.clone();
        let (a, b) = tokio::join!(left.get_or_init(), right.get_or_init());

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_use_reuses_the_session() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = SessionManager::new(password_config(), counting_connector(calls.clone()));

        manager.get_or_init().await.expect("first call");
        manager.get_or_init().await.expect("second call");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_connecting() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = SessionManager::new(
            credentialless_config(),
            counting_connector(calls.clone()),
        );

        let result = manager.get_or_init().await;

        assert!(matches!(
            result,
            Err(SessionError::Auth(AuthError::NoCredentials))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_construction_retries_on_the_next_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = SessionManager::new(password_config(), flaky_connector(calls.clone()));

        let first = manager.get_or_init().await;
        assert!(matches!(first, Err(SessionError::Connect(_))));

        let second = manager.get_or_init().await;
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
