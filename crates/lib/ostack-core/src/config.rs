use std::error::Error;
use std::fmt;

/// Project domain used when none is configured.
pub const DEFAULT_PROJECT_DOMAIN_NAME: &str = "default";
/// User domain used when none is configured.
pub const DEFAULT_USER_DOMAIN_NAME: &str = "default";
/// Region used when none is configured.
pub const DEFAULT_REGION_NAME: &str = "RegionOne";

/// OpenStack authentication settings resolved from the environment.
///
/// Blank strings in the optional credential fields count as absent.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub auth_url: String,
    pub project_name: String,
    pub project_domain_name: String,
    pub region_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_domain_name: String,
    pub application_credential_id: Option<String>,
    pub application_credential_secret: Option<String>,
}

/// Credential mode selected from an [`AuthConfig`].
///
/// Decided once, at session-construction time. Password auth wins when both
/// pairs are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Password {
        username: String,
        password: String,
        user_domain_name: String,
    },
    ApplicationCredential {
        id: String,
        secret: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    NoCredentials,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(
                f,
                "no valid authentication method configured; set a username/password pair or an application credential pair"
            ),
        }
    }
}

impl Error for AuthError {}

impl AuthConfig {
    /// Whether a usable username/password pair is configured.
    #[must_use]
    pub fn has_password_auth(&self) -> bool {
        present(&self.username) && present(&self.password)
    }

    /// Whether a usable application credential pair is configured.
    #[must_use]
    pub fn has_app_credential_auth(&self) -> bool {
        present(&self.application_credential_id) && present(&self.application_credential_secret)
    }

    /// Selects the credential mode, password auth first.
    ///
    /// # Errors
    /// Returns [`AuthError::NoCredentials`] when neither pair is usable.
    pub fn auth_mode(&self) -> Result<AuthMode, AuthError> {
        if self.has_password_auth() {
            Ok(AuthMode::Password {
                username: self.username.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
                user_domain_name: self.user_domain_name.clone(),
            })
        } else if self.has_app_credential_auth() {
            Ok(AuthMode::ApplicationCredential {
                id: self.application_credential_id.clone().unwrap_or_default(),
                secret: self
                    .application_credential_secret
                    .clone()
                    .unwrap_or_default(),
            })
        } else {
            Err(AuthError::NoCredentials)
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}
