use std::error::Error;
use std::fmt;
use std::net::SocketAddr;

use clap::{Parser, builder::BoolishValueParser};
use ostack_core::config::{
    AuthConfig,
    DEFAULT_PROJECT_DOMAIN_NAME,
    DEFAULT_REGION_NAME,
    DEFAULT_USER_DOMAIN_NAME,
};
use tracing::Level;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:4030";

#[derive(Parser, Debug)]
#[command(name = "ostack-mcpd", version, about = "OpenStack MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "OS_AUTH_URL")]
    auth_url: Option<String>,

    #[arg(long, env = "OS_PROJECT_NAME")]
    project_name: Option<String>,

    #[arg(long, env = "OS_PROJECT_DOMAIN_NAME", default_value = DEFAULT_PROJECT_DOMAIN_NAME)]
    project_domain_name: String,

    #[arg(long, env = "OS_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "OS_PASSWORD")]
    password: Option<String>,

    #[arg(long, env = "OS_USER_DOMAIN_NAME", default_value = DEFAULT_USER_DOMAIN_NAME)]
    user_domain_name: String,

    #[arg(long, env = "OS_REGION_NAME", default_value = DEFAULT_REGION_NAME)]
    region_name: String,

    #[arg(long, env = "OS_APPLICATION_CREDENTIAL_ID")]
    application_credential_id: Option<String>,

    #[arg(long, env = "OS_APPLICATION_CREDENTIAL_SECRET")]
    application_credential_secret: Option<String>,

    #[arg(long, env = "MCP_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    #[arg(
        long = "http",
        env = "MCP_HTTP_SERVE",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    http_serve: bool,

    #[arg(long, env = "MCP_HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    http_addr: SocketAddr,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct OstackConfig {
    pub auth: AuthConfig,
    pub log_level: Level,
    pub http_serve: bool,
    pub http_addr: SocketAddr,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl OstackConfig {
    /// Parses CLI arguments and the environment into a validated config.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when a required setting is missing or a
    /// value fails to parse.
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for OstackConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let auth_url = args
            .auth_url
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("OS_AUTH_URL"))?;
        let project_name = args
            .project_name
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("OS_PROJECT_NAME"))?;

        let log_level = match args.log_level.parse::<Level>() {
            Ok(level) => level,
            Err(_) => {
                return Err(ConfigError::InvalidSetting {
                    name: "MCP_LOG_LEVEL",
                    value: args.log_level,
                });
            }
        };

        let username = args.username.filter(|value| !value.trim().is_empty());
        let password = args.password.filter(|value| !value.trim().is_empty());
        let application_credential_id = args
            .application_credential_id
            .filter(|value| !value.trim().is_empty());
        let application_credential_secret = args
            .application_credential_secret
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            auth: AuthConfig {
                auth_url,
                project_name,
                project_domain_name: args.project_domain_name,
                region_name: args.region_name,
                username,
                password,
                user_domain_name: args.user_domain_name,
                application_credential_id,
                application_credential_secret,
            },
            log_level,
            http_serve: args.http_serve,
            http_addr: args.http_addr,
        })
    }
}
