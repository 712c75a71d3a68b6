//! Error types shared by the stamping and publishing workflows

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("missing configuration value(s): {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("authentication failed: HTTP {status} - {body}")]
    Auth { status: u16, body: String },

    #[error("no user registered for email: {0}")]
    UserNotFound(String),

    #[error("database access denied for {path}: HTTP {status}")]
    Unauthorized { path: String, status: u16 },

    #[error("database request for {path} failed: HTTP {status} - {body}")]
    Database {
        path: String,
        status: u16,
        body: String,
    },

    #[error("device not found in the database: {0}")]
    DeviceNotFound(String),

    #[error("invalid build number: {0:?}")]
    InvalidBuildNumber(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("database url cannot hold paths: {0}")]
    InvalidDatabaseUrl(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// True for failures raised before any remote call was attempted.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            DeployError::MissingConfig(_)
                | DeployError::Credentials(_)
                | DeployError::InvalidBuildNumber(_)
                | DeployError::InvalidDatabaseUrl(_)
                | DeployError::Url(_)
                | DeployError::Io(_)
        )
    }
}

pub type DeployResult<T> = std::result::Result<T, DeployError>;
