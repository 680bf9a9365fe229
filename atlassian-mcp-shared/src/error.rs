//! Error types for the Atlassian MCP server

use crate::auth::CredentialsRequired;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlassianError>;

#[derive(Error, Debug)]
pub enum AtlassianError {
    /// No token in the secure store or the environment. Carries remediation
    /// steps so callers can render guidance instead of a bare message.
    #[error("{0}")]
    CredentialsRequired(Box<CredentialsRequired>),

    /// Local validation failed before (or instead of) persisting anything.
    #[error("{0}")]
    Validation(String),

    /// The secure secret store itself is unavailable or misbehaving.
    #[error("Secure store error: {0}")]
    SecureStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("MCP protocol error: {0}")]
    Mcp(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AtlassianError {
    /// Stable name of the variant, reported to clients as `exception_type`
    pub fn kind_name(&self) -> &'static str {
        match self {
            AtlassianError::CredentialsRequired(_) => "CredentialsRequired",
            AtlassianError::Validation(_) => "ValidationError",
            AtlassianError::SecureStore(_) => "SecureStoreError",
            AtlassianError::Config(_) => "ConfigError",
            AtlassianError::Network(_) => "NetworkError",
            AtlassianError::Io(_) => "IoError",
            AtlassianError::Json(_) => "JsonError",
            AtlassianError::UrlParse(_) => "UrlParseError",
            AtlassianError::Mcp(_) => "McpError",
            AtlassianError::Unknown(_) => "UnknownError",
        }
    }
}

impl From<CredentialsRequired> for AtlassianError {
    fn from(err: CredentialsRequired) -> Self {
        AtlassianError::CredentialsRequired(Box::new(err))
    }
}
