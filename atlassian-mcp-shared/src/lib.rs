//! Shared configuration, credential and auth types for the Atlassian MCP server

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod env;
pub mod error;
pub mod identity;
pub mod redaction;
pub mod result;

pub use auth::{
    classify_remote_error, AuthManager, CredentialsRequired, Remediation, RemediationStep,
    SetupOption, StepDetail, SETUP_TOOL,
};
pub use client::AtlassianClient;
pub use config::{
    setup_guidance, EndpointConfig, LogLevel, LoggingConfig, ServerSettings, TransportConfig,
    DEFAULT_TOOL_PREFIX,
};
pub use credentials::{
    CredentialStore, CredentialToken, InMemorySecretStore, KeyringBackend, SecretBackend,
    SERVICE_ID,
};
pub use env::{Environment, ProcessEnvironment, StaticEnvironment};
pub use error::{AtlassianError, Result};
pub use identity::{ConnectivityProbe, Identity, IdentityCheck, RemoteError};
pub use redaction::LogRedactor;
pub use result::{ErrorCause, ErrorKind, ToolFailure, ToolResult};
