//! Token acquisition, validation and first-time setup

use crate::credentials::{CredentialStore, CredentialToken};
use crate::env::{ENV_API_TOKEN, ENV_URL};
use crate::identity::{IdentityCheck, RemoteError};
use crate::result::{ErrorCause, ErrorKind, ToolResult};
use crate::{AtlassianError, EndpointConfig, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Base name of the credential setup tool, before prefixing
pub const SETUP_TOOL: &str = "setup_atlassian_credentials";

const API_TOKEN_PAGE: &str = "https://id.atlassian.com/manage-profile/security/api-tokens";

/// Step-by-step guidance returned when no token is available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub message: String,
    pub steps: Vec<RemediationStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationStep {
    pub step: u32,
    pub title: String,
    #[serde(flatten)]
    pub detail: StepDetail,
}

/// A step is either a plain list of instructions or a choice of methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDetail {
    Instructions(Vec<String>),
    Options(Vec<SetupOption>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupOption {
    pub method: String,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<String>,
}

/// No token in either source. Carries the endpoint and remediation as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsRequired {
    pub url: String,
    pub user_instructions: Remediation,
    /// Set when the secure store failed rather than simply being empty
    pub secure_store_error: Option<String>,
}

impl CredentialsRequired {
    pub fn new(endpoint: &EndpointConfig) -> Self {
        let url = endpoint.url().to_string();
        let setup_tool = endpoint.tool_name(SETUP_TOOL);

        let user_instructions = Remediation {
            message: "Tell the user: If you wish to authenticate with Atlassian, here's how:"
                .to_string(),
            steps: vec![
                RemediationStep {
                    step: 1,
                    title: "Obtain an API Token".to_string(),
                    detail: StepDetail::Instructions(vec![
                        format!("Go to {API_TOKEN_PAGE}"),
                        "Click 'Create API token'".to_string(),
                        "Give it a label (e.g., 'MCP Server')".to_string(),
                        "Copy the generated token".to_string(),
                    ]),
                },
                RemediationStep {
                    step: 2,
                    title: "Configure Authentication".to_string(),
                    detail: StepDetail::Options(vec![
                        SetupOption {
                            method: "Environment Variable (Manual)".to_string(),
                            instructions: vec![
                                format!("Set {ENV_URL}={url}"),
                                format!("Set {ENV_API_TOKEN}=your-token-here"),
                                "Restart the MCP server".to_string(),
                            ],
                            tool_call: None,
                        },
                        SetupOption {
                            method: "Interactive Setup (Secure Storage)".to_string(),
                            instructions: vec![
                                "Provide your API token when prompted".to_string(),
                                "It will be stored securely in your system keychain".to_string(),
                                "No need to restart - works immediately".to_string(),
                            ],
                            tool_call: Some(format!("{setup_tool}(token='your-token')")),
                        },
                    ]),
                },
            ],
        };

        Self {
            url,
            user_instructions,
            secure_store_error: None,
        }
    }

    pub fn with_secure_store_error(mut self, error: Option<String>) -> Self {
        self.secure_store_error = error;
        self
    }

    /// Remediation payload as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.user_instructions).unwrap_or(serde_json::Value::Null)
    }

    /// Numbered plain-text rendering of the remediation steps
    pub fn render(&self) -> String {
        let mut out = vec![self.user_instructions.message.clone()];

        for step in &self.user_instructions.steps {
            out.push(format!("{}. {}", step.step, step.title));
            match &step.detail {
                StepDetail::Instructions(lines) => {
                    out.extend(lines.iter().map(|line| format!("   - {line}")));
                }
                StepDetail::Options(options) => {
                    for (idx, option) in options.iter().enumerate() {
                        out.push(format!("   Option {}: {}", idx + 1, option.method));
                        out.extend(option.instructions.iter().map(|line| format!("     - {line}")));
                        if let Some(call) = &option.tool_call {
                            out.push(format!("     - Tool call: {call}"));
                        }
                    }
                }
            }
        }

        if let Some(err) = &self.secure_store_error {
            out.push(format!("Note: the system keychain could not be read ({err})"));
        }

        out.join("\n")
    }
}

impl fmt::Display for CredentialsRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Authentication required for {}", self.url)
    }
}

/// Map a remote failure to exactly one [`ErrorKind`] plus a user message.
///
/// Concrete categories win; generic remote failures fall back to matching
/// the message text because the HTTP layer reports status only as text.
pub fn classify_remote_error(err: &RemoteError) -> (ErrorKind, String) {
    match err {
        RemoteError::MalformedToken(msg) => (ErrorKind::CredentialError, format!("Invalid token: {msg}")),
        RemoteError::Transport(msg) => (ErrorKind::NetworkError, format!("Network error: {msg}")),
        RemoteError::PermissionDenied(msg) => {
            (ErrorKind::PermissionError, format!("Permission denied: {msg}"))
        }
        RemoteError::Remote(msg) => {
            let lower = msg.to_lowercase();
            if lower.contains("401") || lower.contains("unauthorized") {
                (
                    ErrorKind::AuthError,
                    "Invalid API token - authentication failed".to_string(),
                )
            } else if lower.contains("403") || lower.contains("forbidden") {
                (
                    ErrorKind::PermissionError,
                    "Access forbidden - check token permissions".to_string(),
                )
            } else if lower.contains("timeout") || lower.contains("connection") {
                (ErrorKind::NetworkError, format!("Connection error: {msg}"))
            } else {
                (
                    ErrorKind::UnknownError,
                    format!("Authentication test failed: {msg}"),
                )
            }
        }
    }
}

fn scrub(text: &str, token: &CredentialToken) -> String {
    let secret = token.expose();
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "[REDACTED]")
    }
}

/// Authentication manager for one Atlassian endpoint.
///
/// Holds no token between calls: every operation fetches what it needs.
pub struct AuthManager {
    endpoint: Arc<EndpointConfig>,
    store: CredentialStore,
    identity: Arc<dyn IdentityCheck>,
}

impl AuthManager {
    pub fn new(
        endpoint: Arc<EndpointConfig>,
        store: CredentialStore,
        identity: Arc<dyn IdentityCheck>,
    ) -> Self {
        Self {
            endpoint,
            store,
            identity,
        }
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Token from the secure store, else the environment, else
    /// [`AtlassianError::CredentialsRequired`]. Makes no remote call.
    pub async fn require_authentication(&self) -> Result<CredentialToken> {
        let mut store_error = None;

        match self.store.load_from_secure_store(&self.endpoint).await {
            Ok(Some(token)) => {
                debug!("Using API token from secure store for {}", self.endpoint.url());
                return Ok(token);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Secure store unavailable for {}, falling back to environment: {}",
                    self.endpoint.url(),
                    e
                );
                store_error = Some(e.to_string());
            }
        }

        if let Some(token) = self.store.load_from_environment() {
            debug!("Using API token from environment for {}", self.endpoint.url());
            return Ok(token);
        }

        Err(CredentialsRequired::new(&self.endpoint)
            .with_secure_store_error(store_error)
            .into())
    }

    /// One identity call; every outcome is classified, nothing is raised.
    pub async fn test_credentials(&self, token: &CredentialToken) -> ToolResult<bool> {
        match self.identity.myself(&self.endpoint, token).await {
            Ok(identity) => {
                debug!(
                    "Token accepted for {} (user: {})",
                    self.endpoint.url(),
                    identity
                        .display_name
                        .as_deref()
                        .or(identity.name.as_deref())
                        .unwrap_or("unknown")
                );
                ToolResult::ok(true)
            }
            Err(err) => {
                let (kind, message) = classify_remote_error(&err);
                warn!("Credential test failed for {}: {}", self.endpoint.url(), kind);
                ToolResult::failure_with_cause(
                    scrub(&message, token),
                    kind,
                    ErrorCause::new(err.variant_name(), scrub(&err.to_string(), token)),
                )
            }
        }
    }

    /// Validate `token` remotely and persist it only if it is accepted.
    pub async fn setup_credentials(&self, token: &str) -> Result<String> {
        let token = CredentialToken::new(token.trim());
        if token.is_blank() {
            return Err(AtlassianError::Validation("API token required".to_string()));
        }

        if let ToolResult::Err(failure) = self.test_credentials(&token).await {
            return Err(AtlassianError::Validation(format!(
                "Token validation failed: {}",
                failure.message
            )));
        }

        self.store.store(&self.endpoint, &token).await?;
        info!("API token validated and stored for {}", self.endpoint.url());

        Ok(format!(
            "API token validated and stored securely for {}",
            self.endpoint.url()
        ))
    }

    /// Forget the stored token for this endpoint
    pub async fn clear_credentials(&self) -> Result<()> {
        self.store.remove(&self.endpoint).await?;
        info!("Removed stored API token for {}", self.endpoint.url());
        Ok(())
    }
}
