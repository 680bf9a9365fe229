//! Tool registration for the Atlassian MCP server

use async_trait::async_trait;
use atlassian_mcp_shared::{
    AtlassianError, AuthManager, ConnectivityProbe, EndpointConfig, ErrorCause, ErrorKind,
    ToolFailure, ToolResult, SETUP_TOOL,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

pub mod health;
pub mod setup;

use health::HealthCheckTool;
use setup::SetupCredentialsTool;

/// Base name of the health probe, before prefixing
pub const HEALTH_CHECK_TOOL: &str = "health_check";

/// Something a host can invoke with JSON arguments. The returned value is
/// always a serialized [`ToolResult`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Value;
}

/// A named, described operation ready to hand to a host
#[derive(Clone)]
pub struct RegisteredTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

/// Runtime that exposes registered tools to clients
#[async_trait]
pub trait ToolHost: Send + Sync {
    async fn register(&self, tool: RegisteredTool);
}

/// Everything the tool handlers need from the server
#[derive(Clone)]
pub struct ToolContext {
    /// Endpoint used for naming; a placeholder when configuration is missing
    pub endpoint: Arc<EndpointConfig>,
    /// Why the endpoint configuration could not be loaded, if it could not
    pub config_error: Option<String>,
    pub auth: Arc<AuthManager>,
    pub connectivity: Arc<dyn ConnectivityProbe>,
}

impl ToolContext {
    pub fn is_configured(&self) -> bool {
        self.config_error.is_none()
    }
}

/// Whether tools have been registered. Starts false and flips exactly once.
#[derive(Debug, Default)]
pub struct RegistrationState {
    registered: Mutex<bool>,
}

impl RegistrationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_registered(&self) -> bool {
        *self.registered.lock().await
    }
}

/// Registers the declared operations with a host at most once per state.
pub struct ToolRegistry {
    state: Arc<RegistrationState>,
}

impl ToolRegistry {
    pub fn new(state: Arc<RegistrationState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<RegistrationState> {
        &self.state
    }

    /// The registration gate stays locked across the host calls, so
    /// concurrent first callers cannot both register.
    pub async fn register_all(&self, host: &dyn ToolHost, context: &ToolContext) {
        let mut registered = self.state.registered.lock().await;
        if *registered {
            debug!("Tools already registered, skipping");
            return;
        }

        for tool in declared_tools(context) {
            info!("Registering tool: {}", tool.name);
            host.register(tool).await;
        }

        *registered = true;
    }
}

/// Operations exposed by this server, with prefixed names
pub fn declared_tools(context: &ToolContext) -> Vec<RegisteredTool> {
    let endpoint = &context.endpoint;

    vec![
        RegisteredTool {
            name: endpoint.tool_name(HEALTH_CHECK_TOOL),
            description: "Check server health including configuration and connectivity"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            handler: Arc::new(HealthCheckTool::new(context.clone())),
        },
        RegisteredTool {
            name: endpoint.tool_name(SETUP_TOOL),
            description: "Configure Atlassian API token for authentication. The token is \
                          validated against the instance and stored in the system keychain."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "token": {
                        "type": "string",
                        "description": "API token for Atlassian authentication"
                    }
                },
                "required": ["token"]
            }),
            handler: Arc::new(SetupCredentialsTool::new(context.clone())),
        },
    ]
}

/// Convert an error raised inside a handler into a classified failure
pub fn boundary_failure(err: &AtlassianError, operation: &str) -> ToolFailure {
    let cause = ErrorCause::new(err.kind_name(), err.to_string());

    match err {
        AtlassianError::Validation(message) => {
            ToolFailure::new(format!("Setup failed: {message}"), ErrorKind::SetupError)
        }
        AtlassianError::CredentialsRequired(required) => ToolFailure::new(
            format!("{required}\n\n{}", required.render()),
            ErrorKind::ConfigError,
        ),
        AtlassianError::Config(_) => ToolFailure::new(err.to_string(), ErrorKind::ConfigError),
        _ => ToolFailure::new(
            format!("Unexpected error during {operation}: {err}"),
            ErrorKind::UnknownError,
        ),
    }
    .with_cause(cause)
}

/// Tools registered with this process, in registration order
#[derive(Default)]
pub struct ToolCatalog {
    tools: RwLock<Vec<RegisteredTool>>,
}

/// Name, description and schema of a catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .read()
            .await
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    /// Invoke `name`. Returns `None` for an unknown tool. A panicking handler
    /// is reported as `unknown_error` instead of tearing down the server.
    pub async fn call(&self, name: &str, arguments: Value) -> Option<Value> {
        let handler = {
            let tools = self.tools.read().await;
            tools
                .iter()
                .find(|tool| tool.name == name)
                .map(|tool| Arc::clone(&tool.handler))
        }?;

        match tokio::spawn(async move { handler.call(arguments).await }).await {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Tool '{}' failed: {}", name, e);
                Some(
                    ToolResult::<()>::failure(
                        format!("Tool '{name}' failed unexpectedly"),
                        ErrorKind::UnknownError,
                    )
                    .to_json(),
                )
            }
        }
    }
}

#[async_trait]
impl ToolHost for ToolCatalog {
    async fn register(&self, tool: RegisteredTool) {
        let mut tools = self.tools.write().await;
        if let Some(existing) = tools.iter_mut().find(|t| t.name == tool.name) {
            warn!("Tool '{}' registered twice, replacing", tool.name);
            *existing = tool;
        } else {
            tools.push(tool);
        }
    }
}
