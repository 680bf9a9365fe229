//! MCP server wiring on top of the PulseEngine framework

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use pulseengine_mcp_protocol::*;
use pulseengine_mcp_server::{BackendError, McpBackend, McpServer, ServerConfig};

use atlassian_mcp_shared::{
    AtlassianClient, AtlassianError, AuthManager, CredentialStore, Result, ServerSettings,
};

use crate::tools::{RegistrationState, ToolCatalog, ToolContext, ToolRegistry};

pub struct AtlassianMcpServer {
    settings: ServerSettings,
    catalog: Arc<ToolCatalog>,
    registry: ToolRegistry,
    context: ToolContext,
}

impl AtlassianMcpServer {
    pub fn new(settings: ServerSettings, store: CredentialStore) -> Result<Self> {
        info!("Initializing Atlassian MCP Server with PulseEngine framework");

        if let Some(err) = &settings.config_error {
            warn!("Starting without a valid endpoint configuration: {}", err);
        }

        let endpoint = Arc::new(settings.registration_endpoint()?);
        let client = Arc::new(AtlassianClient::new(&settings.transport)?);
        let auth = Arc::new(AuthManager::new(endpoint.clone(), store, client.clone()));

        let context = ToolContext {
            endpoint,
            config_error: settings.config_error.clone(),
            auth,
            connectivity: client,
        };

        Ok(Self {
            settings,
            catalog: Arc::new(ToolCatalog::new()),
            registry: ToolRegistry::new(Arc::new(RegistrationState::new())),
            context,
        })
    }

    /// Register tools with the catalog. Safe to call more than once.
    pub async fn start(&self) {
        self.registry
            .register_all(self.catalog.as_ref(), &self.context)
            .await;
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    fn instructions(&self) -> String {
        match &self.settings.config_error {
            None => format!(
                "Atlassian MCP Server for {}. Call {} to configure an API token.",
                self.context.endpoint.url(),
                self.context
                    .endpoint
                    .tool_name(atlassian_mcp_shared::SETUP_TOOL)
            ),
            Some(err) => format!(
                "Atlassian MCP Server is not configured: {err}\n\n{}",
                atlassian_mcp_shared::setup_guidance()
            ),
        }
    }

    pub async fn run(self) -> Result<()> {
        self.start().await;

        let backend = AtlassianMcpBackend {
            catalog: Arc::clone(&self.catalog),
            instructions: self.instructions(),
        };

        let mut server = McpServer::new(backend, ServerConfig::default())
            .await
            .map_err(|e| AtlassianError::Mcp(format!("Failed to create server: {e}")))?;

        info!("Starting PulseEngine MCP server with stdio transport");

        server
            .run()
            .await
            .map_err(|e| AtlassianError::Mcp(format!("Server run error: {e}")))
    }
}

#[derive(Clone)]
struct AtlassianMcpBackend {
    catalog: Arc<ToolCatalog>,
    instructions: String,
}

#[async_trait]
impl McpBackend for AtlassianMcpBackend {
    type Error = BackendError;
    type Config = ();

    async fn initialize(_: Self::Config) -> std::result::Result<Self, Self::Error> {
        Err(BackendError::configuration(
            "Use AtlassianMcpServer::new() instead",
        ))
    }

    fn get_server_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "atlassian-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(self.instructions.clone()),
        }
    }

    async fn health_check(&self) -> std::result::Result<(), Self::Error> {
        Ok(())
    }

    async fn list_tools(
        &self,
        _request: PaginatedRequestParam,
    ) -> std::result::Result<ListToolsResult, Self::Error> {
        debug!("Listing tools");

        let tools: Vec<Tool> = self
            .catalog
            .descriptors()
            .await
            .into_iter()
            .map(|descriptor| Tool {
                name: descriptor.name,
                description: descriptor.description,
                input_schema: descriptor.input_schema,
                output_schema: None,
            })
            .collect();

        debug!("Found {} tools", tools.len());
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> std::result::Result<CallToolResult, Self::Error> {
        debug!("Calling tool: {}", request.name);

        let arguments = request
            .arguments
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let response = self
            .catalog
            .call(&request.name, arguments)
            .await
            .ok_or_else(|| BackendError::not_supported(format!("Unknown tool: {}", request.name)))?;

        let failed = response.get("success") != Some(&serde_json::Value::Bool(true));
        let text = serde_json::to_string_pretty(&response)
            .map_err(|e| BackendError::internal(format!("Failed to serialize result: {e}")))?;

        Ok(CallToolResult {
            content: vec![Content::text(text)],
            is_error: Some(failed),
            structured_content: None,
        })
    }

    async fn list_resources(
        &self,
        _request: PaginatedRequestParam,
    ) -> std::result::Result<ListResourcesResult, Self::Error> {
        Ok(ListResourcesResult {
            resources: vec![],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
    ) -> std::result::Result<ReadResourceResult, Self::Error> {
        Err(BackendError::not_supported(format!(
            "Resource not found: {}",
            request.uri
        )))
    }

    async fn list_prompts(
        &self,
        _request: PaginatedRequestParam,
    ) -> std::result::Result<ListPromptsResult, Self::Error> {
        Ok(ListPromptsResult {
            prompts: vec![],
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
    ) -> std::result::Result<GetPromptResult, Self::Error> {
        Err(BackendError::not_supported(format!(
            "Prompt not found: {}",
            request.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlassian_mcp_shared::{InMemorySecretStore, StaticEnvironment};

    fn server(env: StaticEnvironment) -> AtlassianMcpServer {
        let settings = ServerSettings::from_environment(&env);
        let store = CredentialStore::new(
            Arc::new(InMemorySecretStore::new()),
            Arc::new(StaticEnvironment::new()),
        );
        AtlassianMcpServer::new(settings, store).unwrap()
    }

    #[tokio::test]
    async fn test_start_registers_prefixed_tools_once() {
        let server = server(
            StaticEnvironment::new()
                .with("ATLASSIAN_URL", "https://acme.atlassian.net")
                .with("MCP_TOOL_PREFIX", "custom"),
        );

        server.start().await;
        server.start().await;

        let names: Vec<String> = server
            .catalog()
            .descriptors()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec!["custom_health_check", "custom_setup_atlassian_credentials"]
        );
    }

    #[tokio::test]
    async fn test_unconfigured_server_still_registers() {
        let server = server(StaticEnvironment::new());
        server.start().await;

        assert_eq!(server.catalog().len().await, 2);
        assert!(server.instructions().contains("ATLASSIAN_URL"));

        let body = server
            .catalog()
            .call(
                "atl_setup_atlassian_credentials",
                serde_json::json!({"token": "abc"}),
            )
            .await
            .unwrap();
        assert_eq!(body["error_type"], "config_error");
    }

    async fn backend(env: StaticEnvironment) -> AtlassianMcpBackend {
        let server = server(env);
        server.start().await;
        AtlassianMcpBackend {
            catalog: Arc::clone(server.catalog()),
            instructions: server.instructions(),
        }
    }

    fn call_request(name: &str, arguments: serde_json::Value) -> CallToolRequestParam {
        serde_json::from_value(serde_json::json!({"name": name, "arguments": arguments})).unwrap()
    }

    fn single_text(result: &CallToolResult) -> serde_json::Value {
        assert_eq!(result.content.len(), 1);
        let block = serde_json::to_value(&result.content[0]).unwrap();
        let text = block["text"].as_str().unwrap();
        assert!(text.contains('\n'), "expected pretty-printed JSON: {text}");
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_backend_lists_registered_tools() {
        let backend = backend(StaticEnvironment::new().with("MCP_TOOL_PREFIX", "custom")).await;

        let listed = backend
            .list_tools(serde_json::from_value(serde_json::json!({})).unwrap())
            .await
            .unwrap();
        let names: Vec<String> = listed.tools.iter().map(|t| t.name.clone()).collect();
        assert_eq!(
            names,
            vec!["custom_health_check", "custom_setup_atlassian_credentials"]
        );
        assert!(listed.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_backend_is_error_mirrors_success() {
        let backend = backend(StaticEnvironment::new()).await;

        let health = backend
            .call_tool(call_request("atl_health_check", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(health.is_error, Some(false));
        assert_eq!(single_text(&health)["success"], true);

        let setup = backend
            .call_tool(call_request(
                "atl_setup_atlassian_credentials",
                serde_json::json!({"token": "abc"}),
            ))
            .await
            .unwrap();
        assert_eq!(setup.is_error, Some(true));
        let body = single_text(&setup);
        assert_eq!(body["success"], false);
        assert_eq!(body["error_type"], "config_error");
    }

    #[tokio::test]
    async fn test_backend_rejects_unknown_tool() {
        let backend = backend(StaticEnvironment::new()).await;

        let err = backend
            .call_tool(call_request("atl_delete_everything", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown tool: atl_delete_everything"));
    }

    #[tokio::test]
    async fn test_invalid_prefix_still_starts() {
        let server = server(
            StaticEnvironment::new()
                .with("ATLASSIAN_URL", "https://acme.atlassian.net")
                .with("MCP_TOOL_PREFIX", "my prefix"),
        );
        server.start().await;

        assert!(server.instructions().contains("my prefix"));
        let names: Vec<String> = server
            .catalog()
            .descriptors()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["atl_health_check", "atl_setup_atlassian_credentials"]);
    }
}
