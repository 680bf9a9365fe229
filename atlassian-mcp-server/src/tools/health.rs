//! Health probe tool

use super::{ToolContext, ToolHandler};
use async_trait::async_trait;
use atlassian_mcp_shared::ToolResult;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub server: String,
    pub configuration: String,
    pub connectivity: String,
    pub timestamp: String,
}

pub struct HealthCheckTool {
    context: ToolContext,
}

impl HealthCheckTool {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }

    pub async fn check(&self) -> ToolResult<HealthReport> {
        let (configuration, connectivity) = if self.context.is_configured() {
            let endpoint = &self.context.endpoint;
            let connectivity = match self.context.connectivity.probe(endpoint).await {
                Ok(true) => "ok",
                Ok(false) => {
                    warn!("Connectivity check for {} returned a server error", endpoint.url());
                    "failed"
                }
                Err(e) => {
                    warn!("Connectivity check for {} failed: {}", endpoint.url(), e);
                    "failed"
                }
            };
            ("valid", connectivity)
        } else {
            ("missing", "unknown")
        };

        debug!(
            "Health check: configuration={}, connectivity={}",
            configuration, connectivity
        );

        ToolResult::ok(HealthReport {
            server: "running".to_string(),
            configuration: configuration.to_string(),
            connectivity: connectivity.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl ToolHandler for HealthCheckTool {
    async fn call(&self, _arguments: Value) -> Value {
        self.check().await.to_json()
    }
}
