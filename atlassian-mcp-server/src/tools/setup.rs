//! Credential setup tool

use super::{boundary_failure, ToolContext, ToolHandler};
use async_trait::async_trait;
use atlassian_mcp_shared::{setup_guidance, ToolFailure, ToolResult};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
struct SetupArguments {
    #[serde(default)]
    token: Option<String>,
}

pub struct SetupCredentialsTool {
    context: ToolContext,
}

impl SetupCredentialsTool {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }

    pub async fn setup(&self, token: &str) -> ToolResult<String> {
        if let Some(config_error) = &self.context.config_error {
            warn!("Credential setup requested without endpoint configuration");
            return ToolResult::Err(ToolFailure::config(format!(
                "{config_error}\n\n{}",
                setup_guidance()
            )));
        }

        let auth = &self.context.auth;
        let outcome: ToolResult<String> = auth
            .setup_credentials(token)
            .await
            .map_err(|e| boundary_failure(&e, "setup"))
            .into();

        if outcome.is_failure() {
            warn!("Credential setup failed for {}", auth.endpoint().url());
        } else {
            info!("Credential setup completed for {}", auth.endpoint().url());
        }
        outcome
    }
}

#[async_trait]
impl ToolHandler for SetupCredentialsTool {
    async fn call(&self, arguments: Value) -> Value {
        // A missing or non-string token is handled like an empty one
        let args: SetupArguments = serde_json::from_value(arguments).unwrap_or_default();
        self.setup(args.token.as_deref().unwrap_or_default())
            .await
            .to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use atlassian_mcp_shared::RemoteError;
    use serde_json::json;

    #[tokio::test]
    async fn test_blank_token_is_setup_error_without_remote_call() {
        let identity = accepting();
        let fx = fixture(
            "https://acme.atlassian.net",
            "atl",
            identity.clone(),
            FakeProbe(Ok(true)),
        );
        let tool = SetupCredentialsTool::new(fx.context);

        for args in [json!({"token": ""}), json!({"token": "  "}), json!({})] {
            let body = tool.call(args).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error_type"], "setup_error");
            assert!(body["error"].as_str().unwrap().starts_with("Setup failed"));
        }
        assert_eq!(identity.calls(), 0);
        assert!(fx.secrets.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_token_is_not_stored() {
        let identity = FakeIdentity::new(Err(RemoteError::Remote("HTTP 401 Unauthorized".into())));
        let fx = fixture(
            "https://acme.atlassian.net",
            "atl",
            identity.clone(),
            FakeProbe(Ok(true)),
        );

        let body = SetupCredentialsTool::new(fx.context)
            .call(json!({"token": "wrong-token"}))
            .await;

        assert_eq!(body["error_type"], "setup_error");
        assert_eq!(body["exception_type"], "ValidationError");
        assert!(!body.to_string().contains("wrong-token"));
        assert_eq!(identity.calls(), 1);
        assert!(fx.secrets.is_empty());
    }

    #[tokio::test]
    async fn test_accepted_token_is_stored() {
        let fx = fixture(
            "https://acme.atlassian.net",
            "atl",
            accepting(),
            FakeProbe(Ok(true)),
        );

        let body = SetupCredentialsTool::new(fx.context.clone())
            .call(json!({"token": "good-token"}))
            .await;

        assert_eq!(body["success"], true);
        assert_eq!(fx.secrets.len(), 1);
        let token = fx.context.auth.require_authentication().await.unwrap();
        assert_eq!(token.expose(), "good-token");
    }

    #[tokio::test]
    async fn test_missing_configuration_reports_guidance() {
        let identity = accepting();
        let mut fx = fixture(
            "https://example.atlassian.net",
            "atl",
            identity.clone(),
            FakeProbe(Ok(true)),
        );
        fx.context.config_error = Some("ATLASSIAN_URL environment variable is required".into());

        let body = SetupCredentialsTool::new(fx.context)
            .call(json!({"token": "good-token"}))
            .await;

        assert_eq!(body["error_type"], "config_error");
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Configuration Error:"));
        assert!(message.contains("ATLASSIAN_URL"));
        assert_eq!(identity.calls(), 0);
    }
}
