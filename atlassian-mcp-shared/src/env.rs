//! Process environment access behind a trait so lookups can be faked in tests

use std::collections::HashMap;

/// Environment variable holding the instance base URL
pub const ENV_URL: &str = "ATLASSIAN_URL";
/// Environment variable holding the fallback API token
pub const ENV_API_TOKEN: &str = "ATLASSIAN_API_TOKEN";
/// Environment variable overriding the tool name prefix
pub const ENV_TOOL_PREFIX: &str = "MCP_TOOL_PREFIX";
/// Environment variable overriding the HTTP request timeout (seconds)
pub const ENV_TIMEOUT: &str = "ATLASSIAN_TIMEOUT";
/// Environment variable toggling TLS certificate verification
pub const ENV_VERIFY_SSL: &str = "ATLASSIAN_VERIFY_SSL";

/// Read-only view of environment variables
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of variables, independent of the process environment
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: HashMap<String, String>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }
}

impl Environment for StaticEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}
