//! Configuration management for the Atlassian MCP server

use crate::env::{Environment, ENV_TIMEOUT, ENV_TOOL_PREFIX, ENV_URL, ENV_VERIFY_SSL};
use crate::{AtlassianError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Default prefix applied to every exposed tool name
pub const DEFAULT_TOOL_PREFIX: &str = "atl";

/// Hosts containing this domain are Atlassian Cloud instances
pub const CLOUD_DOMAIN: &str = "atlassian.net";

/// Placeholder endpoint used to register tools when no URL is configured
pub const PLACEHOLDER_URL: &str = "https://example.atlassian.net";

/// Target Atlassian instance.
///
/// Built once through [`EndpointConfig::new`] and never mutated afterwards;
/// `is_cloud` is derived from the normalised URL at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    url: String,
    is_cloud: bool,
    name_prefix: String,
}

impl EndpointConfig {
    /// Validate and normalise `url`, then derive the cloud flag.
    pub fn new(url: &str, name_prefix: &str) -> Result<Self> {
        let normalized = url.trim().trim_end_matches('/').to_string();
        if normalized.is_empty() {
            return Err(AtlassianError::Config("URL must not be empty".to_string()));
        }

        let parsed = Url::parse(&normalized)?;
        if parsed.scheme() != "https" {
            return Err(AtlassianError::Config(format!(
                "URL must use https, got '{}'",
                parsed.scheme()
            )));
        }

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
            _ => {
                return Err(AtlassianError::Config(format!(
                    "URL '{normalized}' has no host"
                )))
            }
        };

        validate_prefix(name_prefix)?;

        Ok(Self {
            is_cloud: host.contains(CLOUD_DOMAIN),
            url: normalized,
            name_prefix: name_prefix.to_string(),
        })
    }

    /// Plain-HTTP endpoint pointing at a local mock server
    #[cfg(test)]
    pub(crate) fn local(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            is_cloud: false,
            name_prefix: DEFAULT_TOOL_PREFIX.to_string(),
        }
    }

    /// Endpoint with the default `atl` prefix
    pub fn with_default_prefix(url: &str) -> Result<Self> {
        Self::new(url, DEFAULT_TOOL_PREFIX)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_cloud(&self) -> bool {
        self.is_cloud
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// Name presented to the MCP host for an operation
    pub fn tool_name(&self, base_name: &str) -> String {
        format!("{}_{}", self.name_prefix, base_name)
    }

    /// Absolute REST URL for `path` on this instance
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(AtlassianError::Config(
            "Tool prefix must not be empty".to_string(),
        ));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AtlassianError::Config(format!(
            "Tool prefix '{prefix}' may only contain letters, digits, '_' or '-'"
        )));
    }

    Ok(())
}

/// HTTP transport settings for calls to the Atlassian instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Read/request timeout (seconds)
    pub timeout: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout: u64,

    /// Verify TLS certificates
    pub verify_ssl: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            connect_timeout: 10,
            verify_ssl: true,
        }
    }
}

impl TransportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

/// Log level accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AtlassianError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(AtlassianError::Config(format!("Invalid log level: {s}"))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: LogLevel,

    /// Append log records to this file in addition to stderr
    pub log_file: Option<PathBuf>,

    /// Write the log file as JSON lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_file: None,
            json: false,
        }
    }
}

/// Everything the server reads from its environment at startup.
///
/// Loading never fails: a bad or missing `ATLASSIAN_URL` is recorded in
/// `config_error` so the server can still start and report it through its
/// tools.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub endpoint: Option<EndpointConfig>,
    pub config_error: Option<String>,
    pub tool_prefix: String,
    pub transport: TransportConfig,
}

impl ServerSettings {
    pub fn from_environment(env: &dyn Environment) -> Self {
        let tool_prefix = env
            .var(ENV_TOOL_PREFIX)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_TOOL_PREFIX.to_string());

        let mut transport = TransportConfig::default();
        if let Some(raw) = env.var(ENV_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => transport.timeout = secs,
                _ => warn!("Ignoring invalid {}='{}'", ENV_TIMEOUT, raw),
            }
        }
        if let Some(raw) = env.var(ENV_VERIFY_SSL) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "0" | "false" | "no" | "off" => transport.verify_ssl = false,
                "1" | "true" | "yes" | "on" => transport.verify_ssl = true,
                _ => warn!("Ignoring invalid {}='{}'", ENV_VERIFY_SSL, raw),
            }
        }

        let (endpoint, config_error) = match env.var(ENV_URL) {
            Some(url) if !url.trim().is_empty() => match EndpointConfig::new(&url, &tool_prefix) {
                Ok(endpoint) => (Some(endpoint), None),
                Err(e) => (None, Some(e.to_string())),
            },
            _ => (
                None,
                Some(format!("{ENV_URL} environment variable is required")),
            ),
        };

        Self {
            endpoint,
            config_error,
            tool_prefix,
            transport,
        }
    }

    /// Endpoint used to name tools: the configured one, or a placeholder
    /// carrying the configured prefix when the URL is missing or invalid.
    /// An unusable prefix falls back to the default; the problem itself
    /// stays in `config_error`.
    pub fn registration_endpoint(&self) -> Result<EndpointConfig> {
        match &self.endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => EndpointConfig::new(PLACEHOLDER_URL, &self.tool_prefix).or_else(|e| {
                warn!(
                    "Ignoring {}='{}' for tool names: {}",
                    ENV_TOOL_PREFIX, self.tool_prefix, e
                );
                EndpointConfig::with_default_prefix(PLACEHOLDER_URL)
            }),
        }
    }
}

/// Guidance shown when no endpoint is configured
pub fn setup_guidance() -> String {
    format!(
        "Please set the {ENV_URL} environment variable to your Atlassian instance URL.\n\
         Example: export {ENV_URL}=https://your-company.atlassian.net\n\
         You can also set {ENV_TOOL_PREFIX} to customize the tool prefix (default: {DEFAULT_TOOL_PREFIX})."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnvironment;

    #[test]
    fn test_cloud_detection() {
        let cloud = EndpointConfig::with_default_prefix("https://acme.atlassian.net").unwrap();
        assert!(cloud.is_cloud());
        assert_eq!(cloud.name_prefix(), "atl");

        let onprem = EndpointConfig::with_default_prefix("https://jira.acme.com").unwrap();
        assert!(!onprem.is_cloud());
    }

    #[test]
    fn test_url_normalization() {
        let endpoint = EndpointConfig::new(" https://acme.atlassian.net/ ", "atl").unwrap();
        assert_eq!(endpoint.url(), "https://acme.atlassian.net");
        assert_eq!(
            endpoint.api_url("/rest/api/3/myself"),
            "https://acme.atlassian.net/rest/api/3/myself"
        );
    }

    #[test]
    fn test_url_validation() {
        assert!(EndpointConfig::new("", "atl").is_err());
        assert!(EndpointConfig::new("http://acme.atlassian.net", "atl").is_err());
        assert!(EndpointConfig::new("not a url", "atl").is_err());
        assert!(EndpointConfig::new("https://", "atl").is_err());
    }

    #[test]
    fn test_prefix_validation() {
        assert!(EndpointConfig::new("https://acme.atlassian.net", "").is_err());
        assert!(EndpointConfig::new("https://acme.atlassian.net", "a b").is_err());

        let endpoint = EndpointConfig::new("https://acme.atlassian.net", "custom").unwrap();
        assert_eq!(endpoint.tool_name("health_check"), "custom_health_check");
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::Critical.as_filter(), "error");
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_settings_from_environment() {
        let env = StaticEnvironment::new()
            .with(ENV_URL, "https://acme.atlassian.net")
            .with(ENV_TOOL_PREFIX, "jira")
            .with(ENV_TIMEOUT, "45");

        let settings = ServerSettings::from_environment(&env);
        let endpoint = settings.endpoint.expect("endpoint configured");
        assert_eq!(endpoint.name_prefix(), "jira");
        assert!(settings.config_error.is_none());
        assert_eq!(settings.transport.timeout, 45);
        assert!(settings.transport.verify_ssl);
    }

    #[test]
    fn test_settings_missing_url() {
        let settings = ServerSettings::from_environment(&StaticEnvironment::new());
        assert!(settings.endpoint.is_none());
        assert!(settings.config_error.as_deref().unwrap().contains(ENV_URL));

        let placeholder = settings.registration_endpoint().unwrap();
        assert_eq!(placeholder.url(), PLACEHOLDER_URL);
        assert_eq!(placeholder.name_prefix(), DEFAULT_TOOL_PREFIX);
    }

    #[test]
    fn test_settings_invalid_url_keeps_prefix() {
        let env = StaticEnvironment::new()
            .with(ENV_URL, "http://insecure.example.com")
            .with(ENV_TOOL_PREFIX, "custom");

        let settings = ServerSettings::from_environment(&env);
        assert!(settings.endpoint.is_none());
        assert!(settings.config_error.as_deref().unwrap().contains("https"));
        assert_eq!(
            settings.registration_endpoint().unwrap().name_prefix(),
            "custom"
        );
    }

    #[test]
    fn test_settings_invalid_prefix_uses_default_for_placeholder() {
        let env = StaticEnvironment::new()
            .with(ENV_URL, "https://acme.atlassian.net")
            .with(ENV_TOOL_PREFIX, "my prefix");

        let settings = ServerSettings::from_environment(&env);
        assert!(settings.endpoint.is_none());
        assert!(settings
            .config_error
            .as_deref()
            .unwrap()
            .contains("my prefix"));

        let placeholder = settings.registration_endpoint().unwrap();
        assert_eq!(placeholder.url(), PLACEHOLDER_URL);
        assert_eq!(placeholder.name_prefix(), DEFAULT_TOOL_PREFIX);
    }
}
