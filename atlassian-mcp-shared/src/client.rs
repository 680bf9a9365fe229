//! HTTP client for the Atlassian REST API

use crate::identity::{ConnectivityProbe, Identity, IdentityCheck, RemoteError};
use crate::{AtlassianError, CredentialToken, EndpointConfig, Result, TransportConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use tracing::debug;

const MAX_BODY_SNIPPET: usize = 200;

/// reqwest-backed identity check and connectivity probe.
///
/// Failures are reported, never retried.
#[derive(Clone)]
pub struct AtlassianClient {
    client: Client,
}

impl AtlassianClient {
    pub fn new(transport: &TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(transport.connect_timeout())
            .timeout(transport.request_timeout())
            .danger_accept_invalid_certs(!transport.verify_ssl)
            .user_agent(concat!("atlassian-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AtlassianError::Network)?;

        Ok(Self { client })
    }

    fn authorization(token: &CredentialToken) -> std::result::Result<HeaderValue, RemoteError> {
        if token.expose().chars().any(char::is_whitespace) {
            return Err(RemoteError::MalformedToken(
                "API token must not contain whitespace".to_string(),
            ));
        }

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose())).map_err(|_| {
            RemoteError::MalformedToken(
                "API token contains characters not allowed in an HTTP header".to_string(),
            )
        })?;
        value.set_sensitive(true);
        Ok(value)
    }

    fn myself_url(endpoint: &EndpointConfig) -> String {
        let version = if endpoint.is_cloud() { 3 } else { 2 };
        endpoint.api_url(&format!("rest/api/{version}/myself"))
    }
}

fn map_transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Transport(format!("Request timeout: {err}"))
    } else if err.is_connect() {
        RemoteError::Transport(format!("Connection failed: {err}"))
    } else {
        RemoteError::Remote(err.to_string())
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_SNIPPET {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_BODY_SNIPPET).collect();
        format!("{cut}...")
    }
}

#[async_trait]
impl IdentityCheck for AtlassianClient {
    async fn myself(
        &self,
        endpoint: &EndpointConfig,
        token: &CredentialToken,
    ) -> std::result::Result<Identity, RemoteError> {
        let auth = Self::authorization(token)?;
        let url = Self::myself_url(endpoint);
        debug!("Checking identity at {}", url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Identity>()
                .await
                .map_err(|e| RemoteError::Remote(format!("Invalid identity response: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Remote(format!(
            "HTTP {status} for {url}: {}",
            snippet(&body)
        )))
    }
}

#[async_trait]
impl ConnectivityProbe for AtlassianClient {
    async fn probe(&self, endpoint: &EndpointConfig) -> std::result::Result<bool, RemoteError> {
        let response = self
            .client
            .get(endpoint.url())
            .send()
            .await
            .map_err(map_transport_error)?;

        Ok(response.status().as_u16() < 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> AtlassianClient {
        AtlassianClient::new(&TransportConfig::default()).unwrap()
    }

    #[test]
    fn test_api_version_by_deployment() {
        let cloud = EndpointConfig::with_default_prefix("https://acme.atlassian.net").unwrap();
        assert_eq!(
            AtlassianClient::myself_url(&cloud),
            "https://acme.atlassian.net/rest/api/3/myself"
        );

        let onprem = EndpointConfig::with_default_prefix("https://jira.acme.com/jira").unwrap();
        assert_eq!(
            AtlassianClient::myself_url(&onprem),
            "https://jira.acme.com/jira/rest/api/2/myself"
        );
    }

    #[test]
    fn test_malformed_token_rejected_locally() {
        let err = AtlassianClient::authorization(&"has space".into()).unwrap_err();
        assert!(matches!(err, RemoteError::MalformedToken(_)));

        let err = AtlassianClient::authorization(&"bad\u{7f}char".into()).unwrap_err();
        assert!(matches!(err, RemoteError::MalformedToken(_)));

        assert!(AtlassianClient::authorization(&"ok-token".into()).is_ok());
    }

    #[tokio::test]
    async fn test_myself_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/myself"))
            .and(header("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "jdoe",
                "displayName": "Jane Doe",
                "active": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = EndpointConfig::local(&server.uri());
        let identity = client().myself(&endpoint, &"good-token".into()).await.unwrap();
        assert_eq!(identity.display_name.as_deref(), Some("Jane Doe"));
        assert_eq!(identity.active, Some(true));
    }

    #[tokio::test]
    async fn test_myself_unauthorized_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/myself"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Client must be authenticated"))
            .mount(&server)
            .await;

        let endpoint = EndpointConfig::local(&server.uri());
        let err = client().myself(&endpoint, &"bad-token".into()).await.unwrap_err();
        match err {
            RemoteError::Remote(message) => {
                assert!(message.contains("401"));
                assert!(!message.contains("bad-token"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_myself_connection_refused() {
        // Bind then drop a listener so nothing accepts on the port
        let uri = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let endpoint = EndpointConfig::local(&uri);
        let err = client().myself(&endpoint, &"token".into()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[tokio::test]
    async fn test_probe_status_threshold() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let endpoint = EndpointConfig::local(&server.uri());
        assert!(client().probe(&endpoint).await.unwrap());

        let failing = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&failing)
            .await;

        let endpoint = EndpointConfig::local(&failing.uri());
        assert!(!client().probe(&endpoint).await.unwrap());
    }
}
