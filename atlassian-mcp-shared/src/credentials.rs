//! Token storage: OS keyring first, process environment as fallback source

use crate::env::{Environment, ProcessEnvironment, ENV_API_TOKEN};
use crate::{AtlassianError, EndpointConfig, Result};
use keyring::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Fixed keyring service name; the per-entry key is the endpoint URL
pub const SERVICE_ID: &str = "mcp-server-atlassian";

/// Opaque API token. Never printed: `Debug` is redacted and there is no
/// `Display` or `Serialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialToken(String);

impl CredentialToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw secret, for building an authorization header or persisting it
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialToken(<redacted>)")
    }
}

impl From<&str> for CredentialToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for CredentialToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Per-user secret storage keyed by `(service, key)`.
///
/// `get` returns `Ok(None)` for a missing entry; `Err` means the backend
/// itself could not be used.
pub trait SecretBackend: Send + Sync {
    fn set(&self, service: &str, key: &str, secret: &str) -> Result<()>;
    fn get(&self, service: &str, key: &str) -> Result<Option<String>>;
    fn delete(&self, service: &str, key: &str) -> Result<()>;
}

/// OS keyring (macOS Keychain, Windows Credential Manager, Linux keyutils)
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringBackend;

impl KeyringBackend {
    fn entry(service: &str, key: &str) -> Result<Entry> {
        Entry::new(service, key)
            .map_err(|e| AtlassianError::SecureStore(format!("Failed to create keyring entry: {e}")))
    }
}

impl SecretBackend for KeyringBackend {
    fn set(&self, service: &str, key: &str, secret: &str) -> Result<()> {
        Self::entry(service, key)?
            .set_password(secret)
            .map_err(|e| AtlassianError::SecureStore(format!("Failed to store token: {e}")))
    }

    fn get(&self, service: &str, key: &str) -> Result<Option<String>> {
        match Self::entry(service, key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AtlassianError::SecureStore(format!(
                "Failed to retrieve token: {e}"
            ))),
        }
    }

    fn delete(&self, service: &str, key: &str) -> Result<()> {
        match Self::entry(service, key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AtlassianError::SecureStore(format!(
                "Failed to remove token: {e}"
            ))),
        }
    }
}

/// Process-local secret storage, shared between clones
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    entries: Arc<RwLock<HashMap<(String, String), String>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E>(_: E) -> AtlassianError {
    AtlassianError::SecureStore("In-memory secret store lock poisoned".to_string())
}

impl SecretBackend for InMemorySecretStore {
    fn set(&self, service: &str, key: &str, secret: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert((service.to_string(), key.to_string()), secret.to_string());
        Ok(())
    }

    fn get(&self, service: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .read()
            .map_err(poisoned)?
            .get(&(service.to_string(), key.to_string()))
            .cloned())
    }

    fn delete(&self, service: &str, key: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .remove(&(service.to_string(), key.to_string()));
        Ok(())
    }
}

/// Resolves tokens from the secure store and the environment.
///
/// Lookup order is decided by the caller ([`crate::AuthManager`]); this type
/// only exposes the two sources.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn SecretBackend>,
    environment: Option<Arc<dyn Environment>>,
    env_var: String,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn SecretBackend>, environment: Arc<dyn Environment>) -> Self {
        Self {
            backend,
            environment: Some(environment),
            env_var: ENV_API_TOKEN.to_string(),
        }
    }

    /// OS keyring plus the real process environment
    pub fn system() -> Self {
        Self::new(Arc::new(KeyringBackend), Arc::new(ProcessEnvironment))
    }

    /// Stop consulting the environment entirely
    pub fn without_environment(mut self) -> Self {
        self.environment = None;
        self
    }

    /// Read the fallback token from `name` instead of `ATLASSIAN_API_TOKEN`
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Persist `token` for `endpoint`, replacing any previous value
    pub async fn store(&self, endpoint: &EndpointConfig, token: &CredentialToken) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let key = endpoint.url().to_string();
        let secret = token.expose().to_string();

        tokio::task::spawn_blocking(move || backend.set(SERVICE_ID, &key, &secret))
            .await
            .map_err(|e| AtlassianError::Unknown(format!("Task join error: {e}")))??;

        debug!("Stored API token for {}", endpoint.url());
        Ok(())
    }

    pub async fn load_from_secure_store(
        &self,
        endpoint: &EndpointConfig,
    ) -> Result<Option<CredentialToken>> {
        let backend = Arc::clone(&self.backend);
        let key = endpoint.url().to_string();

        let secret = tokio::task::spawn_blocking(move || backend.get(SERVICE_ID, &key))
            .await
            .map_err(|e| AtlassianError::Unknown(format!("Task join error: {e}")))??;

        Ok(secret
            .map(CredentialToken::new)
            .filter(|token| !token.is_blank()))
    }

    pub fn load_from_environment(&self) -> Option<CredentialToken> {
        self.environment
            .as_ref()?
            .var(&self.env_var)
            .map(CredentialToken::new)
            .filter(|token| !token.is_blank())
    }

    /// Delete the stored token for `endpoint`; a missing entry is not an error
    pub async fn remove(&self, endpoint: &EndpointConfig) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let key = endpoint.url().to_string();

        tokio::task::spawn_blocking(move || backend.delete(SERVICE_ID, &key))
            .await
            .map_err(|e| AtlassianError::Unknown(format!("Task join error: {e}")))?
    }
}
