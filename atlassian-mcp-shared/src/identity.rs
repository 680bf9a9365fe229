//! Remote checks performed against an Atlassian instance

use crate::{CredentialToken, EndpointConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure raised by a remote call, grouped by where it came from.
///
/// `Remote` is the catch-all for HTTP failures; its message is the only
/// signal available for further classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{0}")]
    MalformedToken(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Remote(String),
}

impl RemoteError {
    /// Short variant name, reported as `exception_type`
    pub fn variant_name(&self) -> &'static str {
        match self {
            RemoteError::MalformedToken(_) => "MalformedToken",
            RemoteError::Transport(_) => "Transport",
            RemoteError::PermissionDenied(_) => "PermissionDenied",
            RemoteError::Remote(_) => "Remote",
        }
    }
}

/// The authenticated user, as returned by `/rest/api/{2,3}/myself`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// One call that proves a token is accepted by the instance
#[async_trait]
pub trait IdentityCheck: Send + Sync {
    async fn myself(
        &self,
        endpoint: &EndpointConfig,
        token: &CredentialToken,
    ) -> Result<Identity, RemoteError>;
}

/// Unauthenticated reachability check of the instance
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self, endpoint: &EndpointConfig) -> Result<bool, RemoteError>;
}
