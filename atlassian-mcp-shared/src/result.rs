//! Uniform success/failure value returned by auth operations and tool handlers

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Closed set of failure categories reported to MCP clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CredentialError,
    NetworkError,
    PermissionError,
    AuthError,
    ConfigError,
    SetupError,
    HealthCheckError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CredentialError => "credential_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::PermissionError => "permission_error",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::ConfigError => "config_error",
            ErrorKind::SetupError => "setup_error",
            ErrorKind::HealthCheckError => "health_check_error",
            ErrorKind::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying error a failure was derived from, kept for debugging output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCause {
    pub type_name: String,
    pub message: String,
}

impl ErrorCause {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Capture the short type name and display text of `err`
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let full = std::any::type_name::<E>();
        let type_name = full.rsplit("::").next().unwrap_or(full);
        Self::new(type_name, err.to_string())
    }
}

/// Classified failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub message: String,
    pub kind: ErrorKind,
    pub cause: Option<ErrorCause>,
}

impl ToolFailure {
    pub fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: ErrorCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Configuration problem reported through the tool channel
    pub fn config(message: impl fmt::Display) -> Self {
        Self::new(format!("Configuration Error: {message}"), ErrorKind::ConfigError)
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl std::error::Error for ToolFailure {}

/// Exactly one of a value or a classified failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult<T> {
    Ok(T),
    Err(ToolFailure),
}

impl<T> ToolResult<T> {
    pub fn ok(value: T) -> Self {
        ToolResult::Ok(value)
    }

    pub fn failure(message: impl Into<String>, kind: ErrorKind) -> Self {
        ToolResult::Err(ToolFailure::new(message, kind))
    }

    pub fn failure_with_cause(
        message: impl Into<String>,
        kind: ErrorKind,
        cause: ErrorCause,
    ) -> Self {
        ToolResult::Err(ToolFailure::new(message, kind).with_cause(cause))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ToolResult::Ok(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ToolResult::Ok(value) => Some(value),
            ToolResult::Err(_) => None,
        }
    }

    pub fn failure_ref(&self) -> Option<&ToolFailure> {
        match self {
            ToolResult::Ok(_) => None,
            ToolResult::Err(failure) => Some(failure),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure_ref().map(|f| f.kind)
    }

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            ToolResult::Ok(value) => value,
            ToolResult::Err(_) => default,
        }
    }

    pub fn into_result(self) -> Result<T, ToolFailure> {
        match self {
            ToolResult::Ok(value) => Ok(value),
            ToolResult::Err(failure) => Err(failure),
        }
    }
}

impl<T: Serialize> ToolResult<T> {
    /// MCP response shape: `{"success": true, "value": ..}` or the failure
    /// fields, with `exception_*` present only when a cause was recorded.
    pub fn to_json(&self) -> Value {
        match self {
            ToolResult::Ok(value) => {
                let value = serde_json::to_value(value).unwrap_or_else(|e| {
                    Value::String(format!("<unserializable value: {e}>"))
                });
                json!({ "success": true, "value": value })
            }
            ToolResult::Err(failure) => {
                let mut body = Map::new();
                body.insert("success".to_string(), Value::Bool(false));
                body.insert("error".to_string(), Value::String(failure.message.clone()));
                body.insert(
                    "error_type".to_string(),
                    Value::String(failure.kind.as_str().to_string()),
                );
                if let Some(cause) = &failure.cause {
                    body.insert(
                        "exception_type".to_string(),
                        Value::String(cause.type_name.clone()),
                    );
                    body.insert(
                        "exception_message".to_string(),
                        Value::String(cause.message.clone()),
                    );
                }
                Value::Object(body)
            }
        }
    }
}

impl<T> From<Result<T, ToolFailure>> for ToolResult<T> {
    fn from(result: Result<T, ToolFailure>) -> Self {
        match result {
            Ok(value) => ToolResult::Ok(value),
            Err(failure) => ToolResult::Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_json_shape() {
        let result = ToolResult::ok(true);
        assert_eq!(result.to_json(), json!({"success": true, "value": true}));
        assert!(result.is_ok());
        assert_eq!(result.value(), Some(&true));
    }

    #[test]
    fn test_failure_json_without_cause() {
        let result: ToolResult<bool> = ToolResult::failure("boom", ErrorKind::SetupError);
        let body = result.to_json();

        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("boom"));
        assert_eq!(body["error_type"], json!("setup_error"));
        assert!(body.get("value").is_none());
        assert!(body.get("exception_type").is_none());
        assert!(body.get("exception_message").is_none());
    }

    #[test]
    fn test_failure_json_with_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let result: ToolResult<()> = ToolResult::failure_with_cause(
            "write failed",
            ErrorKind::UnknownError,
            ErrorCause::from_error(&io),
        );
        let body = result.to_json();

        assert_eq!(body["exception_type"], json!("Error"));
        assert_eq!(body["exception_message"], json!("disk on fire"));
        assert_eq!(result.error_kind(), Some(ErrorKind::UnknownError));
    }

    #[test]
    fn test_unwrap_or_and_into_result() {
        let failed: ToolResult<u32> = ToolResult::failure("nope", ErrorKind::AuthError);
        assert_eq!(failed.clone().unwrap_or(7), 7);
        assert_eq!(failed.into_result().unwrap_err().kind, ErrorKind::AuthError);

        assert_eq!(ToolResult::ok(3).unwrap_or(7), 3);
    }

    #[test]
    fn test_error_kind_serialization() {
        assert_eq!(
            serde_json::to_value(ErrorKind::HealthCheckError).unwrap(),
            json!("health_check_error")
        );
        assert_eq!(ErrorKind::PermissionError.to_string(), "permission_error");
    }
}
