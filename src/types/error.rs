use crate::request::Command;
use std::fmt;

/// Client-side error codes, reported when a failure happens before or
/// outside of the provider (validation, transport, signing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientErrorCode {
    Unknown,
    SocketTimeout,
    SocketException,
    ConnectionTimeout,
    ConnectionRefused,
    UnknownHost,
    NonRepeatableRequest,
}

impl ClientErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientErrorCode::Unknown => "Unknown",
            ClientErrorCode::SocketTimeout => "SocketTimeout",
            ClientErrorCode::SocketException => "SocketException",
            ClientErrorCode::ConnectionTimeout => "ConnectionTimeout",
            ClientErrorCode::ConnectionRefused => "ConnectionRefused",
            ClientErrorCode::UnknownHost => "UnknownHost",
            ClientErrorCode::NonRepeatableRequest => "NonRepeatableRequest",
        }
    }

    /// True when the request may not be re-sent as-is
    pub fn is_retry_unsafe(&self) -> bool {
        matches!(self, ClientErrorCode::NonRepeatableRequest)
    }
}

impl fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider error codes that this layer produces itself
pub mod provider_codes {
    pub const INVALID_RESPONSE: &str = "InvalidResponse";
    pub const UNKNOWN: &str = "Unknown";
}

/// Uniform provider-reported error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} [code: {code}, status: {status}, request id: {request_id}]")]
pub struct ProviderError {
    pub message: String,
    pub status: u16,
    pub code: String,
    pub request_id: String,
    pub host_id: Option<String>,
    /// Leading bytes of the raw response body, kept for diagnostics
    pub raw_response: Option<String>,
}

/// Errors surfaced to callers of this crate
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("failed to sign {command} request: {message}")]
    SigningFailed { command: Command, message: String },

    #[error("[{code}] {message} (request id: {request_id})")]
    Network {
        code: ClientErrorCode,
        message: String,
        request_id: String,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Network error code, if this is a classified transport failure
    pub fn network_code(&self) -> Option<ClientErrorCode> {
        match self {
            ClientError::Network { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_code_strings() {
        assert_eq!(ClientErrorCode::SocketTimeout.to_string(), "SocketTimeout");
        assert_eq!(
            ClientErrorCode::NonRepeatableRequest.as_str(),
            "NonRepeatableRequest"
        );
        assert!(ClientErrorCode::NonRepeatableRequest.is_retry_unsafe());
        assert!(!ClientErrorCode::SocketTimeout.is_retry_unsafe());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError {
            message: "no such file or directory".to_string(),
            status: 612,
            code: "612".to_string(),
            request_id: "req-1".to_string(),
            host_id: None,
            raw_response: None,
        };
        assert_eq!(
            err.to_string(),
            "no such file or directory [code: 612, status: 612, request id: req-1]"
        );
    }

    #[test]
    fn test_network_code() {
        let err = ClientError::Network {
            code: ClientErrorCode::UnknownHost,
            message: "dns".to_string(),
            request_id: "Unknown".to_string(),
        };
        assert_eq!(err.network_code(), Some(ClientErrorCode::UnknownHost));
        assert_eq!(
            ClientError::InvalidState("x".to_string()).network_code(),
            None
        );
    }
}
