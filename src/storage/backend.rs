use crate::request::RequestMessage;
use bytes::Bytes;
use std::collections::HashMap;

/// Raw HTTP response handed back by a transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Low-level failure reported by a transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("read timed out: {0}")]
    SocketTimeout(String),

    #[error("connect timed out: {0}")]
    ConnectTimeout(String),

    #[error("server sent no response: {0}")]
    NoHttpResponse(String),

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("socket error: {0}")]
    Socket(String),

    /// The body was already consumed and cannot be re-sent on retry
    #[error("request cannot be repeated: {0}")]
    NonRepeatableRequest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Executes signed requests - implement this for an HTTP client
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RequestMessage) -> Result<RawResponse, TransportError>;
}
