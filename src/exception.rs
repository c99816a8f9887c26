//! Classification of transport failures and provider error payloads into
//! [`ClientError`] / [`ProviderError`].

use crate::request::headers::REQUEST_ID_HEADERS;
use crate::storage::{RawResponse, TransportError};
use crate::types::error::{ClientError, ClientErrorCode, ProviderError, provider_codes};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;

/// Request id reported when the failure happened before any response
pub const UNKNOWN_REQUEST_ID: &str = "Unknown";

/// Raw bodies are cut to this many bytes before being attached to errors
const RAW_SNIPPET_LIMIT: usize = 512;

/// Structured error payload extracted from a provider response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderErrorResult {
    pub code: String,
    pub message: String,
    pub request_id: String,
    pub host_id: Option<String>,
    pub status: u16,
}

/// Kodo error body: `{"error": "..."}`
#[derive(Debug, Deserialize)]
struct KodoErrorBody {
    error: String,
    #[serde(default)]
    error_code: Option<String>,
}

/// OSS-style XML error body
#[derive(Debug, Deserialize)]
#[serde(rename = "Error")]
struct XmlErrorBody {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "RequestId", default)]
    request_id: Option<String>,
    #[serde(rename = "HostId", default)]
    host_id: Option<String>,
}

fn classify_io(kind: ErrorKind) -> ClientErrorCode {
    match kind {
        ErrorKind::TimedOut => ClientErrorCode::SocketTimeout,
        ErrorKind::ConnectionRefused => ClientErrorCode::ConnectionRefused,
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe
        | ErrorKind::AddrInUse
        | ErrorKind::AddrNotAvailable
        | ErrorKind::HostUnreachable
        | ErrorKind::NetworkUnreachable => ClientErrorCode::SocketException,
        _ => ClientErrorCode::Unknown,
    }
}

/// Classify a transport failure. The request id is always unknown since
/// no response was received.
pub fn network_error(err: TransportError) -> ClientError {
    let code = match &err {
        TransportError::SocketTimeout(_) => ClientErrorCode::SocketTimeout,
        TransportError::Socket(_) => ClientErrorCode::SocketException,
        TransportError::ConnectTimeout(_) | TransportError::NoHttpResponse(_) => {
            ClientErrorCode::ConnectionTimeout
        }
        TransportError::UnknownHost(_) => ClientErrorCode::UnknownHost,
        TransportError::ConnectionRefused(_) => ClientErrorCode::ConnectionRefused,
        TransportError::NonRepeatableRequest(_) => ClientErrorCode::NonRepeatableRequest,
        TransportError::Io(io) => classify_io(io.kind()),
        TransportError::Other(_) => ClientErrorCode::Unknown,
    };

    if code.is_retry_unsafe() {
        tracing::warn!("Request body cannot be replayed, retrying is unsafe: {}", err);
    }

    ClientError::Network {
        code,
        message: err.to_string(),
        request_id: UNKNOWN_REQUEST_ID.to_string(),
    }
}

fn snippet(raw: &str) -> String {
    if raw.len() <= RAW_SNIPPET_LIMIT {
        return raw.to_string();
    }
    let mut end = RAW_SNIPPET_LIMIT;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    raw[..end].to_string()
}

pub fn provider_error(result: ProviderErrorResult, raw_response: Option<&str>) -> ProviderError {
    ProviderError {
        message: result.message,
        status: result.status,
        code: result.code,
        request_id: result.request_id,
        host_id: result.host_id,
        raw_response: raw_response.map(snippet),
    }
}

/// Error for a response body that could not be understood
pub fn invalid_response(
    request_id: &str,
    status: u16,
    message: impl Into<String>,
    raw_response: Option<&str>,
) -> ProviderError {
    provider_error(
        ProviderErrorResult {
            code: provider_codes::INVALID_RESPONSE.to_string(),
            message: message.into(),
            request_id: request_id.to_string(),
            host_id: None,
            status,
        },
        raw_response,
    )
}

/// Error for a response that carried no body at all
pub fn unknown_provider_error(request_id: &str, status: u16) -> ProviderError {
    provider_error(
        ProviderErrorResult {
            code: provider_codes::UNKNOWN.to_string(),
            message: format!("No body in response, http status code {}", status),
            request_id: request_id.to_string(),
            host_id: None,
            status,
        },
        None,
    )
}

/// Request id of a response, or [`UNKNOWN_REQUEST_ID`]
pub fn request_id_of(response: &RawResponse) -> String {
    REQUEST_ID_HEADERS
        .iter()
        .find_map(|name| response.header(name))
        .unwrap_or(UNKNOWN_REQUEST_ID)
        .to_string()
}

/// Build the provider error for a failed response.
///
/// Kodo JSON bodies are tried first, then OSS-style XML.
pub fn error_from_response(response: &RawResponse) -> ProviderError {
    let request_id = request_id_of(response);
    let status = response.status;

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return unknown_provider_error(&request_id, status);
    }

    let raw = String::from_utf8_lossy(&response.body);

    if let Ok(body) = serde_json::from_slice::<KodoErrorBody>(&response.body) {
        tracing::warn!(
            "Provider error (status {}, request id {}): {}",
            status,
            request_id,
            body.error
        );
        return provider_error(
            ProviderErrorResult {
                code: body.error_code.unwrap_or_else(|| status.to_string()),
                message: body.error,
                request_id,
                host_id: None,
                status,
            },
            Some(&raw),
        );
    }

    if let Ok(body) = quick_xml::de::from_str::<XmlErrorBody>(&raw) {
        tracing::warn!(
            "Provider error (status {}, request id {}): {} {}",
            status,
            request_id,
            body.code,
            body.message
        );
        return provider_error(
            ProviderErrorResult {
                code: body.code,
                message: body.message,
                request_id: body.request_id.unwrap_or(request_id),
                host_id: body.host_id,
                status,
            },
            Some(&raw),
        );
    }

    invalid_response(
        &request_id,
        status,
        format!("Failed to parse error response with status {}", status),
        Some(&raw),
    )
}

/// Error for a successful response whose wire record reports a failure
pub fn wire_error(response: &RawResponse, message: &str) -> ProviderError {
    provider_error(
        ProviderErrorResult {
            code: response.status.to_string(),
            message: message.to_string(),
            request_id: request_id_of(response),
            host_id: None,
            status: response.status,
        },
        None,
    )
}

/// Decode the JSON body of a successful response.
///
/// An empty body becomes an unknown provider error and an unparsable one an
/// invalid response, so both keep the status and request id.
pub fn decode_body<R: DeserializeOwned>(response: &RawResponse) -> Result<R, ProviderError> {
    let request_id = request_id_of(response);
    if response.body.iter().all(u8::is_ascii_whitespace) {
        tracing::warn!(
            "Empty body in successful response (status {}, request id {})",
            response.status,
            request_id
        );
        return Err(unknown_provider_error(&request_id, response.status));
    }

    serde_json::from_slice(&response.body).map_err(|e| {
        invalid_response(
            &request_id,
            response.status,
            format!("Failed to parse response body: {}", e),
            Some(&String::from_utf8_lossy(&response.body)),
        )
    })
}
