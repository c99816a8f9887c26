//! Header names used when building and signing requests

pub const DATE: &str = "Date";
pub const HOST: &str = "Host";
pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Total size of the file assembled by `mkfile`; must be set by the caller
pub const UPLOAD_FILE_SIZE: &str = "upload-file-size";

/// Request id headers, Kodo first
pub const REQUEST_ID_HEADERS: [&str; 2] = ["X-Reqid", "x-oss-request-id"];

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";
