use super::command::{Command, HttpMethod};
use super::headers;
use super::message::{Parameters, RequestMessage};
use super::resource::{determine_final_endpoint, determine_resource_path, format_rfc822_date};
use crate::config::ClientConfiguration;
use crate::types::error::{ClientError, ClientResult};
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use url::Url;

/// Fluent constructor for [`RequestMessage`].
///
/// The builder is not consumed by [`build`](Self::build); each call reads
/// the current field values, so one builder can produce several messages.
#[derive(Debug, Clone)]
pub struct RequestBuilder<'a> {
    config: &'a ClientConfiguration,
    endpoint: Option<Url>,
    command: Command,
    method: Option<HttpMethod>,
    bucket: Option<String>,
    key: Option<String>,
    headers: HashMap<String, String>,
    parameters: Parameters,
    body: Option<Bytes>,
    input_size: i64,
    use_chunk_encoding: bool,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a ClientConfiguration) -> Self {
        Self {
            config,
            endpoint: None,
            command: Command::GetObjectData,
            method: None,
            bucket: None,
            key: None,
            headers: HashMap::new(),
            parameters: Parameters::new(),
            body: None,
            input_size: 0,
            use_chunk_encoding: false,
        }
    }

    /// Override the configured endpoint for this request.
    ///
    /// Downloads are still signed against the configured endpoint host.
    pub fn endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the body and declare its exact length
    pub fn body_with_length(mut self, body: Bytes) -> Self {
        self.input_size = body.len() as i64;
        self.body = Some(body);
        self
    }

    /// Declared body length; `-1` for a stream of unknown size
    pub fn input_size(mut self, input_size: i64) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn use_chunk_encoding(mut self, use_chunk_encoding: bool) -> Self {
        self.use_chunk_encoding = use_chunk_encoding;
        self
    }

    pub fn build(&self) -> ClientResult<RequestMessage> {
        let max_size = self.config.max_body_size;
        if self.input_size < -1 || self.input_size > max_size {
            return Err(ClientError::InvalidArgument(format!(
                "content length {} is out of range [-1, {}]",
                self.input_size, max_size
            )));
        }

        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => self.config.endpoint_url()?,
        };

        let mut sent_headers = self.headers.clone();
        sent_headers.insert(headers::DATE.to_string(), format_rfc822_date(Utc::now()));

        let sld_enabled = self.config.sld_enabled;
        let bucket = self.bucket.as_deref();
        let key = self.key.as_deref();

        let mut request = RequestMessage::new(self.command, endpoint.clone());
        request.bucket = self.bucket.clone();
        request.key = self.key.clone();
        request.method = self.method.unwrap_or_else(|| self.command.default_method());
        request.endpoint = determine_final_endpoint(&endpoint, bucket, sld_enabled);
        request.resource_path = determine_resource_path(bucket, key, sld_enabled);
        request.headers = sent_headers;
        request.parameters = self.parameters.clone();
        request.body = self.body.clone();
        request.content_length = self.input_size;
        request.use_chunk_encoding = self.input_size == -1 || self.use_chunk_encoding;

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfiguration {
        ClientConfiguration {
            endpoint: "http://files.example.com".to_string(),
            max_body_size: 1024,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_injects_date_and_keeps_caller_headers() {
        let config = config();
        let request = RequestBuilder::new(&config)
            .command(Command::GetObjectMeta)
            .bucket("b")
            .key("k")
            .header("X-Custom", "1")
            .header(headers::DATE, "caller date")
            .build()
            .unwrap();

        assert_eq!(request.header("X-Custom"), Some("1"));
        let date = request.header(headers::DATE).unwrap();
        assert_ne!(date, "caller date");
        assert!(date.ends_with(" GMT"));
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.endpoint.host_str(), Some("b.files.example.com"));
        assert_eq!(request.resource_path.as_deref(), Some("k"));
    }

    #[test]
    fn test_unknown_length_forces_chunk_encoding() {
        let config = config();
        let request = RequestBuilder::new(&config)
            .command(Command::MakeBlock)
            .input_size(-1)
            .use_chunk_encoding(false)
            .build()
            .unwrap();
        assert!(request.use_chunk_encoding);
        assert_eq!(request.content_length, -1);

        let request = RequestBuilder::new(&config)
            .input_size(10)
            .use_chunk_encoding(false)
            .build()
            .unwrap();
        assert!(!request.use_chunk_encoding);
    }

    #[test]
    fn test_size_out_of_range() {
        let config = config();
        for size in [-2, 1025] {
            let result = RequestBuilder::new(&config).input_size(size).build();
            assert!(matches!(result, Err(ClientError::InvalidArgument(_))));
        }
        assert!(RequestBuilder::new(&config).input_size(1024).build().is_ok());
    }

    #[test]
    fn test_builder_is_reusable() {
        let config = config();
        let builder = RequestBuilder::new(&config)
            .command(Command::ListObjects)
            .bucket("b")
            .parameter("limit", "10");

        let first = builder.build().unwrap();
        let builder = builder.parameter("marker", "m1");
        let second = builder.build().unwrap();

        assert_eq!(first.parameters.get("marker"), None);
        assert_eq!(second.parameters.get("marker"), Some("m1"));
        assert_eq!(second.parameters.get("limit"), Some("10"));
    }

    #[test]
    fn test_path_style() {
        let config = ClientConfiguration {
            sld_enabled: true,
            ..config()
        };
        let request = RequestBuilder::new(&config)
            .bucket("b")
            .key("dir/k")
            .body_with_length(Bytes::from_static(b"hello"))
            .build()
            .unwrap();

        assert_eq!(request.endpoint.host_str(), Some("files.example.com"));
        assert_eq!(request.resource_path.as_deref(), Some("b/dir/k"));
        assert_eq!(request.content_length, 5);
    }
}
