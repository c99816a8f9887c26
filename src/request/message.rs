use super::command::{Command, HttpMethod};
use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use url::Url;

/// Query parameters that keep their insertion order.
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(Vec<(String, String)>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(idx).1)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Provider-agnostic description of an outgoing HTTP request.
///
/// Built once per call, rewritten by the signer, then handed to a
/// transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub command: Command,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub parameters: Parameters,
    #[serde(skip)]
    pub body: Option<Bytes>,
    /// Declared body length, `-1` when unknown
    pub content_length: i64,
    pub use_chunk_encoding: bool,
    pub endpoint: Url,
    /// Path relative to the endpoint, not yet percent-encoded
    pub resource_path: Option<String>,
    /// When set, replaces the endpoint + resource path composition
    pub absolute_url: Option<Url>,
}

impl RequestMessage {
    pub fn new(command: Command, endpoint: Url) -> Self {
        Self {
            bucket: None,
            key: None,
            command,
            method: command.default_method(),
            headers: HashMap::new(),
            parameters: Parameters::new(),
            body: None,
            content_length: 0,
            use_chunk_encoding: false,
            endpoint,
            resource_path: None,
            absolute_url: None,
        }
    }

    /// Set the declared body length. `-1` forces chunked encoding.
    pub fn set_content_length(&mut self, content_length: i64) {
        self.content_length = content_length;
        if content_length == -1 {
            self.use_chunk_encoding = true;
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Final URL the transport should hit
    pub fn url(&self) -> Result<Url, url::ParseError> {
        if let Some(url) = &self.absolute_url {
            return Ok(url.clone());
        }

        let mut url = match &self.resource_path {
            Some(path) => self.endpoint.join(path.trim_start_matches('/'))?,
            None => self.endpoint.clone(),
        };

        if !self.parameters.is_empty() {
            url.query_pairs_mut().extend_pairs(self.parameters.iter());
        }

        Ok(url)
    }
}
