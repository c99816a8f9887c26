use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of a single object inside a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub bucket_name: String,
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub storage_class: String,
}

/// Object metadata as returned by a stat call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub key: String,
    pub content_length: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub content_type: String,
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectListing {
    pub bucket_name: String,
    pub object_summaries: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
    pub marker: String,
    pub next_marker: String,
    pub truncated: bool,
    pub encoding_type: String,
}

/// Context returned by a `mkblk` call, needed to assemble the file later
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct BlockContext {
    pub ctx: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub crc32: u32,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub expired_at: i64,
}

/// Result of a completed `mkfile` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct PutObjectResult {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub hash: String,
}

/// Parameters of a single listing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: Option<u32>,
}

impl ListObjectsRequest {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}
