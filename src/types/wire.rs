//! Kodo response records as they arrive on the wire, and their
//! translation into the canonical object-storage model.

use super::models::{ObjectListing, ObjectMetadata, ObjectSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// `putTime` ticks per second (100ns units)
const PUT_TIME_TICKS_PER_SECOND: i64 = 10_000_000;

/// Marker value that the list service returns in place of "no marker"
const NULL_MARKER: &str = "null";

/// Outcome carried by the `error` field of a wire record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireStatus {
    pub success: bool,
    pub message: Option<String>,
}

impl WireStatus {
    fn from_error_field(error: &str) -> Self {
        if error.is_empty() {
            Self {
                success: true,
                message: None,
            }
        } else {
            Self {
                success: false,
                message: Some(error.to_string()),
            }
        }
    }
}

/// Normalize a continuation marker: both `""` and `"null"` mean there is
/// no further page.
pub fn normalize_marker(marker: Option<&str>) -> String {
    match marker {
        Some(m) if !m.is_empty() && m != NULL_MARKER => m.to_string(),
        _ => String::new(),
    }
}

/// Convert a `putTime` value into a UTC timestamp
pub fn put_time_to_datetime(put_time: i64) -> DateTime<Utc> {
    let secs = put_time.div_euclid(PUT_TIME_TICKS_PER_SECOND);
    let nanos = put_time.rem_euclid(PUT_TIME_TICKS_PER_SECOND) * 100;
    DateTime::from_timestamp(secs, nanos as u32).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Object record returned by `stat` and inside `list` items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KodoObjectMetadata {
    pub error: String,
    pub key: String,
    pub hash: String,
    pub fsize: u64,
    pub put_time: i64,
    pub mime_type: String,
    #[serde(rename = "type")]
    pub storage_type: i32,
}

impl KodoObjectMetadata {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn status(&self) -> WireStatus {
        WireStatus::from_error_field(&self.error)
    }

    /// Translate into a listing entry owned by `bucket`.
    ///
    /// Returns None when the record carries an error.
    pub fn to_object_summary(&self, bucket: &str) -> Option<ObjectSummary> {
        if !self.status().success {
            return None;
        }

        Some(ObjectSummary {
            bucket_name: bucket.to_string(),
            key: self.key.clone(),
            size: self.fsize,
            last_modified: put_time_to_datetime(self.put_time),
            etag: self.hash.clone(),
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
        })
    }

    /// Translate into object metadata.
    ///
    /// Returns None when the record carries an error.
    pub fn to_object_metadata(&self) -> Option<ObjectMetadata> {
        if !self.status().success {
            return None;
        }

        Some(ObjectMetadata {
            key: self.key.clone(),
            content_length: self.fsize,
            last_modified: put_time_to_datetime(self.put_time),
            etag: self.hash.clone(),
            content_type: self.mime_type.clone(),
        })
    }
}

/// One page returned by the list service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KodoObjectListing {
    pub items: Option<Vec<KodoObjectMetadata>>,
    pub marker: Option<String>,
    pub error: String,
    pub common_prefixes: Option<Vec<String>>,
}

impl KodoObjectListing {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn status(&self) -> WireStatus {
        WireStatus::from_error_field(&self.error)
    }

    /// Normalized continuation marker of this page
    pub fn next_marker(&self) -> String {
        normalize_marker(self.marker.as_deref())
    }

    /// Translate into a canonical listing page for `bucket`.
    ///
    /// An error-bearing page yields None, never a partial listing. Items
    /// that individually carry an error are skipped.
    pub fn to_object_listing(&self, bucket: &str) -> Option<ObjectListing> {
        if !self.status().success {
            return None;
        }

        let marker = self.next_marker();

        let object_summaries = self
            .items
            .iter()
            .flatten()
            .filter_map(|item| item.to_object_summary(bucket))
            .collect();

        let common_prefixes = self.common_prefixes.clone().unwrap_or_default();

        Some(ObjectListing {
            bucket_name: bucket.to_string(),
            object_summaries,
            common_prefixes,
            truncated: !marker.is_empty(),
            next_marker: marker.clone(),
            marker,
            encoding_type: String::new(),
        })
    }
}
