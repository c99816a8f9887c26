use dashmap::DashMap;

/// Last-seen continuation marker per listing.
///
/// Safe to share between tasks listing different paths concurrently;
/// writes to the same key are last-write-wins. Construct one per process
/// (or per test) and hand it out as `Arc<MarkerCache>`.
#[derive(Debug, Default)]
pub struct MarkerCache {
    markers: DashMap<String, String>,
}

impl MarkerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of a listing: bucket plus prefix
    pub fn listing_key(bucket: &str, prefix: Option<&str>) -> String {
        format!("{}/{}", bucket, prefix.unwrap_or_default())
    }

    pub fn set_marker(&self, path: impl Into<String>, marker: impl Into<String>) {
        self.markers.insert(path.into(), marker.into());
    }

    pub fn get_marker(&self, path: &str) -> Option<String> {
        self.markers.get(path).map(|entry| entry.value().clone())
    }

    pub fn remove_key(&self, path: &str) {
        self.markers.remove(path);
    }

    pub fn contains_key(&self, path: &str) -> bool {
        self.markers.contains_key(path)
    }

    pub fn clear(&self) {
        self.markers.clear();
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
