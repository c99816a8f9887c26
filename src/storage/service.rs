use super::backend::{RawResponse, Transport};
use crate::auth::{CommandSigner, Credentials};
use crate::config::ClientConfiguration;
use crate::exception::{decode_body, error_from_response, network_error, wire_error};
use crate::marker_cache::MarkerCache;
use crate::request::headers::UPLOAD_FILE_SIZE;
use crate::request::{Command, RequestBuilder};
use crate::types::error::{ClientError, ClientResult};
use crate::types::wire::{KodoObjectListing, KodoObjectMetadata, normalize_marker};
use crate::types::{BlockContext, ListObjectsRequest, ObjectListing, ObjectMetadata, PutObjectResult};
use bytes::Bytes;
use futures::Stream;
use std::sync::Arc;

/// OSS-style object operations executed against Kodo.
///
/// Each call builds a request, signs it for its command, sends it through
/// the transport and translates the reply.
pub struct ObjectService<T: Transport> {
    config: ClientConfiguration,
    signer: CommandSigner,
    markers: Arc<MarkerCache>,
    transport: T,
}

impl<T: Transport> ObjectService<T> {
    pub fn new(config: ClientConfiguration, credentials: Credentials, transport: T) -> Self {
        let signer = CommandSigner::new(credentials, &config);
        Self {
            config,
            signer,
            markers: Arc::new(MarkerCache::new()),
            transport,
        }
    }

    /// Share a marker cache with other services
    pub fn with_marker_cache(mut self, markers: Arc<MarkerCache>) -> Self {
        self.markers = markers;
        self
    }

    pub fn marker_cache(&self) -> &Arc<MarkerCache> {
        &self.markers
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfiguration {
        &self.config
    }

    fn request(&self, command: Command, bucket: &str, key: Option<&str>) -> RequestBuilder<'_> {
        let builder = RequestBuilder::new(&self.config)
            .command(command)
            .bucket(bucket);
        match key {
            Some(key) => builder.key(key),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder<'_>) -> ClientResult<RawResponse> {
        let mut request = builder.build()?;
        let command = request.command;
        self.signer.sign(command, &mut request)?;

        tracing::debug!(
            "Sending {} {} for {}",
            request.method,
            request.resource_path.as_deref().unwrap_or("/"),
            command
        );

        let response = self.transport.send(request).await.map_err(network_error)?;
        if !response.is_success() {
            return Err(error_from_response(&response).into());
        }
        Ok(response)
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Bytes> {
        let response = self
            .execute(self.request(Command::GetObjectData, bucket, Some(key)))
            .await?;
        Ok(response.body)
    }

    pub async fn get_object_metadata(&self, bucket: &str, key: &str) -> ClientResult<ObjectMetadata> {
        let response = self
            .execute(self.request(Command::GetObjectMeta, bucket, Some(key)))
            .await?;

        let record: KodoObjectMetadata = decode_body(&response)?;
        let mut metadata = match record.to_object_metadata() {
            Some(metadata) => metadata,
            None => {
                let message = record.status().message.unwrap_or_default();
                return Err(wire_error(&response, &message).into());
            }
        };

        // stat replies do not echo the key
        if metadata.key.is_empty() {
            metadata.key = key.to_string();
        }
        Ok(metadata)
    }

    /// Fetch one listing page.
    ///
    /// Without an explicit marker the listing resumes from the last marker
    /// cached for the same bucket and prefix. The cache is updated with the
    /// new marker, or cleared once the last page is reached.
    pub async fn list_objects(&self, request: &ListObjectsRequest) -> ClientResult<ObjectListing> {
        let listing_key = MarkerCache::listing_key(&request.bucket, request.prefix.as_deref());
        let marker = match &request.marker {
            Some(marker) => normalize_marker(Some(marker)),
            None => self.markers.get_marker(&listing_key).unwrap_or_default(),
        };

        let mut builder = self
            .request(Command::ListObjects, &request.bucket, None)
            .parameter("marker", marker.as_str());
        if let Some(prefix) = &request.prefix {
            builder = builder.parameter("prefix", prefix.as_str());
        }
        if let Some(delimiter) = &request.delimiter {
            builder = builder.parameter("delimiter", delimiter.as_str());
        }
        if let Some(max_keys) = request.max_keys {
            builder = builder.parameter("max-keys", max_keys.to_string());
        }

        let response = self.execute(builder).await?;
        let page: KodoObjectListing = decode_body(&response)?;
        let listing = match page.to_object_listing(&request.bucket) {
            Some(listing) => listing,
            None => {
                let message = page.status().message.unwrap_or_default();
                return Err(wire_error(&response, &message).into());
            }
        };

        if listing.truncated {
            self.markers.set_marker(listing_key, listing.next_marker.as_str());
        } else {
            self.markers.remove_key(&listing_key);
        }

        tracing::debug!(
            "Listed {} objects and {} prefixes in {}, truncated: {}",
            listing.object_summaries.len(),
            listing.common_prefixes.len(),
            request.bucket,
            listing.truncated
        );
        Ok(listing)
    }

    /// Walk every page of a listing, starting from `request.marker` (or the
    /// beginning when unset).
    pub fn list_all_objects(
        &self,
        request: ListObjectsRequest,
    ) -> impl Stream<Item = ClientResult<ObjectListing>> + '_ {
        let start = Some(request.marker.clone().unwrap_or_default());
        futures::stream::try_unfold(start, move |state| {
            let request = request.clone();
            async move {
                let Some(marker) = state else {
                    return Ok::<_, ClientError>(None);
                };
                let page = self.list_objects(&request.with_marker(marker)).await?;
                let next = page.truncated.then(|| page.next_marker.clone());
                Ok(Some((page, next)))
            }
        })
    }

    /// Upload one block of at most `block_size` bytes
    pub async fn make_block(&self, bucket: &str, key: &str, data: Bytes) -> ClientResult<BlockContext> {
        let builder = self
            .request(Command::MakeBlock, bucket, Some(key))
            .body_with_length(data);
        let response = self.execute(builder).await?;
        Ok(decode_body::<BlockContext>(&response)?)
    }

    /// Assemble previously uploaded blocks into `key`
    pub async fn make_file(
        &self,
        bucket: &str,
        key: &str,
        total_size: u64,
        blocks: &[BlockContext],
    ) -> ClientResult<PutObjectResult> {
        let contexts = blocks
            .iter()
            .map(|block| block.ctx.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let builder = self
            .request(Command::MakeFile, bucket, Some(key))
            .header(UPLOAD_FILE_SIZE, total_size.to_string())
            .body_with_length(Bytes::from(contexts));
        let response = self.execute(builder).await?;

        let mut result: PutObjectResult = decode_body(&response)?;
        if result.key.is_empty() {
            result.key = key.to_string();
        }
        Ok(result)
    }

    /// Upload `data` as a sequence of blocks followed by one `mkfile`
    pub async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> ClientResult<PutObjectResult> {
        let block_size = self.config.block_size.max(1);
        let total_size = data.len() as u64;

        let mut blocks = Vec::with_capacity(data.len().div_ceil(block_size));
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + block_size).min(data.len());
            blocks.push(self.make_block(bucket, key, data.slice(offset..end)).await?);
            offset = end;
        }

        tracing::debug!(
            "Uploaded {} blocks ({} bytes) for {}:{}",
            blocks.len(),
            total_size,
            bucket,
            key
        );

        self.make_file(bucket, key, total_size, &blocks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryTransport;

    fn credentials() -> Credentials {
        Credentials::new("svc-ak", "svc-sk")
    }

    fn service() -> ObjectService<InMemoryTransport> {
        let config = ClientConfiguration {
            endpoint: "http://files.example.com".to_string(),
            block_size: 4,
            ..Default::default()
        };
        ObjectService::new(config, credentials(), InMemoryTransport::new(credentials()))
    }

    #[tokio::test]
    async fn test_put_object_splits_into_blocks() {
        let service = service();
        let result = service
            .put_object("b", "k", Bytes::from_static(b"0123456789"))
            .await
            .unwrap();
        assert_eq!(result.key, "k");
        assert!(!result.hash.is_empty());

        let requests = service.transport().requests().await;
        let paths: Vec<_> = requests
            .iter()
            .map(|r| r.resource_path.clone().unwrap())
            .collect();
        assert_eq!(paths[..3], ["mkblk/4", "mkblk/4", "mkblk/2"]);
        assert!(paths[3].starts_with("mkfile/10/key/"));

        assert_eq!(
            service.transport().object("b", "k").await.unwrap(),
            Bytes::from_static(b"0123456789")
        );
        assert_eq!(service.transport().pending_blocks().await, 0);
    }

    #[tokio::test]
    async fn test_metadata_fills_in_key() {
        let service = service();
        service
            .transport()
            .insert_object("b", "notes.md", "# hi", "text/markdown")
            .await;

        let metadata = service.get_object_metadata("b", "notes.md").await.unwrap();
        assert_eq!(metadata.key, "notes.md");
        assert_eq!(metadata.content_length, 4);
        assert_eq!(metadata.content_type, "text/markdown");
    }

    #[tokio::test]
    async fn test_error_field_in_successful_reply() {
        let service = service();
        service
            .transport()
            .respond_next(
                RawResponse::new(200, r#"{"error":"bucket is frozen"}"#)
                    .with_header("X-Reqid", "r-42"),
            )
            .await;

        let err = service
            .list_objects(&ListObjectsRequest::new("b"))
            .await
            .unwrap_err();
        match err {
            ClientError::Provider(e) => {
                assert_eq!(e.message, "bucket is frozen");
                assert_eq!(e.request_id, "r-42");
                assert_eq!(e.status, 200);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
