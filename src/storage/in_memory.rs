use super::backend::{RawResponse, Transport, TransportError};
use crate::auth::token::urlsafe_base64;
use crate::auth::{Credentials, KodoAuth};
use crate::request::headers::{AUTHORIZATION, CONTENT_TYPE, FORM_URLENCODED, HOST, OCTET_STREAM};
use crate::request::{HttpMethod, RequestMessage};
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use url::Url;

const DEFAULT_LIST_LIMIT: usize = 1000;
const REQUEST_ID_HEADER: &str = "X-Reqid";
/// Kodo status for a missing entry
const STATUS_NO_SUCH_ENTRY: u16 = 612;
/// Kodo status for an unknown block context
const STATUS_BAD_CONTEXT: u16 = 701;
const BLOCK_CONTEXT_TTL_SECS: i64 = 7 * 24 * 3600;

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    hash: String,
    mime_type: String,
    put_time: i64,
}

enum Scripted {
    Fail(TransportError),
    Respond(RawResponse),
}

#[derive(Deserialize)]
struct UploadPolicy {
    scope: String,
    deadline: i64,
}

/// In-memory Kodo emulator for testing/development.
///
/// Serves `stat`, `list`, `mkblk`, `mkfile` and signed downloads, and
/// verifies every token against its credentials the way the service does.
#[derive(Clone)]
pub struct InMemoryTransport {
    credentials: Credentials,
    objects: Arc<RwLock<BTreeMap<(String, String), StoredObject>>>,
    blocks: Arc<RwLock<HashMap<String, Bytes>>>,
    scripted: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<RequestMessage>>>,
    sequence: Arc<AtomicU64>,
}

fn etag(data: &[u8]) -> String {
    urlsafe_base64(Sha1::digest(data).as_slice())
}

fn put_time_now() -> i64 {
    Utc::now()
        .timestamp_nanos_opt()
        .map(|nanos| nanos / 100)
        .unwrap_or_default()
}

fn decode_segment(segment: &str) -> Option<String> {
    let raw = URL_SAFE.decode(segment).ok()?;
    String::from_utf8(raw).ok()
}

impl InMemoryTransport {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            blocks: Arc::new(RwLock::new(HashMap::new())),
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Store an object directly, bypassing the upload API
    pub async fn insert_object(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        mime_type: &str,
    ) {
        let data = data.into();
        let stored = StoredObject {
            hash: etag(&data),
            data,
            mime_type: mime_type.to_string(),
            put_time: put_time_now(),
        };
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), stored);
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.data.clone())
    }

    pub async fn mime_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.mime_type.clone())
    }

    /// Make the next `send` fail with `err` before reaching the emulator
    pub async fn fail_next(&self, err: TransportError) {
        self.scripted.lock().await.push_back(Scripted::Fail(err));
    }

    /// Make the next `send` return `response` verbatim
    pub async fn respond_next(&self, response: RawResponse) {
        self.scripted.lock().await.push_back(Scripted::Respond(response));
    }

    /// Every request received so far, in order
    pub async fn requests(&self) -> Vec<RequestMessage> {
        self.requests.lock().await.clone()
    }

    /// Uploaded blocks not yet assembled into a file
    pub async fn pending_blocks(&self) -> usize {
        self.blocks.read().await.len()
    }

    fn reply(&self, status: u16, body: Value) -> RawResponse {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&body).unwrap_or_default();
        RawResponse::new(status, body).with_header(REQUEST_ID_HEADER, format!("emu-{}", id))
    }

    fn error(&self, status: u16, message: &str) -> RawResponse {
        self.reply(status, json!({ "error": message }))
    }

    fn unauthorized(&self) -> RawResponse {
        self.error(401, "bad token")
    }

    fn verify_qbox(&self, request: &RequestMessage, url: &Url) -> Result<(), RawResponse> {
        let token = request
            .header(AUTHORIZATION)
            .and_then(|v| v.strip_prefix("QBox "))
            .ok_or_else(|| self.unauthorized())?;

        let expected = KodoAuth::new(&self.credentials)
            .sign_request(url, None, Some(FORM_URLENCODED))
            .map_err(|_| self.unauthorized())?;

        if token != expected {
            return Err(self.unauthorized());
        }
        Ok(())
    }

    /// Returns the bucket the upload token is scoped to
    fn verify_upload_token(&self, request: &RequestMessage) -> Result<String, RawResponse> {
        let token = request
            .header(AUTHORIZATION)
            .and_then(|v| v.strip_prefix("UpToken "))
            .ok_or_else(|| self.unauthorized())?;

        let (signature, encoded) = token.rsplit_once(':').ok_or_else(|| self.unauthorized())?;
        let expected = KodoAuth::new(&self.credentials)
            .sign(encoded.as_bytes())
            .map_err(|_| self.unauthorized())?;
        if signature != expected {
            return Err(self.unauthorized());
        }

        let policy: UploadPolicy = URL_SAFE
            .decode(encoded)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or_else(|| self.error(400, "invalid put policy"))?;

        if policy.deadline < Utc::now().timestamp() {
            return Err(self.error(401, "token out of date"));
        }

        let bucket = policy
            .scope
            .split_once(':')
            .map_or(policy.scope.as_str(), |(bucket, _)| bucket);
        Ok(bucket.to_string())
    }

    async fn download(&self, request: &RequestMessage, url: &Url) -> RawResponse {
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let (Some(host), Some(deadline), Some(token)) =
            (request.header(HOST), params.get("e"), params.get("token"))
        else {
            return self.unauthorized();
        };

        let signed = format!("http://{}{}?e={}", host, url.path(), deadline);
        let valid = KodoAuth::new(&self.credentials)
            .sign(signed.as_bytes())
            .is_ok_and(|expected| &expected == token);
        if !valid {
            return self.unauthorized();
        }
        if deadline.parse::<i64>().map_or(true, |e| e < Utc::now().timestamp()) {
            return self.error(401, "token out of date");
        }

        let key = urlencoding::decode(url.path().trim_start_matches('/'))
            .map(|k| k.into_owned())
            .unwrap_or_default();
        let bucket = request.bucket.clone().unwrap_or_default();

        match self.objects.read().await.get(&(bucket, key)) {
            Some(obj) => {
                let id = self.sequence.fetch_add(1, Ordering::Relaxed);
                RawResponse::new(200, obj.data.clone())
                    .with_header(CONTENT_TYPE, obj.mime_type.clone())
                    .with_header(REQUEST_ID_HEADER, format!("emu-{}", id))
            }
            None => self.error(404, "Document not found"),
        }
    }

    async fn stat(&self, request: &RequestMessage, url: &Url, entry: &str) -> RawResponse {
        if let Err(response) = self.verify_qbox(request, url) {
            return response;
        }

        let Some((bucket, key)) = decode_segment(entry)
            .as_deref()
            .and_then(|e| e.split_once(':'))
            .map(|(b, k)| (b.to_string(), k.to_string()))
        else {
            return self.error(400, "invalid entry");
        };

        match self.objects.read().await.get(&(bucket, key)) {
            Some(obj) => self.reply(
                200,
                json!({
                    "fsize": obj.data.len(),
                    "hash": obj.hash,
                    "mimeType": obj.mime_type,
                    "putTime": obj.put_time,
                    "type": 0,
                }),
            ),
            None => self.error(STATUS_NO_SUCH_ENTRY, "no such file or directory"),
        }
    }

    async fn list(&self, request: &RequestMessage, url: &Url) -> RawResponse {
        if let Err(response) = self.verify_qbox(request, url) {
            return response;
        }

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let param = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();

        let bucket = param("bucket");
        if bucket.is_empty() {
            return self.error(400, "bucket is required");
        }
        let prefix = param("prefix");
        let delimiter = param("delimiter");
        let limit = match param("limit") {
            "" => DEFAULT_LIST_LIMIT,
            raw => match raw.parse::<usize>() {
                Ok(0) => DEFAULT_LIST_LIMIT,
                Ok(n) => n.min(DEFAULT_LIST_LIMIT),
                Err(_) => return self.error(400, "invalid limit"),
            },
        };
        let after = match param("marker") {
            "" => None,
            raw => match decode_segment(raw) {
                Some(key) => Some(key),
                None => return self.error(400, "invalid marker"),
            },
        };

        let objects = self.objects.read().await;
        let mut items = Vec::new();
        let mut prefixes: Vec<String> = Vec::new();
        let mut last = None;
        let mut more = false;

        for ((b, key), obj) in objects.iter() {
            if b != bucket || !key.starts_with(prefix) {
                continue;
            }
            if let Some(after) = &after
                && key <= after
            {
                continue;
            }

            let common = if delimiter.is_empty() {
                None
            } else {
                key[prefix.len()..]
                    .find(delimiter)
                    .map(|pos| key[..prefix.len() + pos + delimiter.len()].to_string())
            };

            // Keys under the last rolled-up prefix are consumed for free
            if let Some(common) = &common
                && prefixes.last() == Some(common)
            {
                last = Some(key.clone());
                continue;
            }

            if items.len() + prefixes.len() >= limit {
                more = true;
                break;
            }

            match common {
                Some(common) => prefixes.push(common),
                None => items.push(json!({
                    "key": key,
                    "hash": obj.hash,
                    "fsize": obj.data.len(),
                    "mimeType": obj.mime_type,
                    "putTime": obj.put_time,
                    "type": 0,
                })),
            }
            last = Some(key.clone());
        }

        let marker = if more { last.map(|key| urlsafe_base64(key)) } else { None };
        tracing::debug!(
            "Emulated list of {}/{}: {} items, {} prefixes, more: {}",
            bucket,
            prefix,
            items.len(),
            prefixes.len(),
            more
        );

        self.reply(
            200,
            json!({
                "items": items,
                "commonPrefixes": prefixes,
                "marker": marker,
            }),
        )
    }

    async fn make_block(&self, request: &RequestMessage, size: &str) -> RawResponse {
        let bucket = match self.verify_upload_token(request) {
            Ok(bucket) => bucket,
            Err(response) => return response,
        };

        let body = request.body.clone().unwrap_or_default();
        if size.parse::<usize>().ok() != Some(body.len()) {
            return self.error(400, "block size mismatch");
        }

        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let ctx = urlsafe_base64(format!("{}:block-{}", bucket, id));
        let checksum = etag(&body);
        let offset = body.len();
        self.blocks.write().await.insert(ctx.clone(), body);

        self.reply(
            200,
            json!({
                "ctx": ctx,
                "checksum": checksum,
                "offset": offset,
                "host": request.endpoint.as_str(),
                "expired_at": Utc::now().timestamp() + BLOCK_CONTEXT_TTL_SECS,
            }),
        )
    }

    /// `mkfile/<size>/key/<b64 key>/mimeType/<b64 mime>/`
    async fn make_file(&self, request: &RequestMessage, path: &str) -> RawResponse {
        let bucket = match self.verify_upload_token(request) {
            Ok(bucket) => bucket,
            Err(response) => return response,
        };

        let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
        let (size, key, mime_type) = match segments.as_slice() {
            [size, "key", key, "mimeType", mime] => (
                size.parse::<usize>().ok(),
                decode_segment(key),
                decode_segment(mime),
            ),
            _ => (None, None, None),
        };
        let (Some(size), Some(key), Some(mime_type)) = (size, key, mime_type) else {
            return self.error(400, "invalid mkfile path");
        };

        let body = request.body.clone().unwrap_or_default();
        let contexts = String::from_utf8_lossy(&body).into_owned();

        let mut blocks = self.blocks.write().await;
        let mut data = BytesMut::with_capacity(size);
        for ctx in contexts.split(',').filter(|c| !c.is_empty()) {
            match blocks.get(ctx) {
                Some(block) => data.extend_from_slice(block),
                None => return self.error(STATUS_BAD_CONTEXT, "invalid ctx"),
            }
        }
        if data.len() != size {
            return self.error(400, "file size mismatch");
        }
        for ctx in contexts.split(',') {
            blocks.remove(ctx);
        }
        drop(blocks);

        let data = data.freeze();
        let hash = etag(&data);
        let mime_type = if mime_type.is_empty() {
            OCTET_STREAM.to_string()
        } else {
            mime_type
        };
        let stored = StoredObject {
            data,
            hash: hash.clone(),
            mime_type,
            put_time: put_time_now(),
        };
        self.objects
            .write()
            .await
            .insert((bucket, key.clone()), stored);

        self.reply(200, json!({ "key": key, "hash": hash }))
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, request: RequestMessage) -> Result<RawResponse, TransportError> {
        self.requests.lock().await.push(request.clone());

        let scripted = self.scripted.lock().await.pop_front();
        match scripted {
            Some(Scripted::Fail(err)) => return Err(err),
            Some(Scripted::Respond(response)) => return Ok(response),
            None => {}
        }

        let url = request
            .url()
            .map_err(|e| TransportError::Other(format!("invalid request url: {}", e)))?;

        if request.method == HttpMethod::Get && url.query_pairs().any(|(name, _)| name == "token")
        {
            return Ok(self.download(&request, &url).await);
        }

        let path = url.path().trim_start_matches('/').to_string();
        let (operation, rest) = path.split_once('/').unwrap_or((path.as_str(), ""));

        let response = match (request.method, operation) {
            (HttpMethod::Get, "stat") => self.stat(&request, &url, rest).await,
            (HttpMethod::Get, "list") => self.list(&request, &url).await,
            (HttpMethod::Post, "mkblk") => self.make_block(&request, rest).await,
            (HttpMethod::Post, "mkfile") => self.make_file(&request, rest).await,
            _ if request.header(AUTHORIZATION).is_none() => self.unauthorized(),
            _ => self.error(404, "unsupported operation"),
        };
        Ok(response)
    }
}
