use super::credentials::Credentials;
use super::token::{KodoAuth, encode_entry_uri, urlsafe_base64};
use crate::config::{ClientConfiguration, SigningPolicy};
use crate::request::headers::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, FORM_URLENCODED, HOST, OCTET_STREAM, TEXT_PLAIN,
    UPLOAD_FILE_SIZE,
};
use crate::request::{Command, HttpMethod, RequestMessage};
use crate::types::error::{ClientError, ClientResult};
use std::collections::HashMap;
use url::Url;

const QBOX_SCHEME: &str = "QBox";
const UPTOKEN_SCHEME: &str = "UpToken";

/// Why a signing arm gave up
#[derive(Debug)]
enum SignFailure {
    /// A URL could not be assembled; handled according to [`SigningPolicy`]
    Url(String),
    /// Always surfaced to the caller
    Fatal(ClientError),
}

impl From<url::ParseError> for SignFailure {
    fn from(err: url::ParseError) -> Self {
        SignFailure::Url(err.to_string())
    }
}

impl From<ClientError> for SignFailure {
    fn from(err: ClientError) -> Self {
        SignFailure::Fatal(err)
    }
}

type SignResult = Result<(), SignFailure>;

fn service_url(domain: &str, path: &str) -> Result<Url, SignFailure> {
    Ok(Url::parse(&format!("http://{}/{}", domain, path))?)
}

fn service_endpoint(domain: &str) -> Result<Url, SignFailure> {
    Ok(Url::parse(&format!("http://{}", domain))?)
}

/// Percent-encode every segment of an object key, keeping `/`
fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Path plus query of a URL, as it appears on the request line
fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Rewrites a [`RequestMessage`] into a request Kodo accepts.
///
/// Each command has its own scheme because Kodo authenticates different
/// parts of the request per service: the download URL alone, the request
/// line (and form body), or a capability token scoped to bucket/key.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    credentials: Credentials,
    endpoint: String,
    io_domain: String,
    rs_domain: String,
    rsf_domain: String,
    up_domain: String,
    policy: SigningPolicy,
    upload_token_expires: u64,
    download_url_expires: u64,
}

impl CommandSigner {
    pub fn new(credentials: Credentials, config: &ClientConfiguration) -> Self {
        Self {
            credentials,
            endpoint: config.endpoint.clone(),
            io_domain: config.domains.io_domain(),
            rs_domain: config.domains.rs_domain(),
            rsf_domain: config.domains.rsf_domain(),
            up_domain: config.domains.up_domain(),
            policy: config.signing_policy,
            upload_token_expires: config.upload_token_expires,
            download_url_expires: config.download_url_expires,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign `request` for `command`.
    ///
    /// Incomplete credentials leave the request untouched. On failure the
    /// request is never partially rewritten.
    pub fn sign(&self, command: Command, request: &mut RequestMessage) -> ClientResult<()> {
        if !self.credentials.is_complete() {
            tracing::debug!("Credentials incomplete, {} request left unsigned", command);
            return Ok(());
        }

        let result = match command {
            Command::GetObjectData => self.sign_get_object(request),
            Command::GetObjectMeta => self.sign_get_meta(request),
            Command::ListObjects => self.sign_list_objects(request),
            Command::PostObject => self.sign_post_object(request),
            Command::MakeBlock => self.sign_make_block(request),
            Command::MakeFile => self.sign_make_file(request),
            Command::DeleteObject => self.sign_delete_object(request),
        };

        match result {
            Ok(()) => Ok(()),
            Err(SignFailure::Fatal(e)) => Err(e),
            Err(SignFailure::Url(message)) => match self.policy {
                SigningPolicy::Strict => Err(ClientError::SigningFailed { command, message }),
                SigningPolicy::Lenient => {
                    tracing::warn!(
                        "Failed to sign {} request for key {:?}, sending it unsigned: {}",
                        command,
                        request.key,
                        message
                    );
                    Ok(())
                }
            },
        }
    }

    /// Redirect to a pre-authenticated download URL on the io domain
    fn sign_get_object(&self, request: &mut RequestMessage) -> SignResult {
        let endpoint = Url::parse(&self.endpoint)?;
        let host = endpoint
            .host_str()
            .ok_or_else(|| SignFailure::Url(format!("endpoint '{}' has no host", self.endpoint)))?
            .to_string();

        let key = request.key.as_deref().unwrap_or_default();
        let origin = Url::parse(&format!("http://{}/{}", host, encode_key_path(key)))?;

        let auth = KodoAuth::new(&self.credentials);
        let private_url = auth.private_download_url(origin.as_str(), self.download_url_expires)?;
        let file = path_and_query(&Url::parse(&private_url)?);
        let io_url = Url::parse(&format!("http://{}{}", self.io_domain, file))?;
        let origin_endpoint = service_endpoint(&host)?;

        tracing::debug!("Signed download of {:?} via {}", request.key, self.io_domain);

        request.absolute_url = Some(io_url);
        request.headers = HashMap::from([(HOST.to_string(), host)]);
        request.parameters.clear();
        request.endpoint = origin_endpoint;
        request.resource_path = Some(file);
        request.body = None;
        request.method = HttpMethod::Get;
        Ok(())
    }

    fn sign_get_meta(&self, request: &mut RequestMessage) -> SignResult {
        let bucket = request.bucket.as_deref().unwrap_or_default();
        let path = format!("stat/{}", encode_entry_uri(bucket, request.key.as_deref()));
        let url = service_url(&self.rs_domain, &path)?;
        let endpoint = service_endpoint(&self.rs_domain)?;

        let token =
            KodoAuth::new(&self.credentials).sign_request(&url, None, Some(FORM_URLENCODED))?;

        tracing::debug!("Signed stat of {}:{:?}", bucket, request.key);

        request.absolute_url = Some(url);
        request.headers =
            HashMap::from([(AUTHORIZATION.to_string(), format!("{} {}", QBOX_SCHEME, token))]);
        request.parameters.clear();
        request.endpoint = endpoint;
        request.resource_path = Some(path);
        request.body = None;
        request.method = HttpMethod::Get;
        Ok(())
    }

    fn sign_list_objects(&self, request: &mut RequestMessage) -> SignResult {
        let params = &request.parameters;
        let bucket = request.bucket.as_deref().unwrap_or_default();
        let prefix = request
            .key
            .as_deref()
            .or_else(|| params.get("prefix"))
            .unwrap_or_default();
        let limit = params
            .get("limit")
            .or_else(|| params.get("max-keys"))
            .unwrap_or_default();
        let marker = params.get("marker").unwrap_or_default();
        let delimiter = params.get("delimiter").unwrap_or_default();

        // Order is fixed regardless of the parameter insertion order
        let path = format!(
            "list?bucket={}&prefix={}&limit={}&marker={}&delimiter={}",
            bucket,
            urlencoding::encode(prefix),
            limit,
            marker,
            urlencoding::encode(delimiter)
        );
        let url = service_url(&self.rsf_domain, &path)?;
        let endpoint = service_endpoint(&self.rsf_domain)?;

        let token =
            KodoAuth::new(&self.credentials).sign_request(&url, None, Some(FORM_URLENCODED))?;

        tracing::debug!("Signed listing: {}", path);

        request.absolute_url = Some(url);
        request.headers = HashMap::from([
            (AUTHORIZATION.to_string(), format!("{} {}", QBOX_SCHEME, token)),
            (CONTENT_TYPE.to_string(), FORM_URLENCODED.to_string()),
        ]);
        request.parameters.clear();
        request.endpoint = endpoint;
        request.resource_path = Some(path);
        request.body = None;
        request.method = HttpMethod::Get;
        Ok(())
    }

    /// Form uploads are not supported; the request passes through as-is
    fn sign_post_object(&self, request: &mut RequestMessage) -> SignResult {
        tracing::debug!("post-object is not supported, {:?} left unsigned", request.key);
        Ok(())
    }

    fn sign_make_block(&self, request: &mut RequestMessage) -> SignResult {
        let bucket = request.bucket.as_deref().unwrap_or_default();
        let token = KodoAuth::new(&self.credentials).upload_token(
            bucket,
            request.key.as_deref(),
            self.upload_token_expires,
        )?;

        let path = format!("mkblk/{}", request.content_length);
        let url = service_url(&self.up_domain, &path)?;
        let endpoint = service_endpoint(&self.up_domain)?;

        tracing::debug!("Signed block upload for {}:{:?}: {}", bucket, request.key, path);

        request.absolute_url = Some(url);
        request.endpoint = endpoint;
        request.resource_path = Some(path);
        request.headers = HashMap::from([
            (AUTHORIZATION.to_string(), format!("{} {}", UPTOKEN_SCHEME, token)),
            (CONTENT_TYPE.to_string(), OCTET_STREAM.to_string()),
        ]);
        request.parameters.clear();
        request.method = HttpMethod::Post;
        Ok(())
    }

    fn sign_make_file(&self, request: &mut RequestMessage) -> SignResult {
        let file_size = request
            .header(UPLOAD_FILE_SIZE)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                ClientError::InvalidState(format!(
                    "failed to upload file, header '{}' must carry the total file size",
                    UPLOAD_FILE_SIZE
                ))
            })?;

        let bucket = request.bucket.as_deref().unwrap_or_default();
        let key = request.key.as_deref().unwrap_or_default();
        let mime_type = request
            .header(CONTENT_TYPE)
            .filter(|v| !v.is_empty())
            .unwrap_or(OCTET_STREAM);

        let path = format!(
            "mkfile/{}/key/{}/mimeType/{}/",
            file_size,
            urlsafe_base64(key),
            urlsafe_base64(mime_type)
        );
        let url = service_url(&self.up_domain, &path)?;
        let endpoint = service_endpoint(&self.up_domain)?;

        let token = KodoAuth::new(&self.credentials).upload_token(
            bucket,
            request.key.as_deref(),
            self.upload_token_expires,
        )?;

        let content_length = request
            .header(CONTENT_LENGTH)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| request.content_length.to_string());

        tracing::debug!("Signed file assembly for {}:{}: {}", bucket, key, path);

        request.headers = HashMap::from([
            (CONTENT_TYPE.to_string(), TEXT_PLAIN.to_string()),
            (AUTHORIZATION.to_string(), format!("{} {}", UPTOKEN_SCHEME, token)),
            (CONTENT_LENGTH.to_string(), content_length),
        ]);
        request.absolute_url = Some(url);
        request.endpoint = endpoint;
        request.resource_path = Some(path);
        request.method = HttpMethod::Post;
        Ok(())
    }

    /// Deletion is not supported; the request passes through as-is
    fn sign_delete_object(&self, request: &mut RequestMessage) -> SignResult {
        tracing::debug!("delete-object is not supported, {:?} left unsigned", request.key);
        Ok(())
    }
}
