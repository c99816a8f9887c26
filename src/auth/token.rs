//! Kodo credential digests.
//!
//! Every token is `<access key>:<urlsafe-base64(HMAC-SHA1(secret, data))>`,
//! optionally followed by `:<encoded data>` for upload tokens.

use super::credentials::Credentials;
use crate::request::headers::FORM_URLENCODED;
use crate::types::error::{ClientError, ClientResult};
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// URL-safe base64 with padding, as Kodo expects it in paths and tokens
pub fn urlsafe_base64(data: impl AsRef<[u8]>) -> String {
    URL_SAFE.encode(data)
}

/// Entry identifier used by the resource management API
pub fn encode_entry_uri(bucket: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => urlsafe_base64(format!("{}:{}", bucket, key)),
        None => urlsafe_base64(bucket),
    }
}

/// Upload policy carried inside an upload token
#[derive(Debug, Serialize)]
struct PutPolicy<'a> {
    scope: &'a str,
    deadline: i64,
}

/// Signs data with a credential pair
#[derive(Debug, Clone, Copy)]
pub struct KodoAuth<'a> {
    access_key: &'a str,
    secret_key: &'a str,
}

impl<'a> KodoAuth<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self {
            access_key: &credentials.access_key_id,
            secret_key: &credentials.secret_access_key,
        }
    }

    fn hmac_sha1(&self, data: &[u8]) -> ClientResult<Vec<u8>> {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ClientError::InvalidState(format!("HMAC error: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// `ak:sign(data)`
    pub fn sign(&self, data: &[u8]) -> ClientResult<String> {
        let digest = self.hmac_sha1(data)?;
        Ok(format!("{}:{}", self.access_key, urlsafe_base64(digest)))
    }

    /// `ak:sign(encoded):encoded`, where `encoded` is the base64 of `data`
    pub fn sign_with_data(&self, data: &[u8]) -> ClientResult<String> {
        let encoded = urlsafe_base64(data);
        let token = self.sign(encoded.as_bytes())?;
        Ok(format!("{}:{}", token, encoded))
    }

    /// QBox token over a request URL.
    ///
    /// Signed data is `path[?query]\n`, followed by the body when it is a
    /// form-urlencoded payload.
    pub fn sign_request(
        &self,
        url: &Url,
        body: Option<&[u8]>,
        content_type: Option<&str>,
    ) -> ClientResult<String> {
        let mut data = url.path().to_string();
        if let Some(query) = url.query() {
            data.push('?');
            data.push_str(query);
        }
        data.push('\n');

        let mut data = data.into_bytes();
        if let (Some(body), Some(FORM_URLENCODED)) = (body, content_type) {
            data.extend_from_slice(body);
        }

        self.sign(&data)
    }

    /// Time-limited download URL valid for `expires` seconds from now
    pub fn private_download_url(&self, base_url: &str, expires: u64) -> ClientResult<String> {
        let deadline = Utc::now().timestamp() + expires as i64;
        self.private_download_url_with_deadline(base_url, deadline)
    }

    pub fn private_download_url_with_deadline(
        &self,
        base_url: &str,
        deadline: i64,
    ) -> ClientResult<String> {
        let separator = if base_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}e={}", base_url, separator, deadline);
        let token = self.sign(url.as_bytes())?;
        Ok(format!("{}&token={}", url, token))
    }

    /// Upload token scoped to `bucket` (or `bucket:key`), valid for
    /// `expires` seconds from now
    pub fn upload_token(&self, bucket: &str, key: Option<&str>, expires: u64) -> ClientResult<String> {
        let deadline = Utc::now().timestamp() + expires as i64;
        self.upload_token_with_deadline(bucket, key, deadline)
    }

    pub fn upload_token_with_deadline(
        &self,
        bucket: &str,
        key: Option<&str>,
        deadline: i64,
    ) -> ClientResult<String> {
        let scope = match key {
            Some(key) => format!("{}:{}", bucket, key),
            None => bucket.to_string(),
        };
        let policy = serde_json::to_string(&PutPolicy {
            scope: &scope,
            deadline,
        })?;
        self.sign_with_data(policy.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("test-ak", "test-sk")
    }

    #[test]
    fn test_sign_shape() {
        let creds = credentials();
        let token = KodoAuth::new(&creds).sign(b"hello").unwrap();
        let (ak, digest) = token.split_once(':').unwrap();
        assert_eq!(ak, "test-ak");
        assert_eq!(URL_SAFE.decode(digest).unwrap().len(), 20);
    }

    #[test]
    fn test_sign_is_keyed() {
        let a = Credentials::new("ak", "one");
        let b = Credentials::new("ak", "two");
        assert_ne!(
            KodoAuth::new(&a).sign(b"data").unwrap(),
            KodoAuth::new(&b).sign(b"data").unwrap()
        );
    }

    #[test]
    fn test_sign_request_covers_path_and_query() {
        let creds = credentials();
        let auth = KodoAuth::new(&creds);
        let url = Url::parse("http://rsf.example.com/list?bucket=b&limit=10").unwrap();

        let token = auth.sign_request(&url, None, None).unwrap();
        assert_eq!(token, auth.sign(b"/list?bucket=b&limit=10\n").unwrap());
    }

    #[test]
    fn test_sign_request_includes_form_body_only() {
        let creds = credentials();
        let auth = KodoAuth::new(&creds);
        let url = Url::parse("http://rs.example.com/stat/abc").unwrap();

        let form = auth
            .sign_request(&url, Some(b"a=1".as_slice()), Some(FORM_URLENCODED))
            .unwrap();
        assert_eq!(form, auth.sign(b"/stat/abc\na=1").unwrap());

        let json = auth
            .sign_request(&url, Some(b"{}".as_slice()), Some("application/json"))
            .unwrap();
        assert_eq!(json, auth.sign(b"/stat/abc\n").unwrap());
    }

    #[test]
    fn test_upload_token_embeds_policy() {
        let creds = credentials();
        let token = KodoAuth::new(&creds)
            .upload_token_with_deadline("b", Some("k"), 1_700_000_000)
            .unwrap();

        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "test-ak");
        let policy = URL_SAFE.decode(parts[2]).unwrap();
        assert_eq!(
            String::from_utf8(policy).unwrap(),
            r#"{"scope":"b:k","deadline":1700000000}"#
        );
    }

    #[test]
    fn test_private_download_url() {
        let creds = credentials();
        let auth = KodoAuth::new(&creds);
        let url = auth
            .private_download_url_with_deadline("http://cdn.example.com/a.txt", 1_700_000_000)
            .unwrap();

        let expected_token = auth
            .sign(b"http://cdn.example.com/a.txt?e=1700000000")
            .unwrap();
        assert_eq!(
            url,
            format!(
                "http://cdn.example.com/a.txt?e=1700000000&token={}",
                expected_token
            )
        );

        let with_query = auth
            .private_download_url_with_deadline("http://cdn.example.com/a.txt?v=1", 5)
            .unwrap();
        assert!(with_query.starts_with("http://cdn.example.com/a.txt?v=1&e=5&token="));
    }

    #[test]
    fn test_encode_entry_uri() {
        assert_eq!(encode_entry_uri("b", Some("k")), urlsafe_base64("b:k"));
        assert_eq!(encode_entry_uri("b", None), urlsafe_base64("b"));
        assert_eq!(urlsafe_base64([0xfb, 0xff]), "-_8=");
    }
}
