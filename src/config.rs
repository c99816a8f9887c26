use crate::types::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://oss.aliyuncs.com";
pub const DEFAULT_IO_DOMAIN: &str = "iovip.qbox.me";
pub const DEFAULT_RS_DOMAIN: &str = "rs.qiniu.com";
pub const DEFAULT_RSF_DOMAIN: &str = "rsf-z0.qiniu.com";
pub const DEFAULT_UP_DOMAIN: &str = "up.qiniu.com";

/// Overrides the download domain when none is configured explicitly
pub const IO_DOMAIN_ENV: &str = "KODO_ORIGHOST";

/// 5 GiB
pub const DEFAULT_MAX_BODY_SIZE: i64 = 5 * 1024 * 1024 * 1024;
pub const DEFAULT_UPLOAD_TOKEN_EXPIRES: u64 = 3600 * 10;
pub const DEFAULT_DOWNLOAD_URL_EXPIRES: u64 = 3600;
/// Kodo blocks are fixed at 4 MiB
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// What the signer does when it cannot assemble a URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningPolicy {
    /// Fail with `ClientError::SigningFailed`
    #[default]
    Strict,
    /// Log and leave the request unsigned
    Lenient,
}

/// Per-service host overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
}

impl DomainConfig {
    pub fn io_domain(&self) -> String {
        if let Some(domain) = &self.io {
            return domain.clone();
        }
        match std::env::var(IO_DOMAIN_ENV) {
            Ok(host) if !host.is_empty() => host,
            _ => DEFAULT_IO_DOMAIN.to_string(),
        }
    }

    pub fn rs_domain(&self) -> String {
        self.rs
            .clone()
            .unwrap_or_else(|| DEFAULT_RS_DOMAIN.to_string())
    }

    pub fn rsf_domain(&self) -> String {
        self.rsf
            .clone()
            .unwrap_or_else(|| DEFAULT_RSF_DOMAIN.to_string())
    }

    pub fn up_domain(&self) -> String {
        self.up
            .clone()
            .unwrap_or_else(|| DEFAULT_UP_DOMAIN.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfiguration {
    pub endpoint: String,
    /// Path-style addressing (`endpoint/bucket/key`) instead of
    /// virtual-hosted (`bucket.endpoint/key`)
    pub sld_enabled: bool,
    pub max_body_size: i64,
    pub signing_policy: SigningPolicy,
    pub domains: DomainConfig,
    pub upload_token_expires: u64,
    pub download_url_expires: u64,
    pub block_size: usize,
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            sld_enabled: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            signing_policy: SigningPolicy::default(),
            domains: DomainConfig::default(),
            upload_token_expires: DEFAULT_UPLOAD_TOKEN_EXPIRES,
            download_url_expires: DEFAULT_DOWNLOAD_URL_EXPIRES,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl ClientConfiguration {
    /// Load configuration from a JSON file, or YAML when the extension is
    /// `.yaml` / `.yml`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ClientResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let config: ClientConfiguration = if is_yaml {
            serde_yml::from_str(&content).map_err(|e| ClientError::Config(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| ClientError::Config(e.to_string()))?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ClientResult<()> {
        self.endpoint_url()?;
        if self.max_body_size < 0 {
            return Err(ClientError::Config(
                "max_body_size must not be negative".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(ClientError::Config("block_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn endpoint_url(&self) -> ClientResult<Url> {
        Url::parse(&self.endpoint)
            .map_err(|e| ClientError::Config(format!("invalid endpoint '{}': {}", self.endpoint, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfiguration::default();
        assert_eq!(config.upload_token_expires, 36000);
        assert_eq!(config.block_size, 4 * 1024 * 1024);
        assert_eq!(config.signing_policy, SigningPolicy::Strict);
        assert_eq!(config.domains.rs_domain(), "rs.qiniu.com");
        assert_eq!(config.domains.rsf_domain(), "rsf-z0.qiniu.com");
        assert_eq!(config.domains.up_domain(), "up.qiniu.com");
    }

    #[test]
    fn test_explicit_io_domain_wins() {
        let domains = DomainConfig {
            io: Some("cdn.example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(domains.io_domain(), "cdn.example.com");
    }

    #[test]
    fn test_load_json_with_partial_fields() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"endpoint": "http://files.example.com", "sld_enabled": true, "signing_policy": "lenient", "domains": {{"up": "up-z1.qiniup.com"}}}}"#
        )
        .unwrap();

        let config = ClientConfiguration::from_file(file.path()).unwrap();
        assert_eq!(config.endpoint, "http://files.example.com");
        assert!(config.sld_enabled);
        assert_eq!(config.signing_policy, SigningPolicy::Lenient);
        assert_eq!(config.domains.up_domain(), "up-z1.qiniup.com");
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "endpoint: http://files.example.com").unwrap();
        writeln!(file, "max_body_size: 1024").unwrap();
        writeln!(file, "domains:").unwrap();
        writeln!(file, "  rs: rs-z2.qiniu.com").unwrap();

        let config = ClientConfiguration::from_file(file.path()).unwrap();
        assert_eq!(config.max_body_size, 1024);
        assert_eq!(config.domains.rs_domain(), "rs-z2.qiniu.com");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"endpoint": "not a url"}}"#).unwrap();

        assert!(matches!(
            ClientConfiguration::from_file(file.path()),
            Err(ClientError::Config(_))
        ));
    }
}
