//! Endpoint and resource path resolution for path-style and
//! virtual-hosted addressing.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use url::{Host, Url};

/// Format a timestamp for the `Date` header (RFC 822, always GMT)
pub fn format_rfc822_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn is_ip_or_localhost(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => {
            domain.eq_ignore_ascii_case("localhost") || domain.parse::<IpAddr>().is_ok()
        }
        None => false,
    }
}

/// Endpoint the request is sent to.
///
/// Virtual-hosted addressing prefixes the bucket to the host, unless the
/// endpoint is an IP address or localhost.
pub fn determine_final_endpoint(endpoint: &Url, bucket: Option<&str>, sld_enabled: bool) -> Url {
    let Some(bucket) = bucket.filter(|b| !b.is_empty()) else {
        return endpoint.clone();
    };
    if sld_enabled || is_ip_or_localhost(endpoint) {
        return endpoint.clone();
    }

    let Some(host) = endpoint.host_str() else {
        return endpoint.clone();
    };

    let mut url = endpoint.clone();
    match url.set_host(Some(&format!("{}.{}", bucket, host))) {
        Ok(()) => url,
        Err(e) => {
            tracing::warn!(
                "Bucket '{}' cannot be used as a host prefix ({}), keeping path-style endpoint",
                bucket,
                e
            );
            endpoint.clone()
        }
    }
}

/// Resource path relative to the final endpoint
pub fn determine_resource_path(
    bucket: Option<&str>,
    key: Option<&str>,
    sld_enabled: bool,
) -> Option<String> {
    if sld_enabled {
        bucket.map(|b| format!("{}/{}", b, key.unwrap_or_default()))
    } else {
        key.map(str::to_string)
    }
}
