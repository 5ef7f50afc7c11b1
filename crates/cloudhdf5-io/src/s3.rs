//! Object-storage driver: HTTP range GETs against S3.

use reqwest::blocking::Client;
use time::OffsetDateTime;

use crate::credentials::Credentials;
use crate::driver::{Driver, DriverError};
use crate::sigv4;

/// Default region when none is configured.
pub const DEFAULT_REGION: &str = "us-west-2";

/// A driver that reads an S3 object through HTTP range requests.
///
/// With credentials, requests are signed with SigV4; without, they go out
/// anonymously (public buckets, or a custom endpoint that does its own
/// auth).
pub struct S3Driver {
    client: Client,
    host: String,
    uri_path: String,
    url: String,
    region: String,
    credentials: Option<Credentials>,
}

impl S3Driver {
    /// Create a driver for `bucket`/`key` in `region`.
    pub fn new(
        bucket: &str,
        key: &str,
        region: &str,
        credentials: Option<Credentials>,
    ) -> Self {
        let host = format!("{bucket}.s3.{region}.amazonaws.com");
        Self::with_host(host, key, region, credentials)
    }

    /// Create a driver against an explicit host (custom endpoints,
    /// S3-compatible stores).
    pub fn with_host(
        host: String,
        key: &str,
        region: &str,
        credentials: Option<Credentials>,
    ) -> Self {
        let uri_path = format!("/{}", key.trim_start_matches('/'));
        let url = format!("https://{host}{uri_path}");
        Self {
            client: Client::new(),
            host,
            uri_path,
            url,
            region: region.to_string(),
            credentials,
        }
    }

    fn apply_auth(
        &self,
        mut request: reqwest::blocking::RequestBuilder,
        method: &str,
    ) -> reqwest::blocking::RequestBuilder {
        if let Some(creds) = &self.credentials {
            let signed = sigv4::sign_request(
                method,
                &self.host,
                &self.uri_path,
                &self.region,
                creds,
                OffsetDateTime::now_utc(),
            );
            for (name, value) in signed.headers {
                request = request.header(name, value);
            }
        }
        request
    }
}

impl Driver for S3Driver {
    fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, DriverError> {
        let range = format!("bytes={}-{}", offset, offset + length as u64 - 1);
        let request = self
            .apply_auth(self.client.get(&self.url), "GET")
            .header("range", range);

        let response = request.send().map_err(|e| DriverError::Http {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Http {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }

        let body = response.bytes().map_err(|e| DriverError::Http {
            status: 0,
            message: e.to_string(),
        })?;
        if body.len() != length {
            return Err(DriverError::ShortRead {
                expected: length,
                actual: body.len(),
            });
        }
        Ok(body.to_vec())
    }

    fn size(&self) -> Result<u64, DriverError> {
        let request = self.apply_auth(self.client.head(&self.url), "HEAD");
        let response = request.send().map_err(|e| DriverError::Http {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Http {
                status: status.as_u16(),
                message: String::new(),
            });
        }

        response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or(DriverError::Http {
                status: status.as_u16(),
                message: "missing content-length".into(),
            })
    }
}
