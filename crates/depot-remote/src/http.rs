use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use depot_types::{now_millis, ChecksumType};
use reqwest::header::{HeaderMap, IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::StatusCode;
use tracing::debug;

use crate::client::{FetchOutcome, RemoteArtifact, RemoteClient};
use crate::error::{RemoteError, RemoteResult};

const CHECKSUM_HEADERS: [(ChecksumType, &str); 3] = [
    (ChecksumType::Md5, "x-checksum-md5"),
    (ChecksumType::Sha1, "x-checksum-sha1"),
    (ChecksumType::Sha256, "x-checksum-sha256"),
];

/// Origin client over HTTP(S).
///
/// Every request is bounded by the socket timeout given at construction.
pub struct HttpRemoteClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRemoteClient {
    pub fn new(timeout: Duration) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> RemoteResult<Self> {
        Self::new(Duration::from_secs(timeout_secs))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_send_error(&self, url: &str, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            RemoteError::Connection {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn fetch(&self, url: &str, if_modified_since: Option<i64>) -> RemoteResult<FetchOutcome> {
        let mut request = self.client.get(url);
        if let Some(since) = if_modified_since.and_then(|s| DateTime::from_timestamp(s, 0)) {
            request = request.header(IF_MODIFIED_SINCE, format_http_date(&since));
        }
        debug!(url, ?if_modified_since, "fetching from origin");
        let response = request.send().await.map_err(|e| self.map_send_error(url, e))?;

        let status = response.status();
        match classify_status(status) {
            StatusClass::NotModified => return Ok(FetchOutcome::NotModified),
            StatusClass::NotFound => return Ok(FetchOutcome::NotFound),
            StatusClass::Failure => {
                return Err(RemoteError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                })
            }
            StatusClass::Success => {}
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date)
            .map(|at| at.timestamp_millis())
            .unwrap_or_else(now_millis);
        let checksums = declared_checksums(response.headers());
        let declared_len = response.content_length();

        let content = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout {
                    url: url.to_string(),
                    after: self.timeout,
                }
            } else {
                RemoteError::Body {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        if let Some(expected) = declared_len.filter(|len| *len != content.len() as u64) {
            return Err(RemoteError::Body {
                url: url.to_string(),
                reason: format!("expected {expected} bytes, received {}", content.len()),
            });
        }
        debug!(url, size = content.len(), "origin answered");

        Ok(FetchOutcome::Found(RemoteArtifact {
            size: content.len() as u64,
            content,
            last_modified,
            checksums,
        }))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StatusClass {
    Success,
    NotModified,
    NotFound,
    Failure,
}

fn classify_status(status: StatusCode) -> StatusClass {
    match status {
        StatusCode::NOT_MODIFIED => StatusClass::NotModified,
        StatusCode::NOT_FOUND | StatusCode::GONE => StatusClass::NotFound,
        s if s.is_success() => StatusClass::Success,
        _ => StatusClass::Failure,
    }
}

/// Checksums announced by the origin through `X-Checksum-*` headers.
/// Malformed values are ignored.
fn declared_checksums(headers: &HeaderMap) -> BTreeMap<ChecksumType, String> {
    CHECKSUM_HEADERS
        .iter()
        .filter_map(|(ty, name)| {
            let value = headers.get(*name)?.to_str().ok()?.trim().to_ascii_lowercase();
            ty.is_valid(&value).then_some((*ty, value))
        })
        .collect()
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn format_http_date(at: &DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP date header value.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
