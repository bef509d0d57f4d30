//! Capability HTTP client
//!
//! Performs authenticated GET requests against the quality server and
//! returns the raw body. Retry policy belongs to callers.

use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure of a GET request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Credentials attached to a request
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    /// Legacy login, sent as HTTP basic auth
    Basic {
        login: String,
        password: Option<String>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Bearer(_) => f.write_str("Bearer(***)"),
            Credentials::Basic { login, .. } => write!(f, "Basic({login}:***)"),
        }
    }
}

/// GET-only HTTP client used by the web-service layer
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    async fn get(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<String, TransportError>;
}

/// `reqwest`-backed implementation
#[derive(Clone)]
pub struct ReqwestHttpClient {
    http_client: Client,
}

impl ReqwestHttpClient {
    /// Create a client with bounded request and connect timeouts
    pub fn new(timeout: Duration, connect_timeout: Duration) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("sonargate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<String, TransportError> {
        let parsed = url::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut request = self.http_client.get(parsed);
        request = match credentials {
            Some(Credentials::Bearer(token)) => request.bearer_auth(token),
            Some(Credentials::Basic { login, password }) => {
                request.basic_auth(login, password.as_deref())
            }
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| request_error(url, e))
    }
}

fn request_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        // without_url keeps the message short; the URL is carried separately
        TransportError::Request {
            url: url.to_string(),
            message: e.without_url().to_string(),
        }
    }
}
