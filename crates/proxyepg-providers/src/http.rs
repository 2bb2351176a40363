//! Shared HTTP client settings and response handling for all adapters.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Certificate, Client, Proxy, Response, StatusCode};
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::{ProviderError, ProviderResult};

/// Transport settings shared by every adapter.
///
/// Values arrive already resolved from secret references; this crate never
/// reads the environment itself.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Proxy URL applied to all schemes.
    pub proxy: Option<String>,
    /// Extra root certificate, PEM encoded.
    pub ca_pem: Option<Vec<u8>>,
    /// Skip certificate verification entirely.
    pub insecure_tls: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl HttpSettings {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Browser user agent; several upstreams reject anything else.
    pub const DEFAULT_USER_AGENT: &'static str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:126.0) Gecko/20100101 Firefox/126.0";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Sets the extra root CA from a base64-encoded PEM bundle.
    pub fn with_ca_pem_base64(mut self, encoded: &str) -> ProviderResult<Self> {
        let pem = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProviderError::configuration(format!("invalid base64 CA bundle: {e}")))?;
        self.ca_pem = Some(pem);
        Ok(self)
    }

    /// Disables TLS verification.
    pub fn with_insecure_tls(mut self, insecure: bool) -> Self {
        self.insecure_tls = insecure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Builds a client with these settings and a private cookie jar.
    pub fn build_client(&self) -> ProviderResult<Client> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .cookie_store(true)
            .danger_accept_invalid_certs(self.insecure_tls);

        if let Some(proxy) = &self.proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| ProviderError::configuration(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        if let Some(pem) = &self.ca_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| ProviderError::configuration(format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| ProviderError::network(format!("failed to create HTTP client: {e}")))
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            proxy: None,
            ca_pem: None,
            insecure_tls: false,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Maps a transport failure.
pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network(format!("request timed out: {e}")).with_source(e)
    } else {
        ProviderError::network(format!("request failed: {e}")).with_source(e)
    }
}

/// Maps a non-success status to an error; passes successful responses through.
pub(crate) async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    trace!(status = %status, url = %response.url(), "received response");

    match status {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(ProviderError::authentication("session rejected (401)")),
        StatusCode::FORBIDDEN => Err(ProviderError::access_denied("access denied (403)")),
        StatusCode::NOT_FOUND => Err(ProviderError::not_found("resource not found (404)")),
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::rate_limited("too many requests (429)")),
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::server(format!(
                "server error ({s}): {}",
                truncate(&body)
            )))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, body = %truncate(&body), "unexpected response status");
            Err(ProviderError::bad_request(format!(
                "unexpected status {s}: {}",
                truncate(&body)
            )))
        }
    }
}

/// Checks the status and decodes the body as JSON.
pub(crate) async fn read_json(response: Response) -> ProviderResult<Value> {
    let response = check_status(response).await?;
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))?;
    parse_json(&body)
}

pub(crate) fn parse_json(body: &str) -> ProviderResult<Value> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("response is not JSON: {e}")).with_source(e)
    })
}

/// Takes the array at `value[key]`, or `value` itself when it is an array.
///
/// Anything else yields an empty list.
pub(crate) fn array_at(value: Value, key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn truncate(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
