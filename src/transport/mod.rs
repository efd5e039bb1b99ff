//! Thin layer over `reqwest::Client`.
//!
//! Owns the session-wide default headers and cookie store, and keeps a table of
//! per-scheme mount points that decide how many times a request is retried when
//! the connection cannot be established.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Mount {
    prefix: String,
    max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    mounts: Vec<Mount>,
    retry_delay: Duration,
}

impl Transport {
    /// Build the client and mount `http://` and `https://` with
    /// `config.max_retries`.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(config.cookie_store)
            .default_headers(default_headers(config)?);

        if let Some(ref proxy_url) = config.proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy_url)
                    .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?,
            );
        }

        let mut transport = Self {
            client: builder.build()?,
            mounts: Vec::new(),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        };
        transport.mount("http://", config.max_retries);
        transport.mount("https://", config.max_retries);
        Ok(transport)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Register (or replace) the retry count for URLs starting with `prefix`.
    pub fn mount(&mut self, prefix: impl Into<String>, max_retries: u32) {
        let prefix = prefix.into().to_ascii_lowercase();
        match self.mounts.iter_mut().find(|m| m.prefix == prefix) {
            Some(existing) => existing.max_retries = max_retries,
            None => self.mounts.push(Mount {
                prefix,
                max_retries,
            }),
        }
    }

    /// Retry count of the longest mount prefix matching `url`; 0 when unmounted.
    pub fn max_retries_for(&self, url: &str) -> u32 {
        let url = url.to_ascii_lowercase();
        self.mounts
            .iter()
            .filter(|m| url.starts_with(&m.prefix))
            .max_by_key(|m| m.prefix.len())
            .map(|m| m.max_retries)
            .unwrap_or(0)
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send a built request, retrying connection failures per the mount table.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let url = request.url().to_string();
        let retries = self.max_retries_for(&url);

        // Streaming bodies cannot be replayed.
        if retries == 0 || request.try_clone().is_none() {
            debug!("{} {}", request.method(), url);
            return Ok(self.client.execute(request).await?);
        }

        let strategy = FixedInterval::new(self.retry_delay).take(retries as usize);
        let client = &self.client;
        let request = &request;
        let url = url.as_str();
        let mut attempt = 0u32;

        RetryIf::spawn(
            strategy,
            move || {
                attempt += 1;
                let next = request.try_clone();
                let attempt = attempt;
                async move {
                    let next = next.ok_or_else(|| {
                        Error::Config(format!("request to {} cannot be replayed", url))
                    })?;
                    if attempt > 1 {
                        debug!("{} {} (attempt {})", next.method(), url, attempt);
                    } else {
                        debug!("{} {}", next.method(), url);
                    }
                    Ok::<Response, Error>(client.execute(next).await?)
                }
            },
            move |e: &Error| match e {
                Error::Transport(inner) if inner.is_connect() => {
                    warn!("Connection to {} failed: {}", url, inner);
                    true
                }
                _ => false,
            },
        )
        .await
    }
}

fn default_headers(config: &SessionConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
