//! Browsing-session wrapper around the transport.
//!
//! Every verb resolves its target through the session's [`ResolverState`],
//! builds a fresh `origin`/`referer` header set according to the verb's
//! policy, and hands the request to the [`Transport`].

use std::fmt;
use std::str::FromStr;

use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use reqwest::{Method, Request, RequestBuilder, Response};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::resolver::{Resolution, ResolverState};
use crate::transport::Transport;

// ── Verbs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Plain navigation: sends `referer` only.
    Get,
    /// Form-style submission: sends `origin` only.
    Post,
    /// Fresh navigation: sends neither.
    Visit,
}

impl Verb {
    pub fn method(self) -> Method {
        match self {
            Verb::Get | Verb::Visit => Method::GET,
            Verb::Post => Method::POST,
        }
    }

    pub fn sends_origin(self) -> bool {
        matches!(self, Verb::Post)
    }

    pub fn sends_referer(self) -> bool {
        matches!(self, Verb::Get)
    }

    /// Navigation headers for `resolution` after applying this verb's policy.
    ///
    /// Missing values are skipped rather than treated as errors.
    pub fn headers(self, resolution: &Resolution) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let wanted = [
            (ORIGIN, self.sends_origin(), resolution.origin.as_deref()),
            (REFERER, self.sends_referer(), resolution.referer.as_deref()),
        ];
        for (name, send, value) in wanted {
            if let (true, Some(value)) = (send, value) {
                match HeaderValue::from_str(value) {
                    Ok(header_value) => {
                        headers.insert(name, header_value);
                    }
                    Err(e) => debug!("Skipping {} header {:?}: {}", name, value, e),
                }
            }
        }
        headers
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Visit => "visit",
        };
        f.pad(s)
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Verb::Get),
            "post" => Ok(Verb::Post),
            "visit" => Ok(Verb::Visit),
            other => Err(format!("unknown verb '{}' (expected get, post or visit)", other)),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct Session {
    state: ResolverState,
    transport: Transport,
}

impl Session {
    /// Start a session at `base_url` with the default configuration.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, &SessionConfig::default())
    }

    pub fn with_config(base_url: &str, config: &SessionConfig) -> Result<Self> {
        let state = ResolverState::new(base_url)?;
        let transport = Transport::new(config)?;
        Ok(Self { state, transport })
    }

    pub fn base_url(&self) -> &str {
        self.state.base_url()
    }

    pub fn protocol(&self) -> &str {
        self.state.protocol()
    }

    pub fn last_url(&self) -> &str {
        self.state.last_url()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    /// Resolve `url`, advance the session and build the request without sending it.
    pub fn prepare(&mut self, verb: Verb, url: &str) -> Result<RequestBuilder> {
        let resolution = self.state.resolve(url)?;
        Ok(self
            .transport
            .request(verb.method(), &resolution.url)
            .headers(verb.headers(&resolution)))
    }

    /// Resolve `url`, apply caller options, then fill in the navigation headers
    /// the caller did not set themselves.
    pub fn build_with<F>(&mut self, verb: Verb, url: &str, opts: F) -> Result<Request>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let resolution = self.state.resolve(url)?;
        let mut request = opts(self.transport.request(verb.method(), &resolution.url)).build()?;
        for (name, value) in verb.headers(&resolution) {
            if let Some(name) = name {
                request.headers_mut().entry(name).or_insert(value);
            }
        }
        Ok(request)
    }

    /// Resolve, apply caller options, and send.
    pub async fn send_with<F>(&mut self, verb: Verb, url: &str, opts: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let request = self.build_with(verb, url, opts)?;
        info!("{} {}", verb, request.url());
        let response = self.transport.execute(request).await?;
        info!("{} {} -> {}", verb, response.url(), response.status());
        Ok(response)
    }

    pub async fn get(&mut self, url: &str) -> Result<Response> {
        self.send_with(Verb::Get, url, |req| req).await
    }

    pub async fn get_with<F>(&mut self, url: &str, opts: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.send_with(Verb::Get, url, opts).await
    }

    pub async fn post(&mut self, url: &str) -> Result<Response> {
        self.send_with(Verb::Post, url, |req| req).await
    }

    pub async fn post_with<F>(&mut self, url: &str, opts: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.send_with(Verb::Post, url, opts).await
    }

    /// GET without `origin` or `referer`.
    pub async fn visit(&mut self, url: &str) -> Result<Response> {
        self.send_with(Verb::Visit, url, |req| req).await
    }

    pub async fn visit_with<F>(&mut self, url: &str, opts: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.send_with(Verb::Visit, url, opts).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.state.base_url())
            .field("last_url", &self.state.last_url())
            .finish()
    }
}
