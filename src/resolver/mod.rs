//! URL resolution for a browsing session.
//!
//! A session remembers the last absolute base it was pointed at and the last
//! URL it resolved. Every request target goes through [`ResolverState::resolve`],
//! which turns absolute, protocol-relative (`//host/path`), query-only (`?k=v`)
//! and path-relative inputs into an absolute URL, and reports the `origin` and
//! `referer` the previous page would have produced.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

lazy_static! {
    /// scheme `http`/`https`/`ftp`/`ftps`, dotted hostname, optional path.
    static ref NORMAL_URL: Regex = Regex::new(
        r"^(?P<base_url>(?P<protocol>(?:ht|f)tps?:)//(?:[0-9A-Za-z][0-9A-Za-z_-]*\.)+(?:[A-Za-z]{2,}))(?:/[0-9A-Za-z#%&./=?@_-]*)?$"
    )
    .expect("NORMAL_URL regex is valid");
}

/// Pieces of a URL that matched the absolute-URL grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    /// `scheme://host`, without any path.
    pub base_url: &'a str,
    /// `scheme:`
    pub protocol: &'a str,
}

/// Match `url` against the absolute-URL grammar.
pub fn parse_absolute(url: &str) -> Option<UrlParts<'_>> {
    let caps = NORMAL_URL.captures(url)?;
    Some(UrlParts {
        base_url: caps.name("base_url")?.as_str(),
        protocol: caps.name("protocol")?.as_str(),
    })
}

pub fn is_absolute(url: &str) -> bool {
    NORMAL_URL.is_match(url)
}

/// Outcome of one resolution step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Absolute target URL.
    pub url: String,
    /// Origin of the page we are navigating away from.
    pub origin: Option<String>,
    /// The page we are navigating away from.
    pub referer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolverState {
    base_url: String,
    protocol: String,
    last_url: String,
    initiated: bool,
}

impl ResolverState {
    /// Start a session at `base_url`, which must be absolute.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut state = Self {
            base_url: String::new(),
            protocol: String::new(),
            last_url: String::new(),
            initiated: false,
        };
        state.resolve(base_url)?;
        Ok(state)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn last_url(&self) -> &str {
        &self.last_url
    }

    pub fn is_initiated(&self) -> bool {
        self.initiated
    }

    /// Resolve `input` to an absolute URL and advance the session.
    ///
    /// On error the state is left untouched.
    pub fn resolve(&mut self, input: &str) -> Result<Resolution> {
        let target = if let Some(parts) = parse_absolute(input) {
            self.protocol = parts.protocol.to_string();
            self.base_url = input.to_string();
            input.to_string()
        } else if !self.initiated {
            return Err(Error::unsupported_uri(input));
        } else if input.starts_with("//") {
            let url: String = Url::parse(&format!("{}{}", self.protocol, input))
                .map_err(|_| Error::unsupported_uri(input))?
                .into();
            if let Some(parts) = parse_absolute(&url) {
                self.protocol = parts.protocol.to_string();
            }
            self.base_url = url.clone();
            url
        } else if input.starts_with('?') {
            self.join(&format!("/{}", input))?
        } else {
            self.join(input)?
        };

        if !self.initiated {
            self.last_url = target.clone();
            self.initiated = true;
            debug!("Session started at {}", target);
            return Ok(Resolution {
                url: target,
                origin: None,
                referer: None,
            });
        }

        let referer = std::mem::replace(&mut self.last_url, target.clone());
        let origin = origin_of(&referer);
        debug!("Resolved {:?} -> {} (referer: {})", input, target, referer);

        Ok(Resolution {
            url: target,
            origin,
            referer: Some(referer),
        })
    }

    fn join(&self, relative: &str) -> Result<String> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(relative))
            .map(String::from)
            .map_err(|_| Error::unsupported_uri(relative))
    }
}

/// `scheme://host` of a previously visited URL.
///
/// URLs outside the strict grammar (ports, IP hosts) fall back to the
/// serialized WHATWG origin; opaque origins have none.
fn origin_of(url: &str) -> Option<String> {
    if let Some(parts) = parse_absolute(url) {
        return Some(parts.base_url.to_string());
    }
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
