//! The HTTP boundary: one outbound request in, status/headers/body out.

use std::time::{Duration, Instant};

use http::header::{HeaderMap, HeaderValue, COOKIE};
use http::{Method, StatusCode};
use reqwest::blocking::{Client, ClientBuilder};

use crate::config::Config;
use crate::error::{Error, Result};

/// A fully expanded request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub cookies: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    /// The cookies folded into a single `Cookie` header value (`a=1; b=2`).
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// The request headers with the cookies folded in. A `Cookie` header
    /// already present is extended so only one is ever sent.
    pub fn outbound_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.headers.clone();
        let Some(saved) = self.cookie_header() else {
            return Ok(headers);
        };
        let cookie = match headers.get(COOKIE).map(HeaderValue::to_str) {
            Some(Ok(existing)) if !existing.is_empty() => format!("{}; {}", existing, saved),
            _ => saved,
        };
        let value = HeaderValue::from_str(&cookie)
            .map_err(|_| Error::validation(format!("invalid cookie value: {}", cookie)))?;
        headers.insert(COOKIE, value);
        Ok(headers)
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

/// Anything able to carry a [`TransportRequest`] to a server.
pub trait Transport {
    fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Blocking `reqwest` transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build the client from the user agent and timeouts of `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder: ClientBuilder = Client::builder().user_agent(config.user_agent());
        if let Some(timeout) = config.connect_timeout().map_err(Error::Config)? {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.timeout().map_err(Error::Config)? {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let transport_err = |url: &str, e: reqwest::Error| Error::Transport {
            url: url.to_string(),
            source: Box::new(e),
        };

        let headers = request.outbound_headers()?;
        let mut req = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(headers);
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let started = Instant::now();
        let resp = req.send().map_err(|e| transport_err(&request.url, e))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .map_err(|e| transport_err(&request.url, e))?
            .to_vec();
        Ok(TransportResponse {
            status,
            headers,
            body,
            elapsed: started.elapsed(),
        })
    }
}
