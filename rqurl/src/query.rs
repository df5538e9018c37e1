//! The Query model: one declarative HTTP call, how it becomes an outbound
//! request, and how it is saved and loaded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use url::Url;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::expand::{expand, expand_map};
use crate::store::Store;
use crate::transport::{Transport, TransportRequest, TransportResponse};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Connect,
        Method::Delete,
        Method::Get,
        Method::Head,
        Method::Options,
        Method::Patch,
        Method::Post,
        Method::Put,
        Method::Trace,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Connect => "CONNECT",
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Trace => "TRACE",
        }
    }

    /// POST, PUT and PATCH carry their data in the body; every other method
    /// carries it in the query string.
    #[must_use]
    pub fn sends_body(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.to_uppercase();
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| Error::validation(format!("Unsupported HTTP method: {}", s)))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Connect => http::Method::CONNECT,
            Method::Delete => http::Method::DELETE,
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
            Method::Patch => http::Method::PATCH,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Trace => http::Method::TRACE,
        }
    }
}

/// A named, reusable HTTP call description. `name` is empty for calls that
/// are not saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: Option<i64>,
    /// Slash-delimited path such as `demo/post/message`.
    pub name: String,
    pub method: Method,
    pub url: String,
    pub data: BTreeMap<String, String>,
    pub header: BTreeMap<String, String>,
    pub cookie: BTreeMap<String, String>,
    pub is_json: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Query {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: String::new(),
            method,
            url: url.into(),
            data: BTreeMap::new(),
            header: BTreeMap::new(),
            cookie: BTreeMap::new(),
            is_json: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fetch a saved query by name.
    pub fn load(store: &dyn Store, name: &str) -> Result<Self> {
        store.find_query(name)?.ok_or_else(|| Error::NotFound {
            entity: "query",
            name: name.to_string(),
        })
    }

    /// Persist the query under its name. An existing query with the same
    /// name is never overwritten: the call fails with
    /// [`Error::AlreadyExists`] and the stored record is left as is.
    pub fn save(&self, store: &dyn Store) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::MissingName);
        }
        if store.find_query(&self.name)?.is_some() {
            tracing::warn!(name = %self.name, "a query with this name already exists, not saving");
            return Err(Error::AlreadyExists {
                entity: "query",
                name: self.name.clone(),
            });
        }
        store.insert_query(self)?;
        Ok(())
    }

    /// Whether the caller supplied a content type. Only this one header name
    /// is compared case-insensitively.
    fn has_content_type(&self) -> bool {
        self.header
            .keys()
            .any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
    }

    fn default_content_type(&self) -> Option<&'static str> {
        if self.is_json {
            Some(JSON_CONTENT_TYPE)
        } else if self.method.sends_body() && !self.data.is_empty() {
            Some(FORM_CONTENT_TYPE)
        } else {
            None
        }
    }

    /// Expand every templated part against `env` and assemble the outbound
    /// request. Nothing is sent.
    pub fn build_request(&self, env: &Environment) -> Result<TransportRequest> {
        let mut url = expand(&self.url, env)?;
        Url::parse(&url).map_err(|source| Error::InvalidUrl {
            url: url.clone(),
            source,
        })?;

        let mut body = None;
        if !self.data.is_empty() {
            let data = expand_map(&self.data, env)?;
            if self.method.sends_body() {
                body = Some(if self.is_json {
                    serde_json::to_vec(&data)?
                } else {
                    serde_urlencoded::to_string(&data)
                        .map_err(|e| Error::validation(format!("cannot form-encode data: {}", e)))?
                        .into_bytes()
                });
            } else {
                url = merge_query_params(&url, &data)?;
            }
        }

        let mut headers = HeaderMap::new();
        for (key, value) in expand_map(&self.header, env)? {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| Error::validation(format!("Invalid header name: {}", key)))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|_| Error::validation(format!("Invalid header value for {}", key)))?;
            headers.insert(name, value);
        }
        if !self.has_content_type() {
            if let Some(content_type) = self.default_content_type() {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }

        let cookies = expand_map(&self.cookie, env)?.into_iter().collect();

        Ok(TransportRequest {
            method: self.method.into(),
            url,
            headers,
            cookies,
            body,
        })
    }

    /// Build the request, send it and render the response for humans.
    pub fn send(&self, env: &Environment, transport: &dyn Transport) -> Result<String> {
        let request = self.build_request(env)?;
        tracing::info!(method = %request.method, url = %request.url, env = %env.name, "sending request");
        let response = transport.send(request)?;
        tracing::debug!(
            status = response.status.as_u16(),
            elapsed_ms = response.elapsed.as_millis() as u64,
            "response received"
        );
        summarize(&response)
    }
}

/// Merge `data` into the query string of `url`. Existing parameters are kept
/// unless `data` has the same key, in which case the `data` value wins.
fn merge_query_params(url: &str, data: &BTreeMap<String, String>) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|source| Error::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !data.contains_key(k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(data);
    Ok(parsed.into())
}

/// Status line, body as text, then the response headers as JSON.
pub fn summarize(response: &TransportResponse) -> Result<String> {
    let status = match response.status.canonical_reason() {
        Some(reason) => format!("{} {}", response.status.as_u16(), reason),
        None => response.status.as_u16().to_string(),
    };
    let body = String::from_utf8_lossy(&response.body);
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &response.headers {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    let headers = serde_json::to_string(&headers)?;
    Ok(format!(
        "{}\n\nbody:\n{}\n\nheaders:\n{}\n",
        status, body, headers
    ))
}
