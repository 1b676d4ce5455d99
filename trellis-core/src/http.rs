// HTTP request and response types

use crate::Error;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP methods a route can be registered for.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    COPY,
    LOCK,
    MKCOL,
    MOVE,
    PROPFIND,
    PROPPATCH,
    SEARCH,
    TRACE,
    UNLOCK,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 16] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::DELETE,
        HttpMethod::PATCH,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
        HttpMethod::COPY,
        HttpMethod::LOCK,
        HttpMethod::MKCOL,
        HttpMethod::MOVE,
        HttpMethod::PROPFIND,
        HttpMethod::PROPPATCH,
        HttpMethod::SEARCH,
        HttpMethod::TRACE,
        HttpMethod::UNLOCK,
    ];

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.to_uppercase();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == upper)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
            HttpMethod::COPY => "COPY",
            HttpMethod::LOCK => "LOCK",
            HttpMethod::MKCOL => "MKCOL",
            HttpMethod::MOVE => "MOVE",
            HttpMethod::PROPFIND => "PROPFIND",
            HttpMethod::PROPPATCH => "PROPPATCH",
            HttpMethod::SEARCH => "SEARCH",
            HttpMethod::TRACE => "TRACE",
            HttpMethod::UNLOCK => "UNLOCK",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound request as handed over by the transport.
///
/// The body is fully buffered; header names are stored lowercase.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Method as sent on the wire, before any `_method` override
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    nonce: String,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: Vec::new(),
            nonce: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }

    /// Raw request URL
    pub fn url(&self) -> &str {
        if self.url.is_empty() { "/" } else { &self.url }
    }

    /// Path component of the URL, without query string or fragment
    pub fn path(&self) -> &str {
        let url = self.url();
        let rest = match url.find("://") {
            Some(scheme_end) => {
                let after_scheme = &url[scheme_end + 3..];
                match after_scheme.find('/') {
                    Some(slash) => &after_scheme[slash..],
                    None => "",
                }
            }
            None => url,
        };

        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        let path = &rest[..end];
        if path.is_empty() { "/" } else { path }
    }

    /// Decoded query string parameters
    pub fn query_params(&self) -> HashMap<String, String> {
        let url = self.url();
        let query = match url.find('?') {
            Some(start) => {
                let query = &url[start + 1..];
                &query[..query.find('#').unwrap_or(query.len())]
            }
            None => return HashMap::new(),
        };

        serde_urlencoded::from_str(query).unwrap_or_default()
    }

    /// Per-request nonce bound into the Content-Security-Policy
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Form fields from a urlencoded or JSON object body.
    ///
    /// Any other body type, and JSON that is not an object, yields no fields.
    /// A body that does not parse at all is a bad request.
    pub fn form(&self) -> Result<HashMap<String, String>, Error> {
        if self.body.is_empty() {
            return Ok(HashMap::new());
        }

        let content_type = self.header("content-type").unwrap_or_default();
        if content_type.contains("application/x-www-form-urlencoded") {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&self.body)
                .map_err(|e| Error::bad_request(format!("Malformed form body: {}", e)))?;
            Ok(pairs.into_iter().collect())
        } else if content_type.contains("json") {
            let value: serde_json::Value = serde_json::from_slice(&self.body)
                .map_err(|e| Error::bad_request(format!("Malformed JSON body: {}", e)))?;
            let serde_json::Value::Object(object) = value else {
                return Ok(HashMap::new());
            };
            Ok(object
                .into_iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(text) => (key, text),
                    other => (key, other.to_string()),
                })
                .collect())
        } else {
            Ok(HashMap::new())
        }
    }

    pub fn input(&self, name: &str) -> Result<Option<String>, Error> {
        Ok(self.form()?.remove(name))
    }

    /// Effective method, honoring a `_method` override field when the
    /// request declares a content type.
    pub fn method(&self) -> Result<HttpMethod, Error> {
        let transport = HttpMethod::from_str(&self.method);

        if self.header("content-type").is_none() {
            return Ok(transport.unwrap_or(HttpMethod::GET));
        }

        let method = match self.input("_method")? {
            Some(name) => HttpMethod::from_str(&name),
            None => transport,
        };

        Ok(method.unwrap_or(HttpMethod::GET))
    }

    /// A GET whose path looks like a file name
    pub fn is_static_file_request(&self) -> bool {
        matches!(self.method(), Ok(method) if is_static_file_path(method, self.path()))
    }

    /// A request carrying a body: it declares a content type and its
    /// effective method is not a read-only one.
    pub fn is_form_request(&self) -> bool {
        self.header("content-type").is_some()
            && !matches!(
                self.method(),
                Ok(HttpMethod::GET | HttpMethod::HEAD | HttpMethod::PROPFIND | HttpMethod::SEARCH)
            )
    }

    pub fn is_multipart_request(&self) -> bool {
        self.is_form_request()
            && self
                .header("content-type")
                .is_some_and(|value| value.contains("multipart/form-data"))
    }

    pub fn is_ajax_request(&self) -> bool {
        self.header("x-requested-with")
            .is_some_and(|value| value.eq_ignore_ascii_case("xmlhttprequest"))
            || self
                .header("accept")
                .is_some_and(|value| value.contains("application/json"))
    }
}

/// Whether a request with `method` for `path` is a candidate for the static
/// file fallback.
pub fn is_static_file_path(method: HttpMethod, path: &str) -> bool {
    method == HttpMethod::GET && path.contains('.')
}

/// Composed response returned by the dispatcher
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Set a header, replacing previous values. Invalid names or values are
    /// reported as errors.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Add a header value, keeping previous ones (e.g. `set-cookie`).
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// First value of a header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// Every value of a header, in insertion order
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    /// Body decoded as UTF-8 (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::internal(format!("invalid header name {:?}: {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| Error::internal(format!("invalid value for header {}: {}", name, e)))?;
    Ok((header_name, header_value))
}
