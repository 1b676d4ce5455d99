// Handler results and per-route response options

use crate::{Error, HttpStatus};
use serde::Serialize;

/// Body produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// No body; the response status becomes 204 No Content.
    Empty,
    Text(String),
    Html(String),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Content {
    pub fn content_type(&self) -> &'static str {
        match self {
            Content::Empty | Content::Text(_) => "text/plain",
            Content::Html(_) => "text/html",
            Content::Json(_) => "application/json",
            Content::Bytes(_) => "application/octet-stream",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty)
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, Error> {
        Ok(match self {
            Content::Empty => Vec::new(),
            Content::Text(text) | Content::Html(text) => text.into_bytes(),
            Content::Json(value) => serde_json::to_vec(&value)?,
            Content::Bytes(bytes) => bytes,
        })
    }
}

/// Options attached to a route at registration time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteOptions {
    pub status_code: Option<HttpStatus>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: HttpStatus) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }
}

/// What a handler returns: a body plus optional status, headers and cookies.
///
/// Anything convertible into a `Reply` can be returned from an action:
///
/// ```
/// use trellis_core::{HttpStatus, Reply};
///
/// let reply = Reply::from("created").status(HttpStatus::Created);
/// assert_eq!(reply.status, Some(HttpStatus::Created));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: Content,
    pub status: Option<HttpStatus>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl Reply {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            status: None,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Content::Empty)
    }

    pub fn html(markup: impl Into<String>) -> Self {
        Self::new(Content::Html(markup.into()))
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        Ok(Self::new(Content::Json(serde_json::to_value(value)?)))
    }

    pub fn status(mut self, status: HttpStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Fill in whatever the handler left unset from the route's options.
    ///
    /// Route headers come first so the handler's own headers win when the
    /// response is composed; a route cookie is dropped if the handler sets a
    /// cookie of the same name.
    pub fn with_defaults(mut self, options: &RouteOptions) -> Self {
        self.status = self.status.or(options.status_code);

        let mut headers = options.headers.clone();
        headers.append(&mut self.headers);
        self.headers = headers;

        let mut cookies: Vec<(String, String)> = options
            .cookies
            .iter()
            .filter(|(name, _)| !self.cookies.iter().any(|(own, _)| own == name))
            .cloned()
            .collect();
        cookies.append(&mut self.cookies);
        self.cookies = cookies;

        self
    }
}

impl From<Content> for Reply {
    fn from(content: Content) -> Self {
        Reply::new(content)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::empty()
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::new(Content::Text(text.to_string()))
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::new(Content::Text(text))
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Reply::new(Content::Json(value))
    }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self {
        Reply::new(Content::Bytes(bytes))
    }
}
