// Error types for the Trellis framework

use crate::HttpStatus;
use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::Location;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// An explicit, status-bearing error raised by application code.
    #[error("{status}: {message}")]
    Http { status: HttpStatus, message: String },

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    /// Any unclassified failure during dispatch.
    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        location: Option<&'static Location<'static>>,
        trace: Arc<Backtrace>,
    },

    #[error("Dependency injection error: {0}")]
    DependencyInjection(String),

    #[error("Cyclic dependency detected: {0}")]
    CyclicDependency(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Invalid decorator usage: {0}")]
    Decorator(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Typed HTTP error carrying the status's reason phrase.
    pub fn http(status: HttpStatus) -> Self {
        Error::Http {
            status,
            message: status.reason().to_string(),
        }
    }

    pub fn http_with(status: HttpStatus, message: impl Into<String>) -> Self {
        Error::Http {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http_with(HttpStatus::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http_with(HttpStatus::BadRequest, message)
    }

    /// Unclassified error; records the caller's source location and a backtrace
    /// for the diagnostic error page.
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
            location: Some(Location::caller()),
            trace: Arc::new(Backtrace::capture()),
        }
    }

    /// Convert a caught panic payload into an internal error.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "handler panicked".to_string()
        };

        Error::Internal {
            message,
            location: None,
            trace: Arc::new(Backtrace::capture()),
        }
    }

    /// Whether this error carries its own HTTP status (and is therefore
    /// answered with a minimal abort response).
    pub fn is_http(&self) -> bool {
        matches!(self, Error::Http { .. } | Error::RouteNotFound(_))
    }

    /// Get the HttpStatus for this error
    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::Http { status, .. } => *status,
            Error::RouteNotFound(_) => HttpStatus::NotFound,
            _ => HttpStatus::InternalServerError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    /// Source location recorded by [`Error::internal`].
    pub fn location(&self) -> Option<(&'static str, u32)> {
        match self {
            Error::Internal {
                location: Some(location),
                ..
            } => Some((location.file(), location.line())),
            _ => None,
        }
    }

    /// Rendered backtrace, when one was captured.
    pub fn backtrace_text(&self) -> Option<String> {
        match self {
            Error::Internal { trace, .. } => Some(trace.to_string()),
            _ => None,
        }
    }

    /// Errors raised while wiring the application together rather than while serving.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Error::DependencyInjection(_)
                | Error::CyclicDependency(_)
                | Error::ProviderNotFound(_)
                | Error::Decorator(_)
                | Error::InvalidRoute(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
