// Core library for the Trellis web framework
// Metadata store, dependency injection, route registry and request dispatch

pub mod config;
pub mod controller;
pub mod decorators;
mod dispatch;
pub mod error;
pub mod error_page;
pub mod handler;
pub mod http;
pub mod injector;
pub mod logging;
pub mod module;
pub mod reflect;
pub mod reply;
pub mod route_registry;
pub mod router;
pub mod routing;
pub mod security;
pub mod static_files;
pub mod status;

// Re-export commonly used types
pub use config::AppConfig;
pub use controller::*;
pub use decorators::*;
pub use error::*;
pub use error_page::{DiagnosticPageRenderer, ErrorPage, ErrorPageRenderer};
pub use handler::{Action, ActionFuture, ErrorHandlerFn, Handler};
pub use self::http::*;
pub use injector::*;
pub use module::*;
pub use reflect::{Reflector, Subject};
pub use reply::*;
pub use route_registry::*;
pub use router::*;
pub use routing::*;
pub use status::*;

/// Everything an application usually needs
pub mod prelude {
    pub use crate::controller::{Controller, ControllerMethod};
    pub use crate::decorators::{Decorators, MethodSignature};
    pub use crate::handler::{Action, sync};
    pub use crate::injector::{ClassRef, Dependencies, Injectable, Injector, inject};
    pub use crate::module::{AnonymousRoute, ControllerRegistration, Module, ModuleRegistration, Plugin};
    pub use crate::{
        AppConfig, Content, Error, HttpMethod, HttpRequest, HttpResponse, HttpStatus, Reply,
        RouteOptions, RouteParams, Router,
    };
    pub use std::sync::Arc;
}
