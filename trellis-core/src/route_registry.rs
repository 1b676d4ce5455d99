//! Route registry
//!
//! An append-only, ordered list of route descriptors. Routes are pushed during
//! the registration phase and scanned linearly by the dispatcher; the first
//! registered route that matches a request wins.

use crate::injector::{Dependencies, Injectable};
use crate::logging::trace;
use crate::{Action, Error, HttpMethod, PathPattern, RouteOptions, RouteParams};
use parking_lot::RwLock;

/// A registered route
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub methods: Vec<HttpMethod>,
    /// Path as registered
    pub path: String,
    pub pattern: PathPattern,
    pub action: Action,
    pub options: RouteOptions,
}

impl RouteDescriptor {
    pub fn new(
        path: &str,
        methods: Vec<HttpMethod>,
        action: Action,
        options: RouteOptions,
    ) -> Result<Self, Error> {
        if methods.is_empty() {
            return Err(Error::InvalidRoute(format!("{}: no HTTP methods given", path)));
        }

        let pattern = PathPattern::parse(path)?;
        Ok(Self {
            methods,
            path: pattern.as_str().to_string(),
            pattern,
            action,
            options,
        })
    }

    pub fn allows(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }
}

/// Shared store of registered routes
#[derive(Default)]
pub struct RouteStore {
    routes: RwLock<Vec<RouteDescriptor>>,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, route: RouteDescriptor) {
        trace!(path = %route.path, methods = ?route.methods, "Route stored");
        self.routes.write().push(route);
    }

    /// First route, in registration order, accepting `method` on `path`
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<(RouteDescriptor, RouteParams)> {
        self.routes
            .read()
            .iter()
            .filter(|route| route.allows(method))
            .find_map(|route| {
                route
                    .pattern
                    .matches(path)
                    .map(|params| (route.clone(), params))
            })
    }

    /// Snapshot of every route, in registration order
    pub fn routes(&self) -> Vec<RouteDescriptor> {
        self.routes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

impl Injectable for RouteStore {
    fn construct(_: &mut Dependencies) -> Result<Self, Error> {
        Ok(Self::new())
    }
}
