// Modules group controllers, anonymous routes and nested modules

use crate::controller::Controller;
use crate::injector::Injectable;
use async_trait::async_trait;
use crate::{Action, Error, HttpMethod, RouteOptions, Router};

/// A route registered without a controller
#[derive(Debug, Clone)]
pub struct AnonymousRoute {
    pub path: String,
    pub methods: Vec<HttpMethod>,
    pub action: Action,
    pub options: RouteOptions,
}

impl AnonymousRoute {
    pub fn new(path: impl Into<String>, methods: Vec<HttpMethod>, action: Action) -> Self {
        Self {
            path: path.into(),
            methods,
            action,
            options: RouteOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }
}

/// Registration information for a controller
#[derive(Clone, Copy)]
pub struct ControllerRegistration {
    pub type_name: &'static str,
    pub register_fn: fn(&Router) -> Result<(), Error>,
}

impl ControllerRegistration {
    pub fn of<C: Controller>() -> Self {
        fn register<C: Controller>(router: &Router) -> Result<(), Error> {
            router.register_controller::<C>()
        }

        Self {
            type_name: std::any::type_name::<C>(),
            register_fn: register::<C>,
        }
    }
}

impl std::fmt::Debug for ControllerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistration")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Registration information for a module
#[derive(Clone, Copy)]
pub struct ModuleRegistration {
    pub type_name: &'static str,
    pub register_fn: fn(&Router) -> Result<(), Error>,
}

impl ModuleRegistration {
    pub fn of<M: Module>() -> Self {
        fn register<M: Module>(router: &Router) -> Result<(), Error> {
            router.register_module::<M>()
        }

        Self {
            type_name: std::any::type_name::<M>(),
            register_fn: register::<M>,
        }
    }
}

impl std::fmt::Debug for ModuleRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistration")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Trait for modules that organize controllers and routes
pub trait Module: Injectable {
    fn controllers(&self) -> Vec<ControllerRegistration> {
        Vec::new()
    }

    fn routes(&self) -> Vec<AnonymousRoute> {
        Vec::new()
    }

    fn submodules(&self) -> Vec<ModuleRegistration> {
        Vec::new()
    }
}

/// A bundle of modules, controllers and routes with an optional load hook.
///
/// Unlike modules, plugins are plain values handed to
/// [`Router::register_plugin`] rather than resolved through the injector.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Runs before anything the plugin provides is registered.
    async fn on_load(&self) -> Result<(), Error> {
        Ok(())
    }

    fn modules(&self) -> Vec<ModuleRegistration> {
        Vec::new()
    }

    fn controllers(&self) -> Vec<ControllerRegistration> {
        Vec::new()
    }

    fn routes(&self) -> Vec<AnonymousRoute> {
        Vec::new()
    }
}
