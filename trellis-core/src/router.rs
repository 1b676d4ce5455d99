//! The router: route and error-handler registration.
//!
//! Registration happens once at startup; dispatch (see `dispatch.rs`) only
//! reads what was registered here.

use crate::controller::{Controller, MethodBody};
use crate::decorators::{Decorators, ErrorHandlerMetadata, MethodsDecorator, RouteDecorator, RouteMetadata};
use crate::error_page::{DiagnosticPageRenderer, ErrorPageRenderer};
use crate::handler::{ActionFuture, ErrorHandlerFn, Handler};
use crate::injector::Injector;
use crate::logging::{debug, info, trace};
use crate::module::{Module, Plugin};
use crate::reflect::{Subject, keys};
use crate::{
    Action, AppConfig, Error, HttpMethod, HttpRequest, HttpStatus, Reply, RouteDescriptor, RouteOptions,
    RouteParams, RouteStore,
};
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

macro_rules! method_shortcuts {
    ($($(#[$doc:meta])* $name:ident => $method:ident,)+) => {
        $(
            $(#[$doc])*
            pub fn $name<H: Handler>(&self, path: &str, handler: H) -> Result<(), Error> {
                self.register_route(path, vec![HttpMethod::$method], Action::new(handler), RouteOptions::default())
            }
        )+
    };
}

/// Route registry plus the error-handler map, bound to one injector.
pub struct Router {
    pub(crate) injector: Arc<Injector>,
    pub(crate) config: Arc<AppConfig>,
    pub(crate) store: Arc<RouteStore>,
    pub(crate) error_handlers: RwLock<HashMap<Option<HttpStatus>, ErrorHandlerFn>>,
    pub(crate) renderer: Arc<dyn ErrorPageRenderer>,
    declared: Mutex<HashSet<TypeId>>,
}

impl Router {
    /// Create a router, resolving the configuration and route store through
    /// `injector`.
    ///
    /// Register a custom [`AppConfig`] on the injector before calling this.
    pub fn new(injector: Arc<Injector>) -> Result<Self, Error> {
        let config = injector.resolve::<AppConfig>()?;
        let store = injector.resolve::<RouteStore>()?;
        debug!(production = config.is_production, "Creating router");

        Ok(Self {
            injector,
            config,
            store,
            error_handlers: RwLock::new(HashMap::new()),
            renderer: Arc::new(DiagnosticPageRenderer),
            declared: Mutex::new(HashSet::new()),
        })
    }

    /// Replace the renderer used for the diagnostic error page
    pub fn with_renderer(mut self, renderer: impl ErrorPageRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn injector(&self) -> &Arc<Injector> {
        &self.injector
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RouteStore> {
        &self.store
    }

    /// The decorator bundle bound to this router's metadata store
    pub fn decorators(&self) -> Decorators {
        Decorators::new(self.injector.reflector().clone())
    }

    /// A route decorator for a fixed method set
    pub fn create_route_decorator(&self, methods: &[HttpMethod]) -> RouteDecorator {
        RouteDecorator::new(self.injector.reflector().clone(), methods.to_vec())
    }

    /// A route decorator taking the method set at each use
    pub fn create_methods_decorator(&self) -> MethodsDecorator {
        MethodsDecorator::new(self.injector.reflector().clone())
    }

    /// `http(s)://host[:port]`; the port is left out in production.
    pub fn base_url(&self) -> String {
        let scheme = if self.config.tls.enabled { "https" } else { "http" };
        if self.config.is_production {
            format!("{}://{}", scheme, self.config.host)
        } else {
            format!("{}://{}:{}", scheme, self.config.host, self.config.port)
        }
    }

    /// Append a route. Registration order decides which route wins when
    /// several match.
    pub fn register_route(
        &self,
        path: &str,
        methods: Vec<HttpMethod>,
        action: Action,
        options: RouteOptions,
    ) -> Result<(), Error> {
        let route = RouteDescriptor::new(path, methods, action, options)?;
        debug!(path = %route.path, methods = ?route.methods, "Registered route");
        self.store.push(route);
        Ok(())
    }

    method_shortcuts! {
        get => GET,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
        head => HEAD,
        options => OPTIONS,
        copy => COPY,
        lock => LOCK,
        mkcol => MKCOL,
        /// `MOVE` (`move` is a keyword)
        move_ => MOVE,
        prop_find => PROPFIND,
        prop_patch => PROPPATCH,
        search => SEARCH,
        trace => TRACE,
        unlock => UNLOCK,
    }

    /// Register for every method
    pub fn any<H: Handler>(&self, path: &str, handler: H) -> Result<(), Error> {
        self.register_route(path, HttpMethod::ALL.to_vec(), Action::new(handler), RouteOptions::default())
    }

    /// Register for every method except `methods`
    pub fn except<H: Handler>(&self, methods: &[HttpMethod], path: &str, handler: H) -> Result<(), Error> {
        let allowed = HttpMethod::ALL
            .into_iter()
            .filter(|method| !methods.contains(method))
            .collect();
        self.register_route(path, allowed, Action::new(handler), RouteOptions::default())
    }

    pub fn methods<H: Handler>(&self, methods: &[HttpMethod], path: &str, handler: H) -> Result<(), Error> {
        self.register_route(path, methods.to_vec(), Action::new(handler), RouteOptions::default())
    }

    /// Register the handler for `status`, or the default handler when `None`.
    /// A later registration for the same key replaces the earlier one.
    pub fn register_error_handler<F, Fut, R>(&self, status: Option<HttpStatus>, handler: F)
    where
        F: Fn(HttpStatus) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Into<Reply>,
    {
        let handler: ErrorHandlerFn = Arc::new(move |status: HttpStatus| -> ActionFuture {
            let fut = handler(status);
            Box::pin(async move { fut.await.map(Into::into) })
        });

        if self.error_handlers.write().insert(status, handler).is_some() {
            debug!(status = ?status, "Replaced error handler");
        } else {
            debug!(status = ?status, "Registered error handler");
        }
    }

    /// Resolve controller `C` and register its decorated methods.
    pub fn register_controller<C: Controller>(&self) -> Result<(), Error> {
        let type_id = TypeId::of::<C>();
        let name = std::any::type_name::<C>();

        if !self.declared.lock().contains(&type_id) {
            C::declare(&self.decorators())?;
            self.declared.lock().insert(type_id);
        }

        let instance = self.injector.resolve::<C>()?;
        let reflector = self.injector.reflector();
        let base_path: String = reflector
            .get_metadata(keys::BASE_PATH, Subject::of::<C>())
            .unwrap_or_else(|| "/".to_string());

        let mut routes = 0;
        for method in C::methods() {
            let signature = method.signature;
            if !signature.is_routable() {
                trace!(controller = name, method = signature.name, "Skipping method");
                continue;
            }

            if let Some(meta) = reflector
                .get_metadata::<ErrorHandlerMetadata>(keys::HTTP_ERROR_HANDLER, signature.subject())
            {
                let MethodBody::ErrorHandler(body) = method.body else {
                    return Err(Error::Decorator(format!(
                        "{}::{} is decorated as an error handler but does not take a status",
                        name, signature.name
                    )));
                };

                let this = instance.clone();
                self.register_error_handler(meta.status, move |status| body(this.clone(), status));
                continue;
            }

            let Some(route) = reflector.get_metadata::<RouteMetadata>(keys::ROUTE, signature.subject()) else {
                continue;
            };
            let MethodBody::Action(body) = method.body else {
                return Err(Error::Decorator(format!(
                    "{}::{} is decorated as a route but is an error handler",
                    name, signature.name
                )));
            };

            let this = instance.clone();
            let action = Action::new(move |params: RouteParams, request: Arc<HttpRequest>| {
                body(this.clone(), params, request)
            });
            self.register_route(
                &resolve_route_path(&base_path, &route.path),
                route.methods,
                action,
                route.options,
            )?;
            routes += 1;
        }

        info!(controller = name, base_path = %base_path, routes, "Registered controller");
        Ok(())
    }

    /// Register a module's controllers, anonymous routes and submodules.
    pub fn register_module<M: Module>(&self) -> Result<(), Error> {
        let module = self.injector.resolve::<M>()?;

        for controller in module.controllers() {
            trace!(controller = controller.type_name, "Registering module controller");
            (controller.register_fn)(self)?;
        }

        for route in module.routes() {
            self.register_route(&route.path, route.methods, route.action, route.options)?;
        }

        for submodule in module.submodules() {
            trace!(module = submodule.type_name, "Registering submodule");
            (submodule.register_fn)(self)?;
        }

        info!(module = std::any::type_name::<M>(), "Registered module");
        Ok(())
    }

    /// Await the plugin's load hook, then register its modules, controllers
    /// and routes in that order.
    pub async fn register_plugin(&self, plugin: &dyn Plugin) -> Result<(), Error> {
        plugin.on_load().await?;

        let modules = plugin.modules();
        for module in &modules {
            trace!(module = module.type_name, "Registering plugin module");
            (module.register_fn)(self)?;
        }

        let controllers = plugin.controllers();
        for controller in &controllers {
            trace!(controller = controller.type_name, "Registering plugin controller");
            (controller.register_fn)(self)?;
        }

        let routes = plugin.routes();
        let route_count = routes.len();
        for route in routes {
            self.register_route(&route.path, route.methods, route.action, route.options)?;
        }

        info!(
            modules = modules.len(),
            controllers = controllers.len(),
            routes = route_count,
            "Registered plugin"
        );
        Ok(())
    }
}

/// Join a controller base path and a method path.
///
/// A `/` base leaves the method path untouched; otherwise a single `/` is
/// inserted only when neither side already has one at the seam.
pub fn resolve_route_path(base_path: &str, path: &str) -> String {
    if base_path == "/" {
        return path.to_string();
    }

    if !path.starts_with('/') && !base_path.ends_with('/') {
        format!("{}/{}", base_path, path)
    } else {
        format!("{}{}", base_path, path)
    }
}
