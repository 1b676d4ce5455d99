//! Route and error-handler decorators.
//!
//! Decorators only write metadata: applying one to a controller method records
//! a fragment in the [`Reflector`] keyed to that method and hands the method
//! back unchanged. The router reads the fragments when the controller is
//! registered.
//!
//! ```
//! use trellis_core::prelude::*;
//!
//! # fn declare(d: &Decorators) -> Result<(), Error> {
//! # struct Users;
//! # impl Injectable for Users {
//! #     fn construct(_: &mut Dependencies) -> Result<Self, Error> { Ok(Users) }
//! # }
//! let index = MethodSignature::new::<Users>("index");
//! d.controller::<Users>("/users");
//! d.get.route("/")?.apply(index)?;
//! # Ok(())
//! # }
//! ```

use crate::controller::Controller;
use crate::injector::{ClassRef, inject};
use crate::logging::trace;
use crate::reflect::{Reflector, Subject, keys};
use crate::{Error, HttpMethod, HttpStatus, PathPattern, RouteOptions};
use std::any::TypeId;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// Takes the controller instance
    Instance,
    /// Associated function without a receiver
    Static,
}

/// Identity and shape of a controller method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSignature {
    pub owner: TypeId,
    pub owner_name: &'static str,
    pub name: &'static str,
    pub visibility: Visibility,
    pub receiver: Receiver,
}

impl MethodSignature {
    /// A public instance method of `C`
    pub fn new<C: 'static>(name: &'static str) -> Self {
        Self {
            owner: TypeId::of::<C>(),
            owner_name: std::any::type_name::<C>(),
            name,
            visibility: Visibility::Public,
            receiver: Receiver::Instance,
        }
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn as_static(mut self) -> Self {
        self.receiver = Receiver::Static;
        self
    }

    pub fn subject(&self) -> Subject {
        Subject::Method(self.owner, self.name)
    }

    /// Whether controller registration looks at this method at all
    pub fn is_routable(&self) -> bool {
        self.visibility == Visibility::Public
            && self.receiver == Receiver::Instance
            && !self.name.starts_with('_')
    }
}

/// Route fragment written under [`keys::ROUTE`]
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMetadata {
    pub methods: Vec<HttpMethod>,
    pub path: String,
    pub options: RouteOptions,
}

/// Error handler fragment written under [`keys::HTTP_ERROR_HANDLER`].
/// `status: None` marks the default handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorHandlerMetadata {
    pub status: Option<HttpStatus>,
}

#[derive(Debug, Clone)]
enum Fragment {
    Route(RouteMetadata),
    ErrorHandler(ErrorHandlerMetadata),
}

/// A decorator ready to be applied to one method
#[derive(Clone)]
pub struct MethodDecorator {
    reflector: Arc<Reflector>,
    fragment: Fragment,
}

impl MethodDecorator {
    /// Record this decorator's metadata against `signature`.
    ///
    /// Route decorators only accept public instance methods.
    pub fn apply(&self, signature: MethodSignature) -> Result<MethodSignature, Error> {
        match &self.fragment {
            Fragment::Route(route) => {
                if signature.visibility == Visibility::Private {
                    return Err(Error::Decorator(format!(
                        "Controller route method \"{}\" must be public",
                        signature.name
                    )));
                }
                if signature.receiver == Receiver::Static {
                    return Err(Error::Decorator(format!(
                        "Controller route method \"{}\" cannot be static",
                        signature.name
                    )));
                }

                trace!(
                    controller = signature.owner_name,
                    method = signature.name,
                    path = %route.path,
                    "Route declared"
                );
                self.reflector
                    .define_metadata(keys::ROUTE, route.clone(), signature.subject());
            }
            Fragment::ErrorHandler(handler) => {
                trace!(
                    controller = signature.owner_name,
                    method = signature.name,
                    status = ?handler.status,
                    "Error handler declared"
                );
                self.reflector
                    .define_metadata(keys::HTTP_ERROR_HANDLER, *handler, signature.subject());
            }
        }

        Ok(signature)
    }
}

fn route_fragment(
    reflector: &Arc<Reflector>,
    methods: Vec<HttpMethod>,
    path: &str,
    options: RouteOptions,
) -> Result<MethodDecorator, Error> {
    if methods.is_empty() {
        return Err(Error::Decorator(format!("route \"{}\" has no HTTP methods", path)));
    }
    PathPattern::parse(path)?;

    Ok(MethodDecorator {
        reflector: reflector.clone(),
        fragment: Fragment::Route(RouteMetadata {
            methods,
            path: path.to_string(),
            options,
        }),
    })
}

/// Route decorator with its method set fixed at creation (`Get`, `Post`, ...)
#[derive(Clone)]
pub struct RouteDecorator {
    reflector: Arc<Reflector>,
    methods: Vec<HttpMethod>,
}

impl RouteDecorator {
    pub fn new(reflector: Arc<Reflector>, methods: Vec<HttpMethod>) -> Self {
        Self { reflector, methods }
    }

    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }

    pub fn route(&self, path: &str) -> Result<MethodDecorator, Error> {
        self.route_with(path, RouteOptions::default())
    }

    pub fn route_with(&self, path: &str, options: RouteOptions) -> Result<MethodDecorator, Error> {
        route_fragment(&self.reflector, self.methods.clone(), path, options)
    }
}

/// Route decorator taking the method set at each use (`Methods`)
#[derive(Clone)]
pub struct MethodsDecorator {
    reflector: Arc<Reflector>,
}

impl MethodsDecorator {
    pub fn new(reflector: Arc<Reflector>) -> Self {
        Self { reflector }
    }

    pub fn route(&self, methods: &[HttpMethod], path: &str) -> Result<MethodDecorator, Error> {
        self.route_with(methods, path, RouteOptions::default())
    }

    pub fn route_with(
        &self,
        methods: &[HttpMethod],
        path: &str,
        options: RouteOptions,
    ) -> Result<MethodDecorator, Error> {
        route_fragment(&self.reflector, methods.to_vec(), path, options)
    }
}

/// Mark a method as the handler for `status`, or as the default handler.
pub fn error_handler(reflector: &Arc<Reflector>, status: Option<HttpStatus>) -> MethodDecorator {
    MethodDecorator {
        reflector: reflector.clone(),
        fragment: Fragment::ErrorHandler(ErrorHandlerMetadata { status }),
    }
}

/// Set the base path every route of `C` is mounted under.
pub fn controller<C: 'static>(reflector: &Reflector, base_path: &str) {
    trace!(
        controller = std::any::type_name::<C>(),
        base_path,
        "Controller base path declared"
    );
    reflector.define_metadata(keys::BASE_PATH, base_path.to_string(), Subject::of::<C>());
}

/// Every decorator a controller may use, bound to one metadata store.
#[derive(Clone)]
pub struct Decorators {
    reflector: Arc<Reflector>,
    pub any: RouteDecorator,
    pub copy: RouteDecorator,
    pub delete: RouteDecorator,
    pub get: RouteDecorator,
    pub head: RouteDecorator,
    pub lock: RouteDecorator,
    pub mkcol: RouteDecorator,
    pub move_: RouteDecorator,
    pub options: RouteDecorator,
    pub patch: RouteDecorator,
    pub post: RouteDecorator,
    pub prop_find: RouteDecorator,
    pub prop_patch: RouteDecorator,
    pub put: RouteDecorator,
    pub search: RouteDecorator,
    pub trace: RouteDecorator,
    pub unlock: RouteDecorator,
    pub methods: MethodsDecorator,
}

impl Decorators {
    pub fn new(reflector: Arc<Reflector>) -> Self {
        let fixed = |methods: &[HttpMethod]| RouteDecorator::new(reflector.clone(), methods.to_vec());

        Self {
            any: fixed(&HttpMethod::ALL),
            copy: fixed(&[HttpMethod::COPY]),
            delete: fixed(&[HttpMethod::DELETE]),
            get: fixed(&[HttpMethod::GET]),
            head: fixed(&[HttpMethod::HEAD]),
            lock: fixed(&[HttpMethod::LOCK]),
            mkcol: fixed(&[HttpMethod::MKCOL]),
            move_: fixed(&[HttpMethod::MOVE]),
            options: fixed(&[HttpMethod::OPTIONS]),
            patch: fixed(&[HttpMethod::PATCH]),
            post: fixed(&[HttpMethod::POST]),
            prop_find: fixed(&[HttpMethod::PROPFIND]),
            prop_patch: fixed(&[HttpMethod::PROPPATCH]),
            put: fixed(&[HttpMethod::PUT]),
            search: fixed(&[HttpMethod::SEARCH]),
            trace: fixed(&[HttpMethod::TRACE]),
            unlock: fixed(&[HttpMethod::UNLOCK]),
            methods: MethodsDecorator::new(reflector.clone()),
            reflector,
        }
    }

    pub fn reflector(&self) -> &Arc<Reflector> {
        &self.reflector
    }

    /// The `Error` decorator
    pub fn error(&self, status: Option<HttpStatus>) -> MethodDecorator {
        error_handler(&self.reflector, status)
    }

    /// The class-level base path decorator
    pub fn controller<C: 'static>(&self, base_path: &str) {
        controller::<C>(&self.reflector, base_path);
    }

    /// The `Inject` class decorator
    pub fn inject<C: 'static>(&self, dependencies: impl IntoIterator<Item = ClassRef>) {
        inject::<C>(&self.reflector, dependencies);
    }

    /// Signature of a method listed in `C::methods()`
    pub fn method<C: Controller>(&self, name: &str) -> Result<MethodSignature, Error> {
        C::methods()
            .into_iter()
            .map(|method| method.signature)
            .find(|signature| signature.name == name)
            .ok_or_else(|| {
                Error::Decorator(format!(
                    "{} has no method named \"{}\"",
                    std::any::type_name::<C>(),
                    name
                ))
            })
    }
}
