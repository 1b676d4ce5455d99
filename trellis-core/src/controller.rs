// Controllers: injectable classes whose methods become routes

use crate::decorators::{Decorators, MethodSignature};
use crate::injector::Injectable;
use crate::{Error, HttpRequest, HttpStatus, Reply, RouteParams};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a controller method body.
pub type MethodFuture = BoxFuture<'static, Result<Reply, Error>>;

type ActionBody<C> = Arc<dyn Fn(Arc<C>, RouteParams, Arc<HttpRequest>) -> MethodFuture + Send + Sync>;
type ErrorHandlerBody<C> = Arc<dyn Fn(Arc<C>, HttpStatus) -> MethodFuture + Send + Sync>;

/// Callable part of a controller method
pub enum MethodBody<C> {
    /// Answers a route: `(controller, params, request)`
    Action(ActionBody<C>),
    /// Answers an error status: `(controller, status)`
    ErrorHandler(ErrorHandlerBody<C>),
}

impl<C> Clone for MethodBody<C> {
    fn clone(&self) -> Self {
        match self {
            MethodBody::Action(body) => MethodBody::Action(body.clone()),
            MethodBody::ErrorHandler(body) => MethodBody::ErrorHandler(body.clone()),
        }
    }
}

/// One entry of a controller's method table
pub struct ControllerMethod<C> {
    pub signature: MethodSignature,
    pub body: MethodBody<C>,
}

impl<C: Send + Sync + 'static> ControllerMethod<C> {
    /// A public instance method answering routes.
    pub fn action<F, Fut, R>(name: &'static str, f: F) -> Self
    where
        F: Fn(Arc<C>, RouteParams, Arc<HttpRequest>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Into<Reply>,
    {
        let body: ActionBody<C> = Arc::new(
            move |this: Arc<C>, params: RouteParams, request: Arc<HttpRequest>| -> MethodFuture {
                let fut = f(this, params, request);
                Box::pin(async move { fut.await.map(Into::into) })
            },
        );

        Self {
            signature: MethodSignature::new::<C>(name),
            body: MethodBody::Action(body),
        }
    }

    /// A public instance method answering error statuses.
    pub fn error_handler<F, Fut, R>(name: &'static str, f: F) -> Self
    where
        F: Fn(Arc<C>, HttpStatus) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Into<Reply>,
    {
        let body: ErrorHandlerBody<C> =
            Arc::new(move |this: Arc<C>, status: HttpStatus| -> MethodFuture {
                let fut = f(this, status);
                Box::pin(async move { fut.await.map(Into::into) })
            });

        Self {
            signature: MethodSignature::new::<C>(name),
            body: MethodBody::ErrorHandler(body),
        }
    }

    pub fn private(mut self) -> Self {
        self.signature = self.signature.private();
        self
    }

    pub fn as_static(mut self) -> Self {
        self.signature = self.signature.as_static();
        self
    }
}

/// A class whose decorated methods are registered as routes and error
/// handlers.
///
/// `methods` lists the callable methods (the router only looks at public,
/// non-static ones not starting with `_`); `declare` applies decorators and
/// runs once per controller type, before the first registration.
pub trait Controller: Injectable {
    fn methods() -> Vec<ControllerMethod<Self>>;

    fn declare(decorators: &Decorators) -> Result<(), Error> {
        let _ = decorators;
        Ok(())
    }
}
