// Route actions
//
// Actions are stored type-erased so routes with different handler types can
// share one registry. Any `Fn(RouteParams, Arc<HttpRequest>) -> impl Future`
// whose output converts into a `Reply` is an action; synchronous closures are
// wrapped with `sync`.

use crate::{Error, HttpRequest, HttpStatus, Reply, RouteParams};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a stored action.
pub type ActionFuture = BoxFuture<'static, Result<Reply, Error>>;

/// Callback registered for an HTTP status (or as the default error handler).
pub type ErrorHandlerFn = Arc<dyn Fn(HttpStatus) -> ActionFuture + Send + Sync>;

/// Something that can answer a matched route.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, params: RouteParams, request: Arc<HttpRequest>) -> ActionFuture;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(RouteParams, Arc<HttpRequest>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: Into<Reply>,
{
    #[inline]
    fn call(&self, params: RouteParams, request: Arc<HttpRequest>) -> ActionFuture {
        let fut = (self)(params, request);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// Adapter for actions that do not need to await anything.
pub struct SyncHandler<F> {
    f: F,
}

impl<F, R> Handler for SyncHandler<F>
where
    F: Fn(RouteParams, Arc<HttpRequest>) -> Result<R, Error> + Send + Sync + 'static,
    R: Into<Reply>,
{
    fn call(&self, params: RouteParams, request: Arc<HttpRequest>) -> ActionFuture {
        let result = (self.f)(params, request).map(Into::into);
        Box::pin(futures_util::future::ready(result))
    }
}

/// Wrap a synchronous closure as an action.
///
/// ```
/// use trellis_core::{handler::sync, Action};
///
/// let action = Action::new(sync(|params, _request| {
///     Ok(format!("user {}", params.get("id").unwrap_or("?")))
/// }));
/// ```
pub fn sync<F, R>(f: F) -> SyncHandler<F>
where
    F: Fn(RouteParams, Arc<HttpRequest>) -> Result<R, Error> + Send + Sync + 'static,
    R: Into<Reply>,
{
    SyncHandler { f }
}

/// Type-erased action stored in a route descriptor.
#[derive(Clone)]
pub struct Action {
    inner: Arc<dyn Handler>,
}

impl Action {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    #[inline]
    pub fn call(&self, params: RouteParams, request: Arc<HttpRequest>) -> ActionFuture {
        self.inner.call(params, request)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").finish_non_exhaustive()
    }
}
