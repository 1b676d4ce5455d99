// Request dispatch: route matching, response composition and error recovery

use crate::error_page::ErrorPage;
use crate::logging::{debug, error, warn};
use crate::security::{ContentSecurityPolicy, HARDENING_HEADERS, cors_headers};
use crate::http::is_static_file_path;
use crate::{Error, HttpMethod, HttpRequest, HttpResponse, HttpStatus, Reply, Router, static_files};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

impl Router {
    /// Answer a request.
    ///
    /// Never fails: errors raised while matching, running the handler or
    /// composing the response (panics included) are turned into an error
    /// response.
    ///
    /// ```
    /// use trellis_core::handler::sync;
    /// use trellis_core::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let router = Router::new(Arc::new(Injector::new()))?;
    /// router.get("/hello/:name", sync(|params, _req| {
    ///     Ok(format!("hello {}", params.get("name").unwrap_or("you")))
    /// }))?;
    ///
    /// let response = router.respond(HttpRequest::new("GET", "/hello/ada")).await;
    /// assert_eq!(response.text(), "hello ada");
    /// # Ok::<(), Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn respond(&self, request: HttpRequest) -> HttpResponse {
        let request = Arc::new(request);

        // The override may come from the body; read it once per request.
        let method = request.method();
        let effective = method.as_ref().ok().copied();

        let outcome = AssertUnwindSafe(self.dispatch(request.clone(), method))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(response)) => return response,
            Ok(Err(error)) => error,
            Err(panic) => Error::from_panic(panic),
        };

        self.recover(&request, effective, error).await
    }

    async fn dispatch(
        &self,
        request: Arc<HttpRequest>,
        method: Result<HttpMethod, Error>,
    ) -> Result<HttpResponse, Error> {
        let method = method?;
        let path = request.path().to_string();

        if let Some((route, params)) = self.store.find(method, &path) {
            debug!(method = %method, path = %path, route = %route.path, "Route matched");
            let reply = route.action.call(params, request.clone()).await?;
            return self.compose(&request, Some(method), reply.with_defaults(&route.options));
        }

        if is_static_file_path(method, &path) {
            return self.create_static_file_response(&request, method).await;
        }

        Err(Error::RouteNotFound(format!("{} {}", method, path)))
    }

    /// Compose the final response for a handler reply.
    ///
    /// Headers are layered so that later groups override earlier ones: CSP,
    /// CORS, hardening headers, content-type and cache-control, then the
    /// reply's own headers.
    pub fn create_response(&self, request: &HttpRequest, reply: Reply) -> Result<HttpResponse, Error> {
        self.compose(request, request.method().ok(), reply)
    }

    /// `method` is the request's effective method, `None` when it could not
    /// be determined.
    fn compose(
        &self,
        request: &HttpRequest,
        method: Option<HttpMethod>,
        reply: Reply,
    ) -> Result<HttpResponse, Error> {
        let Reply {
            content,
            status,
            headers,
            cookies,
        } = reply;

        let content_type = content.content_type();
        let status = if content.is_empty() {
            HttpStatus::NoContent
        } else {
            status.unwrap_or(HttpStatus::Ok)
        };

        let mut response = HttpResponse::new(status.code()).with_body(content.into_bytes()?);

        let csp = ContentSecurityPolicy::for_request(&self.config, request);
        response.set_header("content-security-policy", &csp.to_header_value())?;

        for (name, value) in cors_headers(&self.config.cors, request) {
            response.set_header(name, &value)?;
        }

        for (name, value) in HARDENING_HEADERS {
            response.set_header(name, value)?;
        }

        response.set_header("content-type", &format!("{}; charset=utf-8", content_type))?;
        let is_static_file = method.is_some_and(|method| is_static_file_path(method, request.path()));
        let cache_control = if self.config.cache.enabled && is_static_file {
            format!("max-age={}", self.config.cache.max_age_seconds())
        } else {
            "no-cache".to_string()
        };
        response.set_header("cache-control", &cache_control)?;

        for (name, value) in &headers {
            response.set_header(name, value)?;
        }

        let max_age = self.config.cookies.max_age_seconds();
        for (name, value) in &cookies {
            response.append_header(
                "set-cookie",
                &format!("{}={}; SameSite=Lax; Max-Age={}", name, value, max_age),
            )?;
        }

        Ok(response)
    }

    async fn create_static_file_response(
        &self,
        request: &HttpRequest,
        method: HttpMethod,
    ) -> Result<HttpResponse, Error> {
        let file = static_files::load(&self.config.static_files.root, request.path()).await?;

        let reply = Reply::from(file.bytes)
            .header("content-length", file.len.to_string())
            .header("content-type", file.content_type);
        self.compose(request, Some(method), reply)
    }

    async fn recover(&self, request: &HttpRequest, method: Option<HttpMethod>, error: Error) -> HttpResponse {
        let status = error.http_status();

        if error.is_http() {
            debug!(status = status.code(), error = %error, "Request ended with HTTP error");
            return self.abort_with(request, method, status).await;
        }

        error!(error = %error, path = request.path(), "Unhandled error while dispatching");
        if self.config.is_production {
            return self.abort_with(request, method, status).await;
        }

        match self.render_error_page(request, method, &error).await {
            Ok(response) => response,
            Err(render_error) => {
                warn!(error = %render_error, "Failed to render error page");
                self.abort_with(request, method, HttpStatus::InternalServerError).await
            }
        }
    }

    /// Minimal response for `status`.
    ///
    /// Uses the handler registered for `status`, then the default handler,
    /// then an empty body. The status is kept whatever the handler returns.
    pub async fn abort(&self, request: &HttpRequest, status: HttpStatus) -> HttpResponse {
        self.abort_with(request, request.method().ok(), status).await
    }

    async fn abort_with(
        &self,
        request: &HttpRequest,
        method: Option<HttpMethod>,
        status: HttpStatus,
    ) -> HttpResponse {
        let handler = {
            let handlers = self.error_handlers.read();
            handlers
                .get(&Some(status))
                .or_else(|| handlers.get(&None))
                .cloned()
        };

        let reply = match handler {
            Some(handler) => match AssertUnwindSafe(handler(status)).catch_unwind().await {
                Ok(Ok(reply)) => reply,
                Ok(Err(handler_error)) => {
                    warn!(status = status.code(), error = %handler_error, "Error handler failed");
                    Reply::empty()
                }
                Err(panic) => {
                    warn!(status = status.code(), error = %Error::from_panic(panic), "Error handler panicked");
                    Reply::empty()
                }
            },
            None => Reply::empty(),
        };

        match self.compose(request, method, reply) {
            Ok(mut response) => {
                response.status = status.code();
                response
            }
            Err(compose_error) => {
                warn!(error = %compose_error, "Failed to compose abort response");
                HttpResponse::new(status.code())
            }
        }
    }

    async fn render_error_page(
        &self,
        request: &HttpRequest,
        method: Option<HttpMethod>,
        error: &Error,
    ) -> Result<HttpResponse, Error> {
        let page = ErrorPage::from_error(error).await;
        let html = self.renderer.render(&page, request).await?;
        self.compose(request, method, Reply::html(html).status(HttpStatus::InternalServerError))
    }
}
