// Middleware system for request/response processing

use crate::logging::{debug, error, info, trace};
use crate::{BoxedHandler, Error, HandlerFuture, HttpRequest, Reply};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// The remainder of the chain: the following middleware, or the route
/// handler once every middleware has run.
///
/// Takes the (possibly modified) request by value and can be invoked at
/// most once.
pub type Next = Box<dyn FnOnce(HttpRequest) -> HandlerFuture + Send>;

/// A composable request interceptor.
///
/// An implementation may pass the request through (`next(req).await`),
/// post-process the reply returned by `next`, or return its own reply
/// without calling `next` at all, in which case neither the downstream
/// middleware nor the handler run. Errors propagate unchanged.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use waymark_core::{Error, HttpRequest, HttpResponse, Middleware, Next, Reply};
///
/// struct RequireToken;
///
/// #[async_trait]
/// impl Middleware for RequireToken {
///     async fn handle(&self, req: HttpRequest, next: Next) -> Result<Reply, Error> {
///         if req.header("authorization").is_none() {
///             return Ok(HttpResponse::new(401).into());
///         }
///         next(req).await
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<Reply, Error>;
}

/// Ordered middleware list wrapped around a handler.
///
/// The first middleware is the outermost link. Cloning is cheap; the list
/// is shared and copied only when a clone is extended.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_list(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            middlewares: Arc::new(middlewares),
        }
    }

    /// Add a middleware to the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.push(Arc::new(middleware));
    }

    /// Append an already shared middleware to the end of the chain.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        Arc::make_mut(&mut self.middlewares).push(middleware);
    }

    pub fn extend(&mut self, middlewares: impl IntoIterator<Item = Arc<dyn Middleware>>) {
        Arc::make_mut(&mut self.middlewares).extend(middlewares);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the middleware chain with a handler
    pub async fn apply(&self, req: HttpRequest, handler: BoxedHandler) -> Result<Reply, Error> {
        debug!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );
        self.execute_from(0, req, handler).await
    }

    fn execute_from(&self, index: usize, req: HttpRequest, handler: BoxedHandler) -> HandlerFuture {
        if index >= self.middlewares.len() {
            trace!("Middleware chain complete, calling handler");
            return handler.call(req);
        }

        let middleware = self.middlewares[index].clone();
        let chain = self.clone();

        trace!(middleware_index = index, "Executing middleware");
        Box::pin(async move {
            middleware
                .handle(
                    req,
                    Box::new(move |req| chain.execute_from(index + 1, req, handler)),
                )
                .await
        })
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middlewares.len())
            .finish()
    }
}

// ========== Built-in Middleware ==========

/// Request ID middleware
///
/// Reuses the incoming request id header or generates a UUID v4, forwards
/// it on the request and echoes it on the response.
pub struct RequestIdMiddleware {
    header: String,
}

impl RequestIdMiddleware {
    pub fn new() -> Self {
        Self::with_header("X-Request-Id")
    }

    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RequestIdMiddleware {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<Reply, Error> {
        let request_id = req
            .headers
            .get(&self.header)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        req.headers.insert(self.header.clone(), request_id.clone());

        let mut reply = next(req).await?;
        if let Some(response) = reply.response_mut() {
            response.headers.insert(self.header.clone(), request_id);
        }
        Ok(reply)
    }
}

/// Body size limit middleware
pub struct BodySizeLimitMiddleware {
    max_size: usize,
}

impl BodySizeLimitMiddleware {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[async_trait]
impl Middleware for BodySizeLimitMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<Reply, Error> {
        if req.body.len() > self.max_size {
            return Err(Error::PayloadTooLarge(format!(
                "Request body exceeds maximum size of {} bytes",
                self.max_size
            )));
        }

        next(req).await
    }
}

/// HTTP access logging middleware
///
/// Logs method, path, status and duration of every request that passes
/// through it, optionally with a preview of the request body.
pub struct LoggingMiddleware {
    pub log_request_body: bool,
    pub max_body_size: usize,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self {
            log_request_body: false,
            max_body_size: 1024,
        }
    }

    pub fn with_request_body(mut self, enable: bool) -> Self {
        self.log_request_body = enable;
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    fn preview(&self, body: &[u8]) -> String {
        if body.len() > self.max_body_size {
            format!(
                "{}... ({} bytes)",
                String::from_utf8_lossy(&body[..self.max_body_size]),
                body.len()
            )
        } else {
            String::from_utf8_lossy(body).to_string()
        }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<Reply, Error> {
        let start = std::time::Instant::now();
        let method = req.method.clone();
        let path = req.path.clone();

        if self.log_request_body && !req.body.is_empty() {
            info!(
                method = %method,
                path = %path,
                body = %self.preview(&req.body),
                "HTTP request received"
            );
        } else {
            info!(method = %method, path = %path, "HTTP request received");
        }

        let result = next(req).await;
        let duration = start.elapsed();

        match &result {
            Ok(Reply::Response(response)) => {
                info!(
                    method = %method,
                    path = %path,
                    status = response.status,
                    duration_ms = duration.as_millis() as u64,
                    "HTTP response sent"
                );
            }
            Ok(other) => {
                info!(
                    method = %method,
                    path = %path,
                    reply = other.kind(),
                    duration_ms = duration.as_millis() as u64,
                    "Handler returned a non-response reply"
                );
            }
            Err(err) => {
                error!(
                    method = %method,
                    path = %path,
                    duration_ms = duration.as_millis() as u64,
                    error = %err,
                    "HTTP request failed"
                );
            }
        }

        result
    }
}
