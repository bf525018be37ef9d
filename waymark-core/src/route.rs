// A single registered route

use crate::{BoxedHandler, Middleware, MiddlewareChain, PathPattern};
use std::fmt;
use std::sync::Arc;

/// Method, compiled path and handler, plus the middleware that wraps the
/// handler for this route only.
///
/// Routes are created by [`RouteCollection::route`](crate::RouteCollection::route);
/// the middleware list can be extended through the returned `&mut Route`
/// until the collection is handed to a [`Dispatcher`](crate::Dispatcher).
pub struct Route {
    method: String,
    path: String,
    pattern: PathPattern,
    handler: BoxedHandler,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Route {
    pub(crate) fn new(
        method: String,
        path: String,
        pattern: PathPattern,
        handler: BoxedHandler,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        Self {
            method,
            path,
            pattern,
            handler,
            middleware,
        }
    }

    /// Upper-cased HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The collection prefix joined with the registered path, normalized
    /// (`/users/{id}/` is stored as `/users/{id}`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    pub fn middleware_list(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Append one middleware after any inherited from the collection.
    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append several shared middleware, keeping their order.
    pub fn with_middleware(
        &mut self,
        middleware: impl IntoIterator<Item = Arc<dyn Middleware>>,
    ) -> &mut Self {
        self.middleware.extend(middleware);
        self
    }

    /// Chain executor for this route's middleware.
    pub fn chain(&self) -> MiddlewareChain {
        MiddlewareChain::from_list(self.middleware.clone())
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("pattern", &self.pattern.path())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
