//! Route registration and prefixed groups
//!
//! A [`RouteCollection`] accumulates routes under a path prefix. Nested
//! groups are declared with [`RouteCollection::route_group`]; their
//! bodies are stored and only run by [`RouteCollection::resolve_groups`],
//! so middleware attached to the parent after the group was declared is
//! still inherited by every route inside it.
//!
//! # Examples
//!
//! ```
//! use waymark_core::{Error, HttpRequest, HttpResponse, RouteCollection};
//!
//! async fn ping(_req: HttpRequest) -> Result<HttpResponse, Error> {
//!     Ok(HttpResponse::text("pong"))
//! }
//!
//! let mut routes = RouteCollection::new();
//! routes.route_group("/api", |api| {
//!     api.route_group("/v1", |v1| {
//!         v1.get("/ping", ping)?;
//!         Ok(())
//!     });
//!     Ok(())
//! });
//! routes.resolve_groups().unwrap();
//!
//! let registered = routes.routes("GET");
//! assert_eq!(registered[0].path(), "/api/v1/ping");
//! ```

use crate::logging::debug;
use crate::pattern::normalize_path;
use crate::{Error, IntoHandler, Middleware, PathPattern, Route};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Deferred group body.
pub type GroupDefinition = Box<dyn FnOnce(&mut RouteCollection) -> Result<(), Error> + Send>;

/// A declared but not yet resolved route group.
struct PendingGroup {
    collection: RouteCollection,
    definition: GroupDefinition,
}

/// Routes indexed by method, registered under a common prefix.
#[derive(Default)]
pub struct RouteCollection {
    prefix: String,
    routes: HashMap<String, Vec<Route>>,
    pending: Vec<PendingGroup>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl RouteCollection {
    /// Create a collection rooted at `/`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection whose routes all live under `prefix`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            ..Self::default()
        }
    }

    /// Normalized prefix; empty for the root.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register a route.
    ///
    /// The method is trimmed and upper-cased, the path is joined onto the
    /// collection prefix and compiled. The collection's current
    /// middleware list is copied onto the route; middleware added to the
    /// collection afterwards does not reach it. The returned reference
    /// allows per-route middleware to be appended.
    pub fn route<H, Args>(&mut self, method: &str, path: &str, handler: H) -> Result<&mut Route, Error>
    where
        H: IntoHandler<Args>,
    {
        let method = method.trim().to_uppercase();
        let full_path = join_paths(&self.prefix, path);
        let pattern = PathPattern::compile(&full_path)?;

        debug!(
            method = %method,
            path = %full_path,
            params = pattern.names().len(),
            middleware = self.middleware.len(),
            "Registering route"
        );

        let route = Route::new(
            method.clone(),
            full_path,
            pattern,
            handler.into_handler(),
            self.middleware.clone(),
        );

        let bucket = self.routes.entry(method).or_default();
        bucket.push(route);
        let index = bucket.len() - 1;
        Ok(&mut bucket[index])
    }

    pub fn get<H, Args>(&mut self, path: &str, handler: H) -> Result<&mut Route, Error>
    where
        H: IntoHandler<Args>,
    {
        self.route("GET", path, handler)
    }

    pub fn post<H, Args>(&mut self, path: &str, handler: H) -> Result<&mut Route, Error>
    where
        H: IntoHandler<Args>,
    {
        self.route("POST", path, handler)
    }

    pub fn put<H, Args>(&mut self, path: &str, handler: H) -> Result<&mut Route, Error>
    where
        H: IntoHandler<Args>,
    {
        self.route("PUT", path, handler)
    }

    pub fn patch<H, Args>(&mut self, path: &str, handler: H) -> Result<&mut Route, Error>
    where
        H: IntoHandler<Args>,
    {
        self.route("PATCH", path, handler)
    }

    pub fn delete<H, Args>(&mut self, path: &str, handler: H) -> Result<&mut Route, Error>
    where
        H: IntoHandler<Args>,
    {
        self.route("DELETE", path, handler)
    }

    pub fn head<H, Args>(&mut self, path: &str, handler: H) -> Result<&mut Route, Error>
    where
        H: IntoHandler<Args>,
    {
        self.route("HEAD", path, handler)
    }

    pub fn options<H, Args>(&mut self, path: &str, handler: H) -> Result<&mut Route, Error>
    where
        H: IntoHandler<Args>,
    {
        self.route("OPTIONS", path, handler)
    }

    /// Declare a nested group under `sub_prefix`.
    ///
    /// `definition` is not run here. It is stored together with the
    /// child collection and executed by [`resolve_groups`](Self::resolve_groups).
    /// The child is returned so group-level middleware can be attached
    /// beforehand.
    pub fn route_group<F>(&mut self, sub_prefix: &str, definition: F) -> &mut RouteCollection
    where
        F: FnOnce(&mut RouteCollection) -> Result<(), Error> + Send + 'static,
    {
        let prefix = normalize_prefix(&join_paths(&self.prefix, sub_prefix));
        debug!(prefix = %prefix, "Declaring route group");

        self.pending.push(PendingGroup {
            collection: RouteCollection {
                prefix,
                ..RouteCollection::default()
            },
            definition: Box::new(definition),
        });
        let index = self.pending.len() - 1;
        &mut self.pending[index].collection
    }

    /// Run every pending group definition and merge its routes.
    ///
    /// Groups resolve in declaration order. Each child first inherits the
    /// parent's current middleware ahead of its own, then runs its
    /// definition, then resolves its own groups. The child's routes are
    /// appended after the parent's in every method bucket. Once nothing is
    /// pending this is a no-op.
    ///
    /// The first failing definition aborts resolution. Groups resolved
    /// before it stay merged, the failing group is dropped with any routes
    /// it registered, and the groups declared after it remain pending.
    pub fn resolve_groups(&mut self) -> Result<(), Error> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut pending = std::mem::take(&mut self.pending).into_iter();
        debug!(
            prefix = %self.prefix,
            groups = pending.len(),
            "Resolving route groups"
        );

        while let Some(PendingGroup {
            mut collection,
            definition,
        }) = pending.next()
        {
            let mut inherited = self.middleware.clone();
            inherited.append(&mut collection.middleware);
            collection.middleware = inherited;

            let resolved = definition(&mut collection).and_then(|()| collection.resolve_groups());
            if let Err(err) = resolved {
                self.pending = pending.collect();
                return Err(err);
            }
            self.absorb(collection);
        }

        Ok(())
    }

    fn absorb(&mut self, child: RouteCollection) {
        for (method, routes) in child.routes {
            self.routes.entry(method).or_default().extend(routes);
        }
    }

    /// Append middleware to the collection, keeping order.
    pub fn with_middleware(&mut self, middleware: Vec<Arc<dyn Middleware>>) -> &mut Self {
        self.middleware.extend(middleware);
        self
    }

    /// Append one middleware to the collection.
    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn clear_middleware(&mut self) -> &mut Self {
        self.middleware.clear();
        self
    }

    pub fn middleware_list(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Routes registered for `method`, in registration order.
    pub fn routes(&self, method: &str) -> &[Route] {
        self.routes.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Methods with at least one route, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    pub fn pending_groups(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn into_routes(self) -> HashMap<String, Vec<Route>> {
        self.routes
    }
}

impl fmt::Debug for RouteCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteCollection")
            .field("prefix", &self.prefix)
            .field("routes", &self.route_count())
            .field("pending", &self.pending.len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Prefixes are stored without the root slash so they can be joined
/// directly: `/` becomes the empty string.
fn normalize_prefix(prefix: &str) -> String {
    let normalized = normalize_path(prefix);
    if normalized == "/" {
        String::new()
    } else {
        normalized
    }
}

fn join_paths(prefix: &str, path: &str) -> String {
    let path = normalize_path(path);
    match (prefix.is_empty(), path == "/") {
        (true, _) => path,
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}{}", prefix, path),
    }
}
