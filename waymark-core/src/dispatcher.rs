// Request matching and dispatch

use crate::logging::{debug, trace, warn};
use crate::{Error, HttpRequest, HttpResponse, Route, RouteCollection, RouteParams};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Frozen method → routes snapshot.
///
/// Built once from a resolved [`RouteCollection`]; never mutated while
/// requests are served.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<String, Vec<Arc<Route>>>,
}

impl RouteTable {
    fn from_collection(collection: RouteCollection) -> Self {
        let routes = collection
            .into_routes()
            .into_iter()
            .map(|(method, routes)| (method, routes.into_iter().map(Arc::new).collect()))
            .collect();
        Self { routes }
    }

    /// Routes for an exact, case-sensitive method, in registration order.
    pub fn routes(&self, method: &str) -> &[Arc<Route>] {
        self.routes.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of [`Dispatcher::match_route`].
#[derive(Debug, Clone)]
pub enum MatchResult {
    Found {
        route: Arc<Route>,
        params: RouteParams,
    },
    NotFound {
        method: String,
        path: String,
    },
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found { .. })
    }
}

/// Matches requests against a frozen route table and runs the matched
/// route's middleware and handler.
///
/// Cloning is cheap; all clones share the same table.
///
/// # Examples
///
/// ```
/// use waymark_core::{Dispatcher, Error, HttpRequest, HttpResponse, RouteCollection};
///
/// async fn show(req: HttpRequest) -> Result<HttpResponse, Error> {
///     Ok(HttpResponse::text(format!("user {}", req.param("id").unwrap_or("?"))))
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut routes = RouteCollection::new();
/// routes.get("/users/{id}", show).unwrap();
///
/// let dispatcher = Dispatcher::new(routes).unwrap();
/// let response = dispatcher
///     .dispatch(HttpRequest::new("GET", "/users/42/"))
///     .await
///     .unwrap();
/// assert_eq!(response.body_str(), Some("user 42"));
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
}

impl Dispatcher {
    /// Resolve pending groups and freeze the collection.
    pub fn new(mut collection: RouteCollection) -> Result<Self, Error> {
        collection.resolve_groups()?;
        let table = RouteTable::from_collection(collection);
        debug!(routes = table.len(), "Route table frozen");
        Ok(Self {
            table: Arc::new(table),
        })
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Find the first route for `method` whose pattern matches `path`.
    ///
    /// The query and fragment are dropped, the path is percent-decoded
    /// and trailing slashes and backslashes are removed (the root stays
    /// `/`). Routes are tried in registration order.
    pub fn match_route(&self, path: &str, method: &str) -> MatchResult {
        let path = normalize_request_path(path);

        for route in self.table.routes(method) {
            if let Some(params) = route.pattern().captures(&path) {
                debug!(
                    method = %method,
                    path = %path,
                    route = %route.path(),
                    "Route matched"
                );
                return MatchResult::Found {
                    route: route.clone(),
                    params,
                };
            }
        }

        debug!(method = %method, path = %path, "No route matched");
        MatchResult::NotFound {
            method: method.to_string(),
            path,
        }
    }

    /// Match the request, run the route's middleware chain and handler,
    /// and validate the reply.
    ///
    /// Path parameters are merged into `request.params`, overwriting
    /// existing keys. The query string is parsed into
    /// `request.query_params` unless the caller already filled it.
    pub async fn dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let (route, params) = match self.match_route(&request.path, &request.method) {
            MatchResult::Found { route, params } => (route, params),
            MatchResult::NotFound { method, path } => {
                return Err(Error::RouteNotFound { method, path });
            }
        };

        params.merge_into(&mut request.params);
        if request.query_params.is_empty() {
            if let Some(query) = query_string(&request.path) {
                request.query_params = parse_query(query);
            }
        }

        trace!(
            route = %route.path(),
            params = params.len(),
            middleware = route.middleware_list().len(),
            "Dispatching request"
        );

        let reply = route.chain().apply(request, route.handler().clone()).await?;

        reply.into_response().map_err(|other| {
            warn!(
                method = %route.method(),
                route = %route.path(),
                kind = other.kind(),
                "Handler returned a non-response reply"
            );
            Error::InvalidHandlerResult {
                method: route.method().to_string(),
                path: route.path().to_string(),
                kind: other.kind(),
            }
        })
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.table.len())
            .finish()
    }
}

/// Strip query and fragment, percent-decode, and drop trailing `/` and `\`.
pub fn normalize_request_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let decoded = urlencoding::decode_binary(raw[..end].as_bytes());
    let decoded = String::from_utf8_lossy(&decoded).into_owned();

    let trimmed = decoded.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

// Everything after the first '#' is fragment, even a later '?'.
fn query_string(raw: &str) -> Option<&str> {
    let before_fragment = raw.split('#').next().unwrap_or(raw);
    let (_, query) = before_fragment.split_once('?')?;
    Some(query).filter(|q| !q.is_empty())
}

fn parse_query(query: &str) -> HashMap<String, String> {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(err) => {
            debug!(query = %query, error = %err, "Ignoring malformed query string");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler, BoxedHandler};

    fn ok() -> BoxedHandler {
        handler(|_req: HttpRequest| async { Ok::<_, Error>(HttpResponse::ok()) })
    }

    fn dispatcher() -> Dispatcher {
        let mut routes = RouteCollection::new();
        routes.get("/", ok()).unwrap();
        routes.get("/users", ok()).unwrap();
        routes.get("/users/{id}", ok()).unwrap();
        routes.get("/items/{id}", ok()).unwrap();
        routes.get("/items/special", ok()).unwrap();
        routes.post("/users/{id}", ok()).unwrap();
        Dispatcher::new(routes).unwrap()
    }

    #[test]
    fn test_normalize_request_path() {
        assert_eq!(normalize_request_path("/"), "/");
        assert_eq!(normalize_request_path(""), "/");
        assert_eq!(normalize_request_path("/users/"), "/users");
        assert_eq!(normalize_request_path("/users\\"), "/users");
        assert_eq!(normalize_request_path("/users?page=2#top"), "/users");
        assert_eq!(normalize_request_path("/a%20b"), "/a b");
        assert_eq!(normalize_request_path("/a+b"), "/a+b");
        assert_eq!(normalize_request_path("//"), "/");
    }

    #[test]
    fn test_query_string() {
        assert_eq!(query_string("/x?a=1&b=2#frag"), Some("a=1&b=2"));
        assert_eq!(query_string("/x?"), None);
        assert_eq!(query_string("/x"), None);
        assert_eq!(query_string("/x#frag?a=1"), None);
        assert_eq!(query_string("/x?a=1#frag?b=2"), Some("a=1"));
    }

    #[test]
    fn test_parse_query() {
        let parsed = parse_query("a=1&b=two%20words&c=x+y");
        assert_eq!(parsed.get("a").map(String::as_str), Some("1"));
        assert_eq!(parsed.get("b").map(String::as_str), Some("two words"));
        assert_eq!(parsed.get("c").map(String::as_str), Some("x y"));
    }

    #[test]
    fn test_trailing_slash_matches() {
        let d = dispatcher();
        assert!(d.match_route("/users/", "GET").is_found());
        assert!(d.match_route("/users", "GET").is_found());
        assert!(d.match_route("/", "GET").is_found());
    }

    #[test]
    fn test_first_match_wins() {
        let d = dispatcher();
        match d.match_route("/items/special", "GET") {
            MatchResult::Found { route, params } => {
                assert_eq!(route.path(), "/items/{id}");
                assert_eq!(params.get("id"), Some("special"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_method_is_case_sensitive() {
        let d = dispatcher();
        assert!(d.match_route("/users", "GET").is_found());
        assert!(!d.match_route("/users", "get").is_found());
        assert!(!d.match_route("/users", "BREW").is_found());
    }

    #[test]
    fn test_not_found_carries_normalized_path() {
        let d = dispatcher();
        match d.match_route("/missing/?q=1", "GET") {
            MatchResult::NotFound { method, path } => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/missing");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_percent_decoded_parameter() {
        let d = dispatcher();
        match d.match_route("/users/%41bc", "GET") {
            MatchResult::Found { params, .. } => assert_eq!(params.get("id"), Some("Abc")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_fills_params_and_query() {
        let mut routes = RouteCollection::new();
        routes
            .get("/users/{id}", |req: HttpRequest| async move {
                let body = format!(
                    "{}:{}",
                    req.param("id").unwrap_or_default(),
                    req.query("tab").unwrap_or_default()
                );
                Ok::<_, Error>(HttpResponse::text(body))
            })
            .unwrap();
        let d = Dispatcher::new(routes).unwrap();

        let response = d
            .dispatch(HttpRequest::new("GET", "/users/7?tab=posts"))
            .await
            .unwrap();
        assert_eq!(response.body_str(), Some("7:posts"));
    }

    #[tokio::test]
    async fn test_dispatch_keeps_caller_query_params() {
        let mut routes = RouteCollection::new();
        routes
            .get("/q", |req: HttpRequest| async move {
                Ok::<_, Error>(HttpResponse::text(req.query("a").unwrap_or_default().to_string()))
            })
            .unwrap();
        let d = Dispatcher::new(routes).unwrap();

        let mut req = HttpRequest::new("GET", "/q?a=from-url");
        req.query_params.insert("a".to_string(), "preset".to_string());
        let response = d.dispatch(req).await.unwrap();
        assert_eq!(response.body_str(), Some("preset"));
    }

    #[tokio::test]
    async fn test_dispatch_ignores_query_inside_fragment() {
        let mut routes = RouteCollection::new();
        routes
            .get("/x", |req: HttpRequest| async move {
                Ok::<_, Error>(HttpResponse::text(req.query_params.len().to_string()))
            })
            .unwrap();
        let d = Dispatcher::new(routes).unwrap();

        let response = d
            .dispatch(HttpRequest::new("GET", "/x#frag?a=1"))
            .await
            .unwrap();
        assert_eq!(response.body_str(), Some("0"));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_non_response() {
        let mut routes = RouteCollection::new();
        routes
            .get("/json/{id}", |_req: HttpRequest| async {
                Ok::<_, Error>(serde_json::json!({"raw": true}))
            })
            .unwrap();
        let d = Dispatcher::new(routes).unwrap();

        match d.dispatch(HttpRequest::new("GET", "/json/1")).await {
            Err(Error::InvalidHandlerResult { method, path, kind }) => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/json/{id}");
                assert_eq!(kind, "json");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_not_found() {
        let d = dispatcher();
        let result = d.dispatch(HttpRequest::new("PUT", "/users/1")).await;
        assert!(matches!(
            result,
            Err(Error::RouteNotFound { ref method, ref path }) if method == "PUT" && path == "/users/1"
        ));
    }

    #[test]
    fn test_dispatcher_is_send_sync_clone() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<Dispatcher>();

        let d = dispatcher();
        let clone = d.clone();
        assert_eq!(clone.table().len(), d.table().len());
        assert_eq!(d.table().routes("POST").len(), 1);
    }
}
