use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use waymark_core::{
    handler, BoxedHandler, Dispatcher, Error, HttpRequest, HttpResponse, MatchResult,
    Middleware, Next, PathPattern, Reply, RouteCollection,
};

fn echo_params() -> BoxedHandler {
    handler(|req: HttpRequest| async move {
        let mut pairs: Vec<String> = req
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        pairs.sort();
        Ok::<_, Error>(HttpResponse::text(pairs.join("&")))
    })
}

#[tokio::test]
async fn test_static_route() {
    let mut routes = RouteCollection::new();
    routes
        .get("/hello", |_req: HttpRequest| async {
            Ok::<_, Error>(HttpResponse::ok().with_body(b"Hello, World!".to_vec()))
        })
        .unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    let response = dispatcher
        .dispatch(HttpRequest::new("GET", "/hello"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"Hello, World!");
}

#[tokio::test]
async fn test_post_with_parameter_and_query() {
    let mut routes = RouteCollection::new();
    routes
        .post("/users/{id}", |req: HttpRequest| async move {
            assert_eq!(req.param("id"), Some("42"));
            assert_eq!(req.query("x"), Some("1"));
            Ok::<_, Error>(HttpResponse::ok())
        })
        .unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    let response = dispatcher
        .dispatch(HttpRequest::new("POST", "/users/42?x=1"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_multiple_parameters() {
    let mut routes = RouteCollection::new();
    routes
        .get("/users/{user_id}/posts/{post_id}", echo_params())
        .unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    let response = dispatcher
        .dispatch(HttpRequest::new("GET", "/users/alice/posts/17"))
        .await
        .unwrap();

    assert_eq!(response.body_str(), Some("post_id=17&user_id=alice"));
}

#[tokio::test]
async fn test_route_params_overwrite_existing() {
    let mut routes = RouteCollection::new();
    routes.get("/things/{id}", echo_params()).unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    let mut request = HttpRequest::new("GET", "/things/new");
    request.params.insert("id".to_string(), "stale".to_string());
    request.params.insert("extra".to_string(), "kept".to_string());

    let response = dispatcher.dispatch(request).await.unwrap();
    assert_eq!(response.body_str(), Some("extra=kept&id=new"));
}

#[test]
fn test_substituted_paths_round_trip() {
    let templates = [
        "/users/{id}",
        "/a/{first}/b/{second}/c/{third}",
        "/{only}",
        "/api/v1/{resource_name}/items",
    ];
    let samples = ["alpha", "B2", "under_score", "123"];

    for template in templates {
        let pattern = PathPattern::compile(template).unwrap();
        let mut concrete = template.to_string();
        let mut expected = Vec::new();
        for (i, name) in pattern.names().iter().enumerate() {
            let value = samples[i % samples.len()];
            concrete = concrete.replace(&format!("{{{}}}", name), value);
            expected.push(value);
        }

        let params = pattern.captures(&concrete).unwrap();
        assert_eq!(params.values(), expected, "template {}", template);
    }
}

#[test]
fn test_trailing_slash_and_root() {
    let mut routes = RouteCollection::new();
    routes.get("/", echo_params()).unwrap();
    routes.get("/users", echo_params()).unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    for path in ["/users", "/users/", "/users//"] {
        assert!(dispatcher.match_route(path, "GET").is_found(), "{}", path);
    }
    match dispatcher.match_route("/", "GET") {
        MatchResult::Found { route, .. } => assert_eq!(route.path(), "/"),
        other => panic!("root not matched: {:?}", other),
    }
}

#[test]
fn test_first_match_wins() {
    let mut routes = RouteCollection::new();
    routes.get("/items/{id}", echo_params()).unwrap();
    routes.get("/items/special", echo_params()).unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    match dispatcher.match_route("/items/special", "GET") {
        MatchResult::Found { route, params } => {
            assert_eq!(route.path(), "/items/{id}");
            assert_eq!(params.get("id"), Some("special"));
        }
        other => panic!("expected a match, got {:?}", other),
    }
}

#[test]
fn test_matching_is_case_insensitive() {
    let mut routes = RouteCollection::new();
    routes.get("/Reports/{year}", echo_params()).unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    assert!(dispatcher.match_route("/reports/2024", "GET").is_found());
    assert!(dispatcher.match_route("/REPORTS/2024", "GET").is_found());
}

#[test]
fn test_placeholder_does_not_cross_segments() {
    let mut routes = RouteCollection::new();
    routes.get("/files/{name}", echo_params()).unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    assert!(!dispatcher.match_route("/files/a/b", "GET").is_found());
    assert!(!dispatcher.match_route("/files/report.pdf", "GET").is_found());
}

#[tokio::test]
async fn test_route_not_found() {
    let dispatcher = Dispatcher::new(RouteCollection::new()).unwrap();

    let result = dispatcher
        .dispatch(HttpRequest::new("GET", "/nonexistent/?page=1"))
        .await;

    match result {
        Err(Error::RouteNotFound { method, path }) => {
            assert_eq!(method, "GET");
            assert_eq!(path, "/nonexistent");
        }
        other => panic!("expected RouteNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_method_mismatch_is_not_found() {
    let mut routes = RouteCollection::new();
    routes.get("/only-get", echo_params()).unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    let result = dispatcher
        .dispatch(HttpRequest::new("DELETE", "/only-get"))
        .await;
    assert!(matches!(result, Err(Error::RouteNotFound { .. })));
}

#[tokio::test]
async fn test_plain_string_reply_is_rejected() {
    let mut routes = RouteCollection::new();
    routes
        .get("/greeting", |_req: HttpRequest| async {
            Ok::<_, Error>("hello".to_string())
        })
        .unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    let result = dispatcher
        .dispatch(HttpRequest::new("GET", "/greeting"))
        .await;

    match result {
        Err(Error::InvalidHandlerResult { method, path, kind }) => {
            assert_eq!(method, "GET");
            assert_eq!(path, "/greeting");
            assert_eq!(kind, "text");
        }
        other => panic!("expected InvalidHandlerResult, got {:?}", other),
    }
}

/// Answers with bare text instead of a response, skipping the handler.
struct TextShortCircuit;

#[async_trait]
impl Middleware for TextShortCircuit {
    async fn handle(&self, _req: HttpRequest, _next: Next) -> Result<Reply, Error> {
        Ok(Reply::Text("maintenance".to_string()))
    }
}

#[tokio::test]
async fn test_middleware_non_response_reply_is_rejected() {
    let handler_ran = Arc::new(AtomicBool::new(false));
    let flag = handler_ran.clone();

    let mut routes = RouteCollection::new();
    routes
        .get("/status/{code}/", move |_req: HttpRequest| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, Error>(HttpResponse::ok())
            }
        })
        .unwrap()
        .middleware(TextShortCircuit);
    let dispatcher = Dispatcher::new(routes).unwrap();

    let result = dispatcher
        .dispatch(HttpRequest::new("GET", "/status/503"))
        .await;

    match result {
        Err(Error::InvalidHandlerResult { method, path, kind }) => {
            assert_eq!(method, "GET");
            assert_eq!(path, "/status/{code}");
            assert_eq!(kind, "text");
        }
        other => panic!("expected InvalidHandlerResult, got {:?}", other),
    }
    assert!(!handler_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_handler_error_propagates_unchanged() {
    let mut routes = RouteCollection::new();
    routes
        .get("/secret", |_req: HttpRequest| async {
            Err::<HttpResponse, _>(Error::Unauthorized("token required".to_string()))
        })
        .unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    let err = dispatcher
        .dispatch(HttpRequest::new("GET", "/secret"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 401);
    assert_eq!(HttpResponse::from_error(&err).status, 401);
}

#[test]
fn test_malformed_template_fails_registration() {
    let mut routes = RouteCollection::new();
    let err = routes.get("/users/{user-id}", echo_params()).unwrap_err();
    assert!(matches!(err, Error::RouteCompilation { .. }));
    assert!(err.to_string().contains("/users/{user-id}"));
}

#[tokio::test]
async fn test_dispatcher_shared_across_tasks() {
    let mut routes = RouteCollection::new();
    routes.get("/n/{n}", echo_params()).unwrap();
    let dispatcher = Dispatcher::new(routes).unwrap();

    let mut tasks = Vec::new();
    for n in 0..8 {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            dispatcher
                .dispatch(HttpRequest::new("GET", format!("/n/{}", n)))
                .await
                .map(|r| r.body_str().map(str::to_string))
        }));
    }

    for (n, task) in tasks.into_iter().enumerate() {
        let body = task.await.unwrap().unwrap();
        assert_eq!(body, Some(format!("n={}", n)));
    }
}
