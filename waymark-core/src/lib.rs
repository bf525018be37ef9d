// Core library for the Waymark router
// Route registration, path-pattern matching, middleware chaining and dispatch

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod headers;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod pattern;
pub mod route;
pub mod route_collection;
pub mod route_params;
pub mod status;

pub use dispatcher::{normalize_request_path, Dispatcher, MatchResult, RouteTable};
pub use error::*;
pub use handler::*;
pub use headers::*;
pub use http::*;
pub use middleware::*;
pub use pattern::{normalize_path, PathPattern};
pub use route::Route;
pub use route_collection::{GroupDefinition, RouteCollection};
pub use route_params::RouteParams;
pub use status::*;
