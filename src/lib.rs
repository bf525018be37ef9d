// Waymark - HTTP request routing and dispatch for Rust
//
// Routes are registered on a RouteCollection, optionally inside nested
// prefixed groups, then frozen into a Dispatcher that matches requests,
// runs middleware and invokes handlers.

// Re-export core functionality
pub use waymark_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use waymark_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        handler, BoxedHandler, Dispatcher, Error, Handler, HttpRequest, HttpResponse,
        MatchResult, Middleware, Next, Reply, Route, RouteCollection, RouteParams,
    };

    #[cfg(feature = "config")]
    pub use crate::waymark_config::{ConfigManager, Settings};

    pub use async_trait::async_trait;
}
