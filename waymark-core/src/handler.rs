// Route handler abstraction
//
// Handlers are async functions (or types implementing `Handler`) that take
// the derived request and produce a `Reply`. Anything convertible into a
// `Reply` may be returned; the dispatcher decides whether the reply is an
// acceptable response.

use crate::{Error, HttpRequest, Reply};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Future returned by every handler and middleware link.
pub type HandlerFuture = BoxFuture<Result<Reply, Error>>;

/// A handler that can process HTTP requests.
///
/// Implement this directly for stateful handlers; plain async functions
/// are adapted through [`IntoHandler`].
///
/// # Example
///
/// ```
/// use waymark_core::{BoxedHandler, Handler, HandlerFuture, HttpRequest, HttpResponse};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl Handler for Greeter {
///     fn call(&self, _req: HttpRequest) -> HandlerFuture {
///         let body = self.greeting.clone();
///         Box::pin(async move { Ok(HttpResponse::text(body).into()) })
///     }
/// }
///
/// let handler = BoxedHandler::new(Greeter { greeting: "hi".into() });
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: HttpRequest) -> HandlerFuture;
}

/// Conversion of async functions into type-erased handlers.
///
/// `Args` only disambiguates the blanket implementations; callers never
/// name it.
pub trait IntoHandler<Args>: Send + Sync + 'static {
    fn into_handler(self) -> BoxedHandler;
}

/// Adapter from `async fn(HttpRequest) -> Result<R, Error>` where
/// `R: Into<Reply>`.
pub struct FnHandler<F, R> {
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<F, R> FnHandler<F, R> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, Fut, R> Handler for FnHandler<F, R>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    fn call(&self, req: HttpRequest) -> HandlerFuture {
        let fut = (self.f)(req);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

impl<F, Fut, R> IntoHandler<(HttpRequest, R)> for F
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    fn into_handler(self) -> BoxedHandler {
        BoxedHandler::new(FnHandler::new(self))
    }
}

impl IntoHandler<BoxedHandler> for BoxedHandler {
    fn into_handler(self) -> BoxedHandler {
        self
    }
}

/// Type-erased handler stored on a [`Route`](crate::Route).
///
/// Cloning only bumps a reference count.
#[derive(Clone)]
pub struct BoxedHandler {
    inner: Arc<dyn Handler>,
}

impl BoxedHandler {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    pub fn call(&self, req: HttpRequest) -> HandlerFuture {
        self.inner.call(req)
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedHandler")
    }
}

/// Create a boxed handler from an async function.
///
/// ```
/// use waymark_core::{handler, Error, HttpRequest, HttpResponse};
///
/// async fn health(_req: HttpRequest) -> Result<HttpResponse, Error> {
///     Ok(HttpResponse::ok())
/// }
///
/// let h = handler(health);
/// ```
pub fn handler<H, Args>(h: H) -> BoxedHandler
where
    H: IntoHandler<Args>,
{
    h.into_handler()
}
