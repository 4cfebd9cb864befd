//! Handler trait and type erasure.
//!
//! Locations of every tier are stored side by side, so their handlers must
//! share one type. Any `async fn(Request) -> impl IntoResponse` is accepted
//! and erased behind [`BoxedHandler`]:
//!
//! ```text
//! async fn page(req: Request) -> Response { … }     ← user writes this
//!        ↓ table.location("/page", opts, page)
//! page.into_boxed_handler()                         ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(page))                         ← BoxedHandler
//!        ↓
//! handler.call(req)  once the matcher picks it      ← one vtable dispatch
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of
/// [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared by every request that resolves to it.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid location handler.
///
/// Sealed: it is satisfied by any function of the shape
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and cannot be implemented by hand. Whether a value can serve as a handler
/// is therefore decided when the program is compiled, never at registration.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn echo_path(req: Request) -> String {
        req.path().to_owned()
    }

    #[tokio::test]
    async fn erased_handler_converts_output() {
        let handler = echo_path.into_boxed_handler();
        let res = handler.call(Request::get("/hello")).await;
        assert_eq!(res.body(), b"/hello");
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let handler = (|_req: Request| async { http::StatusCode::ACCEPTED }).into_boxed_handler();
        let res = handler.call(Request::get("/")).await;
        assert_eq!(res.status_code(), http::StatusCode::ACCEPTED);
    }
}
