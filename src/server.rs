//! HTTP server and graceful shutdown.
//!
//! The server owns nothing but a listener and a frozen [`Routes`]. Each
//! connection runs in its own task; each request on it is converted into a
//! [`Request`], routed, and answered.
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection finish, and returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::matcher::Routes;
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// let server = waypost::Server::bind("0.0.0.0:3000")?;
    /// # Ok::<(), waypost::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        Ok(Self { addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts connections and routes every request through `routes` until
    /// a shutdown signal arrives and all in-flight connections have drained.
    pub async fn serve(self, routes: Routes) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_on(listener, routes, shutdown_signal()).await
    }

    /// Like [`serve`](Self::serve), on an already bound listener and with a
    /// caller-provided shutdown future.
    pub async fn serve_on(
        self,
        listener: TcpListener,
        routes: Routes,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let routes = Arc::new(routes);
        let local = listener.local_addr()?;
        info!(addr = %local, entries = routes.len(), "waypost listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops new accepts even when
                // more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let routes = Arc::clone(&routes);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let routes = Arc::clone(&routes);
                            async move { dispatch(&routes, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("waypost stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one hyper request. Every failure is turned into a response, so
/// hyper never sees an error.
async fn dispatch(
    routes: &Routes,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "reading request body failed: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_http());
        }
    };

    let request = into_request(parts, body, remote_addr);
    debug!(method = %request.method(), path = %request.path(), "dispatching");
    Ok(routes.call(request).await.into_http())
}

fn into_request(parts: http::request::Parts, body: Bytes, remote_addr: SocketAddr) -> Request {
    let mut request = Request::new(parts.method.as_str(), parts.uri.path()).with_body(body.to_vec());
    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(v) => request = request.with_header(name.as_str(), v),
            Err(_) => debug!(header = %name, "skipping non-ascii header"),
        }
    }
    if let Some(query) = parts.uri.query() {
        request.set_attribute("query", query);
    }
    request.set_attribute("remote_addr", remote_addr.to_string());
    request
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C only, off Unix).
///
/// A signal handler that cannot be installed is logged and its arm never
/// fires, so the server keeps running instead of stopping immediately.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
