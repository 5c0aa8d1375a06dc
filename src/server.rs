//! Listener, accept loop, and graceful shutdown.
//!
//! # Connection lifecycle
//!
//! 1. hyper serves the connection through a [`Gate`], which lets each
//!    request head through only after checking it.
//! 2. Every request hyper sees is answered with `ok`, keep-alive included.
//! 3. At the first malformed head the gate reports EOF; hyper flushes what
//!    it owes and stops, then the raw 400 line is written and the
//!    connection closed.
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection task finish, then returns from [`Server::serve`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::error::Error;
use crate::gate::Gate;
use crate::handler::{handle_client_error, handle_request};

/// A bound listener, ready to serve.
///
/// Binding happens in [`Server::bind`], so a taken port is reported before
/// any serving starts.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
}

impl Server {
    /// Binds a listener on `addr` and logs the startup line.
    ///
    /// Fails with [`Error::Bind`] if the operating system refuses the
    /// address. There is no retry.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), oksrv::Error> {
    /// let server = oksrv::Server::bind(([0, 0, 0, 0], oksrv::PORT)).await?;
    /// server.serve().await
    /// # }
    /// ```
    pub async fn bind(addr: impl Into<SocketAddr>) -> Result<Self, Error> {
        let addr = addr.into();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let addr = listener.local_addr()?;

        info!(%addr, "Server listening on port {}", addr.port());

        Ok(Self { listener, addr })
    }

    /// The address actually bound. Differs from the requested one when port
    /// `0` was asked for.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves until SIGTERM or Ctrl-C, then drains in-flight connections.
    pub async fn serve(self) -> Result<(), Error> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then drains in-flight connections.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even with connections still queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };
                    tasks.spawn(serve_connection(stream, peer));
                }

                // Reap finished tasks so the set does not grow without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!(addr = %self.addr, "server stopped");
        Ok(())
    }
}

async fn serve_connection(mut stream: TcpStream, peer: SocketAddr) {
    let rejected = AtomicBool::new(false);
    let io = TokioIo::new(Gate::new(&mut stream, &rejected));

    // half_close: the gate's EOF must not cancel a response still owed.
    if let Err(e) = http1::Builder::new()
        .half_close(true)
        .serve_connection(io, service_fn(handle_request::<Incoming>))
        .await
    {
        debug!(%peer, "connection error: {e}");
    }

    if rejected.load(Ordering::Relaxed) {
        debug!(%peer, "malformed request, answering 400");
        handle_client_error(stream).await;
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM (Unix) or SIGINT the process receives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
