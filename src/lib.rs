//! # oksrv
//!
//! A fixed-response HTTP/1.1 server for test harnesses. Every request gets
//! `200 OK`, `content-type: text/plain`, body `ok`. Bytes that are not HTTP
//! get `HTTP/1.1 400 Bad Request\r\n\r\n` and a closed connection.
//!
//! ## The contract
//!
//! | Input | Output |
//! |---|---|
//! | any well-formed request, any method, path, headers, body | `200`, `text/plain`, `ok` |
//! | bytes that cannot be an HTTP/1.x request head | raw `HTTP/1.1 400 Bad Request\r\n\r\n`, then close |
//!
//! There is nothing to configure. The `oksrv` binary listens on
//! [`PORT`] (8000) and a second instance on the same port fails to start.
//!
//! ## Embedding in tests
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), oksrv::Error> {
//! let server = oksrv::Server::bind(([127, 0, 0, 1], 0)).await?;
//! let addr = server.local_addr();
//! let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
//!
//! let task = tokio::spawn(server.serve_with_shutdown(async move {
//!     let _ = stopped.await;
//! }));
//!
//! // ... point the code under test at `addr` ...
//! # let _ = addr;
//!
//! let _ = stop.send(());
//! task.await.expect("server task panicked")?;
//! # Ok(())
//! # }
//! ```

mod error;
mod gate;
mod handler;
mod head;
mod response;
mod server;

pub use error::Error;
pub use handler::{handle_client_error, handle_request};
pub use response::{BAD_REQUEST, OK_BODY, OK_CONTENT_TYPE};
pub use server::Server;

/// The port the `oksrv` binary listens on.
pub const PORT: u16 = 8000;
