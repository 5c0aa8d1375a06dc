//! Per-request and per-connection handling.
//!
//! | Trigger | Operation | Wire result |
//! |---|---|---|
//! | well-formed request | [`handle_request`] | `200`, `text/plain`, `ok` |
//! | unparseable bytes | [`handle_client_error`] | `HTTP/1.1 400 Bad Request\r\n\r\n`, close |

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::response::{self, BAD_REQUEST};

/// How long a rejected connection is drained after the 400 line is sent.
const LINGER: Duration = Duration::from_secs(1);

/// Answers any request with `200 OK` and body `ok`.
///
/// Method, path, query, headers and body are never looked at. The error type
/// is [`Infallible`]: there is no request this handler refuses.
pub async fn handle_request<B>(
    _req: http::Request<B>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    Ok(response::ok())
}

/// Writes the raw 400 line to `stream` and closes it.
///
/// Failures are logged at `debug` and otherwise ignored; they concern one
/// misbehaving client only.
pub async fn handle_client_error<S>(mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = stream.write_all(BAD_REQUEST).await {
        debug!("failed to write 400: {e}");
        return;
    }
    if let Err(e) = stream.shutdown().await {
        debug!("failed to close rejected connection: {e}");
        return;
    }

    // Closing a socket with unread input makes the kernel send RST, which can
    // discard the 400 before the client reads it. Swallow whatever the client
    // is still sending until it hangs up or LINGER elapses.
    let mut sink = tokio::io::sink();
    let drain = tokio::io::copy(&mut stream, &mut sink);
    let _ = tokio::time::timeout(LINGER, drain).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn any_request_gets_ok() {
        let req = http::Request::builder()
            .method("DELETE")
            .uri("/deep/path?q=1")
            .header("x-anything", "at all")
            .body(Full::new(Bytes::from_static(b"ignored")))
            .unwrap();

        let res = handle_request(req).await.unwrap();
        assert_eq!(res.status(), http::StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "text/plain");

        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn client_error_writes_bare_status_line() {
        let (mut client, server) = tokio::io::duplex(64);

        let reader = async move {
            let mut got = Vec::new();
            client.read_to_end(&mut got).await.unwrap();
            got
        };

        let (got, ()) = tokio::join!(reader, handle_client_error(server));
        assert_eq!(got, BAD_REQUEST);
    }
}
