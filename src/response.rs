//! The two responses oksrv ever sends.
//!
//! Both are constant. Nothing about the request changes them.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::Full;

/// Body of every successful response.
pub const OK_BODY: &str = "ok";

/// Content type of every successful response.
pub const OK_CONTENT_TYPE: &str = "text/plain";

/// Raw bytes written to a connection whose input is not HTTP.
///
/// No headers, no body: a status line and the blank line ending the head.
pub const BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad Request\r\n\r\n";

/// `200 OK`, `content-type: text/plain`, body `ok`.
///
/// hyper fills in `content-length` and `date`.
pub(crate) fn ok() -> http::Response<Full<Bytes>> {
    let mut res = http::Response::new(Full::new(Bytes::from_static(OK_BODY.as_bytes())));
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(OK_CONTENT_TYPE));
    res
}
