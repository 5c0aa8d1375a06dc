//! Request-head checks and body framing.
//!
//! hyper answers a parse error with its own `400` carrying headers. To send
//! the bare status line instead, every request head is checked here before
//! hyper is allowed to see it, with the same rules hyper applies: httparse,
//! a valid method and request target, and sound body framing.
//!
//! The body that follows a head is measured, not decoded, so the next head
//! can be found and checked in turn.

/// Largest request head accepted, in bytes. A head that is still incomplete
/// past this point is a client error. Chunk-size lines and trailers share
/// the limit.
pub(crate) const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Largest number of header fields accepted in one request head.
pub(crate) const MAX_HEADERS: usize = 100;

/// How the body after a head is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Body {
    Empty,
    Length(u64),
    Chunked,
}

/// Result of looking at the bytes where a request head should start.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Check {
    /// A complete, acceptable head of `len` bytes, followed by `body`.
    Complete { len: usize, body: Body },
    /// More bytes are needed to decide.
    Partial,
    /// The bytes cannot be an acceptable HTTP/1.x request head.
    Invalid,
}

/// Checks the request head at the start of `buf`.
pub(crate) fn check(buf: &[u8]) -> Check {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    let len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) if len <= MAX_HEAD_BYTES => len,
        Ok(httparse::Status::Complete(_)) | Err(_) => return Check::Invalid,
        Ok(httparse::Status::Partial) if buf.len() < MAX_HEAD_BYTES => return Check::Partial,
        Ok(httparse::Status::Partial) => return Check::Invalid,
    };

    if !has_valid_target(&req) {
        return Check::Invalid;
    }
    match framing(&req) {
        Some(body) => Check::Complete { len, body },
        None => Check::Invalid,
    }
}

/// The method and request target must convert into `http` types, which is
/// what hyper does right after httparse.
fn has_valid_target(req: &httparse::Request<'_, '_>) -> bool {
    let (Some(method), Some(path)) = (req.method, req.path) else {
        return false;
    };
    http::Method::from_bytes(method.as_bytes()).is_ok() && http::Uri::try_from(path).is_ok()
}

/// Body framing rules a parsed head must satisfy.
///
/// - every `content-length` is a plain decimal number, and all of them agree;
/// - `transfer-encoding` only appears on HTTP/1.1, never next to
///   `content-length`, and its final coding is `chunked`.
fn framing(req: &httparse::Request<'_, '_>) -> Option<Body> {
    let mut content_length: Option<u64> = None;
    let mut chunked = None;

    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case("content-length") {
            let len = parse_content_length(header.value)?;
            if content_length.is_some_and(|seen| seen != len) {
                return None;
            }
            content_length = Some(len);
        } else if header.name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = Some(ends_with_chunked(header.value));
        }
    }

    match (chunked, content_length) {
        (None, None | Some(0)) => Some(Body::Empty),
        (None, Some(len)) => Some(Body::Length(len)),
        (Some(_), _) if req.version != Some(1) => None,
        (Some(_), Some(_)) => None,
        (Some(true), None) => Some(Body::Chunked),
        (Some(false), None) => None,
    }
}

fn parse_content_length(value: &[u8]) -> Option<u64> {
    let value = std::str::from_utf8(value).ok()?.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn ends_with_chunked(value: &[u8]) -> bool {
    std::str::from_utf8(value)
        .ok()
        .and_then(|v| v.rsplit(',').next())
        .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
}

/// Result of looking at the bytes where a chunk-size line should start.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChunkSize {
    /// The size line is `len` bytes long and announces `size` data bytes.
    Complete { len: usize, size: u64 },
    Partial,
    Invalid,
}

pub(crate) fn chunk_size(buf: &[u8]) -> ChunkSize {
    match httparse::parse_chunk_size(buf) {
        Ok(httparse::Status::Complete((len, size))) => ChunkSize::Complete { len, size },
        Ok(httparse::Status::Partial) if buf.len() < MAX_HEAD_BYTES => ChunkSize::Partial,
        Ok(httparse::Status::Partial) | Err(_) => ChunkSize::Invalid,
    }
}

/// Checks the trailer section closing a chunked body, up to and including
/// its empty line. Only `len` is meaningful in the returned `Complete`.
pub(crate) fn trailers(buf: &[u8]) -> Check {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];

    match httparse::parse_headers(buf, &mut headers) {
        Ok(httparse::Status::Complete((len, _))) if len <= MAX_HEAD_BYTES => {
            Check::Complete { len, body: Body::Empty }
        }
        Ok(httparse::Status::Partial) if buf.len() < MAX_HEAD_BYTES => Check::Partial,
        Ok(_) | Err(_) => Check::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(len: usize, body: Body) -> Check {
        Check::Complete { len, body }
    }

    #[test]
    fn minimal_get_is_complete() {
        let head = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        assert_eq!(check(head), complete(head.len(), Body::Empty));
    }

    #[test]
    fn trailing_bytes_are_not_part_of_the_head() {
        let raw = b"POST /anything HTTP/1.1\r\nHost: x\r\nContent-Length: 3\r\n\r\nabc";
        assert_eq!(check(raw), complete(raw.len() - 3, Body::Length(3)));
    }

    #[test]
    fn control_bytes_are_rejected_immediately() {
        assert_eq!(check(b"\x01\x02\x03"), Check::Invalid);
    }

    #[test]
    fn unfinished_head_is_partial() {
        assert_eq!(check(b"GET / HTTP/1.1\r\nHost: x\r\n"), Check::Partial);
        assert_eq!(check(b"GE"), Check::Partial);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        assert_eq!(check(b"GET / HTTP/2.0\r\n\r\n"), Check::Invalid);
    }

    #[test]
    fn unparseable_target_is_rejected() {
        assert_eq!(check(b"GET http:// HTTP/1.1\r\n\r\n"), Check::Invalid);
        assert_eq!(check(b"OPTIONS * HTTP/1.1\r\n\r\n"), complete(22, Body::Empty));
        let absolute = b"GET http://x/y?z HTTP/1.1\r\n\r\n";
        assert_eq!(check(absolute), complete(absolute.len(), Body::Empty));
    }

    #[test]
    fn oversized_head_is_rejected() {
        let mut raw = b"GET / HTTP/1.1\r\nx-big: ".to_vec();
        raw.resize(MAX_HEAD_BYTES + 1024, b'a');
        assert_eq!(check(&raw), Check::Invalid);
    }

    #[test]
    fn content_length_must_be_numeric() {
        assert_eq!(check(b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n"), Check::Invalid);
        assert_eq!(check(b"POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n"), Check::Invalid);

        let head = b"POST / HTTP/1.1\r\nContent-Length:  3 \r\n\r\n";
        assert_eq!(check(head), complete(head.len(), Body::Length(3)));
    }

    #[test]
    fn zero_content_length_means_no_body() {
        let head = b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n";
        assert_eq!(check(head), complete(head.len(), Body::Empty));
    }

    #[test]
    fn conflicting_content_lengths_are_rejected() {
        let head = b"POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 4\r\n\r\n";
        assert_eq!(check(head), Check::Invalid);

        let head = b"POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 3\r\n\r\n";
        assert_eq!(check(head), complete(head.len(), Body::Length(3)));
    }

    #[test]
    fn transfer_encoding_rules() {
        let ok = b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip, chunked\r\n\r\n";
        assert_eq!(check(ok), complete(ok.len(), Body::Chunked));

        let not_chunked = b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n";
        assert_eq!(check(not_chunked), Check::Invalid);

        let with_length = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\n";
        assert_eq!(check(with_length), Check::Invalid);

        let http10 = b"POST / HTTP/1.0\r\nTransfer-Encoding: chunked\r\n\r\n";
        assert_eq!(check(http10), Check::Invalid);
    }

    #[test]
    fn too_many_headers_is_rejected() {
        let mut head = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..=MAX_HEADERS {
            head.extend_from_slice(format!("x-h{i}: v\r\n").as_bytes());
        }
        head.extend_from_slice(b"\r\n");
        assert_eq!(check(&head), Check::Invalid);
    }

    #[test]
    fn chunk_size_lines() {
        assert_eq!(chunk_size(b"3\r\nabc"), ChunkSize::Complete { len: 3, size: 3 });
        assert_eq!(chunk_size(b"1a;ext=1\r\n"), ChunkSize::Complete { len: 10, size: 26 });
        assert_eq!(chunk_size(b"1"), ChunkSize::Partial);
        assert_eq!(chunk_size(b"zz\r\n"), ChunkSize::Invalid);
    }

    #[test]
    fn trailer_sections() {
        assert_eq!(trailers(b"\r\nGET"), complete(2, Body::Empty));
        assert_eq!(trailers(b"x-sum: 1\r\n\r\n"), complete(12, Body::Empty));
        assert_eq!(trailers(b"x-sum: 1\r\n"), Check::Partial);
        assert_eq!(trailers(b"bad trailer\r\n\r\n"), Check::Invalid);
    }
}
