//! An I/O adapter that lets hyper read only checked requests.
//!
//! `Gate` sits between the socket and hyper. It buffers what the client
//! sends and hands hyper one message part at a time: a request head only
//! once [`head::check`] accepts it, then exactly the body that head
//! announces, then the next head. Nothing past a malformed head is ever
//! released.
//!
//! On a malformed head the gate flags the connection and reports EOF, so
//! hyper finishes the responses it owes and winds down on its own. The
//! write side is left open for the raw `400` line.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, ready};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::head::{self, Body, Check, ChunkSize};

const READ_CHUNK: usize = 8 * 1024;

/// Where in the request stream the next unreleased byte sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Body(u64),
    ChunkSize,
    ChunkData(u64),
    ChunkEnd,
    Trailers,
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// The next `n` bytes are checked; release them and move on.
    Release(usize, State),
    NeedMore,
    Invalid,
}

fn step(state: State, buf: &[u8]) -> Step {
    match state {
        State::Head => match head::check(buf) {
            Check::Complete { len, body } => {
                let next = match body {
                    Body::Empty => State::Head,
                    Body::Length(n) => State::Body(n),
                    Body::Chunked => State::ChunkSize,
                };
                Step::Release(len, next)
            }
            Check::Partial => Step::NeedMore,
            Check::Invalid => Step::Invalid,
        },
        State::Body(left) => take(buf, left, State::Body, State::Head),
        State::ChunkSize => match head::chunk_size(buf) {
            ChunkSize::Complete { len, size: 0 } => Step::Release(len, State::Trailers),
            ChunkSize::Complete { len, size } => Step::Release(len, State::ChunkData(size)),
            ChunkSize::Partial => Step::NeedMore,
            ChunkSize::Invalid => Step::Invalid,
        },
        State::ChunkData(left) => take(buf, left, State::ChunkData, State::ChunkEnd),
        State::ChunkEnd => match buf {
            [b'\r', b'\n', ..] => Step::Release(2, State::ChunkSize),
            [] | [b'\r'] => Step::NeedMore,
            _ => Step::Invalid,
        },
        State::Trailers => match head::trailers(buf) {
            Check::Complete { len, .. } => Step::Release(len, State::Head),
            Check::Partial => Step::NeedMore,
            Check::Invalid => Step::Invalid,
        },
    }
}

/// Releases up to `left` body bytes.
fn take(buf: &[u8], left: u64, more: fn(u64) -> State, done: State) -> Step {
    if buf.is_empty() {
        return Step::NeedMore;
    }
    let n = usize::try_from(left).map_or(buf.len(), |left| left.min(buf.len()));
    let left = left - n as u64;
    Step::Release(n, if left == 0 { done } else { more(left) })
}

/// Wraps the client stream `T` for hyper.
///
/// `rejected` is set once malformed input is seen; it outlives the gate,
/// which hyper drops together with its connection.
#[derive(Debug)]
pub(crate) struct Gate<'a, T> {
    inner: T,
    buf: BytesMut,
    /// Checked bytes at the front of `buf` that hyper has not read yet.
    ready: usize,
    state: State,
    eof: bool,
    rejected: &'a AtomicBool,
}

impl<'a, T> Gate<'a, T> {
    pub(crate) fn new(inner: T, rejected: &'a AtomicBool) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            ready: 0,
            state: State::Head,
            eof: false,
            rejected,
        }
    }

    fn is_rejected(&self) -> bool {
        self.rejected.load(Ordering::Relaxed)
    }

    fn reject(&self) {
        self.rejected.store(true, Ordering::Relaxed);
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for Gate<'_, T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;

        loop {
            if this.is_rejected() || out.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }

            if this.ready > 0 {
                let n = this.ready.min(out.remaining());
                out.put_slice(&this.buf[..n]);
                this.buf.advance(n);
                this.ready -= n;
                return Poll::Ready(Ok(()));
            }

            match step(this.state, &this.buf) {
                Step::Release(n, next) => {
                    this.ready = n;
                    this.state = next;
                }
                Step::Invalid => this.reject(),
                Step::NeedMore if this.eof => {
                    // A head cut short by EOF is malformed. EOF anywhere else
                    // is for hyper to judge.
                    if this.state == State::Head && !this.buf.is_empty() {
                        this.reject();
                    }
                    return Poll::Ready(Ok(()));
                }
                Step::NeedMore => {
                    let mut chunk = [0u8; READ_CHUNK];
                    let mut read = ReadBuf::new(&mut chunk);
                    ready!(Pin::new(&mut this.inner).poll_read(cx, &mut read))?;
                    if read.filled().is_empty() {
                        this.eof = true;
                    } else {
                        this.buf.extend_from_slice(read.filled());
                    }
                }
            }
        }
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for Gate<'_, T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    /// Flushes only, once rejected: the `400` line still has to go out.
    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.is_rejected() {
            return Pin::new(&mut self.inner).poll_flush(cx);
        }
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
