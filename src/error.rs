//! Unified error type.

use std::fmt;
use std::net::SocketAddr;

/// The error type returned by oksrv's fallible operations.
///
/// Malformed client input is never an `Error`: it is answered on the wire
/// and only that connection is closed. This type surfaces the failures the
/// process itself cannot recover from.
#[derive(Debug)]
pub enum Error {
    /// The listener could not be bound (port in use, permission denied, ...).
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// Any other I/O failure on the listener.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { addr, source } => write!(f, "failed to bind {addr}: {source}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind { source, .. } => Some(source),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
