//! Transport module - byte-stream establishment.
//!
//! The connection never opens sockets itself; it asks a [`Connector`] for a
//! bidirectional stream. [`TcpConnector`] is the default. Tests inject
//! in-memory streams (e.g. `tokio::io::duplex`) through the same trait.

mod tcp;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::BoxFuture;

pub use tcp::TcpConnector;

/// Bidirectional async byte stream.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Type-erased stream handed to the connection.
pub type BoxedStream = Box<dyn AsyncStream>;

/// Establishes transport streams.
pub trait Connector: Send + Sync + 'static {
    /// Open a stream to `host:port`.
    ///
    /// Cancellation is handled by the caller, which drops the future.
    fn connect<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, std::io::Result<BoxedStream>>;
}
