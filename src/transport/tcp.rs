//! TCP transport.

use tokio::net::TcpStream;

use super::{BoxedStream, Connector};
use crate::BoxFuture;

/// Connects over plain TCP with Nagle disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, std::io::Result<BoxedStream>> {
        Box::pin(async move {
            let stream = TcpStream::connect((host, port)).await?;
            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!("Failed to set TCP_NODELAY: {}", e);
            }
            tracing::debug!(host, port, "TCP connection established");
            Ok(Box::new(stream) as BoxedStream)
        })
    }
}
