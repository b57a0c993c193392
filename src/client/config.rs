//! Client configuration and builder.

use std::sync::Arc;
use std::time::Duration;

use super::Client;
use crate::cancel::Cancellation;
use crate::connection::{ConnectionConfig, Credentials};
use crate::error::Result;
use crate::protocol::ConnectInfo;
use crate::transport::{Connector, TcpConnector};

/// Default bound on waiting for an in-flight connect/disconnect.
pub const DEFAULT_WAIT_FOR_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on waiting for a request's reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client behaviour settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long `connect()` waits for a concurrent transition to settle.
    pub wait_for_status_timeout: Duration,
    /// Timeout used by [`Client::request`].
    pub request_timeout: Duration,
    /// Options sent in CONNECT when the server's INFO arrives.
    pub connect_info: ConnectInfo,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            wait_for_status_timeout: DEFAULT_WAIT_FOR_STATUS_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_info: ConnectInfo::default(),
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use natswire_client::{Cancellation, ClientBuilder};
///
/// let client = ClientBuilder::new()
///     .server_url("nats://demo:4222")
///     .unwrap()
///     .request_timeout(Duration::from_secs(5))
///     .cancellation(Cancellation::new())
///     .build();
///
/// assert_eq!(client.config().request_timeout, Duration::from_secs(5));
/// ```
pub struct ClientBuilder {
    connection_config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    config: ClientConfig,
    cancellation: Option<Cancellation>,
}

impl ClientBuilder {
    /// Create a builder targeting the default local server over TCP.
    pub fn new() -> Self {
        Self {
            connection_config: ConnectionConfig::default(),
            connector: Arc::new(TcpConnector),
            config: ClientConfig::default(),
            cancellation: None,
        }
    }

    /// Set host, port and queue size.
    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Take host and port from a `nats://` URL, and any credentials it carries.
    pub fn server_url(mut self, url: &str) -> Result<Self> {
        let (config, credentials): (ConnectionConfig, Credentials) = ConnectionConfig::from_url(url)?;
        self.connection_config = ConnectionConfig {
            queue_buffer_size: self.connection_config.queue_buffer_size,
            ..config
        };
        credentials.apply_to(&mut self.config.connect_info);
        Ok(self)
    }

    /// Set the inbound queue capacity.
    ///
    /// Default: 1000
    pub fn queue_buffer_size(mut self, size: usize) -> Self {
        self.connection_config.queue_buffer_size = size;
        self
    }

    /// Replace the transport connector (TCP by default).
    pub fn connector<C: Connector>(mut self, connector: C) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Set the CONNECT options.
    pub fn connect_info(mut self, info: ConnectInfo) -> Self {
        self.config.connect_info = info;
        self
    }

    /// Default: 10 seconds
    pub fn wait_for_status_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_for_status_timeout = timeout;
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Cancellation source for every wait the client performs.
    ///
    /// Defaults to a fresh source that only fires when cancelled manually.
    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Build the client. Nothing is connected until [`Client::connect`].
    pub fn build(self) -> Client {
        Client::new(
            self.connector,
            self.connection_config,
            self.config,
            self.cancellation.unwrap_or_default(),
        )
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.wait_for_status_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_info.lang, "rust");
    }

    #[test]
    fn test_server_url_applies_credentials() {
        let client = ClientBuilder::new()
            .queue_buffer_size(5)
            .server_url("nats://tok@example:5000")
            .unwrap()
            .build();

        assert_eq!(client.connection_config().host, "example");
        assert_eq!(client.connection_config().port, 5000);
        assert_eq!(client.connection_config().queue_buffer_size, 5);
        assert_eq!(client.config().connect_info.auth_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_server_url_rejects_bad_scheme() {
        assert!(ClientBuilder::new().server_url("tcp://x").is_err());
    }
}
