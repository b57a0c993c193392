//! # natswire-client
//!
//! Async Rust client for the NATS text protocol: subject-based
//! publish/subscribe with request/reply, headers and the INFO/CONNECT
//! handshake, over one persistent byte stream.
//!
//! ## Architecture
//!
//! - **Protocol**: typed messages, validated on construction, and an
//!   incremental parser that accepts the byte stream in any chunking
//! - **Connection**: one read task per open stream, feeding a bounded queue
//!   that provides backpressure
//! - **Client**: connection state machine, subscription registry and
//!   request/reply correlation
//!
//! ## Example
//!
//! ```no_run
//! use natswire_client::protocol::{Message, Pub};
//! use natswire_client::{Cancellation, Client};
//!
//! #[tokio::main]
//! async fn main() -> natswire_client::Result<()> {
//!     let client = Client::builder()
//!         .cancellation(Cancellation::on_shutdown_signal())
//!         .build();
//!     client.connect().await?;
//!
//!     client
//!         .subscribe("events.>", |msg: Message| async move {
//!             println!("{:?}", msg.payload());
//!             Ok(None)
//!         })
//!         .await?;
//!     client.publish(Pub::new("events.started", "hi")?).await?;
//!
//!     client.wait_for_termination().await;
//!     client.disconnect().await
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod cancel;
pub mod client;
pub mod connection;
pub mod error;
pub mod event;
pub mod protocol;
pub mod subscription;
pub mod transport;

pub use cancel::Cancellation;
pub use client::{Client, ClientBuilder, ClientConfig, ConnectionStatus};
pub use connection::{Connection, ConnectionConfig, Credentials, Inbound};
pub use error::{NatsError, Result};
pub use protocol::Message;
pub use subscription::{HandlerResult, SubscriptionRegistry};

/// Boxed future used at trait-object seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
