//! Request/reply demo against a local NATS server.
//!
//! This example demonstrates:
//! - Building a client from a `nats://` URL
//! - Answering requests from a subscription handler
//! - Sending a request and awaiting its reply
//! - Shutting down cleanly on Ctrl-C
//!
//! # Running
//!
//! ```sh
//! nats-server &
//! RUST_LOG=natswire_client=debug cargo run --example request_reply
//! ```

use natswire_client::protocol::{Message, Pub};
use natswire_client::{Cancellation, Client, ConnectionStatus};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let url = std::env::var("NATS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".into());
    let client = Client::builder()
        .server_url(&url)?
        .cancellation(Cancellation::on_shutdown_signal())
        .build();

    let _status = client.subscribe_status(|status: &ConnectionStatus| {
        tracing::info!(%status, "Status");
    });

    client.connect().await?;

    // Answer every request on "greet" with a greeting
    client
        .subscribe("greet", |msg: Message| async move {
            let name = msg
                .payload()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .unwrap_or_default();
            let reply = match msg.reply_to() {
                Some(to) => Some(Pub::new(to, format!("hello, {name}"))?.into()),
                None => None,
            };
            Ok(reply)
        })
        .await?;

    let reply = client.request(Pub::new("greet", "world")?).await?;
    if let Some(payload) = reply.payload() {
        tracing::info!(reply = %String::from_utf8_lossy(payload), "Got reply");
    }

    tracing::info!("Press Ctrl-C to exit");
    client.wait_for_termination().await;
    client.disconnect().await?;
    Ok(())
}
