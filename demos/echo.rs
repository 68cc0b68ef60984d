//! Echo demo.
//!
//! Connects to a WebSocket echo endpoint, sends a few messages and keeps
//! reading through disconnects.
//!
//! Usage: cargo run --example echo -- wss://echo.websocket.org
//!
//! Set `RUST_LOG=ws_tether=debug` to watch the lifecycle.

use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;
use ws_tether::{Client, ClientConfig, CloseOptions};

// ============================================================================
// Configuration
// ============================================================================

const DEFAULT_URL: &str = "wss://echo.websocket.org";
const MESSAGE_COUNT: usize = 3;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ws_tether=info")),
        )
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_owned());

    let config = ClientConfig::builder()
        .url(url)
        .handshake_timeout(Duration::from_secs(5))
        .max_size(64 * 1024)
        .max_retries(5)
        .reconnect_delay(Duration::from_millis(500))
        .build()?;

    let mut client = Client::new(config);
    client.connect().await?;
    client.set_read_timeout(Duration::from_secs(10))?;

    for i in 0..MESSAGE_COUNT {
        client.write(format!("message {i}")).await?;
    }

    let mut received = 0;
    while received < MESSAGE_COUNT {
        let message = client.next_message().await?;
        info!(text = ?message.as_text(), len = message.len(), "Received");
        client.done(message);
        received += 1;
    }

    client
        .close(CloseOptions::new().with_reason("demo finished"))
        .await?;
    client.teardown();

    Ok(())
}
