//! Accept loop for a bound TCP socket.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;

/// Pause after a failed `accept` before retrying.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts and closes connections until `cancel` flips to `true` or its
/// sender is dropped.
pub async fn run(name: String, listener: TcpListener, mut cancel: watch::Receiver<bool>) {
    tracing::info!(listener = %name, "TCP accept loop started");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(listener = %name, peer = %peer, "Connection accepted");
                        drop(stream);
                    }
                    Err(e) => {
                        tracing::warn!(listener = %name, error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    tracing::info!(listener = %name, "TCP accept loop shutting down");
                    break;
                }
            }
        }
    }
}
