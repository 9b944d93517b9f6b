//! TCP bridge for data-path checks over a formed group.
//!
//! The transport starts a server, tells the remote end the port out of band,
//! and then pushes bytes through to prove the group actually carries data.
//! Accepting is fully asynchronous: `start_server` returns the bound address
//! immediately and a background task reports the accept outcome as a single
//! event on the shared registry, so the transport observes it through the
//! same poll path as every other callback.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use core_events::{fields, CallbackEvent, Error, EventRegistry, Result};

/// Event name for the accept outcome.
pub const SOCKET_CONNECTION_EVENT: &str = "SocketConnectionCallback";

/// One-connection TCP bridge.
///
/// A bridge serves a single connection at a time: call
/// [`close`](SocketBridge::close) before starting another server. All stream
/// access goes through one async mutex; the pending accept never holds it.
pub struct SocketBridge {
    registry: Arc<EventRegistry>,
    stream: Arc<AsyncMutex<Option<TcpStream>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl SocketBridge {
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self {
            registry,
            stream: Arc::new(AsyncMutex::new(None)),
            cancel: Mutex::new(None),
        }
    }

    /// Bind an ephemeral local port and start accepting in the background.
    ///
    /// Returns the bound address at once. Exactly one event is later posted
    /// under `(correlation_id, SOCKET_CONNECTION_EVENT)`: `isConnected: true`
    /// when a client arrives, or `isConnected: false` plus `errorMessage` on
    /// accept error, timeout, or cancellation.
    pub async fn start_server(
        &self,
        correlation_id: &str,
        accept_timeout: Duration,
    ) -> Result<SocketAddr> {
        let token = {
            let mut cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
            if cancel.is_some() {
                return Err(Error::State(
                    "a socket server is already running, close it first".to_string(),
                ));
            }
            let token = CancellationToken::new();
            *cancel = Some(token.clone());
            token
        };

        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        tracing::debug!(correlation_id, %addr, "socket server listening");

        let registry = self.registry.clone();
        let slot = self.stream.clone();
        let correlation_id = correlation_id.to_string();

        tokio::spawn(async move {
            let failure = |message: String| {
                CallbackEvent::new(&correlation_id, SOCKET_CONNECTION_EVENT)
                    .with_field(fields::IS_CONNECTED, false)
                    .with_field(fields::ERROR_MESSAGE, message)
            };
            let event = tokio::select! {
                _ = token.cancelled() => {
                    failure("server closed before a client connected".to_string())
                }
                _ = tokio::time::sleep(accept_timeout) => {
                    failure(format!(
                        "no client connected within {} ms",
                        accept_timeout.as_millis()
                    ))
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "socket client accepted");
                        *slot.lock().await = Some(stream);
                        CallbackEvent::new(&correlation_id, SOCKET_CONNECTION_EVENT)
                            .with_field(fields::IS_CONNECTED, true)
                    }
                    Err(err) => failure(format!("accept failed: {err}")),
                },
            };
            registry.post(event);
        });

        Ok(addr)
    }

    /// Write `data` to the connected stream.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .ok_or_else(|| Error::State("no connected socket".to_string()))?;
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read up to `max_len` bytes from the connected stream. An empty result
    /// means the remote end closed the connection.
    pub async fn receive(&self, max_len: usize) -> Result<Vec<u8>> {
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .ok_or_else(|| Error::State("no connected socket".to_string()))?;
        let mut buf = vec![0u8; max_len];
        let n = stream.read(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Stop the server and drop any connected stream. An in-flight accept is
    /// cancelled and reports through its event. Idempotent.
    pub async fn close(&self) {
        let token = self
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(token) = token {
            token.cancel();
        }
        if self.stream.lock().await.take().is_some() {
            tracing::debug!("socket bridge connection dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn bridge() -> (SocketBridge, Arc<EventRegistry>) {
        let registry = Arc::new(EventRegistry::new());
        (SocketBridge::new(registry.clone()), registry)
    }

    async fn accept_event(registry: &EventRegistry, id: &str) -> core_events::FieldMap {
        registry
            .poll(id, SOCKET_CONNECTION_EVENT, Duration::from_secs(5))
            .await
            .expect("accept outcome event")
            .into_fields()
    }

    #[tokio::test]
    async fn accepted_client_can_exchange_bytes() {
        let (bridge, registry) = bridge();
        let addr = bridge
            .start_server("sock", Duration::from_secs(5))
            .await
            .unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let event = accept_event(&registry, "sock").await;
        assert_eq!(event[fields::IS_CONNECTED], Value::Bool(true));

        client.write_all(b"ping").await.unwrap();
        assert_eq!(bridge.receive(16).await.unwrap(), b"ping");

        bridge.send(b"pong").await.unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        bridge.close().await;
    }

    #[tokio::test]
    async fn accept_timeout_posts_a_failure_event() {
        let (bridge, registry) = bridge();
        bridge
            .start_server("sock", Duration::from_millis(50))
            .await
            .unwrap();

        let event = accept_event(&registry, "sock").await;
        assert_eq!(event[fields::IS_CONNECTED], Value::Bool(false));
        assert!(event[fields::ERROR_MESSAGE]
            .as_str()
            .unwrap()
            .contains("no client connected"));
    }

    #[tokio::test]
    async fn close_cancels_a_pending_accept() {
        let (bridge, registry) = bridge();
        bridge
            .start_server("sock", Duration::from_secs(30))
            .await
            .unwrap();
        bridge.close().await;

        let event = accept_event(&registry, "sock").await;
        assert_eq!(event[fields::IS_CONNECTED], Value::Bool(false));
        assert!(event[fields::ERROR_MESSAGE]
            .as_str()
            .unwrap()
            .contains("closed"));
    }

    #[tokio::test]
    async fn second_server_requires_close_first() {
        let (bridge, _registry) = bridge();
        bridge
            .start_server("sock", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(matches!(
            bridge.start_server("sock2", Duration::from_secs(5)).await,
            Err(Error::State(_))
        ));

        bridge.close().await;
        bridge
            .start_server("sock3", Duration::from_secs(5))
            .await
            .unwrap();
        bridge.close().await;
    }

    #[tokio::test]
    async fn io_without_a_connection_is_a_state_error() {
        let (bridge, _registry) = bridge();
        assert!(matches!(bridge.send(b"x").await, Err(Error::State(_))));
        assert!(matches!(bridge.receive(8).await, Err(Error::State(_))));
        // Close without ever starting is fine.
        bridge.close().await;
    }
}
