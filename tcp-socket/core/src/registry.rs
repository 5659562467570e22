//! Session Registry - Handle-Based TCP Client Management
//!
//! The registry owns every TCP connection opened through it and hands callers
//! an opaque [`ClientHandle`] instead of the socket.
//!
//! # Architecture
//!
//! ```text
//!                      SessionRegistry
//!                     ┌────────────────────────────────────────┐
//!                     │ Vec<Arc<Session>>  (index = handle)    │
//!                     │   - wrapped in Arc<RwLock<>>           │
//!                     │   - append only, never compacted       │
//!                     └───────────────┬────────────────────────┘
//!                                     │
//!              ┌──────────────────────┼──────────────────────┐
//!              │                      │                      │
//!       ┌──────▼──────┐       ┌───────▼──────┐       ┌───────▼──────┐
//!       │  client 0   │       │   client 1   │       │   client 2   │
//!       │   Closed    │       │     Open     │       │     Open     │
//!       └─────────────┘       └──────────────┘       └──────────────┘
//! ```
//!
//! Handles are the index at which a session was appended. Disconnecting marks
//! the session closed in place, so a handle issued later never shifts and a
//! stale handle can never alias a newer connection.
//!
//! # Thread Safety
//!
//! The vector lock is only held to append or to clone an `Arc<Session>` out;
//! it is never held across an await. Per-connection exclusion lives in
//! [`Session`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use crate::codec::{self, EncodedPayload, Encoding};
use crate::config::SocketConfig;
use crate::error::SocketError;
use crate::session::{Session, SessionState};

/// Opaque identifier for a registered TCP client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientHandle(u32);

impl ClientHandle {
    /// Create a handle from a raw value
    ///
    /// A handle built this way is only meaningful to the registry that
    /// issued the same value.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of TCP client sessions
///
/// Cloning yields another reference to the same registry. Separately
/// constructed registries share nothing.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<Vec<Arc<Session>>>>,
    config: Arc<SocketConfig>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create an empty registry with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SocketConfig::default())
    }

    /// Create an empty registry with the given configuration
    #[must_use]
    pub fn with_config(config: SocketConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Vec::new())),
            config: Arc::new(config),
        }
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Open a TCP connection and register it
    ///
    /// The attempt is bounded by the configured connect timeout.
    ///
    /// # Errors
    ///
    /// - `SocketError::InvalidArgument` if `address` is empty or blank; no
    ///   network activity happens in that case
    /// - `SocketError::Connection` if resolution, connection or the timeout
    ///   fails; nothing is registered
    pub async fn connect(&self, address: &str, port: u16) -> Result<ClientHandle, SocketError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(SocketError::InvalidArgument(
                "Must provide ip address to connect".to_string(),
            ));
        }

        let limit = self.config.connect_timeout();
        let stream = match tokio::time::timeout(limit, TcpStream::connect((address, port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::warn!(address = address, port = port, error = %e, "Connection failed");
                return Err(SocketError::Connection {
                    address: address.to_string(),
                    port,
                    message: e.to_string(),
                });
            }
            Err(_) => {
                tracing::warn!(
                    address = address,
                    port = port,
                    timeout = ?limit,
                    "Connection timed out"
                );
                return Err(SocketError::Connection {
                    address: address.to_string(),
                    port,
                    message: format!("timed out after {limit:?}"),
                });
            }
        };

        let session = {
            let mut sessions = self.sessions.write();
            let raw = u32::try_from(sessions.len()).map_err(|_| SocketError::Connection {
                address: address.to_string(),
                port,
                message: "client handle space exhausted".to_string(),
            })?;
            let session = Arc::new(Session::new(ClientHandle(raw), stream));
            sessions.push(Arc::clone(&session));
            session
        };

        tracing::info!(
            client = %session.handle(),
            address = address,
            port = port,
            peer = %session.peer(),
            "Client connected"
        );

        Ok(session.handle())
    }

    /// Decode `payload` and write it to the client's socket
    ///
    /// # Errors
    ///
    /// - `SocketError::InvalidHandle` if the handle is unknown or closed
    /// - `SocketError::Codec` if `payload` is not valid for `encoding`
    /// - `SocketError::Transport` if the write fails or the client is
    ///   disconnected mid-write
    pub async fn send(
        &self,
        handle: ClientHandle,
        payload: &str,
        encoding: Encoding,
    ) -> Result<(), SocketError> {
        let session = self.resolve(handle)?;
        let bytes = codec::decode(payload, encoding)?;

        session.write_all(&bytes).await?;

        tracing::debug!(client = %handle, bytes = bytes.len(), encoding = %encoding, "Sent");
        Ok(())
    }

    /// Read up to `max_bytes` from the client's socket
    ///
    /// A zero `timeout` waits without a deadline. When nothing arrives before
    /// the deadline, or the peer has closed its side, the result is an empty
    /// payload tagged with the requested encoding. A `utf8` request for bytes
    /// that are not valid UTF-8 is answered in `base64`, and the payload says
    /// so.
    ///
    /// # Errors
    ///
    /// - `SocketError::InvalidArgument` if `max_bytes` is zero or above the
    ///   configured maximum
    /// - `SocketError::InvalidHandle` if the handle is unknown or closed
    /// - `SocketError::Transport` if the read fails or the client is
    ///   disconnected mid-read
    pub async fn read(
        &self,
        handle: ClientHandle,
        max_bytes: usize,
        timeout: Duration,
        encoding: Encoding,
    ) -> Result<EncodedPayload, SocketError> {
        if max_bytes == 0 {
            return Err(SocketError::InvalidArgument(
                "Read length must be at least 1 byte".to_string(),
            ));
        }
        if max_bytes > self.config.max_read_bytes {
            return Err(SocketError::InvalidArgument(format!(
                "Read length {max_bytes} exceeds maximum of {} bytes",
                self.config.max_read_bytes
            )));
        }

        let session = self.resolve(handle)?;
        let deadline = (!timeout.is_zero()).then_some(timeout);
        let bytes = session.read(max_bytes, deadline).await?;

        if bytes.is_empty() {
            tracing::debug!(client = %handle, "Read returned no data");
            return Ok(EncodedPayload::empty(encoding));
        }

        let payload = codec::encode_with_fallback(&bytes, encoding);
        if payload.encoding != encoding {
            tracing::debug!(
                client = %handle,
                requested = %encoding,
                actual = %payload.encoding,
                "Read data is not valid UTF-8, returning base64"
            );
        }
        tracing::debug!(client = %handle, bytes = bytes.len(), encoding = %payload.encoding, "Read");

        Ok(payload)
    }

    /// Close the client's connection
    ///
    /// Disconnecting a client that is already closed succeeds without doing
    /// anything. The handle stays allocated and is never reissued.
    ///
    /// # Errors
    ///
    /// Returns `SocketError::InvalidHandle` if the handle was never issued by
    /// this registry.
    pub async fn disconnect(&self, handle: ClientHandle) -> Result<ClientHandle, SocketError> {
        let session = self
            .get(handle)
            .ok_or_else(|| SocketError::invalid_handle(handle, "no such client"))?;

        if session.close().await {
            tracing::info!(
                client = %handle,
                peer = %session.peer(),
                uptime_secs = session.uptime().as_secs(),
                "Client disconnected"
            );
        } else {
            tracing::debug!(client = %handle, "Client already disconnected");
        }

        Ok(handle)
    }

    /// Disconnect every open client
    ///
    /// Returns the number of sessions this call closed.
    pub async fn shutdown(&self) -> usize {
        let sessions: Vec<Arc<Session>> = self.sessions.read().clone();

        let mut closed = 0;
        for session in sessions {
            if session.close().await {
                closed += 1;
            }
        }

        tracing::info!(closed = closed, "Registry shut down");
        closed
    }

    /// Number of handles ever issued, open or closed
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no handle has been issued yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Number of sessions currently open
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.sessions
            .read()
            .iter()
            .filter(|session| !session.is_closed())
            .count()
    }

    /// Lifecycle state of a handle, `None` if it was never issued
    #[must_use]
    pub fn state(&self, handle: ClientHandle) -> Option<SessionState> {
        self.get(handle).map(|session| session.state())
    }

    /// Whether the handle refers to an open session
    #[must_use]
    pub fn is_open(&self, handle: ClientHandle) -> bool {
        self.state(handle) == Some(SessionState::Open)
    }

    /// Remote address of a handle's connection
    #[must_use]
    pub fn peer_addr(&self, handle: ClientHandle) -> Option<String> {
        self.get(handle).map(|session| session.peer().to_string())
    }

    fn get(&self, handle: ClientHandle) -> Option<Arc<Session>> {
        self.sessions.read().get(handle.index()).cloned()
    }

    /// Resolve a handle to an open session
    fn resolve(&self, handle: ClientHandle) -> Result<Arc<Session>, SocketError> {
        let session = self
            .get(handle)
            .ok_or_else(|| SocketError::invalid_handle(handle, "no such client"))?;

        if session.is_closed() {
            return Err(SocketError::invalid_handle(handle, "client is disconnected"));
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_client_handle_display() {
        assert_eq!(ClientHandle::from_raw(4).to_string(), "4");
        assert_eq!(ClientHandle::from_raw(4).as_u32(), 4);
    }

    #[test]
    fn test_client_handle_serializes_as_integer() {
        let json = serde_json::to_string(&ClientHandle::from_raw(2)).unwrap();
        assert_eq!(json, "2");
    }

    #[tokio::test]
    async fn test_connect_rejects_blank_address() {
        let registry = SessionRegistry::new();

        for address in ["", "   "] {
            let err = registry.connect(address, 9100).await.unwrap_err();
            assert!(matches!(err, SocketError::InvalidArgument(_)));
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_connect_refused_registers_nothing() {
        let (listener, port) = listener().await;
        drop(listener);

        let registry = SessionRegistry::new();
        let err = registry.connect("127.0.0.1", port).await.unwrap_err();

        assert!(matches!(err, SocketError::Connection { .. }));
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_send_and_read_through_handle() {
        let (listener, port) = listener().await;
        let registry = SessionRegistry::new();

        let handle = registry.connect("127.0.0.1", port).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        registry.send(handle, "SGk=", Encoding::Base64).await.unwrap();
        let mut buf = [0u8; 2];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"Hi");

        peer.write_all(&[0x01, 0xAB]).await.unwrap();
        let payload = registry
            .read(handle, 16, Duration::from_secs(1), Encoding::Hex)
            .await
            .unwrap();
        assert_eq!(payload, EncodedPayload::new("01ab", Encoding::Hex));
    }

    #[tokio::test]
    async fn test_send_with_bad_payload_is_decode_error() {
        let (listener, port) = listener().await;
        let registry = SessionRegistry::new();
        let handle = registry.connect("127.0.0.1", port).await.unwrap();
        let _peer = listener.accept().await.unwrap();

        let err = registry.send(handle, "abc", Encoding::Hex).await.unwrap_err();
        assert_eq!(err.code(), crate::error::DECODE_ERROR);
        assert!(registry.is_open(handle));
    }

    #[tokio::test]
    async fn test_read_validates_length() {
        let registry = SessionRegistry::new();
        let handle = ClientHandle::from_raw(0);

        let err = registry
            .read(handle, 0, Duration::from_secs(1), Encoding::Utf8)
            .await
            .unwrap_err();
        assert!(matches!(err, SocketError::InvalidArgument(_)));

        let too_big = registry.config().max_read_bytes + 1;
        let err = registry
            .read(handle, too_big, Duration::from_secs(1), Encoding::Utf8)
            .await
            .unwrap_err();
        assert!(matches!(err, SocketError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_unknown_handle_is_rejected() {
        let registry = SessionRegistry::new();
        let handle = ClientHandle::from_raw(0);

        let err = registry.send(handle, "x", Encoding::Utf8).await.unwrap_err();
        assert!(matches!(err, SocketError::InvalidHandle { handle: 0, .. }));

        let err = registry.disconnect(handle).await.unwrap_err();
        assert!(matches!(err, SocketError::InvalidHandle { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_keeps_slot_as_tombstone() {
        let (listener, port) = listener().await;
        let registry = SessionRegistry::new();
        let handle = registry.connect("127.0.0.1", port).await.unwrap();
        let _peer = listener.accept().await.unwrap();

        assert_eq!(registry.disconnect(handle).await.unwrap(), handle);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.open_count(), 0);
        assert_eq!(registry.state(handle), Some(SessionState::Closed));

        let err = registry
            .read(handle, 8, Duration::from_millis(10), Encoding::Utf8)
            .await
            .unwrap_err();
        assert!(matches!(err, SocketError::InvalidHandle { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_closes_open_sessions() {
        let (listener, port) = listener().await;
        let registry = SessionRegistry::new();

        let first = registry.connect("127.0.0.1", port).await.unwrap();
        let _a = listener.accept().await.unwrap();
        let second = registry.connect("127.0.0.1", port).await.unwrap();
        let _b = listener.accept().await.unwrap();
        registry.disconnect(first).await.unwrap();

        assert_eq!(registry.shutdown().await, 1);
        assert!(!registry.is_open(second));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_state_but_registries_do_not() {
        let (listener, port) = listener().await;
        let registry = SessionRegistry::new();
        let other = SessionRegistry::new();

        let handle = registry.clone().connect("127.0.0.1", port).await.unwrap();
        let _peer = listener.accept().await.unwrap();

        assert!(registry.is_open(handle));
        assert!(!other.is_open(handle));
        assert!(other.is_empty());
    }
}
