//! Session Entries
//!
//! A [`Session`] owns one TCP connection for the lifetime of its handle.
//!
//! # Concurrency
//!
//! The stream is split into owned halves so a send and a read can be in flight
//! at the same time. Each half sits behind its own async mutex, which means two
//! sends (or two reads) on the same session are serialized and never interleave
//! partial writes or reads.
//!
//! Closing is signalled over a `watch` channel. Any send or read that is still
//! waiting on the socket when the session closes returns
//! [`SocketError::Transport`] instead of hanging until its deadline.

use std::io;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

use crate::error::SocketError;
use crate::registry::ClientHandle;

/// Lifecycle state of a session
///
/// `Open` moves to `Closed` exactly once and never back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Connected and usable
    Open,
    /// Disconnected; the socket has been released
    Closed,
}

/// One TCP connection tracked by the registry
#[derive(Debug)]
pub struct Session {
    handle: ClientHandle,
    /// Remote address as reported at connect time
    peer: String,
    connected_at: Instant,
    /// `true` once the session has been closed
    closed_tx: watch::Sender<bool>,
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
}

impl Session {
    /// Wrap a freshly connected stream
    #[must_use]
    pub fn new(handle: ClientHandle, stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
        let (reader, writer) = stream.into_split();
        let (closed_tx, _) = watch::channel(false);

        Self {
            handle,
            peer,
            connected_at: Instant::now(),
            closed_tx,
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Handle this session is registered under
    #[must_use]
    pub fn handle(&self) -> ClientHandle {
        self.handle
    }

    /// Remote address of the connection
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        if *self.closed_tx.borrow() {
            SessionState::Closed
        } else {
            SessionState::Open
        }
    }

    /// Whether the session has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Time since the connection was established
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Write every byte and flush
    ///
    /// # Errors
    ///
    /// Returns `SocketError::Transport` if the write fails or the session is
    /// closed before the write completes.
    pub async fn write_all(&self, bytes: &[u8]) -> Result<(), SocketError> {
        let mut closed_rx = self.closed_tx.subscribe();

        let write = async {
            let mut guard = self.writer.lock().await;
            let writer = guard.as_mut().ok_or_else(closed_io_error)?;
            writer.write_all(bytes).await?;
            writer.flush().await
        };

        tokio::select! {
            result = write => result.map_err(|e| self.transport_error("send", &e)),
            _ = closed_rx.wait_for(|closed| *closed) => {
                Err(self.transport_error("send", &closed_io_error()))
            }
        }
    }

    /// Perform one read of at most `max_bytes`
    ///
    /// With a deadline, a read that sees no data before it expires returns an
    /// empty buffer. Peer EOF also returns an empty buffer. `None` waits until
    /// data, EOF or close.
    ///
    /// # Errors
    ///
    /// Returns `SocketError::Transport` if the read fails or the session is
    /// closed while the read is waiting.
    pub async fn read(
        &self,
        max_bytes: usize,
        deadline: Option<Duration>,
    ) -> Result<Vec<u8>, SocketError> {
        let mut closed_rx = self.closed_tx.subscribe();

        let read = async {
            let mut guard = self.reader.lock().await;
            let reader = guard.as_mut().ok_or_else(closed_io_error)?;
            let mut buf = vec![0u8; max_bytes];
            let n = reader.read(&mut buf).await?;
            buf.truncate(n);
            Ok::<_, io::Error>(buf)
        };

        let bounded = async {
            match deadline {
                Some(limit) => tokio::time::timeout(limit, read)
                    .await
                    .unwrap_or_else(|_| Ok(Vec::new())),
                None => read.await,
            }
        };

        tokio::select! {
            result = bounded => result.map_err(|e| self.transport_error("read", &e)),
            _ = closed_rx.wait_for(|closed| *closed) => {
                Err(self.transport_error("read", &closed_io_error()))
            }
        }
    }

    /// Close the connection
    ///
    /// Returns `true` if this call performed the close and `false` if the
    /// session was already closed.
    pub async fn close(&self) -> bool {
        let closed_now = self.closed_tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        });

        if !closed_now {
            return false;
        }

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(client = %self.handle, error = %e, "Shutdown after close failed");
            }
        }
        self.reader.lock().await.take();

        true
    }

    fn transport_error(&self, operation: &'static str, error: &io::Error) -> SocketError {
        tracing::warn!(
            client = %self.handle,
            peer = %self.peer,
            operation = operation,
            error = %error,
            "Transport error"
        );
        SocketError::Transport {
            handle: self.handle,
            operation,
            message: error.to_string(),
        }
    }
}

fn closed_io_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection closed")
}
