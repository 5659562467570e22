//! TCP Socket Core - Handle-Based TCP Client Sessions
//!
//! This crate gives an application host a minimal raw TCP client: connect,
//! send, read, disconnect. The host never touches a socket. It holds an
//! integer handle and exchanges payloads as text in one of three encodings
//! (UTF-8, Base64, hex).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Application Host (plugin / RPC)              │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │  JSON params / results
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │                       TcpSocketBridge                        │
//! │        defaults · validation · error codes · dispatch        │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │  ClientHandle + EncodedPayload
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │                       SessionRegistry                        │
//! │   ┌─────────┐  ┌─────────┐  ┌─────────┐       ┌───────────┐  │
//! │   │Session 0│  │Session 1│  │Session 2│  ...  │   codec   │  │
//! │   └─────────┘  └─────────┘  └─────────┘       └───────────┘  │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │  raw bytes (tokio TcpStream)
//!                                ▼
//!                           remote peer
//! ```
//!
//! # Key Types
//!
//! - [`SessionRegistry`]: Owns every connection, resolves handles
//! - [`ClientHandle`]: Opaque, never-reused connection identifier
//! - [`Encoding`] / [`EncodedPayload`]: Text form of wire bytes
//! - [`TcpSocketBridge`]: JSON-facing front end for a host
//! - [`SocketError`]: Failure taxonomy with stable codes
//!
//! # Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use tcp_socket_core::{Encoding, SessionRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tcp_socket_core::SocketError> {
//!     let registry = SessionRegistry::new();
//!
//!     let client = registry.connect("192.168.1.50", 9100).await?;
//!     registry.send(client, "1b40", Encoding::Hex).await?;
//!
//!     let reply = registry
//!         .read(client, 1024, Duration::from_secs(10), Encoding::Utf8)
//!         .await?;
//!     println!("{} ({})", reply.data, reply.encoding);
//!
//!     registry.disconnect(client).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`bridge`]: Host-facing request/response types and method dispatch
//! - [`codec`]: Pure byte/text conversion
//! - [`config`]: Defaults, TOML file and environment overrides
//! - [`error`]: Error types and codes
//! - [`logging`]: Optional `tracing` subscriber setup
//! - [`registry`]: Handle-indexed session store
//! - [`session`]: A single connection and its lifecycle

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod session;

// Re-exports for convenience
pub use bridge::{
    BridgeError, ConnectOptions, ConnectResult, DisconnectOptions, DisconnectResult, ErrorBody,
    ReadOptions, ReadResult, SendOptions, TcpSocketBridge,
};
pub use codec::{decode, encode, encode_with_fallback, EncodedPayload, Encoding};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigSource,
    LoadedConfig, SocketConfig,
};
pub use error::{CodecError, SocketError};
pub use logging::init_logging;
pub use registry::{ClientHandle, SessionRegistry};
pub use session::{Session, SessionState};
