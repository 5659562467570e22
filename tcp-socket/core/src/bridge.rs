//! Host Bridge
//!
//! Boundary surface between an application host (plugin runtime, RPC layer,
//! UI shell) and the [`SessionRegistry`]. The host speaks JSON objects with
//! camelCase keys; this module fills in defaults, validates, forwards to the
//! registry and renders results and failures back to JSON.
//!
//! | Method       | Params                                         | Result                 |
//! |--------------|------------------------------------------------|------------------------|
//! | `connect`    | `ipAddress`, `port?`                           | `{ client }`           |
//! | `send`       | `client`, `data?`, `encoding?`                 | `null`                 |
//! | `read`       | `client`, `expectLen?`, `timeout?`, `encoding?`| `{ result, encoding }` |
//! | `disconnect` | `client`                                       | `{ client }`           |
//!
//! Omitted values come from [`SocketConfig`]: port 9100, `expectLen` 1024,
//! `timeout` 10 seconds, encoding `utf8`.

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::codec::Encoding;
use crate::config::SocketConfig;
use crate::error::SocketError;
use crate::registry::{ClientHandle, SessionRegistry};

/// Method name not recognized by the bridge.
pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
/// Result could not be rendered.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

// =============================================================================
// Request / Response Types
// =============================================================================

/// Parameters for `connect`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectOptions {
    /// Host to connect to
    pub ip_address: Option<String>,
    /// Port to connect to
    pub port: Option<u16>,
}

/// Result of `connect`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResult {
    /// Handle for subsequent calls
    pub client: ClientHandle,
}

/// Parameters for `send`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendOptions {
    /// Handle from a previous `connect`
    pub client: Option<i64>,
    /// Payload text
    pub data: Option<String>,
    /// Encoding of `data`
    pub encoding: Option<Encoding>,
}

/// Parameters for `read`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadOptions {
    /// Handle from a previous `connect`
    pub client: Option<i64>,
    /// Maximum number of bytes to read
    pub expect_len: Option<i64>,
    /// Read timeout in seconds
    pub timeout: Option<u64>,
    /// Preferred encoding of the result
    pub encoding: Option<Encoding>,
}

/// Result of `read`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResult {
    /// Data read, empty if none arrived
    pub result: String,
    /// Encoding actually used for `result`
    pub encoding: Encoding,
}

/// Parameters for `disconnect`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisconnectOptions {
    /// Handle from a previous `connect`
    pub client: Option<i64>,
}

/// Result of `disconnect`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectResult {
    /// The handle that was disconnected
    pub client: ClientHandle,
}

/// Structured error rendered back to the host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. `INVALID_HANDLE`)
    pub code: String,
    /// Human-readable message
    pub message: String,
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors returned by [`TcpSocketBridge::dispatch`]
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The session operation failed
    #[error(transparent)]
    Socket(#[from] SocketError),

    /// No such method
    #[error("Unknown method: {0}")]
    MethodNotFound(String),

    /// Result could not be serialized
    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Machine-readable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Socket(e) => e.code(),
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::Serialization(_) => INTERNAL_ERROR,
        }
    }

    /// Render as an error body for the host
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

// =============================================================================
// Bridge
// =============================================================================

/// Host-facing front end for a [`SessionRegistry`]
#[derive(Clone)]
pub struct TcpSocketBridge {
    registry: SessionRegistry,
}

impl Default for TcpSocketBridge {
    fn default() -> Self {
        Self::new(SessionRegistry::new())
    }
}

impl TcpSocketBridge {
    /// Serve calls against an existing registry
    #[must_use]
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Serve calls against a fresh registry built from `config`
    #[must_use]
    pub fn from_config(config: SocketConfig) -> Self {
        Self::new(SessionRegistry::with_config(config))
    }

    /// The underlying registry
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn config(&self) -> &SocketConfig {
        self.registry.config()
    }

    /// Open a connection
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `ipAddress` is missing or empty, `Connection`
    /// when the connection cannot be established.
    pub async fn connect(&self, options: ConnectOptions) -> Result<ConnectResult, SocketError> {
        let address = options.ip_address.unwrap_or_default();
        let port = options.port.unwrap_or(self.config().default_port);

        let client = self.registry.connect(&address, port).await?;
        Ok(ConnectResult { client })
    }

    /// Send a payload
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `client` is missing, `InvalidHandle`, `Codec` or
    /// `Transport` as reported by the registry.
    pub async fn send(&self, options: SendOptions) -> Result<(), SocketError> {
        let client = client_handle(options.client)?;
        let data = options.data.unwrap_or_default();
        let encoding = options.encoding.unwrap_or(self.config().default_encoding);

        self.registry.send(client, &data, encoding).await
    }

    /// Read from a connection
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `client` is missing or `expectLen` is not
    /// positive, `InvalidHandle` or `Transport` as reported by the registry.
    pub async fn read(&self, options: ReadOptions) -> Result<ReadResult, SocketError> {
        let client = client_handle(options.client)?;
        let expect_len = match options.expect_len {
            None => self.config().default_read_len,
            Some(len) => usize::try_from(len)
                .ok()
                .filter(|len| *len > 0)
                .ok_or_else(|| {
                    SocketError::InvalidArgument(format!("expectLen must be positive, got {len}"))
                })?,
        };
        let timeout = options
            .timeout
            .map_or_else(|| self.config().default_read_timeout(), Duration::from_secs);
        let encoding = options.encoding.unwrap_or(self.config().default_encoding);

        let payload = self
            .registry
            .read(client, expect_len, timeout, encoding)
            .await?;

        Ok(ReadResult {
            result: payload.data,
            encoding: payload.encoding,
        })
    }

    /// Close a connection
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `client` is missing, `InvalidHandle` when it was
    /// never issued.
    pub async fn disconnect(
        &self,
        options: DisconnectOptions,
    ) -> Result<DisconnectResult, SocketError> {
        let client = client_handle(options.client)?;
        let client = self.registry.disconnect(client).await?;
        Ok(DisconnectResult { client })
    }

    /// Route a host call by method name
    ///
    /// `params` may be `null` for methods whose fields are all optional.
    ///
    /// # Errors
    ///
    /// `MethodNotFound` for unknown methods; malformed params surface as
    /// `InvalidArgument`; everything else as reported by the operation.
    pub async fn dispatch(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        tracing::debug!(method = method, "Dispatching host call");

        let result = match method {
            "connect" => serde_json::to_value(self.connect(parse_params(params)?).await?)?,
            "send" => {
                self.send(parse_params(params)?).await?;
                Value::Null
            }
            "read" => serde_json::to_value(self.read(parse_params(params)?).await?)?,
            "disconnect" => serde_json::to_value(self.disconnect(parse_params(params)?).await?)?,
            other => return Err(BridgeError::MethodNotFound(other.to_string())),
        };

        Ok(result)
    }
}

fn parse_params<T: DeserializeOwned + Default>(params: Value) -> Result<T, SocketError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params)
        .map_err(|e| SocketError::InvalidArgument(format!("Invalid parameters: {e}")))
}

fn client_handle(client: Option<i64>) -> Result<ClientHandle, SocketError> {
    let raw = client.ok_or_else(|| SocketError::InvalidArgument("No client specified".into()))?;
    u32::try_from(raw)
        .map(ClientHandle::from_raw)
        .map_err(|_| SocketError::InvalidHandle {
            handle: raw,
            reason: "no such client",
        })
}
