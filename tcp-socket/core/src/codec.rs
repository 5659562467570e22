//! Payload Codec
//!
//! Converts between raw wire bytes and the textual forms a host can carry:
//!
//! | Encoding | Encode                         | Decode                                   |
//! |----------|--------------------------------|------------------------------------------|
//! | `utf8`   | bytes must be valid UTF-8      | the string's own UTF-8 bytes             |
//! | `base64` | standard alphabet, padded      | standard alphabet, padding enforced      |
//! | `hex`    | lowercase, two digits per byte | `0x` prefixes and whitespace are ignored |
//!
//! Everything here is pure. The read path goes through [`encode_with_fallback`],
//! which renders invalid UTF-8 as Base64 instead of failing and reports the
//! encoding it actually used.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CodecError;

/// Textual encoding of a payload
///
/// Serialized by its lowercase name. Deserialization goes through [`FromStr`],
/// so `utf-8` and any letter case are accepted wherever an encoding is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8 text
    #[default]
    Utf8,
    /// Standard Base64 with padding
    Base64,
    /// Lowercase hexadecimal, two digits per byte
    Hex,
}

impl Encoding {
    /// All supported encodings
    pub const ALL: [Encoding; 3] = [Encoding::Utf8, Encoding::Base64, Encoding::Hex];

    /// Wire name of the encoding
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Base64 => "base64",
            Self::Hex => "hex",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            other => Err(format!(
                "Unsupported encoding '{other}' (expected utf8, base64 or hex)"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A string together with the encoding it is written in
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPayload {
    /// Encoded text
    pub data: String,
    /// Encoding of `data`
    pub encoding: Encoding,
}

impl EncodedPayload {
    /// Create a payload
    pub fn new(data: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            data: data.into(),
            encoding,
        }
    }

    /// Empty payload tagged with `encoding`
    #[must_use]
    pub fn empty(encoding: Encoding) -> Self {
        Self::new(String::new(), encoding)
    }

    /// Whether the payload carries no data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode back to raw bytes
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decode` if `data` is not valid for `encoding`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        decode(&self.data, self.encoding)
    }
}

/// Render raw bytes in the given encoding
///
/// # Errors
///
/// Returns `CodecError::Encode` when `encoding` is `utf8` and the bytes are not
/// valid UTF-8. Base64 and hex never fail.
pub fn encode(bytes: &[u8], encoding: Encoding) -> Result<String, CodecError> {
    match encoding {
        Encoding::Utf8 => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| CodecError::Encode {
                encoding,
                reason: e.to_string(),
            }),
        Encoding::Base64 => Ok(STANDARD.encode(bytes)),
        Encoding::Hex => Ok(hex::encode(bytes)),
    }
}

/// Render raw bytes in the preferred encoding, degrading `utf8` to `base64`
///
/// The returned payload is tagged with the encoding that was actually used.
#[must_use]
pub fn encode_with_fallback(bytes: &[u8], preferred: Encoding) -> EncodedPayload {
    match preferred {
        Encoding::Utf8 => match std::str::from_utf8(bytes) {
            Ok(text) => EncodedPayload::new(text, Encoding::Utf8),
            Err(_) => EncodedPayload::new(STANDARD.encode(bytes), Encoding::Base64),
        },
        Encoding::Base64 => EncodedPayload::new(STANDARD.encode(bytes), Encoding::Base64),
        Encoding::Hex => EncodedPayload::new(hex::encode(bytes), Encoding::Hex),
    }
}

/// Parse text in the given encoding back to raw bytes
///
/// # Errors
///
/// Returns `CodecError::Decode` on invalid Base64 characters or padding, and on
/// non-hex digits or an odd digit count after hex normalization.
pub fn decode(text: &str, encoding: Encoding) -> Result<Vec<u8>, CodecError> {
    match encoding {
        Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
        Encoding::Base64 => STANDARD.decode(text).map_err(|e| CodecError::Decode {
            encoding,
            reason: e.to_string(),
        }),
        Encoding::Hex => hex::decode(normalize_hex(text)).map_err(|e| CodecError::Decode {
            encoding,
            reason: e.to_string(),
        }),
    }
}

/// Join whitespace-separated groups, dropping a leading `0x`/`0X` from each
fn normalize_hex(text: &str) -> String {
    text.split_whitespace()
        .map(|group| {
            group
                .strip_prefix("0x")
                .or_else(|| group.strip_prefix("0X"))
                .unwrap_or(group)
        })
        .collect()
}
