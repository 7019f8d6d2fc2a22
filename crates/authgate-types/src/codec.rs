//! Codec trait and implementations for cache values.
//!
//! The cache stores raw bytes. The session layer doesn't care HOW its
//! records are serialized; it just needs something that implements the
//! [`Codec`] trait. [`JsonCodec`] is the default because cached sessions
//! stay readable from a cache shell (`GET access_token:...`).

use serde::{Serialize, de::DeserializeOwned};

use crate::CodecError;

/// A codec that can encode records to bytes and decode bytes back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the codec lives inside the coordinator, which is shared
///   across request tasks.
/// - `'static` → the codec owns everything it needs.
///
/// `decode` requires `DeserializeOwned` so the decoded record doesn't borrow
/// from the cache buffer; the buffer is dropped right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a record into bytes.
    ///
    /// # Errors
    /// Returns `CodecError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes bytes back into a record.
    ///
    /// # Errors
    /// Returns `CodecError::Decode` if the bytes are malformed or don't match
    /// the expected record layout.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use authgate_types::{Codec, JsonCodec, Platform, SessionId, SessionInfo, UserId};
///
/// let codec = JsonCodec;
/// let session = SessionInfo::new(
///     UserId(42),
///     Platform::new("web"),
///     SessionId::new("42-abc"),
///     "a".repeat(40),
///     "r".repeat(40),
/// );
///
/// let bytes = codec.encode(&session).unwrap();
/// let decoded: SessionInfo = codec.decode(&bytes).unwrap();
/// assert_eq!(session, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ResetTicket, UserId};

    #[test]
    fn test_decode_truncated_bytes_returns_decode_error() {
        let codec = JsonCodec;
        let bytes = codec
            .encode(&ResetTicket {
                user_id: UserId(7),
                code: "123456".into(),
            })
            .unwrap();

        let result: Result<ResetTicket, _> =
            codec.decode(&bytes[..bytes.len() / 2]);

        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_wrong_record_type_returns_decode_error() {
        let codec = JsonCodec;
        let bytes = codec.encode(&"just a string").unwrap();

        let result: Result<ResetTicket, _> = codec.decode(&bytes);

        assert!(result.is_err(), "a bare string is not a reset ticket");
    }
}
