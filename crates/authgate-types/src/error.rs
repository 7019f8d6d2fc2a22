//! Error types for the codec layer.

/// Errors that can occur while turning cache records into bytes and back.
///
/// A `CodecError` coming out of a cache read almost always means the stored
/// value was written by an incompatible version, so callers treat it as an
/// internal fault rather than as "no session".
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed (turning a record into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a record).
    ///
    /// Common causes: a truncated value, or a record written with a
    /// different field layout.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bytes decoded, but the record is not usable.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
