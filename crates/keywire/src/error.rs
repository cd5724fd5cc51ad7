//! Error types for scanning and decoding.
//!
//! Only data errors surface here: malformed token text and dictionary
//! inconsistencies. Precondition violations (an out-of-bounds scan index, a
//! non-array input to the element indexer) are programming errors and panic
//! instead, and internal invariant breaks are treated as assertion failures.

use thiserror::Error;

use crate::dictionary::{GeneralKeyId, ShapeId};

/// The boundary scan could not delimit an array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    /// No depth-zero terminator was found for the element starting at the
    /// given byte index. This covers unterminated brackets and strings as
    /// well as empty slots such as `"[]"` or a trailing comma.
    #[error("array element starting at index {0} has no terminator")]
    UnterminatedElement(usize),
}

/// Decoding a compressed token failed.
///
/// All variants are reported synchronously by [`MessageCodec::decompress`];
/// nothing is retried internally. An unknown id means the decoder's
/// dictionary is stale relative to the encoder; requesting a fresh snapshot
/// is the host's concern.
///
/// [`MessageCodec::decompress`]: crate::MessageCodec::decompress
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The token body could not be split into elements.
    #[error("malformed token body: {0}")]
    Scan(#[from] ScanError),

    /// A general-message body must hold alternating key-id/value pairs.
    #[error("general message body has {0} elements, expected an even count")]
    OddElementCount(usize),

    /// A key slot did not parse as a decimal key id.
    #[error("invalid general key id {0:?}")]
    InvalidKeyId(String),

    /// The token references a general key the local dictionary has not seen.
    #[error("no general key registered for id {0}")]
    UnknownKeyId(GeneralKeyId),

    /// The token references a shape the local dictionary has not seen.
    #[error("no message shape registered for id {0}")]
    UnknownShapeId(ShapeId),

    /// A shape token must carry exactly one value per shape key.
    #[error("shape {id} has {expected} keys but the token carries {found} values")]
    ShapeArityMismatch {
        id: ShapeId,
        expected: usize,
        found: usize,
    },

    /// A value slot held neither a nested token nor valid literal JSON.
    #[error("invalid literal value {text:?}: {reason}")]
    InvalidLiteral { text: String, reason: String },

    /// The leading decimal id does not fit the id type.
    #[error("token id {0:?} is out of range")]
    TokenIdOutOfRange(String),
}
