//! Error types for wire parsing.
//!
//! Frame-level errors are recoverable by design: the state machines count
//! them and carry on as if the packet were lost (see the error classes in
//! the host crate). Nothing here aborts a call.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while parsing or assembling wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Datagram shorter than its fixed layout requires.
    #[error("datagram too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Bytes the layout requires
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },

    /// Leading tag bytes did not match any known packet type.
    #[error("unrecognized packet tag")]
    InvalidTag,

    /// DMR slot number outside {1, 2}.
    #[error("invalid DMR slot number: {0}")]
    InvalidSlot(u8),

    /// DMR data type nibble with no assigned meaning.
    #[error("unknown DMR data type: {0:#04x}")]
    UnknownDataType(u8),

    /// P25 data unit identifier with no assigned meaning.
    #[error("unknown P25 DUID: {0:#04x}")]
    UnknownDuid(u8),

    /// An LDU record magic byte was present but wrong.
    ///
    /// An all-zero record window is *not* this error - that is a lost voice
    /// slot, patched later by silence substitution.
    #[error("LDU record prefix mismatch at offset {offset}: found {found:#04x}")]
    LduPrefix {
        /// Offset of the bad magic byte within the record
        offset: usize,
        /// The byte found there
        found: u8,
    },

    /// Trailing checksum did not match the record content.
    #[error("record checksum mismatch")]
    Checksum,

    /// A codeword had more errors than its code can correct.
    #[error("uncorrectable codeword")]
    Uncorrectable,
}
