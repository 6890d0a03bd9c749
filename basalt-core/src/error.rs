//! # Error Handling
//!
//! Error types for BasaltDB operations.
//!
//! ## Design Principles
//!
//! 1. **Precise**: low-level decoders surface exact failure kinds
//! 2. **Contextual**: table-level errors carry the blob id they came from
//! 3. **Recoverable**: distinguish data errors from programmer errors

use thiserror::Error;

/// Result type alias for BasaltDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for BasaltDB
#[derive(Error, Debug)]
pub enum Error {
    /// Sealing a block builder that holds no entries. A programmer error,
    /// not a data error.
    #[error("empty block")]
    EmptyBlock,

    /// The CRC32 stored with an encoded block does not match its payload.
    /// Fatal for the block, not for the table it came from.
    #[error("block checksum failed")]
    ChecksumFailed,

    #[error("corrupt block: {reason}")]
    CorruptBlock { reason: String },

    #[error("invalid compression codec")]
    InvalidCodec,

    /// The table trailer, info, or index is inconsistent with the blob.
    #[error("corrupt table {id}: {reason}")]
    CorruptTable { id: String, reason: String },

    #[error("insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("key not found")]
    KeyNotFound,

    #[error("invalid block range [{start}, {end})")]
    InvalidBlockRange { start: u64, end: u64 },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::KeyNotFound => true,
            Error::Io { .. } => true,
            Error::ChecksumFailed => false,
            Error::CorruptBlock { .. } => false,
            Error::CorruptTable { .. } => false,
            _ => false,
        }
    }

    /// Get error code for monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::EmptyBlock => "EMPTY_BLOCK",
            Error::ChecksumFailed => "CHECKSUM_FAILED",
            Error::CorruptBlock { .. } => "CORRUPT_BLOCK",
            Error::InvalidCodec => "INVALID_CODEC",
            Error::CorruptTable { .. } => "CORRUPT_TABLE",
            Error::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Error::KeyNotFound => "KEY_NOT_FOUND",
            Error::InvalidBlockRange { .. } => "INVALID_BLOCK_RANGE",
            Error::Io { .. } => "IO_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Attach the originating blob id to a `CorruptTable` error. Other
    /// kinds pass through unchanged so precise kinds survive wrapping.
    pub fn with_table_id(self, id: impl Into<String>) -> Error {
        match self {
            Error::CorruptTable { reason, .. } => Error::CorruptTable {
                id: id.into(),
                reason,
            },
            other => other,
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}
