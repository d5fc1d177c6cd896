//! Error types for archive operations.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for store and archive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of the stream
    #[error("Invalid archive: expected OBJ magic bytes")]
    InvalidMagic,

    /// Archive was written by a newer format revision
    #[error("Unsupported archive format version: {0}")]
    UnsupportedVersion(u16),

    /// Stream is truncated or corrupted
    #[error("Unexpected end of stream at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in the stream
    #[error("Invalid archive structure: {0}")]
    InvalidStructure(String),

    /// Store was opened for reading (or cannot be written at all)
    #[error("Store is read-only")]
    ReadOnly,

    /// Store was opened for writing (or cannot be read at all)
    #[error("Store is write-only")]
    WriteOnly,

    /// Operation on a store that has not been opened
    #[error("Store is not open")]
    NotOpen,

    /// Seek target lies beyond the addressable length
    #[error("Seek to {pos} out of bounds (length: {len})")]
    SeekOutOfBounds { pos: u64, len: u64 },

    /// Operation not permitted in the archive's mode
    #[error("Operation requires {expected} mode, archive is in {actual} mode")]
    WrongMode { expected: String, actual: String },

    /// Archive failed to open or an earlier operation failed
    #[error("Archive is not valid")]
    InvalidArchive,

    /// Class name not present in the registry or the archive's class table
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Loaded object is not derived from the expected class
    #[error("Class {actual} is not a kind of {expected}")]
    NotKindOf { expected: String, actual: String },

    /// Name index or name not present in the archive's name table
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// Save pass diverged from the directory recorded by the directory pass
    #[error("Directory mismatch: {0}")]
    DirectoryMismatch(String),

    /// Object was already mutably borrowed while being streamed
    #[error("Object is already borrowed: {0}")]
    BorrowConflict(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a directory mismatch error.
    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::DirectoryMismatch(msg.into())
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;
