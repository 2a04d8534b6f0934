//! Error types for terminal operations
//!
//! Only configuration-time contract violations surface as errors. Screen
//! and cursor mutation never fail: drift is clamped and unsupported
//! requests (such as shrinking) are refused silently.

use std::io;
use thiserror::Error;

/// Terminal error type
#[derive(Error, Debug)]
pub enum Error {
    /// Zero-sized grid requested
    #[error("Invalid dimensions: {columns}x{rows} (both must be positive)")]
    InvalidDimensions { columns: usize, rows: usize },

    /// Key trap registration with an unusable key
    #[error("Invalid key trap: {0}")]
    InvalidKeyTrap(String),

    /// Operation not allowed once the terminal is closing
    #[error("Terminal is closed")]
    Closed,

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON configuration or snapshot
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for terminal operations
pub type Result<T> = std::result::Result<T, Error>;
