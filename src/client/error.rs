// ABOUTME: CMPP client error types and the per-submission status taxonomy
// ABOUTME: Maps SUBMIT_RESP result codes onto the statuses callers act upon

use crate::codec::CodecError;
use std::io;
use thiserror::Error;

/// Error type for CMPP client operations
///
/// Covers connection management and protocol encoding. Per-submission
/// outcomes are reported through [`SendStatus`] instead, so that a partially
/// delivered long message can carry both a status and the message ids
/// already acknowledged.
#[derive(Debug, Error)]
pub enum CmppError {
    /// I/O error during network operations (connect, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// Frame encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Connection closed unexpectedly
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// Malformed or unclassifiable failure
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for CMPP operations
pub type CmppResult<T> = Result<T, CmppError>;

impl From<Box<dyn std::error::Error + Send + Sync>> for CmppError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match err.downcast::<io::Error>() {
            Ok(io_err) => CmppError::Connection(*io_err),
            Err(err) => match err.downcast::<CodecError>() {
                Ok(codec_err) => CmppError::Codec(*codec_err),
                Err(err) => CmppError::InvalidData(err.to_string()),
            },
        }
    }
}

/// Outcome of one send call, or of one fragment within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Every fragment was accepted by the gateway
    Success,
    /// Unclassified failure (empty content, unrecognized result code)
    Unknown,
    /// No gateway receipt arrived within the per-submission deadline
    Timeout,
    /// Gateway back-pressure, or the client-side admission gate refused
    Congested,
    /// Content exceeds the fragment cap, or long messages are disabled
    MessageTooLong,
    /// Credentials or submission fields rejected by the gateway
    ConfigError,
    /// Client has been disposed
    NotConnected,
}

impl SendStatus {
    /// Map a SUBMIT_RESP result code onto a status.
    pub fn from_result(result: u32) -> SendStatus {
        match result {
            0 => SendStatus::Success,
            4 => SendStatus::MessageTooLong,
            8 => SendStatus::Congested,
            10..=13 => SendStatus::ConfigError,
            _ => SendStatus::Unknown,
        }
    }
}
