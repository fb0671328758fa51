//! Error types for the IMAP core.

use thiserror::Error;

use crate::types::{ResponseStatus, Status};

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Malformed bytes in a server response.
    ///
    /// Fatal for the session: once a response fails to parse, the stream
    /// position is no longer trustworthy and the reader shuts down.
    #[error("parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset into the response stream where parsing failed.
        position: u64,
        /// What was expected and what arrived instead.
        message: String,
    },

    /// The server answered a command with NO or BAD.
    ///
    /// Not fatal; the session accepts further commands. The full response
    /// rides along so callers can still inspect any unsolicited data that
    /// arrived with it.
    #[error("imap: {status} {text}")]
    Imap {
        /// The NO or BAD result.
        status: Status,
        /// Human-readable text from the server.
        text: String,
        /// The complete status response, extras included.
        response: Box<ResponseStatus>,
    },

    /// A command was issued while another was still in flight.
    #[error("a command is already in flight on this session")]
    CommandInFlight,

    /// A caller-supplied string cannot be sent as a quoted argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The background reader terminated before the command completed.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The server violated the protocol (bad greeting, wrong tag).
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
