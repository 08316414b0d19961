// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the messaging runtime.
//!
//! Two layers:
//! - [`ErrorCode`]: the symbolic, wire-stable error taxonomy carried in
//!   typed error replies and round-tripped through strings.
//! - [`Error`]: the crate-level error with detail, returned by every
//!   fallible operation via [`Result`].

use std::fmt;
use std::io;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Symbolic error taxonomy, stable across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ErrorCode {
    /// No error
    #[default]
    Success = 0,
    /// Malformed or empty URL / endpoint
    BadAddress = 1,
    /// Name resolution produced no usable entry
    HostNotFound = 2,
    /// TCP connection actively refused
    ConnectionRefused = 3,
    /// Operation exceeded its deadline
    TimedOut = 4,
    /// Operation cancelled cooperatively
    Cancelled = 5,
    /// Socket closed while calls were in flight
    Disconnected = 6,
    /// TLS handshake failure
    HandshakeFailed = 7,
    /// Framing violation or unknown message type
    ProtocolError = 8,
    /// Unknown service, object or method
    NotFound = 9,
    /// Value conversion between descriptors failed
    ConversionFailed = 10,
    /// Narrowing numeric conversion out of range
    Overflow = 11,
}

impl ErrorCode {
    /// Convert from the wire representation. Unknown values map to
    /// `ProtocolError`.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::BadAddress,
            2 => Self::HostNotFound,
            3 => Self::ConnectionRefused,
            4 => Self::TimedOut,
            5 => Self::Cancelled,
            6 => Self::Disconnected,
            7 => Self::HandshakeFailed,
            8 => Self::ProtocolError,
            9 => Self::NotFound,
            10 => Self::ConversionFailed,
            11 => Self::Overflow,
            _ => Self::ProtocolError,
        }
    }

    /// Wire representation.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Stable textual name, accepted back by [`ErrorCode::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BadAddress => "bad address",
            Self::HostNotFound => "host not found",
            Self::ConnectionRefused => "connection refused",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
            Self::Disconnected => "disconnected",
            Self::HandshakeFailed => "handshake failed",
            Self::ProtocolError => "protocol error",
            Self::NotFound => "not found",
            Self::ConversionFailed => "conversion failed",
            Self::Overflow => "overflow",
        }
    }

    /// Decode a textual error back into the taxonomy.
    ///
    /// Returns `None` for strings that are not produced by [`name`]:
    /// callers treat that as a programming error and must not guess.
    ///
    /// [`name`]: ErrorCode::name
    pub fn from_name(s: &str) -> Option<Self> {
        const ALL: [ErrorCode; 12] = [
            ErrorCode::Success,
            ErrorCode::BadAddress,
            ErrorCode::HostNotFound,
            ErrorCode::ConnectionRefused,
            ErrorCode::TimedOut,
            ErrorCode::Cancelled,
            ErrorCode::Disconnected,
            ErrorCode::HandshakeFailed,
            ErrorCode::ProtocolError,
            ErrorCode::NotFound,
            ErrorCode::ConversionFailed,
            ErrorCode::Overflow,
        ];
        ALL.iter().copied().find(|c| c.name() == s)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by the runtime.
///
/// Resolvers and connectors never panic; they complete their future or
/// callback with one of these. The value layer returns them for
/// programmer-facing misuse (wrong-kind access, out-of-range index).
#[derive(Debug)]
pub enum Error {
    /// Invalid URL or endpoint string
    BadAddress(String),

    /// Resolution yielded no admissible entry
    HostNotFound(String),

    /// TCP connect refused by the peer
    ConnectionRefused(String),

    /// Deadline exceeded
    TimedOut,

    /// Cooperative cancellation observed
    Cancelled,

    /// Socket went away; in-flight calls complete with this
    Disconnected(String),

    /// TLS handshake failure, surfaced verbatim
    HandshakeFailed(String),

    /// Framing violation, unknown message kind, or broken invariant
    Protocol(String),

    /// Unknown service, object, method or signal
    NotFound(String),

    /// The conversion engine could not produce a value
    ConversionFailed(String),

    /// Narrowing numeric conversion out of range
    Overflow(String),

    /// Wrong-kind access on a Value (e.g. `to_int` on a string)
    KindMismatch { expected: &'static str, got: &'static str },

    /// Underlying socket error
    Io(io::Error),
}

impl Error {
    /// Map to the symbolic taxonomy carried on the wire.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadAddress(_) => ErrorCode::BadAddress,
            Self::HostNotFound(_) => ErrorCode::HostNotFound,
            Self::ConnectionRefused(_) => ErrorCode::ConnectionRefused,
            Self::TimedOut => ErrorCode::TimedOut,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Disconnected(_) => ErrorCode::Disconnected,
            Self::HandshakeFailed(_) => ErrorCode::HandshakeFailed,
            Self::Protocol(_) => ErrorCode::ProtocolError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::ConversionFailed(_) => ErrorCode::ConversionFailed,
            Self::Overflow(_) => ErrorCode::Overflow,
            Self::KindMismatch { .. } => ErrorCode::ConversionFailed,
            Self::Io(e) => match e.kind() {
                io::ErrorKind::ConnectionRefused => ErrorCode::ConnectionRefused,
                io::ErrorKind::TimedOut => ErrorCode::TimedOut,
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => ErrorCode::Disconnected,
                _ => ErrorCode::ProtocolError,
            },
        }
    }

    /// Build an error from a wire (code, message) pair.
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ErrorCode::Success => Self::Protocol("from_code called with success".to_string()),
            ErrorCode::BadAddress => Self::BadAddress(message),
            ErrorCode::HostNotFound => Self::HostNotFound(message),
            ErrorCode::ConnectionRefused => Self::ConnectionRefused(message),
            ErrorCode::TimedOut => Self::TimedOut,
            ErrorCode::Cancelled => Self::Cancelled,
            ErrorCode::Disconnected => Self::Disconnected(message),
            ErrorCode::HandshakeFailed => Self::HandshakeFailed(message),
            ErrorCode::ProtocolError => Self::Protocol(message),
            ErrorCode::NotFound => Self::NotFound(message),
            ErrorCode::ConversionFailed => Self::ConversionFailed(message),
            ErrorCode::Overflow => Self::Overflow(message),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAddress(s) => write!(f, "bad address: {}", s),
            Self::HostNotFound(s) => write!(f, "host not found: {}", s),
            Self::ConnectionRefused(s) => write!(f, "connection refused: {}", s),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Disconnected(s) => write!(f, "disconnected: {}", s),
            Self::HandshakeFailed(s) => write!(f, "handshake failed: {}", s),
            Self::Protocol(s) => write!(f, "protocol error: {}", s),
            Self::NotFound(s) => write!(f, "not found: {}", s),
            Self::ConversionFailed(s) => write!(f, "conversion failed: {}", s),
            Self::Overflow(s) => write!(f, "overflow: {}", s),
            Self::KindMismatch { expected, got } => {
                write!(f, "kind mismatch: expected {}, got {}", expected, got)
            }
            Self::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip_u32() {
        for v in 0..=11u32 {
            let code = ErrorCode::from_u32(v);
            assert_eq!(code.as_u32(), v);
        }
        assert_eq!(ErrorCode::from_u32(999), ErrorCode::ProtocolError);
    }

    #[test]
    fn code_roundtrip_name() {
        let all = [
            ErrorCode::Success,
            ErrorCode::BadAddress,
            ErrorCode::HostNotFound,
            ErrorCode::ConnectionRefused,
            ErrorCode::TimedOut,
            ErrorCode::Cancelled,
            ErrorCode::Disconnected,
            ErrorCode::HandshakeFailed,
            ErrorCode::ProtocolError,
            ErrorCode::NotFound,
            ErrorCode::ConversionFailed,
            ErrorCode::Overflow,
        ];
        for code in all {
            assert_eq!(ErrorCode::from_name(code.name()), Some(code));
        }
        assert_eq!(ErrorCode::from_name("no such error"), None);
    }

    #[test]
    fn io_error_mapping() {
        let e = Error::from(io::Error::new(io::ErrorKind::ConnectionRefused, "nope"));
        assert_eq!(e.code(), ErrorCode::ConnectionRefused);

        let e = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(e.code(), ErrorCode::Disconnected);
    }

    #[test]
    fn from_code_preserves_taxonomy() {
        let e = Error::from_code(ErrorCode::NotFound, "service 'calc'");
        assert_eq!(e.code(), ErrorCode::NotFound);
        assert!(e.to_string().contains("calc"));
    }
}
