//! Error types for snmpoll.
//!
//! One [`Error`] enum covers every failure the library reports, with kind
//! sub-enums for the codec ([`DecodeErrorKind`]), cryptography
//! ([`CryptoErrorKind`]) and OID parsing ([`OidErrorKind`]). Agent-reported
//! protocol errors are carried as [`ErrorStatus`].
//!
//! All enums are `#[non_exhaustive]` so variants can be added without a
//! breaking release.

use std::io;
use std::time::Duration;

/// Result type alias using the library's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Codec error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// Input ended before the declared structure did.
    Truncated,
    /// Length field is syntactically invalid (zero-octet long form,
    /// more than four length octets, or absurdly large).
    MalformedLength,
    /// Indefinite-length encoding (0x80), which SNMP forbids.
    IndefiniteLength,
    /// Tag differs from what the structure requires.
    UnexpectedTag { expected: u8, actual: u8 },
    /// PDU tag outside the 0xA0..=0xA8 range.
    UnknownPduType(u8),
    /// Version integer that names no known protocol version.
    UnknownVersion(i32),
    /// A numeric field overflowed its type (OID subidentifier > u32,
    /// Counter64 wider than 9 octets).
    IntegerOverflow,
    /// INTEGER with empty contents.
    ZeroLengthInteger,
    /// NULL with non-zero length.
    InvalidNull,
    /// IpAddress whose contents are not exactly 4 octets.
    InvalidIpAddressLength { length: usize },
    /// msgFlags byte claims privacy without authentication.
    InvalidMsgFlags,
    /// msgSecurityModel other than USM (3).
    UnknownSecurityModel(i32),
    /// OID with more subidentifiers than the protocol allows.
    OidTooLong { count: usize, max: usize },
    /// Discovery reply carried an empty authoritative engine ID.
    EmptyEngineId,
    /// Response PDU carried no varbinds where one was required.
    EmptyVarBinds,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated input"),
            Self::MalformedLength => write!(f, "malformed length field"),
            Self::IndefiniteLength => write!(f, "indefinite length not permitted"),
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "unexpected tag 0x{actual:02X} (expected 0x{expected:02X})")
            }
            Self::UnknownPduType(tag) => write!(f, "unknown PDU type 0x{tag:02X}"),
            Self::UnknownVersion(v) => write!(f, "unknown protocol version {v}"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::ZeroLengthInteger => write!(f, "zero-length integer"),
            Self::InvalidNull => write!(f, "NULL with non-zero length"),
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IP address must be 4 bytes, got {length}")
            }
            Self::InvalidMsgFlags => write!(f, "privacy flag set without authentication"),
            Self::UnknownSecurityModel(m) => write!(f, "unknown security model {m}"),
            Self::OidTooLong { count, max } => {
                write!(f, "OID has {count} subidentifiers (maximum {max})")
            }
            Self::EmptyEngineId => write!(f, "authoritative engine ID is empty"),
            Self::EmptyVarBinds => write!(f, "response carries no varbinds"),
        }
    }
}

/// Encryption/decryption error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CryptoErrorKind {
    /// DES ciphertext length is not a multiple of the block size.
    BadCipherLength { length: usize, block_size: usize },
    /// Privacy parameters (salt) are not 8 bytes.
    InvalidPrivParamsLength { actual: usize },
    /// Key material too short for the cipher.
    InvalidKeyLength,
    /// The underlying cipher rejected the operation.
    CipherFailure,
}

impl std::fmt::Display for CryptoErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadCipherLength { length, block_size } => {
                write!(f, "ciphertext length {length} is not a multiple of {block_size}")
            }
            Self::InvalidPrivParamsLength { actual } => {
                write!(f, "privacy parameters must be 8 bytes, got {actual}")
            }
            Self::InvalidKeyLength => write!(f, "invalid key length for cipher"),
            Self::CipherFailure => write!(f, "cipher operation failed"),
        }
    }
}

/// OID parsing error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OidErrorKind {
    /// A dotted component was empty, non-numeric, or exceeded u32.
    InvalidArc,
    /// First arc must be 0, 1, or 2.
    InvalidFirstArc(u32),
    /// Second arc must be <= 39 when the first arc is 0 or 1.
    InvalidSecondArc { first: u32, second: u32 },
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArc => write!(f, "component is not a decimal u32"),
            Self::InvalidFirstArc(a) => write!(f, "first arc {a} must be 0, 1, or 2"),
            Self::InvalidSecondArc { first, second } => {
                write!(f, "second arc {second} must be <= 39 when first arc is {first}")
            }
        }
    }
}

/// SNMP protocol error statuses returned by agents (RFC 3416).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    /// Operation completed successfully (status = 0).
    NoError,
    /// Response would be too large for transport (status = 1).
    TooBig,
    /// Requested OID not found (status = 2). SNMPv1 only.
    NoSuchName,
    /// Invalid value in a request (status = 3).
    BadValue,
    /// Attempted to write a read-only object (status = 4).
    ReadOnly,
    /// Unspecified error (status = 5).
    GenErr,
    /// Access denied (status = 6).
    NoAccess,
    /// Access denied by view-based access control (status = 16).
    AuthorizationError,
    /// Unknown or future status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from the raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            16 => Self::AuthorizationError,
            other => Self::Unknown(other),
        }
    }

    /// Convert to the raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::AuthorizationError => 16,
            Self::Unknown(v) => *v,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::TooBig => write!(f, "tooBig"),
            Self::NoSuchName => write!(f, "noSuchName"),
            Self::BadValue => write!(f, "badValue"),
            Self::ReadOnly => write!(f, "readOnly"),
            Self::GenErr => write!(f, "genErr"),
            Self::NoAccess => write!(f, "noAccess"),
            Self::AuthorizationError => write!(f, "authorizationError"),
            Self::Unknown(v) => write!(f, "unknown({v})"),
        }
    }
}

/// The main error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error while opening or resolving the target socket.
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: io::Error,
    },

    /// Every attempt of the send/receive loop failed; carries the last
    /// per-attempt error.
    #[error("transport failed after {attempts} attempt(s) ({timeout:?} each): {source}")]
    Transport {
        attempts: u32,
        timeout: Duration,
        #[source]
        source: io::Error,
    },

    /// Malformed wire data.
    #[error("decode error at offset {offset}: {kind}")]
    Decode { offset: usize, kind: DecodeErrorKind },

    /// OID text could not be parsed.
    #[error("invalid OID{}: {kind}", input.as_deref().map(|s| format!(" '{s}'")).unwrap_or_default())]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<String>,
    },

    /// Encryption or decryption failed.
    #[error("crypto error: {kind}")]
    Crypto { kind: CryptoErrorKind },

    /// Unknown authentication or privacy algorithm name at session
    /// construction.
    #[error("unknown {which} algorithm '{name}'")]
    UnknownProtocol { which: &'static str, name: String },

    /// A v3 request was issued before `discover()` completed.
    #[error("engine parameters unknown; run discovery before v3 requests")]
    NotDiscovered,

    /// A v3 reply arrived without authentication or privacy parameters.
    #[error("reply is not authenticated and encrypted")]
    UnauthenticatedReply,

    /// The user named in an inbound v3 trap has no configured credentials.
    #[error("no trap credentials configured for user '{user}'")]
    UnknownTrapUser { user: String },

    /// Strict mode: the response request-id does not match the request.
    #[error("request id mismatch: expected {expected}, got {actual}")]
    RequestIdMismatch { expected: i32, actual: i32 },

    /// HMAC verification of a reply or trap failed.
    #[error("message authentication failed")]
    AuthenticationFailed,

    /// The agent answered with a non-zero error status.
    #[error("agent returned {status} at index {index}")]
    Snmp { status: ErrorStatus, index: i32 },
}

impl Error {
    /// Build a decode error at the given input offset.
    pub(crate) fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Build a crypto error.
    pub(crate) fn crypto(kind: CryptoErrorKind) -> Self {
        Self::Crypto { kind }
    }

    /// Build an OID error without the offending input.
    pub(crate) fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    /// Build an OID error carrying the offending input text.
    pub(crate) fn invalid_oid_with_input(kind: OidErrorKind, input: String) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input),
        }
    }
}
