//! Version-3 user security.
//!
//! Implements the user-based security model: password-to-key derivation,
//! HMAC message authentication with in-place splice, DES-CBC and
//! AES-128-CFB-128 privacy, USM parameter encoding, and discovery
//! response parsing.

mod auth;
mod engine;
mod privacy;
mod usm;

pub use auth::{LocalizedKey, sign_message, verify_message};
pub use engine::{EngineState, parse_discovery_response};
pub use privacy::PrivKey;
pub use usm::UsmSecurityParams;

use crate::error::Error;

/// Authentication hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProtocol {
    /// HMAC-MD5-96
    Md5,
    /// HMAC-SHA-96
    Sha1,
}

impl AuthProtocol {
    /// Digest output length in bytes; also the localized key length.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
        }
    }

    /// Truncated MAC length placed in the auth-params field.
    pub fn mac_len(self) -> usize {
        12
    }

    /// Parse a configuration name; the error carries the offending input.
    pub fn parse(name: &str) -> Result<Self, Error> {
        match name.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA" | "SHA1" | "SHA-1" => Ok(Self::Sha1),
            _ => Err(Error::UnknownProtocol {
                which: "authentication",
                name: name.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA1"),
        }
    }
}

impl std::str::FromStr for AuthProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::parse(s)
    }
}

/// Privacy cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivProtocol {
    /// DES-CBC
    Des,
    /// AES-128-CFB-128
    Aes128,
}

impl PrivProtocol {
    /// Parse a configuration name; the error carries the offending input.
    pub fn parse(name: &str) -> Result<Self, Error> {
        match name.to_ascii_uppercase().as_str() {
            "DES" => Ok(Self::Des),
            "AES" | "AES128" | "AES-128" => Ok(Self::Aes128),
            _ => Err(Error::UnknownProtocol {
                which: "privacy",
                name: name.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Des => write!(f, "DES"),
            Self::Aes128 => write!(f, "AES"),
        }
    }
}

impl std::str::FromStr for PrivProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::parse(s)
    }
}
