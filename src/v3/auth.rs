//! Authentication key derivation and HMAC operations.
//!
//! Key derivation expands the password to 1 MiB by repetition, hashes it
//! to a master key, then binds the master key to the engine:
//! `Kul = H(Ku || engine_id || Ku)`. Message authentication is standard
//! HMAC truncated to 12 bytes, computed over the serialized message with
//! the auth-params slot zeroed and spliced into that slot afterwards.

use digest::{Digest, OutputSizeUser};
use hmac::{Hmac, Mac};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AuthProtocol;

/// Localized authentication key: derived from a password and bound to a
/// specific engine ID.
///
/// Key material is zeroed from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LocalizedKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl LocalizedKey {
    /// Derive a localized key from a password and engine ID.
    ///
    /// An empty password yields an all-zero key of the digest length.
    pub fn from_password(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Self {
        let master = password_to_key(protocol, password);
        let key = localize_key(protocol, &master, engine_id);
        Self { key, protocol }
    }

    /// Wrap an already-localized key.
    pub fn from_bytes(protocol: AuthProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    /// The hash protocol this key belongs to.
    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Compute the truncated HMAC of `data`.
    pub fn compute_hmac(&self, data: &[u8]) -> Vec<u8> {
        let truncate = self.protocol.mac_len();
        match self.protocol {
            AuthProtocol::Md5 => hmac_md5(&self.key, data, truncate),
            AuthProtocol::Sha1 => hmac_sha1(&self.key, data, truncate),
        }
    }

    /// Verify a truncated HMAC in constant time.
    pub fn verify_hmac(&self, data: &[u8], expected: &[u8]) -> bool {
        let computed = self.compute_hmac(data);
        if computed.len() != expected.len() {
            return false;
        }
        let mut acc = 0u8;
        for (a, b) in computed.iter().zip(expected.iter()) {
            acc |= a ^ b;
        }
        acc == 0
    }
}

impl std::fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizedKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Password-to-key transformation: hash 1 MiB of the cyclically repeated
/// password.
pub(crate) fn password_to_key(protocol: AuthProtocol, password: &[u8]) -> Vec<u8> {
    match protocol {
        AuthProtocol::Md5 => password_to_key_impl::<md5::Md5>(password),
        AuthProtocol::Sha1 => password_to_key_impl::<sha1::Sha1>(password),
    }
}

fn password_to_key_impl<D>(password: &[u8]) -> Vec<u8>
where
    D: Digest + Default,
{
    const EXPANSION_SIZE: usize = 1_048_576;

    if password.is_empty() {
        return vec![0u8; <D as OutputSizeUser>::output_size()];
    }

    let mut hasher = D::new();

    // Feed the repeated password in 64-byte chunks; EXPANSION_SIZE is a
    // multiple of 64, so exactly 1 MiB is hashed
    let mut buf = [0u8; 64];
    let mut index = 0;
    let mut fed = 0;
    while fed < EXPANSION_SIZE {
        for byte in &mut buf {
            *byte = password[index];
            index = (index + 1) % password.len();
        }
        hasher.update(buf);
        fed += 64;
    }

    hasher.finalize().to_vec()
}

/// Key localization: `Kul = H(Ku || engine_id || Ku)`.
fn localize_key(protocol: AuthProtocol, master: &[u8], engine_id: &[u8]) -> Vec<u8> {
    match protocol {
        AuthProtocol::Md5 => localize_key_impl::<md5::Md5>(master, engine_id),
        AuthProtocol::Sha1 => localize_key_impl::<sha1::Sha1>(master, engine_id),
    }
}

fn localize_key_impl<D>(master: &[u8], engine_id: &[u8]) -> Vec<u8>
where
    D: Digest + Default,
{
    let mut hasher = D::new();
    hasher.update(master);
    hasher.update(engine_id);
    hasher.update(master);
    hasher.finalize().to_vec()
}

fn hmac_md5(key: &[u8], data: &[u8], truncate: usize) -> Vec<u8> {
    type HmacMd5 = Hmac<md5::Md5>;

    let mut mac = <HmacMd5 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    let digest = mac.finalize().into_bytes();
    digest[..truncate].to_vec()
}

fn hmac_sha1(key: &[u8], data: &[u8], truncate: usize) -> Vec<u8> {
    type HmacSha1 = Hmac<sha1::Sha1>;

    let mut mac = <HmacSha1 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    let digest = mac.finalize().into_bytes();
    digest[..truncate].to_vec()
}

/// Sign an outgoing message in place.
///
/// `message` must already contain the zeroed auth-params placeholder at
/// `auth_offset..auth_offset + mac_len`. The HMAC is computed over the
/// whole buffer as-is and spliced into the placeholder.
pub fn sign_message(key: &LocalizedKey, message: &mut [u8], auth_offset: usize) {
    let mac = key.compute_hmac(message);
    message[auth_offset..auth_offset + mac.len()].copy_from_slice(&mac);
}

/// Verify the HMAC of an incoming message.
///
/// Zeroes the auth-params slot in a scratch copy, recomputes, and
/// compares in constant time.
pub fn verify_message(
    key: &LocalizedKey,
    message: &[u8],
    auth_offset: usize,
    auth_len: usize,
) -> bool {
    if auth_offset + auth_len > message.len() {
        return false;
    }

    let received = &message[auth_offset..auth_offset + auth_len];
    let mut scratch = message.to_vec();
    scratch[auth_offset..auth_offset + auth_len].fill(0);

    key.verify_hmac(&scratch, received)
}
