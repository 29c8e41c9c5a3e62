//! Privacy (encryption) for v3 messages.
//!
//! # Salt/IV construction
//!
//! ## DES-CBC
//! - priv-params: engineBoots (4 bytes BE) || counter (4 bytes BE)
//! - IV: pre-IV XOR priv-params (pre-IV is the last 8 bytes of the
//!   16-byte privacy key material)
//! - Plaintext is zero-padded to a multiple of 8; decryption strips
//!   nothing (the inner BER decoder ignores bytes past the sequence)
//!
//! ## AES-128-CFB-128
//! - priv-params: 64-bit counter (8 bytes BE)
//! - IV: engineBoots (4) || engineTime (4) || counter (8) - concatenation,
//!   not XOR
//! - Stream mode: ciphertext length equals plaintext length
//!
//! Counters live in the session and are incremented before every use so
//! an IV is never repeated within one (boots, time) window.

use bytes::Bytes;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{AuthProtocol, PrivProtocol};
use crate::error::{CryptoErrorKind, Error, Result};

/// Privacy key: the first 16 bytes of localized key material, plus the
/// cipher it belongs to.
///
/// Key material is zeroed from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: PrivProtocol,
}

impl PrivKey {
    /// Derive a privacy key from a password and engine ID.
    ///
    /// `hash` selects the digest used for derivation. Sessions pass their
    /// authentication hash here regardless of the cipher; that matches
    /// the deployed peer population this library interoperates with.
    pub fn from_password(
        hash: AuthProtocol,
        protocol: PrivProtocol,
        password: &[u8],
        engine_id: &[u8],
    ) -> Self {
        let localized = super::LocalizedKey::from_password(hash, password, engine_id);
        Self::from_bytes(protocol, &localized.as_bytes()[..16])
    }

    /// Wrap 16 bytes of already-localized key material.
    ///
    /// # Panics
    /// Panics if `key` is shorter than 16 bytes.
    pub fn from_bytes(protocol: PrivProtocol, key: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref();
        assert!(key.len() >= 16, "privacy key needs 16 bytes, got {}", key.len());
        Self {
            key: key[..16].to_vec(),
            protocol,
        }
    }

    /// The cipher this key belongs to.
    pub fn protocol(&self) -> PrivProtocol {
        self.protocol
    }

    /// Encrypt a serialized scoped PDU.
    ///
    /// `salt` is the session counter value, already incremented by the
    /// caller; DES uses its low 32 bits. Returns (ciphertext, priv-params).
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: u64,
    ) -> Result<(Bytes, Bytes)> {
        match self.protocol {
            PrivProtocol::Des => self.encrypt_des(plaintext, engine_boots, salt as u32),
            PrivProtocol::Aes128 => self.encrypt_aes(plaintext, engine_boots, engine_time, salt),
        }
    }

    /// Decrypt a payload using the priv-params carried in the message.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Bytes> {
        if priv_params.len() != 8 {
            return Err(Error::crypto(CryptoErrorKind::InvalidPrivParamsLength {
                actual: priv_params.len(),
            }));
        }

        match self.protocol {
            PrivProtocol::Des => self.decrypt_des(ciphertext, priv_params),
            PrivProtocol::Aes128 => {
                self.decrypt_aes(ciphertext, engine_boots, engine_time, priv_params)
            }
        }
    }

    fn des_iv(&self, salt: &[u8]) -> [u8; 8] {
        let pre_iv = &self.key[8..16];
        let mut iv = [0u8; 8];
        for i in 0..8 {
            iv[i] = pre_iv[i] ^ salt[i];
        }
        iv
    }

    fn encrypt_des(&self, plaintext: &[u8], engine_boots: u32, counter: u32) -> Result<(Bytes, Bytes)> {
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};
        type DesCbc = cbc::Encryptor<des::Des>;

        let key = &self.key[..8];

        let mut salt = [0u8; 8];
        salt[..4].copy_from_slice(&engine_boots.to_be_bytes());
        salt[4..].copy_from_slice(&counter.to_be_bytes());

        let iv = self.des_iv(&salt);

        // Zero-pad to the block size
        let padded_len = plaintext.len().div_ceil(8) * 8;
        let mut buffer = vec![0u8; padded_len];
        buffer[..plaintext.len()].copy_from_slice(plaintext);

        let cipher = DesCbc::new_from_slices(key, &iv)
            .map_err(|_| Error::crypto(CryptoErrorKind::InvalidKeyLength))?;
        let ciphertext = cipher
            .encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buffer, padded_len)
            .map_err(|_| Error::crypto(CryptoErrorKind::CipherFailure))?;

        Ok((Bytes::copy_from_slice(ciphertext), Bytes::copy_from_slice(&salt)))
    }

    fn decrypt_des(&self, ciphertext: &[u8], priv_params: &[u8]) -> Result<Bytes> {
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};
        type DesCbc = cbc::Decryptor<des::Des>;

        if !ciphertext.len().is_multiple_of(8) {
            return Err(Error::crypto(CryptoErrorKind::BadCipherLength {
                length: ciphertext.len(),
                block_size: 8,
            }));
        }

        let key = &self.key[..8];
        let iv = self.des_iv(priv_params);

        let cipher = DesCbc::new_from_slices(key, &iv)
            .map_err(|_| Error::crypto(CryptoErrorKind::InvalidKeyLength))?;

        let mut buffer = ciphertext.to_vec();
        let plaintext = cipher
            .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buffer)
            .map_err(|_| Error::crypto(CryptoErrorKind::CipherFailure))?;

        // Trailing pad bytes stay; the BER decoder stops at the sequence end
        Ok(Bytes::copy_from_slice(plaintext))
    }

    fn aes_iv(engine_boots: u32, engine_time: u32, salt: &[u8]) -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
        iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
        iv[8..].copy_from_slice(salt);
        iv
    }

    fn encrypt_aes(
        &self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: u64,
    ) -> Result<(Bytes, Bytes)> {
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
        type Aes128Cfb = cfb_mode::Encryptor<aes::Aes128>;

        let salt_bytes = salt.to_be_bytes();
        let iv = Self::aes_iv(engine_boots, engine_time, &salt_bytes);

        let mut buffer = plaintext.to_vec();
        let cipher = Aes128Cfb::new_from_slices(&self.key, &iv)
            .map_err(|_| Error::crypto(CryptoErrorKind::InvalidKeyLength))?;
        cipher.encrypt(&mut buffer);

        Ok((Bytes::from(buffer), Bytes::copy_from_slice(&salt_bytes)))
    }

    fn decrypt_aes(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Bytes> {
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
        type Aes128Cfb = cfb_mode::Decryptor<aes::Aes128>;

        let iv = Self::aes_iv(engine_boots, engine_time, priv_params);

        let mut buffer = ciphertext.to_vec();
        let cipher = Aes128Cfb::new_from_slices(&self.key, &iv)
            .map_err(|_| Error::crypto(CryptoErrorKind::InvalidKeyLength))?;
        cipher.decrypt(&mut buffer);

        Ok(Bytes::from(buffer))
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
