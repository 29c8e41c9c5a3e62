//! User security model parameters.
//!
//! The security parameters travel as an OCTET STRING whose contents are
//! a BER sequence:
//!
//! ```text
//! SEQUENCE {
//!     OCTET STRING engine-id
//!     INTEGER      engine-boots (0..2147483647)
//!     INTEGER      engine-time  (0..2147483647)
//!     OCTET STRING user
//!     OCTET STRING auth-params  (12-byte truncated HMAC, or empty)
//!     OCTET STRING priv-params  (8-byte salt, or empty)
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::Result;

/// USM security parameters.
#[derive(Debug, Clone)]
pub struct UsmSecurityParams {
    /// Authoritative engine ID.
    pub engine_id: Bytes,
    /// Engine boot count.
    pub engine_boots: u32,
    /// Engine time in seconds since last boot.
    pub engine_time: u32,
    /// User name.
    pub username: Bytes,
    /// Authentication parameters (truncated HMAC, or empty).
    pub auth_params: Bytes,
    /// Privacy parameters (salt, or empty).
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    /// Create parameters without auth/priv fields.
    pub fn new(
        engine_id: impl Into<Bytes>,
        engine_boots: u32,
        engine_time: u32,
        username: impl Into<Bytes>,
    ) -> Self {
        Self {
            engine_id: engine_id.into(),
            engine_boots,
            engine_time,
            username: username.into(),
            auth_params: Bytes::new(),
            priv_params: Bytes::new(),
        }
    }

    /// All-empty parameters, as discovery sends them.
    pub fn empty() -> Self {
        Self::new(Bytes::new(), 0, 0, Bytes::new())
    }

    /// Set the privacy parameters (salt).
    pub fn with_priv_params(mut self, priv_params: impl Into<Bytes>) -> Self {
        self.priv_params = priv_params.into();
        self
    }

    /// Fill auth-params with `mac_len` zero bytes.
    ///
    /// The zeros stand in while the HMAC over the serialized message is
    /// computed; [`crate::v3::sign_message`] then overwrites them.
    pub fn with_auth_placeholder(mut self, mac_len: usize) -> Self {
        self.auth_params = Bytes::from(vec![0u8; mac_len]);
        self
    }

    /// Encode to the opaque byte form carried in the message.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string(&self.priv_params);
            buf.push_octet_string(&self.auth_params);
            buf.push_octet_string(&self.username);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_time);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_boots);
            buf.push_octet_string(&self.engine_id);
        });
        buf.finish()
    }

    /// Decode from the opaque byte form.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let engine_id = seq.read_octet_string()?;
        // Negative values sign-extend harmlessly; the fields are defined
        // as 0..2^31-1 so the cast is lossless for conforming agents
        let engine_boots = seq.read_integer()? as u32;
        let engine_time = seq.read_integer()? as u32;
        let username = seq.read_octet_string()?;
        let auth_params = seq.read_octet_string()?;
        let priv_params = seq.read_octet_string()?;

        Ok(Self {
            engine_id,
            engine_boots,
            engine_time,
            username,
            auth_params,
            priv_params,
        })
    }

    /// Locate the auth-params contents inside a fully serialized message.
    ///
    /// Returns (offset, length) of the field so the signer can splice the
    /// HMAC over its zero placeholder, and the verifier can zero it back
    /// out. Returns `None` when the message does not have the expected
    /// shape.
    pub fn find_auth_params_offset(message: &[u8]) -> Option<(usize, usize)> {
        let mut offset = 0;

        // Outer SEQUENCE header
        offset = enter_constructed(message, offset, 0x30)?;
        // version INTEGER
        offset = skip_tlv(message, offset)?;
        // msgGlobalData SEQUENCE
        offset = skip_tlv(message, offset)?;
        // msgSecurityParameters OCTET STRING header
        offset = enter_constructed(message, offset, 0x04)?;
        // USM SEQUENCE header
        offset = enter_constructed(message, offset, 0x30)?;
        // engine-id, boots, time, user
        for _ in 0..4 {
            offset = skip_tlv(message, offset)?;
        }

        // auth-params OCTET STRING
        if *message.get(offset)? != 0x04 {
            return None;
        }
        let (len, len_size) = parse_length(&message[offset + 1..])?;
        let start = offset + 1 + len_size;
        if start + len > message.len() {
            return None;
        }

        Some((start, len))
    }
}

/// Check the tag at `offset` and step inside its contents.
fn enter_constructed(data: &[u8], offset: usize, expected_tag: u8) -> Option<usize> {
    if *data.get(offset)? != expected_tag {
        return None;
    }
    let (_, len_size) = parse_length(&data[offset + 1..])?;
    Some(offset + 1 + len_size)
}

/// Parse a length field, returning (length, bytes_consumed).
fn parse_length(data: &[u8]) -> Option<(usize, usize)> {
    let first = *data.first()?;
    if first < 0x80 {
        return Some((first as usize, 1));
    }
    if first == 0x80 {
        return None;
    }

    let count = (first & 0x7F) as usize;
    if count == 0 || count > 4 || data.len() < 1 + count {
        return None;
    }

    let mut len = 0usize;
    for i in 0..count {
        len = (len << 8) | (data[1 + i] as usize);
    }
    Some((len, 1 + count))
}

/// Skip one TLV, returning the offset after it.
fn skip_tlv(data: &[u8], offset: usize) -> Option<usize> {
    data.get(offset)?;
    let (len, len_size) = parse_length(&data[offset + 1..])?;
    let next = offset + 1 + len_size + len;
    if next > data.len() {
        return None;
    }
    Some(next)
}
