//! SNMPv3 message format.
//!
//! ```text
//! SEQUENCE {
//!     INTEGER version (3)
//!     SEQUENCE msgGlobalData {
//!         INTEGER msgID
//!         INTEGER msgMaxSize
//!         OCTET STRING msgFlags (1 byte)
//!         INTEGER msgSecurityModel (3 = USM)
//!     }
//!     OCTET STRING msgSecurityParameters (opaque, USM-encoded)
//!     msgData (plaintext ScopedPDU or encrypted OCTET STRING)
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;

/// USM security model identifier in msgGlobalData.
pub const SECURITY_MODEL_USM: i32 = 3;

/// SNMPv3 security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityLevel {
    /// No authentication, no privacy.
    NoAuthNoPriv,
    /// Authentication only.
    AuthNoPriv,
    /// Authentication and privacy (encryption).
    AuthPriv,
}

impl SecurityLevel {
    /// Decode from the low two bits of a msgFlags byte.
    pub fn from_flags(flags: u8) -> Option<Self> {
        let auth = flags & 0x01 != 0;
        let privacy = flags & 0x02 != 0;

        match (auth, privacy) {
            (false, false) => Some(Self::NoAuthNoPriv),
            (true, false) => Some(Self::AuthNoPriv),
            (true, true) => Some(Self::AuthPriv),
            (false, true) => None, // privacy requires authentication
        }
    }

    /// Encode to flag bits (without the reportable bit).
    pub fn to_flags(self) -> u8 {
        match self {
            Self::NoAuthNoPriv => 0x00,
            Self::AuthNoPriv => 0x01,
            Self::AuthPriv => 0x03,
        }
    }

    /// Check if authentication is required.
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::AuthNoPriv | Self::AuthPriv)
    }

    /// Check if privacy is required.
    pub fn requires_priv(self) -> bool {
        matches!(self, Self::AuthPriv)
    }
}

/// Message flags byte: 0x01 authenticated, 0x02 privacy, 0x04 reportable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgFlags {
    /// Security level encoded in the low two bits.
    pub security_level: SecurityLevel,
    /// Whether a Report PDU may be sent on error.
    pub reportable: bool,
}

impl MsgFlags {
    /// Create new message flags.
    pub fn new(security_level: SecurityLevel, reportable: bool) -> Self {
        Self {
            security_level,
            reportable,
        }
    }

    /// Decode from the flags byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        let security_level = SecurityLevel::from_flags(byte)
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::InvalidMsgFlags))?;
        Ok(Self {
            security_level,
            reportable: byte & 0x04 != 0,
        })
    }

    /// Encode to the flags byte.
    pub fn to_byte(self) -> u8 {
        let mut flags = self.security_level.to_flags();
        if self.reportable {
            flags |= 0x04;
        }
        flags
    }
}

/// msgGlobalData header.
#[derive(Debug, Clone)]
pub struct MsgGlobalData {
    /// Message identifier.
    pub msg_id: i32,
    /// Maximum message size the sender can accept.
    pub msg_max_size: i32,
    /// Flags byte.
    pub msg_flags: MsgFlags,
    /// Security model (USM = 3).
    pub msg_security_model: i32,
}

impl MsgGlobalData {
    /// Create a new header under the USM security model.
    pub fn new(msg_id: i32, msg_max_size: i32, msg_flags: MsgFlags) -> Self {
        Self {
            msg_id,
            msg_max_size,
            msg_flags,
            msg_security_model: SECURITY_MODEL_USM,
        }
    }

    /// Encode into the buffer.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            buf.push_integer(self.msg_security_model);
            buf.push_octet_string(&[self.msg_flags.to_byte()]);
            buf.push_integer(self.msg_max_size);
            buf.push_integer(self.msg_id);
        });
    }

    /// Decode from a decoder.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;

        let msg_id = seq.read_integer()?;
        let msg_max_size = seq.read_integer()?;

        let flags_bytes = seq.read_octet_string()?;
        if flags_bytes.len() != 1 {
            return Err(Error::decode(seq.offset(), DecodeErrorKind::InvalidMsgFlags));
        }
        let msg_flags = MsgFlags::from_byte(flags_bytes[0])?;

        let msg_security_model = seq.read_integer()?;
        if msg_security_model != SECURITY_MODEL_USM {
            return Err(Error::decode(
                seq.offset(),
                DecodeErrorKind::UnknownSecurityModel(msg_security_model),
            ));
        }

        Ok(Self {
            msg_id,
            msg_max_size,
            msg_flags,
            msg_security_model,
        })
    }
}

/// Scoped PDU: `(context-engine-id, context-name, pdu)`.
#[derive(Debug, Clone)]
pub struct ScopedPdu {
    /// Context engine ID (typically the authoritative engine ID).
    pub context_engine_id: Bytes,
    /// Context name (typically empty).
    pub context_name: Bytes,
    /// The inner PDU.
    pub pdu: Pdu,
}

impl ScopedPdu {
    /// Create a new scoped PDU.
    pub fn new(context_engine_id: impl Into<Bytes>, context_name: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            context_engine_id: context_engine_id.into(),
            context_name: context_name.into(),
            pdu,
        }
    }

    /// Create with empty context (the common case).
    pub fn with_empty_context(pdu: Pdu) -> Self {
        Self::new(Bytes::new(), Bytes::new(), pdu)
    }

    /// Encode into the buffer.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.context_name);
            buf.push_octet_string(&self.context_engine_id);
        });
    }

    /// Encode to standalone bytes (the plaintext handed to the cipher).
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        self.encode(&mut buf);
        buf.finish()
    }

    /// Decode from a decoder.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;

        let context_engine_id = seq.read_octet_string()?;
        let context_name = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;

        Ok(Self {
            context_engine_id,
            context_name,
            pdu,
        })
    }
}

/// Message payload: plaintext before encryption, ciphertext after.
#[derive(Debug, Clone)]
pub enum V3MessageData {
    /// Plaintext scoped PDU (noAuthNoPriv or authNoPriv).
    Plaintext(ScopedPdu),
    /// Encrypted scoped PDU (authPriv) as raw ciphertext.
    Encrypted(Bytes),
}

/// SNMPv3 message.
#[derive(Debug, Clone)]
pub struct V3Message {
    /// Global header.
    pub global_data: MsgGlobalData,
    /// Opaque USM security parameters.
    pub security_params: Bytes,
    /// Payload.
    pub data: V3MessageData,
}

impl V3Message {
    /// Create a message with a plaintext scoped PDU.
    pub fn new(global_data: MsgGlobalData, security_params: Bytes, scoped_pdu: ScopedPdu) -> Self {
        Self {
            global_data,
            security_params,
            data: V3MessageData::Plaintext(scoped_pdu),
        }
    }

    /// Create a message with an encrypted payload.
    pub fn new_encrypted(
        global_data: MsgGlobalData,
        security_params: Bytes,
        ciphertext: Bytes,
    ) -> Self {
        Self {
            global_data,
            security_params,
            data: V3MessageData::Encrypted(ciphertext),
        }
    }

    /// Get the scoped PDU if the payload is plaintext.
    pub fn scoped_pdu(&self) -> Option<&ScopedPdu> {
        match &self.data {
            V3MessageData::Plaintext(pdu) => Some(pdu),
            V3MessageData::Encrypted(_) => None,
        }
    }

    /// Encode to BER.
    ///
    /// Authenticated messages must be encoded with a zeroed auth-params
    /// placeholder; the HMAC is computed over the encoded bytes and then
    /// spliced in (see [`crate::v3::sign_message`]).
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();

        buf.push_sequence(|buf| {
            match &self.data {
                V3MessageData::Plaintext(scoped_pdu) => scoped_pdu.encode(buf),
                V3MessageData::Encrypted(ciphertext) => buf.push_octet_string(ciphertext),
            }

            buf.push_octet_string(&self.security_params);
            self.global_data.encode(buf);
            buf.push_integer(3);
        });

        buf.finish()
    }

    /// Decode from BER.
    ///
    /// When the flags claim privacy, the payload is returned as
    /// [`V3MessageData::Encrypted`] raw bytes for the caller to decrypt.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let at = seq.offset();
        let version = seq.read_integer()?;
        if version != 3 {
            return Err(Error::decode(at, DecodeErrorKind::UnknownVersion(version)));
        }

        Self::decode_from_sequence(&mut seq)
    }

    /// Decode from a sequence whose version integer has been consumed.
    pub(crate) fn decode_from_sequence(seq: &mut Decoder) -> Result<Self> {
        let global_data = MsgGlobalData::decode(seq)?;
        let security_params = seq.read_octet_string()?;

        let data = if global_data.msg_flags.security_level.requires_priv() {
            V3MessageData::Encrypted(seq.read_octet_string()?)
        } else {
            V3MessageData::Plaintext(ScopedPdu::decode(seq)?)
        };

        Ok(Self {
            global_data,
            security_params,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_security_level_flags() {
        assert_eq!(SecurityLevel::from_flags(0x00), Some(SecurityLevel::NoAuthNoPriv));
        assert_eq!(SecurityLevel::from_flags(0x01), Some(SecurityLevel::AuthNoPriv));
        assert_eq!(SecurityLevel::from_flags(0x03), Some(SecurityLevel::AuthPriv));
        assert_eq!(SecurityLevel::from_flags(0x02), None);
    }

    #[test]
    fn test_msg_flags_roundtrip() {
        let flags = MsgFlags::new(SecurityLevel::AuthPriv, true);
        assert_eq!(flags.to_byte(), 0x07);

        let decoded = MsgFlags::from_byte(0x07).unwrap();
        assert_eq!(decoded.security_level, SecurityLevel::AuthPriv);
        assert!(decoded.reportable);

        // Discovery flags: reportable only
        let discovery = MsgFlags::from_byte(0x04).unwrap();
        assert_eq!(discovery.security_level, SecurityLevel::NoAuthNoPriv);
        assert!(discovery.reportable);
    }

    #[test]
    fn test_global_data_roundtrip() {
        let global = MsgGlobalData::new(12345, 65500, MsgFlags::new(SecurityLevel::AuthNoPriv, true));

        let mut buf = EncodeBuf::new();
        global.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        let decoded = MsgGlobalData::decode(&mut decoder).unwrap();

        assert_eq!(decoded.msg_id, 12345);
        assert_eq!(decoded.msg_max_size, 65500);
        assert_eq!(decoded.msg_flags.security_level, SecurityLevel::AuthNoPriv);
        assert!(decoded.msg_flags.reportable);
    }

    #[test]
    fn test_global_data_rejects_unknown_security_model() {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_integer(99);
            buf.push_octet_string(&[0x04]);
            buf.push_integer(65500);
            buf.push_integer(100);
        });

        let mut decoder = Decoder::new(buf.finish());
        assert!(matches!(
            MsgGlobalData::decode(&mut decoder),
            Err(Error::Decode {
                kind: DecodeErrorKind::UnknownSecurityModel(99),
                ..
            })
        ));
    }

    #[test]
    fn test_scoped_pdu_roundtrip() {
        let pdu = Pdu::get_request(42, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let scoped = ScopedPdu::new(b"engine".as_slice(), b"ctx".as_slice(), pdu);

        let bytes = scoped.encode_to_bytes();
        let mut decoder = Decoder::new(bytes);
        let decoded = ScopedPdu::decode(&mut decoder).unwrap();

        assert_eq!(decoded.context_engine_id.as_ref(), b"engine");
        assert_eq!(decoded.context_name.as_ref(), b"ctx");
        assert_eq!(decoded.pdu.request_id, 42);
    }

    #[test]
    fn test_message_plaintext_roundtrip() {
        let global = MsgGlobalData::new(100, 65500, MsgFlags::new(SecurityLevel::NoAuthNoPriv, true));
        let pdu = Pdu::get_request(42, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let msg = V3Message::new(
            global,
            Bytes::from_static(b"usm-params"),
            ScopedPdu::with_empty_context(pdu),
        );

        let decoded = V3Message::decode(msg.encode()).unwrap();

        assert_eq!(decoded.global_data.msg_id, 100);
        assert_eq!(decoded.security_params.as_ref(), b"usm-params");
        assert_eq!(decoded.scoped_pdu().unwrap().pdu.request_id, 42);
    }

    #[test]
    fn test_message_encrypted_roundtrip() {
        let global = MsgGlobalData::new(200, 65500, MsgFlags::new(SecurityLevel::AuthPriv, false));
        let msg = V3Message::new_encrypted(
            global,
            Bytes::from_static(b"usm-params"),
            Bytes::from_static(b"ciphertext-bytes"),
        );

        let decoded = V3Message::decode(msg.encode()).unwrap();
        match &decoded.data {
            V3MessageData::Encrypted(data) => assert_eq!(data.as_ref(), b"ciphertext-bytes"),
            V3MessageData::Plaintext(_) => panic!("expected encrypted payload"),
        }
    }
}
