//! SNMP value types.
//!
//! The [`Value`] enum represents every data type the protocol can carry,
//! including the v2c exception markers.

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// SNMP value.
///
/// Each variant corresponds to one on-wire tag. Unrecognized primitive
/// tags are preserved as [`Value::Unknown`] so the library keeps working
/// against agents that emit newer types.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// INTEGER (signed 32-bit, tag 0x02)
    Integer(i32),

    /// OCTET STRING (arbitrary bytes, not necessarily UTF-8, tag 0x04)
    OctetString(Bytes),

    /// NULL (tag 0x05)
    Null,

    /// OBJECT IDENTIFIER (tag 0x06)
    ObjectIdentifier(Oid),

    /// IpAddress (4 bytes, big-endian, tag 0x40)
    IpAddress([u8; 4]),

    /// Counter32 (unsigned 32-bit, wrapping, tag 0x41)
    Counter32(u32),

    /// Gauge32 / Unsigned32 (unsigned 32-bit, non-wrapping, tag 0x42)
    Gauge32(u32),

    /// TimeTicks (hundredths of seconds, tag 0x43)
    TimeTicks(u32),

    /// Opaque (wrapped legacy data, tag 0x44)
    Opaque(Bytes),

    /// Counter64 (unsigned 64-bit, wrapping, tag 0x46; v2c/v3 only)
    Counter64(u64),

    /// noSuchObject exception (tag 0x80)
    NoSuchObject,

    /// noSuchInstance exception (tag 0x81)
    NoSuchInstance,

    /// endOfMibView exception (tag 0x82); normal walk termination marker
    EndOfMibView,

    /// Unrecognized primitive type, kept verbatim for forward compatibility
    Unknown {
        /// The on-wire tag byte.
        tag: u8,
        /// The raw contents.
        data: Bytes,
    },
}

impl Value {
    /// Get as `i32` if this is an [`Value::Integer`].
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as `u32` for Counter32/Gauge32/TimeTicks or a non-negative
    /// Integer.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v),
            Value::Integer(v) if *v >= 0 => Some(*v as u32),
            _ => None,
        }
    }

    /// Get as `u64` for Counter64, any unsigned 32-bit type, or a
    /// non-negative Integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v as u64),
            Value::Integer(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    /// Get as bytes for OctetString or Opaque.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(v) | Value::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// Get as `&str` when the value is an OctetString/Opaque holding
    /// valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Get as [`Oid`] if this is an [`Value::ObjectIdentifier`].
    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    /// Get as [`std::net::Ipv4Addr`] if this is an [`Value::IpAddress`].
    pub fn as_ip(&self) -> Option<std::net::Ipv4Addr> {
        match self {
            Value::IpAddress(bytes) => Some(std::net::Ipv4Addr::from(*bytes)),
            _ => None,
        }
    }

    /// Check if this is one of the v2c exception markers.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(data) => {
                buf.push_bytes(data);
                buf.push_length(data.len());
                buf.push_tag(tag::application::OPAQUE);
            }
            Value::Counter64(v) => buf.push_unsigned64(tag::application::COUNTER64, *v),
            Value::NoSuchObject => {
                buf.push_length(0);
                buf.push_tag(tag::context::NO_SUCH_OBJECT);
            }
            Value::NoSuchInstance => {
                buf.push_length(0);
                buf.push_tag(tag::context::NO_SUCH_INSTANCE);
            }
            Value::EndOfMibView => {
                buf.push_length(0);
                buf.push_tag(tag::context::END_OF_MIB_VIEW);
            }
            Value::Unknown { tag: t, data } => {
                buf.push_bytes(data);
                buf.push_length(data.len());
                buf.push_tag(*t);
            }
        }
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let at = decoder.offset();
        let tag = decoder.read_tag()?;
        let len = decoder.read_length()?;

        match tag {
            tag::universal::INTEGER => Ok(Value::Integer(decoder.read_integer_value(len)?)),
            tag::universal::OCTET_STRING => Ok(Value::OctetString(decoder.read_bytes(len)?)),
            tag::universal::NULL => {
                if len != 0 {
                    return Err(Error::decode(decoder.offset(), DecodeErrorKind::InvalidNull));
                }
                Ok(Value::Null)
            }
            tag::universal::OBJECT_IDENTIFIER => {
                Ok(Value::ObjectIdentifier(decoder.read_oid_value(len)?))
            }
            tag::application::IP_ADDRESS => {
                if len != 4 {
                    return Err(Error::decode(
                        decoder.offset(),
                        DecodeErrorKind::InvalidIpAddressLength { length: len },
                    ));
                }
                let bytes = decoder.read_bytes(4)?;
                Ok(Value::IpAddress([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            tag::application::COUNTER32 => {
                Ok(Value::Counter32(decoder.read_unsigned32_value(len)?))
            }
            tag::application::GAUGE32 => Ok(Value::Gauge32(decoder.read_unsigned32_value(len)?)),
            tag::application::TIMETICKS => {
                Ok(Value::TimeTicks(decoder.read_unsigned32_value(len)?))
            }
            tag::application::OPAQUE => Ok(Value::Opaque(decoder.read_bytes(len)?)),
            tag::application::COUNTER64 => {
                Ok(Value::Counter64(decoder.read_unsigned64_value(len)?))
            }
            tag::context::NO_SUCH_OBJECT if len == 0 => Ok(Value::NoSuchObject),
            tag::context::NO_SUCH_INSTANCE if len == 0 => Ok(Value::NoSuchInstance),
            tag::context::END_OF_MIB_VIEW if len == 0 => Ok(Value::EndOfMibView),
            other if !tag::is_constructed(other) => {
                tracing::debug!(target: "snmpoll::ber", tag = other, offset = at, "preserving unknown primitive tag");
                Ok(Value::Unknown {
                    tag: other,
                    data: decoder.read_bytes(len)?,
                })
            }
            other => Err(Error::decode(
                at,
                DecodeErrorKind::UnexpectedTag {
                    expected: tag::universal::SEQUENCE,
                    actual: other,
                },
            )),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::OctetString(data) | Value::Opaque(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "{s}"),
                Err(_) => {
                    for b in data.iter() {
                        write!(f, "{b:02x}")?;
                    }
                    Ok(())
                }
            },
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{oid}"),
            Value::IpAddress(a) => write!(f, "{}.{}.{}.{}", a[0], a[1], a[2], a[3]),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => write!(f, "{v}"),
            Value::Counter64(v) => write!(f, "{v}"),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { tag, data } => write!(f, "unknown(0x{tag:02X}, {} bytes)", data.len()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::OctetString(Bytes::copy_from_slice(v))
    }
}

impl From<Oid> for Value {
    fn from(v: Oid) -> Self {
        Value::ObjectIdentifier(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn roundtrip(value: Value) -> Value {
        let mut buf = EncodeBuf::new();
        value.encode(&mut buf);
        let bytes = buf.finish();
        let mut decoder = Decoder::new(bytes);
        let decoded = Value::decode(&mut decoder).unwrap();
        assert!(decoder.is_empty(), "trailing bytes after {value:?}");
        decoded
    }

    #[test]
    fn test_roundtrip_all_variants() {
        let values = [
            Value::Integer(-42),
            Value::Integer(0x11223344),
            Value::OctetString(Bytes::from_static(b"public")),
            Value::Null,
            Value::ObjectIdentifier(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)),
            Value::IpAddress([192, 168, 1, 1]),
            Value::Counter32(4_000_000_000),
            Value::Gauge32(100),
            Value::TimeTicks(8675309),
            Value::Opaque(Bytes::from_static(&[0xDE, 0xAD])),
            Value::Counter64(10_000_000_000),
            Value::NoSuchObject,
            Value::NoSuchInstance,
            Value::EndOfMibView,
        ];
        for value in values {
            assert_eq!(roundtrip(value.clone()), value);
        }
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Integer(5).as_i32(), Some(5));
        assert_eq!(Value::Counter32(5).as_i32(), None);
        assert_eq!(Value::Counter32(5).as_u32(), Some(5));
        assert_eq!(Value::Integer(-1).as_u32(), None);
        assert_eq!(Value::Counter64(1 << 40).as_u64(), Some(1 << 40));
        assert_eq!(
            Value::OctetString(Bytes::from_static(b"hi")).as_str(),
            Some("hi")
        );
        assert_eq!(
            Value::IpAddress([10, 0, 0, 1]).as_ip(),
            Some(std::net::Ipv4Addr::new(10, 0, 0, 1))
        );
        assert!(Value::EndOfMibView.is_exception());
        assert!(!Value::Null.is_exception());
    }

    #[test]
    fn test_unknown_tag_preserved() {
        // Application tag 0x47 is not defined; contents survive a roundtrip
        let mut decoder = Decoder::from_slice(&[0x47, 0x02, 0xAB, 0xCD]);
        let value = Value::decode(&mut decoder).unwrap();
        match &value {
            Value::Unknown { tag, data } => {
                assert_eq!(*tag, 0x47);
                assert_eq!(data.as_ref(), &[0xAB, 0xCD]);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
        assert_eq!(roundtrip(value.clone()), value);
    }

    #[test]
    fn test_decode_random_bytes_never_panics() {
        // Cheap deterministic pseudo-random stream
        let mut state = 0x12345678u32;
        for _ in 0..2000 {
            let mut data = Vec::with_capacity(16);
            for _ in 0..16 {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                data.push((state >> 24) as u8);
            }
            let mut decoder = Decoder::from_slice(&data);
            let _ = Value::decode(&mut decoder);
        }
    }
}
