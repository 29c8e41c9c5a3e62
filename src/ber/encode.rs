//! BER encoding.
//!
//! [`EncodeBuf`] stores bytes in reverse order and reverses once in
//! [`finish`](EncodeBuf::finish). Writing content first and the tag last
//! means every length field is known when it is written, so nested
//! sequences never need a second sizing pass.

use bytes::Bytes;

use super::length::encode_length;
use super::tag;
use crate::oid::Oid;

/// Reverse-building BER encoder.
///
/// Callers push fields in reverse field order: for a `SEQUENCE { a, b }`,
/// push `b`, then `a`. The closure-based [`push_sequence`](Self::push_sequence)
/// and [`push_constructed`](Self::push_constructed) wrap their contents in
/// tag and length automatically.
#[derive(Default)]
pub struct EncodeBuf {
    // Reversed byte order; finish() flips it
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(128) }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Push raw content bytes.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buf.extend(data.iter().rev());
    }

    /// Push a single raw byte.
    pub fn push_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Push a length field (minimal form).
    pub fn push_length(&mut self, len: usize) {
        let (bytes, n) = encode_length(len);
        // encode_length already returns reversed bytes
        self.buf.extend_from_slice(&bytes[..n]);
    }

    /// Push a tag byte.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Push a signed INTEGER with minimal two's-complement contents.
    pub fn push_integer(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        // Strip redundant leading 0x00/0xFF octets
        let mut start = 0;
        while start < 3 {
            let keep_sign = bytes[start + 1] & 0x80;
            if (bytes[start] == 0x00 && keep_sign == 0)
                || (bytes[start] == 0xFF && keep_sign != 0)
            {
                start += 1;
            } else {
                break;
            }
        }
        self.push_bytes(&bytes[start..]);
        self.push_length(4 - start);
        self.push_tag(tag::universal::INTEGER);
    }

    /// Push an unsigned 32-bit value under the given tag.
    ///
    /// A leading zero octet is added when the high bit of the first
    /// content octet would otherwise flip the sign.
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        while start < 3 && bytes[start] == 0 {
            start += 1;
        }
        let pad = bytes[start] & 0x80 != 0;
        self.push_bytes(&bytes[start..]);
        if pad {
            self.push_byte(0x00);
        }
        self.push_length(4 - start + pad as usize);
        self.push_tag(tag);
    }

    /// Push an unsigned 64-bit value under the given tag (Counter64).
    pub fn push_unsigned64(&mut self, tag: u8, value: u64) {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        while start < 7 && bytes[start] == 0 {
            start += 1;
        }
        let pad = bytes[start] & 0x80 != 0;
        self.push_bytes(&bytes[start..]);
        if pad {
            self.push_byte(0x00);
        }
        self.push_length(8 - start + pad as usize);
        self.push_tag(tag);
    }

    /// Push an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_bytes(data);
        self.push_length(data.len());
        self.push_tag(tag::universal::OCTET_STRING);
    }

    /// Push a NULL.
    pub fn push_null(&mut self) {
        self.push_length(0);
        self.push_tag(tag::universal::NULL);
    }

    /// Push an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &Oid) {
        let content = oid.to_ber();
        self.push_bytes(&content);
        self.push_length(content.len());
        self.push_tag(tag::universal::OBJECT_IDENTIFIER);
    }

    /// Push an IpAddress (4 octets, application tag 0x40).
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_bytes(&addr);
        self.push_length(4);
        self.push_tag(tag::application::IP_ADDRESS);
    }

    /// Push a SEQUENCE whose contents are written by `f`.
    ///
    /// The closure must push the sequence fields in reverse order.
    pub fn push_sequence(&mut self, f: impl FnOnce(&mut Self)) {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Push a constructed type under an arbitrary tag.
    pub fn push_constructed(&mut self, tag: u8, f: impl FnOnce(&mut Self)) {
        let mark = self.buf.len();
        f(self);
        let content_len = self.buf.len() - mark;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Finish encoding and return the bytes in wire order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }
}
