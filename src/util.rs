//! Small shared utilities.

/// Encode bytes as a lowercase hex string.
pub fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Decode a hex string to bytes. Accepts upper and lower case; fails on
/// odd length or non-hex characters.
pub fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if !s.len().is_multiple_of(2) {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// Random non-negative i32 for request and message IDs.
pub(crate) fn random_id() -> i32 {
    let mut buf = [0u8; 4];
    getrandom::fill(&mut buf).expect("OS random source unavailable");
    (u32::from_ne_bytes(buf) >> 1) as i32
}

/// Random u64 for seeding privacy salt counters.
pub(crate) fn random_u64() -> u64 {
    let mut buf = [0u8; 8];
    getrandom::fill(&mut buf).expect("OS random source unavailable");
    u64::from_ne_bytes(buf)
}
