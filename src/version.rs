//! Protocol version.

/// SNMP protocol version.
///
/// The discriminant is the on-wire version integer: 0 for v1, 1 for v2c,
/// 3 for v3 (2 was never assigned to a deployed protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Version {
    /// SNMPv1 (wire version 0)
    V1 = 0,
    /// SNMPv2c (wire version 1)
    V2c = 1,
    /// SNMPv3 (wire version 3)
    V3 = 3,
}

impl Version {
    /// Create from the on-wire version integer.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::V1),
            1 => Some(Self::V2c),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    /// Get the on-wire version integer.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2c => write!(f, "v2c"),
            Self::V3 => write!(f, "v3"),
        }
    }
}
