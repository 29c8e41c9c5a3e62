//! SNMP message envelopes.
//!
//! - [`CommunityMessage`] - v1/v2c messages with community string auth
//! - [`V3Message`] - v3 messages with USM security

mod community;
mod v3;

pub use community::CommunityMessage;
pub use v3::{MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, V3Message, V3MessageData};

/// Advertised maximum message size.
pub const MAX_MSG_SIZE: i32 = 65500;
