//! # snmpoll
//!
//! Session-oriented SNMP client and trap parser for Rust.
//!
//! ## Features
//!
//! - SNMPv1, v2c, and v3 (USM with MD5/SHA-1 auth, DES/AES-128 privacy)
//! - GET, GET-NEXT, GET-BULK, and bulk table walks
//! - Trap parsing for all three versions, including encrypted v3 traps
//! - Blocking-style one-exchange-at-a-time sessions on Tokio, with
//!   bounded retries and per-attempt deadlines
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use snmpoll::{Session, Version, oid};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmpoll::Error> {
//!     let mut session = Session::new(
//!         "192.0.2.1",
//!         "public",
//!         Version::V2c,
//!         Duration::from_secs(2),
//!         3,
//!     )
//!     .await?;
//!
//!     let sys_descr = session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await?;
//!     println!("sysDescr: {sys_descr}");
//!
//!     let interfaces = session.get_table(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2)).await?;
//!     for (oid, value) in &interfaces {
//!         println!("{oid} = {value}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## SNMPv3
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use snmpoll::{Session, oid};
//!
//! # async fn example() -> Result<(), snmpoll::Error> {
//! let mut session = Session::new_v3(
//!     "192.0.2.1",
//!     "admin",
//!     "SHA1",
//!     "authpass123",
//!     "AES",
//!     "privpass123",
//!     Duration::from_secs(2),
//!     3,
//! )
//! .await?;
//!
//! session.discover().await?;
//! let uptime = session.get_v3(&oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)).await?;
//! println!("uptime: {uptime}");
//! # Ok(())
//! # }
//! ```

pub mod ber;
pub mod error;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod session;
pub mod transport;
pub mod trap;
pub mod util;
pub mod v3;
pub mod value;
pub mod varbind;
pub mod version;

pub use error::{CryptoErrorKind, DecodeErrorKind, Error, ErrorStatus, OidErrorKind, Result};
pub use oid::Oid;
pub use pdu::{Pdu, PduType, TrapV1Pdu};
pub use session::{Session, V3Security};
pub use transport::{MockTransport, Transport, UdpTransport};
pub use trap::{Trap, TrapListener, TrapUser};
pub use v3::{AuthProtocol, PrivProtocol};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
