//! Inbound trap parsing.
//!
//! One datagram in, one typed [`Trap`] out. Wire versions 0 and 1 carry
//! community traps (the v1 trap PDU has its own layout with enterprise
//! OID and agent address); wire version 3 carries an encrypted trap
//! whose credentials are looked up in a [`TrapUser`] table by the user
//! named in the security parameters.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::ber::{Decoder, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::message::{ScopedPdu, V3Message, V3MessageData};
use crate::oid::Oid;
use crate::pdu::{Pdu, TrapV1Pdu};
use crate::transport::RECV_BUF_SIZE;
use crate::v3::{
    AuthProtocol, LocalizedKey, PrivKey, PrivProtocol, UsmSecurityParams, verify_message,
};
use crate::value::Value;
use crate::varbind::varbind_map;

/// Credentials for one v3 trap sender.
#[derive(Debug, Clone)]
pub struct TrapUser {
    /// User name matched against inbound security parameters.
    pub user: String,
    /// Authentication hash.
    pub auth_protocol: AuthProtocol,
    /// Authentication password.
    pub auth_password: String,
    /// Privacy cipher.
    pub priv_protocol: PrivProtocol,
    /// Privacy password.
    pub priv_password: String,
}

impl TrapUser {
    /// Create a trap user from typed protocols.
    pub fn new(
        user: &str,
        auth_protocol: AuthProtocol,
        auth_password: &str,
        priv_protocol: PrivProtocol,
        priv_password: &str,
    ) -> Self {
        Self {
            user: user.to_string(),
            auth_protocol,
            auth_password: auth_password.to_string(),
            priv_protocol,
            priv_password: priv_password.to_string(),
        }
    }

    /// Create a trap user from configuration-style algorithm names.
    pub fn from_names(
        user: &str,
        auth_alg: &str,
        auth_password: &str,
        priv_alg: &str,
        priv_password: &str,
    ) -> Result<Self> {
        Ok(Self::new(
            user,
            AuthProtocol::parse(auth_alg)?,
            auth_password,
            PrivProtocol::parse(priv_alg)?,
            priv_password,
        ))
    }
}

/// One parsed trap.
#[derive(Debug, Clone)]
pub struct Trap {
    /// User-facing protocol version: 1, 2, or 3.
    pub version: u32,
    /// Enterprise OID (v1 traps only).
    pub oid: Option<Oid>,
    /// Community string (v1/v2c traps; empty for v3).
    pub community: String,
    /// User name from the security parameters (v3 traps; empty otherwise).
    pub username: String,
    /// Agent address from the trap PDU (v1 traps only).
    pub address: Option<Ipv4Addr>,
    /// Bindings keyed by OID text.
    pub varbinds: HashMap<String, Value>,
}

/// Parse one trap datagram against a trap-user table.
pub(crate) fn parse_with(
    users: &[TrapUser],
    verify_auth: bool,
    datagram: &[u8],
) -> Result<Trap> {
    let mut decoder = Decoder::new(Bytes::copy_from_slice(datagram));
    let mut seq = decoder.read_sequence()?;

    let at = seq.offset();
    let wire_version = seq.read_integer()?;

    match wire_version {
        // Community trap; the user-facing version is wire + 1
        0 | 1 => parse_community_trap(&mut seq, wire_version as u32 + 1),
        3 => parse_v3_trap(&mut seq, users, verify_auth, datagram),
        other => Err(Error::decode(at, DecodeErrorKind::UnknownVersion(other))),
    }
}

fn parse_community_trap(seq: &mut Decoder, version: u32) -> Result<Trap> {
    let community = seq.read_octet_string()?;
    let community = String::from_utf8_lossy(&community).into_owned();

    if seq.peek_tag() == Some(tag::pdu::TRAP_V1) {
        let pdu = TrapV1Pdu::decode(seq)?;
        return Ok(Trap {
            version,
            oid: Some(pdu.enterprise),
            community,
            username: String::new(),
            address: Some(Ipv4Addr::from(pdu.agent_addr)),
            varbinds: varbind_map(pdu.varbinds),
        });
    }

    let pdu = Pdu::decode(seq)?;
    Ok(Trap {
        version,
        oid: None,
        community,
        username: String::new(),
        address: None,
        varbinds: varbind_map(pdu.varbinds),
    })
}

fn parse_v3_trap(
    seq: &mut Decoder,
    users: &[TrapUser],
    verify_auth: bool,
    datagram: &[u8],
) -> Result<Trap> {
    let msg = V3Message::decode_from_sequence(seq)?;
    let usm = UsmSecurityParams::decode(msg.security_params.clone())?;

    if usm.auth_params.is_empty() || usm.priv_params.is_empty() {
        return Err(Error::UnauthenticatedReply);
    }

    let username = String::from_utf8_lossy(&usm.username).into_owned();
    let user = users
        .iter()
        .find(|u| u.user == username)
        .ok_or_else(|| Error::UnknownTrapUser {
            user: username.clone(),
        })?;

    let auth_key = LocalizedKey::from_password(
        user.auth_protocol,
        user.auth_password.as_bytes(),
        &usm.engine_id,
    );

    if verify_auth {
        let (offset, len) = UsmSecurityParams::find_auth_params_offset(datagram)
            .ok_or(Error::AuthenticationFailed)?;
        if !verify_message(&auth_key, datagram, offset, len) {
            tracing::debug!(target: "snmpoll::trap", user = %username, "trap HMAC verification failed");
            return Err(Error::AuthenticationFailed);
        }
    }

    let priv_key = PrivKey::from_password(
        user.auth_protocol,
        user.priv_protocol,
        user.priv_password.as_bytes(),
        &usm.engine_id,
    );

    let pdu = match msg.data {
        V3MessageData::Encrypted(ciphertext) => {
            let plaintext = priv_key.decrypt(
                &ciphertext,
                usm.engine_boots,
                usm.engine_time,
                &usm.priv_params,
            )?;
            let mut decoder = Decoder::new(plaintext);
            ScopedPdu::decode(&mut decoder)?.pdu
        }
        V3MessageData::Plaintext(scoped) => scoped.pdu,
    };

    Ok(Trap {
        version: 3,
        oid: None,
        community: String::new(),
        username,
        address: None,
        varbinds: varbind_map(pdu.varbinds),
    })
}

/// UDP listener that receives and parses traps.
///
/// Binds a socket (typically on port 162), receives one datagram at a
/// time, and parses it with its own trap-user table. Parsing itself is
/// port-agnostic; bind wherever the senders are configured to notify.
pub struct TrapListener {
    socket: UdpSocket,
    users: Vec<TrapUser>,
    verify_auth: bool,
    buf: Vec<u8>,
}

impl TrapListener {
    /// Bind to an address such as `"0.0.0.0:162"`.
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Io { source })?;
        tracing::debug!(target: "snmpoll::trap", addr = %addr, "trap listener bound");
        Ok(Self {
            socket,
            users: Vec::new(),
            verify_auth: false,
            buf: vec![0u8; RECV_BUF_SIZE],
        })
    }

    /// Register credentials consulted when parsing v3 traps.
    pub fn add_user(&mut self, user: TrapUser) {
        self.users.push(user);
    }

    /// Verify the HMAC of inbound v3 traps. Off by default.
    pub fn set_verify_auth(&mut self, verify: bool) {
        self.verify_auth = verify;
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|source| Error::Io { source })
    }

    /// Receive and parse one trap, returning it with the sender address.
    pub async fn recv(&mut self) -> Result<(Trap, SocketAddr)> {
        let (n, from) = self
            .socket
            .recv_from(&mut self.buf)
            .await
            .map_err(|source| Error::Io { source })?;
        let trap = parse_with(&self.users, self.verify_auth, &self.buf[..n])?;
        Ok((trap, from))
    }
}
