//! Session: the request/response engine.
//!
//! A [`Session`] owns one transport and drives one exchange at a time:
//! build the request, poll the transport with bounded retries, decode
//! the response. v3 state (engine parameters, derived keys, privacy
//! salts) lives here too and is only ever touched through `&mut self`.

mod v3;

pub use v3::V3Security;

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{DecodeErrorKind, Error, Result};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::transport::{MockTransport, RECV_BUF_SIZE, Transport, UdpTransport, poll};
use crate::trap::{Trap, TrapUser};
use crate::util;
use crate::v3::{EngineState, LocalizedKey, PrivKey};
use crate::value::Value;
use crate::varbind::{VarBind, varbind_map};
use crate::version::Version;

/// Repetition count used by table walks.
const TABLE_MAX_REPETITIONS: i32 = 50;

pub(crate) struct SessionKeys {
    pub(crate) auth: LocalizedKey,
    pub(crate) privacy: PrivKey,
}

/// A session with one agent.
///
/// Generic over the transport; the default is a connected UDP socket.
/// All request methods take `&mut self`: a session is a single-owner,
/// one-exchange-at-a-time object, and anything concurrent must be
/// serialized by the caller.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use snmpoll::{Session, Version, oid};
///
/// # async fn example() -> Result<(), snmpoll::Error> {
/// let mut session = Session::new(
///     "192.0.2.1",
///     "public",
///     Version::V2c,
///     Duration::from_secs(2),
///     3,
/// )
/// .await?;
///
/// let sys_descr = session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await?;
/// println!("sysDescr: {sys_descr}");
/// # Ok(())
/// # }
/// ```
pub struct Session<T: Transport = UdpTransport> {
    transport: T,
    version: Version,
    community: Bytes,
    timeout: Duration,
    retries: u32,
    strict_request_ids: bool,
    verify_trap_auth: bool,
    trap_users: Vec<TrapUser>,
    pub(crate) security: Option<V3Security>,
    pub(crate) engine: Option<EngineState>,
    pub(crate) keys: Option<SessionKeys>,
    pub(crate) des_salt: u32,
    pub(crate) aes_salt: u64,
    recv_buf: Vec<u8>,
}

impl Session<UdpTransport> {
    /// Open a community (v1/v2c) session.
    ///
    /// Resolves `target` (default port 161) and connects a UDP socket.
    pub async fn new(
        target: &str,
        community: &str,
        version: Version,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self> {
        let transport = UdpTransport::connect(target).await?;
        Ok(Self::on_transport(transport, community, version, timeout, retries))
    }

    /// Open a v3 session.
    ///
    /// `auth_alg` must name MD5 or SHA-1 and `priv_alg` DES or AES-128;
    /// anything else fails with [`Error::UnknownProtocol`]. Run
    /// [`discover`](Self::discover) before issuing requests.
    #[allow(clippy::too_many_arguments)]
    pub async fn new_v3(
        target: &str,
        user: &str,
        auth_alg: &str,
        auth_pwd: &str,
        priv_alg: &str,
        priv_pwd: &str,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self> {
        let security = V3Security::from_names(user, auth_alg, auth_pwd, priv_alg, priv_pwd)?;
        let transport = UdpTransport::connect(target).await?;
        Ok(Self::v3_on_transport(transport, security, timeout, retries))
    }
}

impl<T: Transport> Session<T> {
    /// Build a community session over an existing transport.
    ///
    /// Useful for non-default sockets and for tests with
    /// [`MockTransport`].
    pub fn on_transport(
        transport: T,
        community: &str,
        version: Version,
        timeout: Duration,
        retries: u32,
    ) -> Self {
        Self {
            transport,
            version,
            community: Bytes::copy_from_slice(community.as_bytes()),
            timeout,
            retries,
            strict_request_ids: false,
            verify_trap_auth: false,
            trap_users: Vec::new(),
            security: None,
            engine: None,
            keys: None,
            des_salt: 0,
            aes_salt: 0,
            recv_buf: vec![0u8; RECV_BUF_SIZE],
        }
    }

    /// Build a v3 session over an existing transport.
    pub fn v3_on_transport(
        transport: T,
        security: V3Security,
        timeout: Duration,
        retries: u32,
    ) -> Self {
        let mut session = Self::on_transport(transport, "", Version::V3, timeout, retries);
        session.security = Some(security);
        session
    }

    /// Require response request-ids to match the request, and verify the
    /// HMAC of v3 replies. Off by default: the deployed agent population
    /// includes devices that echo stale ids, and a single-exchange
    /// connected socket rarely sees foreign datagrams.
    pub fn set_strict_request_ids(&mut self, strict: bool) {
        self.strict_request_ids = strict;
    }

    /// Verify the HMAC of inbound v3 traps against the matched trap
    /// user's key. Off by default.
    pub fn set_verify_trap_auth(&mut self, verify: bool) {
        self.verify_trap_auth = verify;
    }

    /// Register credentials consulted when parsing inbound v3 traps.
    pub fn add_trap_user(&mut self, user: TrapUser) {
        self.trap_users.push(user);
    }

    pub(crate) fn strict_request_ids(&self) -> bool {
        self.strict_request_ids
    }

    /// GET a single OID, returning its value.
    pub async fn get(&mut self, oid: &Oid) -> Result<Value> {
        let pdu = Pdu::get_request(util::random_id(), std::slice::from_ref(oid));
        let response = self.request(pdu).await?;
        first_varbind(response).map(|vb| vb.value)
    }

    /// GET several OIDs in one request, returning OID text -> value.
    ///
    /// Map ordering carries no meaning.
    pub async fn get_multiple(&mut self, oids: &[Oid]) -> Result<HashMap<String, Value>> {
        let pdu = Pdu::get_request(util::random_id(), oids);
        let response = self.request(pdu).await?;
        Ok(varbind_map(response.varbinds))
    }

    /// GET-NEXT: the lexicographic successor of `oid` and its value.
    pub async fn get_next(&mut self, oid: &Oid) -> Result<(Oid, Value)> {
        let pdu = Pdu::get_next_request(util::random_id(), std::slice::from_ref(oid));
        let response = self.request(pdu).await?;
        first_varbind(response).map(|vb| (vb.oid, vb.value))
    }

    /// GET-BULK starting at `oid`, up to `max_repetitions` bindings.
    ///
    /// Many devices silently drop GET-BULK requests above some
    /// repetition count; if a request goes unanswered, retry with a
    /// smaller value or use [`get_table`](Self::get_table).
    pub async fn get_bulk(
        &mut self,
        oid: &Oid,
        max_repetitions: i32,
    ) -> Result<HashMap<String, Value>> {
        let pdu = Pdu::get_bulk_request(
            util::random_id(),
            0,
            max_repetitions,
            std::slice::from_ref(oid),
        );
        let response = self.request(pdu).await?;
        Ok(varbind_map(response.varbinds))
    }

    /// Walk the whole subtree under `root` with repeated GET-BULK.
    ///
    /// Keeps only bindings whose OID lies within `root`. The cursor
    /// advances to the largest OID seen in each batch; the walk ends
    /// when a batch is empty, fails to advance the cursor, or crosses
    /// out of the subtree. Duplicate OIDs overwrite earlier entries.
    pub async fn get_table(&mut self, root: &Oid) -> Result<HashMap<String, Value>> {
        let mut results = HashMap::new();
        let mut cursor = root.clone();

        while cursor.starts_with(root) {
            tracing::debug!(target: "snmpoll::session", cursor = %cursor, "table walk round");
            let batch = self.get_bulk(&cursor, TABLE_MAX_REPETITIONS).await?;
            if batch.is_empty() {
                break;
            }

            let mut next = cursor.clone();
            for (text, value) in batch {
                let oid = Oid::parse(&text)?;
                if oid.starts_with(root) {
                    results.insert(text, value);
                }
                if oid > next {
                    next = oid;
                }
            }

            if next == cursor {
                // Agent repeated itself; assume end of table
                break;
            }
            cursor = next;
        }

        Ok(results)
    }

    /// Parse one received trap datagram.
    ///
    /// v3 traps require a matching entry registered via
    /// [`add_trap_user`](Self::add_trap_user). Never mutates session
    /// state.
    pub fn parse_trap(&self, datagram: &[u8]) -> Result<Trap> {
        crate::trap::parse_with(&self.trap_users, self.verify_trap_auth, datagram)
    }

    /// Close the session, dropping the underlying socket.
    pub fn close(self) {}

    /// One community request/response exchange.
    async fn request(&mut self, pdu: Pdu) -> Result<Pdu> {
        let request_id = pdu.request_id;
        tracing::debug!(
            target: "snmpoll::session",
            pdu_type = %pdu.pdu_type,
            request_id,
            varbinds = pdu.varbinds.len(),
            "sending request"
        );

        let data = CommunityMessage::new(self.version, self.community.clone(), pdu).encode();
        let n = poll(
            &mut self.transport,
            &data,
            &mut self.recv_buf,
            self.retries,
            self.timeout,
        )
        .await?;

        let response = CommunityMessage::decode(Bytes::copy_from_slice(&self.recv_buf[..n]))?;
        let response_pdu = response.pdu;

        if self.strict_request_ids && response_pdu.request_id != request_id {
            return Err(Error::RequestIdMismatch {
                expected: request_id,
                actual: response_pdu.request_id,
            });
        }

        if response_pdu.is_error() {
            return Err(Error::Snmp {
                status: response_pdu.error_status_enum(),
                index: response_pdu.error_index,
            });
        }

        Ok(response_pdu)
    }

    pub(crate) async fn poll_transport(&mut self, data: &[u8]) -> Result<Bytes> {
        let n = poll(
            &mut self.transport,
            data,
            &mut self.recv_buf,
            self.retries,
            self.timeout,
        )
        .await?;
        Ok(Bytes::copy_from_slice(&self.recv_buf[..n]))
    }
}

impl Session<MockTransport> {
    /// Access the mock transport of a test session.
    pub fn mock(&mut self) -> &mut MockTransport {
        &mut self.transport
    }
}

fn first_varbind(pdu: Pdu) -> Result<VarBind> {
    pdu.varbinds
        .into_iter()
        .next()
        .ok_or_else(|| Error::decode(0, DecodeErrorKind::EmptyVarBinds))
}
