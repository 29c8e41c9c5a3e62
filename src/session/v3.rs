//! v3 request flow: discovery and authenticated/encrypted exchanges.

use bytes::Bytes;

use super::{Session, SessionKeys};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::message::{
    MAX_MSG_SIZE, MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, V3Message, V3MessageData,
};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::transport::Transport;
use crate::util;
use crate::v3::{
    AuthProtocol, LocalizedKey, PrivKey, PrivProtocol, UsmSecurityParams,
    parse_discovery_response, sign_message, verify_message,
};
use crate::value::Value;
use crate::varbind::VarBind;

/// v3 user credentials.
#[derive(Clone)]
pub struct V3Security {
    /// User name.
    pub username: Bytes,
    /// Authentication hash.
    pub auth_protocol: AuthProtocol,
    /// Authentication password.
    pub auth_password: Vec<u8>,
    /// Privacy cipher.
    pub priv_protocol: PrivProtocol,
    /// Privacy password.
    pub priv_password: Vec<u8>,
    /// Digest used to derive the privacy key.
    ///
    /// `None` (the default) derives the privacy key with
    /// `auth_protocol`, which is what the deployed peer population
    /// expects. Set this to pick a different digest when talking to
    /// agents that localize privacy keys differently.
    pub priv_key_hash: Option<AuthProtocol>,
}

impl V3Security {
    /// Create credentials from typed protocols.
    pub fn new(
        username: &str,
        auth_protocol: AuthProtocol,
        auth_password: &str,
        priv_protocol: PrivProtocol,
        priv_password: &str,
    ) -> Self {
        Self {
            username: Bytes::copy_from_slice(username.as_bytes()),
            auth_protocol,
            auth_password: auth_password.as_bytes().to_vec(),
            priv_protocol,
            priv_password: priv_password.as_bytes().to_vec(),
            priv_key_hash: None,
        }
    }

    /// Create credentials from configuration-style algorithm names.
    ///
    /// Fails with [`Error::UnknownProtocol`] for anything other than
    /// MD5/SHA-1 and DES/AES-128.
    pub fn from_names(
        username: &str,
        auth_alg: &str,
        auth_password: &str,
        priv_alg: &str,
        priv_password: &str,
    ) -> Result<Self> {
        Ok(Self::new(
            username,
            AuthProtocol::parse(auth_alg)?,
            auth_password,
            PrivProtocol::parse(priv_alg)?,
            priv_password,
        ))
    }
}

impl std::fmt::Debug for V3Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V3Security")
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("auth_protocol", &self.auth_protocol)
            .field("priv_protocol", &self.priv_protocol)
            .finish()
    }
}

impl<T: Transport> Session<T> {
    /// Discover the agent's engine parameters and derive session keys.
    ///
    /// Sends a reportable, unauthenticated message with empty security
    /// parameters and an empty GET; the agent answers with a Report
    /// carrying its engine ID, boots, and time. Those are adopted, the
    /// privacy salt counters are seeded from system randomness, and the
    /// auth/priv keys are derived for this engine.
    ///
    /// Required before [`get_v3`](Self::get_v3) and
    /// [`get_next_v3`](Self::get_next_v3). A failure aborts the session
    /// setup; there is no automatic re-discovery.
    ///
    /// # Panics
    /// Panics when called on a session constructed without v3
    /// credentials.
    pub async fn discover(&mut self) -> Result<()> {
        assert!(
            self.security.is_some(),
            "discover() requires a session constructed with v3 credentials"
        );

        let msg_id = util::random_id();
        let request_id = util::random_id();

        let global = MsgGlobalData::new(
            msg_id,
            MAX_MSG_SIZE,
            MsgFlags::new(SecurityLevel::NoAuthNoPriv, true),
        );
        let scoped = ScopedPdu::with_empty_context(Pdu::get_request(request_id, &[]));
        let msg = V3Message::new(global, UsmSecurityParams::empty().encode(), scoped);

        let raw = self.poll_transport(&msg.encode()).await?;
        let response = V3Message::decode(raw)?;
        let engine = parse_discovery_response(response.security_params)?;

        tracing::debug!(
            target: "snmpoll::session",
            engine_id = %util::encode_hex(&engine.engine_id),
            engine_boots = engine.engine_boots,
            engine_time = engine.engine_time,
            "discovered engine"
        );

        // Seed both counters; they are incremented before every use
        self.aes_salt = util::random_u64() >> 1;
        self.des_salt = util::random_u64() as u32;

        let security = self.security.as_ref().expect("checked above");
        let auth = LocalizedKey::from_password(
            security.auth_protocol,
            &security.auth_password,
            &engine.engine_id,
        );
        let priv_hash = security.priv_key_hash.unwrap_or(security.auth_protocol);
        let privacy = PrivKey::from_password(
            priv_hash,
            security.priv_protocol,
            &security.priv_password,
            &engine.engine_id,
        );

        self.keys = Some(SessionKeys { auth, privacy });
        self.engine = Some(engine);
        Ok(())
    }

    /// v3 GET: the value at `oid`.
    pub async fn get_v3(&mut self, oid: &Oid) -> Result<Value> {
        self.exchange_v3(PduType::GetRequest, oid)
            .await
            .map(|(_, value)| value)
    }

    /// v3 GET-NEXT: the lexicographic successor of `oid` and its value.
    pub async fn get_next_v3(&mut self, oid: &Oid) -> Result<(Oid, Value)> {
        self.exchange_v3(PduType::GetNextRequest, oid).await
    }

    /// One authenticated, encrypted exchange.
    async fn exchange_v3(&mut self, pdu_type: PduType, oid: &Oid) -> Result<(Oid, Value)> {
        let engine = self.engine.clone().ok_or(Error::NotDiscovered)?;
        let keys = self.keys.as_ref().ok_or(Error::NotDiscovered)?;
        let auth_key = keys.auth.clone();
        let priv_key = keys.privacy.clone();
        let username = self
            .security
            .as_ref()
            .expect("v3 keys cannot exist without credentials")
            .username
            .clone();

        let request_id = util::random_id();
        let msg_id = util::random_id();

        // Inner scoped PDU, sealed before the envelope is built
        let pdu = Pdu {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: vec![VarBind::null(oid.clone())],
        };
        let scoped = ScopedPdu::new(engine.engine_id.clone(), Bytes::new(), pdu);
        let plaintext = scoped.encode_to_bytes();

        let salt = self.next_salt();
        let (ciphertext, priv_params) =
            priv_key.encrypt(&plaintext, engine.engine_boots, engine.engine_time, salt)?;

        let usm = UsmSecurityParams::new(
            engine.engine_id.clone(),
            engine.engine_boots,
            engine.engine_time,
            username,
        )
        .with_auth_placeholder(auth_key.protocol().mac_len())
        .with_priv_params(priv_params);

        let global = MsgGlobalData::new(
            msg_id,
            MAX_MSG_SIZE,
            MsgFlags::new(SecurityLevel::AuthPriv, true),
        );
        let msg = V3Message::new_encrypted(global, usm.encode(), ciphertext);

        // Serialize with the zeroed placeholder, sign, splice
        let mut data = msg.encode().to_vec();
        let (auth_offset, _) = UsmSecurityParams::find_auth_params_offset(&data)
            .expect("freshly encoded message carries the auth placeholder");
        sign_message(&auth_key, &mut data, auth_offset);

        tracing::debug!(
            target: "snmpoll::session",
            pdu_type = %pdu_type,
            request_id,
            msg_id,
            "sending v3 request"
        );

        let raw = self.poll_transport(&data).await?;
        let response = V3Message::decode(raw.clone())?;
        let usm_resp = UsmSecurityParams::decode(response.security_params.clone())?;

        // Adopt the engine's current epoch for subsequent requests
        if let Some(engine) = self.engine.as_mut() {
            engine.adopt(&usm_resp);
        }

        if usm_resp.auth_params.is_empty() || usm_resp.priv_params.is_empty() {
            return Err(Error::UnauthenticatedReply);
        }

        if self.strict_request_ids() {
            let (offset, len) = UsmSecurityParams::find_auth_params_offset(&raw)
                .ok_or(Error::AuthenticationFailed)?;
            if !verify_message(&auth_key, &raw, offset, len) {
                return Err(Error::AuthenticationFailed);
            }
        }

        let response_pdu = match response.data {
            V3MessageData::Encrypted(ciphertext) => {
                let plaintext = priv_key.decrypt(
                    &ciphertext,
                    usm_resp.engine_boots,
                    usm_resp.engine_time,
                    &usm_resp.priv_params,
                )?;
                let mut decoder = crate::ber::Decoder::new(plaintext);
                ScopedPdu::decode(&mut decoder)?.pdu
            }
            V3MessageData::Plaintext(scoped) => scoped.pdu,
        };

        if self.strict_request_ids() && response_pdu.request_id != request_id {
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

        let vb = response_pdu
            .varbinds
            .into_iter()
            .next()
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::EmptyVarBinds))?;
        Ok((vb.oid, vb.value))
    }

    /// Advance the salt counter for the session's cipher.
    ///
    /// Incremented before use so an IV never repeats within one
    /// (boots, time) window.
    fn next_salt(&mut self) -> u64 {
        let protocol = self
            .security
            .as_ref()
            .map(|s| s.priv_protocol)
            .unwrap_or(PrivProtocol::Aes128);
        match protocol {
            PrivProtocol::Des => {
                self.des_salt = self.des_salt.wrapping_add(1);
                self.des_salt as u64
            }
            PrivProtocol::Aes128 => {
                self.aes_salt = self.aes_salt.wrapping_add(1);
                self.aes_salt
            }
        }
    }
}
