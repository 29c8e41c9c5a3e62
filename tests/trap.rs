//! Trap parsing: wire versions 0, 1, and 3, plus the UDP listener.

use std::time::Duration;

use bytes::Bytes;
use snmpoll::ber::EncodeBuf;
use snmpoll::message::{
    CommunityMessage, MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, V3Message,
};
use snmpoll::pdu::{Pdu, PduType, TrapV1Pdu};
use snmpoll::v3::{LocalizedKey, PrivKey, UsmSecurityParams, sign_message};
use snmpoll::{
    AuthProtocol, Error, MockTransport, PrivProtocol, Session, TrapListener, TrapUser, Value,
    VarBind, Version, oid,
};

const ENGINE_ID: &[u8] = b"\x80\x00\x1f\x88\x80trapengine";

fn parser_session() -> Session<MockTransport> {
    Session::on_transport(
        MockTransport::new(),
        "public",
        Version::V2c,
        Duration::from_millis(100),
        0,
    )
}

fn v1_trap_datagram() -> Vec<u8> {
    let trap = TrapV1Pdu {
        enterprise: oid!(1, 3, 6, 1, 4, 1, 9999),
        agent_addr: [10, 0, 0, 5],
        generic_trap: 6,
        specific_trap: 12,
        time_stamp: 42,
        varbinds: vec![VarBind::new(
            oid!(1, 3, 6, 1, 4, 1, 9999, 1, 1),
            Value::from("power supply failed"),
        )],
    };

    // The v1 trap PDU does not fit the common PDU shape, so the
    // envelope is laid out by hand
    let mut buf = EncodeBuf::new();
    buf.push_sequence(|buf| {
        trap.encode(buf);
        buf.push_octet_string(b"trapcomm");
        buf.push_integer(0);
    });
    buf.finish().to_vec()
}

fn v2c_trap_datagram() -> Vec<u8> {
    let pdu = Pdu {
        pdu_type: PduType::TrapV2,
        request_id: 1234,
        error_status: 0,
        error_index: 0,
        varbinds: vec![
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(99)),
            VarBind::new(
                oid!(1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0),
                Value::ObjectIdentifier(oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3)),
            ),
        ],
    };
    CommunityMessage::new(Version::V2c, b"traps".as_slice(), pdu)
        .encode()
        .to_vec()
}

fn v3_trap_datagram(auth: AuthProtocol, privacy: PrivProtocol, user: &str) -> Vec<u8> {
    let auth_key = LocalizedKey::from_password(auth, b"trapauthpass", ENGINE_ID);
    let priv_key = PrivKey::from_password(auth, privacy, b"trapprivpass", ENGINE_ID);

    let pdu = Pdu {
        pdu_type: PduType::TrapV2,
        request_id: 77,
        error_status: 0,
        error_index: 0,
        varbinds: vec![VarBind::new(
            oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8, 3),
            Value::Integer(2),
        )],
    };
    let scoped = ScopedPdu::new(Bytes::copy_from_slice(ENGINE_ID), Bytes::new(), pdu);
    let (ciphertext, priv_params) = priv_key
        .encrypt(&scoped.encode_to_bytes(), 3, 120, 42)
        .unwrap();

    let usm = UsmSecurityParams::new(
        Bytes::copy_from_slice(ENGINE_ID),
        3,
        120,
        Bytes::copy_from_slice(user.as_bytes()),
    )
    .with_auth_placeholder(12)
    .with_priv_params(priv_params);

    let global = MsgGlobalData::new(55, 65500, MsgFlags::new(SecurityLevel::AuthPriv, false));
    let mut data = V3Message::new_encrypted(global, usm.encode(), ciphertext)
        .encode()
        .to_vec();

    let (offset, _) = UsmSecurityParams::find_auth_params_offset(&data).unwrap();
    sign_message(&auth_key, &mut data, offset);
    data
}

fn trap_user(user: &str) -> TrapUser {
    TrapUser::new(
        user,
        AuthProtocol::Sha1,
        "trapauthpass",
        PrivProtocol::Aes128,
        "trapprivpass",
    )
}

#[test]
fn parse_v1_trap() {
    let session = parser_session();
    let trap = session.parse_trap(&v1_trap_datagram()).unwrap();

    assert_eq!(trap.version, 1);
    assert_eq!(trap.community, "trapcomm");
    assert_eq!(trap.oid, Some(oid!(1, 3, 6, 1, 4, 1, 9999)));
    assert_eq!(trap.address, Some("10.0.0.5".parse().unwrap()));
    assert_eq!(
        trap.varbinds["1.3.6.1.4.1.9999.1.1"].as_str(),
        Some("power supply failed")
    );
}

#[test]
fn parse_v2c_trap() {
    let session = parser_session();
    let trap = session.parse_trap(&v2c_trap_datagram()).unwrap();

    assert_eq!(trap.version, 2);
    assert_eq!(trap.community, "traps");
    assert_eq!(trap.oid, None);
    assert_eq!(trap.address, None);
    assert_eq!(trap.varbinds.len(), 2);
    assert_eq!(trap.varbinds["1.3.6.1.2.1.1.3.0"].as_u32(), Some(99));
}

#[test]
fn parse_v3_trap_with_registered_user() {
    let mut session = parser_session();
    session.add_trap_user(trap_user("nms"));

    let trap = session
        .parse_trap(&v3_trap_datagram(AuthProtocol::Sha1, PrivProtocol::Aes128, "nms"))
        .unwrap();

    assert_eq!(trap.version, 3);
    assert_eq!(trap.username, "nms");
    assert!(trap.community.is_empty());
    assert_eq!(trap.varbinds["1.3.6.1.2.1.2.2.1.8.3"].as_i32(), Some(2));
}

#[test]
fn parse_v3_trap_unknown_user() {
    let mut session = parser_session();
    session.add_trap_user(trap_user("nms"));

    let err = session
        .parse_trap(&v3_trap_datagram(AuthProtocol::Sha1, PrivProtocol::Aes128, "stranger"))
        .unwrap_err();

    match err {
        Error::UnknownTrapUser { user } => assert_eq!(user, "stranger"),
        other => panic!("expected UnknownTrapUser, got {other:?}"),
    }
}

#[test]
fn parse_v3_trap_no_users_configured() {
    let session = parser_session();
    let err = session
        .parse_trap(&v3_trap_datagram(AuthProtocol::Sha1, PrivProtocol::Aes128, "nms"))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTrapUser { .. }));
}

#[test]
fn v3_trap_auth_verification_opt_in() {
    let mut session = parser_session();
    session.add_trap_user(trap_user("nms"));
    session.set_verify_trap_auth(true);

    // Intact trap verifies
    let datagram = v3_trap_datagram(AuthProtocol::Sha1, PrivProtocol::Aes128, "nms");
    assert!(session.parse_trap(&datagram).is_ok());

    // Flip one payload bit: verification must now fail
    let mut tampered = datagram.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    let err = session.parse_trap(&tampered).unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed));

    // The same tampered trap parses when verification stays off,
    // because stream-cipher decryption alone cannot detect the damage
    session.set_verify_trap_auth(false);
    assert!(session.parse_trap(&tampered).is_ok());
}

#[test]
fn parse_v3_trap_des() {
    let mut session = parser_session();
    session.add_trap_user(TrapUser::new(
        "desuser",
        AuthProtocol::Md5,
        "trapauthpass",
        PrivProtocol::Des,
        "trapprivpass",
    ));

    let trap = session
        .parse_trap(&v3_trap_datagram(AuthProtocol::Md5, PrivProtocol::Des, "desuser"))
        .unwrap();
    assert_eq!(trap.version, 3);
    assert_eq!(trap.username, "desuser");
}

#[test]
fn parse_garbage_fails_cleanly() {
    let session = parser_session();
    assert!(session.parse_trap(&[]).is_err());
    assert!(session.parse_trap(&[0x30, 0x03, 0x02, 0x01, 0x05]).is_err());
    assert!(session.parse_trap(&[0xFF; 64]).is_err());
}

#[tokio::test]
async fn trap_listener_receives_and_parses() {
    let mut listener = TrapListener::bind("127.0.0.1:0").await.unwrap();
    listener.add_user(trap_user("nms"));
    let addr = listener.local_addr().unwrap();

    let sender = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(&v2c_trap_datagram(), addr).await.unwrap();

    let (trap, from) = listener.recv().await.unwrap();
    assert_eq!(trap.version, 2);
    assert_eq!(from.ip(), addr.ip());

    sender
        .send_to(
            &v3_trap_datagram(AuthProtocol::Sha1, PrivProtocol::Aes128, "nms"),
            addr,
        )
        .await
        .unwrap();
    let (trap, _) = listener.recv().await.unwrap();
    assert_eq!(trap.version, 3);
    assert_eq!(trap.username, "nms");
}
