//! Community (v1/v2c) session flows over mock and loopback transports.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use snmpoll::{Error, MockTransport, Session, Value, VarBind, Version, oid};

use common::{spawn_v2c_agent, sys_descr_varbind, v2c_error_response, v2c_response};

const TIMEOUT: Duration = Duration::from_millis(100);

fn mock_session() -> Session<MockTransport> {
    Session::on_transport(MockTransport::new(), "public", Version::V2c, TIMEOUT, 1)
}

#[tokio::test]
async fn get_returns_single_value() {
    let mut session = mock_session();
    session
        .mock()
        .push_response(v2c_response("public", 1, vec![sys_descr_varbind()]));

    let value = session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await.unwrap();
    assert_eq!(value.as_str(), Some("Linux router1 5.4.0"));
}

#[tokio::test]
async fn get_sends_wire_exact_request() {
    let mut session = mock_session();
    session
        .mock()
        .push_response(v2c_response("public", 1, vec![sys_descr_varbind()]));

    session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await.unwrap();

    let sent = &session.mock().sent[0];
    // Outer sequence, then the version INTEGER
    assert_eq!(sent[0], 0x30);
    assert_eq!(sent[2], 0x02);
    assert_eq!(&sent[3..5], &[0x01, 0x01]);
    // Community
    assert_eq!(&sent[5..13], &[0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c']);
    // GET PDU
    assert_eq!(sent[13], 0xA0);
    // The OID near the end: 1.3.6.1.2.1.1.1.0
    let oid_bytes = [0x06, 0x08, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00];
    assert!(
        sent.windows(oid_bytes.len()).any(|w| w == oid_bytes),
        "request does not carry the expected OID encoding"
    );
}

#[tokio::test]
async fn get_multiple_maps_oid_text_to_values() {
    let mut session = mock_session();
    session.mock().push_response(v2c_response(
        "public",
        1,
        vec![
            sys_descr_varbind(),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(101)),
        ],
    ));

    let oids = [oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)];
    let values = session.get_multiple(&oids).await.unwrap();

    assert_eq!(values.len(), 2);
    assert_eq!(
        values["1.3.6.1.2.1.1.1.0"].as_str(),
        Some("Linux router1 5.4.0")
    );
    assert_eq!(values["1.3.6.1.2.1.1.3.0"].as_u32(), Some(101));
}

#[tokio::test]
async fn get_next_returns_successor_pair() {
    let mut session = mock_session();
    session.mock().push_response(v2c_response(
        "public",
        1,
        vec![VarBind::new(
            oid!(1, 3, 6, 1, 2, 1, 1, 2, 0),
            Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 8072)),
        )],
    ));

    let (oid, value) = session.get_next(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await.unwrap();
    assert_eq!(oid, oid!(1, 3, 6, 1, 2, 1, 1, 2, 0));
    assert_eq!(value.as_oid(), Some(&oid!(1, 3, 6, 1, 4, 1, 8072)));
}

#[tokio::test]
async fn agent_error_status_surfaces() {
    let mut session = mock_session();
    session
        .mock()
        .push_response(v2c_error_response("public", 1, 2, 1));

    let err = session.get(&oid!(1, 3, 6, 1, 9, 9)).await.unwrap_err();
    match err {
        Error::Snmp { status, index } => {
            assert_eq!(status, snmpoll::ErrorStatus::NoSuchName);
            assert_eq!(index, 1);
        }
        other => panic!("expected Snmp error, got {other:?}"),
    }
}

#[tokio::test]
async fn strict_mode_rejects_foreign_request_id() {
    let mut session = mock_session();
    session.set_strict_request_ids(true);
    session
        .mock()
        .push_response(v2c_response("public", -77, vec![sys_descr_varbind()]));

    let err = session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await.unwrap_err();
    assert!(matches!(err, Error::RequestIdMismatch { actual: -77, .. }));
}

#[tokio::test]
async fn permissive_mode_accepts_foreign_request_id() {
    let mut session = mock_session();
    session
        .mock()
        .push_response(v2c_response("public", -77, vec![sys_descr_varbind()]));

    assert!(session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await.is_ok());
}

#[tokio::test]
async fn timeout_exhausts_into_transport_error() {
    // No scripted responses: every receive blocks until the deadline
    let mut session = Session::on_transport(
        MockTransport::new(),
        "public",
        Version::V2c,
        Duration::from_millis(10),
        2,
    );

    let err = session.get(&oid!(1, 3, 6, 1)).await.unwrap_err();
    match err {
        Error::Transport { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected Transport error, got {other:?}"),
    }
    assert_eq!(session.mock().sent.len(), 3);
}

// --- GetTable termination behaviors -----------------------------------

fn table_response(rows: &[(&str, &str)]) -> Vec<u8> {
    let varbinds = rows
        .iter()
        .map(|(oid_text, value)| {
            VarBind::new(snmpoll::Oid::parse(oid_text).unwrap(), Value::from(*value))
        })
        .collect();
    v2c_response("public", 1, varbinds)
}

#[tokio::test]
async fn get_table_collects_subtree_and_stops_on_escape() {
    let mut session = mock_session();
    // Two in-subtree rounds, then a round whose largest OID leaves the
    // subtree
    session.mock().push_response(table_response(&[
        ("1.3.6.1.2.1.2.2.1.2.1", "eth0"),
        ("1.3.6.1.2.1.2.2.1.2.2", "eth1"),
    ]));
    session.mock().push_response(table_response(&[
        ("1.3.6.1.2.1.2.2.1.2.3", "eth2"),
        ("1.3.6.1.2.1.2.2.1.2.4", "eth3"),
    ]));
    session.mock().push_response(table_response(&[
        ("1.3.6.1.2.1.2.2.1.2.5", "eth4"),
        ("1.3.6.1.2.1.3.1.1.1.2", "outside"),
    ]));

    let table = session
        .get_table(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2))
        .await
        .unwrap();

    assert_eq!(table.len(), 5);
    assert_eq!(table["1.3.6.1.2.1.2.2.1.2.1"].as_str(), Some("eth0"));
    assert_eq!(table["1.3.6.1.2.1.2.2.1.2.5"].as_str(), Some("eth4"));
    assert!(!table.contains_key("1.3.6.1.2.1.3.1.1.1.2"));
    assert_eq!(session.mock().sent.len(), 3);
}

#[tokio::test]
async fn get_table_stops_on_empty_batch() {
    let mut session = mock_session();
    session.mock().push_response(table_response(&[]));

    let table = session
        .get_table(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2))
        .await
        .unwrap();

    assert!(table.is_empty());
    assert_eq!(session.mock().sent.len(), 1);
}

#[tokio::test]
async fn get_table_stops_when_cursor_does_not_advance() {
    let mut session = mock_session();
    let row = &[("1.3.6.1.2.1.2.2.1.2.1", "eth0")][..];
    session.mock().push_response(table_response(row));
    // Same OID again: no progress, walk must end
    session.mock().push_response(table_response(row));

    let table = session
        .get_table(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2))
        .await
        .unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(session.mock().sent.len(), 2);
}

// --- Loopback UDP agent ------------------------------------------------

#[tokio::test]
async fn get_over_loopback_udp() {
    let addr = spawn_v2c_agent(|_pdu| vec![sys_descr_varbind()]).await;

    let mut session = Session::new(&addr.to_string(), "public", Version::V2c, TIMEOUT, 1)
        .await
        .unwrap();
    // The agent echoes our request id, so strict mode passes end to end
    session.set_strict_request_ids(true);

    let value = session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await.unwrap();
    assert_eq!(value.as_str(), Some("Linux router1 5.4.0"));

    session.close();
}

#[tokio::test]
async fn retry_recovers_from_one_dropped_datagram() {
    let mut drop_first = true;
    let addr = common::spawn_agent(move |datagram| {
        if std::mem::take(&mut drop_first) {
            return None;
        }
        let msg =
            snmpoll::message::CommunityMessage::decode(bytes::Bytes::copy_from_slice(datagram))
                .ok()?;
        Some(v2c_response("public", msg.pdu.request_id, vec![sys_descr_varbind()]))
    })
    .await;

    let mut session = Session::new(
        &addr.to_string(),
        "public",
        Version::V2c,
        Duration::from_millis(50),
        1,
    )
    .await
    .unwrap();

    let value = session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await.unwrap();
    assert_eq!(value.as_str(), Some("Linux router1 5.4.0"));
}

#[tokio::test]
async fn unreachable_agent_fails_with_transport_error() {
    // An agent that receives but never answers
    let addr = common::spawn_agent(|_| None).await;

    let mut session = Session::new(
        &addr.to_string(),
        "public",
        Version::V2c,
        Duration::from_millis(20),
        1,
    )
    .await
    .unwrap();

    let err = session.get(&oid!(1, 3, 6, 1)).await.unwrap_err();
    match err {
        Error::Transport { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("expected Transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_bulk_over_loopback() {
    let addr = spawn_v2c_agent(|pdu| {
        assert_eq!(pdu.pdu_type, snmpoll::PduType::GetBulkRequest);
        assert_eq!(pdu.error_status, 0); // non-repeaters
        (1..=pdu.error_index)
            .map(|i| {
                VarBind::new(
                    snmpoll::Oid::parse(&format!("1.3.6.1.2.1.2.2.1.2.{i}")).unwrap(),
                    Value::Integer(i),
                )
            })
            .collect()
    })
    .await;

    let mut session = Session::new(&addr.to_string(), "public", Version::V2c, TIMEOUT, 1)
        .await
        .unwrap();

    let values: HashMap<String, Value> = session
        .get_bulk(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2), 10)
        .await
        .unwrap();

    assert_eq!(values.len(), 10);
    assert_eq!(values["1.3.6.1.2.1.2.2.1.2.7"].as_i32(), Some(7));
}
