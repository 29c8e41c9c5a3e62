//! Shared helpers: in-process UDP agents and canned message builders.

#![allow(dead_code)]

use std::net::SocketAddr;

use bytes::Bytes;
use snmpoll::message::CommunityMessage;
use snmpoll::pdu::{Pdu, PduType};
use snmpoll::{Value, VarBind, Version, oid};
use tokio::net::UdpSocket;

/// Build an encoded v2c GET response carrying the given varbinds.
pub fn v2c_response(community: &str, request_id: i32, varbinds: Vec<VarBind>) -> Vec<u8> {
    let pdu = Pdu {
        pdu_type: PduType::Response,
        request_id,
        error_status: 0,
        error_index: 0,
        varbinds,
    };
    CommunityMessage::new(Version::V2c, Bytes::copy_from_slice(community.as_bytes()), pdu)
        .encode()
        .to_vec()
}

/// Build an encoded v2c error response.
pub fn v2c_error_response(
    community: &str,
    request_id: i32,
    error_status: i32,
    error_index: i32,
) -> Vec<u8> {
    let pdu = Pdu {
        pdu_type: PduType::Response,
        request_id,
        error_status,
        error_index,
        varbinds: vec![VarBind::null(oid!(1, 3, 6, 1))],
    };
    CommunityMessage::new(Version::V2c, Bytes::copy_from_slice(community.as_bytes()), pdu)
        .encode()
        .to_vec()
}

/// A canned sysDescr varbind.
pub fn sys_descr_varbind() -> VarBind {
    VarBind::new(
        oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
        Value::from("Linux router1 5.4.0"),
    )
}

/// Spawn a UDP agent that answers each datagram through `handler`.
///
/// Returning `None` from the handler drops the request (simulating a
/// lost datagram). The task runs until the test binary exits.
pub async fn spawn_agent<F>(mut handler: F) -> SocketAddr
where
    F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 65535];
        loop {
            let Ok((n, from)) = socket.recv_from(&mut buf).await else {
                break;
            };
            if let Some(response) = handler(&buf[..n]) {
                let _ = socket.send_to(&response, from).await;
            }
        }
    });

    addr
}

/// Spawn an agent that decodes v2c requests and echoes the request id
/// back in a response built by `respond`.
pub async fn spawn_v2c_agent<F>(mut respond: F) -> SocketAddr
where
    F: FnMut(&Pdu) -> Vec<VarBind> + Send + 'static,
{
    spawn_agent(move |datagram| {
        let msg = CommunityMessage::decode(bytes::Bytes::copy_from_slice(datagram)).ok()?;
        let varbinds = respond(&msg.pdu);
        Some(v2c_response(
            &String::from_utf8_lossy(&msg.community),
            msg.pdu.request_id,
            varbinds,
        ))
    })
    .await
}
