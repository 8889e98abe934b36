//! End-to-end replay scenarios over in-memory duplex connections.
//!
//! Each test hand-crafts a mock library, drives a live client against the
//! session, and checks the bytes that come back against the recording.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use mysql_replay::protocol::auth::AuthPlugin;
use mysql_replay::protocol::connect::{
    AuthMoreData, AuthSwitchRequest, Handshake, HandshakeResponse, SslRequest,
};
use mysql_replay::protocol::response::OkPacket;
use mysql_replay::protocol::statement::{
    BindParameter, ComStmtClose, ComStmtExecute, ComStmtPrepare, ComStmtPrepareOk,
};
use mysql_replay::protocol::text::ComQuery;
use mysql_replay::protocol::{
    BindValue, Capabilities, Message, Packet, PacketHeader, Status, TypeId,
};
use mysql_replay::{
    InMemoryMockStore, Mock, MockStore, ReplayOptions, ReplaySession, Socket, TlsUpgrade,
};

const SERVER_CAPS: Capabilities = Capabilities::PROTOCOL_41
    .union(Capabilities::SECURE_CONNECTION)
    .union(Capabilities::PLUGIN_AUTH)
    .union(Capabilities::SSL);

const CLIENT_CAPS: Capabilities = Capabilities::PROTOCOL_41
    .union(Capabilities::SECURE_CONNECTION)
    .union(Capabilities::PLUGIN_AUTH);

fn sized(seq: u8, message: Message) -> Packet {
    let probe = Packet::new(PacketHeader { length: 0, seq_id: seq }, message);
    let length = (probe.to_bytes(CLIENT_CAPS).len() - 4) as u32;

    Packet::new(PacketHeader { length, seq_id: seq }, probe.message)
}

fn payload_of(packet: &Packet) -> Vec<u8> {
    packet.to_bytes(CLIENT_CAPS)[4..].to_vec()
}

fn raw(seq: u8, bytes: &'static [u8]) -> Packet {
    sized(seq, Message::Raw(Bytes::from_static(bytes)))
}

fn greeting(plugin: AuthPlugin) -> Handshake {
    Handshake {
        protocol_version: 10,
        server_version: "8.0.18".into(),
        connection_id: 25,
        server_capabilities: SERVER_CAPS,
        server_default_collation: 255,
        status: Status::SERVER_STATUS_AUTOCOMMIT,
        auth_plugin: plugin,
        auth_plugin_data: Bytes::from_static(b"01234567890123456789"),
    }
}

fn handshake_response(auth_response: &'static [u8]) -> HandshakeResponse {
    HandshakeResponse {
        capabilities: CLIENT_CAPS,
        max_packet_size: 16_777_216,
        collation: 33,
        filler: Bytes::from_static(&[0; 23]),
        username: "app".into(),
        auth_response: Bytes::from_static(auth_response),
        database: None,
        auth_plugin: Some(AuthPlugin::CachingSha2Password),
        connect_attrs: Bytes::new(),
        zstd_compression_level: None,
    }
}

fn ok_packet() -> OkPacket {
    OkPacket {
        header: 0x00,
        affected_rows: 0,
        last_insert_id: 0,
        status: Status::SERVER_STATUS_AUTOCOMMIT,
        warnings: 0,
        info: Bytes::new(),
    }
}

fn metadata(mock_type: &str, conn_id: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("type".into(), mock_type.into());
    metadata.insert("connID".into(), conn_id.into());

    metadata
}

/// Greeting, handshake response, fast-auth success, OK.
fn config_fast_auth() -> Mock {
    Mock::new(
        "config-fast-auth",
        metadata("config", "c0"),
        vec![sized(
            1,
            Message::HandshakeResponse41(handshake_response(&[0xab; 32])),
        )],
        vec![
            sized(
                0,
                Message::HandshakeV10(greeting(AuthPlugin::CachingSha2Password)),
            ),
            sized(
                2,
                Message::AuthMoreData(AuthMoreData {
                    data: Bytes::from_static(&[0x03]),
                }),
            ),
            sized(3, Message::Ok(ok_packet())),
        ],
    )
}

fn query_mock(name: &str, conn_id: &str, query: &str, responses: Vec<Packet>) -> Mock {
    Mock::new(
        name,
        metadata("data", conn_id),
        vec![sized(
            0,
            Message::Query(ComQuery { query: query.into() }),
        )],
        responses,
    )
}

fn prep_mock(name: &str, conn_id: &str, query: &str, recorded_id: u32) -> Mock {
    Mock::new(
        name,
        metadata("data", conn_id),
        vec![sized(
            0,
            Message::StmtPrepare(ComStmtPrepare { query: query.into() }),
        )],
        vec![sized(
            1,
            Message::StmtPrepareOk(ComStmtPrepareOk {
                statement_id: recorded_id,
                columns: 1,
                params: 1,
                warnings: 0,
            }),
        )],
    )
}

fn close_mock(name: &str, conn_id: &str, recorded_id: u32) -> Mock {
    Mock::new(
        name,
        metadata("data", conn_id),
        vec![sized(
            0,
            Message::StmtClose(ComStmtClose {
                statement_id: recorded_id,
            }),
        )],
        Vec::new(),
    )
}

fn execute_mock(
    name: &str,
    conn_id: &str,
    recorded_id: u32,
    value: BindValue,
    responses: Vec<Packet>,
) -> Mock {
    Mock::new(
        name,
        metadata("data", conn_id),
        vec![sized(0, Message::StmtExecute(execute_command(recorded_id, value)))],
        responses,
    )
}

fn execute_command(statement_id: u32, value: BindValue) -> ComStmtExecute {
    ComStmtExecute {
        statement_id,
        flags: 0,
        iterations: 1,
        new_params_bind_flag: 1,
        parameters: vec![BindParameter {
            type_id: TypeId::INT,
            name: String::new(),
            unsigned: false,
            value,
        }],
    }
}

fn spawn_session(
    store: Arc<InMemoryMockStore>,
    with_tls: bool,
) -> (DuplexStream, JoinHandle<mysql_replay::Result<()>>) {
    let (client, server) = tokio::io::duplex(1 << 16);

    let mut session = ReplaySession::new(
        store,
        ReplayOptions {
            sql_delay: 1,
            tls_backdate: Duration::ZERO,
        },
    );
    if with_tls {
        session = session.with_tls(Arc::new(PlaintextTls));
    }

    (client, tokio::spawn(session.run(server)))
}

async fn write_frame(client: &mut DuplexStream, seq: u8, payload: &[u8]) {
    let mut frame = vec![
        (payload.len() & 0xff) as u8,
        ((payload.len() >> 8) & 0xff) as u8,
        ((payload.len() >> 16) & 0xff) as u8,
        seq,
    ];
    frame.extend_from_slice(payload);

    client.write_all(&frame).await.unwrap();
}

async fn read_frame(client: &mut DuplexStream) -> (u8, Vec<u8>) {
    let mut head = [0u8; 4];
    client.read_exact(&mut head).await.unwrap();

    let length = head[0] as usize | (head[1] as usize) << 8 | (head[2] as usize) << 16;
    let mut payload = vec![0u8; length];
    client.read_exact(&mut payload).await.unwrap();

    (head[3], payload)
}

/// Walk the fast-auth connection phase from the client side.
async fn fast_auth_handshake(client: &mut DuplexStream) {
    let (seq, greeting) = read_frame(client).await;
    assert_eq!(seq, 0);
    assert_eq!(greeting[0], 10); // protocol version

    // the live auth response differs from the recording (fresh salt)
    let response = sized(
        1,
        Message::HandshakeResponse41(handshake_response(&[0xcd; 32])),
    );
    write_frame(client, 1, &payload_of(&response)).await;

    let (seq, more) = read_frame(client).await;
    assert_eq!(seq, 2);
    assert_eq!(more, vec![0x01, 0x03]);

    let (seq, ok) = read_frame(client).await;
    assert_eq!(seq, 3);
    assert_eq!(ok[0], 0x00);
}

/// A test double for the TLS collaborator: claims the peeked bytes are not
/// a client hello, so the session continues over the plain duplex.
struct PlaintextTls;

#[async_trait::async_trait]
impl TlsUpgrade for PlaintextTls {
    fn is_tls_handshake(&self, _prefix: &[u8]) -> bool {
        false
    }

    async fn upgrade(
        &self,
        stream: Box<dyn Socket>,
        _buffered: Bytes,
        _backdate: Duration,
    ) -> mysql_replay::Result<Box<dyn Socket>> {
        Ok(stream)
    }
}

#[tokio::test]
async fn fast_auth_single_query_replays_recorded_bytes() {
    let select_responses = vec![
        raw(1, b"\x01"),
        raw(2, b"\x03def\x00\x00\x00\x011\x00\x0c\x3f\x00\x01\x00\x00\x00\x08\x81\x00\x00\x00\x00"),
        raw(3, b"\x011"),
        raw(4, b"\xfe\x00\x00\x02\x00"),
    ];

    let store = Arc::new(InMemoryMockStore::new(vec![
        config_fast_auth(),
        query_mock("q-select-1", "c0", "SELECT 1", select_responses.clone()),
    ]));

    let (mut client, handle) = spawn_session(store.clone(), false);
    fast_auth_handshake(&mut client).await;

    let query = sized(
        0,
        Message::Query(ComQuery {
            query: "SELECT 1".into(),
        }),
    );
    write_frame(&mut client, 0, &payload_of(&query)).await;

    for expected in &select_responses {
        let (seq, payload) = read_frame(&mut client).await;
        assert_eq!(seq, expected.header.seq_id);
        assert_eq!(payload, payload_of(expected));
    }

    assert!(store.get_unfiltered_mocks().await.unwrap().is_empty());

    write_frame(&mut client, 0, &[0x01]).await; // COM_QUIT
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn unmocked_begin_gets_a_synthetic_ok() {
    let store = Arc::new(InMemoryMockStore::new(vec![
        config_fast_auth(),
        query_mock("q-select-1", "c0", "SELECT 1", vec![raw(1, b"\x01")]),
    ]));

    let (mut client, _handle) = spawn_session(store, false);
    fast_auth_handshake(&mut client).await;

    let begin = sized(
        0,
        Message::Query(ComQuery {
            query: "BEGIN".into(),
        }),
    );
    write_frame(&mut client, 0, &payload_of(&begin)).await;

    let mut frame = [0u8; 11];
    client.read_exact(&mut frame).await.unwrap();

    assert_eq!(
        &frame,
        b"\x07\x00\x00\x01\x00\x00\x00\x02\x00\x00\x00"
    );
}

#[tokio::test]
async fn prepare_close_prepare_execute_uses_runtime_statement_ids() {
    const QUERY: &str = "SELECT * FROM users WHERE id=?";
    let row = raw(1, b"\x01\x04\x00\x00\x00\x2a\x00\x00\x00");

    let store = Arc::new(InMemoryMockStore::new(vec![
        config_fast_auth(),
        prep_mock("prep-1", "c1", QUERY, 1),
        close_mock("close-1", "c1", 1),
        prep_mock("prep-2", "c1", QUERY, 2),
        execute_mock("exec-42", "c1", 2, BindValue::Int(42), vec![row.clone()]),
    ]));

    let (mut client, _handle) = spawn_session(store.clone(), false);
    fast_auth_handshake(&mut client).await;

    // PREP #1 -> runtime id 1
    let prepare = sized(
        0,
        Message::StmtPrepare(ComStmtPrepare { query: QUERY.into() }),
    );
    write_frame(&mut client, 0, &payload_of(&prepare)).await;

    let (_, prepare_ok) = read_frame(&mut client).await;
    assert_eq!(prepare_ok[0], 0x00);
    let first_id = u32::from_le_bytes([prepare_ok[1], prepare_ok[2], prepare_ok[3], prepare_ok[4]]);
    assert_eq!(first_id, 1);

    // CLOSE the runtime id; no response may arrive
    let close = sized(
        0,
        Message::StmtClose(ComStmtClose {
            statement_id: first_id,
        }),
    );
    write_frame(&mut client, 0, &payload_of(&close)).await;

    // PREP #2 -> runtime id 2 (the counter never reuses 1)
    write_frame(&mut client, 0, &payload_of(&prepare)).await;

    let (_, prepare_ok) = read_frame(&mut client).await;
    let second_id =
        u32::from_le_bytes([prepare_ok[1], prepare_ok[2], prepare_ok[3], prepare_ok[4]]);
    assert_eq!(second_id, 2);

    // EXECUTE against the second runtime id
    let execute = sized(
        0,
        Message::StmtExecute(execute_command(second_id, BindValue::Int(42))),
    );
    write_frame(&mut client, 0, &payload_of(&execute)).await;

    let (seq, payload) = read_frame(&mut client).await;
    assert_eq!(seq, row.header.seq_id);
    assert_eq!(payload, payload_of(&row));

    // every mock consumed, in arrival order
    let consumed: Vec<String> = store
        .consumed_mocks()
        .into_iter()
        .map(|mock| mock.name.clone())
        .collect();
    assert_eq!(
        consumed,
        vec!["config-fast-auth", "prep-1", "close-1", "prep-2", "exec-42"]
    );
}

#[tokio::test]
async fn auth_switch_with_full_auth_over_tls_deletes_the_config_mock() {
    let config = Mock::new(
        "config-full-auth",
        metadata("config", "c0"),
        vec![
            sized(
                1,
                Message::SslRequest(SslRequest {
                    capabilities: CLIENT_CAPS.union(Capabilities::SSL),
                    max_packet_size: 16_777_216,
                    collation: 33,
                    filler: Bytes::from_static(&[0; 23]),
                }),
            ),
            sized(
                2,
                Message::HandshakeResponse41(handshake_response(&[0xab; 20])),
            ),
            sized(
                4,
                Message::AuthSwitchResponse(
                    mysql_replay::protocol::connect::AuthSwitchResponse(Bytes::from_static(
                        &[0xee; 32],
                    )),
                ),
            ),
            sized(6, Message::EncryptedPassword(Bytes::from_static(b"s3cret"))),
        ],
        vec![
            sized(
                0,
                Message::HandshakeV10(greeting(AuthPlugin::MySqlNativePassword)),
            ),
            sized(
                3,
                Message::AuthSwitchRequest(AuthSwitchRequest {
                    plugin: AuthPlugin::CachingSha2Password,
                    data: Bytes::from_static(b"01234567890123456789\x00"),
                }),
            ),
            sized(
                5,
                Message::AuthMoreData(AuthMoreData {
                    data: Bytes::from_static(&[0x04]),
                }),
            ),
            sized(7, Message::Ok(ok_packet())),
        ],
    );

    let store = Arc::new(InMemoryMockStore::new(vec![config]));
    let (mut client, handle) = spawn_session(store.clone(), true);

    let (_, greeting) = read_frame(&mut client).await;
    assert_eq!(greeting[0], 10);

    let ssl_request = sized(
        1,
        Message::SslRequest(SslRequest {
            capabilities: CLIENT_CAPS.union(Capabilities::SSL),
            max_packet_size: 16_777_216,
            collation: 33,
            filler: Bytes::from_static(&[0; 23]),
        }),
    );
    write_frame(&mut client, 1, &payload_of(&ssl_request)).await;

    // the handshake response lives at request index 1 of the mock
    let response = sized(
        2,
        Message::HandshakeResponse41(handshake_response(&[0xcd; 20])),
    );
    write_frame(&mut client, 2, &payload_of(&response)).await;

    let (seq, switch) = read_frame(&mut client).await;
    assert_eq!(seq, 3);
    assert_eq!(switch[0], 0xfe);

    // arbitrary payload; only the sequence id must line up
    write_frame(&mut client, 4, b"live-scramble-bytes").await;

    let (seq, more) = read_frame(&mut client).await;
    assert_eq!(seq, 5);
    assert_eq!(more, vec![0x01, 0x04]);

    // cleartext password over the (nominally) encrypted channel
    write_frame(&mut client, 6, b"hunter2").await;

    let (seq, ok) = read_frame(&mut client).await;
    assert_eq!(seq, 7);
    assert_eq!(ok[0], 0x00);

    // full auth is one-shot: the config mock is gone, not just consumed
    let counts = store.get_mysql_counts().await;
    assert_eq!(counts.config, 0);
    assert_eq!(counts.total, 0);

    write_frame(&mut client, 0, &[0x01]).await; // COM_QUIT
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn type_widened_parameter_still_replays_the_response() {
    const QUERY: &str = "SELECT name FROM users WHERE id=?";
    let row = raw(1, b"\x01\x05alice");

    let store = Arc::new(InMemoryMockStore::new(vec![
        config_fast_auth(),
        prep_mock("prep-1", "c1", QUERY, 7),
        // the recording carries the value as an unsigned word
        execute_mock("exec-7", "c1", 7, BindValue::UInt(7), vec![row.clone()]),
    ]));

    let (mut client, _handle) = spawn_session(store, false);
    fast_auth_handshake(&mut client).await;

    let prepare = sized(
        0,
        Message::StmtPrepare(ComStmtPrepare { query: QUERY.into() }),
    );
    write_frame(&mut client, 0, &payload_of(&prepare)).await;
    let (_, prepare_ok) = read_frame(&mut client).await;
    let runtime_id =
        u32::from_le_bytes([prepare_ok[1], prepare_ok[2], prepare_ok[3], prepare_ok[4]]);

    // the live client binds a plain signed int
    let execute = sized(
        0,
        Message::StmtExecute(execute_command(runtime_id, BindValue::Int(7))),
    );
    write_frame(&mut client, 0, &payload_of(&execute)).await;

    let (_, payload) = read_frame(&mut client).await;
    assert_eq!(payload, payload_of(&row));
}

#[tokio::test]
async fn concurrent_prepares_resolve_executes_by_query() {
    const QUERY_A: &str = "SELECT a FROM t1 WHERE x=?";
    const QUERY_B: &str = "SELECT b FROM t2 WHERE y=?";
    let row_b = raw(1, b"\x01\x02b!");

    let store = Arc::new(InMemoryMockStore::new(vec![
        config_fast_auth(),
        prep_mock("prep-a", "c1", QUERY_A, 10),
        prep_mock("prep-b", "c1", QUERY_B, 11),
        execute_mock("exec-b", "c1", 11, BindValue::Int(5), vec![row_b.clone()]),
    ]));

    let (mut client, _handle) = spawn_session(store.clone(), false);
    fast_auth_handshake(&mut client).await;

    for (query, expected_id) in [(QUERY_A, 1u32), (QUERY_B, 2u32)] {
        let prepare = sized(
            0,
            Message::StmtPrepare(ComStmtPrepare { query: query.into() }),
        );
        write_frame(&mut client, 0, &payload_of(&prepare)).await;

        let (_, prepare_ok) = read_frame(&mut client).await;
        let runtime_id =
            u32::from_le_bytes([prepare_ok[1], prepare_ok[2], prepare_ok[3], prepare_ok[4]]);
        assert_eq!(runtime_id, expected_id);
    }

    // execute with B's runtime id resolves to B's recorded execute
    let execute = sized(
        0,
        Message::StmtExecute(execute_command(2, BindValue::Int(5))),
    );
    write_frame(&mut client, 0, &payload_of(&execute)).await;

    let (_, payload) = read_frame(&mut client).await;
    assert_eq!(payload, payload_of(&row_b));

    let consumed: Vec<String> = store
        .consumed_mocks()
        .into_iter()
        .map(|mock| mock.name.clone())
        .collect();
    assert_eq!(
        consumed,
        vec!["config-fast-auth", "prep-a", "prep-b", "exec-b"]
    );
}

#[tokio::test]
async fn quit_with_no_data_mocks_terminates_cleanly() {
    let store = Arc::new(InMemoryMockStore::new(vec![config_fast_auth()]));

    let (mut client, handle) = spawn_session(store, false);
    fast_auth_handshake(&mut client).await;

    // nothing unfiltered is left, but COM_QUIT must still end cleanly
    write_frame(&mut client, 0, &[0x01]).await;

    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn idle_read_timeout_keeps_the_connection_alive() {
    let store = Arc::new(InMemoryMockStore::new(vec![
        config_fast_auth(),
        query_mock("q-select-1", "c0", "SELECT 1", vec![raw(1, b"\x01")]),
    ]));

    // sql_delay = 1 arms a 2s read deadline
    let (mut client, _handle) = spawn_session(store, false);
    fast_auth_handshake(&mut client).await;

    // outlive the deadline; the loop must back off and rearm, not hang up
    tokio::time::sleep(Duration::from_millis(2300)).await;

    let query = sized(
        0,
        Message::Query(ComQuery {
            query: "SELECT 1".into(),
        }),
    );
    write_frame(&mut client, 0, &payload_of(&query)).await;

    let (_, payload) = read_frame(&mut client).await;
    assert_eq!(payload, b"\x01");
}
