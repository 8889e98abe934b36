use bytes::Bytes;

use crate::io::ProtocolEncode;
use crate::protocol::connect::{
    AuthMoreData, AuthSwitchRequest, AuthSwitchResponse, Handshake, HandshakeResponse, SslRequest,
};
use crate::protocol::response::{EofPacket, ErrPacket, OkPacket};
use crate::protocol::statement::{
    ComStmtClose, ComStmtExecute, ComStmtPrepare, ComStmtPrepareOk, ComStmtReset,
    ComStmtSendLongData,
};
use crate::protocol::text::command;
use crate::protocol::text::{
    ComDebug, ComInitDb, ComPing, ComQuery, ComQuit, ComResetConnection, ComStatistics,
};
use crate::protocol::Capabilities;

/// The 4-byte frame header: 3-byte little-endian payload length plus a
/// sequence id.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_packets.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    pub length: u32,
    pub seq_id: u8,
}

/// A framed packet: header plus decoded message.
///
/// Mocks store these on both the request and the response side; the live
/// session produces them from the wire and consumes them into the wire.
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: PacketHeader,
    pub message: Message,
}

impl Packet {
    pub fn new(header: PacketHeader, message: Message) -> Self {
        Self { header, message }
    }

    /// Frame the message: encoded payload preceded by the recomputed length
    /// and this packet's sequence id. The recorded length is deliberately
    /// not trusted for framing.
    pub fn to_bytes(&self, capabilities: Capabilities) -> Vec<u8> {
        let mut buf = vec![0; 4];
        self.message.encode_with(&mut buf, capabilities);

        let len = buf.len() - 4;
        buf[0] = (len & 0xff) as u8;
        buf[1] = ((len >> 8) & 0xff) as u8;
        buf[2] = ((len >> 16) & 0xff) as u8;
        buf[3] = self.header.seq_id;

        buf
    }
}

/// Every packet kind the replay engine understands, as one tagged sum.
///
/// Anything the engine never needs to inspect (result-set packets, unknown
/// payloads with a recoverable last operation) rides along as [`Message::Raw`]
/// and is replayed verbatim.
#[derive(Debug, Clone)]
pub enum Message {
    // connection phase
    HandshakeV10(Handshake),
    SslRequest(SslRequest),
    HandshakeResponse41(HandshakeResponse),
    AuthSwitchRequest(AuthSwitchRequest),
    AuthSwitchResponse(AuthSwitchResponse),
    AuthMoreData(AuthMoreData),

    // caching-sha2 full authentication
    PublicKeyRequest,
    PublicKeyResponse(Bytes),
    EncryptedPassword(Bytes),

    // generic responses
    Ok(OkPacket),
    Err(ErrPacket),
    Eof(EofPacket),

    // text protocol
    Query(ComQuery),
    InitDb(ComInitDb),
    Quit(ComQuit),
    Ping(ComPing),
    Statistics(ComStatistics),
    Debug(ComDebug),
    ResetConnection(ComResetConnection),

    // prepared statements
    StmtPrepare(ComStmtPrepare),
    StmtPrepareOk(ComStmtPrepareOk),
    StmtExecute(ComStmtExecute),
    StmtClose(ComStmtClose),
    StmtReset(ComStmtReset),
    StmtSendLongData(ComStmtSendLongData),

    /// Verbatim passthrough.
    Raw(Bytes),
}

impl Message {
    /// Stable name for diagnostics; mocks on disk carry the same tags.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::HandshakeV10(_) => "HandshakeV10",
            Message::SslRequest(_) => "SSLRequest",
            Message::HandshakeResponse41(_) => "HandshakeResponse41",
            Message::AuthSwitchRequest(_) => "AuthSwitchRequest",
            Message::AuthSwitchResponse(_) => "AuthSwitchResponse",
            Message::AuthMoreData(_) => "AuthMoreData",
            Message::PublicKeyRequest => "PublicKeyRequest",
            Message::PublicKeyResponse(_) => "PublicKeyResponse",
            Message::EncryptedPassword(_) => "EncryptedPassword",
            Message::Ok(_) => "OK",
            Message::Err(_) => "ERR",
            Message::Eof(_) => "EOF",
            Message::Query(_) => "COM_QUERY",
            Message::InitDb(_) => "COM_INIT_DB",
            Message::Quit(_) => "COM_QUIT",
            Message::Ping(_) => "COM_PING",
            Message::Statistics(_) => "COM_STATISTICS",
            Message::Debug(_) => "COM_DEBUG",
            Message::ResetConnection(_) => "COM_RESET_CONNECTION",
            Message::StmtPrepare(_) => "COM_STMT_PREPARE",
            Message::StmtPrepareOk(_) => "COM_STMT_PREPARE_OK",
            Message::StmtExecute(_) => "COM_STMT_EXECUTE",
            Message::StmtClose(_) => "COM_STMT_CLOSE",
            Message::StmtReset(_) => "COM_STMT_RESET",
            Message::StmtSendLongData(_) => "COM_STMT_SEND_LONG_DATA",
            Message::Raw(bytes) => match bytes.first() {
                Some(&command::COM_CHANGE_USER) => "COM_CHANGE_USER",
                _ => "RAW",
            },
        }
    }

    /// Commands for which the protocol mandates no server reply.
    pub fn is_no_response(&self) -> bool {
        matches!(
            self,
            Message::StmtClose(_) | Message::StmtSendLongData(_)
        )
    }
}

impl ProtocolEncode<'_, Capabilities> for Message {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        match self {
            Message::HandshakeV10(p) => p.encode_with(buf, ()),
            Message::SslRequest(p) => p.encode_with(buf, ()),
            Message::HandshakeResponse41(p) => p.encode_with(buf, ()),
            Message::AuthSwitchRequest(p) => p.encode_with(buf, ()),
            Message::AuthSwitchResponse(p) => p.encode_with(buf, ()),
            Message::AuthMoreData(p) => p.encode_with(buf, ()),
            Message::PublicKeyRequest => buf.push(0x02),
            Message::PublicKeyResponse(key) => buf.extend_from_slice(key),
            Message::EncryptedPassword(blob) => buf.extend_from_slice(blob),
            Message::Ok(p) => p.encode_with(buf, capabilities),
            Message::Err(p) => p.encode_with(buf, capabilities),
            Message::Eof(p) => p.encode_with(buf, capabilities),
            Message::Query(p) => p.encode_with(buf, ()),
            Message::InitDb(p) => p.encode_with(buf, ()),
            Message::Quit(p) => p.encode_with(buf, ()),
            Message::Ping(p) => p.encode_with(buf, ()),
            Message::Statistics(p) => p.encode_with(buf, ()),
            Message::Debug(p) => p.encode_with(buf, ()),
            Message::ResetConnection(p) => p.encode_with(buf, ()),
            Message::StmtPrepare(p) => p.encode_with(buf, ()),
            Message::StmtPrepareOk(p) => p.encode_with(buf, ()),
            Message::StmtExecute(p) => p.encode_with(buf, ()),
            Message::StmtClose(p) => p.encode_with(buf, ()),
            Message::StmtReset(p) => p.encode_with(buf, ()),
            Message::StmtSendLongData(p) => p.encode_with(buf, ()),
            Message::Raw(bytes) => buf.extend_from_slice(bytes),
        }
    }
}
