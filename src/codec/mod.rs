//! Context-dependent packet codec.
//!
//! A MySQL payload cannot be decoded in isolation: the same leading byte
//! means different things depending on what was last sent (0xFE is an
//! auth-switch request during authentication and an EOF after result-set
//! columns; 0x01 opens both `AuthMoreData` and `COM_QUIT`). The
//! [`ConnContext`] carries that state and this module owns the dispatch.

mod context;

pub use context::{ConnContext, Mode};
pub(crate) use context::last_op;

use bytes::Bytes;
use tracing::{trace, warn};

use crate::error::Result;
use crate::io::ProtocolDecode;
use crate::protocol::connect::{AuthSwitchResponse, HandshakeResponse, SslRequest};
use crate::protocol::statement::{
    ComStmtClose, ComStmtExecute, ComStmtPrepare, ComStmtReset, ComStmtSendLongData,
};
use crate::protocol::text::command;
use crate::protocol::text::{
    ComDebug, ComInitDb, ComPing, ComQuery, ComQuit, ComResetConnection, ComStatistics,
};
use crate::protocol::{Capabilities, Message, Packet, PacketHeader};

/// Decode one client payload into a typed packet, using and updating the
/// connection context. The payload buffer itself is never modified; `Bytes`
/// clones are views.
pub fn decode_payload(
    ctx: &mut ConnContext,
    header: PacketHeader,
    payload: Bytes,
) -> Result<Packet> {
    trace!(
        last_op = ctx.last_op,
        len = header.length,
        seq = header.seq_id,
        payload = %hex::encode(&payload[..payload.len().min(64)]),
        "decoding client packet",
    );

    let message = match ctx.last_op {
        last_op::GREETING_SENT => decode_handshake_reply(ctx, payload)?,

        last_op::AUTH_SWITCH_SENT => {
            Message::AuthSwitchResponse(AuthSwitchResponse(payload))
        }

        last_op::FULL_AUTH_REQUESTED => {
            if !ctx.use_ssl && payload.len() == 1 && payload[0] == 0x02 {
                Message::PublicKeyRequest
            } else {
                // over TLS this is the cleartext password; without TLS it
                // would be a protocol violation, but replay only ever checks
                // the sequence id, so pass it through
                Message::EncryptedPassword(payload)
            }
        }

        last_op::PUBLIC_KEY_SENT => Message::EncryptedPassword(payload),

        _ => decode_command(ctx, payload)?,
    };

    Ok(Packet::new(header, message))
}

fn decode_handshake_reply(ctx: &mut ConnContext, payload: Bytes) -> Result<Message> {
    // An SSLRequest is a truncated handshake response: same capability
    // prefix, fixed 32-byte payload, no username.
    if payload.len() == SslRequest::PAYLOAD_SIZE {
        let ssl = SslRequest::decode(payload.clone())?;

        if ssl.capabilities.contains(Capabilities::SSL) {
            ctx.use_ssl = true;
            return Ok(Message::SslRequest(ssl));
        }
    }

    let response = HandshakeResponse::decode(payload)?;

    ctx.client_capabilities = response.capabilities;
    if let Some(plugin) = &response.auth_plugin {
        ctx.auth_plugin = plugin.clone();
    }

    Ok(Message::HandshakeResponse41(response))
}

fn decode_command(ctx: &mut ConnContext, payload: Bytes) -> Result<Message> {
    let Some(&code) = payload.first() else {
        return Err(err_protocol!("empty command payload"));
    };

    let message = match code {
        command::COM_QUIT => Message::Quit(ComQuit),
        command::COM_PING => Message::Ping(ComPing),
        command::COM_STATISTICS => Message::Statistics(ComStatistics),
        command::COM_DEBUG => Message::Debug(ComDebug),
        command::COM_RESET_CONNECTION => Message::ResetConnection(ComResetConnection),
        command::COM_INIT_DB => Message::InitDb(ComInitDb::decode(payload)?),
        command::COM_QUERY => Message::Query(ComQuery::decode(payload)?),
        command::COM_STMT_PREPARE => Message::StmtPrepare(ComStmtPrepare::decode(payload)?),
        command::COM_STMT_CLOSE => Message::StmtClose(ComStmtClose::decode(payload)?),
        command::COM_STMT_RESET => Message::StmtReset(ComStmtReset::decode(payload)?),
        command::COM_STMT_SEND_LONG_DATA => {
            Message::StmtSendLongData(ComStmtSendLongData::decode(payload)?)
        }

        command::COM_STMT_EXECUTE => {
            // the parameter count comes from the runtime prepare map; an
            // unknown statement id decodes to zero parameters and will fail
            // to match downstream
            let statement_id = statement_id_of(&payload);
            let param_count = ctx.param_count(statement_id);

            Message::StmtExecute(ComStmtExecute::decode_with(payload, param_count)?)
        }

        _ => {
            // unknown but recoverable: carry the bytes opaquely and let the
            // matcher decide (COM_CHANGE_USER lands here by design of the
            // mock schema)
            warn!(command = %format_args!("0x{code:02x}"), "opaque command payload");
            Message::Raw(payload)
        }
    };

    ctx.last_op = code;

    Ok(message)
}

fn statement_id_of(payload: &Bytes) -> u32 {
    if payload.len() < 5 {
        return 0;
    }

    u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]])
}

/// Frame a reply for the wire. Payload length is recomputed from the
/// encoded payload; the sequence id is the packet's own.
pub fn encode_packet(packet: &Packet, ctx: &ConnContext) -> Vec<u8> {
    let frame = packet.to_bytes(ctx.effective_capabilities());

    trace!(
        kind = packet.message.kind(),
        len = frame.len() - 4,
        seq = packet.header.seq_id,
        "encoding reply packet",
    );

    frame
}
