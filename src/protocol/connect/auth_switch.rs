use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, BufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::auth::AuthPlugin;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_auth_switch_request.html
//
// Identified by header byte 0xFE in the auth phase; distinct from EOF, which
// only appears after result-set columns.
#[derive(Debug, Clone)]
pub struct AuthSwitchRequest {
    pub plugin: AuthPlugin,

    /// Plugin-provided data (the new salt), trailing NUL included, so the
    /// recorded bytes replay untouched.
    pub data: Bytes,
}

impl ProtocolDecode<'_> for AuthSwitchRequest {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let header = buf.get_bytes(1)?.get_u8();
        if header != 0xfe {
            return Err(err_protocol!(
                "expected 0xfe (AUTH_SWITCH) but found 0x{:x}",
                header
            ));
        }

        let plugin = AuthPlugin::parse(&buf.get_str_nul()?);
        let data = buf;

        Ok(Self { plugin, data })
    }
}

impl ProtocolEncode<'_> for AuthSwitchRequest {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(0xfe);
        buf.put_str_nul(self.plugin.as_str());
        buf.extend_from_slice(&self.data);
    }
}

/// The client's answer to an auth-switch request. The payload is a scramble
/// over the live salt, so it is opaque here; only the sequence id is ever
/// validated during replay.
#[derive(Debug, Clone)]
pub struct AuthSwitchResponse(pub Bytes);

impl ProtocolDecode<'_> for AuthSwitchResponse {
    fn decode_with(buf: Bytes, _: ()) -> Result<Self, Error> {
        Ok(Self(buf))
    }
}

impl ProtocolEncode<'_> for AuthSwitchResponse {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.extend_from_slice(&self.0);
    }
}
