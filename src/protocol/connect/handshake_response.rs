use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, BufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_handshake_response.html
//
// Decoded from the client during replay; the matcher compares it against the
// recorded response field-by-field (the auth response is salt-dependent and
// deliberately never compared).
#[derive(Debug, Clone)]
pub struct HandshakeResponse {
    pub capabilities: Capabilities,
    pub max_packet_size: u32,
    pub collation: u8,

    /// Reserved tail after the collation byte; replayed verbatim.
    pub filler: Bytes,

    pub username: String,
    pub auth_response: Bytes,
    pub database: Option<String>,
    pub auth_plugin: Option<AuthPlugin>,

    /// Connection attributes, raw (length prefix included); never inspected.
    pub connect_attrs: Bytes,

    pub zstd_compression_level: Option<u8>,
}

impl ProtocolDecode<'_> for HandshakeResponse {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let capabilities =
            Capabilities::from_bits_retain(u64::from(buf.get_bytes(4)?.get_u32_le()));
        let max_packet_size = buf.get_bytes(4)?.get_u32_le();
        let collation = buf.get_bytes(1)?.get_u8();

        // reserved : string<23>
        let filler = buf.get_bytes(23)?;

        let username = buf.get_str_nul()?;

        let auth_response = if capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            buf.get_bytes_lenenc()?
        } else if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            let len = buf.get_bytes(1)?.get_u8() as usize;
            buf.get_bytes(len)?
        } else {
            let nul = memchr::memchr(b'\0', &buf)
                .ok_or_else(|| err_protocol!("expected NUL-terminated auth response"))?;
            let response = buf.get_bytes(nul)?;
            buf.advance(1);
            response
        };

        let database = if capabilities.contains(Capabilities::CONNECT_WITH_DB) {
            Some(buf.get_str_nul()?)
        } else {
            None
        };

        let auth_plugin = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            Some(AuthPlugin::parse(&buf.get_str_nul()?))
        } else {
            None
        };

        let connect_attrs = if capabilities.contains(Capabilities::CONNECT_ATTRS) {
            // length-encoded region; kept raw so nothing here can fail replay
            let zstd_trailer = usize::from(
                capabilities.contains(Capabilities::ZSTD_COMPRESSION_ALGORITHM),
            );
            let len = buf.len().saturating_sub(zstd_trailer);
            buf.get_bytes(len)?
        } else {
            Bytes::new()
        };

        let zstd_compression_level =
            if capabilities.contains(Capabilities::ZSTD_COMPRESSION_ALGORITHM) {
                Some(buf.get_bytes(1)?.get_u8())
            } else {
                None
            };

        Ok(Self {
            capabilities,
            max_packet_size,
            collation,
            filler,
            username,
            auth_response,
            database,
            auth_plugin,
            connect_attrs,
            zstd_compression_level,
        })
    }
}

impl ProtocolEncode<'_> for HandshakeResponse {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        let capabilities = self.capabilities;

        buf.extend_from_slice(&((capabilities.bits() & 0xffff_ffff) as u32).to_le_bytes());
        buf.extend_from_slice(&self.max_packet_size.to_le_bytes());
        buf.push(self.collation);
        buf.extend_from_slice(&self.filler);
        buf.put_str_nul(&self.username);

        if capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            buf.put_bytes_lenenc(&self.auth_response);
        } else if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            buf.push(self.auth_response.len() as u8);
            buf.extend_from_slice(&self.auth_response);
        } else {
            buf.extend_from_slice(&self.auth_response);
            buf.push(0);
        }

        if let Some(database) = &self.database {
            buf.put_str_nul(database);
        }

        if let Some(plugin) = &self.auth_plugin {
            buf.put_str_nul(plugin.as_str());
        }

        buf.extend_from_slice(&self.connect_attrs);

        if let Some(level) = self.zstd_compression_level {
            buf.push(level);
        }
    }
}
