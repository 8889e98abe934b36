use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, BufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::{Capabilities, Status};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_handshake_v10.html
// https://mariadb.com/kb/en/connection/#initial-handshake-packet
#[derive(Debug, Clone)]
pub struct Handshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub server_capabilities: Capabilities,
    pub server_default_collation: u8,
    pub status: Status,
    pub auth_plugin: AuthPlugin,

    /// Scramble; both parts joined, without the trailing NUL.
    pub auth_plugin_data: Bytes,
}

impl ProtocolDecode<'_> for Handshake {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let protocol_version = buf.get_bytes(1)?.get_u8();
        let server_version = buf.get_str_nul()?;
        let connection_id = buf.get_bytes(4)?.get_u32_le();

        // scramble first part : string<8>
        let scramble_1 = buf.get_bytes(8)?;

        // reserved : string<1>
        buf.get_bytes(1)?;

        // capability_flags_1 : int<2>
        let capabilities_1 = buf.get_bytes(2)?.get_u16_le();
        let mut capabilities = Capabilities::from_bits_retain(capabilities_1.into());

        // character_set : int<1>
        let collation = buf.get_bytes(1)?.get_u8();

        // status_flags : int<2>
        let status = Status::from_bits_retain(buf.get_bytes(2)?.get_u16_le());

        // capability_flags_2 : int<2>
        let capabilities_2 = buf.get_bytes(2)?.get_u16_le();
        capabilities |= Capabilities::from_bits_retain(u64::from(capabilities_2) << 16);

        let auth_plugin_data_len = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            buf.get_bytes(1)?.get_u8()
        } else {
            buf.get_bytes(1)?;
            0
        };

        // reserved : string<6>
        buf.get_bytes(6)?;

        if capabilities.contains(Capabilities::MYSQL) {
            // reserved : string<4>
            buf.get_bytes(4)?;
        } else {
            // capability_flags_3 : int<4>
            let capabilities_3 = buf.get_bytes(4)?.get_u32_le();
            capabilities |= Capabilities::from_bits_retain(u64::from(capabilities_3) << 32);
        }

        let scramble_2 = if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            // scramble 2nd part : string<n> ( len = max(12, plugin data length - 9) )
            let len = ((auth_plugin_data_len as isize) - 9).max(12) as usize;
            let scramble_2 = buf.get_bytes(len)?;

            // reserved : string<1>
            buf.get_bytes(1)?;

            scramble_2
        } else {
            Bytes::new()
        };

        let auth_plugin = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            AuthPlugin::parse(&buf.get_str_nul()?)
        } else {
            AuthPlugin::MySqlNativePassword
        };

        let mut scramble = Vec::with_capacity(scramble_1.len() + scramble_2.len());
        scramble.extend_from_slice(&scramble_1);
        scramble.extend_from_slice(&scramble_2);

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            server_capabilities: capabilities,
            server_default_collation: collation,
            status,
            auth_plugin,
            auth_plugin_data: scramble.into(),
        })
    }
}

impl ProtocolEncode<'_> for Handshake {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        let capabilities = self.server_capabilities;

        buf.push(self.protocol_version);
        buf.put_str_nul(&self.server_version);
        buf.extend_from_slice(&self.connection_id.to_le_bytes());

        // scramble first part : string<8>
        buf.extend_from_slice(&self.auth_plugin_data[..8]);

        // reserved : string<1>
        buf.push(0);

        buf.extend_from_slice(&((capabilities.bits() & 0xffff) as u16).to_le_bytes());
        buf.push(self.server_default_collation);
        buf.extend_from_slice(&self.status.bits().to_le_bytes());
        buf.extend_from_slice(&(((capabilities.bits() >> 16) & 0xffff) as u16).to_le_bytes());

        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            // scramble + NUL, the way the server reports it
            buf.push((self.auth_plugin_data.len() + 1) as u8);
        } else {
            buf.push(0);
        }

        // reserved : string<6>
        buf.extend_from_slice(&[0; 6]);

        if capabilities.contains(Capabilities::MYSQL) {
            // reserved : string<4>
            buf.extend_from_slice(&[0; 4]);
        } else {
            buf.extend_from_slice(&(((capabilities.bits() >> 32) & 0xffff_ffff) as u32).to_le_bytes());
        }

        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            buf.extend_from_slice(&self.auth_plugin_data[8..]);
            buf.push(0);
        }

        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            buf.put_str_nul(self.auth_plugin.as_str());
        }
    }
}
