use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, BufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, Status};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_ok_packet.html
// https://mariadb.com/kb/en/ok_packet/
#[derive(Debug, Clone)]
pub struct OkPacket {
    /// `0x00`, or `0xFE` when this OK travels where an EOF used to
    /// (`CLIENT_DEPRECATE_EOF`).
    pub header: u8,
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: Status,
    pub warnings: u16,

    /// Human-readable info and optional session-state tail, kept raw.
    pub info: Bytes,
}

impl OkPacket {
    /// The minimal OK synthesized for unmocked control statements:
    /// nothing affected, autocommit set, no warnings, no info.
    pub fn synthetic() -> Self {
        Self {
            header: 0x00,
            affected_rows: 0,
            last_insert_id: 0,
            status: Status::SERVER_STATUS_AUTOCOMMIT,
            warnings: 0,
            info: Bytes::new(),
        }
    }
}

impl ProtocolDecode<'_, Capabilities> for OkPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let header = buf.get_bytes(1)?.get_u8();
        if header != 0x00 && header != 0xfe {
            return Err(err_protocol!(
                "expected 0x00 or 0xfe (OK) but found 0x{:x}",
                header
            ));
        }

        let affected_rows = buf.get_uint_lenenc()?;
        let last_insert_id = buf.get_uint_lenenc()?;

        let (status, warnings) = if capabilities.contains(Capabilities::PROTOCOL_41) {
            let status = Status::from_bits_retain(buf.get_bytes(2)?.get_u16_le());
            let warnings = buf.get_bytes(2)?.get_u16_le();

            (status, warnings)
        } else if capabilities.contains(Capabilities::TRANSACTIONS) {
            (Status::from_bits_retain(buf.get_bytes(2)?.get_u16_le()), 0)
        } else {
            (Status::empty(), 0)
        };

        Ok(Self {
            header,
            affected_rows,
            last_insert_id,
            status,
            warnings,
            info: buf,
        })
    }
}

impl ProtocolEncode<'_, Capabilities> for OkPacket {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        buf.push(self.header);
        buf.put_uint_lenenc(self.affected_rows);
        buf.put_uint_lenenc(self.last_insert_id);

        if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.extend_from_slice(&self.status.bits().to_le_bytes());
            buf.extend_from_slice(&self.warnings.to_le_bytes());
        } else if capabilities.contains(Capabilities::TRANSACTIONS) {
            buf.extend_from_slice(&self.status.bits().to_le_bytes());
        }

        buf.extend_from_slice(&self.info);
    }
}
